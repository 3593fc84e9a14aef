//! Run configuration.

use std::path::{Path, PathBuf};

/// Default maximum output width in pixels. 2160 (4K) keeps wallpapers sharp.
pub const DEFAULT_MAX_WIDTH: u32 = 2160;

/// Configuration for one run of the pipeline.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Root of the tree to read images from.
    pub input_dir: PathBuf,
    /// Root the mirrored output tree is written under.
    pub output_dir: PathBuf,
    /// Images wider than this are downscaled to exactly this width.
    pub max_width: u32,
    /// Number of worker threads.
    pub workers: usize,
    /// Split tasks into one fixed shard per worker instead of a shared queue.
    pub static_shards: bool,
}

impl RunConfig {
    pub fn new<P: AsRef<Path>, Q: AsRef<Path>>(input_dir: P, output_dir: Q) -> Self {
        Self {
            input_dir: input_dir.as_ref().to_path_buf(),
            output_dir: output_dir.as_ref().to_path_buf(),
            max_width: DEFAULT_MAX_WIDTH,
            workers: Self::default_workers(),
            static_shards: false,
        }
    }

    pub fn with_max_width(mut self, max_width: u32) -> Self {
        self.max_width = max_width;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_static_shards(mut self, static_shards: bool) -> Self {
        self.static_shards = static_shards;
        self
    }

    /// One worker per CPU core.
    pub fn default_workers() -> usize {
        num_cpus::get().max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RunConfig::new("/in", "/out");
        assert_eq!(config.max_width, DEFAULT_MAX_WIDTH);
        assert!(config.workers >= 1);
        assert!(!config.static_shards);
    }

    #[test]
    fn test_workers_never_zero() {
        let config = RunConfig::new("/in", "/out").with_workers(0);
        assert_eq!(config.workers, 1);
    }
}
