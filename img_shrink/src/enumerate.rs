//! Task enumeration: walk the input tree and mirror it into the output tree.

use crate::errors::EnumerateError;
use crate::queue::Task;
use rand::seq::SliceRandom;
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

/// Produce the task set for all regular files under `input_root` whose
/// mirrored output path does not already exist.
///
/// Mirroring rule: `destination = output_root / (source relative to
/// input_root)`. Because a completed task leaves a file at its destination,
/// re-running enumeration after a partial run yields exactly the tasks not
/// yet done, so the whole pipeline is restartable.
///
/// Symbolic links are not followed and non-regular files are always
/// skipped. Files without an extension are skipped too. The output root is
/// created if absent.
pub fn enumerate_tasks(input_root: &Path, output_root: &Path) -> Result<Vec<Task>, EnumerateError> {
    if !input_root.exists() {
        return Err(EnumerateError::InputMissing(input_root.to_path_buf()));
    }
    if !input_root.is_dir() {
        return Err(EnumerateError::NotADirectory(input_root.to_path_buf()));
    }
    fs::create_dir_all(output_root).map_err(|source| EnumerateError::CreateOutputDir {
        path: output_root.to_path_buf(),
        source,
    })?;

    let mut tasks = Vec::new();
    for entry in WalkDir::new(input_root)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }
        let source = entry.path();
        if source.extension().is_none() {
            continue;
        }
        let rel = match source.strip_prefix(input_root) {
            Ok(rel) => rel,
            Err(_) => continue,
        };
        let destination = output_root.join(rel);
        if destination.exists() {
            tracing::debug!(destination = %destination.display(), "output exists, skipping");
            continue;
        }
        tasks.push(Task::new(source.to_path_buf(), destination));
    }

    Ok(tasks)
}

/// Shuffle the task list so statically sharded workers get balanced load
/// even when file sizes cluster by directory.
pub fn shuffle_tasks(tasks: &mut [Task]) {
    let mut rng = rand::rng();
    tasks.shuffle(&mut rng);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use tempfile::TempDir;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"x").unwrap();
    }

    #[test]
    fn test_mirrors_relative_paths() {
        let temp = TempDir::new().unwrap();
        let input = temp.path().join("input");
        let output = temp.path().join("output");

        touch(&input.join("a.jpg"));
        touch(&input.join("photos/2024/b.png"));

        let tasks = enumerate_tasks(&input, &output).unwrap();
        let destinations: HashSet<_> = tasks.iter().map(|t| t.destination.clone()).collect();

        assert_eq!(tasks.len(), 2);
        assert!(destinations.contains(&output.join("a.jpg")));
        assert!(destinations.contains(&output.join("photos/2024/b.png")));
        assert!(output.is_dir());
    }

    #[test]
    fn test_skips_existing_destinations() {
        let temp = TempDir::new().unwrap();
        let input = temp.path().join("input");
        let output = temp.path().join("output");

        touch(&input.join("a.jpg"));
        touch(&input.join("b.png"));
        touch(&output.join("a.jpg"));

        let tasks = enumerate_tasks(&input, &output).unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].source, input.join("b.png"));
    }

    #[test]
    fn test_skips_files_without_extension() {
        let temp = TempDir::new().unwrap();
        let input = temp.path().join("input");
        let output = temp.path().join("output");

        touch(&input.join("README"));
        touch(&input.join("photo.jpg"));

        let tasks = enumerate_tasks(&input, &output).unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].source, input.join("photo.jpg"));
    }

    #[cfg(unix)]
    #[test]
    fn test_skips_symlinks() {
        let temp = TempDir::new().unwrap();
        let input = temp.path().join("input");
        let output = temp.path().join("output");

        touch(&input.join("real.jpg"));
        std::os::unix::fs::symlink(input.join("real.jpg"), input.join("link.jpg")).unwrap();

        let tasks = enumerate_tasks(&input, &output).unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].source, input.join("real.jpg"));
    }

    #[test]
    fn test_missing_input_is_fatal() {
        let temp = TempDir::new().unwrap();
        let result = enumerate_tasks(&temp.path().join("nope"), &temp.path().join("out"));
        assert!(matches!(result, Err(EnumerateError::InputMissing(_))));
    }

    #[test]
    fn test_input_must_be_directory() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("file.jpg");
        touch(&file);

        let result = enumerate_tasks(&file, &temp.path().join("out"));
        assert!(matches!(result, Err(EnumerateError::NotADirectory(_))));
    }

    #[test]
    fn test_shuffle_keeps_every_task() {
        let temp = TempDir::new().unwrap();
        let input = temp.path().join("input");
        let output = temp.path().join("output");
        for n in 0..20 {
            touch(&input.join(format!("{}.jpg", n)));
        }

        let mut tasks = enumerate_tasks(&input, &output).unwrap();
        let before: HashSet<_> = tasks.iter().cloned().collect();
        shuffle_tasks(&mut tasks);
        let after: HashSet<_> = tasks.iter().cloned().collect();
        assert_eq!(before, after);
    }
}
