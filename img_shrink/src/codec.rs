//! The per-file conversion capability.
//!
//! A JPEG wider than the configured maximum is downscaled and re-encoded;
//! everything else, and every failure, falls back to a byte-for-byte copy.
//! The fallback keeps the output tree complete: a file that cannot be
//! shrunk still shows up at its mirrored path.

use anyhow::{Context, Result};
use filetime::FileTime;
use image::imageops::FilterType;
use std::fs;
use std::io::Cursor;
use std::path::Path;

/// Re-encode quality for downscaled JPEGs.
pub const JPEG_QUALITY: u8 = 95;

const JPEG_EXTENSIONS: &[&str] = &["jpg", "jpeg"];

/// What `convert_or_copy` did with one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecOutcome {
    /// Downscaled and re-encoded.
    Resized { from_width: u32, to_width: u32 },
    /// Byte-for-byte copy (non-JPEG, already narrow enough, or fallback
    /// after a decode/encode failure).
    Copied,
}

/// Convert `source` into `destination`, resizing when possible.
///
/// The destination's parent directory is created if absent. A JPEG wider
/// than `max_width` is downscaled proportionally (Lanczos) and re-encoded
/// at [`JPEG_QUALITY`]; anything else is copied unchanged. Decode or encode
/// failures are logged at warn and recovered with a copy, so the only error
/// this returns is a copy that itself failed. The source's modification
/// time is carried over to the output.
pub fn convert_or_copy(source: &Path, destination: &Path, max_width: u32) -> Result<CodecOutcome> {
    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }

    if has_jpeg_extension(source) {
        match resize_jpeg(source, destination, max_width) {
            Ok(Some(outcome)) => {
                preserve_mtime(source, destination);
                return Ok(outcome);
            }
            Ok(None) => {
                tracing::debug!(
                    source = %source.display(),
                    "width within limit, copying unchanged"
                );
            }
            Err(e) => {
                tracing::warn!(
                    source = %source.display(),
                    error = %e,
                    "resize failed, falling back to copy"
                );
            }
        }
    } else {
        tracing::debug!(source = %source.display(), "not a jpeg, copying unchanged");
    }

    fs::copy(source, destination).with_context(|| {
        format!(
            "failed to copy {} to {}",
            source.display(),
            destination.display()
        )
    })?;
    preserve_mtime(source, destination);
    Ok(CodecOutcome::Copied)
}

fn has_jpeg_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| JPEG_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Returns `Ok(None)` when the image is already narrow enough.
///
/// Encoding goes through an in-memory buffer; the destination is written in
/// one shot, so a failed encode never leaves a truncated file behind.
fn resize_jpeg(source: &Path, destination: &Path, max_width: u32) -> Result<Option<CodecOutcome>> {
    let img = image::open(source).context("decode failed")?;
    let (width, height) = (img.width(), img.height());
    if width <= max_width {
        return Ok(None);
    }

    let ratio = max_width as f64 / width as f64;
    let new_height = ((height as f64 * ratio) as u32).max(1);
    let resized = img.resize_exact(max_width, new_height, FilterType::Lanczos3);

    let mut encoded = Vec::new();
    let encoder =
        image::codecs::jpeg::JpegEncoder::new_with_quality(Cursor::new(&mut encoded), JPEG_QUALITY);
    resized
        .write_with_encoder(encoder)
        .context("jpeg encode failed")?;
    fs::write(destination, &encoded)
        .with_context(|| format!("failed to write {}", destination.display()))?;

    Ok(Some(CodecOutcome::Resized {
        from_width: width,
        to_width: max_width,
    }))
}

fn preserve_mtime(source: &Path, destination: &Path) {
    if let Ok(meta) = fs::metadata(source) {
        let mtime = FileTime::from_last_modification_time(&meta);
        if let Err(e) = filetime::set_file_mtime(destination, mtime) {
            tracing::debug!(
                destination = %destination.display(),
                error = %e,
                "could not preserve mtime"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, RgbImage};
    use tempfile::TempDir;

    fn write_jpeg(path: &Path, width: u32, height: u32) {
        let img = RgbImage::from_pixel(width, height, image::Rgb([180, 40, 40]));
        DynamicImage::ImageRgb8(img).save(path).unwrap();
    }

    #[test]
    fn test_wide_jpeg_is_resized() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("wide.jpg");
        let dest = temp.path().join("out/wide.jpg");
        write_jpeg(&source, 100, 40);

        let outcome = convert_or_copy(&source, &dest, 50).unwrap();
        assert_eq!(
            outcome,
            CodecOutcome::Resized {
                from_width: 100,
                to_width: 50
            }
        );

        let written = image::open(&dest).unwrap();
        assert_eq!(written.width(), 50);
        assert_eq!(written.height(), 20);
    }

    #[test]
    fn test_narrow_jpeg_is_copied_verbatim() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("narrow.jpg");
        let dest = temp.path().join("narrow-out.jpg");
        write_jpeg(&source, 30, 30);

        let outcome = convert_or_copy(&source, &dest, 50).unwrap();
        assert_eq!(outcome, CodecOutcome::Copied);
        assert_eq!(fs::read(&source).unwrap(), fs::read(&dest).unwrap());
    }

    #[test]
    fn test_non_jpeg_is_copied_verbatim() {
        let temp = TempDir::new().unwrap();
        for name in ["pic.png", "notes.txt"] {
            let source = temp.path().join(name);
            let dest = temp.path().join(format!("out-{}", name));
            fs::write(&source, name.as_bytes()).unwrap();

            let outcome = convert_or_copy(&source, &dest, 50).unwrap();
            assert_eq!(outcome, CodecOutcome::Copied);
            assert_eq!(fs::read(&source).unwrap(), fs::read(&dest).unwrap());
        }
    }

    #[test]
    fn test_undecodable_jpeg_falls_back_to_copy() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("broken.jpg");
        let dest = temp.path().join("broken-out.jpg");
        fs::write(&source, b"this is not a jpeg").unwrap();

        let outcome = convert_or_copy(&source, &dest, 50).unwrap();
        assert_eq!(outcome, CodecOutcome::Copied);
        assert_eq!(fs::read(&source).unwrap(), fs::read(&dest).unwrap());
    }

    #[test]
    fn test_creates_destination_parents() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("a.txt");
        let dest = temp.path().join("deep/tree/of/dirs/a.txt");
        fs::write(&source, b"data").unwrap();

        convert_or_copy(&source, &dest, 50).unwrap();
        assert!(dest.exists());
    }

    #[test]
    fn test_missing_source_is_an_error() {
        let temp = TempDir::new().unwrap();
        let result = convert_or_copy(
            &temp.path().join("gone.txt"),
            &temp.path().join("out.txt"),
            50,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_mtime_preserved() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("old.txt");
        let dest = temp.path().join("old-out.txt");
        fs::write(&source, b"data").unwrap();
        let past = FileTime::from_unix_time(1_500_000_000, 0);
        filetime::set_file_mtime(&source, past).unwrap();

        convert_or_copy(&source, &dest, 50).unwrap();
        let meta = fs::metadata(&dest).unwrap();
        assert_eq!(FileTime::from_last_modification_time(&meta), past);
    }
}
