//! Size-capped lossless recompression of icon assets.
//!
//! Source exports are often much larger than any phone ever renders them.
//! This module scales an image down so its longest side fits a configurable
//! cap, re-encodes it losslessly, and replaces the original file only when
//! the rewrite is smaller (or a resize happened, which always pays off once
//! the oversized pixels are gone).

use std::fs;
use std::path::{Path, PathBuf};

use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};

use crate::engine::{backup_file, write_lossless};
use crate::error::{Error, Result};

/// Options controlling recompression.
#[derive(Debug, Clone)]
pub struct CompressOptions {
    /// Longest-side cap in pixels; larger images are scaled down to fit.
    pub max_dimension: u32,
    /// Copy originals here (mirroring relative paths) before overwriting.
    pub backup_dir: Option<PathBuf>,
}

impl Default for CompressOptions {
    fn default() -> Self {
        Self {
            max_dimension: 1536,
            backup_dir: None,
        }
    }
}

/// Outcome of recompressing a single file.
#[derive(Debug, Clone, Copy)]
pub struct CompressOutcome {
    /// File size before, in bytes.
    pub bytes_before: u64,
    /// File size after, in bytes (equals `bytes_before` when unchanged).
    pub bytes_after: u64,
    /// Whether the file on disk was replaced.
    pub changed: bool,
}

/// Scale an image down so its longest side is at most `max_dimension`.
///
/// Uses a Lanczos filter and preserves aspect ratio. Returns the (possibly
/// unchanged) image and whether a resize happened. A cap of 0 disables
/// resizing entirely.
#[must_use]
pub fn shrink_to_fit(image: DynamicImage, max_dimension: u32) -> (DynamicImage, bool) {
    let (w, h) = (image.width(), image.height());
    if max_dimension == 0 || w.max(h) <= max_dimension {
        return (image, false);
    }
    let resized = image.resize(max_dimension, max_dimension, FilterType::Lanczos3);
    (resized, true)
}

/// Recompress one file in place.
///
/// Decodes, shrinks to the cap, re-encodes losslessly next to the original
/// (`name.ext.tmp`), then replaces the original only when the rewrite is
/// smaller or a resize happened. Before a replacement the original is copied
/// into the backup directory (if one is configured) under `rel`, the same
/// relative-path mirroring the removal engine uses. Alpha is preserved
/// bit-exact.
///
/// # Errors
///
/// Returns an error if the file cannot be decoded, the format does not
/// support lossless output, or a filesystem operation fails.
pub fn compress_file(path: &Path, rel: &Path, opts: &CompressOptions) -> Result<CompressOutcome> {
    let format = ImageFormat::from_path(path).map_err(|e| Error::UnsupportedFormat(e.to_string()))?;
    let bytes_before = fs::metadata(path)?.len();

    let decoded = image::open(path)?;
    let (shrunk, resized) = shrink_to_fit(decoded, opts.max_dimension);

    let ext = path
        .extension()
        .map_or_else(String::new, |e| e.to_string_lossy().into_owned());
    let tmp = path.with_extension(format!("{ext}.tmp"));
    let rgba = shrunk.into_rgba8();
    if let Err(e) = write_lossless(&rgba, &tmp, format) {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }

    let bytes_after = fs::metadata(&tmp)?.len();
    if bytes_after < bytes_before || resized {
        if let Some(backup_dir) = &opts.backup_dir {
            if let Err(e) = backup_file(path, rel, backup_dir) {
                let _ = fs::remove_file(&tmp);
                return Err(e);
            }
        }
        fs::rename(&tmp, path)?;
        Ok(CompressOutcome {
            bytes_before,
            bytes_after,
            changed: true,
        })
    } else {
        fs::remove_file(&tmp)?;
        Ok(CompressOutcome {
            bytes_before,
            bytes_after: bytes_before,
            changed: false,
        })
    }
}

/// Format a byte count for human consumption.
#[must_use]
pub fn bytes_human(n: u64) -> String {
    if n < 1024 {
        return format!("{n} B");
    }
    #[allow(clippy::cast_precision_loss)]
    let mut value = n as f64 / 1024.0;
    for unit in ["KB", "MB"] {
        if value < 1024.0 {
            return format!("{value:.2} {unit}");
        }
        value /= 1024.0;
    }
    format!("{value:.2} GB")
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn shrink_is_a_no_op_within_the_cap() {
        let img = DynamicImage::ImageRgba8(RgbaImage::new(100, 50));
        let (out, resized) = shrink_to_fit(img, 100);
        assert!(!resized);
        assert_eq!((out.width(), out.height()), (100, 50));
    }

    #[test]
    fn shrink_caps_the_longest_side_and_keeps_aspect() {
        let img = DynamicImage::ImageRgba8(RgbaImage::new(200, 100));
        let (out, resized) = shrink_to_fit(img, 100);
        assert!(resized);
        assert_eq!((out.width(), out.height()), (100, 50));
    }

    #[test]
    fn shrink_cap_zero_disables_resizing() {
        let img = DynamicImage::ImageRgba8(RgbaImage::new(4096, 4096));
        let (out, resized) = shrink_to_fit(img, 0);
        assert!(!resized);
        assert_eq!(out.width(), 4096);
    }

    #[test]
    fn bytes_human_picks_sane_units() {
        assert_eq!(bytes_human(0), "0 B");
        assert_eq!(bytes_human(1023), "1023 B");
        assert_eq!(bytes_human(1024), "1.00 KB");
        assert_eq!(bytes_human(1536), "1.50 KB");
        assert_eq!(bytes_human(5 * 1024 * 1024), "5.00 MB");
        assert_eq!(bytes_human(3 * 1024 * 1024 * 1024), "3.00 GB");
    }

    #[test]
    fn compress_file_resizes_oversized_images_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.png");
        let img = RgbaImage::from_pixel(64, 32, Rgba([90, 120, 30, 255]));
        img.save(&path).unwrap();

        let opts = CompressOptions {
            max_dimension: 16,
            ..CompressOptions::default()
        };
        let outcome = compress_file(&path, Path::new("big.png"), &opts).unwrap();
        assert!(outcome.changed);

        let reloaded = image::open(&path).unwrap();
        assert_eq!((reloaded.width(), reloaded.height()), (16, 8));
        assert!(!path.with_extension("png.tmp").exists());
    }

    #[test]
    fn compress_file_backs_up_the_original_before_replacing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.png");
        let backups = dir.path().join("backups");
        RgbaImage::from_pixel(64, 32, Rgba([90, 120, 30, 255]))
            .save(&path)
            .unwrap();
        let original = fs::read(&path).unwrap();

        let opts = CompressOptions {
            max_dimension: 16,
            backup_dir: Some(backups.clone()),
        };
        let outcome = compress_file(&path, Path::new("big.png"), &opts).unwrap();
        assert!(outcome.changed);

        assert_eq!(fs::read(backups.join("big.png")).unwrap(), original);
        assert_ne!(fs::read(&path).unwrap(), original);
    }

    #[test]
    fn compress_file_skips_the_backup_when_nothing_changes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("small.png");
        let backups = dir.path().join("backups");
        RgbaImage::from_pixel(8, 8, Rgba([90, 120, 30, 255]))
            .save(&path)
            .unwrap();

        let opts = CompressOptions {
            max_dimension: 1536,
            backup_dir: Some(backups.clone()),
        };
        let outcome = compress_file(&path, Path::new("small.png"), &opts).unwrap();
        assert!(!outcome.changed);
        assert!(!backups.exists());
    }

    #[test]
    fn compress_file_rejects_unknown_extensions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("asset.xyz");
        fs::write(&path, b"not an image").unwrap();

        let err = compress_file(&path, Path::new("asset.xyz"), &CompressOptions::default())
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat(_)));
    }
}
