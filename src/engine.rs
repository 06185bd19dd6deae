//! Batch processing engine for background removal.

use std::fs;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use image::{ImageFormat, RgbaImage};
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::flood;

/// Default near-black threshold. Higher removes more dark pixels.
pub const DEFAULT_THRESHOLD: u8 = 18;

/// Options controlling background removal behavior.
#[derive(Debug, Clone)]
pub struct ProcessOptions {
    /// Near-black threshold (0-255), inclusive upper bound per channel.
    pub threshold: u8,
    /// Scan and report changes without writing files.
    pub dry_run: bool,
    /// Copy originals here (mirroring relative paths) before overwriting.
    pub backup_dir: Option<PathBuf>,
    /// Write outputs here instead of in-place.
    pub output_dir: Option<PathBuf>,
    /// Enable verbose logging.
    pub verbose: bool,
    /// Suppress non-error output.
    pub quiet: bool,
}

impl Default for ProcessOptions {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            dry_run: false,
            backup_dir: None,
            output_dir: None,
            verbose: false,
            quiet: false,
        }
    }
}

/// Result of processing a single image file.
#[derive(Debug)]
pub struct ProcessResult {
    /// Path of the processed file.
    pub path: PathBuf,
    /// Whether processing succeeded.
    pub success: bool,
    /// Whether the file was left untouched (no background found).
    pub skipped: bool,
    /// Number of pixels whose alpha was cleared.
    pub pixels_cleared: u64,
    /// Human-readable status message.
    pub message: String,
}

/// The cleanup engine holding the per-run options.
///
/// Create once with [`CleanupEngine::new()`] and reuse for multiple images;
/// each image is processed as an independent unit with private state.
pub struct CleanupEngine {
    opts: ProcessOptions,
}

impl CleanupEngine {
    /// Create a new engine from the given options.
    #[must_use]
    pub fn new(opts: ProcessOptions) -> Self {
        Self { opts }
    }

    /// Process a single image file: load, flood-fill, back up, save.
    ///
    /// `rel` is the path used to mirror the file under the backup and output
    /// directories; for a standalone file this is just its file name.
    ///
    /// Files where no border-connected background is found are reported as
    /// skipped and never rewritten. Returns a [`ProcessResult`] indicating
    /// success, skip, or failure; errors never propagate past the file.
    #[must_use]
    pub fn process_file(&self, input: &Path, rel: &Path) -> ProcessResult {
        let mut result = ProcessResult {
            path: input.to_path_buf(),
            success: false,
            skipped: false,
            pixels_cleared: 0,
            message: String::new(),
        };

        // Load image
        let decoded = match image::open(input) {
            Ok(img) => img,
            Err(e) => {
                result.message = format!("Failed to load: {e}");
                return result;
            }
        };

        let mut rgba = decoded.into_rgba8();
        let cleared = flood::remove_border_background(&mut rgba, self.opts.threshold);
        result.pixels_cleared = cleared;

        if cleared == 0 {
            result.skipped = true;
            result.success = true;
            result.message = "No border-connected background found".to_string();
            return result;
        }

        if self.opts.dry_run {
            result.success = true;
            result.message = format!("Would clear {cleared} background pixels (dry run)");
            return result;
        }

        if let Some(backup_dir) = &self.opts.backup_dir {
            if let Err(e) = backup_file(input, rel, backup_dir) {
                result.message = format!("Failed to back up: {e}");
                return result;
            }
        }

        let dest = match &self.opts.output_dir {
            Some(dir) => dir.join(rel),
            None => input.to_path_buf(),
        };

        match save_image(&rgba, &dest) {
            Ok(()) => {
                result.success = true;
                result.message = format!("Cleared {cleared} background pixels");
            }
            Err(e) => {
                result.message = format!("Failed to save: {e}");
            }
        }

        result
    }

    /// Process all supported images under a directory, recursively.
    ///
    /// Uses parallel iteration when the `cli` feature is enabled (via rayon);
    /// each image's grid and visited mask are private, so images are fully
    /// independent units. Returns a [`ProcessResult`] per image found, in a
    /// deterministic order.
    #[must_use]
    pub fn process_directory(&self, input_dir: &Path) -> Vec<ProcessResult> {
        let files: Vec<PathBuf> = WalkDir::new(input_dir)
            .sort_by_file_name()
            .into_iter()
            .filter_map(std::result::Result::ok)
            .filter(|e| e.file_type().is_file())
            .map(walkdir::DirEntry::into_path)
            .filter(|p| is_supported_image(p))
            .collect();

        #[cfg(feature = "cli")]
        {
            use rayon::prelude::*;
            files
                .par_iter()
                .map(|path| self.process_entry(path, input_dir))
                .collect()
        }

        #[cfg(not(feature = "cli"))]
        {
            files
                .iter()
                .map(|path| self.process_entry(path, input_dir))
                .collect()
        }
    }

    fn process_entry(&self, path: &Path, input_dir: &Path) -> ProcessResult {
        let rel = path.strip_prefix(input_dir).unwrap_or(path);
        self.process_file(path, rel)
    }
}

/// Check if a file has a supported image extension (the lossless formats an
/// app resource tree carries).
#[must_use]
pub fn is_supported_image(path: &Path) -> bool {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => matches!(ext.to_lowercase().as_str(), "png" | "webp"),
        None => false,
    }
}

/// Copy `src` to `backup_dir/rel`, creating parent directories.
///
/// An existing backup is never overwritten: the first backup wins, so
/// repeated runs keep the true original.
///
/// # Errors
///
/// Returns an error if the copy or directory creation fails.
pub fn backup_file(src: &Path, rel: &Path, backup_dir: &Path) -> Result<()> {
    let dst = backup_dir.join(rel);
    if dst.exists() {
        return Ok(());
    }
    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::copy(src, &dst)?;
    Ok(())
}

/// Save an RGBA image losslessly, creating parent directories.
///
/// The flood fill relies on alpha surviving bit-exact (a second pass must
/// find nothing left to clear), so only lossless target formats are allowed.
///
/// # Errors
///
/// Returns an error if the format is unsupported or writing fails.
pub fn save_image(img: &RgbaImage, path: &Path) -> Result<()> {
    let format =
        ImageFormat::from_path(path).map_err(|e| Error::UnsupportedFormat(e.to_string()))?;

    if let Some(parent) = path.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }

    write_lossless(img, path, format)
}

/// Encode to an explicit format, regardless of the destination extension.
pub(crate) fn write_lossless(img: &RgbaImage, path: &Path, format: ImageFormat) -> Result<()> {
    match format {
        ImageFormat::Png | ImageFormat::WebP => {
            let file = fs::File::create(path)?;
            let mut writer = BufWriter::new(file);
            img.write_to(&mut writer, format)?;
        }
        _ => {
            return Err(Error::UnsupportedFormat(format!("{format:?}")));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn ringed_icon() -> RgbaImage {
        // Black matte ring around an opaque white 3x3 center.
        let mut img = RgbaImage::from_pixel(5, 5, Rgba([0, 0, 0, 255]));
        for y in 1..4 {
            for x in 1..4 {
                img.put_pixel(x, y, Rgba([255, 255, 255, 255]));
            }
        }
        img
    }

    #[test]
    fn is_supported_image_accepts_resource_formats() {
        assert!(is_supported_image(Path::new("ic_food_apple.webp")));
        assert!(is_supported_image(Path::new("icon.PNG")));
    }

    #[test]
    fn is_supported_image_rejects_other_formats() {
        assert!(!is_supported_image(Path::new("photo.jpg")));
        assert!(!is_supported_image(Path::new("notes.txt")));
        assert!(!is_supported_image(Path::new("icon")));
    }

    #[test]
    fn backup_file_keeps_the_first_copy() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("icon.png");
        let backups = dir.path().join("backups");

        fs::write(&src, b"original").unwrap();
        backup_file(&src, Path::new("icon.png"), &backups).unwrap();

        fs::write(&src, b"modified").unwrap();
        backup_file(&src, Path::new("icon.png"), &backups).unwrap();

        let stored = fs::read(backups.join("icon.png")).unwrap();
        assert_eq!(stored, b"original");
    }

    #[test]
    fn save_image_rejects_lossy_formats() {
        let img = RgbaImage::new(1, 1);
        let err = save_image(&img, Path::new("/tmp/out.jpg")).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat(_)));
    }

    #[test]
    fn process_file_clears_matte_and_writes_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("icon.png");
        ringed_icon().save(&path).unwrap();

        let engine = CleanupEngine::new(ProcessOptions::default());
        let result = engine.process_file(&path, Path::new("icon.png"));
        assert!(result.success, "{}", result.message);
        assert!(!result.skipped);
        assert_eq!(result.pixels_cleared, 16);

        let rewritten = image::open(&path).unwrap().into_rgba8();
        assert_eq!(rewritten.get_pixel(0, 0).0[3], 0);
        assert_eq!(rewritten.get_pixel(2, 2).0, [255, 255, 255, 255]);
    }

    #[test]
    fn process_file_dry_run_leaves_the_file_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("icon.png");
        ringed_icon().save(&path).unwrap();
        let before = fs::read(&path).unwrap();

        let opts = ProcessOptions {
            dry_run: true,
            ..ProcessOptions::default()
        };
        let result = CleanupEngine::new(opts).process_file(&path, Path::new("icon.png"));
        assert!(result.success);
        assert_eq!(result.pixels_cleared, 16);
        assert_eq!(fs::read(&path).unwrap(), before);
    }

    #[test]
    fn process_file_skips_images_without_background() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clean.png");
        RgbaImage::from_pixel(4, 4, Rgba([255, 255, 255, 255]))
            .save(&path)
            .unwrap();
        let before = fs::read(&path).unwrap();

        let engine = CleanupEngine::new(ProcessOptions::default());
        let result = engine.process_file(&path, Path::new("clean.png"));
        assert!(result.success);
        assert!(result.skipped);
        assert_eq!(result.pixels_cleared, 0);
        assert_eq!(fs::read(&path).unwrap(), before);
    }

    #[test]
    fn process_file_reports_unreadable_input_as_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.png");
        fs::write(&path, b"not a png").unwrap();

        let engine = CleanupEngine::new(ProcessOptions::default());
        let result = engine.process_file(&path, Path::new("broken.png"));
        assert!(!result.success);
        assert!(result.message.contains("Failed to load"));
    }
}
