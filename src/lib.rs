//! Batch-clean icon assets for an application's resource tree.
//!
//! Icons exported on a black matte get their background removed by a flood
//! fill seeded from the image border: near-black pixels connected to the
//! border become fully transparent, while dark detail enclosed inside the
//! icon (pupils, ink outlines) is preserved. Oversized assets can also be
//! scaled down to a longest-side cap and re-encoded losslessly.
//!
//! # Quick Start
//!
//! ```no_run
//! use icon_cleanup::remove_border_background;
//!
//! let mut img = image::open("ic_food_apple.webp").unwrap().into_rgba8();
//! let cleared = remove_border_background(&mut img, 18);
//! println!("cleared {cleared} background pixels");
//! ```
//!
//! # Batch processing
//!
//! The [`CleanupEngine`] processes files and whole directories, with backup
//! copies, dry-run reporting, and in-place or output-directory destinations:
//!
//! ```no_run
//! use icon_cleanup::{CleanupEngine, ProcessOptions};
//!
//! let engine = CleanupEngine::new(ProcessOptions::default());
//! let results = engine.process_directory("res/drawable-nodpi".as_ref());
//! for r in &results {
//!     println!("{}: {}", r.path.display(), r.message);
//! }
//! ```

#![deny(missing_docs)]

pub mod compress;
mod engine;
pub mod error;
pub mod flood;

pub use compress::{bytes_human, compress_file, CompressOptions, CompressOutcome};
pub use engine::{
    backup_file, is_supported_image, save_image, CleanupEngine, ProcessOptions, ProcessResult,
    DEFAULT_THRESHOLD,
};
pub use error::{Error, Result};
pub use flood::{is_near_black, remove_border_background};
