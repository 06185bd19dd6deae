use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use walkdir::WalkDir;

use icon_cleanup::{
    bytes_human, compress_file, is_supported_image, CleanupEngine, CompressOptions,
    ProcessOptions, ProcessResult, DEFAULT_THRESHOLD,
};

#[derive(Parser)]
#[command(
    name = "icon-cleanup",
    about = "Batch-clean icon assets: background removal and recompression",
    version,
    after_help = "Simple usage: icon-cleanup remove res/drawable-nodpi  (clean a folder in-place, with backups)"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Remove near-black background connected to the image border
    Remove {
        /// Input image file or directory
        input: PathBuf,

        /// Write outputs here instead of in-place
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Near-black threshold (0-255); higher removes more dark pixels
        #[arg(short, long, default_value_t = DEFAULT_THRESHOLD)]
        threshold: u8,

        /// Scan and report changes without writing files
        #[arg(long)]
        dry_run: bool,

        /// Copy originals here before overwriting (empty string disables backups)
        #[arg(long, default_value = "_icon_backups")]
        backup_dir: String,

        /// Enable verbose output
        #[arg(short, long)]
        verbose: bool,

        /// Suppress all non-error output
        #[arg(short, long)]
        quiet: bool,
    },

    /// Recompress assets losslessly, capping the longest side
    Compress {
        /// Input image file or directory
        input: PathBuf,

        /// Longest-side cap in pixels (0 disables resizing)
        #[arg(short, long, default_value_t = 1536)]
        max_dimension: u32,

        /// Copy originals here before overwriting (empty string disables backups)
        #[arg(long, default_value = "_icon_backups")]
        backup_dir: String,

        /// Suppress all non-error output
        #[arg(short, long)]
        quiet: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    let exit_code = match cli.command {
        Commands::Remove {
            input,
            output,
            threshold,
            dry_run,
            backup_dir,
            verbose,
            quiet,
        } => {
            let opts = ProcessOptions {
                threshold,
                dry_run,
                backup_dir: if backup_dir.is_empty() {
                    None
                } else {
                    Some(PathBuf::from(backup_dir))
                },
                output_dir: output,
                verbose,
                quiet,
            };
            run_remove(&input, opts)
        }
        Commands::Compress {
            input,
            max_dimension,
            backup_dir,
            quiet,
        } => {
            let opts = CompressOptions {
                max_dimension,
                backup_dir: if backup_dir.is_empty() {
                    None
                } else {
                    Some(PathBuf::from(backup_dir))
                },
            };
            run_compress(&input, &opts, quiet)
        }
    };

    if exit_code != 0 {
        process::exit(exit_code);
    }
}

fn run_remove(input: &Path, opts: ProcessOptions) -> i32 {
    if !input.exists() {
        eprintln!("Error: Input path does not exist: {}", input.display());
        return 1;
    }

    let engine = CleanupEngine::new(opts.clone());

    let results = if input.is_dir() {
        engine.process_directory(input)
    } else {
        let Some(filename) = input.file_name() else {
            eprintln!("Error: Input path has no file name: {}", input.display());
            return 1;
        };
        vec![engine.process_file(input, filename.as_ref())]
    };

    let mut changed_count = 0u64;
    let mut fail_count = 0u64;
    let mut total_cleared = 0u64;

    for r in &results {
        print_result(r, &opts);
        if !r.success {
            fail_count += 1;
        } else if !r.skipped {
            changed_count += 1;
            total_cleared += r.pixels_cleared;
        }
    }

    if !opts.quiet {
        let mode = if opts.dry_run { "DRY RUN" } else { "DONE" };
        eprintln!();
        eprintln!(
            "{mode}: changed {changed_count}/{} files, total pixels cleared: {total_cleared}",
            results.len()
        );
    }

    i32::from(fail_count > 0)
}

fn print_result(result: &ProcessResult, opts: &ProcessOptions) {
    let filename = result.path.file_name().map_or_else(
        || result.path.display().to_string(),
        |f| f.to_string_lossy().to_string(),
    );

    if result.skipped {
        if opts.verbose {
            eprintln!("[SKIP] {filename}: {}", result.message);
        }
    } else if result.success {
        if !opts.quiet {
            eprintln!("[OK] {filename}: {}", result.message);
        }
    } else {
        eprintln!("[FAIL] {filename}: {}", result.message);
    }
}

fn run_compress(input: &Path, opts: &CompressOptions, quiet: bool) -> i32 {
    if !input.exists() {
        eprintln!("Error: Input path does not exist: {}", input.display());
        return 1;
    }

    let files: Vec<PathBuf> = if input.is_dir() {
        WalkDir::new(input)
            .sort_by_file_name()
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file())
            .map(walkdir::DirEntry::into_path)
            .filter(|p| is_supported_image(p))
            .collect()
    } else {
        vec![input.to_path_buf()]
    };

    if files.is_empty() {
        eprintln!("No supported images found under {}", input.display());
        return 0;
    }

    let mut total_before = 0u64;
    let mut total_after = 0u64;
    let mut changed_count = 0u64;
    let mut fail_count = 0u64;

    for path in &files {
        let rel = if input.is_dir() {
            path.strip_prefix(input).unwrap_or(path)
        } else {
            path.file_name().map_or(path.as_path(), |f| Path::new(f))
        };
        match compress_file(path, rel, opts) {
            Ok(outcome) => {
                total_before += outcome.bytes_before;
                total_after += outcome.bytes_after;
                if outcome.changed {
                    changed_count += 1;
                    if !quiet {
                        eprintln!(
                            "[OK] {}: {} -> {}",
                            path.display(),
                            bytes_human(outcome.bytes_before),
                            bytes_human(outcome.bytes_after)
                        );
                    }
                }
            }
            Err(e) => {
                fail_count += 1;
                eprintln!("[FAIL] {}: {e}", path.display());
            }
        }
    }

    if !quiet {
        let saved = total_before.saturating_sub(total_after);
        #[allow(clippy::cast_precision_loss)]
        let pct = if total_before > 0 {
            saved as f64 / total_before as f64 * 100.0
        } else {
            0.0
        };
        eprintln!();
        eprintln!("Scanned: {} files", files.len());
        eprintln!("Changed: {changed_count}");
        eprintln!("Before:  {}", bytes_human(total_before));
        eprintln!("After:   {}", bytes_human(total_after));
        eprintln!("Saved:   {} ({pct:.1}%)", bytes_human(saved));
    }

    i32::from(fail_count > 0)
}
