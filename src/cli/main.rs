//! bgtouch CLI tool
//!
//! `remove` runs an external background-removal tool over a set of images;
//! `erase` touches up one image headlessly by flood-fill selecting and
//! deleting regions at given pixel coordinates.

use super::config::CliConfigBuilder;
use super::progress::ProgressBarReporter;
use crate::{
    batch::BatchProcessor,
    services::ImageIOService,
    session::{EditOutcome, EditSession},
    tracing_config::{spans, TracingConfig, TracingFormat},
    types::{ImagePoint, SelectionMask},
};
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use image::{DynamicImage, RgbImage};
use log::{info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::Instrument;

/// Batch background removal and flood-fill touch-up
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "bgtouch")]
pub struct Cli {
    /// Enable verbose logging (-v: DEBUG, -vv: TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Plain log output without colors
    #[arg(long, global = true)]
    pub plain: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Remove backgrounds from images with an external tool
    Remove(RemoveArgs),
    /// Select regions by color and erase them to the fill color
    ///
    /// Images are edited as opaque RGB: transparency in the input is lost,
    /// including when IMAGE is overwritten in place.
    Erase(EraseArgs),
}

#[derive(Args, Debug)]
pub struct RemoveArgs {
    /// Input image files or directories
    #[arg(value_name = "INPUT", required = true)]
    pub input: Vec<String>,

    /// Process directories recursively
    #[arg(short, long)]
    pub recursive: bool,

    /// Pattern for directory inputs (e.g., "*.jpg")
    #[arg(long)]
    pub pattern: Option<String>,

    /// Maximum concurrent removals (0 = available parallelism)
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Background-removal program [default: rembg]
    #[arg(long, value_name = "PROGRAM")]
    pub tool: Option<String>,

    /// Argument template for the program; {input} and {output} are substituted
    #[arg(long = "tool-arg", value_name = "ARG", allow_hyphen_values = true)]
    pub tool_args: Vec<String>,

    /// Subfolder created next to each input for its output [default: Remove_background]
    #[arg(long)]
    pub subfolder: Option<String>,

    /// Output file extension [default: png]
    #[arg(long)]
    pub extension: Option<String>,

    /// JSON batch configuration file
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Write a JSON summary of the batch
    #[arg(long, value_name = "FILE")]
    pub report: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct EraseArgs {
    /// Image to touch up
    #[arg(value_name = "IMAGE")]
    pub image: PathBuf,

    /// Pixel to select and erase from, as X,Y (repeatable, applied in order)
    #[arg(long = "at", value_name = "X,Y", required = true, value_parser = parse_point)]
    pub points: Vec<ImagePoint>,

    /// Lab color tolerance [default: 20]
    #[arg(short, long)]
    pub tolerance: Option<f32>,

    /// Output file [default: overwrite IMAGE, dropping any alpha channel]
    #[arg(short, long, value_name = "OUTPUT")]
    pub output: Option<PathBuf>,

    /// Fill color as R,G,B [default: 255,255,255]
    #[arg(long, value_name = "R,G,B", value_parser = parse_color)]
    pub fill: Option<[u8; 3]>,

    /// Preview highlight color as R,G,B [default: 255,0,0]
    #[arg(long, value_name = "R,G,B", value_parser = parse_color)]
    pub highlight: Option<[u8; 3]>,

    /// Write the highlighted preview of the last selection
    #[arg(long, value_name = "FILE")]
    pub preview: Option<PathBuf>,

    /// Write the last selection as a grayscale mask
    #[arg(long, value_name = "FILE")]
    pub mask: Option<PathBuf>,

    /// JSON editor configuration file
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

pub async fn main() -> Result<()> {
    let cli = Cli::parse();

    let format = if cli.plain {
        TracingFormat::Compact
    } else {
        TracingFormat::Console
    };
    TracingConfig::new()
        .with_verbosity(cli.verbose)
        .with_format(format)
        .init()
        .context("Failed to initialize tracing")?;

    match &cli.command {
        Command::Remove(args) => run_remove(args).await,
        Command::Erase(args) => run_erase(args),
    }
}

async fn run_remove(args: &RemoveArgs) -> Result<()> {
    let config = CliConfigBuilder::batch_config(args)?;
    let remover = CliConfigBuilder::remover(args);

    let files = collect_inputs(
        &args.input,
        args.recursive,
        args.pattern.as_deref(),
        Some(&config.output_subfolder),
    )?;
    if files.is_empty() {
        warn!("No supported image files found in the provided inputs");
        return Ok(());
    }
    info!("Found {} image file(s) to process", files.len());

    let span = spans::batch_processing(files.len(), remover.program());
    let processor = BatchProcessor::new(Arc::new(remover), config)
        .context("Failed to create batch processor")?
        .with_reporter(Arc::new(ProgressBarReporter::new()));

    let summary = processor
        .run(&files)
        .instrument(span)
        .await
        .context("Failed to plan batch")?;

    info!("Batch processing summary:");
    info!("  Files processed: {}", summary.succeeded());
    info!("  Files failed: {}", summary.failed());
    info!("  Total time: {:.2}s", summary.elapsed_ms as f64 / 1000.0);
    if summary.failed() > 0 {
        warn!(
            "Some files failed to process. Processed: {}, Failed: {}",
            summary.succeeded(),
            summary.failed()
        );
    }
    if let Some(first) = summary.first_output() {
        info!("Touch up with: bgtouch erase {} --at X,Y", first.display());
    }

    if let Some(report) = &args.report {
        summary
            .write_json(report)
            .with_context(|| format!("Failed to write report {}", report.display()))?;
        info!("Wrote batch report to {}", report.display());
    }

    Ok(())
}

fn run_erase(args: &EraseArgs) -> Result<()> {
    let config = CliConfigBuilder::editor_config(args)?;
    let span = spans::touch_up(&args.image, args.points.len());
    let _entered = span.enter();

    let mut session = EditSession::new(config)?;
    session
        .open(&args.image)
        .with_context(|| format!("Failed to open {}", args.image.display()))?;

    let mut last_preview: Option<RgbImage> = None;
    let mut last_mask: Option<SelectionMask> = None;
    let mut erased = 0;

    for &point in &args.points {
        match session.select_at(point)? {
            EditOutcome::Selected { .. } => {
                last_preview = session.preview_frame();
                last_mask = session.selection().cloned();
                if let EditOutcome::Deleted { pixel_count } = session.delete_selection()? {
                    erased += pixel_count;
                }
            },
            outcome => warn!("Skipping {}: {}", point, outcome),
        }
    }

    if let Some(path) = &args.preview {
        write_optional(last_preview.map(DynamicImage::ImageRgb8), path, "preview")?;
    }
    if let Some(path) = &args.mask {
        write_optional(
            last_mask.map(|mask| DynamicImage::ImageLuma8(mask.to_luma_image())),
            path,
            "mask",
        )?;
    }

    let output = args.output.as_deref().unwrap_or(&args.image);
    session
        .save(output)
        .with_context(|| format!("Failed to save {}", output.display()))?;
    info!("Erased {} pixel(s); saved {}", erased, output.display());
    Ok(())
}

fn write_optional(image: Option<DynamicImage>, path: &Path, what: &str) -> Result<()> {
    match image {
        Some(image) => {
            ImageIOService::save_image(&image, path, None)
                .with_context(|| format!("Failed to write {} {}", what, path.display()))?;
            info!("Wrote {} to {}", what, path.display());
        },
        None => warn!("No region was selected; {} not written", what),
    }
    Ok(())
}

/// Parse `X,Y` into an image point
fn parse_point(value: &str) -> Result<ImagePoint, String> {
    let (x, y) = value
        .split_once(',')
        .ok_or_else(|| format!("expected X,Y but got '{}'", value))?;
    let x = x
        .trim()
        .parse::<u32>()
        .map_err(|e| format!("invalid x '{}': {}", x.trim(), e))?;
    let y = y
        .trim()
        .parse::<u32>()
        .map_err(|e| format!("invalid y '{}': {}", y.trim(), e))?;
    Ok(ImagePoint::new(x, y))
}

/// Parse `R,G,B` into a color
fn parse_color(value: &str) -> Result<[u8; 3], String> {
    let parts = value
        .split(',')
        .map(|part| part.trim().parse::<u8>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| format!("invalid color '{}': {}", value, e))?;

    match parts.as_slice() {
        [r, g, b] => Ok([*r, *g, *b]),
        _ => Err(format!("expected R,G,B but got '{}'", value)),
    }
}

/// Expand file and directory inputs into a sorted list of image files
fn collect_inputs(
    inputs: &[String],
    recursive: bool,
    pattern: Option<&str>,
    skip_dir: Option<&str>,
) -> Result<Vec<PathBuf>> {
    let mut all_files = Vec::new();

    for input in inputs {
        let path = PathBuf::from(input);

        if path.is_file() {
            if ImageIOService::is_supported_format(&path) {
                all_files.push(path);
            } else {
                warn!("Skipping unsupported file: {}", path.display());
            }
        } else if path.is_dir() {
            all_files.extend(find_image_files(&path, recursive, pattern, skip_dir)?);
        } else {
            anyhow::bail!(
                "Input path does not exist or is not accessible: {}",
                path.display()
            );
        }
    }

    // Sort files alphanumerically for consistent processing order
    all_files.sort();
    all_files.dedup();
    Ok(all_files)
}

/// Find image files in a directory, leaving out previous outputs under `skip_dir`
fn find_image_files(
    dir: &Path,
    recursive: bool,
    pattern: Option<&str>,
    skip_dir: Option<&str>,
) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    if recursive {
        let walker = walkdir::WalkDir::new(dir).into_iter().filter_entry(|entry| {
            entry.depth() == 0
                || !entry.file_type().is_dir()
                || skip_dir.map_or(true, |skip| entry.file_name() != skip)
        });
        for entry in walker {
            let entry = entry?;
            if entry.file_type().is_file() {
                let path = entry.path();
                if ImageIOService::is_supported_format(path) && matches_pattern(path, pattern) {
                    files.push(path.to_path_buf());
                }
            }
        }
    } else {
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                let path = entry.path();
                if ImageIOService::is_supported_format(&path) && matches_pattern(&path, pattern) {
                    files.push(path);
                }
            }
        }
    }

    Ok(files)
}

/// Check if the file name matches the given glob pattern
fn matches_pattern(path: &Path, pattern: Option<&str>) -> bool {
    match pattern {
        Some(pat) => path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|filename| {
                glob::Pattern::new(pat)
                    .map(|p| p.matches(filename))
                    .unwrap_or(false)
            }),
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, b"fake").unwrap();
    }

    #[test]
    fn test_parse_point() {
        assert_eq!(parse_point("10,20"), Ok(ImagePoint::new(10, 20)));
        assert_eq!(parse_point(" 3 , 4 "), Ok(ImagePoint::new(3, 4)));
        assert!(parse_point("10").is_err());
        assert!(parse_point("-1,2").is_err());
        assert!(parse_point("a,b").is_err());
    }

    #[test]
    fn test_parse_color() {
        assert_eq!(parse_color("255,0,128"), Ok([255, 0, 128]));
        assert!(parse_color("256,0,0").is_err());
        assert!(parse_color("1,2").is_err());
        assert!(parse_color("1,2,3,4").is_err());
    }

    #[test]
    fn test_matches_pattern() {
        assert!(matches_pattern(Path::new("/a/shot.jpg"), None));
        assert!(matches_pattern(Path::new("/a/shot.jpg"), Some("*.jpg")));
        assert!(!matches_pattern(Path::new("/a/shot.png"), Some("*.jpg")));
        assert!(!matches_pattern(Path::new("/a/shot.jpg"), Some("[")));
    }

    #[test]
    fn test_find_image_files_in_empty_directory() {
        let temp_dir = TempDir::new().unwrap();
        let files = find_image_files(temp_dir.path(), false, None, None).unwrap();
        assert!(files.is_empty());
    }

    #[test]
    fn test_find_image_files_recursive_skips_outputs() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        touch(&root.join("a.jpg"));
        touch(&root.join("notes.txt"));
        touch(&root.join("nested").join("b.png"));
        touch(&root.join("Remove_background").join("a.png"));

        let mut flat = find_image_files(root, false, None, Some("Remove_background")).unwrap();
        flat.sort();
        assert_eq!(flat, vec![root.join("a.jpg")]);

        let mut deep = find_image_files(root, true, None, Some("Remove_background")).unwrap();
        deep.sort();
        assert_eq!(deep, vec![root.join("a.jpg"), root.join("nested").join("b.png")]);

        let everything = find_image_files(root, true, None, None).unwrap();
        assert_eq!(everything.len(), 3);
    }

    #[test]
    fn test_collect_inputs_sorts_and_filters() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        touch(&root.join("z.jpg"));
        touch(&root.join("b.png"));
        touch(&root.join("skip.txt"));

        let inputs = vec![
            root.join("z.jpg").to_string_lossy().into_owned(),
            root.to_string_lossy().into_owned(),
            root.join("skip.txt").to_string_lossy().into_owned(),
        ];
        let files = collect_inputs(&inputs, false, Some("*.*"), None).unwrap();
        assert_eq!(files, vec![root.join("b.png"), root.join("z.jpg")]);
    }

    #[test]
    fn test_collect_inputs_missing_path() {
        let inputs = vec!["/definitely/not/here.jpg".to_string()];
        assert!(collect_inputs(&inputs, false, None, None).is_err());
    }

    #[test]
    fn test_cli_parses_subcommands() {
        let cli = Cli::try_parse_from(["bgtouch", "-vv", "erase", "x.png", "--at", "1,2", "--at", "3,4"])
            .unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Command::Erase(args) => {
                assert_eq!(args.points, vec![ImagePoint::new(1, 2), ImagePoint::new(3, 4)]);
                assert!(args.output.is_none());
            },
            Command::Remove(_) => panic!("expected erase"),
        }

        assert!(Cli::try_parse_from(["bgtouch", "erase", "x.png"]).is_err());
        assert!(Cli::try_parse_from(["bgtouch", "remove"]).is_err());
    }

    #[test]
    fn test_erase_help_warns_about_transparency() {
        use clap::CommandFactory;

        let mut cli = Cli::command();
        let erase = cli.find_subcommand_mut("erase").unwrap();
        let help = erase.render_long_help().to_string();
        assert!(help.contains("transparency in the input is lost"), "{}", help);
        assert!(help.contains("dropping any alpha channel"), "{}", help);
    }

    #[test]
    fn test_erase_writes_output_preview_and_mask() {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("in.png");
        let image = RgbImage::from_fn(6, 6, |x, _| {
            if x < 3 {
                image::Rgb([0, 0, 0])
            } else {
                image::Rgb([200, 30, 30])
            }
        });
        image.save(&input).unwrap();

        let output = temp_dir.path().join("out.png");
        let preview = temp_dir.path().join("preview.png");
        let mask = temp_dir.path().join("mask.png");
        let args = EraseArgs {
            image: input.clone(),
            points: vec![ImagePoint::new(0, 0), ImagePoint::new(40, 40)],
            tolerance: None,
            output: Some(output.clone()),
            fill: None,
            highlight: None,
            preview: Some(preview.clone()),
            mask: Some(mask.clone()),
            config: None,
        };
        run_erase(&args).unwrap();

        let result = image::open(&output).unwrap().to_rgb8();
        assert_eq!(result.get_pixel(0, 0).0, [255, 255, 255]);
        assert_eq!(result.get_pixel(5, 5).0, [200, 30, 30]);

        let preview = image::open(&preview).unwrap().to_rgb8();
        assert_eq!(preview.get_pixel(2, 2).0, [255, 0, 0]);

        let mask = image::open(&mask).unwrap().to_luma8();
        assert_eq!(mask.get_pixel(0, 0).0, [255]);
        assert_eq!(mask.get_pixel(3, 0).0, [0]);

        // Source untouched when an output path is given
        let source = image::open(&input).unwrap().to_rgb8();
        assert_eq!(source.get_pixel(0, 0).0, [0, 0, 0]);
    }
}
