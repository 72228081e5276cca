//! Channel-wise spot detection for microscopy image stacks
//!
//! Opens an image, reports its dimensions and axis order, then runs
//! Difference-of-Gaussians spot detection on each selected channel and
//! collects every local maximum into one results table.
//!
//! # Usage
//!
//! ```bash
//! # Inspect dimensions and axis order
//! cargo run --release --bin spot_detect -- info oocyte_4_1.tif
//!
//! # Detect spots in all channels, show the table and save it as CSV
//! cargo run --release --bin spot_detect -- detect oocyte_4_1.tif --show -o spots.csv
//!
//! # Only channels 0 and 2, custom band-pass and threshold, JSON output
//! cargo run --release --bin spot_detect -- detect oocyte_4_1.tif \
//!     --channels 0,2 --sigma1 1.0 --sigma2 2.0 --threshold 50 -o spots.json
//!
//! # Reuse a saved configuration, channels in parallel
//! cargo run --release --bin spot_detect -- detect oocyte_4_1.tif --config detect.json --parallel
//! ```
//!
//! # Commands
//!
//! ## `info` - Image dimensions
//! - Prints pixel type, number of dimensions, extents and axis order
//! - Shows the dimensionality of a single channel slice
//!
//! ## `detect` - Spot detection
//! - `--channels`: `all` (default) or a list such as `0,2` or `0-2`
//! - `--channel-axis`, `--sigma1`, `--sigma2`, `--threshold`: detection parameters
//! - `--config`: JSON detection config; flags override its fields
//! - `--save-config`: write the effective configuration as JSON
//! - `--parallel`: process channels concurrently
//! - `-o, --output`: write the table (`.json` for JSON, CSV otherwise)
//! - `--show`: print the table to stdout

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use spotfinder::image_proc::hyper_slice_view;
use spotfinder::image_proc::io::{load_image, ImageData};
use spotfinder::shared_args::{ChannelSelection, DetectionArgs};
use spotfinder::volume::describe_axes;
use spotfinder::{ResultsTable, SpotDetector, SpotError};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(long, global = true, default_value_t = false)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print image dimensions and axis order
    Info {
        /// Input image (TIFF stack or raster image)
        input: PathBuf,
    },

    /// Detect spots channel by channel
    Detect {
        /// Input image (TIFF stack or raster image)
        input: PathBuf,

        /// Channels to process: "all" or e.g. "0,2" / "0-2"
        #[arg(long, default_value = "all", allow_hyphen_values = true)]
        channels: ChannelSelection,

        #[command(flatten)]
        detection: DetectionArgs,

        /// Write the effective detection configuration to this JSON file
        #[arg(long)]
        save_config: Option<PathBuf>,

        /// Process channels concurrently
        #[arg(long, default_value_t = false)]
        parallel: bool,

        /// Output file for the results table (.json or .csv)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print the results table
        #[arg(long, default_value_t = false)]
        show: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    match cli.command {
        Commands::Info { input } => run_info(&input),
        Commands::Detect {
            input,
            channels,
            detection,
            save_config,
            parallel,
            output,
            show,
        } => run_detect(
            &input,
            &channels,
            &detection,
            save_config.as_deref(),
            parallel,
            output.as_deref(),
            show,
        ),
    }
}

fn open(input: &Path) -> Result<ImageData> {
    let image =
        load_image(input).with_context(|| format!("Failed to open '{}'", input.display()))?;

    info!("Opened {} ({})", input.display(), image.pixel_type());
    info!("The image has {} dimensions.", image.ndim());
    info!(
        "The dimensions are {}",
        describe_axes(image.axes(), image.shape())
    );
    Ok(image)
}

fn run_info(input: &Path) -> Result<()> {
    let image = open(input)?;

    let Some(axis) = image.channel_axis() else {
        info!("The image has no channel axis.");
        return Ok(());
    };
    let slice_ndim = match &image {
        ImageData::U8(v) => hyper_slice_view(v, axis, 0)?.ndim(),
        ImageData::U16(v) => hyper_slice_view(v, axis, 0)?.ndim(),
        ImageData::F32(v) => hyper_slice_view(v, axis, 0)?.ndim(),
    };
    info!(
        "Channel axis is {axis} with {} channels; a channel slice has {slice_ndim} dimensions.",
        image.shape()[axis]
    );
    Ok(())
}

fn run_detect(
    input: &Path,
    channels: &ChannelSelection,
    detection: &DetectionArgs,
    save_config: Option<&Path>,
    parallel: bool,
    output: Option<&Path>,
    show: bool,
) -> Result<()> {
    let image = open(input)?;

    let config = detection.to_config(image.channel_axis())?;
    info!(
        "Detection: channel axis {}, sigma1 {}, sigma2 {}, threshold {}",
        config.channel_axis, config.sigma1, config.sigma2, config.threshold
    );
    if let Some(path) = save_config {
        config.save_to_file(path)?;
        info!("Saved configuration to {}", path.display());
    }

    let extent = image
        .shape()
        .get(config.channel_axis)
        .copied()
        .ok_or_else(|| {
            SpotError::OutOfRange {
                name: "channel_axis",
                value: config.channel_axis as i64,
                extent: image.ndim(),
            }
        })?;
    let channels = channels.resolve(extent)?;

    let detector = SpotDetector::new(config)?;
    let mut table = ResultsTable::new();
    let found = detector.detect_image(&image, &channels, parallel, &mut table)?;
    info!("Found {found} spots across {} channels", channels.len());

    if show {
        print!("{}", table.render());
    }

    if let Some(path) = output {
        write_table(&table, path)?;
        info!("Wrote {} rows to {}", table.len(), path.display());
    }

    Ok(())
}

fn write_table(table: &ResultsTable, path: &Path) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create '{}'", path.display()))?;
    let writer = BufWriter::new(file);

    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if is_json {
        table.write_json(writer)?;
    } else {
        table.write_csv(writer)?;
    }
    Ok(())
}
