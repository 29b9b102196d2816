//! Stabilo - Video stabilization and region averaging
//!
//! Entry point: stabilizes a video, then tracks a region through the
//! stabilized result and writes its temporal mean plus an HTML report.

mod config;

use anyhow::{bail, Context, Result};
use clap::Parser;
use config::{AppConfig, CliArgs};
use stabilo_core::{CenteredRegion, FixedRegion, FrameSource, ImageWriter, RegionSelector};
use stabilo_media::{write_html_report, ImageFileWriter, OutputFormat, VideoDecoder, VideoEncoder};
use stabilo_tracking::{RegionTracker, Stabilizer};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let args = CliArgs::parse();

    let mut config = match &args.config {
        Some(path) => AppConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => AppConfig::default(),
    };
    config.apply_args(&args);

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .context("invalid log level")?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Stabilo starting...");
    debug!(config = %config.to_json()?, "Effective configuration");
    if let Err(e) = run(&config) {
        tracing::error!(error = %e, "Stabilo failed");
        return Err(e);
    }
    Ok(())
}

fn run(config: &AppConfig) -> Result<()> {
    stabilize(config)?;
    average_region(config)
}

/// Two-pass stabilization of `config.input` into `config.stabilized_output`.
fn stabilize(config: &AppConfig) -> Result<()> {
    let mut decoder = VideoDecoder::open(&config.input)
        .with_context(|| format!("cannot open {}", config.input.display()))?;
    let stabilizer = Stabilizer::new(config.estimator.clone(), config.stabilization.clone());

    let (analysis, summary) = stabilizer
        .run(&mut decoder, |(width, height), rate| {
            let format = OutputFormat::new(width, height, rate).with_codec(config.codec);
            VideoEncoder::create(&config.stabilized_output, format)
        })
        .context("stabilization failed")?;

    if !analysis.failed_boundaries.is_empty() {
        warn!(
            failed = analysis.failed_boundaries.len(),
            total = analysis.transforms.len(),
            "Some frame boundaries had no motion estimate"
        );
    }
    info!(
        frames = summary.frames_written,
        width = summary.output_size.0,
        height = summary.output_size.1,
        output = %config.stabilized_output.display(),
        "Stabilized video written"
    );
    Ok(())
}

/// Select a region on the stabilized video, average it, and report.
fn average_region(config: &AppConfig) -> Result<()> {
    let region = &config.region;
    let mut video = VideoDecoder::open(&config.stabilized_output).with_context(|| {
        format!("cannot open stabilized video {}", config.stabilized_output.display())
    })?;

    video.seek(region.selection_frame)?;
    let Some(opening) = video.read_next()? else {
        bail!(
            "stabilized video has no frame {} to select a region on",
            region.selection_frame
        );
    };

    let roi = match region.roi {
        Some(roi) => FixedRegion(roi).select(&opening)?,
        None => CenteredRegion {
            fraction: region.centered_fraction,
        }
        .select(&opening)?,
    };
    info!(x = roi.x, y = roi.y, width = roi.width, height = roi.height, "Region selected");

    let average = RegionTracker::new(region.tracker.clone())
        .track(&mut video, roi, region.range())
        .context("region tracking failed")?;
    if average.truncated {
        warn!(
            frames = average.frames_accumulated,
            "Stabilized video ended inside the region range"
        );
    }

    let writer = ImageFileWriter;
    writer
        .write(&average.mean, &config.mean_image)
        .context("failed to save mean image")?;
    let original_path = config.original_image();
    writer
        .write(&opening.crop(&roi)?, &original_path)
        .context("failed to save original region")?;
    write_html_report(&original_path, &config.mean_image, &config.report)
        .context("failed to write report")?;

    info!(
        frames = average.frames_accumulated,
        tracking_losses = average.tracking_losses,
        report = %config.report.display(),
        "Done"
    );
    Ok(())
}
