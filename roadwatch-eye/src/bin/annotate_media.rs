//! One-shot pothole annotation of a single image or video file

use anyhow::{Context, Result};
use clap::Parser;
use roadwatch_core::{AppConfig, MediaKind};
use roadwatch_eye::{process_image, process_video, YoloSeg};

#[derive(Parser)]
#[command(name = "annotate_media")]
#[command(about = "Run pothole segmentation over a single image or video", long_about = None)]
struct Args {
    /// Input image or video file
    input: String,

    /// Where to write the annotated result
    output: String,

    /// Model artifact path (overrides configuration)
    #[arg(long)]
    model: Option<String>,

    /// Configuration file path
    #[arg(long, short)]
    config: Option<String>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt().with_target(false).init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => AppConfig::from_file(path).context("Failed to load configuration")?,
        None => AppConfig::from_env(),
    };
    if let Some(model) = &args.model {
        config.model.path = model.clone();
    }
    config.validate().context("Invalid configuration")?;

    let kind = MediaKind::from_filename(&args.input)
        .with_context(|| format!("Unsupported media type: {}", args.input))?;

    let detector = YoloSeg::new(&config.model)?;

    match kind {
        MediaKind::Image => {
            let summary = process_image(&detector, &args.input, &args.output, &config.processing)?;
            println!(
                "Wrote {} with {} detections",
                args.output, summary.detections
            );
        }
        MediaKind::Video => {
            let summary = process_video(&detector, &args.input, &args.output, &config.processing)?;
            println!(
                "Wrote {} ({} of {} frames, {} detections)",
                args.output, summary.frames_written, summary.frames_read, summary.detections
            );
        }
    }

    Ok(())
}
