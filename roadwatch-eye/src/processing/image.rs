//! Single-image pipeline: decode, resize, segment, draw, encode

use opencv::core::{Mat, Size, Vector};
use opencv::prelude::*;
use opencv::{imgcodecs, imgproc};
use roadwatch_core::config::ProcessingConfig;
use tracing::info;

use crate::detector::Detector;
use crate::error::VisionError;
use crate::processing::annotate;

/// Outcome of one image pass
#[derive(Debug, Clone, Copy)]
pub struct ImageSummary {
    pub detections: usize,
}

pub fn process_image(
    detector: &dyn Detector,
    input_path: &str,
    output_path: &str,
    processing: &ProcessingConfig,
) -> Result<ImageSummary, VisionError> {
    let img = imgcodecs::imread(input_path, imgcodecs::IMREAD_COLOR)?;
    if img.empty() {
        return Err(VisionError::ImageRead(input_path.to_string()));
    }

    let mut frame = Mat::default();
    imgproc::resize(
        &img,
        &mut frame,
        Size::new(processing.display_width, processing.display_height),
        0.0,
        0.0,
        imgproc::INTER_LINEAR,
    )?;

    let detections = detector.predict(&frame)?;
    annotate::annotate_frame(&mut frame, &detections)?;

    let written = imgcodecs::imwrite(output_path, &frame, &Vector::new())?;
    if !written {
        return Err(VisionError::ImageWrite(output_path.to_string()));
    }

    info!(
        "Annotated image {} -> {} ({} detections)",
        input_path,
        output_path,
        detections.len()
    );

    Ok(ImageSummary {
        detections: detections.len(),
    })
}
