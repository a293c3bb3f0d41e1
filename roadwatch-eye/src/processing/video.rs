//! Video pipeline: sample frames, segment, draw, re-encode as mp4

use opencv::core::{Mat, Size};
use opencv::imgproc;
use opencv::prelude::*;
use opencv::videoio::{self, VideoCapture, VideoWriter};
use roadwatch_core::config::ProcessingConfig;
use tracing::{debug, info};

use crate::detector::Detector;
use crate::error::VisionError;
use crate::processing::annotate;

/// Outcome of one video pass. Frames that fall between sampling strides
/// are dropped, so `frames_written` is roughly `frames_read / stride`.
#[derive(Debug, Clone, Copy)]
pub struct VideoSummary {
    pub frames_read: u64,
    pub frames_written: u64,
    pub detections: usize,
}

pub fn process_video(
    detector: &dyn Detector,
    input_path: &str,
    output_path: &str,
    processing: &ProcessingConfig,
) -> Result<VideoSummary, VisionError> {
    let mut cap = VideoCapture::from_file(input_path, videoio::CAP_ANY)?;
    if !cap.is_opened()? {
        return Err(VisionError::VideoOpen(input_path.to_string()));
    }

    // source fps, truncated the way the output container expects it
    let fps = cap.get(videoio::CAP_PROP_FPS)? as i32;
    let frame_size = Size::new(processing.display_width, processing.display_height);

    let fourcc = VideoWriter::fourcc('m', 'p', '4', 'v')?;
    let mut writer = VideoWriter::new(output_path, fourcc, fps as f64, frame_size, true)?;
    if !writer.is_opened()? {
        return Err(VisionError::VideoWrite(output_path.to_string()));
    }

    let stride = processing.frame_stride as u64;
    let mut frames_read = 0u64;
    let mut frames_written = 0u64;
    let mut total_detections = 0usize;
    let mut frame = Mat::default();

    loop {
        if !cap.read(&mut frame)? || frame.empty() {
            break;
        }

        frames_read += 1;
        if frames_read % stride != 0 {
            continue;
        }

        let mut resized = Mat::default();
        imgproc::resize(
            &frame,
            &mut resized,
            frame_size,
            0.0,
            0.0,
            imgproc::INTER_LINEAR,
        )?;

        let detections = detector.predict(&resized)?;
        annotate::annotate_frame(&mut resized, &detections)?;
        total_detections += detections.len();

        writer.write(&resized)?;
        frames_written += 1;
        debug!(
            "Frame {}: {} detections",
            frames_read,
            detections.len()
        );
    }

    cap.release()?;
    writer.release()?;

    info!(
        "Annotated video {} -> {} ({} of {} frames, {} detections)",
        input_path, output_path, frames_written, frames_read, total_detections
    );

    Ok(VideoSummary {
        frames_read,
        frames_written,
        detections: total_detections,
    })
}
