//! roadwatch-eye: pothole segmentation pipeline
//!
//! Runs a pre-trained YOLOv8 instance-segmentation ONNX model over images
//! and video frames, turns the returned masks into contours, and draws
//! boxes, labels and outlines back onto the media.

pub mod detector;
pub mod error;
pub mod models;
pub mod processing;

pub use detector::{Detection, Detector, InstanceMask};
pub use error::VisionError;
pub use models::YoloSeg;
pub use processing::{process_image, process_video, ImageSummary, VideoSummary};
