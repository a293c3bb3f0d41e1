//! Media processing pipelines

pub mod annotate;
pub mod contours;
pub mod image;
pub mod video;

pub use image::{process_image, ImageSummary};
pub use video::{process_video, VideoSummary};
