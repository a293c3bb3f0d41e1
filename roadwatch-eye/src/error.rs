//! Error types for roadwatch-eye

use roadwatch_core::Error as CoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VisionError {
    #[error("Could not read image: {0}")]
    ImageRead(String),

    #[error("Could not write image: {0}")]
    ImageWrite(String),

    #[error("Could not open video: {0}")]
    VideoOpen(String),

    #[error("Could not write video: {0}")]
    VideoWrite(String),

    #[error("Model error: {0}")]
    Model(String),

    #[error("Inference error: {0}")]
    Inference(String),

    #[error("Processing error: {0}")]
    Processing(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ONNX Runtime error: {0}")]
    Ort(String),

    #[error("OpenCV error: {0}")]
    OpenCv(String),
}

impl From<opencv::Error> for VisionError {
    fn from(err: opencv::Error) -> Self {
        VisionError::OpenCv(err.message)
    }
}

impl From<ort::Error> for VisionError {
    fn from(err: ort::Error) -> Self {
        VisionError::Ort(err.to_string())
    }
}

impl From<VisionError> for CoreError {
    fn from(err: VisionError) -> Self {
        match err {
            VisionError::Io(e) => CoreError::Io(e),
            other => CoreError::Inference(other.to_string()),
        }
    }
}
