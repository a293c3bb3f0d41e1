//! Seam between segmentation backends and the processing pipelines

use opencv::core::Mat;
use opencv::prelude::*;

use crate::error::VisionError;

/// Instance mask at model prototype resolution, row-major, one byte per
/// cell holding 0 (background) or 1 (foreground)
#[derive(Debug, Clone)]
pub struct InstanceMask {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
}

impl InstanceMask {
    pub fn new(width: usize, height: usize, data: Vec<u8>) -> Result<Self, VisionError> {
        if data.len() != width * height {
            return Err(VisionError::Processing(format!(
                "Mask data length {} does not match {}x{}",
                data.len(),
                width,
                height
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn has_foreground(&self) -> bool {
        self.data.iter().any(|&v| v != 0)
    }

    /// Single-channel 8-bit Mat copy of the mask
    pub fn to_mat(&self) -> Result<Mat, VisionError> {
        let flat = Mat::from_slice(&self.data)?;
        let mat = flat.reshape(1, self.height as i32)?;
        Ok(mat.try_clone()?)
    }
}

/// One segmented instance, in the coordinate space of the frame passed to
/// [`Detector::predict`]
#[derive(Debug, Clone)]
pub struct Detection {
    pub class_id: usize,
    pub class_name: String,
    pub confidence: f32,
    /// x, y, width, height in frame pixels
    pub bbox: (f32, f32, f32, f32),
    pub mask: InstanceMask,
}

/// A segmentation backend the pipelines can run BGR frames through
pub trait Detector: Send + Sync {
    /// Class labels the model was trained with, indexed by class id
    fn class_names(&self) -> &[String];

    /// Side length of the square model input in pixels
    fn input_size(&self) -> i32;

    /// Segment one frame, returning an entry per detected instance
    fn predict(&self, frame: &Mat) -> Result<Vec<Detection>, VisionError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_rejects_mismatched_dimensions() {
        assert!(InstanceMask::new(4, 4, vec![0u8; 15]).is_err());
        assert!(InstanceMask::new(4, 4, vec![0u8; 16]).is_ok());
    }

    #[test]
    fn mask_foreground_detection() {
        let empty = InstanceMask::new(3, 3, vec![0u8; 9]).unwrap();
        assert!(!empty.has_foreground());

        let mut data = vec![0u8; 9];
        data[4] = 1;
        let filled = InstanceMask::new(3, 3, data).unwrap();
        assert!(filled.has_foreground());
    }

    #[test]
    fn mask_converts_to_mat_with_matching_shape() {
        let mask = InstanceMask::new(6, 4, vec![1u8; 24]).unwrap();
        let mat = mask.to_mat().unwrap();
        assert_eq!(mat.rows(), 4);
        assert_eq!(mat.cols(), 6);
        assert_eq!(*mat.at_2d::<u8>(2, 3).unwrap(), 1);
    }
}
