//! Mask to contour extraction

use opencv::core::{Mat, Point, Rect, Size, Vector};
use opencv::imgproc;

use crate::detector::InstanceMask;
use crate::error::VisionError;

/// Resize an instance mask to the frame size and extract the outer
/// contours of its foreground regions
pub fn mask_contours(
    mask: &InstanceMask,
    frame_size: Size,
) -> Result<Vector<Vector<Point>>, VisionError> {
    let mat = mask.to_mat()?;

    let mut resized = Mat::default();
    imgproc::resize(
        &mat,
        &mut resized,
        frame_size,
        0.0,
        0.0,
        imgproc::INTER_LINEAR,
    )?;

    let mut contours = Vector::<Vector<Point>>::new();
    imgproc::find_contours(
        &resized,
        &mut contours,
        imgproc::RETR_EXTERNAL,
        imgproc::CHAIN_APPROX_SIMPLE,
        Point::new(0, 0),
    )?;

    Ok(contours)
}

/// Axis-aligned bounding rectangle of one contour
pub fn contour_bounding_rect(contour: &Vector<Point>) -> Result<Rect, VisionError> {
    Ok(imgproc::bounding_rect(contour)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 8x8 mask with a filled 4x4 block in the lower-right quadrant
    fn block_mask() -> InstanceMask {
        let mut data = vec![0u8; 64];
        for y in 4..8 {
            for x in 4..8 {
                data[y * 8 + x] = 1;
            }
        }
        InstanceMask::new(8, 8, data).unwrap()
    }

    #[test]
    fn empty_mask_yields_no_contours() {
        let mask = InstanceMask::new(8, 8, vec![0u8; 64]).unwrap();
        let contours = mask_contours(&mask, Size::new(80, 80)).unwrap();
        assert_eq!(contours.len(), 0);
    }

    #[test]
    fn filled_block_yields_one_contour() {
        let contours = mask_contours(&block_mask(), Size::new(80, 80)).unwrap();
        assert_eq!(contours.len(), 1);
    }

    #[test]
    fn bounding_rect_lands_on_the_scaled_block() {
        let contours = mask_contours(&block_mask(), Size::new(80, 80)).unwrap();
        let rect = contour_bounding_rect(&contours.get(0).unwrap()).unwrap();

        // the block covers the lower-right quadrant, scaled 8 -> 80
        assert!(rect.x >= 30 && rect.x <= 45, "rect.x = {}", rect.x);
        assert!(rect.y >= 30 && rect.y <= 45, "rect.y = {}", rect.y);
        assert!(rect.width >= 30, "rect.width = {}", rect.width);
        assert!(rect.height >= 30, "rect.height = {}", rect.height);
    }

    #[test]
    fn two_separate_blocks_yield_two_contours() {
        let mut data = vec![0u8; 64];
        for y in 0..2 {
            for x in 0..2 {
                data[y * 8 + x] = 1;
            }
        }
        for y in 6..8 {
            for x in 6..8 {
                data[y * 8 + x] = 1;
            }
        }
        let mask = InstanceMask::new(8, 8, data).unwrap();

        let contours = mask_contours(&mask, Size::new(64, 64)).unwrap();
        assert_eq!(contours.len(), 2);
    }
}
