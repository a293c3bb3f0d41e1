//! Detection overlays: contour outlines, bounding boxes, class labels

use opencv::core::{Mat, Point, Rect, Scalar, Vector};
use opencv::imgproc;
use opencv::prelude::*;

use crate::detector::Detection;
use crate::error::VisionError;
use crate::processing::contours;

// Overlay colors, BGR
fn box_color() -> Scalar {
    Scalar::new(255.0, 0.0, 0.0, 0.0)
}

fn outline_color() -> Scalar {
    Scalar::new(0.0, 0.0, 255.0, 0.0)
}

pub fn draw_box(frame: &mut Mat, rect: Rect) -> Result<(), VisionError> {
    imgproc::rectangle(frame, rect, box_color(), 2, imgproc::LINE_8, 0)?;
    Ok(())
}

/// Class label above the box, Hershey simplex at 0.9 scale
pub fn draw_label(frame: &mut Mat, text: &str, anchor: Point) -> Result<(), VisionError> {
    imgproc::put_text(
        frame,
        text,
        anchor,
        imgproc::FONT_HERSHEY_SIMPLEX,
        0.9,
        box_color(),
        2,
        imgproc::LINE_8,
        false,
    )?;
    Ok(())
}

pub fn draw_contour(frame: &mut Mat, contour: &Vector<Point>) -> Result<(), VisionError> {
    let mut polys = Vector::<Vector<Point>>::new();
    polys.push(contour.clone());
    imgproc::polylines(frame, &polys, true, outline_color(), 2, imgproc::LINE_8, 0)?;
    Ok(())
}

/// Overlay every detection onto the frame. Each foreground region of a
/// detection's mask gets its outline, a bounding rectangle recomputed from
/// the contour, and the class label above it.
pub fn annotate_frame(frame: &mut Mat, detections: &[Detection]) -> Result<(), VisionError> {
    let frame_size = frame.size()?;

    for detection in detections {
        let found = contours::mask_contours(&detection.mask, frame_size)?;
        for contour in found.iter() {
            let rect = contours::contour_bounding_rect(&contour)?;
            draw_contour(frame, &contour)?;
            draw_box(frame, rect)?;
            draw_label(
                frame,
                &detection.class_name,
                Point::new(rect.x, rect.y - 10),
            )?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::InstanceMask;
    use opencv::core::CV_8UC3;

    fn black_frame(width: i32, height: i32) -> Mat {
        Mat::new_rows_cols_with_default(height, width, CV_8UC3, Scalar::all(0.0)).unwrap()
    }

    fn count_nonzero_pixels(frame: &Mat) -> i32 {
        let mut gray = Mat::default();
        imgproc::cvt_color(frame, &mut gray, imgproc::COLOR_BGR2GRAY, 0).unwrap();
        opencv::core::count_non_zero(&gray).unwrap()
    }

    #[test]
    fn draw_box_marks_pixels() {
        let mut frame = black_frame(64, 64);
        draw_box(&mut frame, Rect::new(10, 10, 30, 30)).unwrap();
        assert!(count_nonzero_pixels(&frame) > 0);
    }

    #[test]
    fn annotate_frame_draws_each_mask_region() {
        let mut data = vec![0u8; 64];
        for y in 2..6 {
            for x in 2..6 {
                data[y * 8 + x] = 1;
            }
        }
        let detection = Detection {
            class_id: 0,
            class_name: "pothole".to_string(),
            confidence: 0.9,
            bbox: (16.0, 16.0, 32.0, 32.0),
            mask: InstanceMask::new(8, 8, data).unwrap(),
        };

        let mut frame = black_frame(64, 64);
        annotate_frame(&mut frame, &[detection]).unwrap();
        assert!(count_nonzero_pixels(&frame) > 0);
    }

    #[test]
    fn annotate_frame_with_no_detections_leaves_frame_untouched() {
        let mut frame = black_frame(64, 64);
        annotate_frame(&mut frame, &[]).unwrap();
        assert_eq!(count_nonzero_pixels(&frame), 0);
    }

    #[test]
    fn empty_mask_detection_draws_nothing() {
        let detection = Detection {
            class_id: 0,
            class_name: "pothole".to_string(),
            confidence: 0.9,
            bbox: (0.0, 0.0, 10.0, 10.0),
            mask: InstanceMask::new(8, 8, vec![0u8; 64]).unwrap(),
        };

        let mut frame = black_frame(64, 64);
        annotate_frame(&mut frame, &[detection]).unwrap();
        assert_eq!(count_nonzero_pixels(&frame), 0);
    }
}
