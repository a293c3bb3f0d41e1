//! YOLOv8 instance segmentation over ONNX Runtime

use std::path::Path;

use ndarray::{Array4, ArrayView3, ArrayView4};
use opencv::core::{self, Mat, Size, Vec3f};
use opencv::imgproc;
use opencv::prelude::*;
use ort::execution_providers::CPUExecutionProvider;
use ort::session::{Session, SessionOutputs};
use ort::value::TensorRef;
use parking_lot::Mutex;
use roadwatch_core::config::ModelConfig;
use tracing::{debug, info};

use crate::detector::{Detection, Detector, InstanceMask};
use crate::error::VisionError;

/// YOLOv8-seg model session.
///
/// The exported network takes one `[1, 3, S, S]` RGB tensor named `images`
/// and returns two tensors: `[1, 4 + nc + M, N]` anchor predictions (box
/// center/size, per-class scores, M mask coefficients) and `[1, M, Hp, Wp]`
/// mask prototypes. The class count is derived from the shapes.
pub struct YoloSeg {
    session: Mutex<Session>,
    input_size: i32,
    confidence_threshold: f32,
    iou_threshold: f32,
    class_names: Vec<String>,
}

impl YoloSeg {
    pub fn new(config: &ModelConfig) -> Result<Self, VisionError> {
        if !Path::new(&config.path).exists() {
            return Err(VisionError::Model(format!(
                "Model file not found: {}",
                config.path
            )));
        }

        let session = Session::builder()?
            .with_execution_providers([CPUExecutionProvider::default().build()])?
            .with_intra_threads(4)?
            .commit_from_file(&config.path)
            .map_err(|e| {
                VisionError::Model(format!("Failed to load model {}: {}", config.path, e))
            })?;

        info!("Segmentation model loaded from {}", config.path);

        Ok(Self {
            session: Mutex::new(session),
            input_size: config.input_size,
            confidence_threshold: config.confidence_threshold,
            iou_threshold: config.iou_threshold,
            class_names: config.class_names.clone(),
        })
    }

    /// Resize to the model input square, BGR to RGB, scale to [0, 1], CHW
    fn preprocess(&self, frame: &Mat) -> Result<Array4<f32>, VisionError> {
        let size = self.input_size;

        let mut resized = Mat::default();
        imgproc::resize(
            frame,
            &mut resized,
            Size::new(size, size),
            0.0,
            0.0,
            imgproc::INTER_LINEAR,
        )?;

        let mut rgb = Mat::default();
        imgproc::cvt_color(&resized, &mut rgb, imgproc::COLOR_BGR2RGB, 0)?;

        let mut float_mat = Mat::default();
        rgb.convert_to(&mut float_mat, core::CV_32F, 1.0 / 255.0, 0.0)?;

        let mut input = Array4::<f32>::zeros((1, 3, size as usize, size as usize));
        for y in 0..size {
            for x in 0..size {
                let px = float_mat.at_2d::<Vec3f>(y, x)?;
                input[[0, 0, y as usize, x as usize]] = px[0];
                input[[0, 1, y as usize, x as usize]] = px[1];
                input[[0, 2, y as usize, x as usize]] = px[2];
            }
        }

        Ok(input)
    }

    fn postprocess(
        &self,
        outputs: &SessionOutputs,
        frame: &Mat,
    ) -> Result<Vec<Detection>, VisionError> {
        if outputs.len() < 2 {
            return Err(VisionError::Inference(format!(
                "Expected detection and prototype outputs, got {} tensors",
                outputs.len()
            )));
        }

        let (det_shape, det_data) = outputs[0].try_extract_tensor::<f32>()?;
        let (proto_shape, proto_data) = outputs[1].try_extract_tensor::<f32>()?;

        if det_shape.len() != 3 || proto_shape.len() != 4 {
            return Err(VisionError::Inference(format!(
                "Unexpected output ranks: {:?} and {:?}",
                det_shape, proto_shape
            )));
        }

        let det = ArrayView3::from_shape(
            (
                det_shape[0] as usize,
                det_shape[1] as usize,
                det_shape[2] as usize,
            ),
            det_data,
        )
        .map_err(|e| VisionError::Inference(format!("Detection tensor shape mismatch: {}", e)))?;

        let protos = ArrayView4::from_shape(
            (
                proto_shape[0] as usize,
                proto_shape[1] as usize,
                proto_shape[2] as usize,
                proto_shape[3] as usize,
            ),
            proto_data,
        )
        .map_err(|e| VisionError::Inference(format!("Prototype tensor shape mismatch: {}", e)))?;

        decode_predictions(
            det,
            protos,
            frame.cols() as f32,
            frame.rows() as f32,
            self.input_size as f32,
            self.confidence_threshold,
            self.iou_threshold,
            &self.class_names,
        )
    }

    pub fn predict(&self, frame: &Mat) -> Result<Vec<Detection>, VisionError> {
        debug!(
            "Running segmentation on {}x{} frame",
            frame.cols(),
            frame.rows()
        );

        let input = self.preprocess(frame)?;
        let input_tensor = TensorRef::from_array_view(&input)?;

        let mut session = self.session.lock();
        let outputs = session
            .run(ort::inputs!["images" => input_tensor])
            .map_err(|e| VisionError::Inference(format!("Segmentation inference failed: {}", e)))?;

        self.postprocess(&outputs, frame)
    }
}

impl Detector for YoloSeg {
    fn class_names(&self) -> &[String] {
        &self.class_names
    }

    fn input_size(&self) -> i32 {
        self.input_size
    }

    fn predict(&self, frame: &Mat) -> Result<Vec<Detection>, VisionError> {
        YoloSeg::predict(self, frame)
    }
}

/// One anchor that survived the confidence filter, in model input space
struct Candidate {
    /// x, y, width, height with the origin at the top-left
    bbox: (f32, f32, f32, f32),
    confidence: f32,
    class_id: usize,
    coeffs: Vec<f32>,
}

#[allow(clippy::too_many_arguments)]
fn decode_predictions(
    det: ArrayView3<f32>,
    protos: ArrayView4<f32>,
    frame_width: f32,
    frame_height: f32,
    input_size: f32,
    confidence_threshold: f32,
    iou_threshold: f32,
    class_names: &[String],
) -> Result<Vec<Detection>, VisionError> {
    let channels = det.shape()[1];
    let anchors = det.shape()[2];
    let mask_dim = protos.shape()[1];

    if channels <= 4 + mask_dim {
        return Err(VisionError::Inference(format!(
            "Detection tensor has {} channels, too few for {} mask coefficients",
            channels, mask_dim
        )));
    }
    let num_classes = channels - 4 - mask_dim;

    let mut candidates = Vec::new();
    for i in 0..anchors {
        let mut best_score = 0.0f32;
        let mut best_class = 0usize;
        for c in 0..num_classes {
            let score = det[[0, 4 + c, i]];
            if score > best_score {
                best_score = score;
                best_class = c;
            }
        }

        if best_score <= confidence_threshold {
            continue;
        }

        let cx = det[[0, 0, i]];
        let cy = det[[0, 1, i]];
        let w = det[[0, 2, i]];
        let h = det[[0, 3, i]];
        let coeffs = (0..mask_dim)
            .map(|m| det[[0, 4 + num_classes + m, i]])
            .collect();

        candidates.push(Candidate {
            bbox: (cx - w / 2.0, cy - h / 2.0, w, h),
            confidence: best_score,
            class_id: best_class,
            coeffs,
        });
    }

    let kept = non_max_suppress(candidates, iou_threshold);
    debug!("Segmentation kept {} instances after NMS", kept.len());

    let scale_x = frame_width / input_size;
    let scale_y = frame_height / input_size;

    let mut detections = Vec::with_capacity(kept.len());
    for cand in kept {
        let mask = instance_mask(&cand, &protos, input_size)?;

        let bx = (cand.bbox.0 * scale_x).max(0.0);
        let by = (cand.bbox.1 * scale_y).max(0.0);
        let bw = (cand.bbox.2 * scale_x).min(frame_width - bx);
        let bh = (cand.bbox.3 * scale_y).min(frame_height - by);

        let class_name = class_names
            .get(cand.class_id)
            .cloned()
            .unwrap_or_else(|| format!("class {}", cand.class_id));

        detections.push(Detection {
            class_id: cand.class_id,
            class_name,
            confidence: cand.confidence,
            bbox: (bx, by, bw, bh),
            mask,
        });
    }

    Ok(detections)
}

/// Greedy NMS: highest confidence first, drop anything overlapping a kept
/// box past the IoU threshold
fn non_max_suppress(mut candidates: Vec<Candidate>, iou_threshold: f32) -> Vec<Candidate> {
    candidates.retain(|c| c.confidence.is_finite());
    candidates.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep: Vec<Candidate> = Vec::new();
    for candidate in candidates {
        let overlaps = keep
            .iter()
            .any(|k| box_iou(&k.bbox, &candidate.bbox) > iou_threshold);
        if !overlaps {
            keep.push(candidate);
        }
    }
    keep
}

fn box_iou(a: &(f32, f32, f32, f32), b: &(f32, f32, f32, f32)) -> f32 {
    let (ax, ay, aw, ah) = *a;
    let (bx, by, bw, bh) = *b;

    let inter_x1 = ax.max(bx);
    let inter_y1 = ay.max(by);
    let inter_x2 = (ax + aw).min(bx + bw);
    let inter_y2 = (ay + ah).min(by + bh);

    if inter_x2 <= inter_x1 || inter_y2 <= inter_y1 {
        return 0.0;
    }

    let intersection = (inter_x2 - inter_x1) * (inter_y2 - inter_y1);
    let union = aw * ah + bw * bh - intersection;
    if union <= 0.0 {
        return 0.0;
    }
    intersection / union
}

/// Combine mask coefficients with the prototypes at prototype resolution.
/// sigmoid(v) > 0.5 is equivalent to v > 0, so the sum is thresholded
/// directly. Cells outside the candidate's box stay background.
fn instance_mask(
    cand: &Candidate,
    protos: &ArrayView4<f32>,
    input_size: f32,
) -> Result<InstanceMask, VisionError> {
    let mask_dim = protos.shape()[1];
    let proto_h = protos.shape()[2];
    let proto_w = protos.shape()[3];

    let sx = proto_w as f32 / input_size;
    let sy = proto_h as f32 / input_size;
    let x0 = (cand.bbox.0 * sx).floor().max(0.0) as usize;
    let y0 = (cand.bbox.1 * sy).floor().max(0.0) as usize;
    let x1 = ((cand.bbox.0 + cand.bbox.2) * sx).ceil().min(proto_w as f32) as usize;
    let y1 = ((cand.bbox.1 + cand.bbox.3) * sy).ceil().min(proto_h as f32) as usize;

    let mut data = vec![0u8; proto_w * proto_h];
    for y in y0..y1 {
        for x in x0..x1 {
            let mut v = 0.0f32;
            for m in 0..mask_dim {
                v += cand.coeffs[m] * protos[[0, m, y, x]];
            }
            if v > 0.0 {
                data[y * proto_w + x] = 1;
            }
        }
    }

    InstanceMask::new(proto_w, proto_h, data)
}
