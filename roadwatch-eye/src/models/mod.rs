//! Segmentation model backends

pub mod yolo;

pub use yolo::YoloSeg;
