//! Data loading and batching for YOLO-style object detection training.
//!
//! The pipeline prepares `(image, boxes)` pairs for a detection training
//! loop: images are decoded and optionally color-jittered, padded to a
//! square frame, box labels are remapped into the padded frame, and batches
//! are stacked at a periodically re-drawn multiscale resolution.
//!
//! - [dataset::ListDataset] produces training items from an image list with
//!   per-image text labels.
//! - [dataset::ImageFolderDataset] produces inference items from a folder of
//!   unlabeled images.
//! - [collate::BatchCollator] assembles items into uniform batches.

mod common;

pub mod collate;
pub mod dataset;
pub mod label;
pub mod processor;
pub mod utils;
