use crate::common::*;

/// The record with image path and boxes, but without image pixels.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileRecord {
    pub path: PathBuf,
    pub size: HW<usize>,
    /// Bounding boxes in pixel units with raw external class IDs.
    pub bboxes: Vec<PixelLabel>,
}

/// The record with image pixels and finalized boxes.
#[derive(Debug, TensorLike)]
pub struct DataRecord {
    pub image: Tensor,
    #[tensor_like(clone)]
    pub bboxes: Vec<RatioLabel>,
}

/// One assembled batch.
#[derive(Debug, TensorLike)]
pub struct TrainingRecord {
    pub step: usize,
    pub image: Tensor,
    #[tensor_like(clone)]
    pub bboxes: Vec<Vec<RatioLabel>>,
}
