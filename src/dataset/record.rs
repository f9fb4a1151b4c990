use crate::{common::*, label::BoxLabel};

/// One training item: the padded image and its labels remapped to the
/// padded frame.
#[derive(Debug, TensorLike)]
pub struct DataRecord {
    #[tensor_like(clone)]
    pub path: PathBuf,
    /// `[channel, side, side]` float tensor in `[0, 1]`.
    pub image: Tensor,
    /// `None` when the image has no label file. An existing label file with
    /// zero rows yields `Some(vec![])`.
    #[tensor_like(clone)]
    pub labels: Option<Vec<BoxLabel>>,
}

/// One inference item: the padded and resized image, no labels.
#[derive(Debug, TensorLike)]
pub struct ImageRecord {
    #[tensor_like(clone)]
    pub path: PathBuf,
    pub image: Tensor,
}
