//! Datasets producing per-item image tensors and labels.

mod folder;
mod list;
mod record;
mod streaming;

pub use folder::*;
pub use list::*;
pub use record::*;
pub use streaming::*;

use crate::common::*;

/// A dataset whose items can be produced independently by index.
///
/// Item production is pure with respect to other in-flight items, so a
/// parallel worker pool may call [nth](RandomAccessDataset::nth) freely.
pub trait RandomAccessDataset
where
    Self: Debug + Send + Sync,
{
    type Item: Send;

    /// The number of distinct records.
    fn num_records(&self) -> usize;

    /// Produces the item at `index`. Out-of-range indexes wrap around,
    /// enabling infinite-epoch sampling by an external sampler.
    fn nth(&self, index: usize) -> Result<Self::Item>;
}

/// Decodes an image file into a 3-channel RGB float tensor of shape
/// `[3, height, width]` with values in `[0, 1]`.
pub fn load_rgb_image(path: impl AsRef<Path>) -> Result<Tensor> {
    let path = path.as_ref();
    let rgb = image::io::Reader::open(path)
        .with_context(|| format!("failed to open '{}'", path.display()))?
        .with_guessed_format()
        .with_context(|| {
            format!(
                "failed to determine the image file format: {}",
                path.display()
            )
        })?
        .decode()
        .with_context(|| format!("failed to decode image file: {}", path.display()))?
        .to_rgb8();
    let (width, height) = rgb.dimensions();
    let samples = rgb.into_raw();

    let tensor = tch::no_grad(|| {
        (Tensor::of_slice(&samples)
            .view([height as i64, width as i64, 3])
            .permute(&[2, 0, 1])
            .to_kind(Kind::Float)
            / 255.0)
            .set_requires_grad(false)
    });

    Ok(tensor)
}
