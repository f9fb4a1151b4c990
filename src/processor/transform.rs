//! Geometric transforms that keep boxes aligned with pixels.

use crate::{common::*, label::BoxLabel};

/// Per-side pixel offsets that square a rectangular frame.
///
/// Exactly one axis pair is nonzero and its sides sum to `|h - w|`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Padding {
    pub left: i64,
    pub right: i64,
    pub top: i64,
    pub bottom: i64,
}

/// Zero-pads the shorter axis so that the output is square with side
/// `max(h, w)`. No original pixel is cropped.
pub fn pad_to_square(image: &Tensor) -> Result<(Tensor, Padding)> {
    let (channels, height, width) = image.size3()?;
    let difference = (height - width).abs();

    let padding = if height <= width {
        let top = difference / 2;
        Padding {
            left: 0,
            right: 0,
            top,
            bottom: difference - top,
        }
    } else {
        let left = difference / 2;
        Padding {
            left,
            right: difference - left,
            top: 0,
            bottom: 0,
        }
    };

    let side = cmp::max(height, width);
    let padded = tch::no_grad(|| {
        image
            .view([1, channels, height, width])
            .zero_pad2d(padding.left, padding.right, padding.top, padding.bottom)
            .view([channels, side, side])
    });

    Ok((padded, padding))
}

/// Bilinear resize to `size x size` with corner-aligned sampling, so that
/// normalized box coordinates stay geometrically consistent across arbitrary
/// resize factors.
pub fn resize(image: &Tensor, size: i64) -> Result<Tensor> {
    ensure!(size > 0, "resize target must be positive, but get {}", size);
    let _ = image.size3()?;

    let resized = tch::no_grad(|| {
        image
            .unsqueeze(0)
            .upsample_bilinear2d(&[size, size], true, None, None)
            .squeeze_dim(0)
    });

    Ok(resized)
}

/// Mirrors the image along the width axis and rewrites `cx -> 1 - cx`.
///
/// Labels must already be normalized to the current frame. An absent label
/// set flips the image only.
pub fn horizontal_flip(
    image: &Tensor,
    labels: Option<Vec<BoxLabel>>,
) -> (Tensor, Option<Vec<BoxLabel>>) {
    let flipped = tch::no_grad(|| image.flip(&[-1]));
    let labels = labels.map(|labels| {
        labels
            .into_iter()
            .map(|label| BoxLabel {
                cx: r64(1.0) - label.cx,
                ..label
            })
            .collect()
    });

    (flipped, labels)
}
