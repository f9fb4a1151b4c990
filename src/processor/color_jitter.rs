//! The random color distortion algorithm.

use crate::{common::*, utils::TensorExt as _};

/// [ColorJitter] configuration. Each bound is the maximum absolute shift
/// applied to the corresponding HSV channel; `None` disables that channel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColorJitterInit {
    pub hue_shift: Option<R64>,
    pub saturation_shift: Option<R64>,
    pub value_shift: Option<R64>,
}

impl Default for ColorJitterInit {
    fn default() -> Self {
        Self {
            hue_shift: Some(r64(0.1)),
            saturation_shift: Some(r64(0.5)),
            value_shift: Some(r64(0.5)),
        }
    }
}

impl ColorJitterInit {
    pub fn build(self) -> ColorJitter {
        let Self {
            hue_shift,
            saturation_shift,
            value_shift,
        } = self;

        ColorJitter {
            max_hue_shift: hue_shift.map(R64::raw),
            max_saturation_shift: saturation_shift.map(R64::raw),
            max_value_shift: value_shift.map(R64::raw),
        }
    }
}

/// Pixel-level brightness/saturation/hue perturbation. Never touches
/// geometry.
#[derive(Debug, Clone)]
pub struct ColorJitter {
    max_hue_shift: Option<f64>,
    max_saturation_shift: Option<f64>,
    max_value_shift: Option<f64>,
}

impl ColorJitter {
    pub fn forward(&self, rgb: &Tensor) -> Result<Tensor> {
        tch::no_grad(|| -> Result<_> {
            let (channels, _height, _width) = rgb.size3()?;
            ensure!(
                channels == 3,
                "channel size must be 3, but get {}",
                channels
            );

            let mut rng = StdRng::from_entropy();

            let hsv = rgb.f_rgb_to_hsv()?;
            let mut hue = hsv.select(0, 0);
            let mut saturation = hsv.select(0, 1);
            let mut value = hsv.select(0, 2);

            if let Some(max_shift) = self.max_hue_shift {
                let shift = rng.gen_range(-max_shift..max_shift);
                hue = (hue + (shift + 1.0)).fmod(1.0);
            }

            if let Some(max_shift) = self.max_saturation_shift {
                let shift = rng.gen_range(-max_shift..max_shift);
                saturation = (saturation + shift).clamp(0.0, 1.0);
            }

            if let Some(max_shift) = self.max_value_shift {
                let shift = rng.gen_range(-max_shift..max_shift);
                value = (value + shift).clamp(0.0, 1.0);
            }

            Tensor::stack(&[hue, saturation, value], 0).f_hsv_to_rgb()
        })
    }
}
