//! Tensor extensions shared across the pipeline.

use crate::common::*;

pub trait TensorExt {
    fn f_rgb_to_hsv(&self) -> Result<Tensor>;

    fn rgb_to_hsv(&self) -> Tensor {
        self.f_rgb_to_hsv().unwrap()
    }

    fn f_hsv_to_rgb(&self) -> Result<Tensor>;

    fn hsv_to_rgb(&self) -> Tensor {
        self.f_hsv_to_rgb().unwrap()
    }
}

impl TensorExt for Tensor {
    fn f_rgb_to_hsv(&self) -> Result<Tensor> {
        let eps = 1e-4;
        let rgb = self;
        let (channels, _height, _width) = rgb.size3()?;
        ensure!(
            channels == 3,
            "channel size must be 3, but get {}",
            channels
        );

        let red = rgb.select(0, 0);
        let green = rgb.select(0, 1);
        let blue = rgb.select(0, 2);

        let (max, argmax) = rgb.max_dim(0, false);
        let (min, _argmin) = rgb.min_dim(0, false);
        let diff = &max - &min;

        let value = max;
        let saturation = (&diff / &value).where_self(&value.gt(eps), &value.zeros_like());

        let case1 = value.zeros_like();
        let case2 = (&green - &blue) / &diff;
        let case3 = (&blue - &red) / &diff + 2.0;
        let case4 = (&red - &green) / &diff + 4.0;

        let hue = {
            let hue = case1.where_self(
                &diff.le(eps),
                &case2.where_self(&argmax.eq(0), &case3.where_self(&argmax.eq(1), &case4)),
            );
            let hue = hue.where_self(&hue.ge(0.0), &(&hue + 6.0));
            hue / 6.0
        };

        let hsv = Tensor::stack(&[hue, saturation, value], 0);

        debug_assert!(
            !bool::from(hsv.isnan().any()),
            "NaN detected in RGB to HSV conversion"
        );

        Ok(hsv)
    }

    fn f_hsv_to_rgb(&self) -> Result<Tensor> {
        let hsv = self;
        let (channels, _height, _width) = hsv.size3()?;
        ensure!(
            channels == 3,
            "channel size must be 3, but get {}",
            channels
        );

        let hue = hsv.select(0, 0);
        let saturation = hsv.select(0, 1);
        let value = hsv.select(0, 2);

        // component(n) = v - v*s*clamp(min(k, 4-k), 0, 1), k = (h*6 + n) mod 6
        let component = |n: f64| {
            let k = (&hue * 6.0 + n).fmod(6.0);
            &value - &value * &saturation * k.minimum(&(-&k + 4.0)).clamp(0.0, 1.0)
        };

        let red = component(5.0);
        let green = component(3.0);
        let blue = component(1.0);
        let rgb = Tensor::stack(&[red, green, blue], 0);

        Ok(rgb)
    }
}
