use crate::{Effect, RasterBuffer, clamp_channel, luma, map_pixels};
use derivative::Derivative;
use derive_setters::Setters;

/// Saturation blend: each channel moves away from (factor > 1) or towards
/// (factor < 1) the pixel's luma.
#[derive(Debug, Clone, Derivative, Setters)]
#[derivative(Default)]
#[setters(prefix = "with_")]
#[non_exhaustive]
pub struct SaturationConfig {
    #[derivative(Default(value = "1.0"))]
    factor: f64,
}

impl SaturationConfig {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Effect for SaturationConfig {
    fn apply(&self, image: RasterBuffer) -> RasterBuffer {
        let factor = self.factor;
        log::trace!("saturation blend with factor {factor}");

        map_pixels(image, |pixel| {
            let gray = luma(pixel[0], pixel[1], pixel[2]) as f64;
            for channel in pixel.iter_mut() {
                *channel = clamp_channel(gray + factor * (*channel as f64 - gray));
            }
        })
    }
}

/// Contrast stretch around a fixed midpoint
#[derive(Debug, Clone, Derivative, Setters)]
#[derivative(Default)]
#[setters(prefix = "with_")]
#[non_exhaustive]
pub struct ContrastConfig {
    #[derivative(Default(value = "1.0"))]
    factor: f64,

    #[derivative(Default(value = "128.0"))]
    midpoint: f64,
}

impl ContrastConfig {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Effect for ContrastConfig {
    fn apply(&self, image: RasterBuffer) -> RasterBuffer {
        let (factor, midpoint) = (self.factor, self.midpoint);
        log::trace!("contrast stretch with factor {factor} around {midpoint}");

        map_pixels(image, |pixel| {
            for channel in pixel.iter_mut() {
                *channel = clamp_channel(midpoint + factor * (*channel as f64 - midpoint));
            }
        })
    }
}

/// Perceptual grayscale, kept as three equal channels
#[derive(Debug, Clone, Default)]
#[non_exhaustive]
pub struct GrayscaleConfig;

impl GrayscaleConfig {
    pub fn new() -> Self {
        Self
    }
}

impl Effect for GrayscaleConfig {
    fn apply(&self, image: RasterBuffer) -> RasterBuffer {
        map_pixels(image, |pixel| {
            let gray = luma(pixel[0], pixel[1], pixel[2]);
            pixel[0] = gray;
            pixel[1] = gray;
            pixel[2] = gray;
        })
    }
}
