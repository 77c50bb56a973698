use crate::{Effect, RasterBuffer, clamp_channel, map_pixels};
use derivative::Derivative;
use derive_setters::Setters;

pub type ColorMatrix = [[f64; 3]; 3];

/// Classic sepia tone matrix, rows produce R, G, B
pub const SEPIA_MATRIX: ColorMatrix = [
    [0.393, 0.769, 0.189],
    [0.349, 0.686, 0.168],
    [0.272, 0.534, 0.131],
];

/// Linear 3x3 transform applied to every pixel: `out = M * in`
#[derive(Debug, Clone, Derivative, Setters)]
#[derivative(Default)]
#[setters(prefix = "with_")]
#[non_exhaustive]
pub struct ColorMatrixConfig {
    #[derivative(Default(value = "SEPIA_MATRIX"))]
    matrix: ColorMatrix,
}

impl ColorMatrixConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sepia() -> Self {
        Self::default().with_matrix(SEPIA_MATRIX)
    }
}

impl Effect for ColorMatrixConfig {
    fn apply(&self, image: RasterBuffer) -> RasterBuffer {
        let m = self.matrix;

        map_pixels(image, |pixel| {
            let (r, g, b) = (pixel[0] as f64, pixel[1] as f64, pixel[2] as f64);
            for (channel, row) in pixel.iter_mut().zip(m.iter()) {
                *channel = clamp_channel(row[0] * r + row[1] * g + row[2] * b);
            }
        })
    }
}

/// Independent multiplier per channel
#[derive(Debug, Clone, Derivative, Setters)]
#[derivative(Default)]
#[setters(prefix = "with_")]
#[non_exhaustive]
pub struct ChannelGainConfig {
    #[derivative(Default(value = "1.0"))]
    red: f64,

    #[derivative(Default(value = "1.0"))]
    green: f64,

    #[derivative(Default(value = "1.0"))]
    blue: f64,
}

impl ChannelGainConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_gains(red: f64, green: f64, blue: f64) -> Self {
        Self { red, green, blue }
    }

    /// More red and a little yellow, less blue
    pub fn warm() -> Self {
        Self::from_gains(1.1, 1.05, 0.9)
    }

    /// More blue, less red
    pub fn cool() -> Self {
        Self::from_gains(0.9, 1.0, 1.2)
    }
}

impl Effect for ChannelGainConfig {
    fn apply(&self, image: RasterBuffer) -> RasterBuffer {
        let gains = [self.red, self.green, self.blue];

        map_pixels(image, |pixel| {
            for (channel, gain) in pixel.iter_mut().zip(gains) {
                *channel = clamp_channel(*channel as f64 * gain);
            }
        })
    }
}
