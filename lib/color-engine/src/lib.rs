pub mod base;
pub mod color_effect;
pub mod filter;

pub use color_effect::ColorEffect;

use image::{DynamicImage, RgbImage};
use rayon::prelude::*;

/// 8-bit RGB pixel grid. Every effect consumes one and returns a new one of the same size.
pub type RasterBuffer = RgbImage;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ColorEngineError {
    #[error("Unsupported effect: {0}")]
    UnsupportedEffect(String),
}

pub trait Effect {
    fn apply(&self, image: RasterBuffer) -> RasterBuffer;
}

/// Apply `effect` to an already normalized RGB buffer.
pub fn apply(image: RasterBuffer, effect: ColorEffect) -> RasterBuffer {
    effect.apply(image)
}

/// Convert any decoded image to 8-bit RGB. Alpha is dropped, single channel
/// images are expanded to three equal channels.
pub fn normalize(image: DynamicImage) -> RasterBuffer {
    match image {
        DynamicImage::ImageRgb8(rgb) => rgb,
        other => other.into_rgb8(),
    }
}

pub fn apply_dynamic(image: DynamicImage, effect: ColorEffect) -> RasterBuffer {
    effect.apply(normalize(image))
}

/// Clamp to [0, 255] and truncate toward zero.
#[inline]
pub fn clamp_channel(value: f64) -> u8 {
    value.clamp(0.0, 255.0) as u8
}

/// ITU-R 601 luma in 16-bit fixed point, rounded half up, the same
/// weights an RGB to `L` conversion uses. The weights sum to 65536 so a
/// pixel with R = G = B = k maps to exactly k.
#[inline]
pub fn luma(r: u8, g: u8, b: u8) -> u8 {
    ((r as u32 * 19595 + g as u32 * 38470 + b as u32 * 7471 + 0x8000) >> 16) as u8
}

/// Run `f` over every pixel of `image` in place. Pixels are independent of
/// each other so the work is split across the rayon pool.
pub(crate) fn map_pixels<F>(mut image: RasterBuffer, f: F) -> RasterBuffer
where
    F: Fn(&mut [u8]) + Send + Sync,
{
    if image.is_empty() {
        return image;
    }

    let pixels: &mut [u8] = &mut image;
    pixels.par_chunks_exact_mut(3).for_each(|pixel| f(pixel));
    image
}
