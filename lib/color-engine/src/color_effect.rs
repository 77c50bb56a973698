use crate::{
    ColorEngineError, Effect, RasterBuffer,
    base::{ContrastConfig, GrayscaleConfig, SaturationConfig},
    filter::{ChannelGainConfig, ColorMatrixConfig},
};
use num_enum::{IntoPrimitive, TryFromPrimitive};
use std::{fmt, str::FromStr};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum ColorEffect {
    #[default]
    Enhance = 0,
    Vintage,
    Cool,
    Warm,
    Grayscale,
    Vibrant,
}

impl ColorEffect {
    pub const ALL: [ColorEffect; 6] = [
        ColorEffect::Enhance,
        ColorEffect::Vintage,
        ColorEffect::Cool,
        ColorEffect::Warm,
        ColorEffect::Grayscale,
        ColorEffect::Vibrant,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ColorEffect::Enhance => "enhance",
            ColorEffect::Vintage => "vintage",
            ColorEffect::Cool => "cool",
            ColorEffect::Warm => "warm",
            ColorEffect::Grayscale => "grayscale",
            ColorEffect::Vibrant => "vibrant",
        }
    }

    pub fn names() -> Vec<&'static str> {
        Self::ALL.iter().map(|effect| effect.name()).collect()
    }
}

impl fmt::Display for ColorEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ColorEffect {
    type Err = ColorEngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        Self::ALL
            .into_iter()
            .find(|effect| effect.name().eq_ignore_ascii_case(name))
            .ok_or_else(|| ColorEngineError::UnsupportedEffect(name.to_string()))
    }
}

impl Effect for ColorEffect {
    fn apply(&self, image: RasterBuffer) -> RasterBuffer {
        log::debug!(
            "apply {} effect to {}x{} image",
            self.name(),
            image.width(),
            image.height()
        );

        match self {
            ColorEffect::Enhance => SaturationConfig::new().with_factor(1.5).apply(image),
            ColorEffect::Vintage => ColorMatrixConfig::sepia().apply(image),
            ColorEffect::Cool => {
                let image = SaturationConfig::new().with_factor(0.8).apply(image);
                ChannelGainConfig::cool().apply(image)
            }
            ColorEffect::Warm => ChannelGainConfig::warm().apply(image),
            ColorEffect::Grayscale => GrayscaleConfig::new().apply(image),
            ColorEffect::Vibrant => {
                let image = SaturationConfig::new().with_factor(2.0).apply(image);
                ContrastConfig::new()
                    .with_factor(1.2)
                    .with_midpoint(128.0)
                    .apply(image)
            }
        }
    }
}
