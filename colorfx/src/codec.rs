use crate::{ServiceError, ServiceResult};
use base64::{Engine, engine::general_purpose::STANDARD};
use color_engine::{ColorEffect, RasterBuffer};
use image::{DynamicImage, codecs::jpeg::JpegEncoder};

/// Whether `filename` carries one of the `allowed` extensions (case-insensitive).
pub fn allowed_file(filename: &str, allowed: &[String]) -> bool {
    match filename.rsplit_once('.') {
        Some((_, ext)) => allowed.iter().any(|item| item.eq_ignore_ascii_case(ext)),
        None => false,
    }
}

pub fn decode(bytes: &[u8]) -> ServiceResult<DynamicImage> {
    image::load_from_memory(bytes).map_err(|e| ServiceError::InvalidImageData(e.to_string()))
}

pub fn encode_jpeg(image: &RasterBuffer, quality: u8) -> ServiceResult<Vec<u8>> {
    let mut output = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut output, quality);
    encoder.encode_image(image)?;
    Ok(output)
}

/// Decode `bytes`, apply `effect` and encode the result as JPEG.
pub fn process(bytes: &[u8], effect: ColorEffect, quality: u8) -> ServiceResult<Vec<u8>> {
    let image = decode(bytes)?;
    log::debug!(
        "decoded {}x{} {:?} image",
        image.width(),
        image.height(),
        image.color()
    );

    let output = color_engine::apply_dynamic(image, effect);
    encode_jpeg(&output, quality)
}

pub fn encode_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Accepts plain base64 as well as a `data:<mime>;base64,` URL.
pub fn decode_base64(text: &str) -> ServiceResult<Vec<u8>> {
    let text = text.trim();
    let payload = match text.strip_prefix("data:") {
        Some(url) => url.split_once(',').map(|(_, data)| data).unwrap_or(url),
        None => text,
    };

    STANDARD
        .decode(payload)
        .map_err(|e| ServiceError::InvalidImageData(e.to_string()))
}
