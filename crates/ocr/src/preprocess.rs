use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;
use thiserror::Error;

/// Longest edge sent to the OCR service. Phone cameras produce far more
/// than text detection needs, and the request body is base64 of the image.
pub const DEFAULT_MAX_DIMENSION: u32 = 2048;

const JPEG_QUALITY: u8 = 90;

#[derive(Debug, Error)]
pub enum PreprocessError {
    #[error("Failed to load image: {0}")]
    Load(#[from] image::ImageError),
    #[error("Failed to encode processed image: {0}")]
    Encode(String),
}

/// Validate raw image bytes (JPEG / PNG / WEBP / …) and down-scale them when
/// either edge exceeds `max_dimension`. Images already within bounds are
/// passed through untouched.
pub fn prepare_for_ocr(data: &[u8], max_dimension: u32) -> Result<Vec<u8>, PreprocessError> {
    let img = image::load_from_memory(data)?;
    if img.width() <= max_dimension && img.height() <= max_dimension {
        return Ok(data.to_vec());
    }

    tracing::debug!(
        width = img.width(),
        height = img.height(),
        max_dimension,
        "down-scaling receipt image"
    );
    let resized = img.resize(max_dimension, max_dimension, image::imageops::FilterType::Lanczos3);
    encode_as_jpeg(resized)
}

fn encode_as_jpeg(img: DynamicImage) -> Result<Vec<u8>, PreprocessError> {
    // JPEG has no alpha channel.
    let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
    let mut buf = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut buf, JPEG_QUALITY);
    rgb.write_with_encoder(encoder)
        .map_err(|e| PreprocessError::Encode(e.to_string()))?;
    Ok(buf)
}
