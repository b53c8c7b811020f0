// SPDX-License-Identifier: GPL-3.0-only

//! Synthetic still frames for the virtual camera

use image::{Rgb, RgbImage};

use crate::backends::camera::types::{CapturedImage, ImageFormat, Resolution};

/// Render a diagonal gradient test pattern of `size`
///
/// `seed` shifts the hue so consecutive captures are distinguishable.
pub fn test_pattern(size: Resolution, seed: u8) -> RgbImage {
    let width = size.width.max(1);
    let height = size.height.max(1);
    RgbImage::from_fn(width, height, |x, y| {
        let r = ((x * 255) / width) as u8;
        let g = ((y * 255) / height) as u8;
        Rgb([r, g, seed.wrapping_mul(37)])
    })
}

/// Encode an RGB image as JPEG
pub fn encode_jpeg(image: &RgbImage, quality: u8) -> Result<Vec<u8>, String> {
    let mut buffer = Vec::new();
    let mut cursor = std::io::Cursor::new(&mut buffer);

    let mut encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut cursor, quality);

    encoder
        .encode(
            image.as_raw(),
            image.width(),
            image.height(),
            image::ExtendedColorType::Rgb8,
        )
        .map_err(|e| format!("JPEG encoding failed: {}", e))?;

    Ok(buffer)
}

/// Produce an encoded still the way a device would hand it over
pub fn synthesize_still(size: Resolution, seed: u8) -> Result<CapturedImage, String> {
    let image = test_pattern(size, seed);
    let data = encode_jpeg(&image, crate::constants::sink::VIRTUAL_JPEG_QUALITY)?;
    Ok(CapturedImage {
        data,
        format: ImageFormat::Jpeg,
        width: image.width(),
        height: image.height(),
    })
}
