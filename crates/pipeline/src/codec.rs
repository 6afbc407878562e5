//! Image decoding and JPEG encoding.

use image::codecs::jpeg::JpegEncoder;
use image::RgbImage;

/// Quality used for annotated output images.
pub const DEFAULT_JPEG_QUALITY: u8 = 80;

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("Failed to decode image: {0}")]
    Decode(#[source] image::ImageError),

    #[error("Failed to encode image: {0}")]
    Encode(#[source] image::ImageError),
}

/// Decode an uploaded image into RGB pixels. The format is sniffed from the
/// bytes, so a PNG uploaded under a `.jpg` name still decodes.
pub fn decode(bytes: &[u8]) -> Result<RgbImage, CodecError> {
    image::load_from_memory(bytes)
        .map(|img| img.to_rgb8())
        .map_err(CodecError::Decode)
}

/// Encode RGB pixels as a baseline JPEG. `quality` is clamped to `1..=100`.
pub fn encode_jpeg(image: &RgbImage, quality: u8) -> Result<Vec<u8>, CodecError> {
    let mut buffer = Vec::new();
    JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100))
        .encode_image(image)
        .map_err(CodecError::Encode)?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use image::Rgb;

    use super::*;

    fn gradient(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 128]))
    }

    #[test]
    fn reencoding_preserves_dimensions() {
        let jpeg = encode_jpeg(&gradient(640, 480), DEFAULT_JPEG_QUALITY).unwrap();
        let decoded = decode(&jpeg).unwrap();
        assert_eq!(decoded.dimensions(), (640, 480));

        let again = encode_jpeg(&decoded, DEFAULT_JPEG_QUALITY).unwrap();
        assert_eq!(decode(&again).unwrap().dimensions(), (640, 480));
    }

    #[test]
    fn output_is_a_jpeg() {
        let jpeg = encode_jpeg(&gradient(16, 8), DEFAULT_JPEG_QUALITY).unwrap();
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
        assert_eq!(
            image::guess_format(&jpeg).unwrap(),
            image::ImageFormat::Jpeg
        );
    }

    #[test]
    fn garbage_fails_to_decode() {
        assert_matches!(decode(b"definitely not an image"), Err(CodecError::Decode(_)));
    }

    #[test]
    fn png_input_is_accepted() {
        let mut png = Vec::new();
        gradient(4, 3)
            .write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
            .unwrap();
        assert_eq!(decode(&png).unwrap().dimensions(), (4, 3));
    }
}
