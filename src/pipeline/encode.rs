//! Image encoding: normalised image → JPEG → base64 `EncodedImageRef`.
//!
//! Chat-completions APIs accept an image either as a fetchable URL or as a
//! `data:` URI embedded in the JSON body. Remote URLs are passed through
//! untouched: the model server fetches them itself, so there is nothing to
//! resize. Everything else is normalised (see [`super::normalize`]) and
//! re-encoded as JPEG, whatever format it arrived in. JPEG at quality 85
//! keeps text legible at roughly a fifth of the PNG size, which matters
//! because base64 inflates the payload by another third.

use super::input::ImageSource;
use super::normalize::normalize;
use crate::config::OcrConfig;
use crate::error::OcrError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;
use std::path::Path;
use tracing::debug;

/// MIME type of every image this module encodes.
pub const JPEG_MIME: &str = "image/jpeg";

/// Size bounds and quality used when encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeOptions {
    pub max_width: u32,
    pub max_height: u32,
    pub jpeg_quality: u8,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            max_width: 1024,
            max_height: 1024,
            jpeg_quality: 85,
        }
    }
}

impl From<&OcrConfig> for EncodeOptions {
    fn from(c: &OcrConfig) -> Self {
        Self {
            max_width: c.max_width,
            max_height: c.max_height,
            jpeg_quality: c.jpeg_quality,
        }
    }
}

/// An image as the model API receives it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodedImageRef {
    /// A remote image the model server fetches itself.
    Url(String),
    /// An inline image.
    Data { mime_type: String, base64: String },
}

impl EncodedImageRef {
    /// The value placed in `image_url.url`.
    pub fn to_url(&self) -> String {
        match self {
            EncodedImageRef::Url(url) => url.clone(),
            EncodedImageRef::Data { mime_type, base64 } => {
                format!("data:{mime_type};base64,{base64}")
            }
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, EncodedImageRef::Url(_))
    }
}

/// Normalise an in-memory image and encode it as a JPEG data reference.
pub fn encode_image(
    image: &DynamicImage,
    options: &EncodeOptions,
) -> Result<EncodedImageRef, OcrError> {
    let rgb = normalize(image, options.max_width, options.max_height);

    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, options.jpeg_quality)
        .encode_image(&rgb)
        .map_err(|e| OcrError::ImageEncode(e.to_string()))?;

    let b64 = STANDARD.encode(&buf);
    debug!(
        "Encoded {}x{} image → {} bytes base64",
        rgb.width(),
        rgb.height(),
        b64.len()
    );

    Ok(EncodedImageRef::Data {
        mime_type: JPEG_MIME.to_string(),
        base64: b64,
    })
}

/// Load a local image file, then [`encode_image`] it.
pub fn encode_file(path: &Path, options: &EncodeOptions) -> Result<EncodedImageRef, OcrError> {
    if !path.exists() {
        return Err(OcrError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let decode_err = |detail: String| OcrError::ImageDecode {
        path: path.to_path_buf(),
        detail,
    };
    // Format is sniffed from the bytes; uploads may be stored without an extension.
    let image = image::ImageReader::open(path)
        .and_then(|r| r.with_guessed_format())
        .map_err(|e| decode_err(e.to_string()))?
        .decode()
        .map_err(|e| decode_err(e.to_string()))?;
    encode_image(&image, options)
}

/// Turn a user-supplied source into an image reference.
///
/// URLs are forwarded verbatim with no download; local paths are loaded,
/// normalised and inlined.
pub fn encode_source(
    source: &ImageSource,
    options: &EncodeOptions,
) -> Result<EncodedImageRef, OcrError> {
    match source {
        ImageSource::Url(url) => Ok(EncodedImageRef::Url(url.clone())),
        ImageSource::Local(path) => encode_file(path, options),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage, Rgba, RgbaImage};

    fn decode_data_uri(uri: &str) -> Vec<u8> {
        let payload = uri
            .strip_prefix("data:image/jpeg;base64,")
            .expect("jpeg data uri prefix");
        STANDARD.decode(payload).expect("valid base64")
    }

    #[test]
    fn rgb_image_round_trips_to_jpeg() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(32, 16, Rgb([200, 10, 10])));
        let encoded = encode_image(&img, &EncodeOptions::default()).unwrap();
        let url = encoded.to_url();
        assert!(url.starts_with("data:image/jpeg;base64,"));

        let bytes = decode_data_uri(&url);
        // JPEG SOI marker.
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
        let decoded = image::load_from_memory_with_format(&bytes, image::ImageFormat::Jpeg)
            .expect("valid JPEG");
        assert_eq!((decoded.width(), decoded.height()), (32, 16));
    }

    #[test]
    fn oversized_image_is_bounded() {
        let img = DynamicImage::new_rgb8(3000, 1500);
        let encoded = encode_image(&img, &EncodeOptions::default()).unwrap();
        let decoded = image::load_from_memory(&decode_data_uri(&encoded.to_url())).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (1024, 512));
    }

    #[test]
    fn rgba_image_encodes() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(8, 8, Rgba([0, 0, 0, 0])));
        let encoded = encode_image(&img, &EncodeOptions::default()).unwrap();
        let decoded = image::load_from_memory(&decode_data_uri(&encoded.to_url()))
            .unwrap()
            .to_rgb8();
        // Transparent → white, allowing for JPEG noise.
        assert!(decoded.get_pixel(4, 4).0.iter().all(|&c| c > 245));
    }

    #[test]
    fn url_source_is_passed_through() {
        let source = ImageSource::Url("https://example.com/scan.png".into());
        let encoded = encode_source(&source, &EncodeOptions::default()).unwrap();
        assert!(encoded.is_remote());
        assert_eq!(encoded.to_url(), "https://example.com/scan.png");
    }

    #[test]
    fn missing_local_file_is_not_found() {
        let source = ImageSource::Local("/no/such/image.png".into());
        let err = encode_source(&source, &EncodeOptions::default()).unwrap_err();
        assert!(matches!(err, OcrError::NotFound { .. }));
    }

    #[test]
    fn undecodable_file_is_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"not an image").unwrap();
        let err = encode_file(&path, &EncodeOptions::default()).unwrap_err();
        assert!(matches!(err, OcrError::ImageDecode { .. }));
    }

    #[test]
    fn png_file_is_reencoded_as_jpeg() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.png");
        RgbImage::from_pixel(20, 20, Rgb([0, 128, 255]))
            .save(&path)
            .unwrap();
        let encoded = encode_file(&path, &EncodeOptions::default()).unwrap();
        match encoded {
            EncodedImageRef::Data { mime_type, .. } => assert_eq!(mime_type, JPEG_MIME),
            other => panic!("expected inline data, got {other:?}"),
        }
    }
}
