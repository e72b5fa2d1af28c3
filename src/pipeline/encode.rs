//! Image encoding for vision requests: `DynamicImage` or an image file on
//! disk to a base64 PNG wrapped in `ImageData`.
//!
//! PNG keeps rendered text crisp. `detail: "high"` lets GPT-4-class models
//! tile the image instead of looking at a single 512 px overview, which
//! matters for small table cells and chart labels.

use crate::error::Pdf2TablesError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use image::DynamicImage;
use std::io::Cursor;
use std::path::Path;
use tracing::debug;

/// Encode an in-memory image (a page render) as base64 PNG.
pub fn encode_image(img: &DynamicImage) -> Result<ImageData, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;

    let b64 = STANDARD.encode(&buf);
    debug!("Encoded {}x{} image → {} bytes base64", img.width(), img.height(), b64.len());

    Ok(ImageData::new(b64, "image/png").with_detail("high"))
}

/// Load an extracted figure from disk and encode it.
///
/// The file is decoded and re-encoded so JPEG figures reach the
/// model as PNG too.
pub fn encode_file(path: &Path) -> Result<ImageData, Pdf2TablesError> {
    let img = image::open(path).map_err(|e| Pdf2TablesError::ImageReadFailed {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })?;
    encode_image(&img).map_err(|e| Pdf2TablesError::Internal(format!("PNG encode: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn encode_small_image() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(10, 10, Rgba([255, 0, 0, 255])));
        let data = encode_image(&img).expect("encode should succeed");
        assert_eq!(data.mime_type, "image/png");
        let decoded = STANDARD.decode(&data.data).expect("valid base64");
        assert_eq!(&decoded[1..4], b"PNG");
    }

    #[test]
    fn encode_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("figure-1-1.png");
        RgbaImage::from_pixel(4, 3, Rgba([0, 0, 255, 255]))
            .save(&path)
            .unwrap();
        let data = encode_file(&path).unwrap();
        assert!(!data.data.is_empty());
    }

    #[test]
    fn encode_missing_file_fails() {
        let err = encode_file(Path::new("/no/such/figure.png")).unwrap_err();
        assert!(matches!(err, Pdf2TablesError::ImageReadFailed { .. }));
    }
}
