//! Logo Decoding
//!
//! Decoding is the second suspension point of a restyle. It runs on the
//! blocking pool so the scheduling thread stays free for newer requests.

use image::RgbaImage;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum AssetError {
    #[error("Logo size ratio must be in (0, 1], got {0}")]
    Ratio(f64),

    #[error("Logo data is empty")]
    Empty,

    #[error("Logo decode failed: {0}")]
    Decode(String),

    #[error("Logo decode task aborted")]
    Aborted,
}

/// Decode encoded image bytes (PNG, JPEG) into RGBA.
pub fn decode_logo_blocking(bytes: &[u8]) -> Result<RgbaImage, AssetError> {
    if bytes.is_empty() {
        return Err(AssetError::Empty);
    }
    image::load_from_memory(bytes)
        .map(|img| img.to_rgba8())
        .map_err(|e| AssetError::Decode(e.to_string()))
}

pub async fn decode_logo(bytes: Vec<u8>) -> Result<RgbaImage, AssetError> {
    tokio::task::spawn_blocking(move || decode_logo_blocking(&bytes))
        .await
        .map_err(|_| AssetError::Aborted)?
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::{ImageFormat, Rgba};
    use std::io::Cursor;

    pub(crate) fn png_bytes(img: &RgbaImage) -> Vec<u8> {
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[tokio::test]
    async fn test_decodes_png() {
        let src = RgbaImage::from_pixel(4, 3, Rgba([10, 20, 30, 255]));
        let decoded = decode_logo(png_bytes(&src)).await.unwrap();
        assert_eq!(decoded, src);
    }

    #[tokio::test]
    async fn test_rejects_garbage() {
        assert_eq!(decode_logo(vec![]).await, Err(AssetError::Empty));
        assert!(matches!(decode_logo(b"not an image".to_vec()).await, Err(AssetError::Decode(_))));
    }
}
