//! Raster Export - PNG records with content hashes

use std::io::Cursor;

use base64::Engine;
use image::{ImageFormat, RgbaImage};
use serde::{Deserialize, Serialize};

use crate::hashing::sha256_hex;
use crate::raster::RenderError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportedImage {
    pub filename: String,
    pub format: String,
    pub size: [u32; 2],
    pub data_base64: String,
    pub hash: String,
}

pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, RenderError> {
    let mut out = Cursor::new(Vec::new());
    image
        .write_to(&mut out, ImageFormat::Png)
        .map_err(|e| RenderError::Image(e.to_string()))?;
    Ok(out.into_inner())
}

/// Encode as PNG and wrap in a hashed, base64 export record.
pub fn export_png(stem: &str, image: &RgbaImage) -> Result<ExportedImage, RenderError> {
    let data = encode_png(image)?;
    Ok(ExportedImage {
        filename: format!("{}.png", stem),
        format: "png".to_string(),
        size: [image.width(), image.height()],
        data_base64: base64::engine::general_purpose::STANDARD.encode(&data),
        hash: sha256_hex(&data),
    })
}

impl ExportedImage {
    pub fn decode_bytes(&self) -> Result<Vec<u8>, base64::DecodeError> {
        base64::engine::general_purpose::STANDARD.decode(&self.data_base64)
    }
}
