//! External Rasterizers
//!
//! The QR encoder and the 1D/matrix rasterizers are collaborators, not part
//! of the engine. `QrRasterSource` is the seam the restyler awaits on;
//! `QrcodeSource` backs it with the `qrcode` crate at error-correction
//! level H and paints the bare symbol (no quiet zone) at the requested size.

use std::future::Future;
use std::time::Duration;

use image::RgbaImage;
use qrcode::{EcLevel, QrCode};
use thiserror::Error;

use crate::style::Color;
use crate::symbology::Symbology;

/// Message shown for rasterizer rejections of the canonical data string.
pub const INVALID_INPUT_MESSAGE: &str = "Invalid characters or length for this barcode type.";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RenderError {
    #[error("{symbology}: {message}")]
    Rejected { symbology: Symbology, message: String },

    #[error("QR encoding failed: {0}")]
    Encode(String),

    #[error("Image encoding failed: {0}")]
    Image(String),
}

impl RenderError {
    /// Normalize a raw rasterizer message for display.
    pub fn from_rasterizer(symbology: Symbology, raw: &str) -> Self {
        let message = if raw.contains("is not a valid input") {
            INVALID_INPUT_MESSAGE.to_string()
        } else {
            raw.to_string()
        };
        RenderError::Rejected { symbology, message }
    }
}

/// Produces the opaque QR raster the restyler re-interprets.
pub trait QrRasterSource: Send + Sync {
    /// Render `data` as a `size` x `size` QR raster, dark on light.
    fn render(&self, data: &str, size: u32) -> impl Future<Output = Result<RgbaImage, RenderError>> + Send;

    /// Unstyled render in the given colors, used as the fallback output.
    fn render_plain(&self, data: &str, size: u32, dark: Color, light: Color) -> Result<RgbaImage, RenderError>;
}

/// Rasterizer for the non-QR symbologies, driven with the canonical string.
pub trait BarcodeRasterizer {
    fn render(&self, symbology: Symbology, data: &str, style: &crate::style::StyleSpec) -> Result<RgbaImage, RenderError>;
}

/// `qrcode` crate backed source.
#[derive(Debug, Clone, Default)]
pub struct QrcodeSource {
    /// Wait before the raster is considered queryable
    pub settle: Duration,
}

impl QrcodeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settle(settle: Duration) -> Self {
        Self { settle }
    }

    fn encode(data: &str) -> Result<QrCode, RenderError> {
        QrCode::with_error_correction_level(data.as_bytes(), EcLevel::H)
            .map_err(|e| RenderError::Encode(e.to_string()))
    }
}

/// Paint a module matrix edge to edge, mapping pixel centres to modules.
pub fn paint_modules(code: &QrCode, size: u32, dark: Color, light: Color) -> RgbaImage {
    let n = code.width();
    let colors = code.to_colors();
    let (dark, light) = (dark.to_rgba(), light.to_rgba());

    RgbaImage::from_fn(size, size, |x, y| {
        let col = (((x as f64 + 0.5) * n as f64 / size as f64) as usize).min(n - 1);
        let row = (((y as f64 + 0.5) * n as f64 / size as f64) as usize).min(n - 1);
        if colors[row * n + col] == qrcode::Color::Dark {
            dark
        } else {
            light
        }
    })
}

impl QrRasterSource for QrcodeSource {
    fn render(&self, data: &str, size: u32) -> impl Future<Output = Result<RgbaImage, RenderError>> + Send {
        let encoded = Self::encode(data);
        let settle = self.settle;
        async move {
            let code = encoded?;
            if !settle.is_zero() {
                tokio::time::sleep(settle).await;
            }
            Ok(paint_modules(&code, size, Color::BLACK, Color::WHITE))
        }
    }

    fn render_plain(&self, data: &str, size: u32, dark: Color, light: Color) -> Result<RgbaImage, RenderError> {
        let code = Self::encode(data)?;
        Ok(paint_modules(&code, size, dark, light))
    }
}
