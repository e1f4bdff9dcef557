//! Restyle Session - Async QR Styling
//!
//! `style_qr` awaits the source raster and the logo decode, repaints the
//! reconstructed grid and degrades to an unstyled render when anything but
//! the encoder fails. `RestyleSession` adds generation tokens so a burst of
//! option changes can never paint an older style over a newer one.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use image::RgbaImage;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::grid::{reconstruct, ReconstructionError};
use crate::logo::{decode_logo, AssetError};
use crate::raster::{QrRasterSource, RenderError};
use crate::style::{StyleError, StyleSpec};
use crate::styler;

/// Why a composite is not the fully styled one.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum StyleOutcome {
    Styled,
    /// Logo could not be decoded; grid-only composite
    LogoOmitted(String),
    /// Unstyled encoder render
    Fallback(String),
}

#[derive(Debug, Clone)]
pub struct StyledQr {
    pub image: RgbaImage,
    pub outcome: StyleOutcome,
}

#[derive(Debug, thiserror::Error)]
enum StyleFailure {
    #[error(transparent)]
    Style(#[from] StyleError),
    #[error(transparent)]
    Reconstruction(#[from] ReconstructionError),
}

/// Style `data` as a QR code. Only an encoder failure is an error.
pub async fn style_qr<S: QrRasterSource>(
    source: &S,
    data: &str,
    style: &StyleSpec,
) -> Result<StyledQr, RenderError> {
    if let Err(e) = style.check() {
        return fallback(source, data, style, StyleFailure::from(e).to_string());
    }
    let raster = source.render(data, style.size).await?;
    style_raster(source, data, style, &raster).await
}

/// Restyle an already rendered source raster.
async fn style_raster<S: QrRasterSource>(
    source: &S,
    data: &str,
    style: &StyleSpec,
    raster: &RgbaImage,
) -> Result<StyledQr, RenderError> {
    let grid = match reconstruct(raster).map_err(StyleFailure::from) {
        Ok(grid) => grid,
        Err(e) => return fallback(source, data, style, e.to_string()),
    };

    let (logo, outcome) = match &style.logo {
        None => (None, StyleOutcome::Styled),
        Some(spec) => match spec.check() {
            Err(e) => (None, omit_logo(e)),
            Ok(()) => match decode_logo(spec.data.clone()).await {
                Ok(logo) => (Some(logo), StyleOutcome::Styled),
                Err(e) => (None, omit_logo(e)),
            },
        },
    };

    let image = styler::render(&grid, style, logo.as_ref());
    Ok(StyledQr { image, outcome })
}

fn omit_logo(err: AssetError) -> StyleOutcome {
    warn!(error = %err, "logo omitted");
    StyleOutcome::LogoOmitted(err.to_string())
}

fn fallback<S: QrRasterSource>(
    source: &S,
    data: &str,
    style: &StyleSpec,
    reason: String,
) -> Result<StyledQr, RenderError> {
    warn!(%reason, "QR restyle failed, using unstyled render");
    let size = style.size.max(1);
    let image = source.render_plain(data, size, style.foreground, style.background)?;
    Ok(StyledQr {
        image,
        outcome: StyleOutcome::Fallback(reason),
    })
}

#[derive(Debug)]
pub enum Restyle {
    /// Result was current and now occupies the canvas
    Applied(Arc<StyledQr>),
    /// A newer request started while this one was waiting
    Stale { generation: u64, latest: u64 },
}

/// Owner of the displayed QR canvas.
pub struct RestyleSession<S> {
    source: S,
    generation: AtomicU64,
    canvas: Mutex<Option<(u64, Arc<StyledQr>)>>,
}

impl<S: QrRasterSource> RestyleSession<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            generation: AtomicU64::new(0),
            canvas: Mutex::new(None),
        }
    }

    pub fn latest_generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    fn is_current(&self, generation: u64) -> bool {
        self.latest_generation() == generation
    }

    /// Current composite, if any request has been applied.
    pub async fn canvas(&self) -> Option<Arc<StyledQr>> {
        self.canvas.lock().await.as_ref().map(|(_, qr)| Arc::clone(qr))
    }

    /// Generation of the composite on the canvas.
    pub async fn canvas_generation(&self) -> Option<u64> {
        self.canvas.lock().await.as_ref().map(|(g, _)| *g)
    }

    /// Restyle and replace the canvas, unless a newer request was issued
    /// while this one was suspended.
    pub async fn restyle(&self, data: &str, style: &StyleSpec) -> Result<Restyle, RenderError> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(generation, "restyle requested");

        let styled = if let Err(e) = style.check() {
            fallback(&self.source, data, style, StyleFailure::from(e).to_string())?
        } else {
            let raster = self.source.render(data, style.size).await?;
            if !self.is_current(generation) {
                return Ok(self.stale(generation));
            }
            style_raster(&self.source, data, style, &raster).await?
        };

        let mut canvas = self.canvas.lock().await;
        if !self.is_current(generation) {
            return Ok(self.stale(generation));
        }

        let styled = Arc::new(styled);
        *canvas = Some((generation, Arc::clone(&styled)));
        info!(generation, outcome = ?styled.outcome, "canvas replaced");
        Ok(Restyle::Applied(styled))
    }

    fn stale(&self, generation: u64) -> Restyle {
        let latest = self.latest_generation();
        debug!(generation, latest, "discarding stale restyle");
        Restyle::Stale { generation, latest }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{is_dark_pixel, reconstruct};
    use crate::logo::tests::png_bytes;
    use crate::raster::QrcodeSource;
    use crate::style::{Color, GradientKind, LogoSpec};
    use image::Rgba;
    use std::future::Future;
    use std::time::Duration;

    /// Hands back a fixed raster, ignoring the data.
    struct FixedSource(RgbaImage);

    impl QrRasterSource for FixedSource {
        fn render(&self, _data: &str, _size: u32) -> impl Future<Output = Result<RgbaImage, RenderError>> + Send {
            let img = self.0.clone();
            async move { Ok(img) }
        }

        fn render_plain(&self, data: &str, size: u32, dark: Color, light: Color) -> Result<RgbaImage, RenderError> {
            QrcodeSource::new().render_plain(data, size, dark, light)
        }
    }

    fn assert_not_blank(img: &RgbaImage) {
        assert!(img.pixels().any(is_dark_pixel));
        assert!(img.pixels().any(|p| !is_dark_pixel(p)));
    }

    #[tokio::test]
    async fn test_styles_real_qr() {
        let style = StyleSpec {
            gradient: crate::style::Gradient {
                kind: GradientKind::Radial,
                ..Default::default()
            },
            ..StyleSpec::default()
        };
        let out = style_qr(&QrcodeSource::new(), "https://example.com", &style).await.unwrap();
        assert_eq!(out.outcome, StyleOutcome::Styled);
        assert_eq!(out.image.dimensions(), (200, 200));
        assert_not_blank(&out.image);
    }

    #[tokio::test]
    async fn test_degenerate_raster_falls_back() {
        let source = FixedSource(RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, 255])));
        let out = style_qr(&source, "fallback", &StyleSpec::default()).await.unwrap();
        assert!(matches!(out.outcome, StyleOutcome::Fallback(_)));
        assert_eq!(out.image.dimensions(), (200, 200));
        assert_not_blank(&out.image);
    }

    #[tokio::test]
    async fn test_bad_logo_is_omitted() {
        let mut style = StyleSpec::default();
        style.logo = Some(LogoSpec::new(b"garbage".to_vec()));
        let out = style_qr(&QrcodeSource::new(), "logo", &style).await.unwrap();
        assert!(matches!(out.outcome, StyleOutcome::LogoOmitted(_)));

        let plain = style_qr(&QrcodeSource::new(), "logo", &StyleSpec::default()).await.unwrap();
        assert_eq!(out.image, plain.image);
    }

    #[tokio::test]
    async fn test_bad_logo_ratio_keeps_styled_grid() {
        let gradient = crate::style::Gradient {
            kind: GradientKind::Linear,
            angle: 45.0,
            ..Default::default()
        };
        let plain = StyleSpec { gradient, ..StyleSpec::default() };
        let mut logo = LogoSpec::new(png_bytes(&RgbaImage::from_pixel(4, 4, Rgba([0, 128, 0, 255]))));
        logo.size_ratio = 1.5;
        let with_logo = StyleSpec { logo: Some(logo), ..plain.clone() };

        let out = style_qr(&QrcodeSource::new(), "ratio", &with_logo).await.unwrap();
        assert!(matches!(out.outcome, StyleOutcome::LogoOmitted(_)));

        let expected = style_qr(&QrcodeSource::new(), "ratio", &plain).await.unwrap();
        assert_eq!(out.image, expected.image);
    }

    #[tokio::test]
    async fn test_logo_is_composited() {
        let logo = RgbaImage::from_pixel(16, 16, Rgba([0, 128, 0, 255]));
        let mut style = StyleSpec::default();
        style.logo = Some(LogoSpec::new(png_bytes(&logo)));
        let out = style_qr(&QrcodeSource::new(), "with logo", &style).await.unwrap();
        assert_eq!(out.outcome, StyleOutcome::Styled);
        assert_eq!(out.image.get_pixel(100, 100), &Rgba([0, 128, 0, 255]));
    }

    #[tokio::test]
    async fn test_styled_qr_still_reconstructs() {
        let out = style_qr(&QrcodeSource::new(), "scan me", &StyleSpec::default()).await.unwrap();
        let raster = QrcodeSource::new().render("scan me", 200).await.unwrap();
        assert_eq!(reconstruct(&out.image).unwrap(), reconstruct(&raster).unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_generation_is_discarded() {
        let session = Arc::new(RestyleSession::new(QrcodeSource::with_settle(Duration::from_millis(100))));

        let slow = {
            let session = Arc::clone(&session);
            tokio::spawn(async move { session.restyle("first", &StyleSpec::default()).await })
        };
        tokio::task::yield_now().await;

        let mut newer = StyleSpec::default();
        newer.foreground = Color::rgb(40, 0, 90);
        let fresh = session.restyle("second", &newer).await.unwrap();
        let stale = slow.await.unwrap().unwrap();

        assert!(matches!(fresh, Restyle::Applied(_)));
        assert!(matches!(stale, Restyle::Stale { generation: 1, latest: 2 }));
        assert_eq!(session.canvas_generation().await, Some(2));
    }

    #[tokio::test]
    async fn test_sequential_requests_replace_canvas() {
        let session = RestyleSession::new(QrcodeSource::new());
        assert!(session.canvas().await.is_none());

        session.restyle("one", &StyleSpec::default()).await.unwrap();
        let mut bigger = StyleSpec::default();
        bigger.size = 300;
        session.restyle("two", &bigger).await.unwrap();

        let canvas = session.canvas().await.unwrap();
        assert_eq!(canvas.image.dimensions(), (300, 300));
        assert_eq!(session.canvas_generation().await, Some(2));
    }
}
