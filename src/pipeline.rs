//! Generation Pipeline - Single Entry Point
//!
//! CRITICAL: generate MUST call validate_data internally. No bypass.

use chrono::{DateTime, Utc};
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::compose::{compose, ComposeError, Gs1Fields};
use crate::content::QrContent;
use crate::export::{export_png, ExportedImage};
use crate::hashing::compute_job_hash;
use crate::presets::{PresetError, PresetRegistry, StylePreset};
use crate::raster::{BarcodeRasterizer, QrRasterSource, QrcodeSource, RenderError};
use crate::session::{style_qr, StyleOutcome};
use crate::style::StyleSpec;
use crate::symbology::Symbology;
use crate::validation::{ValidationError, ValidationResult, Validator};
use crate::ENGINE_VERSION;

/// Process-wide tally of validation passes, compiled only for tests that
/// need to prove `generate` never skips validation.
#[cfg(feature = "test-hooks")]
pub mod audit {
    use std::sync::atomic::{AtomicU64, Ordering};

    static VALIDATIONS: AtomicU64 = AtomicU64::new(0);

    pub(crate) fn record() {
        VALIDATIONS.fetch_add(1, Ordering::Relaxed);
    }

    pub fn validations() -> u64 {
        VALIDATIONS.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Compose(#[from] ComposeError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Preset(#[from] PresetError),

    #[error("Structured content can only be encoded as QR, not {0}")]
    ContentRequiresQr(Symbology),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PipelineError {
    /// Failure caused by the request data itself rather than the engine.
    pub fn is_user_input(&self) -> bool {
        matches!(
            self,
            PipelineError::Compose(_) | PipelineError::Validation(_) | PipelineError::ContentRequiresQr(_)
        )
    }
}

/// Where the encoded data comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum GenerateInput {
    /// Data string used as given
    Raw { data: String },
    /// GS1 sub-fields packed by the composer
    Fields { fields: Gs1Fields },
    /// Structured QR payload
    Content { content: QrContent },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub symbology: Symbology,
    pub input: GenerateInput,
    #[serde(default)]
    pub style: StyleSpec,
    /// Preset id; its style replaces `style`, keeping the request's logo
    /// when the preset has none
    #[serde(default)]
    pub preset: Option<String>,
}

impl GenerateRequest {
    pub fn raw(symbology: Symbology, data: impl Into<String>) -> Self {
        Self {
            symbology,
            input: GenerateInput::Raw { data: data.into() },
            style: StyleSpec::default(),
            preset: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedBarcode {
    pub id: String,
    pub symbology: Symbology,
    /// Canonical data string handed to the rasterizer
    pub data: String,
    pub engine_version: String,
    pub created_at: DateTime<Utc>,
    pub job_hash: String,
    pub validation: ValidationResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<StyleOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub export: Option<ExportedImage>,
    #[serde(skip)]
    pub image: Option<RgbaImage>,
}

/// The generation pipeline - single entry point for all barcode output
pub struct GenerationPipeline<S = QrcodeSource> {
    source: S,
    presets: PresetRegistry,
    validator: Validator,
    rasterizer: Option<Box<dyn BarcodeRasterizer + Send + Sync>>,
}

impl<S: QrRasterSource> GenerationPipeline<S> {
    pub fn new(source: S, presets: PresetRegistry) -> Self {
        Self {
            source,
            presets,
            validator: Validator::new(),
            rasterizer: None,
        }
    }

    /// Rasterizer for the non-QR symbologies. Without one they produce the
    /// canonical data string only.
    pub fn with_rasterizer(mut self, rasterizer: impl BarcodeRasterizer + Send + Sync + 'static) -> Self {
        self.rasterizer = Some(Box::new(rasterizer));
        self
    }

    pub fn list_presets(&self) -> Vec<&StylePreset> {
        self.presets.list()
    }

    /// Validate a data string
    ///
    /// This is the ONLY validation entry point.
    pub fn validate_data(&self, data: &str, symbology: Symbology) -> ValidationResult {
        #[cfg(feature = "test-hooks")]
        audit::record();

        self.validator.report(data, symbology)
    }

    /// Turn the request input into the canonical data string.
    pub fn resolve_data(&self, request: &GenerateRequest) -> Result<String, PipelineError> {
        match &request.input {
            GenerateInput::Raw { data } => Ok(data.clone()),
            GenerateInput::Fields { fields } => Ok(compose(request.symbology, fields)?.full_code),
            GenerateInput::Content { content } => {
                if request.symbology != Symbology::Qr {
                    return Err(PipelineError::ContentRequiresQr(request.symbology));
                }
                Ok(content.payload())
            }
        }
    }

    fn resolve_style(&self, request: &GenerateRequest) -> Result<StyleSpec, PipelineError> {
        let Some(id) = &request.preset else {
            return Ok(request.style.clone());
        };
        let preset = self.presets.resolve(id, request.symbology, ENGINE_VERSION)?;
        let mut style = preset.style.clone();
        if style.logo.is_none() {
            style.logo = request.style.logo.clone();
        }
        debug!(preset = %id, "applied style preset");
        Ok(style)
    }

    /// Generate a barcode
    ///
    /// CRITICAL: This ALWAYS calls validate_data internally. No bypass possible.
    pub async fn generate(&self, request: &GenerateRequest) -> Result<GeneratedBarcode, PipelineError> {
        let symbology = request.symbology;
        let data = self.resolve_data(request)?;
        let style = self.resolve_style(request)?;

        // MANDATORY: validation gates every render
        let validation = self.validate_data(&data, symbology);
        if let Some(err) = validation.first_error() {
            info!(%symbology, error = %err, "generation rejected");
            return Err(err.into());
        }

        let id = Uuid::new_v4().to_string();
        let job_hash = compute_job_hash(symbology, &data, &style, ENGINE_VERSION)?;
        let stem = format!("{}-{}", symbology.renderer_id(), &job_hash[..12]);

        let (image, outcome) = match symbology {
            Symbology::Qr => {
                let styled = style_qr(&self.source, &data, &style).await?;
                (Some(styled.image), Some(styled.outcome))
            }
            _ => match &self.rasterizer {
                Some(rasterizer) => (Some(rasterizer.render(symbology, &data, &style)?), None),
                None => (None, None),
            },
        };

        let export = image.as_ref().map(|img| export_png(&stem, img)).transpose()?;

        info!(%symbology, %job_hash, rendered = image.is_some(), "barcode generated");
        Ok(GeneratedBarcode {
            id,
            symbology,
            data,
            engine_version: ENGINE_VERSION.to_string(),
            created_at: Utc::now(),
            job_hash,
            validation,
            outcome,
            export,
            image,
        })
    }
}

impl Default for GenerationPipeline {
    fn default() -> Self {
        Self::new(QrcodeSource::new(), PresetRegistry::default())
    }
}
