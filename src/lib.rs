//! Barcode Forge Core - Barcode & QR Generation Engine
//!
//! # Guarantees
//! 1. Check digits follow the GS1 mod-10 rule
//! 2. EAN-13 is never padded; incomplete input is reported, not guessed
//! 3. Validation gates every render
//! 4. Styled QR output keeps the encoder's module topology
//! 5. A failed restyle falls back to the plain symbol, never a blank canvas
//! 6. Only the newest restyle request may replace the canvas

pub mod checksum;
pub mod symbology;
pub mod compose;
pub mod validation;
pub mod content;
pub mod style;
pub mod presets;
pub mod grid;
pub mod styler;
pub mod raster;
pub mod logo;
pub mod session;
pub mod hashing;
pub mod export;
pub mod pipeline;

pub use checksum::check_digit;
pub use symbology::{Symbology, SymbologyInfo};
pub use compose::{compose, ComposeError, Gs1Fields, StructuredCode};
pub use validation::{validate, ValidationError, ValidationResult, ValidationRule, ValidationViolation, ViolationSeverity};
pub use content::QrContent;
pub use style::{Color, Gradient, GradientKind, LogoSpec, StyleSpec};
pub use presets::{PresetRegistry, StylePreset};
pub use grid::{reconstruct, ModuleGrid, ReconstructionError};
pub use raster::{BarcodeRasterizer, QrRasterSource, QrcodeSource, RenderError};
pub use logo::AssetError;
pub use session::{style_qr, Restyle, RestyleSession, StyleOutcome, StyledQr};
pub use hashing::{canonical_json, compute_job_hash};
pub use export::ExportedImage;
pub use pipeline::{GenerateInput, GenerateRequest, GeneratedBarcode, GenerationPipeline, PipelineError};

pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");
