//! Barcode Forge CLI - Bridge interface
//!
//! Commands: symbologies, compose, validate, generate, presets
//! Outputs JSON to stdout, logs to stderr
//! Returns 2 on validation or compose failure

use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::json;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use barcodeforge_core::{
    compose::preview, presets::PresetRegistry, Gs1Fields, GenerateRequest, GenerationPipeline,
    QrcodeSource, Symbology,
};

#[derive(Parser)]
#[command(name = "barcodeforge-cli")]
#[command(about = "Barcode Forge CLI - GS1 composition, validation and QR styling")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to style presets directory
    #[arg(short, long, default_value = "presets")]
    presets_dir: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// List supported symbologies and their GS1 layouts
    Symbologies,

    /// List available style presets
    Presets,

    /// Compose a GS1 code from sub-fields
    Compose {
        /// Symbology (EAN13, EAN8, UPC, ITF14)
        #[arg(short, long)]
        symbology: Symbology,

        /// JSON object of field name to digits
        #[arg(short, long)]
        fields: String,
    },

    /// Validate a data string
    Validate {
        #[arg(short, long)]
        symbology: Symbology,

        #[arg(short, long)]
        data: String,
    },

    /// Generate a barcode
    Generate {
        /// JSON payload (GenerateRequest)
        #[arg(short, long)]
        payload: String,

        /// Also write the PNG here
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

fn emit(value: &impl Serialize) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{}", s),
        Err(e) => println!(r#"{{"error": "Serialization failed: {}"}}"#, e),
    }
}

fn failure(error: impl ToString, code: u8) -> ExitCode {
    emit(&json!({"success": false, "error": error.to_string()}));
    ExitCode::from(code)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let registry = match PresetRegistry::load_from_dir(&cli.presets_dir) {
        Ok(r) => r,
        Err(e) => return failure(format!("Failed to load presets: {}", e), 1),
    };

    let pipeline = GenerationPipeline::new(QrcodeSource::new(), registry);

    match cli.command {
        Commands::Symbologies => {
            let catalogue: Vec<_> = Symbology::ALL.iter().map(|s| s.info()).collect();
            emit(&catalogue);
            ExitCode::SUCCESS
        }

        Commands::Presets => {
            let presets: Vec<_> = pipeline
                .list_presets()
                .iter()
                .map(|p| json!({
                    "id": p.id,
                    "name": p.name,
                    "version": p.preset_version,
                    "symbologies": p.symbologies,
                }))
                .collect();
            emit(&presets);
            ExitCode::SUCCESS
        }

        Commands::Compose { symbology, fields } => {
            let fields: Gs1Fields = match serde_json::from_str(&fields) {
                Ok(f) => f,
                Err(e) => return failure(format!("Invalid fields: {}", e), 1),
            };
            match barcodeforge_core::compose(symbology, &fields) {
                Ok(code) => {
                    emit(&json!({"success": true, "code": code}));
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    let partial = preview(symbology, &fields).ok();
                    emit(&json!({"success": false, "error": e.to_string(), "preview": partial}));
                    ExitCode::from(2)
                }
            }
        }

        Commands::Validate { symbology, data } => {
            let result = pipeline.validate_data(&data, symbology);
            emit(&result);
            if result.valid {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(2)
            }
        }

        Commands::Generate { payload, out } => {
            let request: GenerateRequest = match serde_json::from_str(&payload) {
                Ok(r) => r,
                Err(e) => return failure(format!("Invalid payload: {}", e), 1),
            };

            let generated = match pipeline.generate(&request).await {
                Ok(g) => g,
                Err(e) if e.is_user_input() => return failure(e, 2),
                Err(e) => return failure(e, 1),
            };

            if let (Some(path), Some(export)) = (&out, &generated.export) {
                let written = export
                    .decode_bytes()
                    .map_err(|e| e.to_string())
                    .and_then(|bytes| std::fs::write(path, bytes).map_err(|e| e.to_string()));
                if let Err(e) = written {
                    return failure(format!("Failed to write {}: {}", path.display(), e), 1);
                }
            }

            emit(&json!({"success": true, "barcode": generated}));
            ExitCode::SUCCESS
        }
    }
}
