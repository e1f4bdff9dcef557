//! Style Presets - Named, Versioned StyleSpecs
//!
//! Presets are JSON files in a directory. Each names the symbologies it
//! applies to and the minimum engine version able to render it.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, warn};

use crate::style::StyleSpec;
use crate::symbology::Symbology;

pub type PresetId = String;

#[derive(Debug, Error)]
pub enum PresetError {
    #[error("Preset not found: {0}")]
    NotFound(String),

    #[error("Preset {id} requires engine >= {required}, current is {current}")]
    EngineVersionMismatch {
        id: String,
        required: String,
        current: String,
    },

    #[error("Preset {id} does not apply to {symbology}")]
    UnsupportedSymbology { id: String, symbology: Symbology },

    #[error("Invalid version: {0}")]
    InvalidVersion(#[from] semver::Error),

    #[error("Failed to read presets: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StylePreset {
    pub id: PresetId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_version")]
    pub preset_version: String,
    #[serde(default = "default_version")]
    pub engine_min_version: String,
    /// Empty means every symbology
    #[serde(default)]
    pub symbologies: Vec<Symbology>,
    #[serde(default)]
    pub style: StyleSpec,
}

fn default_version() -> String {
    "1.0.0".to_string()
}

impl StylePreset {
    pub fn applies_to(&self, symbology: Symbology) -> bool {
        self.symbologies.is_empty() || self.symbologies.contains(&symbology)
    }

    pub fn check_engine_version(&self, engine_version: &str) -> Result<(), PresetError> {
        let engine = semver::Version::parse(engine_version)?;
        let required = semver::Version::parse(&self.engine_min_version)?;
        if engine < required {
            return Err(PresetError::EngineVersionMismatch {
                id: self.id.clone(),
                required: self.engine_min_version.clone(),
                current: engine_version.to_string(),
            });
        }
        Ok(())
    }
}

/// Preset registry - loads and caches presets
#[derive(Debug, Default)]
pub struct PresetRegistry {
    presets: HashMap<PresetId, StylePreset>,
}

impl PresetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every `*.json` preset in `dir`. Unparseable files are skipped;
    /// a missing directory yields an empty registry.
    pub fn load_from_dir(dir: &Path) -> Result<Self, PresetError> {
        let mut registry = Self::new();
        if !dir.exists() {
            debug!(dir = %dir.display(), "preset directory absent");
            return Ok(registry);
        }
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().map_or(true, |e| e != "json") {
                continue;
            }
            let content = fs::read_to_string(&path)?;
            match serde_json::from_str::<StylePreset>(&content) {
                Ok(preset) => registry.register(preset),
                Err(e) => warn!(path = %path.display(), error = %e, "skipping invalid preset"),
            }
        }
        debug!(count = registry.presets.len(), "presets loaded");
        Ok(registry)
    }

    pub fn get(&self, id: &str) -> Option<&StylePreset> {
        self.presets.get(id)
    }

    /// Presets sorted by id.
    pub fn list(&self) -> Vec<&StylePreset> {
        let mut presets: Vec<_> = self.presets.values().collect();
        presets.sort_by(|a, b| a.id.cmp(&b.id));
        presets
    }

    pub fn register(&mut self, preset: StylePreset) {
        self.presets.insert(preset.id.clone(), preset);
    }

    /// Look up a preset usable for `symbology` on this engine.
    pub fn resolve(
        &self,
        id: &str,
        symbology: Symbology,
        engine_version: &str,
    ) -> Result<&StylePreset, PresetError> {
        let preset = self.get(id).ok_or_else(|| PresetError::NotFound(id.to_string()))?;
        preset.check_engine_version(engine_version)?;
        if !preset.applies_to(symbology) {
            return Err(PresetError::UnsupportedSymbology {
                id: id.to_string(),
                symbology,
            });
        }
        Ok(preset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::{Color, GradientKind};

    const SUNSET: &str = r##"{
        "id": "sunset",
        "name": "Sunset",
        "symbologies": ["QR"],
        "style": {
            "foreground": "#aa3300",
            "gradient": {"type": "linear", "angle": 45, "start": "#ff0000", "end": "#ffaa00"}
        }
    }"##;

    #[test]
    fn test_load_from_dir() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("sunset.json"), SUNSET).unwrap();
        fs::write(dir.path().join("broken.json"), "{ nope").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let registry = PresetRegistry::load_from_dir(dir.path()).unwrap();
        assert_eq!(registry.list().len(), 1);

        let preset = registry.get("sunset").unwrap();
        assert_eq!(preset.preset_version, "1.0.0");
        assert_eq!(preset.style.foreground, Color::rgb(0xaa, 0x33, 0x00));
        assert_eq!(preset.style.gradient.kind, GradientKind::Linear);
        assert_eq!(preset.style.size, 200);
    }

    #[test]
    fn test_missing_dir_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let registry = PresetRegistry::load_from_dir(&dir.path().join("absent")).unwrap();
        assert!(registry.list().is_empty());
    }

    #[test]
    fn test_resolve_checks_version_and_symbology() {
        let mut preset: StylePreset = serde_json::from_str(SUNSET).unwrap();
        preset.engine_min_version = "9.0.0".to_string();
        let mut registry = PresetRegistry::new();
        registry.register(preset);

        assert!(matches!(
            registry.resolve("sunset", Symbology::Qr, "1.0.0"),
            Err(PresetError::EngineVersionMismatch { .. })
        ));
        assert!(matches!(
            registry.resolve("sunset", Symbology::Ean13, "9.1.0"),
            Err(PresetError::UnsupportedSymbology { .. })
        ));
        assert!(registry.resolve("sunset", Symbology::Qr, "9.1.0").is_ok());
        assert!(matches!(
            registry.resolve("missing", Symbology::Qr, "1.0.0"),
            Err(PresetError::NotFound(_))
        ));
    }
}
