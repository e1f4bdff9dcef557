//! Style Specification
//!
//! Immutable description of how a code should look. Deserializes from the
//! same camelCase JSON the presets and CLI payloads use; every field has a
//! default so partial documents are accepted.

use image::Rgba;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::logo::AssetError;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid color '{0}', expected #rrggbb or #rgb")]
pub struct ColorParseError(pub String);

/// Opaque sRGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn to_rgba(self) -> Rgba<u8> {
        Rgba([self.r, self.g, self.b, 255])
    }

    /// Linear interpolation in sRGB space, `t` clamped to [0, 1].
    pub fn lerp(self, other: Color, t: f64) -> Color {
        let t = t.clamp(0.0, 1.0);
        let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
        Color::rgb(mix(self.r, other.r), mix(self.g, other.g), mix(self.b, other.b))
    }
}

impl FromStr for Color {
    type Err = ColorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ColorParseError(s.to_string());
        let hex = s.trim().strip_prefix('#').ok_or_else(err)?;
        if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(err());
        }

        let channel = |h: &str| u8::from_str_radix(h, 16).map_err(|_| err());
        match hex.len() {
            6 => Ok(Color::rgb(channel(&hex[0..2])?, channel(&hex[2..4])?, channel(&hex[4..6])?)),
            3 => {
                let short = |i: usize| channel(&hex[i..i + 1]).map(|v| v * 17);
                Ok(Color::rgb(short(0)?, short(1)?, short(2)?))
            }
            _ => Err(err()),
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum GradientKind {
    #[default]
    None,
    Linear,
    Radial,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Gradient {
    #[serde(rename = "type", default)]
    pub kind: GradientKind,
    /// Rotation of a linear gradient in degrees, 0 runs left to right
    #[serde(default)]
    pub angle: f64,
    #[serde(default = "default_gradient_start")]
    pub start: Color,
    #[serde(default = "default_gradient_end")]
    pub end: Color,
}

fn default_gradient_start() -> Color { Color::BLACK }
fn default_gradient_end() -> Color { Color::rgb(0x4f, 0x46, 0xe5) }

impl Default for Gradient {
    fn default() -> Self {
        Self {
            kind: GradientKind::None,
            angle: 0.0,
            start: default_gradient_start(),
            end: default_gradient_end(),
        }
    }
}

/// Logo overlay. `data` holds encoded image bytes (PNG, JPEG).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoSpec {
    #[serde(with = "base64_bytes")]
    pub data: Vec<u8>,
    #[serde(default = "default_logo_ratio")]
    pub size_ratio: f64,
    #[serde(default = "default_logo_margin")]
    pub margin: u32,
    #[serde(default)]
    pub border_radius: u32,
    #[serde(default = "default_logo_backing")]
    pub background: Color,
}

fn default_logo_ratio() -> f64 { 0.2 }
fn default_logo_margin() -> u32 { 5 }
fn default_logo_backing() -> Color { Color::WHITE }

impl LogoSpec {
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            data,
            size_ratio: default_logo_ratio(),
            margin: default_logo_margin(),
            border_radius: 0,
            background: default_logo_backing(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleSpec {
    #[serde(default = "default_foreground")]
    pub foreground: Color,
    #[serde(default = "default_background")]
    pub background: Color,
    /// Canvas edge in pixels
    #[serde(default = "default_size")]
    pub size: u32,
    #[serde(default = "default_true")]
    pub show_text: bool,
    #[serde(default = "default_true")]
    pub margin: bool,
    #[serde(default)]
    pub gradient: Gradient,
    #[serde(default)]
    pub logo: Option<LogoSpec>,
}

fn default_foreground() -> Color { Color::BLACK }
fn default_background() -> Color { Color::WHITE }
fn default_size() -> u32 { 200 }
fn default_true() -> bool { true }

impl Default for StyleSpec {
    fn default() -> Self {
        Self {
            foreground: default_foreground(),
            background: default_background(),
            size: default_size(),
            show_text: true,
            margin: true,
            gradient: Gradient::default(),
            logo: None,
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum StyleError {
    #[error("Canvas size must be positive")]
    ZeroSize,
}

impl StyleSpec {
    /// Grid-level checks. Logo problems are reported by [`LogoSpec::check`]
    /// and only cost the logo.
    pub fn check(&self) -> Result<(), StyleError> {
        if self.size == 0 {
            return Err(StyleError::ZeroSize);
        }
        Ok(())
    }
}

impl LogoSpec {
    pub fn check(&self) -> Result<(), AssetError> {
        if !(self.size_ratio > 0.0 && self.size_ratio <= 1.0) {
            return Err(AssetError::Ratio(self.size_ratio));
        }
        Ok(())
    }
}

mod base64_bytes {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        STANDARD.decode(s.as_bytes()).map_err(serde::de::Error::custom)
    }
}
