//! Validation System - Rule/Policy Separation
//!
//! Rules produce structured violations.
//! Policy: errors block generation, warnings are only reported.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::checksum::{is_all_digits, verify};
use crate::symbology::Symbology;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ViolationSeverity {
    Error,
    Warning,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ValidationErrorKind {
    Empty,
    Length,
    Charset,
    CheckDigit,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ValidationViolation {
    pub rule: String,
    pub kind: ValidationErrorKind,
    pub severity: ViolationSeverity,
    pub message: String,
    pub expected: Option<String>,
    pub actual: Option<String>,
}

/// First blocking violation, returned by [`validate`].
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
#[error("{message}")]
pub struct ValidationError {
    pub kind: ValidationErrorKind,
    pub message: String,
}

impl From<&ValidationViolation> for ValidationError {
    fn from(v: &ValidationViolation) -> Self {
        Self {
            kind: v.kind,
            message: v.message.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub symbology: Symbology,
    pub violations: Vec<ValidationViolation>,
}

impl ValidationResult {
    pub fn has_errors(&self) -> bool {
        self.violations.iter().any(|v| v.severity == ViolationSeverity::Error)
    }

    pub fn first_error(&self) -> Option<ValidationError> {
        self.violations
            .iter()
            .find(|v| v.severity == ViolationSeverity::Error)
            .map(ValidationError::from)
    }
}

/// Validation rule trait - produces violations
pub trait ValidationRule: Send + Sync {
    fn name(&self) -> &'static str;
    fn validate(&self, data: &str, symbology: Symbology) -> Vec<ValidationViolation>;
}

// --- Concrete Rules ---

pub struct NonEmptyRule;

impl ValidationRule for NonEmptyRule {
    fn name(&self) -> &'static str { "non_empty" }

    fn validate(&self, data: &str, _symbology: Symbology) -> Vec<ValidationViolation> {
        if data.is_empty() {
            vec![ValidationViolation {
                rule: self.name().to_string(),
                kind: ValidationErrorKind::Empty,
                severity: ViolationSeverity::Error,
                message: "Data is empty".to_string(),
                expected: None,
                actual: None,
            }]
        } else {
            vec![]
        }
    }
}

/// Digit-only symbologies with an allowed length range.
pub struct DigitLengthRule;

impl DigitLengthRule {
    fn allowed(symbology: Symbology) -> Option<(usize, usize, &'static str)> {
        match symbology {
            Symbology::Ean13 => Some((13, 13, "EAN-13 requires exactly 13 digits")),
            Symbology::Ean8 => Some((7, 8, "EAN-8 requires 7 or 8 digits")),
            Symbology::Upca => Some((11, 12, "UPC-A requires 11 or 12 digits")),
            Symbology::Itf14 => Some((13, 14, "ITF-14 requires 13 or 14 digits")),
            _ => None,
        }
    }
}

impl ValidationRule for DigitLengthRule {
    fn name(&self) -> &'static str { "digit_length" }

    fn validate(&self, data: &str, symbology: Symbology) -> Vec<ValidationViolation> {
        let Some((min, max, message)) = Self::allowed(symbology) else {
            return vec![];
        };

        let len = data.chars().count();
        if is_all_digits(data) && (min..=max).contains(&len) {
            return vec![];
        }

        let expected = if min == max {
            format!("{} digits", min)
        } else {
            format!("{}-{} digits", min, max)
        };
        let kind = if is_all_digits(data) {
            ValidationErrorKind::Length
        } else {
            ValidationErrorKind::Charset
        };

        vec![ValidationViolation {
            rule: self.name().to_string(),
            kind,
            severity: ViolationSeverity::Error,
            message: message.to_string(),
            expected: Some(expected),
            actual: Some(format!("{} characters", len)),
        }]
    }
}

pub struct Code39CharsetRule;

impl Code39CharsetRule {
    fn is_code39_char(c: char) -> bool {
        c.is_ascii_digit() || c.is_ascii_uppercase() || matches!(c, '-' | '.' | ' ' | '$' | '/' | '+' | '%')
    }
}

impl ValidationRule for Code39CharsetRule {
    fn name(&self) -> &'static str { "code39_charset" }

    fn validate(&self, data: &str, symbology: Symbology) -> Vec<ValidationViolation> {
        if symbology != Symbology::Code39 {
            return vec![];
        }

        match data.chars().find(|c| !Self::is_code39_char(*c)) {
            Some(bad) => vec![ValidationViolation {
                rule: self.name().to_string(),
                kind: ValidationErrorKind::Charset,
                severity: ViolationSeverity::Error,
                message: "Code 39 only supports A-Z, 0-9 and - . $ / + % SPACE".to_string(),
                expected: Some("[0-9A-Z-. $/+%]".to_string()),
                actual: Some(format!("{:?}", bad)),
            }],
            None => vec![],
        }
    }
}

/// Warns when a full-length GS1 code carries a wrong check digit.
pub struct CheckDigitRule;

impl ValidationRule for CheckDigitRule {
    fn name(&self) -> &'static str { "check_digit" }

    fn validate(&self, data: &str, symbology: Symbology) -> Vec<ValidationViolation> {
        let Some(body_len) = symbology.gs1_length() else {
            return vec![];
        };
        if data.len() != body_len + 1 || !is_all_digits(data) || verify(data) {
            return vec![];
        }

        let expected = crate::checksum::check_digit(&data[..body_len]);
        vec![ValidationViolation {
            rule: self.name().to_string(),
            kind: ValidationErrorKind::CheckDigit,
            severity: ViolationSeverity::Warning,
            message: "Check digit does not match".to_string(),
            expected: Some(expected.to_string()),
            actual: Some(data[body_len..].to_string()),
        }]
    }
}

/// Validator orchestrates rules and applies policy
pub struct Validator {
    rules: Vec<Box<dyn ValidationRule>>,
}

impl Validator {
    pub fn new() -> Self {
        Self {
            rules: vec![
                Box::new(NonEmptyRule),
                Box::new(DigitLengthRule),
                Box::new(Code39CharsetRule),
                Box::new(CheckDigitRule),
            ],
        }
    }

    /// Run every rule. Empty data short-circuits so it is the only violation.
    pub fn report(&self, data: &str, symbology: Symbology) -> ValidationResult {
        let mut all_violations = vec![];

        for rule in &self.rules {
            let violations = rule.validate(data, symbology);
            let empty = violations.iter().any(|v| v.kind == ValidationErrorKind::Empty);
            all_violations.extend(violations);
            if empty {
                break;
            }
        }

        let valid = !all_violations
            .iter()
            .any(|v| v.severity == ViolationSeverity::Error);

        ValidationResult {
            valid,
            symbology,
            violations: all_violations,
        }
    }

    pub fn validate(&self, data: &str, symbology: Symbology) -> Result<(), ValidationError> {
        match self.report(data, symbology).first_error() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}

/// Validate with the default rule set.
pub fn validate(data: &str, symbology: Symbology) -> Result<(), ValidationError> {
    Validator::new().validate(data, symbology)
}
