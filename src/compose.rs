//! Field Composer - GS1 Sub-field Packing
//!
//! Concatenates labelled sub-fields, reconciles the length and appends the
//! check digit. EAN-13 is never padded: short input is reported as
//! incomplete. EAN-8, UPC-A and ITF-14 are zero-padded so a preview is
//! always renderable.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::checksum::{check_digit, is_all_digits};
use crate::symbology::Symbology;

/// Named sub-field values as supplied by the caller.
pub type Gs1Fields = BTreeMap<String, String>;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ComposeError {
    #[error("{symbology} needs {need} more digits ({have} of {target})")]
    Incomplete {
        symbology: Symbology,
        have: usize,
        need: usize,
        target: usize,
    },

    #[error("{0} cannot be composed from GS1 fields")]
    NotStructured(Symbology),

    #[error("Field '{field}' must contain digits only")]
    InvalidField { field: String },

    #[error("Unknown field '{field}' for {symbology}")]
    UnknownField { symbology: Symbology, field: String },
}

/// A completed GS1 code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredCode {
    pub symbology: Symbology,
    /// Reconciled pre-checksum digits
    pub digits: String,
    pub check_digit: u8,
    pub full_code: String,
}

impl StructuredCode {
    fn from_digits(symbology: Symbology, digits: String) -> Self {
        let check = check_digit(&digits);
        let full_code = format!("{}{}", digits, check);
        Self {
            symbology,
            digits,
            check_digit: check,
            full_code,
        }
    }
}

/// Compose a full code from GS1 sub-fields.
pub fn compose(symbology: Symbology, fields: &Gs1Fields) -> Result<StructuredCode, ComposeError> {
    let target = symbology
        .gs1_length()
        .ok_or(ComposeError::NotStructured(symbology))?;

    let mut combined = concat_fields(symbology, fields)?;

    if combined.len() > target {
        combined.truncate(target);
    }

    if combined.len() < target {
        if symbology == Symbology::Ean13 {
            return Err(ComposeError::Incomplete {
                symbology,
                have: combined.len(),
                need: target - combined.len(),
                target,
            });
        }
        combined.extend(std::iter::repeat('0').take(target - combined.len()));
    }

    Ok(StructuredCode::from_digits(symbology, combined))
}

/// Text a form shows next to the GS1 inputs.
///
/// Incomplete EAN-13 input renders as `"<digits> (need N more)"`.
pub fn preview(symbology: Symbology, fields: &Gs1Fields) -> Result<String, ComposeError> {
    match compose(symbology, fields) {
        Ok(code) => Ok(code.full_code),
        Err(ComposeError::Incomplete { need, .. }) => {
            let partial = concat_fields(symbology, fields)?;
            Ok(format!("{} (need {} more)", partial, need))
        }
        Err(e) => Err(e),
    }
}

fn concat_fields(symbology: Symbology, fields: &Gs1Fields) -> Result<String, ComposeError> {
    let layout = symbology.gs1_fields();

    for key in fields.keys() {
        let known = layout
            .iter()
            .any(|seg| seg.name == key || seg.aliases.contains(&key.as_str()));
        if !known {
            return Err(ComposeError::UnknownField {
                symbology,
                field: key.clone(),
            });
        }
    }

    let mut combined = String::new();
    for seg in layout {
        let value = fields
            .get(seg.name)
            .or_else(|| seg.aliases.iter().find_map(|a| fields.get(*a)))
            .map(|v| v.trim())
            .unwrap_or("");

        if !is_all_digits(value) {
            return Err(ComposeError::InvalidField {
                field: seg.name.to_string(),
            });
        }
        combined.push_str(value);
    }

    Ok(combined)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(pairs: &[(&str, &str)]) -> Gs1Fields {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_ean13_exact() {
        let f = fields(&[("prefix", "400"), ("company", "6381"), ("product", "33393")]);
        let code = compose(Symbology::Ean13, &f).unwrap();
        assert_eq!(code.full_code, "4006381333931");
        assert_eq!(code.check_digit, 1);
    }

    #[test]
    fn test_ean13_short_is_incomplete_not_padded() {
        let f = fields(&[("prefix", "400"), ("company", "6381"), ("product", "3339")]);
        let err = compose(Symbology::Ean13, &f).unwrap_err();
        assert_eq!(
            err,
            ComposeError::Incomplete {
                symbology: Symbology::Ean13,
                have: 11,
                need: 1,
                target: 12,
            }
        );
        assert!(err.to_string().contains("needs 1 more"));
    }

    #[test]
    fn test_ean13_long_is_truncated() {
        let f = fields(&[("prefix", "400"), ("company", "6381"), ("product", "3339399")]);
        let code = compose(Symbology::Ean13, &f).unwrap();
        assert_eq!(code.digits, "400638133393");
        assert_eq!(code.full_code, "4006381333931");
    }

    #[test]
    fn test_ean8_pads_right() {
        let f = fields(&[("prefix", "96"), ("product", "385")]);
        let code = compose(Symbology::Ean8, &f).unwrap();
        assert_eq!(code.digits, "9638500");
        assert_eq!(code.full_code.len(), 8);
    }

    #[test]
    fn test_upca_aliases_and_exact() {
        let f = fields(&[("numSys", "0"), ("manufacturer", "36000"), ("product", "29145")]);
        let code = compose(Symbology::Upca, &f).unwrap();
        assert_eq!(code.full_code, "036000291452");
    }

    #[test]
    fn test_itf14_truncates_and_pads() {
        let long = fields(&[("indicator", "1"), ("companyPrefix", "5400141"), ("itemReference", "2887699")]);
        let code = compose(Symbology::Itf14, &long).unwrap();
        assert_eq!(code.digits, "1540014128876");
        assert_eq!(code.full_code, "15400141288763");

        let short = fields(&[("indicator", "1")]);
        let code = compose(Symbology::Itf14, &short).unwrap();
        assert_eq!(code.digits, "1000000000000");
        assert_eq!(code.full_code.len(), 14);
    }

    #[test]
    fn test_missing_fields_are_empty() {
        let code = compose(Symbology::Upca, &Gs1Fields::new()).unwrap();
        assert_eq!(code.full_code, "000000000000");
    }

    #[test]
    fn test_rejects_non_digits_and_unknown_fields() {
        let f = fields(&[("prefix", "4a0")]);
        assert!(matches!(
            compose(Symbology::Ean8, &f),
            Err(ComposeError::InvalidField { .. })
        ));

        let f = fields(&[("colour", "1")]);
        assert!(matches!(
            compose(Symbology::Ean13, &f),
            Err(ComposeError::UnknownField { .. })
        ));
    }

    #[test]
    fn test_non_gs1_symbology() {
        assert_eq!(
            compose(Symbology::Code128, &Gs1Fields::new()),
            Err(ComposeError::NotStructured(Symbology::Code128))
        );
    }

    #[test]
    fn test_preview_reports_missing_digits() {
        let f = fields(&[("prefix", "57"), ("company", "12345")]);
        assert_eq!(preview(Symbology::Ean13, &f).unwrap(), "5712345 (need 5 more)");

        let f = fields(&[("prefix", "96"), ("product", "38507")]);
        assert_eq!(preview(Symbology::Ean8, &f).unwrap(), "96385074");
    }
}
