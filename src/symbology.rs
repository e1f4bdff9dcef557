//! Symbology Catalogue
//!
//! The closed set of supported symbologies plus the GS1 field layouts
//! used when composing a code from labelled sub-fields.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Symbology {
    Ean13,
    Ean8,
    #[serde(alias = "UPC")]
    Upca,
    Itf14,
    Code39,
    Code128,
    Qr,
    Datamatrix,
    Pdf417,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown symbology: {0}")]
pub struct UnknownSymbology(pub String);

/// One labelled segment of a GS1 code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FieldSegment {
    /// Canonical field name used in sub-field maps
    pub name: &'static str,
    /// Alternate spellings accepted from callers
    #[serde(skip)]
    pub aliases: &'static [&'static str],
    pub label: &'static str,
    /// Nominal width in the GS1 structure diagram (advisory)
    pub width: usize,
}

/// Catalogue entry as shown to callers choosing a symbology.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbologyInfo {
    pub id: Symbology,
    pub title: &'static str,
    pub renderer_id: &'static str,
    pub two_dimensional: bool,
    pub gs1: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gs1_length: Option<usize>,
    #[serde(skip_serializing_if = "no_fields")]
    pub fields: &'static [FieldSegment],
}

fn no_fields(fields: &&'static [FieldSegment]) -> bool {
    fields.is_empty()
}

const EAN13_FIELDS: &[FieldSegment] = &[
    FieldSegment { name: "prefix", aliases: &["gs1Prefix"], label: "Prefix", width: 3 },
    FieldSegment { name: "company", aliases: &["companyNumber"], label: "Company", width: 4 },
    FieldSegment { name: "product", aliases: &["productNumber"], label: "Product", width: 5 },
];

const EAN8_FIELDS: &[FieldSegment] = &[
    FieldSegment { name: "prefix", aliases: &["gs1Prefix"], label: "Prefix", width: 2 },
    FieldSegment { name: "product", aliases: &["itemReference"], label: "Item Ref", width: 5 },
];

const UPCA_FIELDS: &[FieldSegment] = &[
    FieldSegment { name: "number_system", aliases: &["numSys", "numberSystem"], label: "Num Sys", width: 1 },
    FieldSegment { name: "manufacturer", aliases: &["manufacturerCode"], label: "Manufacturer", width: 5 },
    FieldSegment { name: "product", aliases: &["productCode"], label: "Product", width: 5 },
];

const ITF14_FIELDS: &[FieldSegment] = &[
    FieldSegment { name: "indicator", aliases: &["packagingIndicator", "packaging_indicator"], label: "Pkg Level", width: 1 },
    FieldSegment { name: "company", aliases: &["companyPrefix", "company_prefix"], label: "Company", width: 7 },
    FieldSegment { name: "product", aliases: &["itemReference", "item_reference"], label: "Item Ref", width: 5 },
];

impl Symbology {
    pub const ALL: [Symbology; 9] = [
        Symbology::Ean13,
        Symbology::Ean8,
        Symbology::Upca,
        Symbology::Itf14,
        Symbology::Code39,
        Symbology::Code128,
        Symbology::Qr,
        Symbology::Datamatrix,
        Symbology::Pdf417,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Symbology::Ean13 => "EAN13",
            Symbology::Ean8 => "EAN8",
            Symbology::Upca => "UPCA",
            Symbology::Itf14 => "ITF14",
            Symbology::Code39 => "CODE39",
            Symbology::Code128 => "CODE128",
            Symbology::Qr => "QR",
            Symbology::Datamatrix => "DATAMATRIX",
            Symbology::Pdf417 => "PDF417",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Symbology::Ean13 => "EAN-13 (European Article Number)",
            Symbology::Ean8 => "EAN-8",
            Symbology::Upca => "UPC-A (Universal Product Code)",
            Symbology::Itf14 => "ITF-14 (Shipping Container Code)",
            Symbology::Code39 => "Code 39",
            Symbology::Code128 => "Code 128",
            Symbology::Qr => "QR Code",
            Symbology::Datamatrix => "Data Matrix",
            Symbology::Pdf417 => "PDF417",
        }
    }

    /// Identifier understood by external rasterizers.
    pub fn renderer_id(self) -> &'static str {
        match self {
            Symbology::Ean13 => "ean13",
            Symbology::Ean8 => "ean8",
            Symbology::Upca => "upca",
            Symbology::Itf14 => "itf14",
            Symbology::Code39 => "code39",
            Symbology::Code128 => "code128",
            Symbology::Qr => "qrcode",
            Symbology::Datamatrix => "datamatrix",
            Symbology::Pdf417 => "pdf417",
        }
    }

    pub fn is_2d(self) -> bool {
        matches!(self, Symbology::Qr | Symbology::Datamatrix | Symbology::Pdf417)
    }

    /// GS1 numeric symbologies that can be composed from sub-fields.
    pub fn is_gs1(self) -> bool {
        self.gs1_length().is_some()
    }

    /// Fixed pre-checksum length for GS1 symbologies.
    pub fn gs1_length(self) -> Option<usize> {
        match self {
            Symbology::Ean13 => Some(12),
            Symbology::Ean8 => Some(7),
            Symbology::Upca => Some(11),
            Symbology::Itf14 => Some(13),
            _ => None,
        }
    }

    pub fn info(self) -> SymbologyInfo {
        SymbologyInfo {
            id: self,
            title: self.title(),
            renderer_id: self.renderer_id(),
            two_dimensional: self.is_2d(),
            gs1: self.is_gs1(),
            gs1_length: self.gs1_length(),
            fields: self.gs1_fields(),
        }
    }

    /// Ordered sub-field layout; empty for non-GS1 symbologies.
    pub fn gs1_fields(self) -> &'static [FieldSegment] {
        match self {
            Symbology::Ean13 => EAN13_FIELDS,
            Symbology::Ean8 => EAN8_FIELDS,
            Symbology::Upca => UPCA_FIELDS,
            Symbology::Itf14 => ITF14_FIELDS,
            _ => &[],
        }
    }
}

impl fmt::Display for Symbology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Symbology {
    type Err = UnknownSymbology;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ean13" | "ean-13" | "ean_13" => Ok(Symbology::Ean13),
            "ean8" | "ean-8" | "ean_8" => Ok(Symbology::Ean8),
            "upc" | "upca" | "upc-a" | "upc_a" => Ok(Symbology::Upca),
            "itf14" | "itf-14" | "itf_14" => Ok(Symbology::Itf14),
            "code39" | "code-39" | "code_39" => Ok(Symbology::Code39),
            "code128" | "code-128" | "code_128" => Ok(Symbology::Code128),
            "qr" | "qrcode" | "qr-code" | "qr_code" => Ok(Symbology::Qr),
            "datamatrix" | "data-matrix" | "data_matrix" => Ok(Symbology::Datamatrix),
            "pdf417" | "pdf-417" => Ok(Symbology::Pdf417),
            _ => Err(UnknownSymbology(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_aliases() {
        assert_eq!("UPC".parse::<Symbology>(), Ok(Symbology::Upca));
        assert_eq!("ean-13".parse::<Symbology>(), Ok(Symbology::Ean13));
        assert_eq!("QRCode".parse::<Symbology>(), Ok(Symbology::Qr));
        assert!("aztec".parse::<Symbology>().is_err());
    }

    #[test]
    fn test_display_round_trips_through_from_str() {
        for sym in Symbology::ALL {
            assert_eq!(sym.to_string().parse::<Symbology>(), Ok(sym));
        }
    }

    #[test]
    fn test_serde_upper_case_and_upc_alias() {
        let s: Symbology = serde_json::from_str("\"UPC\"").unwrap();
        assert_eq!(s, Symbology::Upca);
        assert_eq!(serde_json::to_string(&Symbology::Itf14).unwrap(), "\"ITF14\"");
    }

    #[test]
    fn test_gs1_layout_widths_match_length() {
        for sym in Symbology::ALL {
            let fields = sym.gs1_fields();
            match sym.gs1_length() {
                Some(len) => assert_eq!(fields.iter().map(|f| f.width).sum::<usize>(), len),
                None => assert!(fields.is_empty()),
            }
        }
    }

    #[test]
    fn test_info_lists_catalogue_entry() {
        let ean = Symbology::Ean13.info();
        assert_eq!(ean.title, "EAN-13 (European Article Number)");
        assert!(ean.gs1 && !ean.two_dimensional);
        assert_eq!(ean.fields.len(), 3);

        let qr = serde_json::to_value(Symbology::Qr.info()).unwrap();
        assert_eq!(qr["id"], "QR");
        assert_eq!(qr["rendererId"], "qrcode");
        assert_eq!(qr["twoDimensional"], true);
        assert_eq!(qr["gs1"], false);
        assert!(qr.get("gs1Length").is_none());
        assert!(qr.get("fields").is_none());

        let gs1: Vec<_> = Symbology::ALL.iter().filter(|s| s.is_gs1()).collect();
        assert_eq!(gs1.len(), 4);
        assert_eq!(Symbology::ALL.iter().filter(|s| s.is_2d()).count(), 3);
    }
}
