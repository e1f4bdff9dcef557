//! QR Content Builders
//!
//! Structured payloads (contact cards, Wi-Fi joins, payment URIs) rendered to
//! the string a QR encoder receives. The output is plain data; validation
//! only checks that it is non-empty.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum WifiSecurity {
    #[default]
    #[serde(rename = "WPA")]
    Wpa,
    #[serde(rename = "WEP")]
    Wep,
    #[serde(rename = "nopass")]
    Open,
}

impl WifiSecurity {
    pub fn as_str(self) -> &'static str {
        match self {
            WifiSecurity::Wpa => "WPA",
            WifiSecurity::Wep => "WEP",
            WifiSecurity::Open => "nopass",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VCard {
    pub first_name: String,
    pub last_name: String,
    pub organization: String,
    pub title: String,
    pub phone: String,
    pub email: String,
    pub website: String,
    pub address: String,
    pub note: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MeCard {
    pub name: String,
    pub phone: String,
    pub email: String,
    pub address: String,
    pub url: String,
    /// `YYYY-MM-DD`; dashes are dropped on output
    pub birthday: String,
    pub note: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum QrContent {
    Text { text: String },
    Url { url: String },
    Email {
        to: String,
        #[serde(default)]
        subject: String,
        #[serde(default)]
        body: String,
    },
    Phone { number: String },
    Sms {
        number: String,
        #[serde(default)]
        message: String,
    },
    Wifi {
        ssid: String,
        #[serde(default)]
        password: String,
        #[serde(default)]
        security: WifiSecurity,
        #[serde(default)]
        hidden: bool,
    },
    VCard(VCard),
    Event {
        title: String,
        start: Option<NaiveDateTime>,
        end: Option<NaiveDateTime>,
        #[serde(default)]
        location: String,
        #[serde(default)]
        description: String,
    },
    Geo {
        #[serde(default)]
        latitude: f64,
        #[serde(default)]
        longitude: f64,
        /// Free-text place search, takes precedence over coordinates
        #[serde(default)]
        query: Option<String>,
    },
    Whatsapp {
        number: String,
        #[serde(default)]
        message: String,
    },
    Bitcoin {
        address: String,
        #[serde(default)]
        amount: Option<String>,
        #[serde(default)]
        label: Option<String>,
        #[serde(default)]
        message: Option<String>,
    },
    Ethereum {
        address: String,
        #[serde(default)]
        amount: Option<String>,
    },
    MeCard(MeCard),
    /// PayPal.me link
    Paypal {
        user: String,
        #[serde(default)]
        amount: Option<String>,
        #[serde(default)]
        currency: String,
    },
    /// Meeting link, encoded as given
    Zoom { url: String },
    Twitter { handle: String },
    Instagram { handle: String },
    Tiktok { handle: String },
}

/// Percent-encode everything outside the URI component unreserved set.
pub fn encode_component(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'!' | b'~' | b'*' | b'\'' | b'(' | b')' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

fn calendar_date(at: &Option<NaiveDateTime>) -> String {
    at.map(|dt| dt.format("%Y%m%dT%H%M00").to_string())
        .unwrap_or_default()
}

fn handle(raw: &str) -> &str {
    raw.trim().trim_start_matches('@')
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

impl QrContent {
    /// Render the encoder payload.
    pub fn payload(&self) -> String {
        match self {
            QrContent::Text { text } => text.clone(),
            QrContent::Url { url } => url.clone(),
            QrContent::Email { to, subject, body } => format!(
                "mailto:{}?subject={}&body={}",
                to,
                encode_component(subject),
                encode_component(body)
            ),
            QrContent::Phone { number } => format!("tel:{}", number),
            QrContent::Sms { number, message } => format!("sms:{}:{}", number, message),
            QrContent::Wifi { ssid, password, security, hidden } => format!(
                "WIFI:S:{};T:{};P:{};H:{};;",
                ssid,
                security.as_str(),
                password,
                hidden
            ),
            QrContent::VCard(card) => [
                "BEGIN:VCARD".to_string(),
                "VERSION:3.0".to_string(),
                format!("N:{};{}", card.last_name, card.first_name),
                format!("FN:{} {}", card.first_name, card.last_name),
                format!("ORG:{}", card.organization),
                format!("TITLE:{}", card.title),
                format!("TEL:{}", card.phone),
                format!("EMAIL:{}", card.email),
                format!("URL:{}", card.website),
                format!("ADR:;;{};;;;", card.address),
                format!("NOTE:{}", card.note),
                "END:VCARD".to_string(),
            ]
            .join("\n"),
            QrContent::Event { title, start, end, location, description } => [
                "BEGIN:VEVENT".to_string(),
                format!("SUMMARY:{}", title),
                format!("DTSTART:{}", calendar_date(start)),
                format!("DTEND:{}", calendar_date(end)),
                format!("LOCATION:{}", location),
                format!("DESCRIPTION:{}", description),
                "END:VEVENT".to_string(),
            ]
            .join("\n"),
            QrContent::Geo { latitude, longitude, query } => match non_empty(query) {
                Some(q) => format!("geo:0,0?q={}", encode_component(q)),
                None => format!("geo:{},{}", latitude, longitude),
            },
            QrContent::Whatsapp { number, message } => {
                format!("https://wa.me/{}?text={}", number, encode_component(message))
            }
            QrContent::Bitcoin { address, amount, label, message } => {
                let mut params = Vec::new();
                if let Some(amount) = non_empty(amount) {
                    params.push(format!("amount={}", amount));
                }
                if let Some(label) = non_empty(label) {
                    params.push(format!("label={}", encode_component(label)));
                }
                if let Some(message) = non_empty(message) {
                    params.push(format!("message={}", encode_component(message)));
                }
                if params.is_empty() {
                    format!("bitcoin:{}", address)
                } else {
                    format!("bitcoin:{}?{}", address, params.join("&"))
                }
            }
            QrContent::Ethereum { address, amount } => match non_empty(amount) {
                Some(value) => format!("ethereum:{}?value={}", address, value),
                None => format!("ethereum:{}", address),
            },
            QrContent::MeCard(card) => format!(
                "MECARD:N:{};TEL:{};EMAIL:{};ADR:{};URL:{};BDAY:{};NOTE:{};;",
                card.name,
                card.phone,
                card.email,
                card.address,
                card.url,
                card.birthday.replace('-', ""),
                card.note
            ),
            QrContent::Paypal { user, amount, currency } => match non_empty(amount) {
                Some(value) => format!("https://www.paypal.com/paypalme/{}/{}{}", user, value, currency),
                None => format!("https://www.paypal.com/paypalme/{}", user),
            },
            QrContent::Zoom { url } => url.clone(),
            QrContent::Twitter { handle: h } => format!("https://twitter.com/{}", handle(h)),
            QrContent::Instagram { handle: h } => format!("https://instagram.com/{}", handle(h)),
            QrContent::Tiktok { handle: h } => format!("https://tiktok.com/@{}", handle(h)),
        }
    }
}
