//! Content format enumeration.
//!
//! The format travels as a 16-bit big-endian option value (number 12).
//! Free-form format strings are validated at the boundary: parsing is
//! case-insensitive and anything outside {TEXT, BINARY, JSON} fails with
//! [`ZestError::UnsupportedFormat`] before a frame is ever built.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ZestError;

/// Payload representation carried by a request or delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ContentFormat {
    /// Plain text (wire value 0).
    Text,
    /// Opaque binary (wire value 42).
    Binary,
    /// JSON (wire value 50).
    Json,
}

impl ContentFormat {
    /// The 16-bit value carried in the content-format option.
    pub const fn wire_value(self) -> u16 {
        match self {
            ContentFormat::Text => 0,
            ContentFormat::Binary => 42,
            ContentFormat::Json => 50,
        }
    }

    /// Map a wire value back to a format, if known.
    pub fn from_wire(value: u16) -> Option<Self> {
        match value {
            0 => Some(ContentFormat::Text),
            42 => Some(ContentFormat::Binary),
            50 => Some(ContentFormat::Json),
            _ => None,
        }
    }

    /// Canonical name of the format.
    pub const fn as_str(self) -> &'static str {
        match self {
            ContentFormat::Text => "TEXT",
            ContentFormat::Binary => "BINARY",
            ContentFormat::Json => "JSON",
        }
    }
}

impl FromStr for ContentFormat {
    type Err = ZestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "TEXT" => Ok(ContentFormat::Text),
            "BINARY" => Ok(ContentFormat::Binary),
            "JSON" => Ok(ContentFormat::Json),
            _ => Err(ZestError::UnsupportedFormat(s.to_string())),
        }
    }
}

impl fmt::Display for ContentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
