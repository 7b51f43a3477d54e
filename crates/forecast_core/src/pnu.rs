//! Parcel identifier (PNU) handling
//!
//! A PNU is a 19-digit code laid out as:
//! province(2) + district(3) + sub-district(3) + section(2) + mountain flag(1)
//! + main lot(4) + sub lot(4).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::ParcelCodeError;

/// Length of a valid parcel code
pub const PNU_LENGTH: usize = 19;

/// Validated 19-digit parcel code
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ParcelCode(String);

impl ParcelCode {
    /// Parse and validate a parcel code
    pub fn parse(raw: &str) -> Result<Self, ParcelCodeError> {
        if raw.len() != PNU_LENGTH {
            return Err(ParcelCodeError::Length(raw.chars().count()));
        }
        if !raw.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ParcelCodeError::NonDigit(raw.to_string()));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Province code (2 digits)
    pub fn province(&self) -> &str {
        &self.0[..2]
    }

    /// District code (5 digits: province + district). Key for regional statistics.
    pub fn district(&self) -> &str {
        &self.0[..5]
    }

    /// Sub-district code (8 digits)
    pub fn sub_district(&self) -> &str {
        &self.0[..8]
    }

    /// Section code (10 digits)
    pub fn section(&self) -> &str {
        &self.0[..10]
    }

    /// Mountain-lot flag: 11th digit equal to '2'
    pub fn is_mountain(&self) -> bool {
        self.0.as_bytes()[10] == b'2'
    }

    /// Main lot number (4 digits)
    pub fn main_lot(&self) -> &str {
        &self.0[11..15]
    }

    /// Sub lot number (4 digits)
    pub fn sub_lot(&self) -> &str {
        &self.0[15..19]
    }
}

impl fmt::Display for ParcelCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ParcelCode {
    type Err = ParcelCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ParcelCode {
    type Error = ParcelCodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ParcelCode> for String {
    fn from(code: ParcelCode) -> Self {
        code.0
    }
}
