// THEORY:
// Both landmark scans take the user's height before the first frame. It is only carried
// into the reports, never used in a ratio, so all that matters here is one canonical
// unit: feet are converted to centimetres (x 30.48) and anything non-positive or
// non-finite is refused up front.

use crate::error::{Result, ScanError};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

pub const CM_PER_FOOT: f64 = 30.48;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeightUnit {
    #[default]
    Centimeters,
    Feet,
}

impl FromStr for HeightUnit {
    type Err = ScanError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cm" | "centimeters" | "centimetres" => Ok(HeightUnit::Centimeters),
            "ft" | "feet" | "foot" => Ok(HeightUnit::Feet),
            _ => Err(ScanError::Unrecognized {
                kind: "height unit",
                value: s.to_string(),
            }),
        }
    }
}

/// The user's stated height, stored in centimetres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Height {
    cm: f64,
}

impl Height {
    pub fn new(value: f64, unit: HeightUnit) -> Result<Self> {
        if !value.is_finite() || value <= 0.0 {
            return Err(ScanError::InvalidHeight(value));
        }
        let cm = match unit {
            HeightUnit::Centimeters => value,
            HeightUnit::Feet => value * CM_PER_FOOT,
        };
        Ok(Self { cm })
    }

    pub fn cm(&self) -> f64 {
        self.cm
    }
}
