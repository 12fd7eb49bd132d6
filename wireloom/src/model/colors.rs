//! Wire and pin colors.
//!
//! Colors are written as concatenated two-letter codes (`RD`, `BKRD`,
//! `GNYEBK`) or as `#rrggbb` hex values. A wire carries at most three
//! elementary colors.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

use crate::core::HarnessError;

static HEX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#[0-9a-fA-F]{6}$").expect("invalid hex color regex"));

/// Hex rendered for an absent color.
pub const DEFAULT_COLOR_HEX: &str = "#ffffff";
/// Hex used for wire borders and uncolored shields.
pub const BORDER_COLOR_HEX: &str = "#000000";

pub const MAX_WIRE_COLORS: usize = 3;

const COLOR_HEX: &[(&str, &str)] = &[
    ("BK", "#000000"),
    ("WH", "#ffffff"),
    ("GY", "#999999"),
    ("PK", "#ff66cc"),
    ("RD", "#ff0000"),
    ("OG", "#ff8000"),
    ("YE", "#ffff00"),
    ("OL", "#708000"),
    ("GN", "#00ff00"),
    ("TQ", "#00ffff"),
    ("LB", "#a0dfff"),
    ("BU", "#0066ff"),
    ("VT", "#8000ff"),
    ("BN", "#895956"),
    ("BG", "#ceb673"),
    ("IV", "#f5f0d0"),
    ("SL", "#708090"),
    ("CU", "#d6775e"),
    ("AL", "#aaaaaa"),
    ("SN", "#aaaaaa"),
    ("SR", "#84878c"),
    ("GD", "#ffcf80"),
];

const COLOR_NAMES: &[(&str, &str)] = &[
    ("BK", "black"),
    ("WH", "white"),
    ("GY", "grey"),
    ("PK", "pink"),
    ("RD", "red"),
    ("OG", "orange"),
    ("YE", "yellow"),
    ("OL", "olive green"),
    ("GN", "green"),
    ("TQ", "turquoise"),
    ("LB", "light blue"),
    ("BU", "blue"),
    ("VT", "violet"),
    ("BN", "brown"),
    ("BG", "beige"),
    ("IV", "ivory"),
    ("SL", "slate"),
    ("CU", "copper"),
    ("AL", "aluminium"),
    ("SN", "tin"),
    ("SR", "silver"),
    ("GD", "gold"),
];

/// Standard wire color sequences, selected with a cable's `color_code`.
pub const COLOR_CODES: &[(&str, &[&str])] = &[
    (
        "DIN",
        &[
            "WH", "BN", "GN", "YE", "GY", "PK", "BU", "RD", "BK", "VT", "GYPK", "RDBU", "WHGN",
            "BNGN", "WHYE", "YEBN", "WHGY", "GYBN", "WHPK", "PKBN", "WHBU", "BNBU", "WHRD",
            "BNRD", "WHBK", "BNBK", "GYGN", "YEGY", "PKGN", "YEPK", "GNBU", "YEBU", "GNRD",
            "YERD", "GNBK", "YEBK", "GYBU", "PKBU", "GYRD", "PKRD", "GYBK", "PKBK", "BUBK",
            "RDBK",
        ],
    ),
    (
        "IEC",
        &["BN", "RD", "OG", "YE", "GN", "BU", "VT", "GY", "WH", "BK"],
    ),
    ("BW", &["BK", "WH"]),
    (
        "TEL",
        &[
            "BUWH", "WHBU", "OGWH", "WHOG", "GNWH", "WHGN", "BNWH", "WHBN", "SLWH", "WHSL",
        ],
    ),
    (
        "T568A",
        &["WHGN", "GN", "WHOG", "BU", "WHBU", "OG", "WHBN", "BN"],
    ),
    (
        "T568B",
        &["WHOG", "OG", "WHGN", "BU", "WHBU", "GN", "WHBN", "BN"],
    ),
];

/// One elementary color.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SingleColor {
    Code(String),
    Hex(String),
}

impl SingleColor {
    pub fn hex(&self) -> &str {
        match self {
            SingleColor::Code(code) => lookup(COLOR_HEX, code).unwrap_or(DEFAULT_COLOR_HEX),
            SingleColor::Hex(hex) => hex,
        }
    }

    pub fn name(&self) -> String {
        match self {
            SingleColor::Code(code) => lookup(COLOR_NAMES, code).unwrap_or(code).to_string(),
            SingleColor::Hex(hex) => hex.clone(),
        }
    }
}

impl fmt::Display for SingleColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SingleColor::Code(code) => write!(f, "{}", code),
            SingleColor::Hex(hex) => write!(f, "{}", hex),
        }
    }
}

/// Zero or more elementary colors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MultiColor(pub Vec<SingleColor>);

impl MultiColor {
    /// Parse a color string; an empty string or `None` yields no color.
    pub fn parse(input: Option<&str>) -> Result<Self, HarnessError> {
        let Some(input) = input.map(str::trim).filter(|s| !s.is_empty()) else {
            return Ok(MultiColor::default());
        };
        if input.starts_with('#') {
            return input
                .split(':')
                .map(|hex| {
                    if HEX_RE.is_match(hex) {
                        Ok(SingleColor::Hex(hex.to_lowercase()))
                    } else {
                        Err(unknown_color(input))
                    }
                })
                .collect::<Result<Vec<_>, _>>()
                .map(MultiColor);
        }
        let upper = input.to_uppercase();
        if upper.len() % 2 != 0 || !upper.is_ascii() {
            return Err(unknown_color(input));
        }
        let colors = upper
            .as_bytes()
            .chunks(2)
            .map(|chunk| {
                let code = String::from_utf8_lossy(chunk).to_string();
                if lookup(COLOR_HEX, &code).is_some() {
                    Ok(SingleColor::Code(code))
                } else {
                    Err(unknown_color(input))
                }
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(MultiColor(colors))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn is_multicolor(&self) -> bool {
        self.0.len() > 1
    }

    pub fn hex_list(&self) -> Vec<String> {
        self.0.iter().map(|c| c.hex().to_string()).collect()
    }

    /// Element `index`, cycling through the colors.
    pub fn cycled(&self, index: usize) -> Option<&SingleColor> {
        if self.0.is_empty() {
            None
        } else {
            self.0.get(index % self.0.len())
        }
    }
}

impl fmt::Display for MultiColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.iter().any(|c| matches!(c, SingleColor::Hex(_))) {
            let parts: Vec<String> = self.0.iter().map(|c| c.to_string()).collect();
            return write!(f, "{}", parts.join(":"));
        }
        for color in &self.0 {
            write!(f, "{}", color)?;
        }
        Ok(())
    }
}

fn lookup<'a>(table: &'a [(&'a str, &'a str)], key: &str) -> Option<&'a str> {
    table.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
}

fn unknown_color(input: &str) -> HarnessError {
    HarnessError::InvalidDefinition {
        designator: input.to_string(),
        reason: "unknown color".to_string(),
    }
}

/// Color of wire `index` (zero-based) in the named palette, cycling.
pub fn color_by_code_index(code: &str, index: usize) -> Result<&'static str, HarnessError> {
    let palette = COLOR_CODES
        .iter()
        .find(|(name, _)| *name == code)
        .map(|(_, colors)| *colors)
        .ok_or_else(|| HarnessError::InvalidDefinition {
            designator: code.to_string(),
            reason: "unknown color code".to_string(),
        })?;
    Ok(palette[index % palette.len()])
}

/// All known two-letter color codes with their hex values and names.
pub fn known_colors() -> impl Iterator<Item = (&'static str, &'static str, &'static str)> {
    COLOR_HEX.iter().map(|(code, hex)| {
        let name = lookup(COLOR_NAMES, code).unwrap_or(code);
        (*code, *hex, name)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_codes() {
        let c = MultiColor::parse(Some("rdbk")).unwrap();
        assert_eq!(c.len(), 2);
        assert_eq!(c.hex_list(), vec!["#ff0000", "#000000"]);
        assert_eq!(c.to_string(), "RDBK");
    }

    #[test]
    fn test_parse_empty_and_hex() {
        assert!(MultiColor::parse(None).unwrap().is_empty());
        assert!(MultiColor::parse(Some("")).unwrap().is_empty());
        let c = MultiColor::parse(Some("#FF00AA")).unwrap();
        assert_eq!(c.hex_list(), vec!["#ff00aa"]);
    }

    #[test]
    fn test_parse_malformed_hex() {
        assert!(matches!(
            MultiColor::parse(Some("#ff0000:\u{e9}12345")),
            Err(HarnessError::InvalidDefinition { .. })
        ));
        assert!(MultiColor::parse(Some("#ff0000:a123456")).is_err());
        assert!(MultiColor::parse(Some("#ff00")).is_err());
        assert_eq!(
            MultiColor::parse(Some("#FF0000:#00ff00")).unwrap().hex_list(),
            vec!["#ff0000", "#00ff00"]
        );
    }

    #[test]
    fn test_parse_unknown() {
        assert!(MultiColor::parse(Some("XX")).is_err());
        assert!(MultiColor::parse(Some("RDB")).is_err());
    }

    #[test]
    fn test_color_code_cycles() {
        assert_eq!(color_by_code_index("BW", 0).unwrap(), "BK");
        assert_eq!(color_by_code_index("BW", 3).unwrap(), "WH");
        assert!(color_by_code_index("NOPE", 0).is_err());
    }
}
