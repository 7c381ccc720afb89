//! Colour parsing and alpha application.

use std::fmt;
use std::str::FromStr;

use crate::error::{Result, TailorError};

/// The colour function a parsed colour is written back out with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorMode {
    Rgb,
    Hsl,
}

/// A parsed colour: a mode, three components and an optional alpha, each
/// kept as CSS text so values like `var(--x)` survive untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Color {
    pub mode: ColorMode,
    pub components: [String; 3],
    pub alpha: Option<String>,
}

const NAMED_COLORS: &[(&str, [u8; 3])] = &[
    ("black", [0, 0, 0]),
    ("white", [255, 255, 255]),
    ("red", [255, 0, 0]),
    ("green", [0, 128, 0]),
    ("blue", [0, 0, 255]),
    ("yellow", [255, 255, 0]),
    ("orange", [255, 165, 0]),
    ("purple", [128, 0, 128]),
    ("pink", [255, 192, 203]),
    ("gray", [128, 128, 128]),
    ("grey", [128, 128, 128]),
    ("silver", [192, 192, 192]),
    ("maroon", [128, 0, 0]),
    ("navy", [0, 0, 128]),
    ("teal", [0, 128, 128]),
    ("olive", [128, 128, 0]),
    ("lime", [0, 255, 0]),
    ("aqua", [0, 255, 255]),
    ("cyan", [0, 255, 255]),
    ("fuchsia", [255, 0, 255]),
    ("magenta", [255, 0, 255]),
    ("rebeccapurple", [102, 51, 153]),
];

impl Color {
    /// Create an opaque colour from RGB components.
    pub fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self {
            mode: ColorMode::Rgb,
            components: [r.to_string(), g.to_string(), b.to_string()],
            alpha: None,
        }
    }

    /// Parse a hex colour string.
    ///
    /// Supports formats:
    /// - `#RGB` (3 digits, expanded to 6)
    /// - `#RGBA` (4 digits, expanded to 8)
    /// - `#RRGGBB` (6 digits)
    /// - `#RRGGBBAA` (8 digits)
    pub fn from_hex(s: &str) -> Result<Self> {
        let s = s.trim();
        let hex = s.strip_prefix('#').unwrap_or(s);
        let digits: Vec<char> = hex.chars().collect();

        let (rgb, alpha) = match digits.len() {
            3 | 4 => {
                let mut expanded = [0u8; 4];
                for (slot, &c) in expanded.iter_mut().zip(digits.iter()) {
                    let d = parse_hex_digit(c)?;
                    *slot = d << 4 | d;
                }
                let alpha = (digits.len() == 4).then_some(expanded[3]);
                ([expanded[0], expanded[1], expanded[2]], alpha)
            }
            6 | 8 if hex.is_ascii() => {
                let r = parse_hex_byte(&hex[0..2])?;
                let g = parse_hex_byte(&hex[2..4])?;
                let b = parse_hex_byte(&hex[4..6])?;
                let alpha = if hex.len() == 8 {
                    Some(parse_hex_byte(&hex[6..8])?)
                } else {
                    None
                };
                ([r, g, b], alpha)
            }
            _ => {
                return Err(TailorError::Css {
                    message: format!("Invalid hex colour: {}", s),
                    help: Some("Use #RGB, #RGBA, #RRGGBB, or #RRGGBBAA format".to_string()),
                })
            }
        };

        let mut color = Self::rgb(rgb[0], rgb[1], rgb[2]);
        color.alpha = alpha.map(|a| format_alpha(f64::from(a) / 255.0));
        Ok(color)
    }

    /// Parse any supported colour: hex, `rgb()`/`rgba()`, `hsl()`/`hsla()`,
    /// `transparent` or a named colour. Returns `None` for anything else,
    /// including `currentColor` and bare `var()` references.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        let lower = value.to_ascii_lowercase();

        if lower == "transparent" {
            let mut color = Self::rgb(0, 0, 0);
            color.alpha = Some("0".to_string());
            return Some(color);
        }
        if let Some((_, [r, g, b])) = NAMED_COLORS.iter().find(|(name, _)| *name == lower) {
            return Some(Self::rgb(*r, *g, *b));
        }
        if value.starts_with('#') {
            return Self::from_hex(value).ok();
        }

        let (mode, inner) = if let Some(inner) = strip_function(&lower, &["rgb", "rgba"]) {
            (ColorMode::Rgb, inner)
        } else if let Some(inner) = strip_function(&lower, &["hsl", "hsla"]) {
            (ColorMode::Hsl, inner)
        } else {
            return None;
        };
        let inner = &value[value.len() - inner.len() - 1..value.len() - 1];

        let (channels, slash_alpha) = match inner.split_once('/') {
            Some((channels, alpha)) => (channels, Some(alpha.trim())),
            None => (inner, None),
        };
        let parts: Vec<&str> = channels
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|p| !p.is_empty())
            .collect();

        let (components, comma_alpha) = match parts.as_slice() {
            [a, b, c] => ([*a, *b, *c], None),
            [a, b, c, alpha] if slash_alpha.is_none() => ([*a, *b, *c], Some(*alpha)),
            _ => return None,
        };

        Some(Self {
            mode,
            components: components.map(str::to_string),
            alpha: slash_alpha.or(comma_alpha).map(str::to_string),
        })
    }

    /// The same colour with its alpha replaced.
    pub fn with_alpha(mut self, alpha: &str) -> Self {
        self.alpha = Some(alpha.to_string());
        self
    }
}

fn strip_function<'a>(value: &'a str, names: &[&str]) -> Option<&'a str> {
    names.iter().find_map(|name| {
        value
            .strip_prefix(name)
            .and_then(|rest| rest.strip_prefix('('))
            .and_then(|rest| rest.strip_suffix(')'))
    })
}

fn format_alpha(alpha: f64) -> String {
    let rounded = (alpha * 1000.0).round() / 1000.0;
    crate::config::format_number(rounded)
}

/// Apply an alpha to a colour value. Values that do not parse as colours
/// come back unchanged.
pub fn with_alpha(value: &str, alpha: &str) -> String {
    match Color::parse(value) {
        Some(color) => color.with_alpha(alpha).to_string(),
        None => value.to_string(),
    }
}

impl FromStr for Color {
    type Err = TailorError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s).ok_or_else(|| TailorError::Css {
            message: format!("Invalid colour: {}", s),
            help: None,
        })
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = match self.mode {
            ColorMode::Rgb => "rgb",
            ColorMode::Hsl => "hsl",
        };
        let channels = self.components.join(" ");
        match &self.alpha {
            Some(alpha) => write!(f, "{mode}({channels} / {alpha})"),
            None => write!(f, "{mode}({channels})"),
        }
    }
}

/// Parse a single hex digit.
fn parse_hex_digit(c: char) -> Result<u8> {
    c.to_digit(16)
        .map(|d| d as u8)
        .ok_or_else(|| TailorError::Css {
            message: format!("Invalid hex digit: {}", c),
            help: None,
        })
}

/// Parse a two-character hex byte.
fn parse_hex_byte(s: &str) -> Result<u8> {
    u8::from_str_radix(s, 16).map_err(|_| TailorError::Css {
        message: format!("Invalid hex byte: {}", s),
        help: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_hex_6digit() {
        let c = Color::from_hex("#FF0000").unwrap();
        assert_eq!(c, Color::rgb(255, 0, 0));

        let c = Color::from_hex("#1a1a2e").unwrap();
        assert_eq!(c, Color::rgb(0x1a, 0x1a, 0x2e));
    }

    #[test]
    fn test_from_hex_3digit() {
        let c = Color::from_hex("#ABC").unwrap();
        assert_eq!(c, Color::rgb(0xAA, 0xBB, 0xCC));
    }

    #[test]
    fn test_from_hex_with_alpha() {
        let c = Color::from_hex("#FF000080").unwrap();
        assert_eq!(c.alpha.as_deref(), Some("0.502"));
        let c = Color::from_hex("#F000").unwrap();
        assert_eq!(c.alpha.as_deref(), Some("0"));
    }

    #[test]
    fn test_from_hex_invalid() {
        assert!(Color::from_hex("#GGG").is_err());
        assert!(Color::from_hex("#12345").is_err());
        assert!(Color::from_hex("").is_err());
    }

    #[test]
    fn test_parse_functions() {
        let c = Color::parse("rgba(10, 20, 30, 0.5)").unwrap();
        assert_eq!(c.to_string(), "rgb(10 20 30 / 0.5)");
        let c = Color::parse("hsl(200 50% 40% / 25%)").unwrap();
        assert_eq!(c.to_string(), "hsl(200 50% 40% / 25%)");
        assert!(Color::parse("rgb(1 2)").is_none());
    }

    #[test]
    fn test_parse_keywords() {
        assert_eq!(Color::parse("transparent").unwrap().to_string(), "rgb(0 0 0 / 0)");
        assert_eq!(Color::parse("White").unwrap(), Color::rgb(255, 255, 255));
        assert!(Color::parse("currentColor").is_none());
        assert!(Color::parse("var(--brand)").is_none());
    }

    #[test]
    fn test_with_alpha() {
        assert_eq!(with_alpha("#ef4444", "50%"), "rgb(239 68 68 / 50%)");
        assert_eq!(with_alpha("currentColor", "50%"), "currentColor");
    }
}
