//! Data types for arbitrary values and their validators.

use std::fmt;
use std::str::FromStr;

use super::color::Color;

/// A value type a utility accepts, and the type an arbitrary value may
/// declare with `[type:value]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Any,
    Color,
    Length,
    Percentage,
    Number,
    Url,
    Image,
    Position,
    LineWidth,
    AbsoluteSize,
    RelativeSize,
    FamilyName,
    GenericName,
    Shadow,
}

const ALL: [(DataType, &str); 14] = [
    (DataType::Any, "any"),
    (DataType::Color, "color"),
    (DataType::Length, "length"),
    (DataType::Percentage, "percentage"),
    (DataType::Number, "number"),
    (DataType::Url, "url"),
    (DataType::Image, "image"),
    (DataType::Position, "position"),
    (DataType::LineWidth, "line-width"),
    (DataType::AbsoluteSize, "absolute-size"),
    (DataType::RelativeSize, "relative-size"),
    (DataType::FamilyName, "family-name"),
    (DataType::GenericName, "generic-name"),
    (DataType::Shadow, "shadow"),
];

const MATH_FUNCTIONS: [&str; 4] = ["min(", "max(", "clamp(", "calc("];

const LENGTH_UNITS: &[&str] = &[
    "cm", "mm", "q", "in", "pc", "pt", "px", "em", "ex", "ch", "rem", "lh", "rlh", "vw", "vh",
    "vmin", "vmax", "vb", "vi", "svw", "svh", "lvw", "lvh", "dvw", "dvh", "cqw", "cqh", "cqi",
    "cqb", "cqmin", "cqmax",
];

impl DataType {
    pub fn name(self) -> &'static str {
        ALL.iter()
            .find(|(ty, _)| *ty == self)
            .map_or("any", |(_, name)| name)
    }

    /// Whether `value` (already normalized) has this type.
    pub fn matches(self, value: &str) -> bool {
        let value = value.trim();
        match self {
            DataType::Any => true,
            DataType::Color => is_color(value),
            DataType::Length => split_top_level(value, ' ').iter().all(|p| is_length(p)),
            DataType::Percentage => split_top_level(value, ' ')
                .iter()
                .all(|p| p.ends_with('%') || is_math_function(p)),
            DataType::Number => is_number(value) || is_math_function(value),
            DataType::Url => value.starts_with("url("),
            DataType::Image => split_top_level(value, ',').iter().all(|p| is_image(p.trim())),
            DataType::Position => is_position(value),
            DataType::LineWidth => matches!(value, "thin" | "medium" | "thick"),
            DataType::AbsoluteSize => matches!(
                value,
                "xx-small" | "x-small" | "small" | "medium" | "large" | "x-large" | "xx-large"
                    | "xxx-large"
            ),
            DataType::RelativeSize => matches!(value, "larger" | "smaller"),
            DataType::FamilyName => is_family_name(value),
            DataType::GenericName => matches!(
                value,
                "serif"
                    | "sans-serif"
                    | "monospace"
                    | "cursive"
                    | "fantasy"
                    | "system-ui"
                    | "ui-serif"
                    | "ui-sans-serif"
                    | "ui-monospace"
                    | "ui-rounded"
                    | "math"
                    | "emoji"
                    | "fangsong"
            ),
            DataType::Shadow => is_shadow(value),
        }
    }
}

impl FromStr for DataType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ALL.iter()
            .find(|(_, name)| *name == s)
            .map(|(ty, _)| *ty)
            .ok_or(())
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Split at `separator` outside parens, brackets and quotes.
pub fn split_top_level(value: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut quote: Option<char> = None;
    let mut start = 0;
    let mut escaped = false;

    for (index, c) in value.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        if c == '\\' {
            escaped = true;
            continue;
        }
        if let Some(q) = quote {
            if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' => quote = Some(c),
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth -= 1,
            c if c == separator && depth == 0 => {
                parts.push(&value[start..index]);
                start = index + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&value[start..]);
    parts.into_iter().filter(|p| !p.is_empty()).collect()
}

fn is_math_function(value: &str) -> bool {
    MATH_FUNCTIONS.iter().any(|f| value.starts_with(f))
}

/// Length of a leading `[+-]?(\d+|\d*\.\d+)(e[+-]?\d+)?` in `value`.
pub(crate) fn numeric_prefix_len(value: &str) -> Option<usize> {
    let bytes = value.as_bytes();
    let mut i = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        i += 1;
    }

    let int_start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    let mut digits = i - int_start;
    if i < bytes.len() && bytes[i] == b'.' {
        let frac_start = i + 1;
        let mut j = frac_start;
        while j < bytes.len() && bytes[j].is_ascii_digit() {
            j += 1;
        }
        if j > frac_start {
            digits += j - frac_start;
            i = j;
        }
    }
    if digits == 0 {
        return None;
    }

    if matches!(bytes.get(i), Some(b'e' | b'E')) {
        let mut j = i + 1;
        if matches!(bytes.get(j), Some(b'+' | b'-')) {
            j += 1;
        }
        let exp_start = j;
        while j < bytes.len() && bytes[j].is_ascii_digit() {
            j += 1;
        }
        if j > exp_start {
            i = j;
        }
    }

    Some(i)
}

fn is_number(value: &str) -> bool {
    numeric_prefix_len(value) == Some(value.len())
}

fn is_length(value: &str) -> bool {
    if value == "0" || is_math_function(value) {
        return true;
    }
    let Some(split) = numeric_prefix_len(value) else {
        return false;
    };
    let unit = value[split..].to_ascii_lowercase();
    LENGTH_UNITS.contains(&unit.as_str())
}

fn is_color(value: &str) -> bool {
    let mut colors = 0;
    let all = split_top_level(value, ' ').iter().all(|part| {
        if part.starts_with("var(") {
            return true;
        }
        if Color::parse(part).is_some() {
            colors += 1;
            return true;
        }
        false
    });
    all && colors > 0
}

fn is_image(value: &str) -> bool {
    const IMAGE_FUNCTIONS: [&str; 10] = [
        "url(",
        "image(",
        "image-set(",
        "cross-fade(",
        "element(",
        "linear-gradient(",
        "radial-gradient(",
        "conic-gradient(",
        "repeating-linear-gradient(",
        "repeating-radial-gradient(",
    ];
    IMAGE_FUNCTIONS.iter().any(|f| value.starts_with(f))
}

fn is_position(value: &str) -> bool {
    const KEYWORDS: [&str; 5] = ["center", "top", "right", "bottom", "left"];
    let parts = split_top_level(value, ' ');
    !parts.is_empty()
        && parts.iter().all(|part| {
            KEYWORDS.contains(part) || is_length(part) || part.ends_with('%')
        })
}

fn is_family_name(value: &str) -> bool {
    let mut fonts = 0;
    let all = split_top_level(value, ',').iter().all(|part| {
        let part = part.trim();
        if part.starts_with("var(") {
            return true;
        }
        if part.contains(' ') {
            let quoted = (part.starts_with('"') && part.ends_with('"'))
                || (part.starts_with('\'') && part.ends_with('\''));
            if !quoted {
                return false;
            }
        }
        if part.starts_with(|c: char| c.is_ascii_digit()) {
            return false;
        }
        fonts += 1;
        true
    });
    all && fonts > 0
}

fn is_shadow(value: &str) -> bool {
    split_top_level(value, ',').iter().all(|shadow| {
        let lengths = split_top_level(shadow.trim(), ' ')
            .iter()
            .filter(|p| is_length(p))
            .count();
        lengths >= 2
    })
}
