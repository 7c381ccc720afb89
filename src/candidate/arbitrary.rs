//! Arbitrary values: `[value]`, `[type:value]` and `[property:value]`.

use crate::ast::value::is_balanced;
use crate::plugin::data_types::DataType;

/// A bracketed value from a candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArbitraryValue {
    /// The text as written, brackets included (`[length:10px]`).
    pub raw: String,
    /// The normalized CSS value (`10px`).
    pub value: String,
    /// The declared type, [`DataType::Any`] when none was given.
    pub data_type: DataType,
    /// Whether the type was written explicitly.
    pub explicit: bool,
}

/// Parse `[value]` or `[type:value]`.
///
/// A `type:` prefix is only recognised for known data types; otherwise the
/// whole content is the value and must not contain a top-level `:`.
pub fn parse_arbitrary_value(raw: &str) -> Option<ArbitraryValue> {
    let inner = raw.strip_prefix('[')?.strip_suffix(']')?;
    if inner.is_empty() {
        return None;
    }

    let (data_type, explicit, value) = match inner.split_once(':') {
        Some((ty, value)) => match ty.parse::<DataType>() {
            Ok(data_type) => (data_type, true, value),
            Err(()) => (DataType::Any, false, inner),
        },
        None => (DataType::Any, false, inner),
    };

    if value.is_empty() || !is_valid_arbitrary_value(value) {
        return None;
    }

    let mut normalized = normalize(value);
    if normalized.starts_with("--") {
        normalized = format!("var({normalized})");
    }
    if normalized.is_empty() {
        return None;
    }

    Some(ArbitraryValue {
        raw: raw.to_string(),
        value: normalized,
        data_type,
        explicit,
    })
}

/// Check that brackets balance and no `:` appears outside quotes and
/// brackets.
pub fn is_valid_arbitrary_value(value: &str) -> bool {
    let mut stack: Vec<char> = Vec::new();
    let mut quote: Option<char> = None;
    let mut chars = value.chars();

    while let Some(c) = chars.next() {
        if c == '\\' {
            chars.next();
            continue;
        }
        if let Some(q) = quote {
            if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            ':' if stack.is_empty() => return false,
            '"' | '\'' | '`' => quote = Some(c),
            '(' | '[' | '{' => stack.push(c),
            ')' | ']' | '}' => {
                let expected = match c {
                    ')' => '(',
                    ']' => '[',
                    _ => '{',
                };
                if stack.pop() != Some(expected) {
                    return false;
                }
            }
            _ => {}
        }
    }

    stack.is_empty() && quote.is_none()
}

/// Whether `name:value` reads as a URI with a scheme and a host, such as
/// `http://example.com`.
pub fn looks_like_uri(declaration: &str) -> bool {
    let Some((scheme, rest)) = declaration.split_once(':') else {
        return false;
    };
    let valid_scheme = scheme.starts_with(|c: char| c.is_ascii_alphabetic())
        && scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    let host = rest
        .strip_prefix("//")
        .map(|rest| rest.split(['/', '?', '#']).next().unwrap_or_default());
    valid_scheme && host.is_some_and(|host| !host.is_empty())
}

/// A `[property:value]` candidate body.
pub fn parse_arbitrary_property(raw: &str) -> Option<(String, String)> {
    let inner = raw.strip_prefix('[')?.strip_suffix(']')?;
    let (property, value) = inner.split_once(':')?;

    let valid_name = property
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        && property.starts_with(|c: char| c.is_ascii_lowercase() || c == '_' || c == '-');
    if !valid_name || value.is_empty() || value.chars().any(char::is_whitespace) {
        return None;
    }
    if looks_like_uri(inner) || !is_valid_arbitrary_value(value) {
        return None;
    }

    let value = normalize(value);
    if value.is_empty() || !is_balanced(&value) || value.contains([';', '{', '}']) {
        return None;
    }
    Some((property.to_string(), value))
}

/// Normalize an arbitrary value: `_` becomes a space (`\_` stays an
/// underscore), `url(...)` is kept verbatim, and operators inside math
/// functions get spaces around them.
pub fn normalize(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(start) = rest.find("url(") {
        out.push_str(&underscores_to_spaces(&rest[..start]));
        let end = rest[start..]
            .find(')')
            .map_or(rest.len(), |i| start + i + 1);
        out.push_str(&rest[start..end]);
        rest = &rest[end..];
    }
    out.push_str(&underscores_to_spaces(rest));

    normalize_math_operators(out.trim())
}

fn underscores_to_spaces(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&'_') => {
                out.push('_');
                chars.next();
            }
            '_' => out.push(' '),
            c => out.push(c),
        }
    }
    out
}

const MATH_FUNCTIONS: [&str; 4] = ["calc(", "min(", "max(", "clamp("];

const PROTECTED_KEYWORDS: [&str; 7] = [
    "min-content",
    "max-content",
    "fit-content",
    "safe-area-inset-top",
    "safe-area-inset-right",
    "safe-area-inset-bottom",
    "safe-area-inset-left",
];

/// Space `+ - * /` inside each `calc()`/`min()`/`max()`/`clamp()` call.
/// Text between calls is left alone.
fn normalize_math_operators(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 8);
    let mut rest = value;

    while let Some(start) = MATH_FUNCTIONS
        .iter()
        .filter_map(|f| find_function(rest, f))
        .min()
    {
        let end = balanced_close(rest, start).map_or(rest.len(), |close| close + 1);
        out.push_str(&rest[..start]);
        out.push_str(&space_operators(&rest[start..end]));
        rest = &rest[end..];
    }
    out.push_str(rest);
    out
}

/// Byte index of the `)` closing the first `(` at or after `from`.
fn balanced_close(value: &str, from: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in value[from..].char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(from + i);
                }
            }
            _ => {}
        }
    }
    None
}

fn space_operators(span: &str) -> String {
    let chars: Vec<char> = span.chars().collect();
    let mut result = String::with_capacity(span.len() + 8);
    let mut i = 0;

    while i < chars.len() {
        let rest: String = chars[i..].iter().collect();
        if rest.starts_with("var(") {
            let len = rest.find([')', ',']).map_or(rest.len(), |n| n + 1);
            let len = if rest[..len].ends_with(',') { len - 1 } else { len };
            result.push_str(&rest[..len.max(1)]);
            i += rest[..len.max(1)].chars().count();
            continue;
        }
        if let Some(keyword) = PROTECTED_KEYWORDS.iter().find(|k| rest.starts_with(*k)) {
            result.push_str(keyword);
            i += keyword.chars().count();
            continue;
        }
        if rest.starts_with("theme(") {
            let len = rest.find(')').map_or(rest.len(), |n| n + 1);
            result.push_str(&rest[..len]);
            i += rest[..len].chars().count();
            continue;
        }
        if rest.starts_with('[') {
            let len = rest.find(']').map_or(rest.len(), |n| n + 1);
            result.push_str(&rest[..len]);
            i += rest[..len].chars().count();
            continue;
        }

        let c = chars[i];
        let last = result.trim_end().chars().last();
        let after_operand = !matches!(last, Some('(' | '+' | '-' | '*' | '/' | ',') | None);
        if matches!(c, '+' | '-' | '*' | '/') && after_operand {
            result.push(' ');
            result.push(c);
            result.push(' ');
        } else {
            result.push(c);
        }
        i += 1;
    }

    let collapsed = result.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.replace("( ", "(").replace(" )", ")")
}

/// Find `name` as a whole function name (not the tail of `xmin(`).
fn find_function(value: &str, name: &str) -> Option<usize> {
    value.match_indices(name).map(|(i, _)| i).find(|&i| {
        i == 0
            || !value[..i]
                .chars()
                .last()
                .is_some_and(|c| c.is_ascii_alphanumeric() || c == '-')
    })
}
