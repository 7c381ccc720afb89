//! Candidate parsing.
//!
//! A raw candidate such as `md:hover:!-tw-mt-[2px]/50` becomes a
//! [`Candidate`]: its variants (innermost first), flags, and either an
//! arbitrary property or the list of `(plugin name, value, modifiers)`
//! readings of its body. The readings are ordered most specific first, so
//! the resolver can take the first one a registered plugin answers:
//!
//! ```text
//! w-4       ->  w-4 (DEFAULT), w (4)
//! bg-red-500 ->  bg-red-500 (DEFAULT), bg-red (500), bg (red-500)
//! ```
//!
//! Parsing never fails loudly. A candidate that cannot be read yields an
//! empty list, and [`CandidateParser`] caches that result like any other.

pub mod arbitrary;
pub mod variant;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use log::trace;

use crate::ast::selector::escape_class_name;

pub use arbitrary::{
    is_valid_arbitrary_value, looks_like_uri, normalize, parse_arbitrary_value, ArbitraryValue,
};
pub use variant::{parse_variant, Variant, VariantKind, VariantValue};

/// What the parser needs to know from the resolved config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOptions {
    pub separator: String,
    pub prefix: String,
    pub variant_grouping: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            separator: ":".to_string(),
            prefix: String::new(),
            variant_grouping: false,
        }
    }
}

/// A `/modifier` suffix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Modifier {
    Named(String),
    Arbitrary(ArbitraryValue),
}

impl Modifier {
    fn parse(raw: &str) -> Option<Self> {
        if raw.starts_with('[') {
            parse_arbitrary_value(raw).map(Modifier::Arbitrary)
        } else {
            Some(Modifier::Named(raw.to_string()))
        }
    }

    /// The modifier as written.
    pub fn raw(&self) -> &str {
        match self {
            Modifier::Named(name) => name,
            Modifier::Arbitrary(value) => &value.raw,
        }
    }
}

/// The value half of a plugin reading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PluginValue {
    /// No value: the body named the plugin exactly.
    Default,
    Named(String),
    Arbitrary(ArbitraryValue),
}

impl PluginValue {
    pub fn is_arbitrary(&self) -> bool {
        matches!(self, PluginValue::Arbitrary(_))
    }
}

impl fmt::Display for PluginValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PluginValue::Default => f.write_str("DEFAULT"),
            PluginValue::Named(value) => f.write_str(value),
            PluginValue::Arbitrary(value) => f.write_str(&value.raw),
        }
    }
}

/// One `(name, value, modifiers)` reading of a candidate body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginMatch {
    pub name: String,
    pub value: PluginValue,
    pub modifiers: Vec<Modifier>,
}

impl PluginMatch {
    fn new(name: &str, value: PluginValue, modifier: Option<&Modifier>) -> Self {
        Self {
            name: name.to_string(),
            value,
            modifiers: modifier.cloned().into_iter().collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandidateKind {
    /// Readings for registered plugins, most specific first.
    Constrained { plugins: Vec<PluginMatch> },
    /// An arbitrary property: `[mask-type:luminance]`.
    Custom { property: String, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// The candidate as it appeared in content.
    pub raw: String,
    /// `raw`, escaped for use in a class selector.
    pub class_name: String,
    /// Variants, the one closest to the body first.
    pub variants: Vec<Variant>,
    pub important: bool,
    pub negative: bool,
    /// The configured prefix, when the candidate carried it.
    pub prefix: Option<String>,
    pub kind: CandidateKind,
}

impl Candidate {
    /// The plugin readings, empty for arbitrary properties.
    pub fn plugins(&self) -> &[PluginMatch] {
        match &self.kind {
            CandidateKind::Constrained { plugins } => plugins,
            CandidateKind::Custom { .. } => &[],
        }
    }
}

/// Parses raw candidates and caches the result per raw string.
#[derive(Debug, Default)]
pub struct CandidateParser {
    options: ParseOptions,
    cache: HashMap<String, Arc<[Candidate]>>,
}

impl CandidateParser {
    pub fn new(options: ParseOptions) -> Self {
        Self {
            options,
            cache: HashMap::new(),
        }
    }

    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    /// Parse `raw`, returning the cached result when it was seen before.
    pub fn parse(&mut self, raw: &str) -> Arc<[Candidate]> {
        if let Some(cached) = self.cache.get(raw) {
            return Arc::clone(cached);
        }
        let parsed: Arc<[Candidate]> = parse_candidate(raw, &self.options).into();
        if parsed.is_empty() {
            trace!("rejected candidate {raw:?}");
        }
        self.cache.insert(raw.to_string(), Arc::clone(&parsed));
        parsed
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

/// Parse one raw candidate. Returns more than one candidate only for an
/// expanded variant group, and none when `raw` cannot be a class.
pub fn parse_candidate(raw: &str, options: &ParseOptions) -> Vec<Candidate> {
    let mut candidates = parse_inner(raw, options);
    let class_name = escape_class_name(raw);
    for candidate in &mut candidates {
        candidate.raw = raw.to_string();
        candidate.class_name.clone_from(&class_name);
    }
    candidates
}

fn parse_inner(raw: &str, options: &ParseOptions) -> Vec<Candidate> {
    if raw.is_empty() || options.separator.is_empty() {
        return Vec::new();
    }
    let mut parts = split_top_level_str(raw, &options.separator);
    if parts.iter().any(|part| part.is_empty()) {
        return Vec::new();
    }
    let Some(body) = parts.pop() else {
        return Vec::new();
    };

    if options.variant_grouping {
        if let Some(group) = body.strip_prefix('(').and_then(|b| b.strip_suffix(')')) {
            return expand_group(&parts, group, options);
        }
    }

    let mut variants = Vec::with_capacity(parts.len());
    for part in parts.iter().rev() {
        match parse_variant(part) {
            Some(variant) => variants.push(variant),
            None => return Vec::new(),
        }
    }

    parse_body(body, options)
        .map(|mut candidate| {
            candidate.variants = variants;
            vec![candidate]
        })
        .unwrap_or_default()
}

/// `md:(p-4,hover:m-2)` becomes `md:p-4` and `md:hover:m-2`.
fn expand_group(variants: &[&str], group: &str, options: &ParseOptions) -> Vec<Candidate> {
    let mut prefix = String::new();
    for variant in variants {
        prefix.push_str(variant);
        prefix.push_str(&options.separator);
    }
    crate::plugin::data_types::split_top_level(group, ',')
        .into_iter()
        .map(str::trim)
        .filter(|member| !member.is_empty())
        .flat_map(|member| parse_inner(&format!("{prefix}{member}"), options))
        .collect()
}

fn parse_body(body: &str, options: &ParseOptions) -> Option<Candidate> {
    let (important, body) = match body.strip_prefix('!') {
        Some(rest) => (true, rest),
        None => (false, body),
    };
    let (mut negative, mut body) = match body.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, body),
    };

    let mut prefix = None;
    if !options.prefix.is_empty() {
        if let Some(rest) = body.strip_prefix(options.prefix.as_str()) {
            prefix = Some(options.prefix.clone());
            body = rest;
            if let Some(rest) = body.strip_prefix('-') {
                if negative {
                    return None;
                }
                negative = true;
                body = rest;
            }
        }
    }
    if body.is_empty() {
        return None;
    }

    let kind = if body.starts_with('[') && body.ends_with(']') {
        if negative {
            return None;
        }
        let (property, value) = arbitrary::parse_arbitrary_property(body)?;
        CandidateKind::Custom { property, value }
    } else {
        CandidateKind::Constrained {
            plugins: permutations(body),
        }
    };

    Some(Candidate {
        raw: String::new(),
        class_name: String::new(),
        variants: Vec::new(),
        important,
        negative,
        prefix,
        kind,
    })
}

/// Every `(name, value, modifiers)` reading of `body`, most specific first.
fn permutations(body: &str) -> Vec<PluginMatch> {
    let mut out = vec![PluginMatch::new(body, PluginValue::Default, None)];

    let split = split_last_top_level(body, '/')
        .filter(|(base, raw)| !base.is_empty() && !raw.is_empty())
        .and_then(|(base, raw)| Modifier::parse(raw).map(|m| (base, raw, m)));
    let (base, modifier_raw, modifier) = match &split {
        Some((base, raw, modifier)) => (*base, Some(*raw), Some(modifier)),
        None => (body, None, None),
    };

    if modifier.is_some() {
        out.push(PluginMatch::new(base, PluginValue::Default, modifier));
    }

    let mut rest = base;
    while let Some((name, _)) = split_last_top_level(rest, '-') {
        let value = &base[name.len() + 1..];
        if !name.is_empty() && !value.is_empty() {
            out.push(PluginMatch::new(
                name,
                PluginValue::Named(value.to_string()),
                modifier,
            ));
            if value.starts_with('[') {
                if let Some(arbitrary) = parse_arbitrary_value(value) {
                    out.push(PluginMatch::new(
                        name,
                        PluginValue::Arbitrary(arbitrary),
                        modifier,
                    ));
                }
            }
            if let Some(raw) = modifier_raw {
                out.push(PluginMatch::new(
                    name,
                    PluginValue::Named(format!("{value}/{raw}")),
                    None,
                ));
            }
        }
        rest = name;
    }

    out
}

/// Split at the last `delimiter` outside brackets, parens and quotes.
pub(crate) fn split_last_top_level(input: &str, delimiter: char) -> Option<(&str, &str)> {
    let mut depth = 0i32;
    let mut quote: Option<char> = None;
    let mut last = None;
    let mut chars = input.char_indices();

    while let Some((index, c)) = chars.next() {
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
            '"' | '\'' => quote = Some(c),
            '[' | '(' | '{' => depth += 1,
            ']' | ')' | '}' => depth -= 1,
            c if c == delimiter && depth == 0 => last = Some(index),
            _ => {}
        }
    }

    last.map(|index| (&input[..index], &input[index + delimiter.len_utf8()..]))
}

/// Split at every `separator` outside brackets, parens, braces and quotes.
/// Empty parts are kept so callers can reject `hover::p-4`.
fn split_top_level_str<'a>(input: &'a str, separator: &str) -> Vec<&'a str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut quote: Option<char> = None;
    let mut start = 0;
    let mut index = 0;
    let bytes = input.as_bytes();

    while index < input.len() {
        let Some(c) = input[index..].chars().next() else {
            break;
        };
        if c == '\\' {
            index += 1;
            index += input[index..].chars().next().map_or(0, char::len_utf8);
            continue;
        }
        if let Some(q) = quote {
            if c == q {
                quote = None;
            }
            index += c.len_utf8();
            continue;
        }
        match c {
            '"' | '\'' => quote = Some(c),
            '[' | '(' | '{' => depth += 1,
            ']' | ')' | '}' => depth -= 1,
            _ if depth == 0 && bytes[index..].starts_with(separator.as_bytes()) => {
                parts.push(&input[start..index]);
                index += separator.len();
                start = index;
                continue;
            }
            _ => {}
        }
        index += c.len_utf8();
    }
    parts.push(&input[start..]);
    parts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::data_types::DataType;
    use pretty_assertions::assert_eq;

    fn parse(raw: &str) -> Vec<Candidate> {
        parse_candidate(raw, &ParseOptions::default())
    }

    fn readings(candidate: &Candidate) -> Vec<(String, String, Vec<String>)> {
        candidate
            .plugins()
            .iter()
            .map(|p| {
                (
                    p.name.clone(),
                    p.value.to_string(),
                    p.modifiers.iter().map(|m| m.raw().to_string()).collect(),
                )
            })
            .collect()
    }

    #[test]
    fn test_longest_name_first() {
        let parsed = parse("w-4");
        assert_eq!(parsed.len(), 1);
        let plugins = parsed[0].plugins();
        assert_eq!(plugins[0].name, "w-4");
        assert_eq!(plugins[0].value, PluginValue::Default);
        assert_eq!(plugins[1].name, "w");
        assert_eq!(plugins[1].value, PluginValue::Named("4".into()));
    }

    #[test]
    fn test_readings_order() {
        let parsed = parse("bg-red-500");
        assert_eq!(
            readings(&parsed[0]),
            vec![
                ("bg-red-500".into(), "DEFAULT".into(), vec![]),
                ("bg-red".into(), "500".into(), vec![]),
                ("bg".into(), "red-500".into(), vec![]),
            ]
        );
    }

    #[test]
    fn test_variants_modifier_and_arbitrary_value() {
        let parsed = parse("sm:w-[2px]/20");
        assert_eq!(parsed.len(), 1);
        let candidate = &parsed[0];
        assert_eq!(candidate.variants.len(), 1);
        assert_eq!(candidate.variants[0].raw, "sm");

        let plugins = candidate.plugins();
        let modifier = vec![Modifier::Named("20".into())];
        assert!(plugins.contains(&PluginMatch {
            name: "w".into(),
            value: PluginValue::Named("[2px]".into()),
            modifiers: modifier.clone(),
        }));
        assert!(plugins.contains(&PluginMatch {
            name: "w".into(),
            value: PluginValue::Arbitrary(ArbitraryValue {
                raw: "[2px]".into(),
                value: "2px".into(),
                data_type: DataType::Any,
                explicit: false,
            }),
            modifiers: modifier,
        }));
    }

    #[test]
    fn test_fraction_keeps_slash_reading() {
        let parsed = parse("w-1/2");
        let readings = readings(&parsed[0]);
        assert!(readings.contains(&("w".into(), "1".into(), vec!["2".into()])));
        assert!(readings.contains(&("w".into(), "1/2".into(), vec![])));
    }

    #[test]
    fn test_variants_are_reversed() {
        let parsed = parse("md:hover:p-4");
        let raws: Vec<_> = parsed[0].variants.iter().map(|v| v.raw.as_str()).collect();
        assert_eq!(raws, vec!["hover", "md"]);
    }

    #[test]
    fn test_flags_and_prefix() {
        let options = ParseOptions {
            prefix: "tw-".into(),
            ..ParseOptions::default()
        };
        let parsed = parse_candidate("!-tw-mt-4", &options);
        assert!(parsed[0].important);
        assert!(parsed[0].negative);
        assert_eq!(parsed[0].prefix.as_deref(), Some("tw-"));
        assert_eq!(parsed[0].plugins()[1].name, "mt");

        let parsed = parse_candidate("tw--mt-4", &options);
        assert!(parsed[0].negative);

        assert!(parse_candidate("-tw--mt-4", &options).is_empty());

        let parsed = parse_candidate("mt-4", &options);
        assert_eq!(parsed[0].prefix, None);
    }

    #[test]
    fn test_arbitrary_property() {
        let parsed = parse("hover:[mask-type:alpha]");
        assert_eq!(
            parsed[0].kind,
            CandidateKind::Custom {
                property: "mask-type".into(),
                value: "alpha".into()
            }
        );
        assert!(parse("[http://example.com]").is_empty());
        assert!(parse("-[color:red]").is_empty());
    }

    #[test]
    fn test_invalid_variants_reject() {
        assert!(parse("hover::p-4").is_empty());
        assert!(parse("[.foo]:p-4").is_empty());
        assert!(parse("hover:").is_empty());
    }

    #[test]
    fn test_class_name_is_escaped() {
        let parsed = parse("sm:w-1/2");
        assert_eq!(parsed[0].class_name, "sm\\:w-1\\/2");
    }

    #[test]
    fn test_group_expansion() {
        let options = ParseOptions {
            variant_grouping: true,
            ..ParseOptions::default()
        };
        let parsed = parse_candidate("md:(p-4,hover:m-2)", &options);
        assert_eq!(parsed.len(), 2);
        assert!(parsed.iter().all(|c| c.raw == "md:(p-4,hover:m-2)"));
        let variants: Vec<Vec<_>> = parsed
            .iter()
            .map(|c| c.variants.iter().map(|v| v.raw.clone()).collect())
            .collect();
        assert_eq!(variants, vec![vec!["md".to_string()], vec!["hover".into(), "md".into()]]);

        assert!(parse("md:(p-4,m-2)")[0].plugins()[0].name.starts_with('('));
    }

    #[test]
    fn test_parser_cache_shares_results() {
        let mut parser = CandidateParser::default();
        let first = parser.parse("p-4");
        let second = parser.parse("p-4");
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(parser.len(), 1);

        let rejected = parser.parse("[http://example.com]");
        assert!(rejected.is_empty());
        assert_eq!(parser.len(), 2);
    }

    #[test]
    fn test_split_last_top_level() {
        assert_eq!(split_last_top_level("a-[b-c]", '-'), Some(("a", "[b-c]")));
        assert_eq!(split_last_top_level("abc", '-'), None);
    }
}
