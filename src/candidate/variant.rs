//! Variant prefixes: `hover`, `group-hover/sidebar`, `min-[900px]`,
//! `[&>*]`.

use crate::ast::value::is_balanced;

use super::arbitrary::normalize;
use super::split_last_top_level;

/// A parsed variant prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variant {
    /// The prefix as written, without the separator.
    pub raw: String,
    pub kind: VariantKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VariantKind {
    /// `[&:hover]` or `[@supports(display:grid)]`, normalized.
    Arbitrary { selector: String },
    /// A named variant. `candidates` lists `(name, value)` readings from
    /// most to least specific: the full name without a value first, then
    /// one reading per top-level `-`, rightmost first.
    Named {
        candidates: Vec<(String, Option<VariantValue>)>,
        modifier: Option<String>,
    },
}

/// The value part of a functional variant (`aria-checked`,
/// `data-[state=open]`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VariantValue {
    Named(String),
    Arbitrary(String),
}

impl VariantValue {
    pub fn as_str(&self) -> &str {
        match self {
            VariantValue::Named(value) | VariantValue::Arbitrary(value) => value,
        }
    }

    pub fn is_arbitrary(&self) -> bool {
        matches!(self, VariantValue::Arbitrary(_))
    }
}

impl Variant {
    /// Whether this is a bracketed selector variant.
    pub fn is_arbitrary(&self) -> bool {
        matches!(self.kind, VariantKind::Arbitrary { .. })
    }
}

/// Parse one variant prefix. `None` rejects the whole candidate.
pub fn parse_variant(raw: &str) -> Option<Variant> {
    if raw.is_empty() {
        return None;
    }

    if let Some(inner) = raw.strip_prefix('[').and_then(|r| r.strip_suffix(']')) {
        if inner.is_empty() || !is_balanced(inner) {
            return None;
        }
        let selector = normalize(inner);
        if !selector.contains('&') && !selector.starts_with('@') {
            return None;
        }
        return Some(Variant {
            raw: raw.to_string(),
            kind: VariantKind::Arbitrary { selector },
        });
    }

    let (name, modifier) = match split_last_top_level(raw, '/') {
        Some((name, modifier)) if !modifier.is_empty() => (name, Some(modifier.to_string())),
        Some(_) => return None,
        None => (raw, None),
    };
    if name.is_empty() || !is_balanced(name) {
        return None;
    }

    let mut candidates = vec![(name.to_string(), None)];
    let mut rest = name;
    while let Some((head, _)) = split_last_top_level(rest, '-') {
        let value = &name[head.len() + 1..];
        if !head.is_empty() && !value.is_empty() {
            let value = match value.strip_prefix('[').and_then(|v| v.strip_suffix(']')) {
                Some(inner) if !inner.is_empty() => VariantValue::Arbitrary(normalize(inner)),
                Some(_) => return None,
                None => VariantValue::Named(value.to_string()),
            };
            candidates.push((head.to_string(), Some(value)));
        }
        rest = head;
    }

    Some(Variant {
        raw: raw.to_string(),
        kind: VariantKind::Named {
            candidates,
            modifier,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn named(raw: &str) -> (Vec<(String, Option<VariantValue>)>, Option<String>) {
        match parse_variant(raw).unwrap().kind {
            VariantKind::Named {
                candidates,
                modifier,
            } => (candidates, modifier),
            VariantKind::Arbitrary { .. } => panic!("expected a named variant"),
        }
    }

    #[test]
    fn test_plain_variant() {
        let (candidates, modifier) = named("hover");
        assert_eq!(candidates, vec![("hover".to_string(), None)]);
        assert_eq!(modifier, None);
    }

    #[test]
    fn test_functional_variant_readings() {
        let (candidates, _) = named("group-hover");
        assert_eq!(
            candidates,
            vec![
                ("group-hover".to_string(), None),
                ("group".to_string(), Some(VariantValue::Named("hover".into()))),
            ]
        );

        let (candidates, _) = named("group-focus-within");
        assert_eq!(
            candidates[2],
            ("group".to_string(), Some(VariantValue::Named("focus-within".into())))
        );

        let (candidates, _) = named("min-[900px]");
        assert_eq!(
            candidates[1],
            ("min".to_string(), Some(VariantValue::Arbitrary("900px".into())))
        );
    }

    #[test]
    fn test_modifier() {
        let (candidates, modifier) = named("group-hover/sidebar");
        assert_eq!(candidates[0].0, "group-hover");
        assert_eq!(modifier.as_deref(), Some("sidebar"));
        assert!(parse_variant("hover/").is_none());
    }

    #[test]
    fn test_arbitrary_variant() {
        let variant = parse_variant("[&_p]").unwrap();
        assert_eq!(
            variant.kind,
            VariantKind::Arbitrary {
                selector: "& p".to_string()
            }
        );
        assert!(parse_variant("[@media(min-width:900px)]").is_some());
        assert!(parse_variant("[.foo]").is_none());
        assert!(parse_variant("[&[x]").is_none());
    }

    #[test]
    fn test_data_variant_value_is_normalized() {
        let (candidates, _) = named("data-[state=open_now]");
        assert_eq!(
            candidates[1].1,
            Some(VariantValue::Arbitrary("state=open now".into()))
        );
    }
}
