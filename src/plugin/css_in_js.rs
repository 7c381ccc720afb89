//! Lowering CSS-in-JS objects to the CSS AST.
//!
//! Plugins describe styles as nested [`ConfigValue`] objects:
//!
//! ```text
//! {".btn": {"backgroundColor": "red", "&:hover": {"color": "white"}}}
//! ```
//!
//! Keys are camelCase or kebab-case properties, nested selectors (with `&`
//! standing for the parent) or at-rules. Array values repeat the
//! declaration once per element. Nested rules are flattened, so the result
//! contains no rule inside another rule.

use crate::ast::css::CssNode;
use crate::ast::selector;
use crate::config::ConfigValue;
use crate::error::{Result, TailorError};

/// `backgroundColor` to `background-color`, `WebkitAppearance` to
/// `-webkit-appearance`. Custom properties are left alone.
pub fn to_kebab_case(property: &str) -> String {
    if property.starts_with("--") {
        return property.to_string();
    }
    let mut out = String::with_capacity(property.len() + 4);
    for (index, c) in property.chars().enumerate() {
        if c.is_ascii_uppercase() {
            out.push('-');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
        // `msTransform` is the one vendor prefix written lowercase.
        if index == 1
            && out == "ms"
            && property[2..].starts_with(|c: char| c.is_ascii_uppercase())
        {
            out.insert(0, '-');
        }
    }
    out
}

/// Lower a stylesheet object whose keys are selectors or at-rules.
pub fn lower_sheet(styles: &ConfigValue) -> Result<Vec<CssNode>> {
    let mut out = Vec::new();
    match styles {
        ConfigValue::Array(items) => {
            for item in items {
                out.extend(lower_sheet(item)?);
            }
        }
        ConfigValue::Object(map) => {
            for (key, body) in map {
                if let Some(at_rule) = key.strip_prefix('@') {
                    out.push(lower_at_rule(at_rule, None, body)?);
                } else {
                    out.extend(lower_rule(key, body)?);
                }
            }
        }
        ConfigValue::Null => {}
        other => {
            return Err(TailorError::registration(format!(
                "expected an object of styles, found {other:?}"
            )))
        }
    }
    Ok(out)
}

/// Lower a declaration block under `selector`. The first node is the rule
/// holding the direct declarations (omitted when there are none); nested
/// rules and at-rules follow.
pub fn lower_rule(selector: &str, body: &ConfigValue) -> Result<Vec<CssNode>> {
    let Some(map) = body.as_object() else {
        return Err(TailorError::registration(format!(
            "styles for `{selector}` must be an object"
        )));
    };

    let mut declarations = Vec::new();
    let mut nested = Vec::new();

    for (key, value) in map {
        if let Some(at_rule) = key.strip_prefix('@') {
            nested.push(lower_at_rule(at_rule, Some(selector), value)?);
        } else if value.is_object() {
            let child = nest_selector(selector, key);
            nested.extend(lower_rule(&child, value)?);
        } else {
            push_declarations(key, value, &mut declarations);
        }
    }

    let mut out = Vec::with_capacity(nested.len() + 1);
    if !declarations.is_empty() {
        out.push(CssNode::rule(selector, declarations));
    }
    out.extend(nested);
    Ok(out)
}

fn push_declarations(property: &str, value: &ConfigValue, out: &mut Vec<CssNode>) {
    let property = to_kebab_case(property);
    match value {
        ConfigValue::Array(items) => {
            for item in items {
                if let Some(css) = item.to_css_value() {
                    out.push(CssNode::decl(property.clone(), css));
                }
            }
        }
        other => {
            if let Some(css) = other.to_css_value() {
                out.push(CssNode::decl(property, css));
            }
        }
    }
}

/// `@media (x)` inside a rule wraps a copy of the rule; at the top level
/// its body is either a nested sheet or, for `@font-face` and friends, a
/// declaration block.
fn lower_at_rule(at_rule: &str, parent: Option<&str>, body: &ConfigValue) -> Result<CssNode> {
    let (name, params) = split_at_rule(at_rule);
    let children = match parent {
        Some(selector) => lower_rule(selector, body)?,
        None => {
            let Some(map) = body.as_object() else {
                return Err(TailorError::registration(format!(
                    "styles for `@{at_rule}` must be an object"
                )));
            };
            let mut children = Vec::new();
            for (key, value) in map {
                if let Some(inner) = key.strip_prefix('@') {
                    children.push(lower_at_rule(inner, None, value)?);
                } else if value.is_object() {
                    children.extend(lower_rule(key, value)?);
                } else {
                    push_declarations(key, value, &mut children);
                }
            }
            children
        }
    };
    Ok(CssNode::at_rule(name, params, children))
}

/// `media (min-width: 640px)` to `("media", "(min-width: 640px)")`.
pub(crate) fn split_at_rule(at_rule: &str) -> (&str, &str) {
    let at_rule = at_rule.trim();
    let end = at_rule
        .find(|c: char| c.is_whitespace() || c == '(')
        .unwrap_or(at_rule.len());
    (&at_rule[..end], at_rule[end..].trim())
}

/// Resolve a nested key against its parent: `&` is replaced, other keys
/// are descendants. Both sides may be selector lists.
fn nest_selector(parent: &str, child: &str) -> String {
    let parents: Vec<&str> = parent.split(',').map(str::trim).collect();
    let mut out = Vec::new();
    for child in child.split(',').map(str::trim) {
        for parent in &parents {
            if child.contains('&') {
                out.push(child.replace('&', parent));
            } else {
                out.push(format!("{parent} {child}"));
            }
        }
    }
    out.join(", ")
}

/// Check that every selector in a utilities object targets a class.
///
/// Each selector in a list must, after `:not(...)` guards are ignored,
/// contain at least one class starting with a lowercase letter, `_` or
/// `-`. Returns the classes found, in order.
pub fn utility_classes(styles: &ConfigValue) -> Result<Vec<String>> {
    let mut classes = Vec::new();
    collect_utility_classes(styles, &mut classes)?;
    Ok(classes)
}

fn collect_utility_classes(styles: &ConfigValue, out: &mut Vec<String>) -> Result<()> {
    match styles {
        ConfigValue::Array(items) => {
            for item in items {
                collect_utility_classes(item, out)?;
            }
        }
        ConfigValue::Object(map) => {
            for (key, body) in map {
                if key.starts_with('@') {
                    collect_utility_classes(body, out)?;
                    continue;
                }
                for complex in selector::split_list(selector::parse(key)) {
                    let found = selector::classes(&complex, false);
                    let valid = !found.is_empty()
                        && found.iter().all(|class| {
                            class.starts_with(|c: char| c.is_ascii_lowercase() || c == '_' || c == '-')
                                && !class.chars().any(|c| c.is_ascii_uppercase())
                        });
                    if !valid {
                        return Err(TailorError::UtilityRegistration {
                            message: format!("`{key}` is not a valid utility selector"),
                            help: Some(
                                "Utility selectors must contain a lowercase class, e.g. `.skew-10`"
                                    .into(),
                            ),
                        });
                    }
                    for class in found {
                        if !out.contains(&class) {
                            out.push(class);
                        }
                    }
                }
            }
        }
        _ => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::css::to_css;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn lower(value: serde_json::Value) -> String {
        to_css(&lower_sheet(&value.into()).unwrap())
    }

    #[test]
    fn test_kebab_case() {
        assert_eq!(to_kebab_case("backgroundColor"), "background-color");
        assert_eq!(to_kebab_case("WebkitAppearance"), "-webkit-appearance");
        assert_eq!(to_kebab_case("msTransform"), "-ms-transform");
        assert_eq!(to_kebab_case("--tw-ring"), "--tw-ring");
        assert_eq!(to_kebab_case("color"), "color");
    }

    #[test]
    fn test_nested_rules_are_flattened() {
        let css = lower(json!({
            ".btn": {
                "padding": "1rem",
                "&:hover": {"color": "red"},
                "svg": {"fill": "currentColor"}
            }
        }));
        assert_eq!(
            css,
            ".btn {\n  padding: 1rem;\n}\n.btn:hover {\n  color: red;\n}\n.btn svg {\n  fill: currentColor;\n}\n"
        );
    }

    #[test]
    fn test_array_values_repeat_declaration() {
        let css = lower(json!({".x": {"display": ["-webkit-box", "flex"]}}));
        assert_eq!(css, ".x {\n  display: -webkit-box;\n  display: flex;\n}\n");
    }

    #[test]
    fn test_at_rules() {
        let css = lower(json!({
            ".x": {"@media (min-width: 640px)": {"color": "red"}},
            "@font-face": {"fontFamily": "Inter"}
        }));
        assert_eq!(
            css,
            "@media (min-width: 640px) {\n  .x {\n    color: red;\n  }\n}\n@font-face {\n  font-family: Inter;\n}\n"
        );
    }

    #[test]
    fn test_utility_classes() {
        let styles: ConfigValue = json!({
            ".skew-1, .skew-2:hover": {"transform": "skewX(1deg)"},
            ".space-x > :not(.hidden)": {"margin": "0"}
        })
        .into();
        assert_eq!(
            utility_classes(&styles).unwrap(),
            vec!["skew-1", "skew-2", "space-x"]
        );
    }

    #[test]
    fn test_invalid_utility_selectors() {
        for selector in ["div", ".Foo", ":not(.a)", ".a, p"] {
            let styles: ConfigValue = json!({ selector: {"color": "red"} }).into();
            assert!(
                matches!(
                    utility_classes(&styles),
                    Err(TailorError::UtilityRegistration { .. })
                ),
                "{selector} should be rejected"
            );
        }
    }
}
