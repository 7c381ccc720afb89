//! `theme()` and `screen()` in the input stylesheet.
//!
//! ```text
//! color: theme(colors.red.500 / 50%);   ->  color: rgb(239 68 68 / 50%);
//! @media screen(md) { ... }             ->  @media (min-width: 768px) { ... }
//! @screen md { ... }                    ->  @media (min-width: 768px) { ... }
//! ```

use crate::ast::css::{AtRule, CssNode};
use crate::ast::value::{self, ValueNode};
use crate::ast::walk::{walk, WalkAction};
use crate::config::{ConfigValue, ResolvedTheme};
use crate::error::{Result, TailorError};

/// Substitutions allowed while expanding one value, so a theme value that
/// expands to itself cannot loop forever.
const MAX_EXPANSIONS: usize = 64;

/// Replace `theme()` and `screen()` calls in declaration values and at-rule
/// params, and rewrite `@screen <name>` blocks to `@media`.
pub fn substitute_functions(nodes: &mut Vec<CssNode>, theme: &ResolvedTheme) -> Result<()> {
    let mut error = None;

    walk(nodes, &mut |node| {
        let result = match node {
            CssNode::Declaration(decl) if has_function(&decl.value) => {
                substitute_value(&decl.value, theme).map(|value| decl.value = value)
            }
            CssNode::AtRule(at_rule) if at_rule.name == "screen" => {
                screen_to_media(at_rule, theme)
            }
            CssNode::AtRule(at_rule) if has_function(&at_rule.params) => {
                substitute_value(&at_rule.params, theme).map(|params| at_rule.params = params)
            }
            _ => Ok(()),
        };
        match result {
            Ok(()) => WalkAction::Continue,
            Err(err) => {
                error = Some(err);
                WalkAction::Stop
            }
        }
    });

    match error {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

fn has_function(text: &str) -> bool {
    text.contains("theme(") || text.contains("screen(")
}

fn screen_to_media(at_rule: &mut AtRule, theme: &ResolvedTheme) -> Result<()> {
    let name = at_rule.params.trim();
    let query = theme.screen(name).ok_or_else(|| unknown_screen(name))?;
    at_rule.name = "media".to_string();
    at_rule.params = query;
    Ok(())
}

/// Expand every `theme()`/`screen()` call in `input`.
pub fn substitute_value(input: &str, theme: &ResolvedTheme) -> Result<String> {
    let mut nodes = value::parse(input);
    let mut expansions = 0;
    let mut error = None;

    walk(&mut nodes, &mut |node| {
        let ValueNode::Function { name, nodes: args } = node else {
            return WalkAction::Continue;
        };
        let expanded = match name.as_str() {
            "theme" => theme_value(&argument(args), theme),
            "screen" => {
                let name = argument(args);
                theme.screen(&name).ok_or_else(|| unknown_screen(&name))
            }
            _ => return WalkAction::Continue,
        };
        expansions += 1;
        if expansions > MAX_EXPANSIONS {
            error = Some(TailorError::Css {
                message: format!("`{input}` does not stop expanding"),
                help: Some("Check for theme values that refer to themselves".into()),
            });
            return WalkAction::Stop;
        }
        match expanded {
            Ok(expanded) => WalkAction::Replace(value::parse(&expanded)),
            Err(err) => {
                error = Some(err);
                WalkAction::Stop
            }
        }
    });

    match error {
        Some(err) => Err(err),
        None => Ok(value::to_css(&nodes)),
    }
}

/// The call's argument text with surrounding quotes removed.
fn argument(args: &[ValueNode]) -> String {
    let text = value::to_css(args);
    let text = text.trim();
    for quote in ['"', '\''] {
        if let Some(inner) = text.strip_prefix(quote).and_then(|t| t.strip_suffix(quote)) {
            return inner.to_string();
        }
    }
    text.to_string()
}

/// A theme path as a CSS value. Objects use their `DEFAULT` entry and
/// `[value, extras]` tuples their first element.
fn theme_value(path: &str, theme: &ResolvedTheme) -> Result<String> {
    let found = theme.get(path).ok_or_else(|| TailorError::Css {
        message: format!("`{path}` does not exist in your theme config"),
        help: nearest_key(path, theme).map(|key| format!("Did you mean `{key}`?")),
    })?;
    css_value(&found).ok_or_else(|| TailorError::Css {
        message: format!("`{path}` resolves to a value that cannot be used in CSS"),
        help: Some("Point at a leaf such as `colors.red.500`".into()),
    })
}

fn css_value(value: &ConfigValue) -> Option<String> {
    match value {
        ConfigValue::Object(map) => map.get("DEFAULT").and_then(css_value),
        ConfigValue::Array(items) => value
            .to_css_value()
            .or_else(|| items.first().and_then(css_value)),
        other => other.to_css_value(),
    }
}

/// The deepest existing prefix of `path`, to point typos at.
fn nearest_key(path: &str, theme: &ResolvedTheme) -> Option<String> {
    let mut segments: Vec<&str> = path.split('.').collect();
    while segments.len() > 1 {
        segments.pop();
        let prefix = segments.join(".");
        if theme.get(&prefix).is_some() {
            return Some(prefix);
        }
    }
    None
}

fn unknown_screen(name: &str) -> TailorError {
    TailorError::Css {
        message: format!("the `{name}` screen does not exist in your theme"),
        help: Some("Screens come from `theme.screens`".into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::css::{parse, to_css};
    use crate::config::{resolve_config, ConfigFragment};
    use pretty_assertions::assert_eq;

    fn theme() -> ResolvedTheme {
        resolve_config(&[ConfigFragment::new()]).unwrap().theme
    }

    #[test]
    fn test_theme_values() {
        let theme = theme();
        assert_eq!(substitute_value("theme(spacing.4)", &theme).unwrap(), "1rem");
        assert_eq!(
            substitute_value("calc(theme('spacing.4') + 2px)", &theme).unwrap(),
            "calc(1rem + 2px)"
        );
        assert_eq!(substitute_value("theme(borderRadius)", &theme).unwrap(), "0.25rem");
        assert_eq!(substitute_value("theme(fontSize.sm)", &theme).unwrap(), "0.875rem");
        assert_eq!(
            substitute_value("theme(colors.red.500 / 50%)", &theme).unwrap(),
            "rgb(239 68 68 / 50%)"
        );
    }

    #[test]
    fn test_unknown_theme_path() {
        let err = substitute_value("theme(colors.red.555)", &theme()).unwrap_err();
        match err {
            TailorError::Css { help, .. } => {
                assert_eq!(help.as_deref(), Some("Did you mean `colors.red`?"))
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_screen_function_and_at_rule() {
        let mut nodes = parse(
            "@media screen(md) { .a { color: red; } } \
             @screen lg { .b { margin: theme(spacing.2); } }",
        )
        .unwrap();
        substitute_functions(&mut nodes, &theme()).unwrap();
        assert_eq!(
            to_css(&nodes),
            "@media (min-width: 768px) {\n  .a {\n    color: red;\n  }\n}\n\
             @media (min-width: 1024px) {\n  .b {\n    margin: 0.5rem;\n  }\n}\n"
        );
    }

    #[test]
    fn test_unknown_screen() {
        let mut nodes = parse("@screen huge { .a { color: red; } }").unwrap();
        assert!(matches!(
            substitute_functions(&mut nodes, &theme()),
            Err(TailorError::Css { .. })
        ));
    }
}
