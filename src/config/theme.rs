//! Lazy theme resolution.
//!
//! The merged theme may contain functions at any depth. Paths are resolved
//! on demand: walking a path calls each function met along the way exactly
//! once (results are memoized by key path), and a function that re-enters a
//! path still being computed fails with [`TailorError::CycleDetected`].

use std::cell::RefCell;
use std::collections::HashMap;

use crate::error::{Result, TailorError};
use crate::plugin::color;
use crate::plugin::negate::negate_value;

use super::value::{ConfigMap, ConfigValue, ThemeFn};

/// Read access to the theme, handed to theme functions and plugins.
pub trait ThemeLookup {
    /// Resolve a dotted key path such as `colors.red.500` or
    /// `spacing[2.5]`. A trailing ` / <alpha>` applies an alpha to a
    /// colour value. Returns `None` when nothing lives at the path.
    fn resolve(&self, path: &str) -> Result<Option<ConfigValue>>;

    fn resolve_or(&self, path: &str, default: ConfigValue) -> Result<ConfigValue> {
        Ok(self.resolve(path)?.unwrap_or(default))
    }
}

/// Helpers passed to theme functions alongside the resolver.
#[derive(Debug, Clone)]
pub struct ThemeUtils {
    colors: ConfigValue,
}

impl ThemeUtils {
    pub fn new(colors: ConfigValue) -> Self {
        Self { colors }
    }

    /// Negated twin of a scale: `{"4": "1rem"}` becomes `{"-4": "-1rem"}`.
    /// Zero entries and values that cannot be negated are dropped.
    pub fn negative(&self, scale: &ConfigValue) -> ConfigValue {
        let Some(map) = scale.as_object() else {
            return ConfigValue::object();
        };
        map.iter()
            .filter_map(|(key, value)| {
                let css = value.to_css_value()?;
                if css == "0" {
                    return None;
                }
                negate_value(&css).map(|negated| (format!("-{key}"), ConfigValue::String(negated)))
            })
            .collect()
    }

    /// `screen-<name>` entries for every string-valued screen.
    pub fn breakpoints(&self, screens: &ConfigValue) -> ConfigValue {
        let Some(map) = screens.as_object() else {
            return ConfigValue::object();
        };
        map.iter()
            .filter(|(_, value)| value.as_str().is_some())
            .map(|(key, value)| (format!("screen-{key}"), value.clone()))
            .collect()
    }

    /// The built-in colour palette.
    pub fn colors(&self) -> &ConfigValue {
        &self.colors
    }
}

/// The media query for a `screens` entry: a minimum width, or an object
/// with `min`, `max` or `raw`.
pub fn screen_query(screen: &ConfigValue) -> Option<String> {
    if let Some(min) = screen.to_css_value() {
        return Some(format!("(min-width: {min})"));
    }
    if let Some(raw) = screen.get("raw").and_then(ConfigValue::to_css_value) {
        return Some(raw);
    }
    let min = screen.get("min").and_then(ConfigValue::to_css_value);
    let max = screen.get("max").and_then(ConfigValue::to_css_value);
    match (min, max) {
        (Some(min), Some(max)) => Some(format!("(min-width: {min}) and (max-width: {max})")),
        (Some(min), None) => Some(format!("(min-width: {min})")),
        (None, Some(max)) => Some(format!("(max-width: {max})")),
        (None, None) => None,
    }
}

/// Split a theme path into segments: `a.b[c.d]` becomes `["a", "b", "c.d"]`.
pub fn to_path(path: &str) -> Result<Vec<String>> {
    if path.matches('[').count() != path.matches(']').count() {
        return Err(TailorError::config(format!(
            "Path is invalid. Has unbalanced brackets: {path}"
        )));
    }

    let mut segments = Vec::new();
    let mut current = String::new();
    let mut in_brackets = false;
    let mut flush = |current: &mut String| {
        let segment = current.trim().trim_matches(|c| c == '\'' || c == '"');
        if !segment.is_empty() {
            segments.push(segment.to_string());
        }
        current.clear();
    };

    for c in path.chars() {
        match c {
            '[' => {
                flush(&mut current);
                in_brackets = true;
            }
            ']' => {
                flush(&mut current);
                in_brackets = false;
            }
            '.' if !in_brackets => flush(&mut current),
            _ => current.push(c),
        }
    }
    flush(&mut current);

    Ok(segments)
}

/// Split `colors.red.500 / 50%` into the path and the alpha.
fn split_alpha(path: &str) -> Option<(&str, &str)> {
    let mut depth = 0usize;
    let mut split = None;
    for (index, c) in path.char_indices() {
        match c {
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            '/' if depth == 0 => split = Some(index),
            _ => {}
        }
    }
    let index = split?;
    let (base, alpha) = (path[..index].trim(), path[index + 1..].trim());
    if base.is_empty() || alpha.is_empty() || alpha.contains(char::is_whitespace) {
        return None;
    }
    Some((base, alpha))
}

/// Look a path up in a function-free tree. A missing segment is joined to
/// the next one with `-` and retried, so `colors.red.500` also finds a
/// `red-500` key.
fn lookup<'a>(value: &'a ConfigValue, segments: &[String]) -> Option<&'a ConfigValue> {
    let Some((head, tail)) = segments.split_first() else {
        return Some(value);
    };
    match value.get(head) {
        Some(child) => lookup(child, tail),
        None => {
            let (next, rest) = tail.split_first()?;
            let mut merged = vec![format!("{head}-{next}")];
            merged.extend(rest.iter().cloned());
            lookup(value, &merged)
        }
    }
}

fn apply_alpha(value: ConfigValue, alpha: &str) -> ConfigValue {
    match value.to_css_value() {
        Some(css) => ConfigValue::String(color::with_alpha(&css, alpha)),
        None => value,
    }
}

/// Pull-based resolver over the merged (but unresolved) theme.
pub(crate) struct ThemeResolver {
    raw: ConfigValue,
    utils: ThemeUtils,
    memo: RefCell<HashMap<String, ConfigValue>>,
    in_progress: RefCell<Vec<String>>,
}

impl ThemeResolver {
    pub fn new(raw: ConfigMap, utils: ThemeUtils) -> Self {
        Self {
            raw: ConfigValue::Object(raw),
            utils,
            memo: RefCell::new(HashMap::new()),
            in_progress: RefCell::new(Vec::new()),
        }
    }

    /// Resolve every key, producing a theme with no functions left in it.
    pub fn finish(self) -> Result<ResolvedTheme> {
        let mut values = ConfigMap::new();
        if let Some(map) = self.raw.as_object() {
            for (key, value) in map {
                values.insert(key.clone(), self.deep_resolve(value, key)?);
            }
        }
        Ok(ResolvedTheme { values })
    }

    fn walk(&self, value: &ConfigValue, path: &str, rest: &[String]) -> Result<Option<ConfigValue>> {
        if let ConfigValue::Function(f) = value {
            let resolved = self.call(path, f)?;
            return Ok(lookup(&resolved, rest).cloned());
        }

        let Some((head, tail)) = rest.split_first() else {
            return self.deep_resolve(value, path).map(Some);
        };

        match value.get(head) {
            Some(child) => self.walk(child, &join_path(path, head), tail),
            None => match tail.split_first() {
                Some((next, remaining)) => {
                    let mut merged = vec![format!("{head}-{next}")];
                    merged.extend(remaining.iter().cloned());
                    self.walk(value, path, &merged)
                }
                None => Ok(None),
            },
        }
    }

    fn call(&self, path: &str, f: &ThemeFn) -> Result<ConfigValue> {
        if let Some(value) = self.memo.borrow().get(path) {
            return Ok(value.clone());
        }

        {
            let mut stack = self.in_progress.borrow_mut();
            if let Some(start) = stack.iter().position(|p| p == path) {
                let mut cycle: Vec<String> = stack[start..].to_vec();
                cycle.push(path.to_string());
                stack.clear();
                return Err(TailorError::CycleDetected { cycle });
            }
            stack.push(path.to_string());
        }

        let result = f(self, &self.utils).and_then(|value| self.deep_resolve(&value, path));
        self.in_progress.borrow_mut().retain(|p| p != path);
        let value = result?;

        self.memo
            .borrow_mut()
            .insert(path.to_string(), value.clone());
        Ok(value)
    }

    fn deep_resolve(&self, value: &ConfigValue, path: &str) -> Result<ConfigValue> {
        match value {
            ConfigValue::Function(f) => self.call(path, f),
            ConfigValue::Object(map) => {
                let mut out = ConfigMap::with_capacity(map.len());
                for (key, child) in map {
                    out.insert(key.clone(), self.deep_resolve(child, &join_path(path, key))?);
                }
                Ok(ConfigValue::Object(out))
            }
            ConfigValue::Array(items) => items
                .iter()
                .enumerate()
                .map(|(index, item)| self.deep_resolve(item, &join_path(path, &index.to_string())))
                .collect::<Result<Vec<_>>>()
                .map(ConfigValue::Array),
            other => Ok(other.clone()),
        }
    }
}

fn join_path(path: &str, segment: &str) -> String {
    if path.is_empty() {
        segment.to_string()
    } else {
        format!("{path}.{segment}")
    }
}

impl ThemeLookup for ThemeResolver {
    fn resolve(&self, path: &str) -> Result<Option<ConfigValue>> {
        let segments = to_path(path)?;
        if let Some(value) = self.walk(&self.raw, "", &segments)? {
            return Ok(Some(value));
        }
        let Some((base, alpha)) = split_alpha(path) else {
            return Ok(None);
        };
        let segments = to_path(base)?;
        Ok(self
            .walk(&self.raw, "", &segments)?
            .map(|value| apply_alpha(value, alpha)))
    }
}

/// The fully resolved theme. Contains no functions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedTheme {
    values: ConfigMap,
}

impl ResolvedTheme {
    /// Look up a path, applying a trailing ` / alpha` if present.
    pub fn get(&self, path: &str) -> Option<ConfigValue> {
        let segments = to_path(path).ok()?;
        if let Some(value) = self.lookup(&segments) {
            return Some(value.clone());
        }
        let (base, alpha) = split_alpha(path)?;
        let segments = to_path(base).ok()?;
        self.lookup(&segments)
            .map(|value| apply_alpha(value.clone(), alpha))
    }

    /// A whole top-level section such as `spacing`.
    pub fn section(&self, key: &str) -> Option<&ConfigValue> {
        self.values.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// The media query for the `screens` entry `name`.
    pub fn screen(&self, name: &str) -> Option<String> {
        self.section("screens")?.get(name).and_then(screen_query)
    }

    fn lookup(&self, segments: &[String]) -> Option<&ConfigValue> {
        let (head, tail) = segments.split_first()?;
        match self.values.get(head) {
            Some(section) => lookup(section, tail),
            None => {
                let (next, rest) = tail.split_first()?;
                let mut merged = vec![format!("{head}-{next}")];
                merged.extend(rest.iter().cloned());
                self.lookup(&merged)
            }
        }
    }
}

impl ThemeLookup for ResolvedTheme {
    fn resolve(&self, path: &str) -> Result<Option<ConfigValue>> {
        to_path(path)?;
        Ok(self.get(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn resolver(raw: ConfigValue) -> ThemeResolver {
        let map = raw.as_object().cloned().unwrap_or_default();
        ThemeResolver::new(map, ThemeUtils::new(ConfigValue::object()))
    }

    #[test]
    fn test_to_path() {
        assert_eq!(to_path("colors.red.500").unwrap(), vec!["colors", "red", "500"]);
        assert_eq!(to_path("spacing[2.5]").unwrap(), vec!["spacing", "2.5"]);
        assert_eq!(to_path("colors['blue']").unwrap(), vec!["colors", "blue"]);
        assert!(to_path("spacing[2.5").is_err());
    }

    #[test]
    fn test_function_values_resolve_lazily() {
        let mut raw = ConfigValue::from(json!({"spacing": {"4": "1rem"}}))
            .as_object()
            .cloned()
            .unwrap();
        raw.insert(
            "padding".into(),
            ConfigValue::function(|theme, _| theme.resolve_or("spacing", ConfigValue::Null)),
        );
        let theme = ThemeResolver::new(raw, ThemeUtils::new(ConfigValue::Null))
            .finish()
            .unwrap();
        assert_eq!(theme.get("padding.4"), Some(ConfigValue::from("1rem")));
    }

    #[test]
    fn test_cycle_is_detected() {
        let mut raw = ConfigMap::new();
        raw.insert(
            "a".into(),
            ConfigValue::function(|theme, _| theme.resolve_or("b", ConfigValue::Null)),
        );
        raw.insert(
            "b".into(),
            ConfigValue::function(|theme, _| theme.resolve_or("a", ConfigValue::Null)),
        );
        let err = ThemeResolver::new(raw, ThemeUtils::new(ConfigValue::Null))
            .finish()
            .unwrap_err();
        match err {
            TailorError::CycleDetected { cycle } => assert_eq!(cycle, vec!["a", "b", "a"]),
            other => panic!("expected cycle, got {other:?}"),
        }
    }

    #[test]
    fn test_nested_function_can_read_sibling() {
        let mut colors = ConfigMap::new();
        colors.insert("blue".into(), ConfigValue::from("#3b82f6"));
        colors.insert(
            "primary".into(),
            ConfigValue::function(|theme, _| theme.resolve_or("colors.blue", ConfigValue::Null)),
        );
        let mut raw = ConfigMap::new();
        raw.insert("colors".into(), ConfigValue::Object(colors));
        let theme = ThemeResolver::new(raw, ThemeUtils::new(ConfigValue::Null))
            .finish()
            .unwrap();
        assert_eq!(theme.get("colors.primary"), Some(ConfigValue::from("#3b82f6")));
    }

    #[test]
    fn test_missing_segment_joins_with_dash() {
        let r = resolver(ConfigValue::from(json!({"colors": {"red-500": "#ef4444"}})));
        assert_eq!(
            r.resolve("colors.red.500").unwrap(),
            Some(ConfigValue::from("#ef4444"))
        );
        assert_eq!(r.resolve("colors.red.600").unwrap(), None);
    }

    #[test]
    fn test_alpha_suffix() {
        let theme = resolver(ConfigValue::from(json!({"colors": {"red": {"500": "#ef4444"}}})))
            .finish()
            .unwrap();
        assert_eq!(
            theme.get("colors.red.500 / 50%"),
            Some(ConfigValue::from("rgb(239 68 68 / 50%)"))
        );
    }

    #[test]
    fn test_fraction_key_wins_over_alpha() {
        let theme = resolver(ConfigValue::from(json!({"width": {"1/2": "50%"}})))
            .finish()
            .unwrap();
        assert_eq!(theme.get("width.1/2"), Some(ConfigValue::from("50%")));
    }

    #[test]
    fn test_utils_negative_and_breakpoints() {
        let utils = ThemeUtils::new(ConfigValue::Null);
        let scale = ConfigValue::from(json!({"0": "0", "4": "1rem", "auto": "auto"}));
        assert_eq!(
            utils.negative(&scale),
            ConfigValue::from(json!({"-4": "-1rem"}))
        );
        let screens = ConfigValue::from(json!({"sm": "640px", "print": {"raw": "print"}}));
        assert_eq!(
            utils.breakpoints(&screens),
            ConfigValue::from(json!({"screen-sm": "640px"}))
        );
    }
}
