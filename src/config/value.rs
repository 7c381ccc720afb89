//! Config values: a JSON-like tree whose leaves may be lazy functions.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::error::Result;

use super::theme::{ThemeLookup, ThemeUtils};
use super::variants::VariantHelpers;

/// A lazily evaluated theme value: `(resolve, utils) -> value`.
pub type ThemeFn =
    Arc<dyn Fn(&dyn ThemeLookup, &ThemeUtils) -> Result<ConfigValue> + Send + Sync>;

/// A variant-list function that splices relative to the lists resolved so far.
pub type VariantsFn = Arc<dyn Fn(&VariantHelpers<'_>) -> Result<Vec<String>> + Send + Sync>;

/// Ordered object map used throughout the config tree.
pub type ConfigMap = IndexMap<String, ConfigValue>;

#[derive(Clone, Default)]
pub enum ConfigValue {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<ConfigValue>),
    Object(ConfigMap),
    /// A theme function, resolved on demand.
    Function(ThemeFn),
    /// A `variants` entry computed from the lists of lower-precedence fragments.
    Variants(VariantsFn),
}

impl ConfigValue {
    /// Wrap a closure as a lazy theme value.
    pub fn function<F>(f: F) -> Self
    where
        F: Fn(&dyn ThemeLookup, &ThemeUtils) -> Result<ConfigValue> + Send + Sync + 'static,
    {
        ConfigValue::Function(Arc::new(f))
    }

    /// Wrap a closure as a functional `variants` entry.
    pub fn variants<F>(f: F) -> Self
    where
        F: Fn(&VariantHelpers<'_>) -> Result<Vec<String>> + Send + Sync + 'static,
    {
        ConfigValue::Variants(Arc::new(f))
    }

    pub fn object() -> Self {
        ConfigValue::Object(ConfigMap::new())
    }

    pub fn is_function(&self) -> bool {
        matches!(self, ConfigValue::Function(_) | ConfigValue::Variants(_))
    }

    pub fn is_object(&self) -> bool {
        matches!(self, ConfigValue::Object(_))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ConfigValue::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ConfigValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ConfigMap> {
        match self {
            ConfigValue::Object(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[ConfigValue]> {
        match self {
            ConfigValue::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Look up a direct child by key (objects) or index (arrays).
    pub fn get(&self, key: &str) -> Option<&ConfigValue> {
        match self {
            ConfigValue::Object(map) => map.get(key),
            ConfigValue::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        }
    }

    /// Render a leaf as a CSS value.
    ///
    /// Strings and numbers render directly; arrays of leaves (font stacks,
    /// shadow lists) join with `", "`.
    pub fn to_css_value(&self) -> Option<String> {
        match self {
            ConfigValue::String(s) => Some(s.clone()),
            ConfigValue::Number(n) => Some(format_number(*n)),
            ConfigValue::Array(items) if !items.is_empty() => {
                let parts: Option<Vec<String>> = items.iter().map(|v| v.to_css_value()).collect();
                parts.map(|parts| parts.join(", "))
            }
            _ => None,
        }
    }

    /// Collect a string list (`["hover", "focus"]`).
    pub fn to_string_list(&self) -> Option<Vec<String>> {
        self.as_array()?
            .iter()
            .map(|v| v.as_str().map(str::to_string))
            .collect()
    }

    /// Flatten nested objects into `parent-child` keys, the way colour
    /// palettes are addressed by utilities (`red-500`). A `DEFAULT` child
    /// maps to the parent key itself.
    pub fn flatten(&self) -> ConfigMap {
        let mut out = ConfigMap::new();
        if let ConfigValue::Object(map) = self {
            flatten_into(map, None, &mut out);
        }
        out
    }
}

fn flatten_into(map: &ConfigMap, prefix: Option<&str>, out: &mut ConfigMap) {
    for (key, value) in map {
        let full = match (prefix, key.as_str()) {
            (Some(prefix), "DEFAULT") => prefix.to_string(),
            (Some(prefix), key) => format!("{prefix}-{key}"),
            (None, key) => key.to_string(),
        };
        match value {
            ConfigValue::Object(child) => flatten_into(child, Some(&full), out),
            other => {
                out.insert(full, other.clone());
            }
        }
    }
}

/// Format a number the way CSS expects (`1`, `0.5`, never `1.0`).
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

impl PartialEq for ConfigValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ConfigValue::Null, ConfigValue::Null) => true,
            (ConfigValue::Bool(a), ConfigValue::Bool(b)) => a == b,
            (ConfigValue::Number(a), ConfigValue::Number(b)) => a == b,
            (ConfigValue::String(a), ConfigValue::String(b)) => a == b,
            (ConfigValue::Array(a), ConfigValue::Array(b)) => a == b,
            (ConfigValue::Object(a), ConfigValue::Object(b)) => {
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x == y)
            }
            (ConfigValue::Function(a), ConfigValue::Function(b)) => Arc::ptr_eq(a, b),
            (ConfigValue::Variants(a), ConfigValue::Variants(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigValue::Null => write!(f, "null"),
            ConfigValue::Bool(b) => write!(f, "{b}"),
            ConfigValue::Number(n) => write!(f, "{}", format_number(*n)),
            ConfigValue::String(s) => write!(f, "{s:?}"),
            ConfigValue::Array(items) => f.debug_list().entries(items).finish(),
            ConfigValue::Object(map) => f.debug_map().entries(map.iter()).finish(),
            ConfigValue::Function(_) => write!(f, "<theme fn>"),
            ConfigValue::Variants(_) => write!(f, "<variants fn>"),
        }
    }
}

impl From<serde_json::Value> for ConfigValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => ConfigValue::Null,
            serde_json::Value::Bool(b) => ConfigValue::Bool(b),
            serde_json::Value::Number(n) => ConfigValue::Number(n.as_f64().unwrap_or_default()),
            serde_json::Value::String(s) => ConfigValue::String(s),
            serde_json::Value::Array(items) => {
                ConfigValue::Array(items.into_iter().map(ConfigValue::from).collect())
            }
            serde_json::Value::Object(map) => ConfigValue::Object(
                map.into_iter()
                    .map(|(k, v)| (k, ConfigValue::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for ConfigValue {
    fn from(value: &str) -> Self {
        ConfigValue::String(value.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(value: String) -> Self {
        ConfigValue::String(value)
    }
}

impl From<ConfigMap> for ConfigValue {
    fn from(value: ConfigMap) -> Self {
        ConfigValue::Object(value)
    }
}

impl FromIterator<(String, ConfigValue)> for ConfigValue {
    fn from_iter<T: IntoIterator<Item = (String, ConfigValue)>>(iter: T) -> Self {
        ConfigValue::Object(iter.into_iter().collect())
    }
}

/// Deep-merge `source` into `target` with extension semantics: objects
/// merge recursively, arrays replace, except that arrays of objects
/// concatenate and an object followed by an array of objects is prepended.
pub fn merge_extension(target: ConfigValue, source: ConfigValue) -> ConfigValue {
    match (target, source) {
        (ConfigValue::Array(mut existing), source)
            if existing.first().is_some_and(ConfigValue::is_object) =>
        {
            match source {
                ConfigValue::Array(items) => existing.extend(items),
                other => existing.push(other),
            }
            ConfigValue::Array(existing)
        }
        (ConfigValue::Object(existing), ConfigValue::Array(items))
            if items.first().is_some_and(ConfigValue::is_object) =>
        {
            let mut merged = vec![ConfigValue::Object(existing)];
            merged.extend(items);
            ConfigValue::Array(merged)
        }
        (_, ConfigValue::Array(items)) => ConfigValue::Array(items),
        (ConfigValue::Object(mut existing), ConfigValue::Object(incoming)) => {
            for (key, value) in incoming {
                match existing.get_mut(&key) {
                    Some(current) => *current = merge_extension(std::mem::take(current), value),
                    None => {
                        existing.insert(key, value);
                    }
                }
            }
            ConfigValue::Object(existing)
        }
        (target, ConfigValue::Null) => target,
        (_, source) => source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json_preserves_order() {
        let value = ConfigValue::from(json!({"b": 1, "a": 2, "c": 3}));
        let keys: Vec<_> = value.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_to_css_value() {
        assert_eq!(ConfigValue::from(json!(0.5)).to_css_value().as_deref(), Some("0.5"));
        assert_eq!(ConfigValue::from(json!(100)).to_css_value().as_deref(), Some("100"));
        assert_eq!(
            ConfigValue::from(json!(["Inter", "sans-serif"])).to_css_value().as_deref(),
            Some("Inter, sans-serif")
        );
        assert_eq!(ConfigValue::from(json!({"a": 1})).to_css_value(), None);
    }

    #[test]
    fn test_flatten_palette() {
        let colors = ConfigValue::from(json!({
            "black": "#000",
            "red": {"DEFAULT": "#f00", "500": "#ef4444"}
        }));
        let flat = colors.flatten();
        let keys: Vec<_> = flat.keys().cloned().collect();
        assert_eq!(keys, vec!["black", "red", "red-500"]);
        assert_eq!(flat["red"], ConfigValue::from("#f00"));
    }

    #[test]
    fn test_merge_extension_objects_append_in_order() {
        let base = ConfigValue::from(json!({"0": "0", "50": "0.5", "100": "1"}));
        let ext = ConfigValue::from(json!({"25": "0.25", "75": "0.75"}));
        let merged = merge_extension(base, ext);
        let keys: Vec<_> = merged.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["0", "50", "100", "25", "75"]);
    }

    #[test]
    fn test_merge_extension_overrides_keep_position() {
        let base = ConfigValue::from(json!({"a": "1", "b": "2"}));
        let merged = merge_extension(base, ConfigValue::from(json!({"a": "9"})));
        let keys: Vec<_> = merged.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(merged.get("a"), Some(&ConfigValue::from("9")));
    }

    #[test]
    fn test_merge_extension_arrays_replace() {
        let merged = merge_extension(
            ConfigValue::from(json!(["a", "b"])),
            ConfigValue::from(json!(["c"])),
        );
        assert_eq!(merged, ConfigValue::from(json!(["c"])));
    }

    #[test]
    fn test_merge_extension_arrays_of_objects_concat() {
        let merged = merge_extension(
            ConfigValue::from(json!([{"a": 1}])),
            ConfigValue::from(json!([{"b": 2}])),
        );
        assert_eq!(merged, ConfigValue::from(json!([{"a": 1}, {"b": 2}])));
    }
}
