//! Config fragments and their resolution.
//!
//! A build is configured by an ordered list of [`ConfigFragment`]s, highest
//! precedence first. [`resolve_config`] flattens presets and plugin-declared
//! sub-configs into that list, appends the built-in base config, and folds
//! everything into one [`ResolvedConfig`]:
//!
//! - `theme`: first fragment wins per key, then every `extend` is merged on
//!   top; lazy theme functions are resolved with cycle detection
//! - `variants`: per utility group allow-lists
//! - `corePlugins`: which built-in plugins are enabled
//! - `plugins`: concatenated in precedence order
//! - `prefix`, `separator`, `important`, `darkMode`, `experimental`: first
//!   fragment that sets them wins
//!
//! # Example
//!
//! ```ignore
//! use tailor::config::{resolve_config, ConfigFragment};
//!
//! let user = ConfigFragment::from_json(serde_json::json!({
//!     "theme": {"extend": {"colors": {"brand": "#0ea5e9"}}}
//! }))?;
//! let config = resolve_config(&[user])?;
//! assert_eq!(config.theme.get("colors.brand").is_some(), true);
//! ```

pub mod defaults;
mod merge;
pub mod theme;
pub mod value;
pub mod variants;

use std::fmt;
use std::sync::Arc;

use log::{debug, warn};

use crate::error::{Result, TailorError};
use crate::plugin::Plugin;

pub use theme::{screen_query, to_path, ResolvedTheme, ThemeLookup, ThemeUtils};
pub use value::{format_number, merge_extension, ConfigMap, ConfigValue, ThemeFn, VariantsFn};
pub use variants::{ResolvedVariants, VariantHelpers};

use merge::merge_themes;
use theme::ThemeResolver;
use variants::{resolve_core_plugins, resolve_variants};

/// One layer of configuration: a nested value map plus plugins and presets.
#[derive(Clone, Default)]
pub struct ConfigFragment {
    pub values: ConfigMap,
    pub plugins: Vec<Arc<dyn Plugin>>,
    pub presets: Vec<ConfigFragment>,
}

impl ConfigFragment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a fragment from a JSON document. A `presets` array is read as
    /// nested fragments; `plugins` cannot be expressed in JSON and is
    /// ignored with a warning.
    pub fn from_json(value: serde_json::Value) -> Result<Self> {
        let serde_json::Value::Object(map) = value else {
            return Err(TailorError::Config {
                message: "config must be an object".to_string(),
                help: Some("Wrap the config in `{ ... }`".to_string()),
            });
        };

        let mut fragment = ConfigFragment::new();
        for (key, value) in map {
            match key.as_str() {
                "presets" => {
                    let serde_json::Value::Array(presets) = value else {
                        return Err(TailorError::config("`presets` must be a list of configs"));
                    };
                    for preset in presets {
                        fragment.presets.push(ConfigFragment::from_json(preset)?);
                    }
                }
                "plugins" => {
                    warn!("ignoring `plugins` in a JSON config; register plugins from code");
                }
                _ => {
                    fragment.values.insert(key, ConfigValue::from(value));
                }
            }
        }
        Ok(fragment)
    }

    /// Set a top-level key.
    pub fn set(mut self, key: impl Into<String>, value: impl Into<ConfigValue>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn with_plugin(mut self, plugin: Arc<dyn Plugin>) -> Self {
        self.plugins.push(plugin);
        self
    }

    pub fn with_preset(mut self, preset: ConfigFragment) -> Self {
        self.presets.push(preset);
        self
    }

    pub fn get(&self, key: &str) -> Option<&ConfigValue> {
        self.values.get(key)
    }
}

impl fmt::Debug for ConfigFragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigFragment")
            .field("values", &self.values)
            .field(
                "plugins",
                &self.plugins.iter().map(|p| p.name()).collect::<Vec<_>>(),
            )
            .field("presets", &self.presets)
            .finish()
    }
}

/// How `!important` is applied to every generated utility.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Important {
    #[default]
    Off,
    /// Every declaration gets `!important`.
    All,
    /// Every utility rule is nested under this selector instead.
    Selector(String),
}

/// How the `dark` variant is expressed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DarkMode {
    #[default]
    Media,
    /// Applies under an ancestor matching this selector.
    Class(String),
}

/// The fully merged config a build runs against.
#[derive(Clone)]
pub struct ResolvedConfig {
    pub theme: ResolvedTheme,
    pub prefix: String,
    pub separator: String,
    pub important: Important,
    pub dark_mode: DarkMode,
    pub variant_grouping: bool,
    pub variants: ResolvedVariants,
    pub core_plugins: Vec<String>,
    pub plugins: Vec<Arc<dyn Plugin>>,
}

impl ResolvedConfig {
    pub fn core_plugin_enabled(&self, name: &str) -> bool {
        self.core_plugins.iter().any(|p| p == name)
    }
}

impl fmt::Debug for ResolvedConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedConfig")
            .field("prefix", &self.prefix)
            .field("separator", &self.separator)
            .field("important", &self.important)
            .field("dark_mode", &self.dark_mode)
            .field("variant_grouping", &self.variant_grouping)
            .field("core_plugins", &self.core_plugins)
            .field(
                "plugins",
                &self.plugins.iter().map(|p| p.name()).collect::<Vec<_>>(),
            )
            .finish_non_exhaustive()
    }
}

/// Each fragment, then its presets, then its plugins' configs, recursively.
fn flatten(fragment: &ConfigFragment, out: &mut Vec<ConfigFragment>) {
    out.push(fragment.clone());
    for preset in &fragment.presets {
        flatten(preset, out);
    }
    for plugin in &fragment.plugins {
        if let Some(config) = plugin.config() {
            flatten(&config, out);
        }
    }
}

/// Resolve fragments (highest precedence first) into one config.
pub fn resolve_config(fragments: &[ConfigFragment]) -> Result<ResolvedConfig> {
    let mut flat = Vec::new();
    for fragment in fragments {
        flatten(fragment, &mut flat);
    }
    flatten(&defaults::base_config(), &mut flat);
    debug!("resolving config from {} fragment(s)", flat.len());

    let mut themes = Vec::new();
    for fragment in &flat {
        match fragment.get("theme") {
            Some(ConfigValue::Object(theme)) => themes.push(theme),
            Some(_) => return Err(TailorError::config("`theme` must be an object")),
            None => {}
        }
    }
    let merged = merge_themes(&themes);
    let theme = ThemeResolver::new(merged, ThemeUtils::new(defaults::colors())).finish()?;

    let values_of = |key: &str| -> Vec<Option<&ConfigValue>> {
        flat.iter().map(|fragment| fragment.get(key)).collect()
    };
    let variants = resolve_variants(&values_of("variants"), defaults::VARIANT_ORDER)?;
    let core_plugins = resolve_core_plugins(&values_of("corePlugins"), defaults::CORE_PLUGINS)?;

    let first = |key: &str| flat.iter().find_map(|fragment| fragment.get(key));

    let prefix = match first("prefix") {
        None => String::new(),
        Some(value) => string_setting(value, "prefix")?,
    };

    let separator = match first("separator") {
        None => ":".to_string(),
        Some(value) => string_setting(value, "separator")?,
    };
    if separator.is_empty() || separator == "-" {
        return Err(TailorError::Config {
            message: format!("invalid separator {separator:?}"),
            help: Some("The separator cannot be empty or `-`; use `:` or `_`".to_string()),
        });
    }

    let important = match first("important") {
        None | Some(ConfigValue::Bool(false)) | Some(ConfigValue::Null) => Important::Off,
        Some(ConfigValue::Bool(true)) => Important::All,
        Some(ConfigValue::String(selector)) => Important::Selector(selector.clone()),
        Some(_) => {
            return Err(TailorError::config(
                "`important` must be a boolean or a selector",
            ))
        }
    };

    let dark_mode = match first("darkMode") {
        None => DarkMode::Media,
        Some(ConfigValue::String(mode)) if mode == "media" => DarkMode::Media,
        Some(ConfigValue::String(mode)) if mode == "class" => DarkMode::Class(".dark".into()),
        Some(ConfigValue::Array(items)) if items.first().and_then(ConfigValue::as_str) == Some("class") => {
            let selector = items
                .get(1)
                .and_then(ConfigValue::as_str)
                .unwrap_or(".dark");
            DarkMode::Class(selector.to_string())
        }
        Some(other) => {
            return Err(TailorError::Config {
                message: format!("unsupported darkMode {other:?}"),
                help: Some("Use \"media\", \"class\" or [\"class\", \".selector\"]".into()),
            })
        }
    };

    let variant_grouping = match first("experimental") {
        Some(ConfigValue::String(all)) => all == "all",
        Some(ConfigValue::Object(flags)) => flags
            .get("variantGrouping")
            .and_then(ConfigValue::as_bool)
            .unwrap_or(false),
        _ => false,
    };

    let plugins = flat
        .iter()
        .flat_map(|fragment| fragment.plugins.iter().cloned())
        .collect();

    Ok(ResolvedConfig {
        theme,
        prefix,
        separator,
        important,
        dark_mode,
        variant_grouping,
        variants,
        core_plugins,
        plugins,
    })
}

fn string_setting(value: &ConfigValue, key: &str) -> Result<String> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| TailorError::config(format!("`{key}` must be a string")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn fragment(value: serde_json::Value) -> ConfigFragment {
        ConfigFragment::from_json(value).unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = resolve_config(&[]).unwrap();
        assert_eq!(config.prefix, "");
        assert_eq!(config.separator, ":");
        assert_eq!(config.important, Important::Off);
        assert_eq!(config.dark_mode, DarkMode::Media);
        assert!(!config.variant_grouping);
        assert!(config.core_plugin_enabled("padding"));
        assert_eq!(config.theme.get("spacing.4"), Some(ConfigValue::from("1rem")));
        assert_eq!(config.theme.get("padding.4"), Some(ConfigValue::from("1rem")));
    }

    #[test]
    fn test_extend_opacity_order() {
        let user = fragment(json!({
            "theme": {"opacity": {"0": "0", "50": "0.5", "100": "1"},
                      "extend": {"opacity": {"25": "0.25", "75": "0.75"}}}
        }));
        let config = resolve_config(&[user]).unwrap();
        let keys: Vec<_> = config
            .theme
            .section("opacity")
            .and_then(ConfigValue::as_object)
            .unwrap()
            .keys()
            .cloned()
            .collect();
        assert_eq!(keys, vec!["0", "50", "100", "25", "75"]);
    }

    #[test]
    fn test_extend_flows_through_aliases() {
        let user = fragment(json!({"theme": {"extend": {"spacing": {"128": "32rem"}}}}));
        let config = resolve_config(&[user]).unwrap();
        assert_eq!(config.theme.get("width.128"), Some(ConfigValue::from("32rem")));
        assert_eq!(config.theme.get("margin.auto"), Some(ConfigValue::from("auto")));
    }

    #[test]
    fn test_preset_below_user() {
        let user = fragment(json!({
            "prefix": "tw-",
            "presets": [{"prefix": "x-", "separator": "_"}]
        }));
        let config = resolve_config(&[user]).unwrap();
        assert_eq!(config.prefix, "tw-");
        assert_eq!(config.separator, "_");
    }

    #[test]
    fn test_invalid_separator() {
        for separator in ["-", ""] {
            let user = fragment(json!({"separator": separator}));
            assert!(matches!(
                resolve_config(&[user]),
                Err(TailorError::Config { .. })
            ));
        }
    }

    #[test]
    fn test_cycle_in_user_theme() {
        let theme: ConfigMap = [
            (
                "a".to_string(),
                ConfigValue::function(|theme, _| theme.resolve_or("b", ConfigValue::Null)),
            ),
            (
                "b".to_string(),
                ConfigValue::function(|theme, _| theme.resolve_or("a", ConfigValue::Null)),
            ),
        ]
        .into_iter()
        .collect();
        let user = ConfigFragment::new().set("theme", ConfigValue::Object(theme));
        assert!(matches!(
            resolve_config(&[user]),
            Err(TailorError::CycleDetected { .. })
        ));
    }

    #[test]
    fn test_failing_theme_function_propagates() {
        let theme: ConfigMap = [(
            "broken".to_string(),
            ConfigValue::function(|_, _| Err(TailorError::config("boom"))),
        )]
        .into_iter()
        .collect();
        let user = ConfigFragment::new().set("theme", ConfigValue::Object(theme));
        let err = resolve_config(&[user]).unwrap_err();
        assert_eq!(err.to_string(), "Config error: boom");
    }

    #[test]
    fn test_important_and_dark_mode() {
        let user = fragment(json!({"important": "#app", "darkMode": ["class", ".night"]}));
        let config = resolve_config(&[user]).unwrap();
        assert_eq!(config.important, Important::Selector("#app".into()));
        assert_eq!(config.dark_mode, DarkMode::Class(".night".into()));
    }

    #[test]
    fn test_core_plugins_from_user() {
        let user = fragment(json!({"corePlugins": {"preflight": false}}));
        let config = resolve_config(&[user]).unwrap();
        assert!(!config.core_plugin_enabled("preflight"));
        assert!(config.core_plugin_enabled("margin"));
    }

    #[test]
    fn test_same_fragments_resolve_equal() {
        let user = fragment(json!({"theme": {"extend": {"colors": {"brand": "#123456"}}}}));
        let a = resolve_config(&[user.clone()]).unwrap();
        let b = resolve_config(&[user]).unwrap();
        assert_eq!(a.theme, b.theme);
    }
}
