//! Plugins and utility resolution.
//!
//! Every utility and variant, built-in or not, is registered by a
//! [`Plugin`] through the [`PluginApi`] it is handed. The [`Registry`]
//! implements that API, and [`generate`] turns a parsed candidate into CSS
//! rules using what was registered.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use serde_json::json;
//! use tailor::plugin::{from_fn, PluginApi};
//!
//! let plugin = from_fn("skew", |api: &mut dyn PluginApi| {
//!     api.add_utilities(&json!({".skew-1": {"transform": "skewX(1deg)"}}).into())
//! });
//! let config = ConfigFragment::new().with_plugin(Arc::new(plugin));
//! ```

pub mod color;
pub mod core;
pub mod css_in_js;
pub mod data_types;
pub mod negate;
mod registry;
mod resolve;

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use crate::config::{ConfigFragment, ConfigMap, ConfigValue, ResolvedConfig, ResolvedTheme};
use crate::error::Result;

pub use data_types::DataType;
pub use registry::{RegisteredUtility, RegisteredVariant, Registry, UtilityKind, VariantDef};
pub use resolve::{generate, GeneratedRule};

/// A unit of registration: core plugins and user plugins alike.
pub trait Plugin: Send + Sync {
    fn name(&self) -> &str;

    /// Register utilities, components, base styles and variants.
    fn register(&self, api: &mut dyn PluginApi) -> Result<()>;

    /// A config fragment this plugin contributes, merged below the
    /// fragment that declared the plugin.
    fn config(&self) -> Option<ConfigFragment> {
        None
    }
}

/// The registration surface handed to [`Plugin::register`].
pub trait PluginApi {
    /// Styles emitted unconditionally in the base layer.
    fn add_base(&mut self, styles: &ConfigValue) -> Result<()>;

    /// Static component classes, emitted only when used.
    fn add_components(&mut self, styles: &ConfigValue) -> Result<()>;

    /// Static utility classes, emitted only when used.
    fn add_utilities(&mut self, styles: &ConfigValue) -> Result<()>;

    /// Functional utilities (`name-<value>`), one generator per name.
    fn match_utilities(
        &mut self,
        utilities: Vec<(String, UtilityFn)>,
        options: UtilityOptions,
    ) -> Result<()>;

    /// A variant with fixed formats such as `&:hover` or
    /// `@media (min-width: 640px)`.
    fn add_variant(&mut self, name: &str, formats: &[&str]) -> Result<()>;

    /// A variant taking a value (`aria-checked`, `min-[900px]`).
    fn match_variant(&mut self, name: &str, generator: VariantFn, options: VariantOptions)
        -> Result<()>;

    /// Look up a resolved theme path.
    fn theme(&self, path: &str) -> Option<ConfigValue>;

    fn config(&self) -> &ResolvedConfig;

    /// Apply the configured prefix to every class in `selector`.
    fn prefix(&self, selector: &str) -> String;
}

/// What a utility generator receives.
pub struct UtilityInput<'a> {
    /// The resolved value: a theme entry, or a string for arbitrary and
    /// bare values.
    pub value: &'a ConfigValue,
    /// The resolved modifier, if the candidate had one.
    pub modifier: Option<&'a str>,
    /// The type an arbitrary value was matched as; [`DataType::Any`]
    /// otherwise.
    pub data_type: DataType,
    pub theme: &'a ResolvedTheme,
}

impl UtilityInput<'_> {
    /// The value as a CSS string.
    pub fn css(&self) -> Option<String> {
        self.value.to_css_value()
    }
}

/// Builds declarations for one utility value. `None` means the value does
/// not apply and no rule is generated.
pub type UtilityFn = Arc<dyn Fn(&UtilityInput<'_>) -> Option<ConfigValue> + Send + Sync>;

/// Maps an unlisted value (`z-60`) to a CSS value.
pub type BareValueFn = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Builds variant formats from a value and an optional modifier.
pub type VariantFn = Arc<dyn Fn(&str, Option<&str>) -> Option<Vec<String>> + Send + Sync>;

/// Orders two arbitrary values of the same functional variant.
pub type VariantCompare = Arc<dyn Fn(&str, &str) -> Ordering + Send + Sync>;

/// Wrap a closure as a [`UtilityFn`].
pub fn utility<F>(f: F) -> UtilityFn
where
    F: Fn(&UtilityInput<'_>) -> Option<ConfigValue> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Wrap a closure as a [`VariantFn`].
pub fn variant<F>(f: F) -> VariantFn
where
    F: Fn(&str, Option<&str>) -> Option<Vec<String>> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Which modifiers a utility accepts.
#[derive(Debug, Clone, PartialEq)]
pub enum Modifiers {
    /// Any modifier passes through as written.
    Any,
    /// Named modifiers are looked up here; arbitrary ones pass through.
    Table(ConfigMap),
}

#[derive(Clone)]
pub struct UtilityOptions {
    /// Named values, keyed as they appear in class names.
    pub values: ConfigMap,
    /// Accepted arbitrary value types, in preference order.
    pub types: Vec<DataType>,
    /// Also register `-name` with the value negated.
    pub supports_negative_values: bool,
    /// `None` rejects every candidate carrying a modifier.
    pub modifiers: Option<Modifiers>,
    pub bare_values: Option<BareValueFn>,
    /// The `variants` config group; defaults to the plugin name.
    pub group: Option<String>,
    pub respect_prefix: bool,
    pub respect_important: bool,
}

impl Default for UtilityOptions {
    fn default() -> Self {
        Self {
            values: ConfigMap::new(),
            types: vec![DataType::Any],
            supports_negative_values: false,
            modifiers: None,
            bare_values: None,
            group: None,
            respect_prefix: true,
            respect_important: true,
        }
    }
}

impl UtilityOptions {
    /// Options with `values` taken from a flattened theme section.
    pub fn with_values(values: ConfigMap) -> Self {
        Self {
            values,
            ..Self::default()
        }
    }

    pub fn types(mut self, types: &[DataType]) -> Self {
        self.types = types.to_vec();
        self
    }

    pub fn negative(mut self) -> Self {
        self.supports_negative_values = true;
        self
    }

    pub fn modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = Some(modifiers);
        self
    }

    pub fn bare_values(mut self, f: BareValueFn) -> Self {
        self.bare_values = Some(f);
        self
    }

    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub(crate) fn accepts(&self, data_type: DataType) -> bool {
        self.types.contains(&data_type)
    }
}

impl fmt::Debug for UtilityOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UtilityOptions")
            .field("values", &self.values.len())
            .field("types", &self.types)
            .field("supports_negative_values", &self.supports_negative_values)
            .field("modifiers", &self.modifiers)
            .field("group", &self.group)
            .finish_non_exhaustive()
    }
}

#[derive(Clone, Default)]
pub struct VariantOptions {
    /// Named values in sort order. A `DEFAULT` entry applies when the
    /// variant is used without a value.
    pub values: ConfigMap,
    /// Orders arbitrary values; lexicographic when absent.
    pub sort: Option<VariantCompare>,
}

impl VariantOptions {
    pub fn with_values(values: ConfigMap) -> Self {
        Self { values, sort: None }
    }

    pub fn sort(mut self, compare: VariantCompare) -> Self {
        self.sort = Some(compare);
        self
    }
}

impl fmt::Debug for VariantOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VariantOptions")
            .field("values", &self.values.keys().collect::<Vec<_>>())
            .field("sort", &self.sort.is_some())
            .finish()
    }
}

/// A plugin made from a name and a closure.
pub struct FnPlugin<F> {
    name: String,
    register: F,
    config: Option<ConfigFragment>,
}

impl<F> FnPlugin<F> {
    /// Attach a config fragment.
    pub fn with_config(mut self, config: ConfigFragment) -> Self {
        self.config = Some(config);
        self
    }
}

impl<F> Plugin for FnPlugin<F>
where
    F: Fn(&mut dyn PluginApi) -> Result<()> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn register(&self, api: &mut dyn PluginApi) -> Result<()> {
        (self.register)(api)
    }

    fn config(&self) -> Option<ConfigFragment> {
        self.config.clone()
    }
}

/// Build a [`Plugin`] from a closure.
pub fn from_fn<F>(name: impl Into<String>, register: F) -> FnPlugin<F>
where
    F: Fn(&mut dyn PluginApi) -> Result<()> + Send + Sync,
{
    FnPlugin {
        name: name.into(),
        register,
        config: None,
    }
}
