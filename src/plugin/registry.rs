//! The plugin registry: everything plugins registered, indexed for
//! candidate lookup.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use log::{debug, trace};

use crate::ast::css::CssNode;
use crate::ast::selector::{self, escape_class_name};
use crate::config::{ConfigValue, ResolvedConfig};
use crate::error::{Result, TailorError};
use crate::stylesheet::Layer;

use super::core;
use super::css_in_js::{lower_sheet, split_at_rule, utility_classes};
use super::{Plugin, PluginApi, UtilityFn, UtilityOptions, VariantFn, VariantOptions};

/// Bit reserved for arbitrary `[...]` variants, which sort after every
/// registered variant.
pub(crate) const ARBITRARY_VARIANT_INDEX: u32 = 127;

pub enum UtilityKind {
    /// A rule registered by `add_utilities`/`add_components`, keyed by one
    /// of its classes (unescaped).
    Static { class: String, node: CssNode },
    Functional {
        generator: UtilityFn,
        options: Arc<UtilityOptions>,
        /// This is the `-name` twin; the resolved value is negated.
        negate: bool,
    },
}

pub struct RegisteredUtility {
    pub layer: Layer,
    pub order: usize,
    /// The `variants` config group.
    pub group: String,
    pub respect_prefix: bool,
    pub respect_important: bool,
    pub kind: UtilityKind,
}

impl fmt::Debug for RegisteredUtility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.kind {
            UtilityKind::Static { class, .. } => format!("static .{class}"),
            UtilityKind::Functional { negate, .. } => {
                format!("functional{}", if *negate { " (negative)" } else { "" })
            }
        };
        f.debug_struct("RegisteredUtility")
            .field("layer", &self.layer)
            .field("order", &self.order)
            .field("group", &self.group)
            .field("kind", &kind)
            .finish()
    }
}

/// A parsed variant format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VariantFormat {
    /// A selector containing `&`.
    Selector(String),
    /// An at-rule wrapping the rule, optionally with a selector format
    /// applied inside it (`@media print { &:hover }`).
    Wrap {
        name: String,
        params: String,
        inner: Option<Box<VariantFormat>>,
    },
}

impl VariantFormat {
    pub fn parse(format: &str) -> Option<Self> {
        let format = format.trim();
        if let Some(rest) = format.strip_prefix('@') {
            let (head, inner) = match rest.find('{') {
                Some(open) => {
                    let body = rest[open + 1..].trim_end().strip_suffix('}')?;
                    (&rest[..open], Some(Box::new(VariantFormat::parse(body)?)))
                }
                None => (rest, None),
            };
            let (name, params) = split_at_rule(head);
            if name.is_empty() {
                return None;
            }
            return Some(VariantFormat::Wrap {
                name: name.to_string(),
                params: params.to_string(),
                inner,
            });
        }
        format
            .contains('&')
            .then(|| VariantFormat::Selector(format.to_string()))
    }
}

pub enum VariantDef {
    Static(Vec<VariantFormat>),
    Functional {
        generator: VariantFn,
        options: VariantOptions,
    },
}

pub struct RegisteredVariant {
    pub name: String,
    /// Bit position in the sort key's variant mask.
    pub index: u32,
    pub def: VariantDef,
}

impl fmt::Debug for RegisteredVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let def = match &self.def {
            VariantDef::Static(formats) => format!("{formats:?}"),
            VariantDef::Functional { options, .. } => format!("functional {options:?}"),
        };
        f.debug_struct("RegisteredVariant")
            .field("name", &self.name)
            .field("index", &self.index)
            .field("def", &def)
            .finish()
    }
}

/// Every registered utility, component, base style and variant.
///
/// Built once per resolved config by [`Registry::build`]: core variants
/// first, then the enabled core plugins in their fixed order, then user
/// plugins in config order. Registration order is sort order.
pub struct Registry {
    config: Arc<ResolvedConfig>,
    base: Vec<CssNode>,
    utilities: HashMap<String, Vec<RegisteredUtility>>,
    variants: IndexMap<String, RegisteredVariant>,
    screens: Vec<String>,
    current: String,
    next_order: usize,
}

impl Registry {
    /// An empty registry. Most callers want [`Registry::build`].
    pub fn new(config: Arc<ResolvedConfig>) -> Self {
        let screens = config
            .theme
            .section("screens")
            .and_then(ConfigValue::as_object)
            .map(|screens| screens.keys().cloned().collect())
            .unwrap_or_default();
        Self {
            config,
            base: Vec::new(),
            utilities: HashMap::new(),
            variants: IndexMap::new(),
            screens,
            current: String::new(),
            next_order: 0,
        }
    }

    /// Register core variants, enabled core plugins and user plugins.
    pub fn build(config: Arc<ResolvedConfig>) -> Result<Self> {
        let mut registry = Self::new(Arc::clone(&config));

        for plugin in core::variant_plugins() {
            registry.load(&plugin)?;
        }
        for name in &config.core_plugins {
            match core::utility_plugin(name) {
                Some(plugin) => registry.load(&plugin)?,
                None => trace!("core plugin `{name}` has no implementation"),
            }
        }
        for plugin in &config.plugins {
            registry.load(plugin.as_ref())?;
        }

        debug!(
            "registry: {} utility key(s), {} variant(s), {} base rule(s)",
            registry.utilities.len(),
            registry.variants.len(),
            registry.base.len()
        );
        Ok(registry)
    }

    /// Run one plugin's registration.
    pub fn load(&mut self, plugin: &dyn Plugin) -> Result<()> {
        trace!("loading plugin `{}`", plugin.name());
        self.current = plugin.name().to_string();
        plugin.register(self)
    }

    pub fn resolved_config(&self) -> &ResolvedConfig {
        &self.config
    }

    pub fn base(&self) -> &[CssNode] {
        &self.base
    }

    /// Utilities registered under `key` (`w`, `-m`, `sr-only`).
    pub fn utilities(&self, key: &str) -> &[RegisteredUtility] {
        self.utilities.get(key).map(Vec::as_slice).unwrap_or_default()
    }

    /// Every utility key, sorted.
    pub fn utility_keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.utilities.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    pub fn variant(&self, name: &str) -> Option<&RegisteredVariant> {
        self.variants.get(name)
    }

    /// Variant names in registration order.
    pub fn variant_names(&self) -> impl Iterator<Item = &str> {
        self.variants.keys().map(String::as_str)
    }

    /// Whether `name` is a variant generated from `theme.screens`.
    pub fn is_screen(&self, name: &str) -> bool {
        self.screens.iter().any(|screen| screen == name)
    }

    fn next_order(&mut self) -> usize {
        let order = self.next_order;
        self.next_order += 1;
        order
    }

    fn push_utility(&mut self, key: String, utility: RegisteredUtility) {
        self.utilities.entry(key).or_default().push(utility);
    }

    fn add_static(&mut self, styles: &ConfigValue, layer: Layer) -> Result<()> {
        utility_classes(styles)?;
        let respect_important = layer == Layer::Utilities;

        for node in lower_sheet(styles)? {
            let order = self.next_order();
            for class in node_classes(&node) {
                trace!("registered .{class} ({layer:?})");
                self.push_utility(
                    class.clone(),
                    RegisteredUtility {
                        layer,
                        order,
                        group: self.current.clone(),
                        respect_prefix: true,
                        respect_important,
                        kind: UtilityKind::Static {
                            class,
                            node: node.clone(),
                        },
                    },
                );
            }
        }
        Ok(())
    }

    fn insert_variant(&mut self, name: &str, def: VariantDef) -> Result<()> {
        validate_name(name, "variant")?;
        if let Some(existing) = self.variants.get_mut(name) {
            existing.def = def;
            return Ok(());
        }
        let index = self.variants.len() as u32;
        if index >= ARBITRARY_VARIANT_INDEX {
            return Err(TailorError::registration(format!(
                "cannot register variant `{name}`: at most {ARBITRARY_VARIANT_INDEX} variants are supported"
            )));
        }
        self.variants.insert(
            name.to_string(),
            RegisteredVariant {
                name: name.to_string(),
                index,
                def,
            },
        );
        Ok(())
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("base", &self.base.len())
            .field("utilities", &self.utilities.len())
            .field("variants", &self.variants.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl PluginApi for Registry {
    fn add_base(&mut self, styles: &ConfigValue) -> Result<()> {
        let nodes = lower_sheet(styles)?;
        self.base.extend(nodes);
        Ok(())
    }

    fn add_components(&mut self, styles: &ConfigValue) -> Result<()> {
        self.add_static(styles, Layer::Components)
    }

    fn add_utilities(&mut self, styles: &ConfigValue) -> Result<()> {
        self.add_static(styles, Layer::Utilities)
    }

    fn match_utilities(
        &mut self,
        utilities: Vec<(String, UtilityFn)>,
        options: UtilityOptions,
    ) -> Result<()> {
        let group = options.group.clone().unwrap_or_else(|| self.current.clone());
        let options = Arc::new(options);

        for (name, generator) in utilities {
            validate_name(&name, "utility")?;
            let order = self.next_order();
            let entry = |negate| RegisteredUtility {
                layer: Layer::Utilities,
                order,
                group: group.clone(),
                respect_prefix: options.respect_prefix,
                respect_important: options.respect_important,
                kind: UtilityKind::Functional {
                    generator: Arc::clone(&generator),
                    options: Arc::clone(&options),
                    negate,
                },
            };
            if options.supports_negative_values {
                self.push_utility(format!("-{name}"), entry(true));
            }
            self.push_utility(name, entry(false));
        }
        Ok(())
    }

    fn add_variant(&mut self, name: &str, formats: &[&str]) -> Result<()> {
        let mut parsed = Vec::with_capacity(formats.len());
        for format in formats {
            let Some(format) = VariantFormat::parse(format) else {
                return Err(TailorError::UtilityRegistration {
                    message: format!("invalid format `{format}` for variant `{name}`"),
                    help: Some("Formats must contain `&` or start with `@`".into()),
                });
            };
            parsed.push(format);
        }
        if parsed.is_empty() {
            return Err(TailorError::registration(format!(
                "variant `{name}` needs at least one format"
            )));
        }
        self.insert_variant(name, VariantDef::Static(parsed))
    }

    fn match_variant(
        &mut self,
        name: &str,
        generator: VariantFn,
        options: VariantOptions,
    ) -> Result<()> {
        self.insert_variant(name, VariantDef::Functional { generator, options })
    }

    fn theme(&self, path: &str) -> Option<ConfigValue> {
        self.config.theme.get(path)
    }

    fn config(&self) -> &ResolvedConfig {
        &self.config
    }

    fn prefix(&self, selector: &str) -> String {
        if self.config.prefix.is_empty() {
            return selector.to_string();
        }
        let mut nodes = selector::parse(selector);
        for class in selector::classes(&nodes, true) {
            let prefixed = escape_class_name(&format!("{}{class}", self.config.prefix));
            selector::rename_class(&mut nodes, &class, &prefixed);
        }
        selector::to_css(&nodes)
    }
}

/// Utility and variant names: lowercase ASCII letters, digits and inner
/// dashes (`inset-x`, `2xl`, `group-hover`).
fn validate_name(name: &str, what: &str) -> Result<()> {
    let valid = !name.is_empty()
        && !name.starts_with('-')
        && !name.ends_with('-')
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    if valid {
        Ok(())
    } else {
        Err(TailorError::UtilityRegistration {
            message: format!("invalid {what} name `{name}`"),
            help: Some("Names may only contain lowercase letters, digits and dashes".into()),
        })
    }
}

/// Classes (unescaped) appearing in any rule selector of `node`.
fn node_classes(node: &CssNode) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    let mut node = node.clone();
    node.for_each_rule_mut(&mut |rule| {
        for class in selector::classes(&selector::parse(&rule.selector), false) {
            if !out.contains(&class) {
                out.push(class);
            }
        }
    });
    out
}

/// Rename the registered class to the candidate's class in every rule.
pub(crate) fn rename_in_node(node: &mut CssNode, from: &str, to: &str) {
    node.for_each_rule_mut(&mut |rule| {
        let mut nodes = selector::parse(&rule.selector);
        selector::rename_class(&mut nodes, from, to);
        rule.selector = selector::to_css(&nodes);
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{resolve_config, ConfigFragment};
    use crate::plugin::{from_fn, utility};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn empty_registry(fragment: ConfigFragment) -> Registry {
        let config = resolve_config(&[fragment]).unwrap();
        Registry::new(Arc::new(config))
    }

    #[test]
    fn test_variant_format_parse() {
        assert_eq!(
            VariantFormat::parse("&:hover"),
            Some(VariantFormat::Selector("&:hover".into()))
        );
        assert_eq!(
            VariantFormat::parse("@media (min-width: 640px)"),
            Some(VariantFormat::Wrap {
                name: "media".into(),
                params: "(min-width: 640px)".into(),
                inner: None,
            })
        );
        assert_eq!(
            VariantFormat::parse("@media print { &:hover }"),
            Some(VariantFormat::Wrap {
                name: "media".into(),
                params: "print".into(),
                inner: Some(Box::new(VariantFormat::Selector("&:hover".into()))),
            })
        );
        assert_eq!(VariantFormat::parse(".foo"), None);
    }

    #[test]
    fn test_static_utilities_are_keyed_by_class() {
        let mut registry = empty_registry(ConfigFragment::new());
        registry
            .add_utilities(
                &json!({
                    ".skew-1": {"transform": "skewX(1deg)"},
                    ".skew-2:hover": {"transform": "skewX(2deg)"}
                })
                .into(),
            )
            .unwrap();
        assert_eq!(registry.utilities("skew-1").len(), 1);
        assert_eq!(registry.utilities("skew-2").len(), 1);
        assert!(registry.utilities("skew-1")[0].order < registry.utilities("skew-2")[0].order);
    }

    #[test]
    fn test_invalid_registrations() {
        let mut registry = empty_registry(ConfigFragment::new());
        assert!(registry
            .add_utilities(&json!({"div": {"color": "red"}}).into())
            .is_err());
        assert!(registry.add_variant("hover", &[".hover"]).is_err());
        assert!(registry.add_variant("Hover", &["&:hover"]).is_err());
        let generator = utility(|_| None);
        assert!(registry
            .match_utilities(vec![("w_".into(), generator)], UtilityOptions::default())
            .is_err());
    }

    #[test]
    fn test_negative_twin() {
        let mut registry = empty_registry(ConfigFragment::new());
        registry
            .match_utilities(
                vec![("m".into(), utility(|_| None))],
                UtilityOptions::default().negative(),
            )
            .unwrap();
        assert!(matches!(
            registry.utilities("-m")[0].kind,
            UtilityKind::Functional { negate: true, .. }
        ));
        assert!(matches!(
            registry.utilities("m")[0].kind,
            UtilityKind::Functional { negate: false, .. }
        ));
    }

    #[test]
    fn test_variant_indices_follow_registration() {
        let mut registry = empty_registry(ConfigFragment::new());
        registry.add_variant("hover", &["&:hover"]).unwrap();
        registry.add_variant("print", &["@media print"]).unwrap();
        registry.add_variant("hover", &["&:hover", "&.is-hovered"]).unwrap();
        assert_eq!(registry.variant("hover").unwrap().index, 0);
        assert_eq!(registry.variant("print").unwrap().index, 1);
        assert_eq!(
            registry.variant_names().collect::<Vec<_>>(),
            vec!["hover", "print"]
        );
    }

    #[test]
    fn test_prefix_selector() {
        let registry = empty_registry(
            ConfigFragment::from_json(json!({"prefix": "tw-"})).unwrap(),
        );
        assert_eq!(registry.prefix(".group:hover &"), ".tw-group:hover &");
    }

    #[test]
    fn test_plugins_load_in_order() {
        let plugin = from_fn("skew", |api: &mut dyn PluginApi| {
            api.add_utilities(&json!({".skew-1": {"transform": "skewX(1deg)"}}).into())
        });
        let config = resolve_config(&[ConfigFragment::new().with_plugin(Arc::new(plugin))])
            .unwrap();
        let registry = Registry::build(Arc::new(config)).unwrap();
        let skew = &registry.utilities("skew-1")[0];
        assert_eq!(skew.group, "skew");
        assert!(registry.utilities("p")[0].order < skew.order);
        assert!(registry.variant("hover").is_some());
        assert!(registry.is_screen("md"));
    }
}
