//! Core variant plugins, in sort order.

use std::cmp::Ordering;
use std::sync::Arc;

use log::warn;

use crate::ast::selector::escape_class_name;
use crate::config::{screen_query, ConfigMap, ConfigValue, DarkMode};
use crate::error::Result;
use crate::plugin::data_types::numeric_prefix_len;
use crate::plugin::{variant, PluginApi, VariantCompare, VariantOptions};

use super::CorePlugin;

pub(super) const PLUGINS: &[CorePlugin] = &[
    CorePlugin::new("pseudoElementVariants", pseudo_element_variants),
    CorePlugin::new("pseudoClassVariants", pseudo_class_variants),
    CorePlugin::new("ariaVariants", aria_variants),
    CorePlugin::new("dataVariants", data_variants),
    CorePlugin::new("supportsVariants", supports_variants),
    CorePlugin::new("reducedMotionVariants", reduced_motion_variants),
    CorePlugin::new("darkVariants", dark_variants),
    CorePlugin::new("printVariant", print_variant),
    CorePlugin::new("screenVariants", screen_variants),
    CorePlugin::new("orientationVariants", orientation_variants),
];

const PSEUDO_ELEMENTS: &[(&str, &[&str])] = &[
    ("first-letter", &["&::first-letter"]),
    ("first-line", &["&::first-line"]),
    ("marker", &["& *::marker", "&::marker"]),
    ("selection", &["& *::selection", "&::selection"]),
    ("file", &["&::file-selector-button"]),
    ("placeholder", &["&::placeholder"]),
    ("backdrop", &["&::backdrop"]),
    ("before", &["&::before"]),
    ("after", &["&::after"]),
];

/// Pseudo-class variants and the selector each stands for. `group-*` and
/// `peer-*` take their values from the same table.
const PSEUDO_CLASSES: &[(&str, &str)] = &[
    ("first", "&:first-child"),
    ("last", "&:last-child"),
    ("only", "&:only-child"),
    ("odd", "&:nth-child(odd)"),
    ("even", "&:nth-child(even)"),
    ("first-of-type", "&:first-of-type"),
    ("last-of-type", "&:last-of-type"),
    ("only-of-type", "&:only-of-type"),
    ("visited", "&:visited"),
    ("target", "&:target"),
    ("open", "&[open]"),
    ("default", "&:default"),
    ("checked", "&:checked"),
    ("indeterminate", "&:indeterminate"),
    ("placeholder-shown", "&:placeholder-shown"),
    ("autofill", "&:autofill"),
    ("optional", "&:optional"),
    ("required", "&:required"),
    ("valid", "&:valid"),
    ("invalid", "&:invalid"),
    ("in-range", "&:in-range"),
    ("out-of-range", "&:out-of-range"),
    ("read-only", "&:read-only"),
    ("empty", "&:empty"),
    ("focus-within", "&:focus-within"),
    ("hover", "&:hover"),
    ("focus", "&:focus"),
    ("focus-visible", "&:focus-visible"),
    ("active", "&:active"),
    ("enabled", "&:enabled"),
    ("disabled", "&:disabled"),
];

const ARIA_STATES: &[(&str, &str)] = &[
    ("busy", "busy=\"true\""),
    ("checked", "checked=\"true\""),
    ("disabled", "disabled=\"true\""),
    ("expanded", "expanded=\"true\""),
    ("hidden", "hidden=\"true\""),
    ("pressed", "pressed=\"true\""),
    ("readonly", "readonly=\"true\""),
    ("required", "required=\"true\""),
    ("selected", "selected=\"true\""),
];

fn table(entries: &[(&str, &str)]) -> ConfigMap {
    entries
        .iter()
        .map(|(key, value)| (key.to_string(), ConfigValue::from(*value)))
        .collect()
}

/// Theme section entries that are plain strings.
fn string_entries(api: &dyn PluginApi, section: &str) -> ConfigMap {
    api.theme(section)
        .and_then(|value| value.as_object().cloned())
        .unwrap_or_default()
        .into_iter()
        .filter(|(_, value)| value.as_str().is_some())
        .collect()
}

fn pseudo_element_variants(api: &mut dyn PluginApi) -> Result<()> {
    for (name, formats) in PSEUDO_ELEMENTS {
        api.add_variant(name, formats)?;
    }
    Ok(())
}

fn pseudo_class_variants(api: &mut dyn PluginApi) -> Result<()> {
    for (name, combinator) in [("group", " &"), ("peer", " ~ &")] {
        let class = api.prefix(&format!(".{name}"));
        let generator = variant(move |value: &str, modifier: Option<&str>| {
            let value = if value.contains('&') {
                value.to_string()
            } else {
                format!("&{value}")
            };
            let marker = match modifier {
                Some(label) => format!("{class}\\/{}", escape_class_name(label)),
                None => class.clone(),
            };
            Some(vec![format!("{}{combinator}", value.replace('&', &marker))])
        });
        api.match_variant(name, generator, VariantOptions::with_values(table(PSEUDO_CLASSES)))?;
    }

    for &(name, format) in PSEUDO_CLASSES {
        api.add_variant(name, &[format])?;
    }
    Ok(())
}

fn aria_variants(api: &mut dyn PluginApi) -> Result<()> {
    let mut values = table(ARIA_STATES);
    values.extend(string_entries(api, "aria"));
    api.match_variant(
        "aria",
        variant(|value: &str, _| Some(vec![format!("&[aria-{value}]")])),
        VariantOptions::with_values(values),
    )
}

fn data_variants(api: &mut dyn PluginApi) -> Result<()> {
    let values = string_entries(api, "data");
    api.match_variant(
        "data",
        variant(|value: &str, _| Some(vec![format!("&[data-{value}]")])),
        VariantOptions::with_values(values),
    )
}

/// `supports-[display:grid]` checks the declaration; a bare property
/// (`supports-[backdrop-filter]`) checks that the property exists.
fn supports_variants(api: &mut dyn PluginApi) -> Result<()> {
    let values = string_entries(api, "supports");
    api.match_variant(
        "supports",
        variant(|value: &str, _| {
            let condition = if value.starts_with('(') || value.starts_with("not ") {
                value.to_string()
            } else if value.contains(':') {
                format!("({value})")
            } else {
                format!("({value}: var(--tw))")
            };
            Some(vec![format!("@supports {condition}")])
        }),
        VariantOptions::with_values(values),
    )
}

fn reduced_motion_variants(api: &mut dyn PluginApi) -> Result<()> {
    api.add_variant("motion-safe", &["@media (prefers-reduced-motion: no-preference)"])?;
    api.add_variant("motion-reduce", &["@media (prefers-reduced-motion: reduce)"])
}

fn dark_variants(api: &mut dyn PluginApi) -> Result<()> {
    match api.config().dark_mode.clone() {
        DarkMode::Media => api.add_variant("dark", &["@media (prefers-color-scheme: dark)"]),
        DarkMode::Class(selector) => {
            let format = format!("{} &", api.prefix(&selector));
            api.add_variant("dark", &[format.as_str()])
        }
    }
}

fn print_variant(api: &mut dyn PluginApi) -> Result<()> {
    api.add_variant("print", &["@media print"])
}

/// Compare two CSS lengths by their numeric part. Values that do not start
/// with a number sort after those that do.
fn compare_lengths(a: &str, b: &str) -> Ordering {
    let number = |value: &str| {
        numeric_prefix_len(value).and_then(|len| value[..len].parse::<f64>().ok())
    };
    match (number(a), number(b)) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn screen_variants(api: &mut dyn PluginApi) -> Result<()> {
    let screens = api.theme("screens").unwrap_or_default();
    let screens = screens.as_object().cloned().unwrap_or_default();

    for (name, screen) in &screens {
        match screen_query(screen) {
            Some(query) => api.add_variant(name, &[format!("@media {query}").as_str()])?,
            None => warn!("screen `{name}` has no usable width and was skipped"),
        }
    }

    // `min-*`/`max-*` take the simple `screens` widths as named values.
    let widths: ConfigMap = screens
        .into_iter()
        .filter(|(_, screen)| screen.as_str().is_some())
        .collect();

    let ascending: VariantCompare = Arc::new(compare_lengths);
    api.match_variant(
        "min",
        variant(|value: &str, _| Some(vec![format!("@media (min-width: {value})")])),
        VariantOptions::with_values(widths.clone()).sort(ascending),
    )?;

    let mut descending = widths;
    descending.reverse();
    let reversed: VariantCompare = Arc::new(|a: &str, b: &str| compare_lengths(b, a));
    api.match_variant(
        "max",
        variant(|value: &str, _| Some(vec![format!("@media not all and (min-width: {value})")])),
        VariantOptions::with_values(descending).sort(reversed),
    )
}

fn orientation_variants(api: &mut dyn PluginApi) -> Result<()> {
    api.add_variant("portrait", &["@media (orientation: portrait)"])?;
    api.add_variant("landscape", &["@media (orientation: landscape)"])
}
