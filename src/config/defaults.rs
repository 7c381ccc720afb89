//! The built-in base config every resolution ends with.

use serde_json::json;

use super::value::{ConfigMap, ConfigValue};
use super::ConfigFragment;

/// Core plugins in emission order.
pub const CORE_PLUGINS: &[&str] = &[
    "preflight",
    "container",
    "accessibility",
    "position",
    "inset",
    "zIndex",
    "margin",
    "display",
    "height",
    "width",
    "maxWidth",
    "gap",
    "borderRadius",
    "borderWidth",
    "borderStyle",
    "borderColor",
    "backgroundColor",
    "padding",
    "textAlign",
    "fontSize",
    "fontWeight",
    "lineHeight",
    "textColor",
    "opacity",
    "content",
];

/// Variant names in the order `extend`ed variant lists are sorted by.
pub const VARIANT_ORDER: &[&str] = &[
    "first",
    "last",
    "odd",
    "even",
    "visited",
    "checked",
    "empty",
    "read-only",
    "group-hover",
    "group-focus",
    "focus-within",
    "hover",
    "focus",
    "focus-visible",
    "active",
    "disabled",
    "dark",
];

const PALETTE_STEPS: [&str; 11] = [
    "50", "100", "200", "300", "400", "500", "600", "700", "800", "900", "950",
];

const PALETTE: &[(&str, [&str; 11])] = &[
    (
        "gray",
        [
            "#f9fafb", "#f3f4f6", "#e5e7eb", "#d1d5db", "#9ca3af", "#6b7280", "#4b5563",
            "#374151", "#1f2937", "#111827", "#030712",
        ],
    ),
    (
        "red",
        [
            "#fef2f2", "#fee2e2", "#fecaca", "#fca5a5", "#f87171", "#ef4444", "#dc2626",
            "#b91c1c", "#991b1b", "#7f1d1d", "#450a0a",
        ],
    ),
    (
        "yellow",
        [
            "#fefce8", "#fef9c3", "#fef08a", "#fde047", "#facc15", "#eab308", "#ca8a04",
            "#a16207", "#854d0e", "#713f12", "#422006",
        ],
    ),
    (
        "green",
        [
            "#f0fdf4", "#dcfce7", "#bbf7d0", "#86efac", "#4ade80", "#22c55e", "#16a34a",
            "#15803d", "#166534", "#14532d", "#052e16",
        ],
    ),
    (
        "blue",
        [
            "#eff6ff", "#dbeafe", "#bfdbfe", "#93c5fd", "#60a5fa", "#3b82f6", "#2563eb",
            "#1d4ed8", "#1e40af", "#1e3a8a", "#172554",
        ],
    ),
    (
        "indigo",
        [
            "#eef2ff", "#e0e7ff", "#c7d2fe", "#a5b4fc", "#818cf8", "#6366f1", "#4f46e5",
            "#4338ca", "#3730a3", "#312e81", "#1e1b4b",
        ],
    ),
];

/// The built-in colour palette (`colors` in `ThemeUtils`).
pub fn colors() -> ConfigValue {
    let mut map = ConfigMap::new();
    for (name, value) in [
        ("inherit", "inherit"),
        ("current", "currentColor"),
        ("transparent", "transparent"),
        ("black", "#000"),
        ("white", "#fff"),
    ] {
        map.insert(name.to_string(), ConfigValue::from(value));
    }
    for (family, shades) in PALETTE {
        let scale: ConfigValue = PALETTE_STEPS
            .iter()
            .zip(shades.iter())
            .map(|(step, hex)| (step.to_string(), ConfigValue::from(*hex)))
            .collect();
        map.insert(family.to_string(), scale);
    }
    ConfigValue::Object(map)
}

fn spacing() -> ConfigValue {
    let mut map = ConfigMap::new();
    map.insert("px".into(), ConfigValue::from("1px"));
    map.insert("0".into(), ConfigValue::from("0px"));
    for step in [
        0.5, 1.0, 1.5, 2.0, 2.5, 3.0, 3.5, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0, 11.0, 12.0, 14.0,
        16.0, 20.0, 24.0, 28.0, 32.0, 36.0, 40.0, 44.0, 48.0, 52.0, 56.0, 60.0, 64.0, 72.0, 80.0,
        96.0,
    ] {
        let rem = super::format_number(step / 4.0);
        map.insert(super::format_number(step), ConfigValue::from(format!("{rem}rem")));
    }
    ConfigValue::Object(map)
}

/// `{...theme(section), ...extra}` as a lazy theme value.
fn section_with(section: &'static str, extra: serde_json::Value) -> ConfigValue {
    let extra = ConfigValue::from(extra);
    ConfigValue::function(move |theme, _| {
        let mut merged = theme
            .resolve_or(section, ConfigValue::object())?
            .as_object()
            .cloned()
            .unwrap_or_default();
        if let Some(extra) = extra.as_object() {
            for (key, value) in extra {
                merged.insert(key.clone(), value.clone());
            }
        }
        Ok(ConfigValue::Object(merged))
    })
}

fn extra_then_section(extra: serde_json::Value, section: &'static str) -> ConfigValue {
    let extra = ConfigValue::from(extra);
    ConfigValue::function(move |theme, _| {
        let mut merged = extra.as_object().cloned().unwrap_or_default();
        if let Some(scale) = theme.resolve(section)? {
            if let Some(scale) = scale.as_object() {
                merged.extend(scale.clone());
            }
        }
        Ok(ConfigValue::Object(merged))
    })
}

fn alias(section: &'static str) -> ConfigValue {
    ConfigValue::function(move |theme, _| theme.resolve_or(section, ConfigValue::object()))
}

fn theme() -> ConfigMap {
    let mut theme = ConfigValue::from(json!({
        "screens": {
            "sm": "640px",
            "md": "768px",
            "lg": "1024px",
            "xl": "1280px",
            "2xl": "1536px"
        },
        "opacity": {
            "0": "0", "5": "0.05", "10": "0.1", "20": "0.2", "25": "0.25", "30": "0.3",
            "40": "0.4", "50": "0.5", "60": "0.6", "70": "0.7", "75": "0.75", "80": "0.8",
            "90": "0.9", "95": "0.95", "100": "1"
        },
        "borderRadius": {
            "none": "0px", "sm": "0.125rem", "DEFAULT": "0.25rem", "md": "0.375rem",
            "lg": "0.5rem", "xl": "0.75rem", "2xl": "1rem", "3xl": "1.5rem", "full": "9999px"
        },
        "borderWidth": {"DEFAULT": "1px", "0": "0px", "2": "2px", "4": "4px", "8": "8px"},
        "fontSize": {
            "xs": ["0.75rem", {"lineHeight": "1rem"}],
            "sm": ["0.875rem", {"lineHeight": "1.25rem"}],
            "base": ["1rem", {"lineHeight": "1.5rem"}],
            "lg": ["1.125rem", {"lineHeight": "1.75rem"}],
            "xl": ["1.25rem", {"lineHeight": "1.75rem"}],
            "2xl": ["1.5rem", {"lineHeight": "2rem"}],
            "3xl": ["1.875rem", {"lineHeight": "2.25rem"}],
            "4xl": ["2.25rem", {"lineHeight": "2.5rem"}]
        },
        "fontWeight": {
            "thin": "100", "extralight": "200", "light": "300", "normal": "400",
            "medium": "500", "semibold": "600", "bold": "700", "extrabold": "800", "black": "900"
        },
        "lineHeight": {
            "none": "1", "tight": "1.25", "snug": "1.375", "normal": "1.5",
            "relaxed": "1.625", "loose": "2", "3": ".75rem", "4": "1rem", "5": "1.25rem",
            "6": "1.5rem", "7": "1.75rem", "8": "2rem", "9": "2.25rem", "10": "2.5rem"
        },
        "zIndex": {"auto": "auto", "0": "0", "10": "10", "20": "20", "30": "30", "40": "40", "50": "50"},
        "content": {"none": "none"}
    }))
    .as_object()
    .cloned()
    .unwrap_or_default();

    theme.insert("colors".into(), colors());
    theme.insert("spacing".into(), spacing());
    theme.insert(
        "container".into(),
        ConfigValue::from(json!({"center": false})),
    );
    theme.insert("margin".into(), extra_then_section(json!({"auto": "auto"}), "spacing"));
    theme.insert("padding".into(), alias("spacing"));
    theme.insert("gap".into(), alias("spacing"));
    theme.insert(
        "inset".into(),
        extra_then_section(json!({"auto": "auto"}), "spacing"),
    );
    theme.insert(
        "width".into(),
        section_with(
            "spacing",
            json!({
                "auto": "auto", "1/2": "50%", "1/3": "33.333333%", "2/3": "66.666667%",
                "1/4": "25%", "2/4": "50%", "3/4": "75%", "full": "100%", "screen": "100vw",
                "min": "min-content", "max": "max-content", "fit": "fit-content"
            }),
        ),
    );
    theme.insert(
        "height".into(),
        section_with(
            "spacing",
            json!({
                "auto": "auto", "1/2": "50%", "1/3": "33.333333%", "2/3": "66.666667%",
                "full": "100%", "screen": "100vh",
                "min": "min-content", "max": "max-content", "fit": "fit-content"
            }),
        ),
    );
    theme.insert(
        "maxWidth".into(),
        ConfigValue::function(|theme, utils| {
            let mut map = ConfigValue::from(json!({
                "none": "none", "xs": "20rem", "sm": "24rem", "md": "28rem", "lg": "32rem",
                "xl": "36rem", "2xl": "42rem", "full": "100%", "prose": "65ch"
            }))
            .as_object()
            .cloned()
            .unwrap_or_default();
            let screens = theme.resolve_or("screens", ConfigValue::object())?;
            if let Some(breakpoints) = utils.breakpoints(&screens).as_object() {
                map.extend(breakpoints.clone());
            }
            Ok(ConfigValue::Object(map))
        }),
    );
    theme.insert(
        "borderColor".into(),
        ConfigValue::function(|theme, _| {
            let mut map = ConfigMap::new();
            map.insert(
                "DEFAULT".into(),
                theme.resolve_or("colors.gray.200", ConfigValue::from("currentColor"))?,
            );
            if let Some(colors) = theme.resolve("colors")? {
                if let Some(colors) = colors.as_object() {
                    map.extend(colors.clone());
                }
            }
            Ok(ConfigValue::Object(map))
        }),
    );
    theme.insert("backgroundColor".into(), alias("colors"));
    theme.insert("textColor".into(), alias("colors"));
    theme.insert("backgroundOpacity".into(), alias("opacity"));
    theme.insert("textOpacity".into(), alias("opacity"));
    theme.insert("borderOpacity".into(), alias("opacity"));
    theme
}

/// The base fragment appended after every user fragment.
pub fn base_config() -> ConfigFragment {
    ConfigFragment::new().set("theme", ConfigValue::Object(theme()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spacing_scale_keys() {
        let spacing = spacing();
        assert_eq!(spacing.get("4"), Some(&ConfigValue::from("1rem")));
        assert_eq!(spacing.get("0.5"), Some(&ConfigValue::from("0.125rem")));
        assert_eq!(spacing.get("px"), Some(&ConfigValue::from("1px")));
    }

    #[test]
    fn test_palette_shape() {
        let colors = colors();
        assert_eq!(
            colors.get("red").and_then(|red| red.get("500")),
            Some(&ConfigValue::from("#ef4444"))
        );
        assert_eq!(colors.get("current"), Some(&ConfigValue::from("currentColor")));
    }
}
