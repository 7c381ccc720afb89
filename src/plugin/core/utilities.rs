//! Core utility plugins.

use std::sync::Arc;

use serde_json::json;

use crate::config::{ConfigMap, ConfigValue};
use crate::error::Result;
use crate::plugin::color::Color;
use crate::plugin::{utility, DataType, Modifiers, PluginApi, UtilityInput, UtilityOptions};

use super::CorePlugin;

/// Every core utility plugin, keyed by its `corePlugins` name.
pub(super) const PLUGINS: &[CorePlugin] = &[
    CorePlugin::new("preflight", preflight),
    CorePlugin::new("container", container),
    CorePlugin::new("accessibility", accessibility),
    CorePlugin::new("position", position),
    CorePlugin::new("inset", inset),
    CorePlugin::new("zIndex", z_index),
    CorePlugin::new("margin", margin),
    CorePlugin::new("display", display),
    CorePlugin::new("height", height),
    CorePlugin::new("width", width),
    CorePlugin::new("maxWidth", max_width),
    CorePlugin::new("gap", gap),
    CorePlugin::new("borderRadius", border_radius),
    CorePlugin::new("borderWidth", border_width),
    CorePlugin::new("borderStyle", border_style),
    CorePlugin::new("borderColor", border_color),
    CorePlugin::new("backgroundColor", background_color),
    CorePlugin::new("padding", padding),
    CorePlugin::new("textAlign", text_align),
    CorePlugin::new("fontSize", font_size),
    CorePlugin::new("fontWeight", font_weight),
    CorePlugin::new("lineHeight", line_height),
    CorePlugin::new("textColor", text_color),
    CorePlugin::new("opacity", opacity),
    CorePlugin::new("content", content),
];

/// A utility name and the properties its value is written to.
type Properties = (&'static str, &'static [&'static str]);

const SPACING_TYPES: &[DataType] = &[DataType::Length, DataType::Percentage, DataType::Any];
const COLOR_TYPES: &[DataType] = &[DataType::Color, DataType::Any];

/// A theme section flattened into utility values.
fn theme_values(api: &dyn PluginApi, section: &str) -> ConfigMap {
    api.theme(section).map(|value| value.flatten()).unwrap_or_default()
}

fn declarations(properties: &[&str], value: &str) -> ConfigValue {
    properties
        .iter()
        .map(|property| (property.to_string(), ConfigValue::from(value)))
        .collect()
}

/// One functional utility per entry, writing the resolved value to each of
/// the entry's properties.
fn property_utilities(
    api: &mut dyn PluginApi,
    entries: &[Properties],
    options: UtilityOptions,
) -> Result<()> {
    let utilities = entries
        .iter()
        .map(|&(name, properties)| {
            let generator = utility(move |input: &UtilityInput<'_>| {
                Some(declarations(properties, &input.css()?))
            });
            (name.to_string(), generator)
        })
        .collect();
    api.match_utilities(utilities, options)
}

/// The colour, with the modifier applied as its alpha. Colours that do not
/// parse cannot take a modifier.
fn color_value(input: &UtilityInput<'_>) -> Option<String> {
    let value = input.css()?;
    match input.modifier {
        None => Some(value),
        Some(alpha) => Some(Color::parse(&value)?.with_alpha(alpha).to_string()),
    }
}

fn color_utilities(
    api: &mut dyn PluginApi,
    entries: &[Properties],
    mut values: ConfigMap,
    opacity_section: &str,
) -> Result<()> {
    values.shift_remove("DEFAULT");
    let options = UtilityOptions::with_values(values)
        .types(COLOR_TYPES)
        .modifiers(Modifiers::Table(theme_values(api, opacity_section)));
    let utilities = entries
        .iter()
        .map(|&(name, properties)| {
            let generator = utility(move |input: &UtilityInput<'_>| {
                Some(declarations(properties, &color_value(input)?))
            });
            (name.to_string(), generator)
        })
        .collect();
    api.match_utilities(utilities, options)
}

fn preflight(api: &mut dyn PluginApi) -> Result<()> {
    let border = api
        .theme("borderColor.DEFAULT")
        .and_then(|value| value.to_css_value())
        .unwrap_or_else(|| "currentColor".to_string());
    api.add_base(
        &json!({
            "*, ::before, ::after": {
                "boxSizing": "border-box",
                "borderWidth": "0",
                "borderStyle": "solid",
                "borderColor": border
            },
            "html": {
                "lineHeight": "1.5",
                "WebkitTextSizeAdjust": "100%",
                "tabSize": "4"
            },
            "body": {"margin": "0", "lineHeight": "inherit"},
            "img, svg, video, canvas": {"display": "block", "verticalAlign": "middle"},
            "img, video": {"maxWidth": "100%", "height": "auto"}
        })
        .into(),
    )
}

fn container(api: &mut dyn PluginApi) -> Result<()> {
    let settings = api.theme("container").unwrap_or_default();
    let mut body = ConfigMap::new();
    body.insert("width".into(), "100%".into());
    if settings.get("center").and_then(ConfigValue::as_bool) == Some(true) {
        body.insert("marginLeft".into(), "auto".into());
        body.insert("marginRight".into(), "auto".into());
    }
    if let Some(padding) = settings.get("padding").and_then(ConfigValue::to_css_value) {
        body.insert("paddingLeft".into(), padding.clone().into());
        body.insert("paddingRight".into(), padding.into());
    }

    let screens = settings
        .get("screens")
        .cloned()
        .or_else(|| api.theme("screens"))
        .unwrap_or_default();
    for (_, screen) in screens.as_object().into_iter().flatten() {
        let min = screen
            .to_css_value()
            .or_else(|| screen.get("min").and_then(ConfigValue::to_css_value));
        if let Some(min) = min {
            body.insert(
                format!("@media (min-width: {min})"),
                json!({"maxWidth": min}).into(),
            );
        }
    }

    let mut sheet = ConfigMap::new();
    sheet.insert(".container".into(), ConfigValue::Object(body));
    api.add_components(&ConfigValue::Object(sheet))
}

fn accessibility(api: &mut dyn PluginApi) -> Result<()> {
    api.add_utilities(
        &json!({
            ".sr-only": {
                "position": "absolute",
                "width": "1px",
                "height": "1px",
                "padding": "0",
                "margin": "-1px",
                "overflow": "hidden",
                "clip": "rect(0, 0, 0, 0)",
                "whiteSpace": "nowrap",
                "borderWidth": "0"
            },
            ".not-sr-only": {
                "position": "static",
                "width": "auto",
                "height": "auto",
                "padding": "0",
                "margin": "0",
                "overflow": "visible",
                "clip": "auto",
                "whiteSpace": "normal"
            }
        })
        .into(),
    )
}

fn position(api: &mut dyn PluginApi) -> Result<()> {
    api.add_utilities(
        &json!({
            ".static": {"position": "static"},
            ".fixed": {"position": "fixed"},
            ".absolute": {"position": "absolute"},
            ".relative": {"position": "relative"},
            ".sticky": {"position": "sticky"}
        })
        .into(),
    )
}

fn inset(api: &mut dyn PluginApi) -> Result<()> {
    let values = theme_values(api, "inset");
    property_utilities(
        api,
        &[
            ("inset", &["inset"]),
            ("inset-x", &["left", "right"]),
            ("inset-y", &["top", "bottom"]),
            ("top", &["top"]),
            ("right", &["right"]),
            ("bottom", &["bottom"]),
            ("left", &["left"]),
        ],
        UtilityOptions::with_values(values).types(SPACING_TYPES).negative(),
    )
}

fn z_index(api: &mut dyn PluginApi) -> Result<()> {
    let values = theme_values(api, "zIndex");
    let bare = Arc::new(|value: &str| {
        value.parse::<i64>().ok().map(|_| value.to_string())
    });
    property_utilities(
        api,
        &[("z", &["z-index"])],
        UtilityOptions::with_values(values).negative().bare_values(bare),
    )
}

fn margin(api: &mut dyn PluginApi) -> Result<()> {
    let values = theme_values(api, "margin");
    property_utilities(
        api,
        &[
            ("m", &["margin"]),
            ("mx", &["margin-left", "margin-right"]),
            ("my", &["margin-top", "margin-bottom"]),
            ("mt", &["margin-top"]),
            ("mr", &["margin-right"]),
            ("mb", &["margin-bottom"]),
            ("ml", &["margin-left"]),
        ],
        UtilityOptions::with_values(values).types(SPACING_TYPES).negative(),
    )
}

fn display(api: &mut dyn PluginApi) -> Result<()> {
    api.add_utilities(
        &json!({
            ".block": {"display": "block"},
            ".inline-block": {"display": "inline-block"},
            ".inline": {"display": "inline"},
            ".flex": {"display": "flex"},
            ".inline-flex": {"display": "inline-flex"},
            ".table": {"display": "table"},
            ".grid": {"display": "grid"},
            ".inline-grid": {"display": "inline-grid"},
            ".contents": {"display": "contents"},
            ".hidden": {"display": "none"}
        })
        .into(),
    )
}

fn height(api: &mut dyn PluginApi) -> Result<()> {
    let values = theme_values(api, "height");
    property_utilities(
        api,
        &[("h", &["height"])],
        UtilityOptions::with_values(values).types(SPACING_TYPES),
    )
}

fn width(api: &mut dyn PluginApi) -> Result<()> {
    let values = theme_values(api, "width");
    property_utilities(
        api,
        &[("w", &["width"])],
        UtilityOptions::with_values(values).types(SPACING_TYPES),
    )
}

fn max_width(api: &mut dyn PluginApi) -> Result<()> {
    let values = theme_values(api, "maxWidth");
    property_utilities(
        api,
        &[("max-w", &["max-width"])],
        UtilityOptions::with_values(values).types(SPACING_TYPES),
    )
}

fn gap(api: &mut dyn PluginApi) -> Result<()> {
    let values = theme_values(api, "gap");
    property_utilities(
        api,
        &[
            ("gap", &["gap"]),
            ("gap-x", &["column-gap"]),
            ("gap-y", &["row-gap"]),
        ],
        UtilityOptions::with_values(values).types(SPACING_TYPES),
    )
}

fn border_radius(api: &mut dyn PluginApi) -> Result<()> {
    let values = theme_values(api, "borderRadius");
    property_utilities(
        api,
        &[
            ("rounded", &["border-radius"]),
            ("rounded-t", &["border-top-left-radius", "border-top-right-radius"]),
            ("rounded-r", &["border-top-right-radius", "border-bottom-right-radius"]),
            ("rounded-b", &["border-bottom-right-radius", "border-bottom-left-radius"]),
            ("rounded-l", &["border-top-left-radius", "border-bottom-left-radius"]),
            ("rounded-tl", &["border-top-left-radius"]),
            ("rounded-tr", &["border-top-right-radius"]),
            ("rounded-br", &["border-bottom-right-radius"]),
            ("rounded-bl", &["border-bottom-left-radius"]),
        ],
        UtilityOptions::with_values(values).types(&[DataType::Length, DataType::Percentage]),
    )
}

fn border_width(api: &mut dyn PluginApi) -> Result<()> {
    let values = theme_values(api, "borderWidth");
    property_utilities(
        api,
        &[
            ("border", &["border-width"]),
            ("border-x", &["border-left-width", "border-right-width"]),
            ("border-y", &["border-top-width", "border-bottom-width"]),
            ("border-t", &["border-top-width"]),
            ("border-r", &["border-right-width"]),
            ("border-b", &["border-bottom-width"]),
            ("border-l", &["border-left-width"]),
        ],
        UtilityOptions::with_values(values).types(&[DataType::LineWidth, DataType::Length]),
    )
}

fn border_style(api: &mut dyn PluginApi) -> Result<()> {
    api.add_utilities(
        &json!({
            ".border-solid": {"borderStyle": "solid"},
            ".border-dashed": {"borderStyle": "dashed"},
            ".border-dotted": {"borderStyle": "dotted"},
            ".border-double": {"borderStyle": "double"},
            ".border-hidden": {"borderStyle": "hidden"},
            ".border-none": {"borderStyle": "none"}
        })
        .into(),
    )
}

fn border_color(api: &mut dyn PluginApi) -> Result<()> {
    let values = theme_values(api, "borderColor");
    color_utilities(
        api,
        &[
            ("border", &["border-color"]),
            ("border-x", &["border-left-color", "border-right-color"]),
            ("border-y", &["border-top-color", "border-bottom-color"]),
            ("border-t", &["border-top-color"]),
            ("border-r", &["border-right-color"]),
            ("border-b", &["border-bottom-color"]),
            ("border-l", &["border-left-color"]),
        ],
        values,
        "borderOpacity",
    )
}

fn background_color(api: &mut dyn PluginApi) -> Result<()> {
    let values = theme_values(api, "backgroundColor");
    color_utilities(api, &[("bg", &["background-color"])], values, "backgroundOpacity")
}

fn padding(api: &mut dyn PluginApi) -> Result<()> {
    let values = theme_values(api, "padding");
    property_utilities(
        api,
        &[
            ("p", &["padding"]),
            ("px", &["padding-left", "padding-right"]),
            ("py", &["padding-top", "padding-bottom"]),
            ("pt", &["padding-top"]),
            ("pr", &["padding-right"]),
            ("pb", &["padding-bottom"]),
            ("pl", &["padding-left"]),
        ],
        UtilityOptions::with_values(values).types(SPACING_TYPES),
    )
}

fn text_align(api: &mut dyn PluginApi) -> Result<()> {
    api.add_utilities(
        &json!({
            ".text-left": {"textAlign": "left"},
            ".text-center": {"textAlign": "center"},
            ".text-right": {"textAlign": "right"},
            ".text-justify": {"textAlign": "justify"},
            ".text-start": {"textAlign": "start"},
            ".text-end": {"textAlign": "end"}
        })
        .into(),
    )
}

/// `fontSize` entries are a size or a `[size, extras]` tuple, where extras
/// is a line height or an object of `lineHeight`, `letterSpacing` and
/// `fontWeight`. A modifier overrides the line height.
fn font_size(api: &mut dyn PluginApi) -> Result<()> {
    let values = theme_values(api, "fontSize");
    let line_heights = theme_values(api, "lineHeight");
    let generator = utility(|input: &UtilityInput<'_>| {
        let mut out = ConfigMap::new();
        match input.value {
            ConfigValue::Array(tuple) => {
                out.insert("fontSize".into(), tuple.first()?.to_css_value()?.into());
                match tuple.get(1) {
                    Some(ConfigValue::Object(extras)) => {
                        for key in ["lineHeight", "letterSpacing", "fontWeight"] {
                            if let Some(value) = extras.get(key).and_then(ConfigValue::to_css_value) {
                                out.insert(key.into(), value.into());
                            }
                        }
                    }
                    Some(extra) => {
                        out.insert("lineHeight".into(), extra.to_css_value()?.into());
                    }
                    None => {}
                }
            }
            other => {
                out.insert("fontSize".into(), other.to_css_value()?.into());
            }
        }
        if let Some(line_height) = input.modifier {
            out.insert("lineHeight".into(), line_height.into());
        }
        Some(ConfigValue::Object(out))
    });
    api.match_utilities(
        vec![("text".into(), generator)],
        UtilityOptions::with_values(values)
            .types(&[
                DataType::AbsoluteSize,
                DataType::RelativeSize,
                DataType::Length,
                DataType::Percentage,
            ])
            .modifiers(Modifiers::Table(line_heights)),
    )
}

fn font_weight(api: &mut dyn PluginApi) -> Result<()> {
    let values = theme_values(api, "fontWeight");
    property_utilities(
        api,
        &[("font", &["font-weight"])],
        UtilityOptions::with_values(values).types(&[DataType::Number, DataType::Any]),
    )
}

fn line_height(api: &mut dyn PluginApi) -> Result<()> {
    let values = theme_values(api, "lineHeight");
    property_utilities(
        api,
        &[("leading", &["line-height"])],
        UtilityOptions::with_values(values),
    )
}

fn text_color(api: &mut dyn PluginApi) -> Result<()> {
    let values = theme_values(api, "textColor");
    color_utilities(api, &[("text", &["color"])], values, "textOpacity")
}

fn opacity(api: &mut dyn PluginApi) -> Result<()> {
    let values = theme_values(api, "opacity");
    property_utilities(
        api,
        &[("opacity", &["opacity"])],
        UtilityOptions::with_values(values).types(&[DataType::Number, DataType::Percentage]),
    )
}

fn content(api: &mut dyn PluginApi) -> Result<()> {
    let values = theme_values(api, "content");
    let generator = utility(|input: &UtilityInput<'_>| {
        Some(
            json!({
                "--tw-content": input.css()?,
                "content": "var(--tw-content)"
            })
            .into(),
        )
    });
    api.match_utilities(
        vec![("content".into(), generator)],
        UtilityOptions::with_values(values),
    )
}
