//! Theme merging across fragments.

use indexmap::IndexSet;
use log::trace;

use crate::error::Result;

use super::theme::{ThemeLookup, ThemeUtils};
use super::value::{merge_extension, ConfigMap, ConfigValue};

/// Merge the `theme` objects of every fragment (highest precedence first).
///
/// Each top-level key takes the value of the first fragment defining it.
/// `extend` objects from all fragments are then merged onto those values,
/// lowest precedence first. A key whose base or any extension is a function
/// becomes a function merging the resolved pieces.
pub(crate) fn merge_themes(themes: &[&ConfigMap]) -> ConfigMap {
    let mut merged = ConfigMap::new();
    for theme in themes {
        for (key, value) in theme.iter() {
            if key != "extend" && !merged.contains_key(key) {
                merged.insert(key.clone(), value.clone());
            }
        }
    }

    let extensions: Vec<&ConfigMap> = themes
        .iter()
        .rev()
        .filter_map(|theme| theme.get("extend").and_then(ConfigValue::as_object))
        .collect();

    let keys: IndexSet<&String> = extensions.iter().flat_map(|e| e.keys()).collect();
    for key in keys {
        let mut pieces: Vec<ConfigValue> = Vec::with_capacity(extensions.len() + 1);
        if let Some(base) = merged.get(key) {
            pieces.push(base.clone());
        }
        pieces.extend(extensions.iter().filter_map(|e| e.get(key).cloned()));
        trace!("theme.{key}: merging {} extension piece(s)", pieces.len());

        let value = if pieces.iter().any(ConfigValue::is_function) {
            lazy_merge(pieces)
        } else {
            pieces
                .into_iter()
                .reduce(merge_extension)
                .unwrap_or_default()
        };
        merged.insert(key.clone(), value);
    }

    merged
}

fn lazy_merge(pieces: Vec<ConfigValue>) -> ConfigValue {
    ConfigValue::function(move |theme, utils| {
        let mut merged: Option<ConfigValue> = None;
        for piece in &pieces {
            let value = call_until_value(piece.clone(), theme, utils)?;
            merged = Some(match merged {
                Some(current) => merge_extension(current, value),
                None => value,
            });
        }
        Ok(merged.unwrap_or_default())
    })
}

fn call_until_value(
    mut value: ConfigValue,
    theme: &dyn ThemeLookup,
    utils: &ThemeUtils,
) -> Result<ConfigValue> {
    while let ConfigValue::Function(f) = &value {
        let f = f.clone();
        value = f(theme, utils)?;
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::theme::ThemeResolver;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn map(value: serde_json::Value) -> ConfigMap {
        ConfigValue::from(value).as_object().cloned().unwrap()
    }

    #[test]
    fn test_first_fragment_wins_per_key() {
        let user = map(json!({"spacing": {"1": "1px"}}));
        let base = map(json!({"spacing": {"1": "0.25rem", "2": "0.5rem"}, "opacity": {"0": "0"}}));
        let merged = merge_themes(&[&user, &base]);
        assert_eq!(merged["spacing"], ConfigValue::from(json!({"1": "1px"})));
        assert!(merged.contains_key("opacity"));
    }

    #[test]
    fn test_extend_appends_in_order() {
        let user = map(json!({"extend": {"opacity": {"25": "0.25", "75": "0.75"}}}));
        let base = map(json!({"opacity": {"0": "0", "50": "0.5", "100": "1"}}));
        let merged = merge_themes(&[&user, &base]);
        let keys: Vec<_> = merged["opacity"].as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["0", "50", "100", "25", "75"]);
    }

    #[test]
    fn test_higher_extension_merges_last() {
        let user = map(json!({"extend": {"colors": {"brand": "#111"}}}));
        let preset = map(json!({"extend": {"colors": {"brand": "#222", "accent": "#333"}}}));
        let base = map(json!({"colors": {"black": "#000"}}));
        let merged = merge_themes(&[&user, &preset, &base]);
        assert_eq!(merged["colors"].get("brand"), Some(&ConfigValue::from("#111")));
        assert_eq!(merged["colors"].get("accent"), Some(&ConfigValue::from("#333")));
    }

    #[test]
    fn test_function_extension_becomes_lazy() {
        let mut extend = ConfigMap::new();
        extend.insert(
            "padding".into(),
            ConfigValue::function(|theme, _| {
                let four = theme.resolve_or("spacing.4", ConfigValue::Null)?;
                Ok([("card".to_string(), four)].into_iter().collect())
            }),
        );
        let mut user = ConfigMap::new();
        user.insert("extend".into(), ConfigValue::Object(extend));
        let base = map(json!({"spacing": {"4": "1rem"}, "padding": {"1": "0.25rem"}}));

        let merged = merge_themes(&[&user, &base]);
        assert!(merged["padding"].is_function());

        let theme = ThemeResolver::new(merged, ThemeUtils::new(ConfigValue::Null))
            .finish()
            .unwrap();
        assert_eq!(
            theme.section("padding"),
            Some(&ConfigValue::from(json!({"1": "0.25rem", "card": "1rem"})))
        );
    }
}
