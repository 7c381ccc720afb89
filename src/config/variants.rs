//! The `variants` and `corePlugins` folds.

use indexmap::IndexMap;

use crate::error::{Result, TailorError};

use super::value::ConfigValue;

/// Per utility group variant allow-lists after merging every fragment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedVariants {
    /// A list given as the whole `variants` value in some fragment. It
    /// applies to every group and wins outright.
    pub global: Option<Vec<String>>,
    pub groups: IndexMap<String, Vec<String>>,
}

impl ResolvedVariants {
    /// Whether `variant` may be applied to utilities of `group`. Groups
    /// without a configured list accept every variant.
    pub fn allows(&self, group: &str, variant: &str) -> bool {
        if let Some(global) = &self.global {
            return global.iter().any(|v| v == variant);
        }
        match self.groups.get(group) {
            Some(list) => list.iter().any(|v| v == variant),
            None => true,
        }
    }
}

/// Handed to functional `variants` entries.
pub struct VariantHelpers<'a> {
    resolved: &'a IndexMap<String, Vec<String>>,
    group: &'a str,
}

impl<'a> VariantHelpers<'a> {
    /// The list another group has resolved to so far.
    pub fn variants(&self, group: &str) -> Vec<String> {
        self.resolved.get(group).cloned().unwrap_or_default()
    }

    /// The list of the group being resolved, as set by lower-precedence
    /// fragments.
    pub fn current(&self) -> Vec<String> {
        self.variants(self.group)
    }

    /// Insert `list` before `anchor` (or at the front when the anchor is
    /// absent).
    pub fn before(&self, list: &[&str], anchor: Option<&str>) -> Vec<String> {
        let current = self.current();
        let index = anchor
            .and_then(|anchor| current.iter().position(|v| v == anchor))
            .unwrap_or(0);
        splice(current, index, list)
    }

    /// Insert `list` after `anchor` (or at the end when the anchor is
    /// absent).
    pub fn after(&self, list: &[&str], anchor: Option<&str>) -> Vec<String> {
        let current = self.current();
        let index = anchor
            .and_then(|anchor| current.iter().position(|v| v == anchor))
            .map_or(current.len(), |i| i + 1);
        splice(current, index, list)
    }

    pub fn without(&self, list: &[&str]) -> Vec<String> {
        self.current()
            .into_iter()
            .filter(|v| !list.contains(&v.as_str()))
            .collect()
    }
}

fn splice(current: Vec<String>, index: usize, list: &[&str]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(current.len() + list.len());
    let (head, tail) = current.split_at(index.min(current.len()));
    out.extend(head.iter().filter(|v| !list.contains(&v.as_str())).cloned());
    out.extend(list.iter().map(|v| v.to_string()));
    out.extend(tail.iter().filter(|v| !list.contains(&v.as_str())).cloned());
    uniq(out)
}

fn uniq(list: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(list.len());
    for item in list {
        if !out.contains(&item) {
            out.push(item);
        }
    }
    out
}

fn string_list(value: &ConfigValue, what: &str) -> Result<Vec<String>> {
    value.to_string_list().ok_or_else(|| TailorError::Config {
        message: format!("`{what}` must be a list of variant names"),
        help: Some("Use an array such as [\"hover\", \"focus\"]".to_string()),
    })
}

/// Fold the `variants` values of every fragment (highest precedence first).
pub(crate) fn resolve_variants(
    values: &[Option<&ConfigValue>],
    variant_order: &[&str],
) -> Result<ResolvedVariants> {
    if let Some(global) = values.iter().flatten().find(|v| v.as_array().is_some()) {
        return Ok(ResolvedVariants {
            global: Some(string_list(global, "variants")?),
            groups: IndexMap::new(),
        });
    }

    let mut groups: IndexMap<String, Vec<String>> = IndexMap::new();
    let mut extensions: Vec<(&String, &ConfigValue)> = Vec::new();

    for value in values.iter().rev().flatten() {
        let Some(map) = value.as_object() else {
            return Err(TailorError::config("`variants` must be an object or a list"));
        };
        for (group, entry) in map {
            if group == "extend" {
                if let Some(extend) = entry.as_object() {
                    extensions.extend(extend.iter());
                }
                continue;
            }
            let list = match entry {
                ConfigValue::Variants(f) => f(&VariantHelpers {
                    resolved: &groups,
                    group,
                })?,
                other => string_list(other, &format!("variants.{group}"))?,
            };
            groups.insert(group.clone(), list);
        }
    }

    for (group, extension) in extensions {
        let mut merged = groups.get(group).cloned().unwrap_or_default();
        merged.extend(string_list(extension, &format!("variants.extend.{group}"))?);
        let mut merged = uniq(merged);
        let rank = |v: &String| {
            variant_order
                .iter()
                .position(|o| o == v)
                .unwrap_or(variant_order.len())
        };
        merged.sort_by_key(rank);
        groups.insert(group.clone(), merged);
    }

    Ok(ResolvedVariants {
        global: None,
        groups,
    })
}

/// Fold `corePlugins` values right to left over the master list.
pub(crate) fn resolve_core_plugins(
    values: &[Option<&ConfigValue>],
    master: &[&str],
) -> Result<Vec<String>> {
    let mut enabled: Vec<&str> = master.to_vec();

    for value in values.iter().rev().flatten() {
        match value {
            ConfigValue::Bool(false) => enabled.clear(),
            ConfigValue::Bool(true) => enabled = master.to_vec(),
            ConfigValue::Array(_) => {
                let list = string_list(value, "corePlugins")?;
                enabled = master
                    .iter()
                    .copied()
                    .filter(|name| list.iter().any(|l| l == name))
                    .collect();
            }
            ConfigValue::Object(map) => {
                for (name, flag) in map {
                    let Some(name) = master.iter().copied().find(|m| *m == name.as_str()) else {
                        continue;
                    };
                    match flag.as_bool() {
                        Some(false) => enabled.retain(|n| *n != name),
                        _ => {
                            if !enabled.contains(&name) {
                                enabled.push(name);
                            }
                        }
                    }
                }
            }
            _ => {
                return Err(TailorError::config(
                    "`corePlugins` must be a boolean, a list or an object",
                ))
            }
        }
    }

    Ok(master
        .iter()
        .filter(|name| enabled.contains(*name))
        .map(|name| name.to_string())
        .collect())
}
