//! Turning parsed candidates into CSS rules.

use log::{trace, warn};

use crate::ast::css::CssNode;
use crate::ast::selector::{self, format_variant};
use crate::candidate::{
    Candidate, CandidateKind, Modifier, PluginMatch, PluginValue, Variant, VariantKind,
    VariantValue,
};
use crate::config::{defaults, ConfigValue, Important, ResolvedConfig};
use crate::stylesheet::{Layer, SortKey, VariantValueKey};

use super::css_in_js::lower_rule;
use super::data_types::DataType;
use super::negate::negate_value;
use super::registry::{
    rename_in_node, RegisteredUtility, Registry, UtilityKind, VariantDef, VariantFormat,
    ARBITRARY_VARIANT_INDEX,
};
use super::{Modifiers, UtilityInput};

/// One output node and where it sorts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedRule {
    pub sort: SortKey,
    pub node: CssNode,
}

/// How confidently an arbitrary value matched a utility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Rank {
    /// The candidate named a type the utility accepts: `text-[length:2px]`.
    Explicit,
    /// A type the utility accepts recognised the value.
    Inferred,
    /// Only the utility's `any` type accepted it.
    Any,
}

enum Outcome {
    Match(Rank, Vec<CssNode>),
    Skip,
    /// Drop the whole candidate. An arbitrary value with a modifier the
    /// utility cannot resolve ends here instead of falling back to another
    /// reading, so `bg-[#fff]/nope` never styles as some looser split.
    Abort,
}

/// Rules matched for one utility before variants are applied.
struct Matched<'a> {
    utility: Option<&'a RegisteredUtility>,
    nodes: Vec<CssNode>,
}

/// Generate every rule for `candidate`. Candidates nothing answers, or
/// whose variants do not resolve, produce no rules.
pub fn generate(registry: &Registry, candidate: &Candidate) -> Vec<GeneratedRule> {
    let config = registry.resolved_config();

    let matched = match &candidate.kind {
        CandidateKind::Custom { property, value } => vec![Matched {
            utility: None,
            nodes: vec![CssNode::rule(
                format!(".{}", candidate.class_name),
                vec![CssNode::decl(property.clone(), value.clone())],
            )],
        }],
        CandidateKind::Constrained { plugins } => match_plugins(registry, candidate, plugins),
    };
    if matched.is_empty() {
        return Vec::new();
    }

    let mut variants = Vec::with_capacity(candidate.variants.len());
    for variant in &candidate.variants {
        match resolve_variant(registry, variant) {
            Some(resolved) => variants.push(resolved),
            None => {
                trace!("`{}`: unknown variant `{}`", candidate.raw, variant.raw);
                return Vec::new();
            }
        }
    }

    let mut out = Vec::new();
    for Matched { utility, nodes } in matched {
        let mut sort = match utility {
            Some(utility) => SortKey::new(utility.layer, utility.order),
            None => {
                let mut sort = SortKey::new(Layer::Utilities, usize::MAX);
                sort.arbitrary = true;
                sort
            }
        };

        let mut nodes = nodes;
        for resolved in &variants {
            if let Some(utility) = utility {
                if !variant_allowed(registry, config, &utility.group, resolved) {
                    trace!(
                        "`{}`: variant `{}` not enabled for `{}`",
                        candidate.raw,
                        resolved.name,
                        utility.group
                    );
                    return Vec::new();
                }
            }
            nodes = resolved
                .formats
                .iter()
                .flat_map(|format| apply_format(nodes.clone(), &candidate.class_name, format))
                .collect();
            sort.add_variant(resolved.index, resolved.value.clone());
        }

        let respect_important = utility.map_or(true, |u| u.respect_important);
        apply_important(&mut nodes, candidate.important, respect_important, config);

        out.extend(nodes.into_iter().map(|node| GeneratedRule {
            sort: sort.clone(),
            node,
        }));
    }
    out
}

/// Try each reading in order; the first one any utility answers wins.
fn match_plugins<'a>(
    registry: &'a Registry,
    candidate: &Candidate,
    plugins: &[PluginMatch],
) -> Vec<Matched<'a>> {
    let config = registry.resolved_config();

    for reading in plugins {
        let key = if candidate.negative {
            format!("-{}", reading.name)
        } else {
            reading.name.clone()
        };
        let utilities = registry.utilities(&key);
        if utilities.is_empty() {
            continue;
        }

        let mut found: Vec<(Rank, &RegisteredUtility, Vec<CssNode>)> = Vec::new();
        for utility in utilities {
            if !prefix_matches(config, utility, candidate) {
                continue;
            }
            match match_utility(utility, reading, candidate, config) {
                Outcome::Match(rank, nodes) => found.push((rank, utility, nodes)),
                Outcome::Skip => {}
                Outcome::Abort => return Vec::new(),
            }
        }
        if found.is_empty() {
            continue;
        }

        if reading.value.is_arbitrary() {
            found = best_ranked(found, &candidate.raw);
        }
        return found
            .into_iter()
            .map(|(_, utility, nodes)| Matched {
                utility: Some(utility),
                nodes,
            })
            .collect();
    }

    Vec::new()
}

/// Keep the best-ranked match for an arbitrary value. Several utilities
/// tied at the best rank make the candidate ambiguous, and it is dropped.
fn best_ranked<'a>(
    found: Vec<(Rank, &'a RegisteredUtility, Vec<CssNode>)>,
    raw: &str,
) -> Vec<(Rank, &'a RegisteredUtility, Vec<CssNode>)> {
    let Some(best) = found.iter().map(|(rank, _, _)| *rank).min() else {
        return found;
    };
    let winners: Vec<_> = found.into_iter().filter(|(rank, _, _)| *rank == best).collect();
    let distinct_groups = winners
        .iter()
        .map(|(_, utility, _)| utility.group.as_str())
        .collect::<indexmap::IndexSet<_>>();
    if distinct_groups.len() > 1 {
        let groups: Vec<_> = distinct_groups.into_iter().collect();
        warn!(
            "`{raw}` is ambiguous between {}; add a type hint such as `[length:...]`",
            groups.join(", ")
        );
        return Vec::new();
    }
    winners
}

fn prefix_matches(config: &ResolvedConfig, utility: &RegisteredUtility, candidate: &Candidate) -> bool {
    if config.prefix.is_empty() {
        return true;
    }
    utility.respect_prefix == candidate.prefix.is_some()
}

fn match_utility(
    utility: &RegisteredUtility,
    reading: &PluginMatch,
    candidate: &Candidate,
    config: &ResolvedConfig,
) -> Outcome {
    match &utility.kind {
        UtilityKind::Static { class, node } => {
            if reading.value != PluginValue::Default || !reading.modifiers.is_empty() {
                return Outcome::Skip;
            }
            let mut node = node.clone();
            rename_in_node(&mut node, class, &candidate.class_name);
            Outcome::Match(Rank::Any, vec![node])
        }
        UtilityKind::Functional {
            generator,
            options,
            negate,
        } => {
            if !reading.modifiers.is_empty() && options.modifiers.is_none() {
                return Outcome::Skip;
            }

            let (value, data_type, rank) = match &reading.value {
                PluginValue::Default => match options.values.get("DEFAULT") {
                    Some(value) => (value.clone(), DataType::Any, Rank::Any),
                    None => return Outcome::Skip,
                },
                PluginValue::Named(name) => {
                    let value = options.values.get(name.as_str()).cloned().or_else(|| {
                        options
                            .bare_values
                            .as_ref()
                            .and_then(|bare| bare(name))
                            .map(ConfigValue::String)
                    });
                    match value {
                        Some(value) => (value, DataType::Any, Rank::Any),
                        None => return Outcome::Skip,
                    }
                }
                PluginValue::Arbitrary(arbitrary) => {
                    let matched = if arbitrary.explicit {
                        options
                            .accepts(arbitrary.data_type)
                            .then_some((arbitrary.data_type, Rank::Explicit))
                    } else {
                        options
                            .types
                            .iter()
                            .find(|ty| **ty != DataType::Any && ty.matches(&arbitrary.value))
                            .map(|ty| (*ty, Rank::Inferred))
                            .or_else(|| {
                                options
                                    .accepts(DataType::Any)
                                    .then_some((DataType::Any, Rank::Any))
                            })
                    };
                    match matched {
                        Some((data_type, rank)) => (
                            ConfigValue::String(arbitrary.value.clone()),
                            data_type,
                            rank,
                        ),
                        None => return Outcome::Skip,
                    }
                }
            };

            let value = if *negate {
                match value.to_css_value().as_deref().and_then(negate_value) {
                    Some(negated) => ConfigValue::String(negated),
                    None => return Outcome::Skip,
                }
            } else {
                value
            };

            let modifier = match reading.modifiers.first() {
                None => None,
                Some(modifier) => match resolve_modifier(modifier, options.modifiers.as_ref(), &options.types) {
                    Some(resolved) => Some(resolved),
                    // Arbitrary values stop here; named values try the next reading.
                    None if reading.value.is_arbitrary() => return Outcome::Abort,
                    None => return Outcome::Skip,
                },
            };

            let input = UtilityInput {
                value: &value,
                modifier: modifier.as_deref(),
                data_type,
                theme: &config.theme,
            };
            let Some(declarations) = generator(&input) else {
                return Outcome::Skip;
            };
            match lower_rule(&format!(".{}", candidate.class_name), &declarations) {
                Ok(nodes) if !nodes.is_empty() => Outcome::Match(rank, nodes),
                Ok(_) => Outcome::Skip,
                Err(err) => {
                    warn!("`{}`: {err}", candidate.raw);
                    Outcome::Skip
                }
            }
        }
    }
}

/// Named modifiers go through the table; numbers become percentages for
/// colour utilities; arbitrary modifiers pass through.
fn resolve_modifier(
    modifier: &Modifier,
    accepted: Option<&Modifiers>,
    types: &[DataType],
) -> Option<String> {
    match (modifier, accepted?) {
        (Modifier::Arbitrary(value), _) => Some(value.value.clone()),
        (Modifier::Named(name), Modifiers::Any) => Some(name.clone()),
        (Modifier::Named(name), Modifiers::Table(table)) => table
            .get(name.as_str())
            .and_then(ConfigValue::to_css_value)
            .or_else(|| {
                (types.contains(&DataType::Color) && DataType::Number.matches(name))
                    .then(|| format!("{name}%"))
            }),
    }
}

/// A variant ready to apply.
struct ResolvedVariant {
    /// The variant as named in the candidate, without value or modifier
    /// (`hover`, `group-hover`, `md`).
    name: String,
    index: u32,
    value: Option<VariantValueKey>,
    formats: Vec<VariantFormat>,
}

fn resolve_variant(registry: &Registry, variant: &Variant) -> Option<ResolvedVariant> {
    let (candidates, modifier) = match &variant.kind {
        VariantKind::Arbitrary { selector } => {
            return Some(ResolvedVariant {
                name: variant.raw.clone(),
                index: ARBITRARY_VARIANT_INDEX,
                value: Some(VariantValueKey {
                    index: ARBITRARY_VARIANT_INDEX,
                    named: None,
                    value: selector.clone(),
                    compare: None,
                }),
                formats: vec![VariantFormat::parse(selector)?],
            });
        }
        VariantKind::Named {
            candidates,
            modifier,
        } => (candidates, modifier.as_deref()),
    };
    let full_name = candidates.first().map(|(name, _)| name.clone())?;

    for (name, value) in candidates {
        let Some(registered) = registry.variant(name) else {
            continue;
        };
        match (&registered.def, value) {
            (VariantDef::Static(formats), None) => {
                if modifier.is_some() {
                    return None;
                }
                return Some(ResolvedVariant {
                    name: full_name,
                    index: registered.index,
                    value: None,
                    formats: formats.clone(),
                });
            }
            (VariantDef::Static(_), Some(_)) => continue,
            (VariantDef::Functional { generator, options }, value) => {
                let (named, resolved) = match value {
                    None => match options.values.get_full("DEFAULT") {
                        Some((index, _, value)) => (Some(index), value.to_css_value()?),
                        None => continue,
                    },
                    Some(VariantValue::Named(key)) => match options.values.get_full(key.as_str()) {
                        Some((index, _, value)) => (Some(index), value.to_css_value()?),
                        None => continue,
                    },
                    Some(VariantValue::Arbitrary(raw)) => (None, raw.clone()),
                };
                let formats = generator(&resolved, modifier)?
                    .iter()
                    .map(|format| VariantFormat::parse(format))
                    .collect::<Option<Vec<_>>>()?;
                if formats.is_empty() {
                    return None;
                }
                return Some(ResolvedVariant {
                    name: full_name,
                    index: registered.index,
                    value: Some(VariantValueKey {
                        index: registered.index,
                        named,
                        value: resolved,
                        compare: options.sort.clone(),
                    }),
                    formats,
                });
            }
        }
    }
    None
}

/// Per-group `variants` allow-lists cover the classic variant names and
/// `responsive`; newer variants are always available.
fn variant_allowed(
    registry: &Registry,
    config: &ResolvedConfig,
    group: &str,
    variant: &ResolvedVariant,
) -> bool {
    if variant.index == ARBITRARY_VARIANT_INDEX {
        return true;
    }
    if registry.is_screen(&variant.name) {
        return config.variants.allows(group, "responsive");
    }
    if defaults::VARIANT_ORDER.contains(&variant.name.as_str()) {
        return config.variants.allows(group, &variant.name);
    }
    true
}

fn apply_format(nodes: Vec<CssNode>, class: &str, format: &VariantFormat) -> Vec<CssNode> {
    match format {
        VariantFormat::Selector(format) => {
            let mut nodes = nodes;
            for node in &mut nodes {
                node.for_each_rule_mut(&mut |rule| {
                    rule.selector = format_variant(&rule.selector, class, format);
                });
            }
            nodes
        }
        VariantFormat::Wrap {
            name,
            params,
            inner,
        } => {
            let nodes = match inner {
                Some(inner) => apply_format(nodes, class, inner),
                None => nodes,
            };
            vec![CssNode::at_rule(name.clone(), params.clone(), nodes)]
        }
    }
}

fn apply_important(
    nodes: &mut [CssNode],
    candidate_important: bool,
    respect_important: bool,
    config: &ResolvedConfig,
) {
    if candidate_important {
        nodes.iter_mut().for_each(CssNode::make_important);
        return;
    }
    if !respect_important {
        return;
    }
    match &config.important {
        Important::Off => {}
        Important::All => nodes.iter_mut().for_each(CssNode::make_important),
        Important::Selector(scope) => {
            for node in nodes.iter_mut() {
                node.for_each_rule_mut(&mut |rule| {
                    rule.selector = selector::split_list(selector::parse(&rule.selector))
                        .iter()
                        .map(|complex| format!("{scope} {}", selector::to_css(complex).trim()))
                        .collect::<Vec<_>>()
                        .join(", ");
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::ast::css::to_css;
    use crate::candidate::{parse_candidate, ParseOptions};
    use crate::config::{resolve_config, ConfigFragment};
    use crate::plugin::{from_fn, utility, PluginApi, UtilityOptions};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn registry_for(fragment: ConfigFragment) -> Registry {
        let config = resolve_config(&[fragment]).unwrap();
        Registry::build(Arc::new(config)).unwrap()
    }

    fn css_for(registry: &Registry, raw: &str) -> String {
        let config = registry.resolved_config();
        let options = ParseOptions {
            separator: config.separator.clone(),
            prefix: config.prefix.clone(),
            variant_grouping: config.variant_grouping,
        };
        let nodes: Vec<CssNode> = parse_candidate(raw, &options)
            .iter()
            .flat_map(|candidate| generate(registry, candidate))
            .map(|rule| rule.node)
            .collect();
        to_css(&nodes)
    }

    fn default_registry() -> Registry {
        registry_for(ConfigFragment::new())
    }

    #[test]
    fn test_theme_value() {
        let registry = default_registry();
        assert_eq!(css_for(&registry, "p-4"), ".p-4 {\n  padding: 1rem;\n}\n");
    }

    #[test]
    fn test_fraction_and_arbitrary_values() {
        let registry = default_registry();
        assert_eq!(css_for(&registry, "w-1/2"), ".w-1\\/2 {\n  width: 50%;\n}\n");
        assert_eq!(
            css_for(&registry, "w-[calc(100%-1rem)]"),
            ".w-\\[calc\\(100\\%-1rem\\)\\] {\n  width: calc(100% - 1rem);\n}\n"
        );
    }

    #[test]
    fn test_negative_values() {
        let registry = default_registry();
        assert_eq!(css_for(&registry, "-mt-4"), ".-mt-4 {\n  margin-top: -1rem;\n}\n");
        assert_eq!(
            css_for(&registry, "-mt-[var(--gap)]"),
            ".-mt-\\[var\\(--gap\\)\\] {\n  margin-top: calc(var(--gap) * -1);\n}\n"
        );
        assert_eq!(css_for(&registry, "-mt-auto"), "");
        assert_eq!(css_for(&registry, "-p-4"), "");
    }

    #[test]
    fn test_variants() {
        let registry = default_registry();
        assert_eq!(
            css_for(&registry, "md:hover:p-4"),
            "@media (min-width: 768px) {\n  .md\\:hover\\:p-4:hover {\n    padding: 1rem;\n  }\n}\n"
        );
        assert_eq!(
            css_for(&registry, "[&>*]:p-4"),
            ".\\[\\&\\>\\*\\]\\:p-4>* {\n  padding: 1rem;\n}\n"
        );
        assert_eq!(css_for(&registry, "nope:p-4"), "");
    }

    #[test]
    fn test_arbitrary_property() {
        let registry = default_registry();
        assert_eq!(
            css_for(&registry, "[mask-type:alpha]"),
            ".\\[mask-type\\:alpha\\] {\n  mask-type: alpha;\n}\n"
        );
    }

    #[test]
    fn test_color_modifier() {
        let registry = default_registry();
        assert_eq!(
            css_for(&registry, "bg-red-500/50"),
            ".bg-red-500\\/50 {\n  background-color: rgb(239 68 68 / 0.5);\n}\n"
        );
        assert_eq!(
            css_for(&registry, "bg-red-500/[.3]"),
            ".bg-red-500\\/\\[\\.3\\] {\n  background-color: rgb(239 68 68 / .3);\n}\n"
        );
        assert_eq!(css_for(&registry, "p-4/50"), "");
    }

    #[test]
    fn test_unresolvable_modifier_on_arbitrary_value_drops_candidate() {
        let registry = default_registry();
        assert_ne!(css_for(&registry, "bg-[#bada55]/50"), "");
        assert_eq!(css_for(&registry, "bg-[#bada55]/unknown"), "");
        assert_eq!(css_for(&registry, "bg-red-500/unknown"), "");
    }

    #[test]
    fn test_arbitrary_type_inference_picks_one_plugin() {
        let registry = default_registry();
        assert_eq!(
            css_for(&registry, "text-[10px]"),
            ".text-\\[10px\\] {\n  font-size: 10px;\n}\n"
        );
        assert_eq!(
            css_for(&registry, "text-[#bada55]"),
            ".text-\\[\\#bada55\\] {\n  color: #bada55;\n}\n"
        );
        assert_eq!(
            css_for(&registry, "border-[length:var(--w)]"),
            ".border-\\[length\\:var\\(--w\\)\\] {\n  border-width: var(--w);\n}\n"
        );
    }

    #[test]
    fn test_ambiguous_arbitrary_value_is_dropped() {
        let plugin = from_fn("tint", |api: &mut dyn PluginApi| {
            api.match_utilities(
                vec![(
                    "text".into(),
                    utility(|input| Some(json!({"--tint": input.css()?}).into())),
                )],
                UtilityOptions::default(),
            )
        });
        let registry = registry_for(ConfigFragment::new().with_plugin(Arc::new(plugin)));
        assert_eq!(css_for(&registry, "text-[var(--x)]"), "");
    }

    #[test]
    fn test_important() {
        let registry = default_registry();
        assert_eq!(
            css_for(&registry, "!p-4"),
            ".\\!p-4 {\n  padding: 1rem !important;\n}\n"
        );

        let scoped = registry_for(ConfigFragment::from_json(json!({"important": "#app"})).unwrap());
        assert_eq!(css_for(&scoped, "p-4"), "#app .p-4 {\n  padding: 1rem;\n}\n");
    }

    #[test]
    fn test_prefix() {
        let registry = registry_for(ConfigFragment::from_json(json!({"prefix": "tw-"})).unwrap());
        assert_eq!(css_for(&registry, "tw-p-4"), ".tw-p-4 {\n  padding: 1rem;\n}\n");
        assert_eq!(css_for(&registry, "p-4"), "");
        assert_eq!(css_for(&registry, "-tw-mt-4"), ".-tw-mt-4 {\n  margin-top: -1rem;\n}\n");
    }

    #[test]
    fn test_variant_allow_list() {
        let registry = registry_for(
            ConfigFragment::from_json(json!({"variants": {"padding": ["hover"]}})).unwrap(),
        );
        assert_ne!(css_for(&registry, "hover:p-4"), "");
        assert_eq!(css_for(&registry, "focus:p-4"), "");
        assert_ne!(css_for(&registry, "focus:m-4"), "");
        assert_ne!(css_for(&registry, "aria-checked:p-4"), "");
    }

    #[test]
    fn test_static_utility_rename() {
        let registry = default_registry();
        assert_eq!(
            css_for(&registry, "hover:block"),
            ".hover\\:block:hover {\n  display: block;\n}\n"
        );
    }

    #[test]
    fn test_sort_keys_reflect_layers() {
        let registry = default_registry();
        let parsed = parse_candidate("hover:container", &ParseOptions::default());
        let rules = generate(&registry, &parsed[0]);
        assert!(!rules.is_empty());
        assert!(rules.iter().all(|rule| rule.sort.layer == Layer::Variants));
        assert!(rules.iter().all(|rule| rule.sort.parent == Layer::Components));
    }
}
