//! Stylesheet assembly.
//!
//! Generated rules are cached per candidate in a [`RuleCache`]. When a build
//! asks for output, the cache sorts every rule by its [`SortKey`] (only if
//! rules were added since the last sort), splits them into layer buckets
//! and collapses adjacent rules. [`assemble`] then splices the buckets into
//! the input stylesheet at its `@tailwind` markers.
//!
//! ```text
//! @tailwind base;        <- preflight and other base styles
//! @tailwind components;  <- .container, plugin components
//! @tailwind utilities;   <- .p-4, .bg-red-500
//! @tailwind variants;    <- hover:, md:, ... (appended at the end if absent)
//! ```

mod collapse;
mod functions;
pub mod sort;

use std::sync::Arc;

use indexmap::IndexMap;
use log::{debug, warn};

use crate::ast::css::CssNode;
use crate::plugin::GeneratedRule;

pub use collapse::collapse_adjacent;
pub use functions::{substitute_functions, substitute_value};
pub use sort::{Layer, SortKey, VariantValueKey};

/// Sorted, collapsed output for each layer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Buckets {
    pub base: Vec<CssNode>,
    pub components: Vec<CssNode>,
    pub utilities: Vec<CssNode>,
    pub variants: Vec<CssNode>,
}

impl Buckets {
    pub fn get(&self, layer: Layer) -> &[CssNode] {
        match layer {
            Layer::Base => &self.base,
            Layer::Components => &self.components,
            Layer::Utilities => &self.utilities,
            Layer::Variants => &self.variants,
        }
    }

    fn get_mut(&mut self, layer: Layer) -> &mut Vec<CssNode> {
        match layer {
            Layer::Base => &mut self.base,
            Layer::Components => &mut self.components,
            Layer::Utilities => &mut self.utilities,
            Layer::Variants => &mut self.variants,
        }
    }

    /// Number of top-level nodes across every bucket.
    pub fn len(&self) -> usize {
        self.base.len() + self.components.len() + self.utilities.len() + self.variants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Generated rules keyed by raw candidate, in discovery order.
///
/// Candidates that generate nothing are cached too, so they are never
/// resolved again.
#[derive(Debug, Default)]
pub struct RuleCache {
    entries: IndexMap<String, Arc<[GeneratedRule]>>,
    rule_count: usize,
    /// Rule count the current buckets were built from.
    sorted_count: Option<usize>,
    buckets: Buckets,
}

impl RuleCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, candidate: &str) -> bool {
        self.entries.contains_key(candidate)
    }

    pub fn get(&self, candidate: &str) -> Option<&Arc<[GeneratedRule]>> {
        self.entries.get(candidate)
    }

    /// Cache the rules for a candidate. An already cached candidate keeps
    /// its first entry.
    pub fn insert(&mut self, candidate: impl Into<String>, rules: Vec<GeneratedRule>) -> Arc<[GeneratedRule]> {
        let entry = self.entries.entry(candidate.into()).or_insert_with(|| {
            self.rule_count += rules.len();
            rules.into()
        });
        Arc::clone(entry)
    }

    /// Number of cached candidates, matched or not.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of generated rules across every candidate.
    pub fn rule_count(&self) -> usize {
        self.rule_count
    }

    /// Candidates that generated at least one rule, in discovery order.
    pub fn matched(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(|(_, rules)| !rules.is_empty())
            .map(|(candidate, _)| candidate.as_str())
    }

    /// The sorted layer buckets. Sorting happens only when rules were added
    /// since the previous call.
    pub fn buckets(&mut self) -> &Buckets {
        if self.sorted_count != Some(self.rule_count) {
            debug!("sorting {} rule(s)", self.rule_count);
            self.buckets = bucket(self.entries.values());
            self.sorted_count = Some(self.rule_count);
        }
        &self.buckets
    }
}

/// Stable-sort rules (ties keep discovery order) and split them by layer.
fn bucket<'a>(entries: impl Iterator<Item = &'a Arc<[GeneratedRule]>>) -> Buckets {
    let mut rules: Vec<&GeneratedRule> = entries.flat_map(|rules| rules.iter()).collect();
    rules.sort_by(|a, b| a.sort.cmp(&b.sort));

    let mut buckets = Buckets::default();
    for rule in rules {
        buckets.get_mut(rule.sort.layer).push(rule.node.clone());
    }
    for layer in [Layer::Base, Layer::Components, Layer::Utilities, Layer::Variants] {
        let nodes = std::mem::take(buckets.get_mut(layer));
        *buckets.get_mut(layer) = collapse_adjacent(nodes);
    }
    buckets
}

/// Splice `base` styles and the generated buckets into `input` at its
/// `@tailwind` markers. A stylesheet without a `variants` marker gets the
/// variant rules appended at the end.
pub fn assemble(input: &[CssNode], base: &[CssNode], buckets: &Buckets) -> Vec<CssNode> {
    let mut out = Vec::with_capacity(input.len() + buckets.len());
    let mut variants_placed = false;

    for node in input {
        let marker = match node {
            CssNode::AtRule(at_rule) if at_rule.name == "tailwind" && at_rule.nodes.is_none() => {
                at_rule.params.trim()
            }
            other => {
                out.push(other.clone());
                continue;
            }
        };
        match marker {
            "base" => {
                let mut nodes = base.to_vec();
                nodes.extend(buckets.base.iter().cloned());
                out.extend(collapse_adjacent(nodes));
            }
            "components" => out.extend(buckets.components.iter().cloned()),
            "utilities" => out.extend(buckets.utilities.iter().cloned()),
            "variants" | "screens" => {
                if !variants_placed {
                    out.extend(buckets.variants.iter().cloned());
                    variants_placed = true;
                }
            }
            other => warn!("ignoring unknown layer `@tailwind {other}`"),
        }
    }

    if !variants_placed {
        out.extend(buckets.variants.iter().cloned());
    }
    out
}
