//! Sort keys for generated rules.

use std::cmp::Ordering;
use std::fmt;

use crate::plugin::VariantCompare;

/// Output buckets, in emission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Layer {
    Base,
    Components,
    Utilities,
    /// Any component or utility rule with at least one variant applied.
    Variants,
}

impl Layer {
    /// The `@tailwind` marker name for this bucket.
    pub fn marker(self) -> &'static str {
        match self {
            Layer::Base => "base",
            Layer::Components => "components",
            Layer::Utilities => "utilities",
            Layer::Variants => "variants",
        }
    }
}

/// Where a functional variant value sorts among the values of the same
/// variant: named values in declared order, then arbitrary values by the
/// variant's comparator, then lexicographically.
#[derive(Clone)]
pub struct VariantValueKey {
    /// The variant's registration index.
    pub index: u32,
    /// Position among the variant's named values; `None` for arbitrary
    /// values.
    pub named: Option<usize>,
    pub value: String,
    pub compare: Option<VariantCompare>,
}

impl Ord for VariantValueKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.index
            .cmp(&other.index)
            .then_with(|| match (self.named, other.named) {
                (Some(a), Some(b)) => a.cmp(&b),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => self
                    .compare
                    .as_ref()
                    .map_or(Ordering::Equal, |compare| compare(&self.value, &other.value)),
            })
            .then_with(|| self.value.cmp(&other.value))
    }
}

impl PartialOrd for VariantValueKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for VariantValueKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for VariantValueKey {}

impl fmt::Debug for VariantValueKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VariantValueKey")
            .field("index", &self.index)
            .field("named", &self.named)
            .field("value", &self.value)
            .finish()
    }
}

/// The position of a generated rule in the output.
///
/// Compared field by field: bucket, the bucket the rule came from (for
/// variant rules), the variant bit mask, functional variant values, the
/// arbitrary-property flag, then registration order. Rules with equal keys
/// keep candidate discovery order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct SortKey {
    pub layer: Layer,
    pub parent: Layer,
    pub variants: u128,
    pub values: Vec<VariantValueKey>,
    pub arbitrary: bool,
    pub order: usize,
}

impl SortKey {
    pub fn new(layer: Layer, order: usize) -> Self {
        Self {
            layer,
            parent: layer,
            variants: 0,
            values: Vec::new(),
            arbitrary: false,
            order,
        }
    }

    /// Record an applied variant.
    pub fn add_variant(&mut self, index: u32, value: Option<VariantValueKey>) {
        self.variants |= 1u128 << index;
        if self.layer != Layer::Variants {
            self.parent = self.layer;
            self.layer = Layer::Variants;
        }
        if let Some(value) = value {
            let at = self.values.partition_point(|v| v.index <= value.index);
            self.values.insert(at, value);
        }
    }
}
