//! Syntax trees shared across the pipeline.
//!
//! - [`value`] - CSS value tokenizer (theme function substitution, arbitrary
//!   value checks)
//! - [`selector`] - selector tokenizer (class renaming, variant formats)
//! - [`css`] - stylesheet AST and the input stylesheet parser
//! - [`walk`] - the cursor-based mutating walker all three trees share

pub mod css;
pub mod selector;
pub mod value;
pub mod walk;

pub use css::{AtRule, CssNode, Declaration, Rule};
pub use selector::SelectorNode;
pub use value::ValueNode;
pub use walk::{walk, WalkAction, Walkable};
