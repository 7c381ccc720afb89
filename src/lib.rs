//! tailor - utility-first CSS compiler
//!
//! A library for turning the class names found in arbitrary source text into
//! a layered stylesheet, driven by a mergeable design-token config and a
//! plugin registry of utilities and variants.

pub mod ast;
pub mod candidate;
pub mod cli;
pub mod config;
pub mod context;
pub mod error;
pub mod extract;
pub mod output;
pub mod plugin;
pub mod stylesheet;

pub use ast::{CssNode, SelectorNode, ValueNode};
pub use candidate::{parse_candidate, Candidate, CandidateParser, ParseOptions};
pub use config::{resolve_config, ConfigFragment, ConfigValue, ResolvedConfig, ResolvedTheme};
pub use context::{BuildOutput, BuildReport, CompilationContext, DependencyKind, SharedContext};
pub use error::{Result, TailorError};
pub use extract::{Extractor, RawContent};
pub use plugin::{from_fn, GeneratedRule, Plugin, PluginApi, Registry};
pub use stylesheet::{Layer, SortKey};
