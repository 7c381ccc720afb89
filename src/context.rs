//! Compilation context: every cache a build touches, owned in one place.
//!
//! A [`CompilationContext`] is created per resolved config and reused
//! across rebuilds. Content lines, parsed candidates and generated rules
//! are all cached, so an incremental build only resolves candidates it has
//! not seen before. [`SharedContext`] serializes builds behind a mutex and
//! swaps in a fresh context when a config dependency changes.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use indexmap::IndexMap;
use log::{debug, info};
use serde::Serialize;

use crate::ast::css::{self, CssNode};
use crate::candidate::{CandidateParser, ParseOptions};
use crate::config::{resolve_config, ConfigFragment, ResolvedConfig};
use crate::error::Result;
use crate::extract::{Extractor, LexOptions, RawContent};
use crate::plugin::{generate, GeneratedRule, Registry};
use crate::stylesheet::{assemble, substitute_functions, RuleCache};

/// What a registered dependency path holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyKind {
    /// Scanned for candidates.
    Content,
    /// Config file; a change invalidates the whole context.
    Config,
    /// The input stylesheet.
    Stylesheet,
}

/// What changed in one build.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuildReport {
    /// Candidates that generated rules for the first time in this build.
    pub new_candidates: Vec<String>,
    /// Candidates that have generated rules across all builds.
    pub candidates: usize,
    /// Rules in the output, before collapsing.
    pub rules: usize,
    pub changed_files: Vec<PathBuf>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BuildOutput {
    pub nodes: Vec<CssNode>,
    pub report: BuildReport,
}

impl BuildOutput {
    /// The output stylesheet as plain CSS text.
    pub fn to_css(&self) -> String {
        css::to_css(&self.nodes)
    }
}

pub struct CompilationContext {
    config: Arc<ResolvedConfig>,
    registry: Registry,
    extractor: Extractor,
    parser: CandidateParser,
    rules: RuleCache,
    dependencies: IndexMap<PathBuf, DependencyKind>,
}

impl CompilationContext {
    /// Resolve `fragments` (highest precedence first) and register plugins.
    pub fn new(fragments: &[ConfigFragment]) -> Result<Self> {
        Self::from_config(resolve_config(fragments)?)
    }

    pub fn from_config(config: ResolvedConfig) -> Result<Self> {
        let config = Arc::new(config);
        let registry = Registry::build(Arc::clone(&config))?;
        let extractor = Extractor::new(LexOptions {
            separator: config.separator.clone(),
            variant_grouping: config.variant_grouping,
        });
        let parser = CandidateParser::new(ParseOptions {
            separator: config.separator.clone(),
            prefix: config.prefix.clone(),
            variant_grouping: config.variant_grouping,
        });

        Ok(Self {
            config,
            registry,
            extractor,
            parser,
            rules: RuleCache::new(),
            dependencies: IndexMap::new(),
        })
    }

    pub fn config(&self) -> &ResolvedConfig {
        &self.config
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn register_dependency(&mut self, path: impl Into<PathBuf>, kind: DependencyKind) {
        self.dependencies.insert(path.into(), kind);
    }

    pub fn dependencies(&self) -> impl Iterator<Item = (&Path, DependencyKind)> {
        self.dependencies
            .iter()
            .map(|(path, kind)| (path.as_path(), *kind))
    }

    /// Whether any of `changed` is a registered config dependency.
    pub fn is_stale(&self, changed: &[PathBuf]) -> bool {
        changed
            .iter()
            .any(|path| self.dependencies.get(path) == Some(&DependencyKind::Config))
    }

    /// Candidates extracted from `content`, in first-seen order.
    pub fn extract(&mut self, content: &RawContent) -> Vec<String> {
        self.extractor
            .extract(&content.content, &content.extension)
            .into_iter()
            .collect()
    }

    /// The rules for one raw candidate. Cached: asking twice returns the
    /// same allocation.
    pub fn resolve(&mut self, raw: &str) -> Arc<[GeneratedRule]> {
        if let Some(rules) = self.rules.get(raw) {
            return Arc::clone(rules);
        }
        let rules: Vec<GeneratedRule> = self
            .parser
            .parse(raw)
            .iter()
            .flat_map(|candidate| generate(&self.registry, candidate))
            .collect();
        self.rules.insert(raw, rules)
    }

    /// Candidates that generated rules, in discovery order.
    pub fn candidates(&self) -> impl Iterator<Item = &str> {
        self.rules.matched()
    }

    /// Build the output stylesheet for `css` plus everything discovered in
    /// `raw_content`, now and in earlier builds.
    pub fn build(
        &mut self,
        css: &str,
        raw_content: &[RawContent],
        changed_files: &[PathBuf],
    ) -> Result<BuildOutput> {
        let mut nodes = css::parse(css)?;
        substitute_functions(&mut nodes, &self.config.theme)?;

        let mut new_candidates = Vec::new();
        for content in raw_content {
            for raw in self.extract(content) {
                if self.rules.contains(&raw) {
                    continue;
                }
                if !self.resolve(&raw).is_empty() {
                    new_candidates.push(raw);
                }
            }
        }
        debug!(
            "{} new candidate(s), {} cached",
            new_candidates.len(),
            self.rules.len()
        );

        let buckets = self.rules.buckets();
        let nodes = assemble(&nodes, self.registry.base(), buckets);

        Ok(BuildOutput {
            nodes,
            report: BuildReport {
                new_candidates,
                candidates: self.rules.matched().count(),
                rules: self.rules.rule_count(),
                changed_files: changed_files.to_vec(),
            },
        })
    }
}

impl std::fmt::Debug for CompilationContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompilationContext")
            .field("config", &self.config)
            .field("candidates", &self.rules.len())
            .field("rules", &self.rules.rule_count())
            .field("dependencies", &self.dependencies)
            .finish_non_exhaustive()
    }
}

/// Produces the config fragments a fresh context is built from.
pub type ConfigLoader = Box<dyn Fn() -> Result<Vec<ConfigFragment>> + Send + Sync>;

/// A context shared between build triggers. Builds run one at a time.
pub struct SharedContext {
    loader: ConfigLoader,
    state: Mutex<SharedState>,
}

#[derive(Default)]
struct SharedState {
    context: Option<CompilationContext>,
    /// Kept outside the context so a failed reload cannot lose them.
    dependencies: IndexMap<PathBuf, DependencyKind>,
    /// A config change was seen but no fresh context has loaded yet.
    reload: bool,
}

impl SharedContext {
    pub fn new(loader: ConfigLoader) -> Self {
        Self {
            loader,
            state: Mutex::new(SharedState::default()),
        }
    }

    /// Register a dependency that should survive context rebuilds.
    pub fn register_dependency(&self, path: impl Into<PathBuf>, kind: DependencyKind) {
        let path = path.into();
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(context) = state.context.as_mut() {
            context.register_dependency(path.clone(), kind);
        }
        state.dependencies.insert(path, kind);
    }

    /// Registered dependencies in registration order.
    pub fn dependencies(&self) -> Vec<(PathBuf, DependencyKind)> {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state
            .dependencies
            .iter()
            .map(|(path, kind)| (path.clone(), *kind))
            .collect()
    }

    /// Build with the current context, first replacing it when one of
    /// `changed_files` is a config dependency.
    ///
    /// When the replacement fails to load, the previous context stays in
    /// place and the next build retries the reload.
    pub fn build(
        &self,
        css: &str,
        raw_content: &[RawContent],
        changed_files: &[PathBuf],
    ) -> Result<BuildOutput> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        if state
            .context
            .as_ref()
            .is_some_and(|context| context.is_stale(changed_files))
        {
            state.reload = true;
        }

        let context = match state.context.take() {
            Some(context) if !state.reload => context,
            previous => match self.load() {
                Ok(mut fresh) => {
                    if previous.is_some() {
                        info!("config changed, rebuilt context");
                    }
                    fresh.dependencies = state.dependencies.clone();
                    state.reload = false;
                    fresh
                }
                Err(err) => {
                    state.context = previous;
                    return Err(err);
                }
            },
        };

        state.context.insert(context).build(css, raw_content, changed_files)
    }

    fn load(&self) -> Result<CompilationContext> {
        let fragments = (self.loader)()?;
        CompilationContext::new(&fragments)
    }
}

impl std::fmt::Debug for SharedContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedContext").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TailorError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn no_preflight() -> ConfigFragment {
        ConfigFragment::from_json(json!({ "corePlugins": { "preflight": false } })).unwrap()
    }

    fn html(content: &str) -> RawContent {
        RawContent::new(content, "html")
    }

    #[test]
    fn test_resolve_is_cached() {
        let mut context = CompilationContext::new(&[no_preflight()]).unwrap();
        let first = context.resolve("p-4");
        let second = context.resolve("p-4");
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.len(), 1);
        assert!(context.resolve("not-a-utility").is_empty());
    }

    #[test]
    fn test_build_output() {
        let mut context = CompilationContext::new(&[no_preflight()]).unwrap();
        let output = context
            .build(
                "@tailwind utilities;",
                &[html(r#"<div class="hover:p-4 p-4 bg-red-500">"#)],
                &[],
            )
            .unwrap();
        insta::assert_snapshot!(output.to_css(), @r"
        .bg-red-500 {
          background-color: #ef4444;
        }
        .p-4 {
          padding: 1rem;
        }
        .hover\:p-4:hover {
          padding: 1rem;
        }
        ");
    }

    #[test]
    fn test_incremental_report() {
        let mut context = CompilationContext::new(&[no_preflight()]).unwrap();
        let first = context
            .build("@tailwind utilities;", &[html(r#"<p class="p-4 m-2">"#)], &[])
            .unwrap();
        assert_eq!(first.report.new_candidates, vec!["p-4", "m-2"]);

        let changed = vec![PathBuf::from("index.html")];
        let second = context
            .build(
                "@tailwind utilities;",
                &[html(r#"<p class="p-4 m-2 mt-1">"#)],
                &changed,
            )
            .unwrap();
        assert_eq!(
            second.report,
            BuildReport {
                new_candidates: vec!["mt-1".to_string()],
                candidates: 3,
                rules: 3,
                changed_files: changed,
            }
        );
        assert_eq!(context.candidates().collect::<Vec<_>>(), vec!["p-4", "m-2", "mt-1"]);
    }

    #[test]
    fn test_theme_function_in_input() {
        let mut context = CompilationContext::new(&[no_preflight()]).unwrap();
        let output = context
            .build(".card { padding: theme(spacing.2); }", &[], &[])
            .unwrap();
        assert_eq!(output.to_css(), ".card {\n  padding: 0.5rem;\n}\n");
    }

    #[test]
    fn test_staleness() {
        let mut context = CompilationContext::new(&[no_preflight()]).unwrap();
        context.register_dependency("tailor.config.json", DependencyKind::Config);
        context.register_dependency("index.html", DependencyKind::Content);
        assert!(!context.is_stale(&[PathBuf::from("index.html")]));
        assert!(context.is_stale(&[PathBuf::from("tailor.config.json")]));
    }

    #[test]
    fn test_shared_context_reloads_on_config_change() {
        let loads = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&loads);
        let shared = SharedContext::new(Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(vec![no_preflight()])
        }));
        shared.register_dependency("tailor.config.json", DependencyKind::Config);

        let content = [html(r#"<p class="p-4">"#)];
        let first = shared.build("@tailwind utilities;", &content, &[]).unwrap();
        assert_eq!(first.report.new_candidates, vec!["p-4"]);

        let second = shared
            .build("@tailwind utilities;", &content, &[PathBuf::from("index.html")])
            .unwrap();
        assert!(second.report.new_candidates.is_empty());
        assert_eq!(loads.load(Ordering::SeqCst), 1);

        let third = shared
            .build(
                "@tailwind utilities;",
                &content,
                &[PathBuf::from("tailor.config.json")],
            )
            .unwrap();
        assert_eq!(third.report.new_candidates, vec!["p-4"]);
        assert_eq!(loads.load(Ordering::SeqCst), 2);
        assert_eq!(first.nodes, third.nodes);
    }

    /// A loader whose `fail_on`th call (1-based) returns an error.
    fn flaky_loader(fail_on: usize) -> (Arc<AtomicUsize>, ConfigLoader) {
        let loads = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&loads);
        let loader: ConfigLoader = Box::new(move || {
            if counter.fetch_add(1, Ordering::SeqCst) + 1 == fail_on {
                Err(TailorError::config("broken config"))
            } else {
                Ok(vec![no_preflight()])
            }
        });
        (loads, loader)
    }

    fn config_dependency() -> Vec<(PathBuf, DependencyKind)> {
        vec![(PathBuf::from("tailor.config.json"), DependencyKind::Config)]
    }

    #[test]
    fn test_failed_reload_keeps_dependencies() {
        let (loads, loader) = flaky_loader(2);
        let shared = SharedContext::new(loader);
        shared.register_dependency("tailor.config.json", DependencyKind::Config);

        let content = [html(r#"<p class="p-4">"#)];
        let changed = [PathBuf::from("tailor.config.json")];
        let first = shared.build("@tailwind utilities;", &content, &[]).unwrap();

        assert!(shared.build("@tailwind utilities;", &content, &changed).is_err());
        assert_eq!(shared.dependencies(), config_dependency());

        // The failed reload is retried even without a new change.
        let recovered = shared.build("@tailwind utilities;", &content, &[]).unwrap();
        assert_eq!(loads.load(Ordering::SeqCst), 3);
        assert_eq!(recovered.report.new_candidates, vec!["p-4"]);
        assert_eq!(first.nodes, recovered.nodes);
        assert_eq!(shared.dependencies(), config_dependency());

        // The config dependency still triggers reloads after recovery.
        shared.build("@tailwind utilities;", &content, &changed).unwrap();
        assert_eq!(loads.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn test_dependency_registered_before_failed_first_load() {
        let (loads, loader) = flaky_loader(1);
        let shared = SharedContext::new(loader);
        shared.register_dependency("tailor.config.json", DependencyKind::Config);
        assert_eq!(loads.load(Ordering::SeqCst), 0);

        let content = [html(r#"<p class="m-2">"#)];
        assert!(shared.build("@tailwind utilities;", &content, &[]).is_err());
        assert_eq!(shared.dependencies(), config_dependency());

        let output = shared.build("@tailwind utilities;", &content, &[]).unwrap();
        assert_eq!(output.report.new_candidates, vec!["m-2"]);
        assert_eq!(shared.dependencies(), config_dependency());

        shared
            .build(
                "@tailwind utilities;",
                &content,
                &[PathBuf::from("tailor.config.json")],
            )
            .unwrap();
        assert_eq!(loads.load(Ordering::SeqCst), 3);
    }
}
