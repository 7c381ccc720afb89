//! Candidate extraction from raw content.
//!
//! Extraction is deliberately over-inclusive: anything that might be a class
//! is returned, and the candidate parser and utility resolver discard what
//! does not match. Missing a real class is a bug; returning junk is not.
//!
//! Each line runs through two lexers ([`lexer::broad_pass`] and
//! [`lexer::fallback_pass`]). Results are cached per distinct trimmed line
//! for the lifetime of the [`Extractor`], so unchanged lines in a rescanned
//! file cost one hash lookup.

pub mod lexer;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use indexmap::IndexSet;
use log::trace;

pub use lexer::{clip_at_balanced_parens, LexOptions};

/// How a file's contents are lexed, chosen from its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentKind {
    /// HTML-like templates: trailing `>` and `/>` residue is stripped.
    Markup,
    Other,
}

impl ContentKind {
    pub fn from_extension(extension: &str) -> Self {
        match extension.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "html" | "htm" | "vue" | "svelte" | "astro" | "xml" | "erb" | "hbs" | "php" => {
                ContentKind::Markup
            }
            _ => ContentKind::Other,
        }
    }
}

/// Text chunk handed to a build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawContent {
    pub content: String,
    pub extension: String,
}

impl RawContent {
    pub fn new(content: impl Into<String>, extension: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            extension: extension.into(),
        }
    }
}

/// Cached candidate extractor.
#[derive(Debug, Default)]
pub struct Extractor {
    options: LexOptions,
    line_cache: HashMap<(ContentKind, String), Arc<[String]>>,
}

impl Extractor {
    pub fn new(options: LexOptions) -> Self {
        Self {
            options,
            line_cache: HashMap::new(),
        }
    }

    pub fn options(&self) -> &LexOptions {
        &self.options
    }

    /// Number of distinct lines cached so far.
    pub fn cached_lines(&self) -> usize {
        self.line_cache.len()
    }

    /// Extract candidates from one chunk, in first-seen order.
    pub fn extract(&mut self, content: &str, extension: &str) -> IndexSet<String> {
        let kind = ContentKind::from_extension(extension);
        let mut seen_lines: HashSet<&str> = HashSet::new();
        let mut candidates = IndexSet::new();

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || !seen_lines.insert(line) {
                continue;
            }
            let found = self.extract_line(line, kind);
            candidates.extend(found.iter().cloned());
        }

        trace!(
            "extracted {} candidate(s) from .{} content",
            candidates.len(),
            extension
        );
        candidates
    }

    fn extract_line(&mut self, line: &str, kind: ContentKind) -> Arc<[String]> {
        let key = (kind, line.to_string());
        if let Some(cached) = self.line_cache.get(&key) {
            return cached.clone();
        }
        let found: Arc<[String]> = extract_line(line, kind, &self.options).into();
        self.line_cache.insert(key, found.clone());
        found
    }
}

/// Extract candidates from one line without caching.
pub fn extract_line(line: &str, kind: ContentKind, options: &LexOptions) -> Vec<String> {
    let mut found: IndexSet<String> = IndexSet::new();
    for candidate in lexer::broad_pass(line, options)
        .into_iter()
        .chain(lexer::fallback_pass(line))
    {
        let candidate = match kind {
            ContentKind::Markup => strip_markup_residue(&candidate).to_string(),
            ContentKind::Other => candidate,
        };
        if !candidate.is_empty() {
            found.insert(candidate);
        }
    }
    found.into_iter().collect()
}

fn strip_markup_residue(candidate: &str) -> &str {
    candidate
        .strip_suffix("/>")
        .or_else(|| candidate.strip_suffix('>'))
        .unwrap_or(candidate)
}
