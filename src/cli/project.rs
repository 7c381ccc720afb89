//! Project config file and content discovery.
//!
//! A project config is `tailor.config.json` or `tailor.config.yaml`. Apart
//! from the keys the compiler understands it may carry:
//!
//! ```yaml
//! content:        # paths scanned when none are given on the command line
//!   - src/
//!   - index.html
//! exclude:        # path patterns skipped while scanning
//!   - "**/vendor/*"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, trace};
use walkdir::WalkDir;

use crate::config::ConfigFragment;
use crate::error::{Result, TailorError};
use crate::extract::RawContent;

/// File names looked up in the working directory, in order.
pub const CONFIG_FILES: &[&str] = &["tailor.config.json", "tailor.config.yaml", "tailor.config.yml"];

/// Extensions scanned when walking a directory.
const CONTENT_EXTENSIONS: &[&str] = &[
    "html", "htm", "js", "jsx", "mjs", "ts", "tsx", "vue", "svelte", "astro", "md", "mdx", "php",
    "erb", "hbs", "twig", "rs", "py",
];

/// Directories never walked into.
const SKIPPED_DIRS: &[&str] = &["node_modules", "target", "dist", ".git"];

/// A loaded project: the config fragment and where to look for content.
#[derive(Debug, Default)]
pub struct Project {
    pub fragment: ConfigFragment,
    /// The config file, when one was found.
    pub config_path: Option<PathBuf>,
    pub content: Vec<PathBuf>,
    pub excludes: Vec<String>,
}

impl Project {
    /// Load `path`, or the first of [`CONFIG_FILES`] in `dir`. No config
    /// file at all gives the default project.
    pub fn load(path: Option<&Path>, dir: &Path) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => match find_config(dir) {
                Some(path) => path,
                None => {
                    debug!("no config file in {}", dir.display());
                    return Ok(Self::default());
                }
            },
        };

        let source = fs::read_to_string(&path).map_err(|e| TailorError::Io {
            path: path.clone(),
            message: format!("Failed to read config: {}", e),
        })?;
        let mut project = Self::parse(&source, &path)?;
        let base = path.parent().unwrap_or(Path::new(""));
        project.content = project.content.iter().map(|p| base.join(p)).collect();
        project.config_path = Some(path);
        Ok(project)
    }

    /// Parse a config document. JSON files go through `serde_json`, anything
    /// else through `serde_yaml`.
    pub fn parse(source: &str, path: &Path) -> Result<Self> {
        let is_json = path.extension().and_then(|e| e.to_str()) == Some("json");
        let value: serde_json::Value = if is_json {
            serde_json::from_str(source).map_err(|e| invalid_config(path, e.to_string()))?
        } else if source.trim().is_empty() {
            serde_json::Value::Object(Default::default())
        } else {
            serde_yaml::from_str(source).map_err(|e| invalid_config(path, e.to_string()))?
        };

        let serde_json::Value::Object(mut map) = value else {
            return Err(invalid_config(path, "expected a mapping at the top level".into()));
        };
        let content = string_list(map.remove("content"), "content", path)?;
        let excludes = string_list(map.remove("exclude"), "exclude", path)?;

        Ok(Self {
            fragment: ConfigFragment::from_json(serde_json::Value::Object(map))?,
            config_path: None,
            content: content.into_iter().map(PathBuf::from).collect(),
            excludes,
        })
    }

    /// Check if a path matches one of the exclude patterns.
    pub fn is_excluded(&self, path: &Path) -> bool {
        let path = path.to_string_lossy();
        self.excludes.iter().any(|pattern| matches_pattern(&path, pattern))
    }

    /// Every content file under `roots` (or the configured content paths
    /// when `roots` is empty), in walk order.
    pub fn content_files(&self, roots: &[PathBuf]) -> Vec<PathBuf> {
        let roots = if roots.is_empty() { &self.content } else { roots };
        let mut files = Vec::new();

        for root in roots {
            if root.is_file() {
                files.push(root.clone());
                continue;
            }
            let walker = WalkDir::new(root)
                .follow_links(true)
                .sort_by_file_name()
                .into_iter()
                .filter_entry(|entry| entry.depth() == 0 || !is_skipped_dir(entry.path()));
            for entry in walker.filter_map(|e| e.ok()) {
                let path = entry.path();
                if entry.file_type().is_dir() || self.is_excluded(path) || !is_content(path) {
                    continue;
                }
                files.push(path.to_path_buf());
            }
        }

        trace!("found {} content file(s)", files.len());
        files
    }
}

/// The first of [`CONFIG_FILES`] present in `dir`.
pub fn find_config(dir: &Path) -> Option<PathBuf> {
    CONFIG_FILES
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.is_file())
}

/// Read a content file, using its extension as the lexing hint.
pub fn read_content(path: &Path) -> Result<RawContent> {
    let content = fs::read_to_string(path).map_err(|e| TailorError::Io {
        path: path.to_path_buf(),
        message: format!("Failed to read file: {}", e),
    })?;
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    Ok(RawContent::new(content, extension))
}

fn is_content(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| CONTENT_EXTENSIONS.contains(&ext))
}

fn is_skipped_dir(path: &Path) -> bool {
    path.is_dir()
        && path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|name| SKIPPED_DIRS.contains(&name))
}

/// Simple glob matching: `*.ext`, `dir/*`, `**/dir/*`, or a substring.
fn matches_pattern(path: &str, pattern: &str) -> bool {
    if let Some(rest) = pattern.strip_prefix("**/") {
        return match rest.strip_suffix("/*") {
            Some(dir) => path.starts_with(&format!("{dir}/")) || path.contains(&format!("/{dir}/")),
            None => path.ends_with(rest),
        };
    }
    if let Some(suffix) = pattern.strip_prefix('*') {
        if !pattern.contains('/') {
            return path.ends_with(suffix);
        }
    }
    if let Some(dir) = pattern.strip_suffix("/*") {
        return path.starts_with(&format!("{dir}/")) || path.contains(&format!("/{dir}/"));
    }
    path.contains(pattern)
}

fn string_list(value: Option<serde_json::Value>, key: &str, path: &Path) -> Result<Vec<String>> {
    match value {
        None | Some(serde_json::Value::Null) => Ok(Vec::new()),
        Some(serde_json::Value::String(single)) => Ok(vec![single]),
        Some(serde_json::Value::Array(items)) => items
            .into_iter()
            .map(|item| match item {
                serde_json::Value::String(s) => Ok(s),
                other => Err(invalid_config(path, format!("`{key}` entries must be strings, found {other}"))),
            })
            .collect(),
        Some(other) => Err(invalid_config(path, format!("`{key}` must be a list, found {other}"))),
    }
}

fn invalid_config(path: &Path, message: String) -> TailorError {
    TailorError::Config {
        message: format!("Invalid config {}: {}", path.display(), message),
        help: Some("Check the config file syntax".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[test]
    fn test_parse_yaml_config() {
        let yaml = r##"
content:
  - src/
prefix: tw-
theme:
  extend:
    colors:
      brand: "#123456"
"##;
        let project = Project::parse(yaml, Path::new("tailor.config.yaml")).unwrap();
        assert_eq!(project.content, vec![PathBuf::from("src/")]);
        assert!(project.fragment.get("content").is_none());
        assert_eq!(
            project.fragment.get("prefix").and_then(|v| v.as_str()),
            Some("tw-")
        );
    }

    #[test]
    fn test_parse_json_config() {
        let json = r#"{ "content": "index.html", "exclude": ["*.min.js"], "separator": "_" }"#;
        let project = Project::parse(json, Path::new("tailor.config.json")).unwrap();
        assert_eq!(project.content, vec![PathBuf::from("index.html")]);
        assert_eq!(project.excludes, vec!["*.min.js"]);
    }

    #[test]
    fn test_parse_empty_yaml() {
        let project = Project::parse("", Path::new("tailor.config.yaml")).unwrap();
        assert!(project.content.is_empty());
    }

    #[test]
    fn test_invalid_config() {
        let err = Project::parse("[1, 2]", Path::new("tailor.config.json")).unwrap_err();
        assert!(matches!(err, TailorError::Config { .. }));
        let err = Project::parse("{ \"content\": 3 }", Path::new("tailor.config.json")).unwrap_err();
        assert!(matches!(err, TailorError::Config { .. }));
    }

    #[test]
    fn test_load_finds_config_and_resolves_content() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("tailor.config.yml"), "content: [pages]").unwrap();

        let project = Project::load(None, dir.path()).unwrap();
        assert_eq!(project.config_path, Some(dir.path().join("tailor.config.yml")));
        assert_eq!(project.content, vec![dir.path().join("pages")]);
    }

    #[test]
    fn test_load_without_config() {
        let dir = tempdir().unwrap();
        let project = Project::load(None, dir.path()).unwrap();
        assert!(project.config_path.is_none());
    }

    #[test]
    fn test_content_files() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("src/nested")).unwrap();
        fs::create_dir_all(root.join("node_modules/pkg")).unwrap();
        fs::write(root.join("src/index.html"), "").unwrap();
        fs::write(root.join("src/nested/app.tsx"), "").unwrap();
        fs::write(root.join("src/app.min.js"), "").unwrap();
        fs::write(root.join("src/logo.png"), "").unwrap();
        fs::write(root.join("node_modules/pkg/index.js"), "").unwrap();

        let project = Project {
            excludes: vec!["*.min.js".to_string()],
            ..Default::default()
        };
        let files = project.content_files(&[root.to_path_buf()]);
        assert_eq!(
            files,
            vec![root.join("src/index.html"), root.join("src/nested/app.tsx")]
        );
    }

    #[test]
    fn test_matches_pattern() {
        assert!(matches_pattern("a/b/file.bak", "*.bak"));
        assert!(matches_pattern("path/vendor/x.js", "**/vendor/*"));
        assert!(matches_pattern("vendor/x.js", "vendor/*"));
        assert!(matches_pattern("path/temp/file", "temp"));
        assert!(!matches_pattern("src/file.md", "**/vendor/*"));
    }

    #[test]
    fn test_read_content() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("page.html");
        fs::write(&path, "<p class=\"p-4\">").unwrap();
        let content = read_content(&path).unwrap();
        assert_eq!(content.extension, "html");
        assert!(read_content(&dir.path().join("missing.html")).is_err());
    }
}
