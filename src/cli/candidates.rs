//! Candidates command: list the classes found in content files.

use std::path::{Path, PathBuf};

use clap::Args;
use indexmap::IndexSet;

use crate::context::CompilationContext;
use crate::error::{Result, TailorError};

use super::project::{read_content, Project};

/// List class candidates found in content files
#[derive(Args, Debug)]
pub struct CandidatesArgs {
    /// Content files or directories to scan (defaults to the config's `content`)
    pub paths: Vec<PathBuf>,

    /// Config file (defaults to tailor.config.{json,yaml,yml} in the working directory)
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Include candidates that do not generate any CSS
    #[arg(long)]
    pub all: bool,

    /// Print a JSON array instead of one candidate per line
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: CandidatesArgs) -> Result<()> {
    let cwd = std::env::current_dir()?;
    let candidates = collect(&args, &cwd)?;

    if args.json {
        let json = serde_json::to_string_pretty(&candidates).map_err(|e| TailorError::Io {
            path: PathBuf::from("<stdout>"),
            message: format!("Failed to serialize candidates: {}", e),
        })?;
        println!("{json}");
    } else {
        for candidate in &candidates {
            println!("{candidate}");
        }
    }
    Ok(())
}

/// Candidates in discovery order. Without `--all`, only those that
/// generate rules.
pub fn collect(args: &CandidatesArgs, cwd: &Path) -> Result<Vec<String>> {
    let project = Project::load(args.config.as_deref(), cwd)?;
    let mut context = CompilationContext::new(&[project.fragment.clone()])?;

    let mut found = IndexSet::new();
    for file in project.content_files(&args.paths) {
        let content = read_content(&file)?;
        for raw in context.extract(&content) {
            if args.all || !context.resolve(&raw).is_empty() {
                found.insert(raw);
            }
        }
    }
    Ok(found.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_collect_matched_candidates() {
        let dir = tempdir().unwrap();
        let page = dir.path().join("index.html");
        fs::write(&page, r#"<a class="hover:bg-red-500 px-2 nothing-here">"#).unwrap();

        let mut args = CandidatesArgs {
            paths: vec![page],
            config: None,
            all: false,
            json: false,
        };
        assert_eq!(collect(&args, dir.path()).unwrap(), vec!["hover:bg-red-500", "px-2"]);

        args.all = true;
        let all = collect(&args, dir.path()).unwrap();
        assert!(all.contains(&"nothing-here".to_string()));
        assert!(all.contains(&"px-2".to_string()));
    }

    #[test]
    fn test_collect_honours_prefix() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("tailor.config.yaml"), "prefix: tw-\n").unwrap();
        let page = dir.path().join("index.html");
        fs::write(&page, r#"<a class="tw-p-2 p-2">"#).unwrap();

        let args = CandidatesArgs {
            paths: vec![page],
            config: None,
            all: false,
            json: false,
        };
        assert_eq!(collect(&args, dir.path()).unwrap(), vec!["tw-p-2"]);
    }
}
