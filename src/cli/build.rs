//! Build command implementation.
//!
//! Scans content files for candidates and writes the generated stylesheet.

use std::fs;
use std::path::{Path, PathBuf};

use clap::Args;
use log::debug;

use crate::context::{BuildOutput, CompilationContext, DependencyKind};
use crate::error::{Result, TailorError};
use crate::output::{display_path, plural, Printer};

use super::project::{read_content, Project};

/// Stylesheet used when no `--input` is given.
pub const DEFAULT_INPUT: &str = "@tailwind base;\n@tailwind components;\n@tailwind utilities;\n";

/// Generate a stylesheet from the classes used in content files
#[derive(Args, Debug)]
pub struct BuildArgs {
    /// Content files or directories to scan (defaults to the config's `content`)
    pub paths: Vec<PathBuf>,

    /// Config file (defaults to tailor.config.{json,yaml,yml} in the working directory)
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Input stylesheet holding the @tailwind markers
    #[arg(long, short)]
    pub input: Option<PathBuf>,

    /// Output file (defaults to stdout)
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// Write a JSON build report to this file
    #[arg(long)]
    pub report: Option<PathBuf>,
}

pub fn run(args: BuildArgs) -> Result<()> {
    let printer = Printer::new();
    let cwd = std::env::current_dir()?;
    let output = build(&args, &cwd)?;
    let css = output.to_css();

    match &args.output {
        Some(path) => {
            write_file(path, &css)?;
            printer.status(
                "Compiled",
                &format!(
                    "{} into {}",
                    plural(output.report.candidates, "candidate", "candidates"),
                    display_path(path)
                ),
            );
        }
        None => print!("{css}"),
    }

    if let Some(path) = &args.report {
        let json = serde_json::to_string_pretty(&output.report).map_err(|e| TailorError::Io {
            path: path.clone(),
            message: format!("Failed to serialize report: {}", e),
        })?;
        write_file(path, &json)?;
    }

    Ok(())
}

/// Run one build relative to `cwd`.
pub fn build(args: &BuildArgs, cwd: &Path) -> Result<BuildOutput> {
    let project = Project::load(args.config.as_deref(), cwd)?;
    let files = project.content_files(&args.paths);
    if files.is_empty() {
        Printer::new().warning("Warning", "no content files found; only base styles will be emitted");
    }

    let mut context = CompilationContext::new(&[project.fragment.clone()])?;
    if let Some(path) = &project.config_path {
        context.register_dependency(path, DependencyKind::Config);
    }

    let css = match &args.input {
        Some(path) => {
            context.register_dependency(path, DependencyKind::Stylesheet);
            fs::read_to_string(path).map_err(|e| TailorError::Io {
                path: path.clone(),
                message: format!("Failed to read stylesheet: {}", e),
            })?
        }
        None => DEFAULT_INPUT.to_string(),
    };

    let mut contents = Vec::with_capacity(files.len());
    for file in &files {
        context.register_dependency(file, DependencyKind::Content);
        contents.push(read_content(file)?);
    }
    debug!("scanning {}", plural(contents.len(), "file", "files"));

    context.build(&css, &contents, &[])
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| TailorError::Io {
            path: parent.to_path_buf(),
            message: format!("Failed to create output directory: {}", e),
        })?;
    }
    fs::write(path, contents).map_err(|e| TailorError::Io {
        path: path.to_path_buf(),
        message: format!("Failed to write file: {}", e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    fn args(paths: Vec<PathBuf>) -> BuildArgs {
        BuildArgs {
            paths,
            config: None,
            input: None,
            output: None,
            report: None,
        }
    }

    #[test]
    fn test_build_writes_output_and_report() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::write(
            root.join("tailor.config.json"),
            r#"{ "content": ["pages"], "corePlugins": { "preflight": false } }"#,
        )
        .unwrap();
        fs::create_dir_all(root.join("pages")).unwrap();
        fs::write(root.join("pages/index.html"), r#"<main class="p-4 md:p-8">"#).unwrap();
        fs::write(root.join("app.css"), "@tailwind utilities;\n").unwrap();

        let output_path = root.join("dist/app.css");
        let report_path = root.join("dist/report.json");
        let mut build_args = args(Vec::new());
        build_args.config = Some(root.join("tailor.config.json"));
        build_args.input = Some(root.join("app.css"));
        build_args.output = Some(output_path.clone());
        build_args.report = Some(report_path.clone());
        run(build_args).unwrap();

        let css = fs::read_to_string(&output_path).unwrap();
        insta::assert_snapshot!(css, @r"
        .p-4 {
          padding: 1rem;
        }
        @media (min-width: 768px) {
          .md\:p-8 {
            padding: 2rem;
          }
        }
        ");

        let report: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&report_path).unwrap()).unwrap();
        assert_eq!(report["new_candidates"], serde_json::json!(["p-4", "md:p-8"]));
        assert_eq!(report["candidates"], 2);
    }

    #[test]
    fn test_build_without_config_uses_defaults() {
        let dir = tempdir().unwrap();
        let page = dir.path().join("page.html");
        fs::write(&page, r#"<div class="container text-center">"#).unwrap();

        let output = build(&args(vec![page]), dir.path()).unwrap();
        let css = output.to_css();
        assert!(css.contains("*, ::before, ::after {"));
        assert!(css.contains(".container {\n  width: 100%;\n}"));
        assert!(css.contains(".text-center {\n  text-align: center;\n}"));
        assert_eq!(output.report.new_candidates, vec!["container", "text-center"]);
    }

    #[test]
    fn test_build_missing_input() {
        let dir = tempdir().unwrap();
        let mut build_args = args(Vec::new());
        build_args.input = Some(dir.path().join("missing.css"));
        let err = build(&build_args, dir.path()).unwrap_err();
        assert!(matches!(err, TailorError::Io { .. }));
    }
}
