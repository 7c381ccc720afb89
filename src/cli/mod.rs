pub mod build;
pub mod candidates;
pub mod completions;
pub mod project;

use clap::{Parser, Subcommand};

/// tailor - utility-first CSS compiler
#[derive(Parser, Debug)]
#[command(name = "tailor")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate a stylesheet from the classes used in content files
    Build(build::BuildArgs),

    /// List class candidates found in content files
    Candidates(candidates::CandidatesArgs),

    /// Generate shell completions
    Completions(completions::CompletionsArgs),
}
