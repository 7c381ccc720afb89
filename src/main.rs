use clap::Parser;
use miette::Result;
use tailor::cli::{Cli, Commands};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build(args) => tailor::cli::build::run(args)?,
        Commands::Candidates(args) => tailor::cli::candidates::run(args)?,
        Commands::Completions(args) => tailor::cli::completions::run(args)?,
    }

    Ok(())
}
