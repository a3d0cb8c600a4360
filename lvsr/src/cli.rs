//! CLI argument definitions using clap.

use clap::{Parser, Subcommand};
use eyre::Result;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "lvsr")]
#[command(about = "Score symbol sequences against a language-model transducer")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Walk the transducer over a symbol sequence and print its cost
    Score(crate::score::Args),

    /// Print the most probable symbols following a prefix
    Next(crate::next::Args),
}

/// Transducer and vocabulary arguments shared by every subcommand.
#[derive(clap::Args, Debug, Clone)]
pub struct FstArgs {
    /// Path to the language-model transducer
    pub fst: PathBuf,

    /// Vocabulary file, one network symbol per line
    #[arg(long)]
    pub vocab: PathBuf,

    /// Read the transducer in AT&T text format
    #[arg(long)]
    pub text: bool,

    /// End-of-sequence symbol, scored by the final weights
    #[arg(long, default_value = "</s>")]
    pub eos: String,
}

/// Execute CLI command - separated for testing.
pub fn run(cli: Cli) -> Result<()> {
    tracing::debug!(?cli, "parsed arguments");

    match cli.command {
        Commands::Score(args) => crate::score::execute(args.try_into()?),
        Commands::Next(args) => crate::next::execute(args.try_into()?),
    }
}
