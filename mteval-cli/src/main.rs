//! mteval command-line entry point

use clap::Parser;
use mteval_cli::commands::Commands;

/// Reproducible BLEU, chrF, TER and class-based F scores
#[derive(Debug, Parser)]
#[command(name = "mteval", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    cli.command.execute()
}
