//! CLI command implementations

use crate::output::OutputFormat;
use anyhow::Result;
use clap::Subcommand;
use mteval_core::metrics::Smoothing;
use mteval_core::{MetricKind, TokenizerKind};
use std::io::{self, Write};

pub mod generate_config;
pub mod score;
pub mod validate;

/// Available CLI commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Score system outputs against reference translations
    Score(score::ScoreArgs),

    /// List available components
    List {
        #[command(subcommand)]
        subcommand: ListCommands,
    },

    /// Write a commented configuration file with every default
    GenerateConfig(generate_config::GenerateConfigArgs),

    /// Check a configuration file
    Validate(validate::ValidateArgs),
}

impl Commands {
    /// Execute the selected command
    pub fn execute(&self) -> Result<()> {
        match self {
            Commands::Score(args) => args.execute(),
            Commands::List { subcommand } => subcommand.execute(),
            Commands::GenerateConfig(args) => args.execute(),
            Commands::Validate(args) => args.execute(),
        }
    }
}

/// List subcommands
#[derive(Debug, Subcommand)]
pub enum ListCommands {
    /// List available metrics
    Metrics,

    /// List available tokenizers
    Tokenizers,

    /// List BLEU smoothing methods
    Smoothing,

    /// List available output formats
    Formats,
}

impl ListCommands {
    /// Print the listing to stdout
    pub fn execute(&self) -> Result<()> {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        self.write_to(&mut out)?;
        out.flush()?;
        Ok(())
    }

    fn write_to(&self, out: &mut impl Write) -> Result<()> {
        match self {
            ListCommands::Metrics => {
                writeln!(out, "Available metrics:")?;
                for kind in MetricKind::ALL {
                    writeln!(out, "  {:<10} {}", kind.name(), kind.description())?;
                }
            }
            ListCommands::Tokenizers => {
                writeln!(out, "Available tokenizers:")?;
                for kind in TokenizerKind::ALL {
                    writeln!(out, "  {:<10} {}", kind.name(), kind.description())?;
                }
            }
            ListCommands::Smoothing => {
                writeln!(out, "BLEU smoothing methods:")?;
                for name in Smoothing::NAMES {
                    writeln!(out, "  {name}")?;
                }
            }
            ListCommands::Formats => {
                writeln!(out, "Available output formats:")?;
                for format in OutputFormat::ALL {
                    writeln!(out, "  {:<10} {}", format.name(), format.description())?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(command: ListCommands) -> String {
        let mut out = Vec::new();
        command.write_to(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_commands_debug_format() {
        let list_cmd = Commands::List {
            subcommand: ListCommands::Metrics,
        };

        let debug_str = format!("{:?}", list_cmd);
        assert!(debug_str.contains("List"));
        assert!(debug_str.contains("Metrics"));
    }

    #[test]
    fn test_list_metrics() {
        let out = listing(ListCommands::Metrics);
        for name in ["bleu", "chrf", "ter", "macrof", "microf"] {
            assert!(out.contains(name), "missing {name}");
        }
    }

    #[test]
    fn test_list_tokenizers() {
        let out = listing(ListCommands::Tokenizers);
        for name in ["none", "13a", "intl", "char"] {
            assert!(out.contains(name), "missing {name}");
        }
    }

    #[test]
    fn test_list_smoothing_and_formats() {
        assert!(listing(ListCommands::Smoothing).contains("add-k"));

        let formats = listing(ListCommands::Formats);
        assert!(formats.contains("text"));
        assert!(formats.contains("json"));
        assert!(formats.contains("markdown"));
    }
}
