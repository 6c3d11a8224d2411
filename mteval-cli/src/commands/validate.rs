//! Validate command implementation

use crate::output::format_from_config;
use anyhow::Result;
use clap::Args;
use mteval_core::EvalConfig;
use std::path::PathBuf;

/// Arguments for the validate command
#[derive(Debug, Args)]
pub struct ValidateArgs {
    /// Path to the configuration file to validate
    #[arg(short, long, value_name = "FILE", required = true)]
    pub config: PathBuf,

    /// Print the effective configuration, defaults included
    #[arg(long)]
    pub show: bool,
}

impl ValidateArgs {
    /// Execute the validate command
    pub fn execute(&self) -> Result<()> {
        println!("Validating configuration: {}", self.config.display());

        match self.load() {
            Ok(config) => {
                println!("✓ Configuration is valid!");
                println!(
                    "  Metrics: {}",
                    config
                        .metrics
                        .iter()
                        .map(|kind| kind.name())
                        .collect::<Vec<_>>()
                        .join(", ")
                );
                println!("  Output format: {}", config.output.format);
                if self.show {
                    println!();
                    print!("{}", toml::to_string_pretty(&config)?);
                }
                Ok(())
            }
            Err(e) => {
                println!("✗ Configuration is invalid!");
                println!("  Error: {e}");
                Err(anyhow::anyhow!("Validation failed: {}", e))
            }
        }
    }

    fn load(&self) -> Result<EvalConfig> {
        let config = EvalConfig::from_file(&self.config)?;
        format_from_config(&config.output.format)?;
        Ok(config)
    }
}
