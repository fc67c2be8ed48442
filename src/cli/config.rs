use std::path::Path;

use tracing::instrument;
use usage_report::{Config, LayoutRegistry};

use super::terminal::Colorize;

#[derive(Debug, clap::Parser)]
pub struct ConfigCommand {
    #[command(subcommand)]
    command: Action,
}

#[derive(Debug, clap::Parser)]
enum Action {
    /// Show current configuration
    Show,

    /// Set a configuration value
    Set {
        /// Configuration key to set
        key: String,

        /// Value to set
        value: String,
    },
}

impl ConfigCommand {
    #[instrument]
    pub fn run(self, path: &Path) -> anyhow::Result<()> {
        let mut config = if path.exists() {
            Config::load(path).map_err(|e| anyhow::anyhow!("{e}"))?
        } else {
            Config::default()
        };

        match self.command {
            Action::Show => {
                println!("Configuration:");
                println!("  layout: {}", config.layout());
                match config.line_wrap_limit() {
                    Some(limit) => println!("  line_wrap_limit: {limit}"),
                    None => println!("  line_wrap_limit: {}", "terminal width".dim()),
                }
                println!("  synthetic_unit_id: {}", config.synthetic_unit_id());
                println!("  verbose: {}", config.verbose);
            }
            Action::Set { key, value } => {
                match key.as_str() {
                    "layout" => {
                        let registry = LayoutRegistry::default();
                        if registry.get(&value).is_none() {
                            anyhow::bail!(
                                "Unknown layout: '{value}'\nAvailable layouts: {}",
                                registry.names().collect::<Vec<_>>().join(", ")
                            );
                        }
                        config.set_layout(value);
                    }
                    "line_wrap_limit" => {
                        let limit = value
                            .parse()
                            .map_err(|_| anyhow::anyhow!("Value must be a number of columns"))?;
                        config.set_line_wrap_limit(limit);
                    }
                    "verbose" => {
                        config.verbose = value
                            .parse()
                            .map_err(|_| anyhow::anyhow!("Value must be 'true' or 'false'"))?;
                    }
                    _ => {
                        anyhow::bail!(
                            "Unknown configuration key: '{key}'\nSupported keys: layout, \
                             line_wrap_limit, verbose",
                        );
                    }
                }

                config.save(path).map_err(|e| anyhow::anyhow!("{e}"))?;
                println!("{}", format!("Updated {key}").success());
            }
        }

        Ok(())
    }
}
