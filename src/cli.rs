use std::path::{Path, PathBuf};

mod config;
mod explain;
mod layouts;
mod report;
mod terminal;

use clap::ArgAction;
use config::ConfigCommand;
use explain::Explain;
use layouts::Layouts;
use report::Report;
use tracing::instrument;
use usage_report::{Config, Snapshot, UsageReport};

#[derive(Debug, clap::Parser)]
#[command(version, about)]
pub struct Cli {
    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// The path to the configuration file
    #[arg(short, long, default_value = "usage-report.toml", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

impl Cli {
    pub fn run(self) -> anyhow::Result<()> {
        Self::setup_logging(self.verbose);

        self.command.run(&self.config)
    }

    fn setup_logging(verbosity: u8) {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

        let level = match verbosity {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        };

        let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into());

        // Reports go to stdout.
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_thread_names(false)
            .with_line_number(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

#[derive(Debug, clap::Parser)]
pub enum Command {
    /// Print the usage report of a snapshot
    Report(Report),

    /// Explain where a single unit comes from and who uses it
    Explain(Explain),

    /// List the available report layouts
    Layouts,

    /// Show or modify configuration settings
    Config(ConfigCommand),
}

impl Command {
    fn run(self, config_path: &Path) -> anyhow::Result<()> {
        match self {
            Self::Report(command) => command.run(&Config::load_or_default(config_path))?,
            Self::Explain(command) => command.run()?,
            Self::Layouts => Layouts::run(&Config::load_or_default(config_path)),
            Self::Config(command) => command.run(config_path)?,
        }
        Ok(())
    }
}

/// Loads a snapshot and computes its report.
///
/// Location failures are logged as warnings. Returns the report and the
/// number of failures.
#[instrument]
fn analyze_snapshot(path: &Path) -> anyhow::Result<(UsageReport, usize)> {
    use anyhow::Context;

    let snapshot = Snapshot::load(path)
        .with_context(|| format!("failed to load snapshot '{}'", path.display()))?;

    let mut failures = 0;
    let report = snapshot.analyze(&mut |location, error| {
        failures += 1;
        tracing::warn!(
            location = %location.describe(),
            "{:#}",
            anyhow::Error::new(error.clone())
        );
    })?;

    Ok((report, failures))
}
