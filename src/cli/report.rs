use std::path::PathBuf;

use clap::Parser;
use tracing::instrument;
use usage_report::{Config, LayoutRegistry, domain::DEFAULT_LINE_WRAP_LIMIT};

use super::terminal::{Colorize, terminal_width};

#[derive(Debug, Parser)]
pub struct Report {
    /// The snapshot to report on (.json, .toml, .yaml)
    snapshot: PathBuf,

    /// The layout to render with. Defaults to the configured layout.
    #[arg(long, short)]
    layout: Option<String>,

    /// List consuming projects by id
    #[arg(long, short)]
    details: bool,

    /// Wrap long lines at this many columns
    #[arg(long, value_name = "COLUMNS")]
    wrap: Option<usize>,
}

impl Report {
    /// The first of: the `--wrap` flag, the configured limit, the terminal
    /// width, the default.
    fn wrap_limit(&self, config: &Config) -> usize {
        self.wrap
            .or(config.line_wrap_limit())
            .or_else(terminal_width)
            .unwrap_or(DEFAULT_LINE_WRAP_LIMIT)
    }

    #[instrument(level = "debug", skip(config))]
    pub fn run(self, config: &Config) -> anyhow::Result<()> {
        let registry = LayoutRegistry::configured(self.wrap_limit(config), config.synthetic_unit_id());
        let name = self.layout.as_deref().unwrap_or_else(|| config.layout());
        let Some(layout) = registry.get(name) else {
            anyhow::bail!(
                "Unknown layout: '{name}'\nAvailable layouts: {}",
                registry.names().collect::<Vec<_>>().join(", ")
            );
        };

        let (report, failures) = super::analyze_snapshot(&self.snapshot)?;

        layout.generate_report(&report, self.details || config.verbose, &mut |line| {
            println!("{line}");
        });

        if failures > 0 {
            eprintln!(
                "\n{}",
                format!("⚠️  {failures} location(s) could not be analysed").warning()
            );
            eprintln!("{}", "Rerun with -v for details".dim());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[test]
    fn wrap_flag_takes_precedence() {
        let mut config = Config::default();
        config.set_line_wrap_limit(120);

        let report = Report::parse_from(["report", "snapshot.json", "--wrap", "80"]);
        assert_eq!(report.wrap_limit(&config), 80);

        let report = Report::parse_from(["report", "snapshot.json"]);
        assert_eq!(report.wrap_limit(&config), 120);
    }
}
