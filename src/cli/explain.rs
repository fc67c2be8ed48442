use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::instrument;
use usage_report::{Unit, domain::Version};

use super::terminal::Colorize;

#[derive(Debug, Parser)]
pub struct Explain {
    /// The snapshot the unit was discovered in
    snapshot: PathBuf,

    /// The unit id
    unit: String,

    /// The unit version. Defaults to the highest discovered version.
    #[arg(long)]
    version: Option<String>,
}

impl Explain {
    #[instrument(level = "debug")]
    pub fn run(self) -> anyhow::Result<()> {
        let version: Option<Version> = self
            .version
            .as_deref()
            .map(str::parse)
            .transpose()
            .context("invalid version")?;

        let (report, _) = super::analyze_snapshot(&self.snapshot)?;

        let Some(unit) = report.find_unit(&self.unit, version.as_ref()) else {
            anyhow::bail!("Unit {} was not discovered in any target", self.unit);
        };

        println!("{}", unit.info());

        let projects = report.projects_using(unit);
        if !projects.is_empty() {
            println!("  {} by {}", "Used".success(), projects.join(", "));
        } else if report.is_used_indirectly(unit) {
            println!(
                "  {} through {}",
                "Indirectly used".success(),
                report.indirect_usage_chain(unit)
            );
        } else {
            println!("  {}", "Unused".warning());
        }

        println!("\nProvided by:");
        for provenance in report.provenance(unit).into_iter().flatten() {
            let how = provenance.parent().map_or_else(
                || "declared".to_string(),
                |parent| format!("required by {parent}"),
            );
            println!(
                "  • {} > {} {}",
                provenance.target(),
                provenance.location(),
                format!("({how})").dim()
            );
        }

        if !report.is_root_unit(unit) {
            println!("\nPath from root: {}", join(&report.shortest_path_from_root(unit)));
        }

        let children = report.children(unit);
        if !children.is_empty() {
            println!("\nRequires:");
            for child in children {
                println!("  • {child}");
            }
        }

        Ok(())
    }
}

fn join(units: &[&Unit]) -> String {
    units
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" > ")
}
