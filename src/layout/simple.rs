use std::collections::{BTreeSet, HashSet};

use super::{ReportLayout, write_header};
use crate::domain::{Unit, UsageReport};

/// A flat layout: one line per target and one line per root unit.
///
/// Root units are visited in unit order. Once a root has been reported, all
/// of its transitive children count as reported too, so a dependency shared
/// by several roots is explained only once.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleLayout;

impl SimpleLayout {
    fn consumers<'a>(report: &'a UsageReport, units: &[&Unit], verbose: bool) -> String {
        let projects: BTreeSet<&'a str> = units
            .iter()
            .flat_map(|unit| report.projects_using(unit))
            .collect();

        if verbose {
            projects.into_iter().collect::<Vec<_>>().join(", ")
        } else {
            format!("{} project(s)", projects.len())
        }
    }
}

impl ReportLayout for SimpleLayout {
    fn name(&self) -> &str {
        "simple"
    }

    fn generate_report(&self, report: &UsageReport, verbose: bool, sink: &mut dyn FnMut(String)) {
        write_header(report, sink);

        let mut targets: Vec<_> = report.target_files().collect();
        targets.sort_by(|a, b| a.origin().cmp(b.origin()));
        for target in targets {
            let units = report
                .target_content(target.origin())
                .map_or(0, |content| content.query_all().len());
            sink(format!(
                "{} contains {units} units from {} locations",
                target.origin(),
                target.locations().len()
            ));
        }

        let mut reported: HashSet<&Unit> = HashSet::new();
        for unit in report.root_units() {
            if reported.contains(unit) {
                continue;
            }

            let provided_by = report.provided_by_description(unit);
            let children = report.all_children(unit);

            if report.is_used(unit) {
                sink(format!(
                    "The unit {unit} is used by {} (provided by {provided_by})",
                    Self::consumers(report, &[unit], verbose)
                ));
            } else if report.is_used_indirectly(unit) {
                let used: Vec<&Unit> = children
                    .iter()
                    .copied()
                    .filter(|child| report.is_used(child))
                    .collect();
                sink(format!(
                    "The unit {unit} is INDIRECTLY used by {} through {} (provided by {provided_by})",
                    Self::consumers(report, &used, verbose),
                    report.indirect_usage_chain(unit)
                ));
            } else {
                sink(format!(
                    "The unit {unit} is UNUSED and can potentially be removed (provided by {provided_by})"
                ));
            }

            reported.insert(unit);
            reported.extend(children);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        domain::{
            TargetDefinition,
            report::tests::{analyze, requiring, unit, unit_location},
        },
        resolver::{MemoryContent, MemoryResolver},
    };

    fn render(report: &UsageReport, verbose: bool) -> Vec<String> {
        let mut lines = Vec::new();
        SimpleLayout.generate_report(report, verbose, &mut |line| lines.push(line));
        lines
    }

    fn chain_report(used: bool) -> UsageReport {
        let a = requiring(unit("A", "1.0.0"), &["B"]);
        let b = requiring(unit("B", "1.0.0"), &["C"]);
        let c = unit("C", "1.0.0");
        let mut resolver = MemoryResolver::new();
        let target = resolver.insert(
            TargetDefinition::new(
                "main.target",
                vec![
                    unit_location("https://repo.example/main", &[("A", None)]),
                    unit_location("https://repo.example/extra", &[("B", None)]),
                ],
            ),
            MemoryContent::new([a, b, c.clone()]),
        );

        let mut report = UsageReport::new();
        if used {
            report.record_project_usage("app", [c.clone()]);
            report.record_project_usage("lib", [c]);
        }
        analyze(&mut report, &resolver, target);
        report
    }

    #[test]
    fn reports_indirect_usage() {
        let lines = render(&chain_report(true), false);

        assert_eq!(
            lines,
            vec![
                "###### DEPENDENCIES USAGE REPORT #######",
                "Your build uses 1 dependencies.",
                "Your build uses 1 target file(s).",
                "",
                "main.target contains 3 units from 2 locations",
                "The unit A 1.0.0 is INDIRECTLY used by 2 project(s) through A 1.0.0 > B 1.0.0 > C 1.0.0 \
                 (provided by main.target > https://repo.example/main)",
            ]
        );
    }

    #[test]
    fn verbose_lists_projects() {
        let lines = render(&chain_report(true), true);
        assert!(lines[5].starts_with("The unit A 1.0.0 is INDIRECTLY used by app, lib through"));
    }

    #[test]
    fn unused_root_is_reported_once() {
        let lines = render(&chain_report(false), false);

        let unused: Vec<_> = lines.iter().filter(|line| line.contains("UNUSED")).collect();
        assert_eq!(unused.len(), 1);
        assert!(unused[0].starts_with("The unit A 1.0.0 is UNUSED"));
        assert!(!lines.iter().any(|line| line.starts_with("The unit B")));
    }

    #[test]
    fn direct_usage() {
        let x = unit("X", "2.0.0");
        let mut resolver = MemoryResolver::new();
        let target = resolver.insert(
            TargetDefinition::new("t", vec![unit_location("repo", &[("X", None)])]),
            MemoryContent::new([x.clone()]),
        );
        let mut report = UsageReport::new();
        report.record_project_usage("app", [x]);
        analyze(&mut report, &resolver, Arc::clone(&target));

        let lines = render(&report, false);
        assert_eq!(
            lines.last().map(String::as_str),
            Some("The unit X 2.0.0 is used by 1 project(s) (provided by t > repo)")
        );
    }
}
