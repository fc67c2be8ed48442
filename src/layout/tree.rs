use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use super::{ReportLayout, format_unit, is_feature, plural, wrap_line, write_header};
use crate::domain::{
    DEFAULT_LINE_WRAP_LIMIT, DEFAULT_SYNTHETIC_UNIT_ID, Location, TargetDefinition, Unit,
    UsageReport,
};

/// Maximum number of project ids listed per unit in verbose mode.
const MAX_PROJECTS_LISTED: usize = 5;

/// Indent of continuation lines of a wrapped location label.
const LOCATION_INDENT: &str = "    ";

/// A hierarchical layout grouping root units by target and location.
///
/// Locations are ordered by the number of distinct projects they serve and
/// units by the number of projects using them, so the most relevant entries
/// come first. Indirect usage is drawn as the shortest chain down to a used
/// unit.
#[derive(Debug, Clone)]
pub struct TreeLayout {
    line_wrap_limit: usize,
    synthetic_unit_id: String,
}

impl Default for TreeLayout {
    fn default() -> Self {
        Self::new(DEFAULT_LINE_WRAP_LIMIT, DEFAULT_SYNTHETIC_UNIT_ID)
    }
}

impl TreeLayout {
    /// Creates a tree layout.
    ///
    /// Location labels longer than `line_wrap_limit` are wrapped. Units with
    /// id `synthetic_unit_id` are left out of every usage computation.
    #[must_use]
    pub fn new(line_wrap_limit: usize, synthetic_unit_id: impl Into<String>) -> Self {
        Self {
            line_wrap_limit,
            synthetic_unit_id: synthetic_unit_id.into(),
        }
    }

    /// Returns the wrap limit.
    #[must_use]
    pub const fn line_wrap_limit(&self) -> usize {
        self.line_wrap_limit
    }
}

impl ReportLayout for TreeLayout {
    fn name(&self) -> &str {
        "tree"
    }

    fn generate_report(&self, report: &UsageReport, verbose: bool, sink: &mut dyn FnMut(String)) {
        write_header(report, sink);

        let mut renderer = Renderer::new(self, report, verbose);
        let mut targets: Vec<_> = report.target_files().collect();
        targets.sort_by(|a, b| a.origin().cmp(b.origin()));

        for target in targets {
            renderer.render_target(target, sink);
        }
    }
}

/// State of one report rendering.
struct Renderer<'a> {
    layout: &'a TreeLayout,
    report: &'a UsageReport,
    verbose: bool,

    /// Root units per target origin and location label.
    structure: BTreeMap<&'a str, BTreeMap<&'a str, Vec<&'a Unit>>>,

    /// For each used unit, the shortest path from any root down to it.
    shortest_paths: HashMap<&'a Unit, Vec<&'a Unit>>,

    /// Units already explained, directly or as part of a parent's tree.
    reported: HashSet<&'a Unit>,
}

impl<'a> Renderer<'a> {
    fn new(layout: &'a TreeLayout, report: &'a UsageReport, verbose: bool) -> Self {
        let mut renderer = Self {
            layout,
            report,
            verbose,
            structure: BTreeMap::new(),
            shortest_paths: HashMap::new(),
            reported: HashSet::new(),
        };
        renderer.build_structure();
        renderer.compute_shortest_paths();
        renderer
    }

    fn is_synthetic(&self, unit: &Unit) -> bool {
        unit.id() == self.layout.synthetic_unit_id
    }

    fn build_structure(&mut self) {
        let report = self.report;
        for unit in report.discovered_units() {
            for record in report.provenance(unit).into_iter().flatten() {
                let units = self
                    .structure
                    .entry(record.target())
                    .or_default()
                    .entry(record.location())
                    .or_default();
                if record.is_root() {
                    units.push(unit);
                }
            }
        }
    }

    fn compute_shortest_paths(&mut self) {
        let report = self.report;
        let roots: Vec<(&Unit, BTreeSet<&Unit>)> = report
            .root_units()
            .into_iter()
            .filter(|root| !self.is_synthetic(root))
            .map(|root| (root, report.all_children(root)))
            .collect();

        for used in report.used_units() {
            if self.is_synthetic(used) {
                continue;
            }

            let mut shortest: Option<Vec<&Unit>> = None;
            for (root, children) in &roots {
                if *root != used && !children.contains(used) {
                    continue;
                }
                let path = report.find_path_between(root, used);
                if shortest.as_ref().is_none_or(|best| path.len() < best.len()) {
                    shortest = Some(path);
                }
            }

            if let Some(path) = shortest {
                self.shortest_paths.insert(used, path);
            }
        }
    }

    /// Used descendants of `unit`, ignoring the synthetic unit.
    fn used_children(&self, unit: &Unit) -> BTreeSet<&'a Unit> {
        self.report
            .all_children(unit)
            .into_iter()
            .filter(|child| self.report.is_used(child) && !self.is_synthetic(child))
            .collect()
    }

    /// Distinct projects using any of `units` or their descendants.
    fn projects_reached(&self, units: &[&Unit]) -> BTreeSet<&'a str> {
        let mut projects = BTreeSet::new();
        for unit in units.iter().filter(|unit| !self.is_synthetic(unit)) {
            projects.extend(self.report.projects_using(unit));
            for child in self.used_children(unit) {
                projects.extend(self.report.projects_using(child));
            }
        }
        projects
    }

    /// The chain from `unit` down to `used`: the memoised root path if it
    /// starts at `unit`, otherwise a fresh search.
    fn path_to(&self, unit: &'a Unit, used: &'a Unit) -> Vec<&'a Unit> {
        match self.shortest_paths.get(used) {
            Some(path) if path.first() == Some(&unit) => path.clone(),
            _ => self.report.find_path_between(unit, used),
        }
    }

    fn render_target(&mut self, target: &'a TargetDefinition, sink: &mut dyn FnMut(String)) {
        let report = self.report;
        let origin = target.origin();

        sink(format!("Target: {origin}"));
        let total = report
            .target_content(origin)
            .map_or(0, |content| content.query_all().len());
        sink(format!(
            "  Total units: {total} from {} locations",
            target.locations().len()
        ));

        let referrers = report.referenced_by(origin);
        if !referrers.is_empty() {
            sink(format!("  Referenced in: {}", referrers.join(", ")));
        }

        for location in target.locations() {
            if let Location::Reference(reference) = location {
                let status = if report.is_referenced_target_used(reference.uri()) {
                    "USED"
                } else {
                    "UNUSED"
                };
                sink(format!("  References: {} [{status}]", reference.uri()));
            }
        }

        let locations = self.structure.get(origin).cloned().unwrap_or_default();
        let mut ordered: Vec<(usize, &str)> = locations
            .iter()
            .map(|(label, units)| (self.projects_reached(units).len(), *label))
            .collect();
        ordered.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(b.1)));

        for (_, label) in ordered {
            let candidates: Vec<&'a Unit> = locations[label]
                .iter()
                .copied()
                .filter(|unit| !self.reported.contains(unit) && !self.is_synthetic(unit))
                .collect();
            if candidates.is_empty() {
                continue;
            }
            self.render_location(label, candidates, sink);
        }

        sink(String::new());
    }

    fn render_location(&mut self, label: &str, mut units: Vec<&'a Unit>, sink: &mut dyn FnMut(String)) {
        let projects = self.projects_reached(&units).len();
        let lines = wrap_line(label, LOCATION_INDENT, self.layout.line_wrap_limit);
        let last = lines.len().saturating_sub(1);
        for (index, line) in lines.iter().enumerate() {
            let prefix = if index == 0 { "  Location: " } else { LOCATION_INDENT };
            if index == last {
                sink(format!("{prefix}{line} ({})", plural(projects, "project")));
            } else {
                sink(format!("{prefix}{line}"));
            }
        }

        let mut usage: HashMap<&Unit, usize> = HashMap::new();
        for &unit in &units {
            usage.insert(unit, self.projects_reached(&[unit]).len());
        }
        units.sort_by(|a, b| {
            usage[b]
                .cmp(&usage[a])
                .then_with(|| a.to_string().cmp(&b.to_string()))
        });

        for unit in units {
            if self.reported.contains(unit) {
                continue;
            }
            self.render_unit(unit, sink);
            self.reported.insert(unit);
            self.reported.extend(self.report.all_children(unit));
        }
    }

    fn render_unit(&self, unit: &'a Unit, sink: &mut dyn FnMut(String)) {
        let name = format_unit(unit);

        if self.report.is_used(unit) {
            let projects = self.report.projects_using(unit);
            sink(format!(
                "    • {name} [USED ({})]",
                plural(projects.len(), "project")
            ));
            if self.verbose {
                list_projects(&projects, "      ", sink);
            }
        } else if self.used_children(unit).is_empty() {
            sink(format!("    • {name} [UNUSED]"));
            sink("      Can potentially be removed".to_string());
        } else {
            let status = if is_feature(unit) && !self.chain_contains_feature(unit) {
                "USED"
            } else {
                "INDIRECTLY USED"
            };
            sink(format!("    • {name} [{status}]"));
            self.render_chain(unit, sink);
        }
    }

    /// Whether a chain from `unit` to one of its used descendants passes
    /// through another feature.
    fn chain_contains_feature(&self, unit: &'a Unit) -> bool {
        self.used_children(unit).into_iter().any(|used| {
            let path = self.path_to(unit, used);
            path.len() > 2 && path[1..path.len() - 1].iter().any(|step| is_feature(step))
        })
    }

    fn render_chain(&self, unit: &'a Unit, sink: &mut dyn FnMut(String)) {
        let mut shortest: Option<Vec<&Unit>> = None;
        for used in self.used_children(unit) {
            if self.reported.contains(used) {
                continue;
            }
            let path = self.path_to(unit, used);
            if shortest.as_ref().is_none_or(|best| path.len() < best.len()) {
                shortest = Some(path);
            }
        }

        let Some(path) = shortest.filter(|path| path.len() > 1) else {
            return;
        };

        let last = path.len() - 1;
        for (depth, step) in path.iter().enumerate().skip(1) {
            if self.is_synthetic(step) {
                continue;
            }

            let indent = format!("      {}", "   ".repeat(depth - 1));
            let line = format!("{indent}└─ {}", format_unit(step));

            if depth == last && self.report.is_used(step) {
                let projects = self.report.projects_using(step);
                sink(format!("{line} ({})", plural(projects.len(), "project")));
                if self.verbose {
                    list_projects(&projects, &format!("{indent}   "), sink);
                }
            } else {
                sink(line);
            }
        }
    }
}

fn list_projects(projects: &[&str], indent: &str, sink: &mut dyn FnMut(String)) {
    for project in projects.iter().take(MAX_PROJECTS_LISTED) {
        sink(format!("{indent}└─ {project}"));
    }
    if projects.len() > MAX_PROJECTS_LISTED {
        sink(format!(
            "{indent}└─ ... and {} more ...",
            projects.len() - MAX_PROJECTS_LISTED
        ));
    }
}
