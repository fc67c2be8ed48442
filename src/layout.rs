//! Report layouts.
//!
//! A layout renders a populated [`UsageReport`] as plain text lines handed to
//! a caller supplied sink, one call per line. Layouts never mutate the
//! report.

use std::{collections::BTreeMap, fmt};

use crate::domain::{DEFAULT_LINE_WRAP_LIMIT, DEFAULT_SYNTHETIC_UNIT_ID, Unit, UsageReport};

mod simple;
pub use simple::SimpleLayout;

mod tree;
pub use tree::TreeLayout;

/// Id suffix of units that represent features.
const FEATURE_SUFFIX: &str = ".feature.group";

/// Renders a usage report.
pub trait ReportLayout: fmt::Debug {
    /// The name the layout is registered and selected under.
    fn name(&self) -> &str;

    /// Emits the report for `report` to `sink`, one line per call.
    ///
    /// In verbose mode the consuming projects are listed by id.
    fn generate_report(&self, report: &UsageReport, verbose: bool, sink: &mut dyn FnMut(String));
}

/// Available layouts, by name.
#[derive(Debug)]
pub struct LayoutRegistry {
    layouts: BTreeMap<String, Box<dyn ReportLayout>>,
}

impl LayoutRegistry {
    /// Creates a registry with no layouts.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            layouts: BTreeMap::new(),
        }
    }

    /// Creates the standard registry with the tree layout configured.
    #[must_use]
    pub fn configured(line_wrap_limit: usize, synthetic_unit_id: impl Into<String>) -> Self {
        let mut registry = Self::empty();
        registry.register(SimpleLayout);
        registry.register(TreeLayout::new(line_wrap_limit, synthetic_unit_id));
        registry
    }

    /// Registers a layout under its name, replacing any layout of the same
    /// name.
    pub fn register(&mut self, layout: impl ReportLayout + 'static) {
        self.layouts.insert(layout.name().to_string(), Box::new(layout));
    }

    /// Looks up a layout by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&dyn ReportLayout> {
        self.layouts.get(name).map(Box::as_ref)
    }

    /// Registered layout names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.layouts.keys().map(String::as_str)
    }
}

impl Default for LayoutRegistry {
    fn default() -> Self {
        Self::configured(DEFAULT_LINE_WRAP_LIMIT, DEFAULT_SYNTHETIC_UNIT_ID)
    }
}

fn write_header(report: &UsageReport, sink: &mut dyn FnMut(String)) {
    sink("###### DEPENDENCIES USAGE REPORT #######".to_string());
    sink(format!(
        "Your build uses {} dependencies.",
        report.used_units().len()
    ));
    sink(format!(
        "Your build uses {} target file(s).",
        report.target_files_count()
    ));
    sink(String::new());
}

fn is_feature(unit: &Unit) -> bool {
    unit.id().ends_with(FEATURE_SUFFIX)
}

/// Display form of a unit. Features lose their id suffix and are labelled.
fn format_unit(unit: &Unit) -> String {
    unit.id().strip_suffix(FEATURE_SUFFIX).map_or_else(
        || unit.to_string(),
        |base| format!("{base} {} (feature)", unit.version()),
    )
}

fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("{count} {noun}")
    } else {
        format!("{count} {noun}s")
    }
}

/// Greedy word wrap.
///
/// Splits `text` on single spaces into lines such that each line plus
/// `indent` fits within `limit`, unless a single word is already too long.
/// Text that fits is returned as one line and at least one line is always
/// returned. Joining the lines with a space restores `text`.
#[must_use]
pub fn wrap_line(text: &str, indent: &str, limit: usize) -> Vec<String> {
    if text.len() + indent.len() <= limit {
        return vec![text.to_string()];
    }

    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split(' ') {
        if !current.is_empty() && current.len() + word.len() + 1 + indent.len() > limit {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    lines.push(current);

    lines
}
