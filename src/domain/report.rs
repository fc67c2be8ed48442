//! The usage graph engine.
//!
//! A [`UsageReport`] is populated once per run: the caller records which
//! units each project consumes, then hands every top-level target definition
//! to [`UsageReport::analyze_locations`]. The engine discovers the units each
//! location declares, follows their requirements through the target's
//! resolved content and records where every unit came from. Layouts then
//! query the populated report read-only.

mod paths;

use std::{
    collections::{BTreeMap, BTreeSet, HashMap, HashSet},
    sync::Arc,
};

use petgraph::graphmap::DiGraphMap;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::{
    domain::{Location, TargetDefinition, Unit, UnitLocation, UnitQuery, Version, VersionError},
    resolver::{ResolveError, TargetDefinitionContent, TargetDefinitionResolver},
};

/// Upper bound on the number of used descendants rendered by
/// [`UsageReport::indirect_usage_chain`].
const MAX_INDIRECT_USAGE_EXAMPLES: usize = 3;

/// Index of a discovered unit in the report's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
struct UnitKey(usize);

/// Where a unit was discovered.
///
/// A record without a parent means the unit was declared directly in the
/// location. Otherwise the unit was pulled in by a requirement of `parent`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Provenance {
    parent: Option<Unit>,
    target: String,
    location: String,
}

impl Provenance {
    /// The unit whose requirement introduced this one, if any.
    #[must_use]
    pub const fn parent(&self) -> Option<&Unit> {
        self.parent.as_ref()
    }

    /// Origin of the target definition the unit was discovered in.
    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Label of the location the unit was discovered in.
    #[must_use]
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Whether the unit was declared directly in the location.
    #[must_use]
    pub const fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

/// Failure to analyse one location of a target definition.
///
/// These never abort an analysis. They are passed to the error callback of
/// [`UsageReport::analyze_locations`] and the next location is processed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LocationError {
    /// A referenced target definition could not be resolved.
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// A declared unit carries a version that cannot be parsed.
    #[error("unit '{id}' declares an invalid version")]
    Version {
        /// The declared unit id.
        id: String,
        /// The parse failure.
        #[source]
        source: VersionError,
    },

    /// The resolved content of the target is not available, so its units
    /// cannot be looked up.
    #[error("units of '{origin}' cannot be analysed")]
    ContentUnavailable {
        /// Origin of the target definition.
        origin: String,
        /// Why the content could not be fetched.
        #[source]
        source: ResolveError,
    },
}

#[derive(Debug)]
struct AnalyzedTarget {
    definition: Arc<TargetDefinition>,
    content: Result<Arc<dyn TargetDefinitionContent>, ResolveError>,
}

/// Accumulates discovered units, their provenance and the parent/child
/// requirement graph, and classifies units against the set of units the
/// build uses.
///
/// Units are stored once in an arena. Relationships live in a
/// `DiGraphMap<UnitKey, ()>` whose edges point from parent to child, so the
/// child and parent views of the graph cannot disagree. The graph may
/// contain cycles; every traversal keeps a visited set.
#[derive(Debug, Default)]
pub struct UsageReport {
    /// Discovered units, in discovery order.
    units: Vec<Unit>,
    keys: HashMap<Unit, UnitKey>,

    /// Edges point from parent to child.
    graph: DiGraphMap<UnitKey, ()>,

    /// Append-only provenance records per discovered unit.
    provided_by: HashMap<UnitKey, BTreeSet<Provenance>>,

    used_units: BTreeSet<Unit>,
    project_usage: BTreeMap<String, BTreeSet<Unit>>,

    /// Analysed targets, in analysis order.
    targets: Vec<AnalyzedTarget>,
    target_index: HashMap<String, usize>,

    /// Referenced origin to the origins referencing it. Duplicates are kept.
    target_references: HashMap<String, Vec<String>>,
}

impl UsageReport {
    /// Creates an empty report.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a unit as used by the build without attributing it to a
    /// project.
    pub fn add_used_unit(&mut self, unit: Unit) {
        self.used_units.insert(unit);
    }

    /// Records the units a project consumes. Every unit is also marked as
    /// used.
    pub fn record_project_usage(
        &mut self,
        project: impl Into<String>,
        units: impl IntoIterator<Item = Unit>,
    ) {
        let usage = self.project_usage.entry(project.into()).or_default();
        for unit in units {
            self.used_units.insert(unit.clone());
            usage.insert(unit);
        }
    }

    /// Analyses a target definition and, recursively, every target it
    /// references.
    ///
    /// Each target is processed at most once per report, which also makes
    /// reference cycles terminate. A target referenced from several places is
    /// still recorded as referenced by each of them.
    ///
    /// Failures are contained per location: each one is passed to
    /// `on_error` together with the offending location, and analysis moves
    /// on to the next location.
    #[instrument(skip_all, fields(origin = definition.origin()))]
    pub fn analyze_locations<R>(
        &mut self,
        definition: Arc<TargetDefinition>,
        resolver: &R,
        on_error: &mut dyn FnMut(&Location, &LocationError),
    ) where
        R: TargetDefinitionResolver + ?Sized,
    {
        let origin = definition.origin().to_string();
        if self.target_index.contains_key(&origin) {
            debug!("target already analysed");
            return;
        }

        let index = self.targets.len();
        self.target_index.insert(origin.clone(), index);
        self.targets.push(AnalyzedTarget {
            definition: Arc::clone(&definition),
            content: resolver.fetch_content(&definition),
        });

        for location in definition.locations() {
            let outcome = match location {
                Location::Units(units) => self.analyze_unit_location(index, units),
                Location::Reference(reference) => {
                    match resolver.target_definition(reference.uri()) {
                        Ok(referenced) => {
                            self.target_references
                                .entry(referenced.origin().to_string())
                                .or_default()
                                .push(origin.clone());
                            self.analyze_locations(referenced, resolver, on_error);
                            Ok(())
                        }
                        Err(error) => Err(error.into()),
                    }
                }
                Location::Other { kind } => {
                    debug!(kind = %kind, "location kind is not analysed");
                    Ok(())
                }
            };

            if let Err(error) = outcome {
                on_error(location, &error);
            }
        }
    }

    fn analyze_unit_location(
        &mut self,
        target: usize,
        location: &UnitLocation,
    ) -> Result<(), LocationError> {
        let analyzed = &self.targets[target];
        let origin = analyzed.definition.origin().to_string();
        let content = match &analyzed.content {
            Ok(content) => Arc::clone(content),
            Err(source) => {
                return Err(LocationError::ContentUnavailable {
                    origin,
                    source: source.clone(),
                });
            }
        };

        let label = location.label();
        for declared in location.units() {
            let query = UnitQuery::for_declared(declared.id(), declared.version()).map_err(
                |source| LocationError::Version {
                    id: declared.id().to_string(),
                    source,
                },
            )?;

            match content.latest(&query) {
                Some(unit) => self.report_usage(unit, &origin, &label, content.query_all()),
                None => debug!(%query, "no unit matches the declared reference"),
            }
        }

        Ok(())
    }

    /// Walks the requirement closure of `root` within `universe`, recording
    /// provenance and parent/child edges for every unit seen for the first
    /// time during this walk.
    fn report_usage<'a>(&mut self, root: &'a Unit, origin: &str, location: &str, universe: &'a [Unit]) {
        let mut seen = HashSet::new();
        let mut stack: Vec<(&Unit, Option<&Unit>)> = vec![(root, None)];

        while let Some((unit, parent)) = stack.pop() {
            if !seen.insert(unit) {
                continue;
            }
            self.record_provenance(unit, parent, origin, location);

            let providers: Vec<&Unit> = unit
                .requirements()
                .iter()
                .flat_map(|requirement| {
                    universe
                        .iter()
                        .filter(move |candidate| candidate.satisfies(requirement))
                })
                .collect();

            // Reversed so the first provider is walked first.
            stack.extend(providers.into_iter().rev().map(|child| (child, Some(unit))));
        }
    }

    fn record_provenance(&mut self, unit: &Unit, parent: Option<&Unit>, origin: &str, location: &str) {
        let key = self.intern(unit);
        if let Some(parent) = parent {
            let parent_key = self.intern(parent);
            self.graph.add_edge(parent_key, key, ());
        }

        self.provided_by.entry(key).or_default().insert(Provenance {
            parent: parent.cloned(),
            target: origin.to_string(),
            location: location.to_string(),
        });
    }

    fn intern(&mut self, unit: &Unit) -> UnitKey {
        if let Some(&key) = self.keys.get(unit) {
            return key;
        }
        let key = UnitKey(self.units.len());
        self.units.push(unit.clone());
        self.keys.insert(unit.clone(), key);
        self.graph.add_node(key);
        key
    }

    fn key(&self, unit: &Unit) -> Option<UnitKey> {
        self.keys.get(unit).copied()
    }

    fn unit(&self, key: UnitKey) -> &Unit {
        &self.units[key.0]
    }

    fn is_root_key(&self, key: UnitKey) -> bool {
        self.provided_by
            .get(&key)
            .is_some_and(|records| records.iter().any(Provenance::is_root))
    }

    /// Units used by the build.
    #[must_use]
    pub const fn used_units(&self) -> &BTreeSet<Unit> {
        &self.used_units
    }

    /// Units consumed per project id.
    #[must_use]
    pub const fn project_usage(&self) -> &BTreeMap<String, BTreeSet<Unit>> {
        &self.project_usage
    }

    /// Whether the build uses `unit` directly.
    #[must_use]
    pub fn is_used(&self, unit: &Unit) -> bool {
        self.used_units.contains(unit)
    }

    /// Ids of the projects that consume `unit`, in id order.
    #[must_use]
    pub fn projects_using(&self, unit: &Unit) -> Vec<&str> {
        self.project_usage
            .iter()
            .filter(|(_, units)| units.contains(unit))
            .map(|(project, _)| project.as_str())
            .collect()
    }

    /// Whether `unit` was declared directly in at least one location.
    #[must_use]
    pub fn is_root_unit(&self, unit: &Unit) -> bool {
        self.key(unit).is_some_and(|key| self.is_root_key(key))
    }

    /// Whether any transitive child of `unit` is used.
    #[must_use]
    pub fn has_used_children(&self, unit: &Unit) -> bool {
        self.all_children(unit)
            .into_iter()
            .any(|child| self.is_used(child))
    }

    /// Whether `unit` is not used itself but one of its transitive children
    /// is.
    #[must_use]
    pub fn is_used_indirectly(&self, unit: &Unit) -> bool {
        !self.is_used(unit) && self.has_used_children(unit)
    }

    /// Explains why `unit` counts as indirectly used.
    ///
    /// Renders the path to each of the first few used descendants as
    /// `a > b > c`, joined with `"; "`. Empty if no descendant is used.
    #[must_use]
    pub fn indirect_usage_chain(&self, unit: &Unit) -> String {
        self.all_children(unit)
            .into_iter()
            .filter(|child| self.is_used(child))
            .take(MAX_INDIRECT_USAGE_EXAMPLES)
            .map(|child| format_path(&self.find_path_between(unit, child)))
            .collect::<Vec<_>>()
            .join("; ")
    }

    /// Whether any unit discovered through the target named by `uri` is
    /// used, directly or through its children.
    ///
    /// Targets are matched loosely: the origin and `uri` must be equal, or
    /// one must end with the other.
    #[must_use]
    pub fn is_referenced_target_used(&self, uri: &str) -> bool {
        self.targets
            .iter()
            .map(|target| target.definition.origin())
            .filter(|origin| origin_matches(origin, uri))
            .any(|origin| {
                self.units_from_target(origin)
                    .any(|unit| self.is_used(unit) || self.has_used_children(unit))
            })
    }

    /// Units with at least one provenance record in the target `origin`, in
    /// discovery order.
    pub fn units_from_target<'a>(&'a self, origin: &'a str) -> impl Iterator<Item = &'a Unit> + 'a {
        self.units.iter().enumerate().filter_map(move |(index, unit)| {
            self.provided_by
                .get(&UnitKey(index))
                .is_some_and(|records| records.iter().any(|record| record.target == origin))
                .then_some(unit)
        })
    }

    /// Describes where `unit` is provided from.
    ///
    /// One entry per provenance record, `origin > location`, followed by the
    /// shortest path from a root for records that have a parent. Entries are
    /// joined with `"; "`. Returns `"unknown"` for units that were never
    /// discovered.
    #[must_use]
    pub fn provided_by_description(&self, unit: &Unit) -> String {
        let Some(records) = self.provenance(unit).filter(|records| !records.is_empty()) else {
            return "unknown".to_string();
        };

        records
            .iter()
            .map(|record| {
                let mut description = format!("{} > {}", record.target, record.location);
                if !record.is_root() {
                    let path = self.shortest_path_from_root(unit);
                    if path.len() > 1 {
                        description.push_str(" > ");
                        description.push_str(&format_path(&path));
                    }
                }
                description
            })
            .collect::<Vec<_>>()
            .join("; ")
    }

    /// Provenance records of `unit`, if it was discovered.
    #[must_use]
    pub fn provenance(&self, unit: &Unit) -> Option<&BTreeSet<Provenance>> {
        self.key(unit).and_then(|key| self.provided_by.get(&key))
    }

    /// Every unit with a provenance record, in discovery order.
    #[must_use]
    pub fn discovered_units(&self) -> &[Unit] {
        &self.units
    }

    /// Units declared directly in some location, in unit order.
    #[must_use]
    pub fn root_units(&self) -> Vec<&Unit> {
        let mut roots: Vec<_> = self
            .units
            .iter()
            .enumerate()
            .filter(|(index, _)| self.is_root_key(UnitKey(*index)))
            .map(|(_, unit)| unit)
            .collect();
        roots.sort();
        roots
    }

    /// Finds a discovered unit by id. Without a version the highest
    /// discovered version is returned.
    #[must_use]
    pub fn find_unit(&self, id: &str, version: Option<&Version>) -> Option<&Unit> {
        self.units
            .iter()
            .filter(|unit| unit.id() == id)
            .filter(|unit| version.is_none_or(|version| unit.version() == version))
            .max_by(|a, b| a.version().cmp(b.version()))
    }

    /// Analysed target definitions, in analysis order.
    pub fn target_files(&self) -> impl Iterator<Item = &TargetDefinition> + '_ {
        self.targets.iter().map(|target| target.definition.as_ref())
    }

    /// Number of analysed target definitions.
    #[must_use]
    pub fn target_files_count(&self) -> usize {
        self.targets.len()
    }

    /// Resolved content of the analysed target `origin`. `None` if the target
    /// was not analysed or its content could not be fetched.
    #[must_use]
    pub fn target_content(&self, origin: &str) -> Option<&dyn TargetDefinitionContent> {
        let index = *self.target_index.get(origin)?;
        self.targets[index]
            .content
            .as_ref()
            .ok()
            .map(|content| &**content)
    }

    /// Origins of the targets that reference `origin`, in discovery order.
    #[must_use]
    pub fn referenced_by(&self, origin: &str) -> &[String] {
        self.target_references
            .get(origin)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

fn origin_matches(origin: &str, uri: &str) -> bool {
    origin == uri || origin.ends_with(uri) || uri.ends_with(origin)
}

fn format_path(path: &[&Unit]) -> String {
    path.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" > ")
}
