//! The collaborators usage analysis consumes: a resolver for target
//! definitions and the resolved content of each definition.
//!
//! Resolution of units against remote repositories is not performed here.
//! [`MemoryResolver`] serves definitions and content that were resolved
//! elsewhere, for example loaded from a [`Snapshot`](crate::storage::Snapshot).

use std::{
    collections::{HashMap, HashSet},
    fmt,
    sync::Arc,
};

use crate::domain::{TargetDefinition, Unit, UnitQuery};

/// The resolved unit universe of one target definition.
pub trait TargetDefinitionContent: fmt::Debug {
    /// Every unit made available by the target definition.
    fn query_all(&self) -> &[Unit];

    /// Units selected by `query`.
    fn query(&self, query: &UnitQuery) -> Vec<&Unit> {
        self.query_all()
            .iter()
            .filter(|unit| query.matches(unit))
            .collect()
    }

    /// The highest version selected by `query`.
    fn latest(&self, query: &UnitQuery) -> Option<&Unit> {
        self.query(query)
            .into_iter()
            .max_by(|a, b| a.version().cmp(b.version()))
    }
}

/// Resolves target definitions and their content.
///
/// Implementations must answer consistently for the same URI within one
/// analysis run.
pub trait TargetDefinitionResolver {
    /// Look up the target definition a reference location points to.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::UnknownTarget`] if nothing matches `uri`.
    fn target_definition(&self, uri: &str) -> Result<Arc<TargetDefinition>, ResolveError>;

    /// Fetch the resolved content of `definition`.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::ContentUnavailable`] if the content cannot be
    /// produced.
    fn fetch_content(
        &self,
        definition: &TargetDefinition,
    ) -> Result<Arc<dyn TargetDefinitionContent>, ResolveError>;
}

/// Errors reported by a [`TargetDefinitionResolver`].
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ResolveError {
    /// No target definition is known under the URI.
    #[error("target definition '{0}' could not be found")]
    UnknownTarget(String),

    /// The content of a target definition could not be resolved.
    #[error("content of target definition '{origin}' is unavailable: {reason}")]
    ContentUnavailable {
        /// Origin of the target definition.
        origin: String,
        /// Why the content is unavailable.
        reason: String,
    },
}

/// Target content held in memory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryContent {
    units: Vec<Unit>,
}

impl MemoryContent {
    /// Create content from units. Duplicate units (same id and version) keep
    /// their first occurrence.
    #[must_use]
    pub fn new(units: impl IntoIterator<Item = Unit>) -> Self {
        let mut seen = HashSet::new();
        let units = units
            .into_iter()
            .filter(|unit| seen.insert(unit.clone()))
            .collect();
        Self { units }
    }
}

impl TargetDefinitionContent for MemoryContent {
    fn query_all(&self) -> &[Unit] {
        &self.units
    }
}

/// A resolver over definitions and contents registered up front.
#[derive(Debug, Default)]
pub struct MemoryResolver {
    definitions: HashMap<String, Arc<TargetDefinition>>,
    contents: HashMap<String, Arc<MemoryContent>>,
    /// Why content is missing, for definitions registered without it.
    failures: HashMap<String, String>,
}

impl MemoryResolver {
    /// Create an empty resolver.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a target definition together with its resolved content.
    ///
    /// Returns the shared definition.
    pub fn insert(
        &mut self,
        definition: TargetDefinition,
        content: MemoryContent,
    ) -> Arc<TargetDefinition> {
        let origin = definition.origin().to_string();
        let definition = Arc::new(definition);
        self.definitions
            .insert(origin.clone(), Arc::clone(&definition));
        self.failures.remove(&origin);
        self.contents.insert(origin, Arc::new(content));
        definition
    }

    /// Registers a target definition whose content cannot be resolved.
    /// Fetching its content fails with `reason`.
    pub fn insert_unresolved(
        &mut self,
        definition: TargetDefinition,
        reason: impl Into<String>,
    ) -> Arc<TargetDefinition> {
        let origin = definition.origin().to_string();
        let definition = Arc::new(definition);
        self.definitions
            .insert(origin.clone(), Arc::clone(&definition));
        self.contents.remove(&origin);
        self.failures.insert(origin, reason.into());
        definition
    }

    /// Looks up a registered definition by its exact origin.
    #[must_use]
    pub fn get(&self, origin: &str) -> Option<Arc<TargetDefinition>> {
        self.definitions.get(origin).cloned()
    }

    fn lookup(&self, uri: &str) -> Option<&Arc<TargetDefinition>> {
        if let Some(definition) = self.definitions.get(uri) {
            return Some(definition);
        }

        let path = strip_file_scheme(uri);
        if let Some(definition) = self.definitions.get(path) {
            return Some(definition);
        }

        // Relative origins are matched against the tail of the path. The
        // longest matching origin wins so that `a/b.target` beats `b.target`.
        self.definitions
            .iter()
            .filter(|(origin, _)| {
                path.ends_with(&format!("/{}", strip_file_scheme(origin)))
            })
            .max_by_key(|(origin, _)| origin.len())
            .map(|(_, definition)| definition)
    }
}

fn strip_file_scheme(uri: &str) -> &str {
    uri.strip_prefix("file://")
        .or_else(|| uri.strip_prefix("file:"))
        .unwrap_or(uri)
}

impl TargetDefinitionResolver for MemoryResolver {
    fn target_definition(&self, uri: &str) -> Result<Arc<TargetDefinition>, ResolveError> {
        self.lookup(uri)
            .cloned()
            .ok_or_else(|| ResolveError::UnknownTarget(uri.to_string()))
    }

    fn fetch_content(
        &self,
        definition: &TargetDefinition,
    ) -> Result<Arc<dyn TargetDefinitionContent>, ResolveError> {
        self.contents
            .get(definition.origin())
            .map(|content| Arc::clone(content) as Arc<dyn TargetDefinitionContent>)
            .ok_or_else(|| ResolveError::ContentUnavailable {
                origin: definition.origin().to_string(),
                reason: self
                    .failures
                    .get(definition.origin())
                    .cloned()
                    .unwrap_or_else(|| "no resolved content was registered".to_string()),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Version, VersionRange};

    fn unit(id: &str, version: &str) -> Unit {
        Unit::new(id, version.parse::<Version>().unwrap())
    }

    #[test]
    fn latest_picks_highest_matching_version() {
        let content = MemoryContent::new([
            unit("a", "1.0.0"),
            unit("a", "2.1.0"),
            unit("a", "1.5.0"),
            unit("b", "9.0.0"),
        ]);

        let latest = content.latest(&UnitQuery::Any { id: "a".into() }).unwrap();
        assert_eq!(latest, &unit("a", "2.1.0"));

        let in_range = content
            .latest(&UnitQuery::InRange {
                id: "a".into(),
                range: "[1.0.0,2.0.0)".parse::<VersionRange>().unwrap(),
            })
            .unwrap();
        assert_eq!(in_range, &unit("a", "1.5.0"));

        assert!(content.latest(&UnitQuery::Any { id: "c".into() }).is_none());
    }

    #[test]
    fn duplicate_units_are_kept_once() {
        let content = MemoryContent::new([
            unit("a", "1.0.0"),
            unit("b", "1.0.0"),
            unit("a", "1.0.0"),
            unit("a", "2.0.0"),
        ]);
        assert_eq!(
            content.query_all(),
            [unit("a", "1.0.0"), unit("b", "1.0.0"), unit("a", "2.0.0")]
        );
    }

    #[test]
    fn resolves_reference_uris() {
        let mut resolver = MemoryResolver::new();
        resolver.insert(
            TargetDefinition::new("targets/base.target", Vec::new()),
            MemoryContent::default(),
        );
        resolver.insert(
            TargetDefinition::new("base.target", Vec::new()),
            MemoryContent::default(),
        );

        let exact = resolver.target_definition("base.target").unwrap();
        assert_eq!(exact.origin(), "base.target");

        let by_scheme = resolver.target_definition("file:targets/base.target").unwrap();
        assert_eq!(by_scheme.origin(), "targets/base.target");

        let by_suffix = resolver
            .target_definition("file:///work/project/targets/base.target")
            .unwrap();
        assert_eq!(by_suffix.origin(), "targets/base.target");

        assert_eq!(
            resolver.target_definition("missing.target"),
            Err(ResolveError::UnknownTarget("missing.target".into()))
        );
    }

    #[test]
    fn unresolved_content_is_an_error() {
        let mut resolver = MemoryResolver::new();
        let definition = resolver.insert_unresolved(
            TargetDefinition::new("broken.target", Vec::new()),
            "repository offline",
        );
        match resolver.fetch_content(&definition) {
            Err(ResolveError::ContentUnavailable { origin, reason }) => {
                assert_eq!(origin, "broken.target");
                assert_eq!(reason, "repository offline");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
