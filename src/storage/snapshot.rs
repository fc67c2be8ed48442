use std::{
    collections::{BTreeMap, HashSet},
    io,
    path::{Path, PathBuf},
    sync::Arc,
};

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::{
    domain::{Location, LocationError, TargetDefinition, Unit, UsageReport},
    resolver::{MemoryContent, MemoryResolver},
};

/// Errors that can occur while loading a snapshot.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    /// The snapshot file could not be read.
    #[error("failed to read snapshot '{}'", path.display())]
    Io {
        /// The snapshot file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: io::Error,
    },

    /// The file extension does not name a supported format.
    #[error("unsupported snapshot format: '{}'", .0.display())]
    UnsupportedFormat(PathBuf),

    /// Malformed JSON.
    #[error("invalid JSON snapshot")]
    Json(#[from] serde_json::Error),

    /// Malformed TOML.
    #[error("invalid TOML snapshot")]
    Toml(#[from] toml::de::Error),

    /// Malformed YAML.
    #[error("invalid YAML snapshot")]
    Yaml(#[from] serde_yaml::Error),

    /// Two target definitions share an origin.
    #[error("target '{0}' is defined more than once")]
    DuplicateTarget(String),

    /// A root names a target the snapshot does not define.
    #[error("root target '{0}' is not defined in the snapshot")]
    UnknownRoot(String),
}

/// The serialization formats a snapshot can be stored in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotFormat {
    /// `.json`
    Json,
    /// `.toml`
    Toml,
    /// `.yaml` or `.yml`
    Yaml,
}

impl SnapshotFormat {
    /// Picks the format from a file extension.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::UnsupportedFormat`] for any other extension.
    pub fn from_path(path: &Path) -> Result<Self, SnapshotError> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Ok(Self::Json),
            Some("toml") => Ok(Self::Toml),
            Some("yaml" | "yml") => Ok(Self::Yaml),
            _ => Err(SnapshotError::UnsupportedFormat(path.to_path_buf())),
        }
    }

    /// Parses a snapshot from text in this format.
    ///
    /// # Errors
    ///
    /// Returns the parser's error if `text` is malformed.
    pub fn parse(self, text: &str) -> Result<Snapshot, SnapshotError> {
        Ok(match self {
            Self::Json => serde_json::from_str(text)?,
            Self::Toml => toml::from_str(text)?,
            Self::Yaml => serde_yaml::from_str(text)?,
        })
    }
}

/// One target definition together with its resolved content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetSnapshot {
    origin: String,

    #[serde(default)]
    locations: Vec<Location>,

    /// Every unit the target's repositories make available.
    #[serde(default)]
    units: Vec<Unit>,

    /// Set when resolution of the target failed. The reason is reported for
    /// each of its unit locations and `units` is ignored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    unavailable: Option<String>,
}

impl TargetSnapshot {
    /// Creates a snapshot of a resolved target.
    #[must_use]
    pub const fn new(origin: String, locations: Vec<Location>, units: Vec<Unit>) -> Self {
        Self {
            origin,
            locations,
            units,
            unavailable: None,
        }
    }

    /// Marks the target as not resolvable.
    #[must_use]
    pub fn unavailable(mut self, reason: impl Into<String>) -> Self {
        self.unavailable = Some(reason.into());
        self
    }
}

/// Everything a report is computed from.
///
/// Roots are the target definitions the build references directly. When
/// none are listed, every target is analysed in file order; targets reached
/// through references are still analysed only once.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    roots: Vec<String>,

    #[serde(default)]
    targets: Vec<TargetSnapshot>,

    /// Project id to the units it consumes.
    #[serde(default)]
    projects: BTreeMap<String, Vec<Unit>>,

    /// Units the build uses outside of any project.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    used: Vec<Unit>,
}

impl Snapshot {
    /// Creates an empty snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a target definition.
    #[must_use]
    pub fn with_target(mut self, target: TargetSnapshot) -> Self {
        self.targets.push(target);
        self
    }

    /// Lists a target as referenced directly by the build.
    #[must_use]
    pub fn with_root(mut self, origin: impl Into<String>) -> Self {
        self.roots.push(origin.into());
        self
    }

    /// Records the units a project consumes.
    #[must_use]
    pub fn with_project(mut self, project: impl Into<String>, units: Vec<Unit>) -> Self {
        self.projects.entry(project.into()).or_default().extend(units);
        self
    }

    /// Reads a snapshot, choosing the format from the file extension.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    #[instrument]
    pub fn load(path: &Path) -> Result<Self, SnapshotError> {
        let format = SnapshotFormat::from_path(path)?;
        let text = std::fs::read_to_string(path).map_err(|source| SnapshotError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let snapshot = format.parse(&text)?;
        debug!(
            targets = snapshot.targets.len(),
            projects = snapshot.projects.len(),
            "loaded snapshot"
        );
        Ok(snapshot)
    }

    /// Builds the resolver and the list of root definitions.
    ///
    /// # Errors
    ///
    /// Returns an error if an origin is defined twice or a root is not
    /// defined.
    pub fn resolver(&self) -> Result<(MemoryResolver, Vec<Arc<TargetDefinition>>), SnapshotError> {
        let mut resolver = MemoryResolver::new();
        let mut seen = HashSet::new();
        let mut definitions = Vec::with_capacity(self.targets.len());

        for target in &self.targets {
            if !seen.insert(target.origin.as_str()) {
                return Err(SnapshotError::DuplicateTarget(target.origin.clone()));
            }
            let definition = TargetDefinition::new(target.origin.clone(), target.locations.clone());
            let definition = match &target.unavailable {
                Some(reason) => resolver.insert_unresolved(definition, reason.clone()),
                None => resolver.insert(definition, MemoryContent::new(target.units.iter().cloned())),
            };
            definitions.push(definition);
        }

        if self.roots.is_empty() {
            return Ok((resolver, definitions));
        }

        let roots = self
            .roots
            .iter()
            .map(|origin| {
                resolver
                    .get(origin)
                    .ok_or_else(|| SnapshotError::UnknownRoot(origin.clone()))
            })
            .collect::<Result<_, _>>()?;
        Ok((resolver, roots))
    }

    /// Computes the usage report for this snapshot.
    ///
    /// Location failures are passed to `on_error` and do not stop the
    /// analysis.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot is inconsistent, see
    /// [`Self::resolver`].
    pub fn analyze(
        &self,
        on_error: &mut dyn FnMut(&Location, &LocationError),
    ) -> Result<UsageReport, SnapshotError> {
        let (resolver, roots) = self.resolver()?;

        let mut report = UsageReport::new();
        for unit in &self.used {
            report.add_used_unit(unit.clone());
        }
        for (project, units) in &self.projects {
            report.record_project_usage(project.clone(), units.iter().cloned());
        }
        for root in roots {
            report.analyze_locations(root, &resolver, on_error);
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::domain::report::tests::{requiring, unit, unit_location};

    fn write(suffix: &str, contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    fn assert_chain(snapshot: &Snapshot) {
        let mut errors = Vec::new();
        let report = snapshot
            .analyze(&mut |location, error| errors.push((location.describe(), error.clone())))
            .unwrap();

        assert!(errors.is_empty(), "{errors:?}");
        let a = unit("A", "1.0.0");
        let b = unit("B", "1.0.0");
        assert!(report.is_root_unit(&a));
        assert!(report.is_used_indirectly(&a));
        assert_eq!(report.projects_using(&b), vec!["app"]);
        assert_eq!(report.target_files_count(), 1);
    }

    #[test]
    fn loads_json() {
        let file = write(
            ".json",
            r#"{
                "roots": ["main.target"],
                "targets": [{
                    "origin": "main.target",
                    "locations": [{
                        "type": "units",
                        "units": [{ "id": "A" }],
                        "repositories": [{ "location": "https://repo.example" }]
                    }],
                    "units": [
                        { "id": "A", "version": "1.0.0", "requires": [{ "name": "B" }] },
                        { "id": "B", "version": "1.0.0" }
                    ]
                }],
                "projects": { "app": [{ "id": "B", "version": "1.0.0" }] }
            }"#,
        );

        assert_chain(&Snapshot::load(file.path()).unwrap());
    }

    #[test]
    fn loads_toml() {
        let file = write(
            ".toml",
            r#"
roots = ["main.target"]

[[targets]]
origin = "main.target"

[[targets.locations]]
type = "units"
units = [{ id = "A" }]
repositories = [{ location = "https://repo.example" }]

[[targets.units]]
id = "A"
version = "1.0.0"
requires = [{ name = "B" }]

[[targets.units]]
id = "B"
version = "1.0.0"

[projects]
app = [{ id = "B", version = "1.0.0" }]
"#,
        );

        assert_chain(&Snapshot::load(file.path()).unwrap());
    }

    #[test]
    fn loads_yaml() {
        let file = write(
            ".yml",
            r"
targets:
  - origin: main.target
    locations:
      - type: units
        units:
          - id: A
        repositories:
          - location: https://repo.example
    units:
      - id: A
        version: 1.0.0
        requires:
          - name: B
      - id: B
        version: 1.0.0
projects:
  app:
    - id: B
      version: 1.0.0
",
        );

        assert_chain(&Snapshot::load(file.path()).unwrap());
    }

    #[test]
    fn rejects_unknown_extension() {
        let file = write(".xml", "<snapshot/>");
        assert!(matches!(
            Snapshot::load(file.path()),
            Err(SnapshotError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            Snapshot::load(&dir.path().join("absent.json")),
            Err(SnapshotError::Io { .. })
        ));
    }

    #[test]
    fn malformed_json_is_reported() {
        let file = write(".json", "{ not json");
        assert!(matches!(
            Snapshot::load(file.path()),
            Err(SnapshotError::Json(_))
        ));
    }

    #[test]
    fn rejects_duplicate_targets_and_unknown_roots() {
        let target = TargetSnapshot::new("t".to_string(), Vec::new(), Vec::new());
        let duplicated = Snapshot::new()
            .with_target(target.clone())
            .with_target(target.clone());
        assert!(matches!(
            duplicated.resolver(),
            Err(SnapshotError::DuplicateTarget(origin)) if origin == "t"
        ));

        let unknown = Snapshot::new().with_target(target).with_root("other");
        assert!(matches!(
            unknown.resolver(),
            Err(SnapshotError::UnknownRoot(origin)) if origin == "other"
        ));
    }

    #[test]
    fn without_roots_every_target_is_analysed() {
        let snapshot = Snapshot::new()
            .with_target(TargetSnapshot::new(
                "one.target".to_string(),
                vec![unit_location("repo", &[("A", None)])],
                vec![unit("A", "1.0.0")],
            ))
            .with_target(TargetSnapshot::new(
                "two.target".to_string(),
                vec![unit_location("repo", &[("B", None)])],
                vec![requiring(unit("B", "1.0.0"), &["A"]), unit("A", "1.0.0")],
            ));

        let report = snapshot.analyze(&mut |_, _| {}).unwrap();

        assert_eq!(report.target_files_count(), 2);
        assert_eq!(report.root_units().len(), 2);
    }

    #[test]
    fn unavailable_target_reports_its_reason() {
        let snapshot = Snapshot::new().with_target(
            TargetSnapshot::new(
                "broken.target".to_string(),
                vec![unit_location("repo", &[("A", None)])],
                Vec::new(),
            )
            .unavailable("repository offline"),
        );

        let mut errors = Vec::new();
        snapshot
            .analyze(&mut |_, error| errors.push(error.clone()))
            .unwrap();

        assert_eq!(errors.len(), 1);
        assert!(matches!(
            &errors[0],
            LocationError::ContentUnavailable { source, .. }
                if source.to_string().contains("repository offline")
        ));
    }

    #[test]
    fn serializes_back_to_json() {
        let snapshot = Snapshot::new()
            .with_root("t")
            .with_target(TargetSnapshot::new("t".to_string(), Vec::new(), vec![unit("A", "1.0.0")]))
            .with_project("app", vec![unit("A", "1.0.0")]);

        let json = serde_json::to_string(&snapshot).unwrap();
        let parsed: Snapshot = serde_json::from_str(&json).unwrap();
        let report = parsed.analyze(&mut |_, _| {}).unwrap();
        assert!(report.is_used(&unit("A", "1.0.0")));
    }
}
