use std::{
    cmp::Ordering,
    fmt,
    hash::{Hash, Hasher},
};

use serde::{Deserialize, Serialize};

use crate::domain::version::{Version, VersionError, VersionRange};

/// Namespace of the capability every unit provides for its own id.
pub const IU_NAMESPACE: &str = "org.eclipse.equinox.p2.iu";

fn default_namespace() -> String {
    IU_NAMESPACE.to_string()
}

fn is_iu_namespace(namespace: &str) -> bool {
    namespace == IU_NAMESPACE
}

/// An installable unit: an identified, versioned artifact with requirements.
///
/// Identity is the `(id, version)` pair. Two values with the same id and
/// version compare equal even when their requirement lists differ, so a unit
/// reported as used by a project matches the unit discovered in a target's
/// content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Unit {
    id: String,
    version: Version,
    #[serde(default, rename = "requires", skip_serializing_if = "Vec::is_empty")]
    requirements: Vec<Requirement>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    provides: Vec<Capability>,
}

impl Unit {
    /// Create a unit with no requirements and no extra capabilities.
    #[must_use]
    pub fn new(id: impl Into<String>, version: Version) -> Self {
        Self {
            id: id.into(),
            version,
            requirements: Vec::new(),
            provides: Vec::new(),
        }
    }

    /// Adds a requirement.
    #[must_use]
    pub fn with_requirement(mut self, requirement: Requirement) -> Self {
        self.requirements.push(requirement);
        self
    }

    /// Adds a capability in addition to the implicit one for the unit's id.
    #[must_use]
    pub fn with_capability(mut self, capability: Capability) -> Self {
        self.provides.push(capability);
        self
    }

    /// Returns the unit id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the unit version.
    #[must_use]
    pub const fn version(&self) -> &Version {
        &self.version
    }

    /// Returns the requirements of this unit.
    #[must_use]
    pub fn requirements(&self) -> &[Requirement] {
        &self.requirements
    }

    /// Whether this unit provides a capability matching `requirement`.
    ///
    /// Every unit implicitly provides `(IU_NAMESPACE, id, version)`.
    #[must_use]
    pub fn satisfies(&self, requirement: &Requirement) -> bool {
        let implicit = is_iu_namespace(&requirement.namespace)
            && requirement.name == self.id
            && requirement.range.includes(&self.version);

        implicit
            || self.provides.iter().any(|capability| {
                capability.namespace == requirement.namespace
                    && capability.name == requirement.name
                    && requirement.range.includes(&capability.version)
            })
    }
}

impl PartialEq for Unit {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.version == other.version
    }
}

impl Eq for Unit {}

impl Hash for Unit {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
        self.version.hash(state);
    }
}

impl PartialOrd for Unit {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Unit {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id
            .cmp(&other.id)
            .then_with(|| self.version.cmp(&other.version))
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.id, self.version)
    }
}

/// A requirement on a capability in some namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Requirement {
    #[serde(default = "default_namespace", skip_serializing_if = "is_iu_namespace")]
    namespace: String,
    name: String,
    #[serde(default = "any_range")]
    range: VersionRange,
}

const fn any_range() -> VersionRange {
    VersionRange::ANY
}

impl Requirement {
    /// Create a requirement in an arbitrary namespace.
    #[must_use]
    pub fn new(namespace: impl Into<String>, name: impl Into<String>, range: VersionRange) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            range,
        }
    }

    /// Create a requirement on another unit by id.
    #[must_use]
    pub fn unit(id: impl Into<String>, range: VersionRange) -> Self {
        Self::new(IU_NAMESPACE, id, range)
    }

    /// Returns the namespace.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Returns the required capability name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the accepted version range.
    #[must_use]
    pub const fn range(&self) -> &VersionRange {
        &self.range
    }
}

/// A capability offered by a unit (a package, a bundle symbolic name, etc.).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Capability {
    namespace: String,
    name: String,
    version: Version,
}

impl Capability {
    /// Create a capability.
    #[must_use]
    pub fn new(namespace: impl Into<String>, name: impl Into<String>, version: Version) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            version,
        }
    }
}

/// A lookup of units by id within a target's content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitQuery {
    /// Any version of the unit.
    Any {
        /// Unit id.
        id: String,
    },
    /// Exactly one version.
    Exact {
        /// Unit id.
        id: String,
        /// Required version.
        version: Version,
    },
    /// Any version inside the range.
    InRange {
        /// Unit id.
        id: String,
        /// Accepted versions.
        range: VersionRange,
    },
}

impl UnitQuery {
    /// Builds the query for a unit declared in a target location.
    ///
    /// A missing, blank or `0.0.0` version selects any version, a version
    /// starting with `[` or `(` is a range, anything else is an exact version.
    ///
    /// # Errors
    ///
    /// Returns an error if the version or range cannot be parsed.
    pub fn for_declared(id: &str, version: Option<&str>) -> Result<Self, VersionError> {
        let id = id.to_string();
        let version = version.map(str::trim).unwrap_or_default();

        if version.is_empty() || version == "0.0.0" {
            Ok(Self::Any { id })
        } else if version.starts_with('[') || version.starts_with('(') {
            Ok(Self::InRange {
                id,
                range: version.parse()?,
            })
        } else {
            Ok(Self::Exact {
                id,
                version: version.parse()?,
            })
        }
    }

    /// Returns the queried unit id.
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Any { id } | Self::Exact { id, .. } | Self::InRange { id, .. } => id,
        }
    }

    /// Whether `unit` is selected by this query.
    #[must_use]
    pub fn matches(&self, unit: &Unit) -> bool {
        if unit.id() != self.id() {
            return false;
        }
        match self {
            Self::Any { .. } => true,
            Self::Exact { version, .. } => unit.version() == version,
            Self::InRange { range, .. } => range.includes(unit.version()),
        }
    }
}

impl fmt::Display for UnitQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any { id } => write!(f, "{id}"),
            Self::Exact { id, version } => write!(f, "{id} {version}"),
            Self::InRange { id, range } => write!(f, "{id} {range}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        s.parse().unwrap()
    }

    #[test]
    fn identity_ignores_requirements() {
        let plain = Unit::new("a", v("1.0.0"));
        let with_req = Unit::new("a", v("1.0.0"))
            .with_requirement(Requirement::unit("b", VersionRange::ANY));
        assert_eq!(plain, with_req);
        assert_ne!(plain, Unit::new("a", v("1.0.1")));
    }

    #[test]
    fn satisfies_its_own_id_within_range() {
        let unit = Unit::new("org.example.core", v("3.29.0"));
        assert!(unit.satisfies(&Requirement::unit(
            "org.example.core",
            "[3.0.0,4.0.0)".parse().unwrap()
        )));
        assert!(!unit.satisfies(&Requirement::unit(
            "org.example.core",
            "[4.0.0,5.0.0)".parse().unwrap()
        )));
        assert!(!unit.satisfies(&Requirement::unit("org.example.other", VersionRange::ANY)));
    }

    #[test]
    fn satisfies_through_explicit_capability() {
        let unit = Unit::new("org.example.bundle", v("1.0.0")).with_capability(Capability::new(
            "java.package",
            "org.example.api",
            v("2.1.0"),
        ));
        let requirement = Requirement::new("java.package", "org.example.api", "2.0.0".parse().unwrap());
        assert!(unit.satisfies(&requirement));
        assert!(!unit.satisfies(&Requirement::new(
            "osgi.bundle",
            "org.example.api",
            VersionRange::ANY
        )));
    }

    #[test]
    fn declared_query_selection() {
        assert_eq!(
            UnitQuery::for_declared("a", None).unwrap(),
            UnitQuery::Any { id: "a".into() }
        );
        assert_eq!(
            UnitQuery::for_declared("a", Some("0.0.0")).unwrap(),
            UnitQuery::Any { id: "a".into() }
        );
        assert_eq!(
            UnitQuery::for_declared("a", Some("  ")).unwrap(),
            UnitQuery::Any { id: "a".into() }
        );
        assert!(matches!(
            UnitQuery::for_declared("a", Some("[1.0.0,2.0.0)")).unwrap(),
            UnitQuery::InRange { .. }
        ));
        assert_eq!(
            UnitQuery::for_declared("a", Some("1.2.3")).unwrap(),
            UnitQuery::Exact {
                id: "a".into(),
                version: v("1.2.3")
            }
        );
        assert!(UnitQuery::for_declared("a", Some("not-a-version")).is_err());
    }

    #[test]
    fn deserializes_with_defaults() {
        let unit: Unit = serde_json::from_str(
            r#"{"id":"a","version":"1.0.0","requires":[{"name":"b"},{"name":"c","range":"[1.0.0,2.0.0)"}]}"#,
        )
        .unwrap();
        assert_eq!(unit.requirements().len(), 2);
        assert_eq!(unit.requirements()[0].namespace(), IU_NAMESPACE);
        assert_eq!(unit.requirements()[0].range(), &VersionRange::ANY);
        assert!(Unit::new("b", v("7.0.0")).satisfies(&unit.requirements()[0]));
    }
}
