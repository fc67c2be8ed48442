//! Target definitions: the declared dependency universe of a build.

use serde::{Deserialize, Serialize};

/// A target definition, identified by its origin.
///
/// The origin is whatever stable string the resolver uses to name the file,
/// typically a path or URI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetDefinition {
    origin: String,
    #[serde(default)]
    locations: Vec<Location>,
}

impl TargetDefinition {
    /// Create a target definition.
    #[must_use]
    pub fn new(origin: impl Into<String>, locations: Vec<Location>) -> Self {
        Self {
            origin: origin.into(),
            locations,
        }
    }

    /// Returns the origin of this target definition.
    #[must_use]
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Returns the locations in declaration order.
    #[must_use]
    pub fn locations(&self) -> &[Location] {
        &self.locations
    }

    /// Iterates the URIs of every reference location.
    pub fn references(&self) -> impl Iterator<Item = &str> {
        self.locations.iter().filter_map(|location| match location {
            Location::Reference(reference) => Some(reference.uri()),
            _ => None,
        })
    }
}

/// A location inside a target definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Location {
    /// A list of units drawn from one or more repositories.
    Units(UnitLocation),
    /// A reference to another target definition.
    Reference(ReferenceLocation),
    /// A location kind that usage analysis does not inspect (directories,
    /// Maven coordinates, profiles and so on).
    Other {
        /// The location kind as declared in the target file.
        kind: String,
    },
}

impl Location {
    /// A short human readable description, used in diagnostics.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Units(location) => format!("unit location {}", location.label()),
            Self::Reference(reference) => format!("reference to {}", reference.uri),
            Self::Other { kind } => format!("{kind} location"),
        }
    }
}

/// A location listing units from repositories.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitLocation {
    #[serde(default)]
    units: Vec<UnitReference>,
    #[serde(default)]
    repositories: Vec<Repository>,
}

impl UnitLocation {
    /// Create a unit location.
    #[must_use]
    pub const fn new(units: Vec<UnitReference>, repositories: Vec<Repository>) -> Self {
        Self {
            units,
            repositories,
        }
    }

    /// Returns the declared units in order.
    #[must_use]
    pub fn units(&self) -> &[UnitReference] {
        &self.units
    }

    /// Returns the repositories of this location.
    #[must_use]
    pub fn repositories(&self) -> &[Repository] {
        &self.repositories
    }

    /// The label under which units of this location are reported: the
    /// repository locations joined with `", "`.
    #[must_use]
    pub fn label(&self) -> String {
        self.repositories
            .iter()
            .map(Repository::location)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// A unit declared in a location, with an optional version or version
/// range exactly as written in the target file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitReference {
    id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    version: Option<String>,
}

impl UnitReference {
    /// Create a unit reference.
    #[must_use]
    pub fn new(id: impl Into<String>, version: Option<String>) -> Self {
        Self {
            id: id.into(),
            version,
        }
    }

    /// Returns the declared unit id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the declared version string, if any.
    #[must_use]
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }
}

/// A repository a unit location draws from. Only used for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    location: String,
}

impl Repository {
    /// Create a repository descriptor.
    #[must_use]
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            id: None,
            location: location.into(),
        }
    }

    /// Returns the repository id, if one was declared.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Returns the repository location.
    #[must_use]
    pub fn location(&self) -> &str {
        &self.location
    }
}

/// A location that includes another target definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceLocation {
    uri: String,
}

impl ReferenceLocation {
    /// Create a reference location.
    #[must_use]
    pub fn new(uri: impl Into<String>) -> Self {
        Self { uri: uri.into() }
    }

    /// Returns the referenced URI as written.
    #[must_use]
    pub fn uri(&self) -> &str {
        &self.uri
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_joins_repository_locations() {
        let location = UnitLocation::new(
            Vec::new(),
            vec![
                Repository::new("https://example.org/releases"),
                Repository::new("https://example.org/updates"),
            ],
        );
        assert_eq!(
            location.label(),
            "https://example.org/releases, https://example.org/updates"
        );
    }

    #[test]
    fn deserializes_tagged_locations() {
        let definition: TargetDefinition = serde_json::from_str(
            r#"{
                "origin": "main.target",
                "locations": [
                    {"type": "units", "units": [{"id": "a", "version": "1.0.0"}, {"id": "b"}],
                     "repositories": [{"location": "https://example.org/repo"}]},
                    {"type": "reference", "uri": "file:///other.target"},
                    {"type": "other", "kind": "Directory"}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(definition.origin(), "main.target");
        assert_eq!(definition.locations().len(), 3);
        assert_eq!(
            definition.references().collect::<Vec<_>>(),
            vec!["file:///other.target"]
        );
        let Location::Units(units) = &definition.locations()[0] else {
            panic!("expected a unit location");
        };
        assert_eq!(units.units()[1].version(), None);
        assert_eq!(units.label(), "https://example.org/repo");
    }
}
