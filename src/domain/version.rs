use std::{cmp::Ordering, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// A unit version of the form `major.minor.micro[.qualifier]`.
///
/// Missing numeric segments default to zero, so `1.2` parses as `1.2.0`.
/// Versions order numerically by segment and then lexically by qualifier, an
/// empty qualifier sorts before any other.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Version {
    major: u64,
    minor: u64,
    micro: u64,
    qualifier: String,
}

impl Version {
    /// The empty version `0.0.0`.
    pub const ZERO: Self = Self::new(0, 0, 0);

    /// Create a version without a qualifier.
    #[must_use]
    pub const fn new(major: u64, minor: u64, micro: u64) -> Self {
        Self {
            major,
            minor,
            micro,
            qualifier: String::new(),
        }
    }

    /// Create a version with a qualifier.
    ///
    /// # Errors
    ///
    /// Returns [`VersionError::InvalidVersion`] if the qualifier contains
    /// characters other than ASCII letters, digits, `-` and `_`.
    pub fn with_qualifier(
        major: u64,
        minor: u64,
        micro: u64,
        qualifier: impl Into<String>,
    ) -> Result<Self, VersionError> {
        let qualifier = qualifier.into();
        if !is_valid_qualifier(&qualifier) {
            return Err(VersionError::InvalidVersion(format!(
                "{major}.{minor}.{micro}.{qualifier}"
            )));
        }
        Ok(Self {
            major,
            minor,
            micro,
            qualifier,
        })
    }

    /// Returns the major segment.
    #[must_use]
    pub const fn major(&self) -> u64 {
        self.major
    }

    /// Returns the minor segment.
    #[must_use]
    pub const fn minor(&self) -> u64 {
        self.minor
    }

    /// Returns the micro segment.
    #[must_use]
    pub const fn micro(&self) -> u64 {
        self.micro
    }

    /// Returns the qualifier, empty if there is none.
    #[must_use]
    pub fn qualifier(&self) -> &str {
        &self.qualifier
    }

    /// Whether this is the empty version `0.0.0`.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }
}

fn is_valid_qualifier(qualifier: &str) -> bool {
    qualifier
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.micro)?;
        if !self.qualifier.is_empty() {
            write!(f, ".{}", self.qualifier)?;
        }
        Ok(())
    }
}

impl FromStr for Version {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(VersionError::InvalidVersion(s.to_string()));
        }

        let mut segments = trimmed.splitn(4, '.');
        let mut numeric = [0_u64; 3];
        for slot in &mut numeric {
            match segments.next() {
                Some(segment) => {
                    *slot = segment
                        .parse()
                        .map_err(|_| VersionError::InvalidVersion(s.to_string()))?;
                }
                None => break,
            }
        }

        let qualifier = segments.next().unwrap_or_default();
        if !is_valid_qualifier(qualifier) || trimmed.ends_with('.') {
            return Err(VersionError::InvalidVersion(s.to_string()));
        }

        let [major, minor, micro] = numeric;
        Ok(Self {
            major,
            minor,
            micro,
            qualifier: qualifier.to_string(),
        })
    }
}

impl TryFrom<String> for Version {
    type Error = VersionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl TryFrom<&str> for Version {
    type Error = VersionError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Version> for String {
    fn from(version: Version) -> Self {
        version.to_string()
    }
}

/// A range of versions.
///
/// Ranges are written either as a bare version, meaning "this version or
/// later", or as an interval such as `[1.0.0,2.0.0)` where square brackets
/// are inclusive and parentheses exclusive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VersionRange {
    minimum: Version,
    include_minimum: bool,
    /// `None` means unbounded.
    maximum: Option<Version>,
    include_maximum: bool,
}

impl VersionRange {
    /// The range containing every version.
    pub const ANY: Self = Self::at_least(Version::ZERO);

    /// The range `[minimum, ∞)`.
    #[must_use]
    pub const fn at_least(minimum: Version) -> Self {
        Self {
            minimum,
            include_minimum: true,
            maximum: None,
            include_maximum: false,
        }
    }

    /// The range containing exactly one version.
    #[must_use]
    pub fn exact(version: Version) -> Self {
        Self {
            minimum: version.clone(),
            include_minimum: true,
            maximum: Some(version),
            include_maximum: true,
        }
    }

    /// Creates an interval.
    ///
    /// # Errors
    ///
    /// Returns [`VersionError::InvalidRange`] if the interval is empty.
    pub fn between(
        minimum: Version,
        include_minimum: bool,
        maximum: Version,
        include_maximum: bool,
    ) -> Result<Self, VersionError> {
        let range = Self {
            minimum,
            include_minimum,
            maximum: Some(maximum),
            include_maximum,
        };
        if range.is_empty() {
            return Err(VersionError::InvalidRange(range.to_string()));
        }
        Ok(range)
    }

    /// Whether `version` lies inside this range.
    #[must_use]
    pub fn includes(&self, version: &Version) -> bool {
        let above_minimum = match version.cmp(&self.minimum) {
            Ordering::Greater => true,
            Ordering::Equal => self.include_minimum,
            Ordering::Less => false,
        };
        let below_maximum = self
            .maximum
            .as_ref()
            .is_none_or(|maximum| match version.cmp(maximum) {
                Ordering::Less => true,
                Ordering::Equal => self.include_maximum,
                Ordering::Greater => false,
            });
        above_minimum && below_maximum
    }

    fn is_empty(&self) -> bool {
        self.maximum
            .as_ref()
            .is_some_and(|maximum| match self.minimum.cmp(maximum) {
                Ordering::Greater => true,
                Ordering::Equal => !(self.include_minimum && self.include_maximum),
                Ordering::Less => false,
            })
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.maximum {
            None => write!(f, "{}", self.minimum),
            Some(maximum) => write!(
                f,
                "{}{},{}{}",
                if self.include_minimum { '[' } else { '(' },
                self.minimum,
                maximum,
                if self.include_maximum { ']' } else { ')' },
            ),
        }
    }
}

impl FromStr for VersionRange {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let invalid = || VersionError::InvalidRange(s.to_string());

        let include_minimum = match trimmed.chars().next() {
            Some('[') => true,
            Some('(') => false,
            Some(_) => {
                return trimmed
                    .parse()
                    .map(Self::at_least)
                    .map_err(|_| invalid());
            }
            None => return Err(invalid()),
        };

        let include_maximum = match trimmed.chars().last() {
            Some(']') => true,
            Some(')') => false,
            _ => return Err(invalid()),
        };

        let inner = &trimmed[1..trimmed.len() - 1];
        let (minimum, maximum) = inner.split_once(',').ok_or_else(invalid)?;
        let minimum: Version = minimum.parse().map_err(|_| invalid())?;
        let maximum: Version = maximum.parse().map_err(|_| invalid())?;

        Self::between(minimum, include_minimum, maximum, include_maximum).map_err(|_| invalid())
    }
}

impl TryFrom<String> for VersionRange {
    type Error = VersionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<VersionRange> for String {
    fn from(range: VersionRange) -> Self {
        range.to_string()
    }
}

/// Errors raised while parsing versions and version ranges.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum VersionError {
    /// The string is not a valid version.
    #[error("invalid version '{0}'")]
    InvalidVersion(String),

    /// The string is not a valid, non-empty version range.
    #[error("invalid version range '{0}'")]
    InvalidRange(String),
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test_case("1", "1.0.0"; "major only")]
    #[test_case("1.2", "1.2.0"; "major and minor")]
    #[test_case("1.2.3", "1.2.3"; "full numeric")]
    #[test_case("2.17.0.v20240604-0832", "2.17.0.v20240604-0832"; "qualified")]
    #[test_case(" 3.0.0 ", "3.0.0"; "surrounding whitespace")]
    fn parses_versions(input: &str, expected: &str) {
        let version: Version = input.parse().unwrap();
        assert_eq!(version.to_string(), expected);
    }

    #[test_case(""; "empty")]
    #[test_case("a.b.c"; "non numeric")]
    #[test_case("1.2."; "trailing dot")]
    #[test_case("1.2.3.q!"; "bad qualifier character")]
    fn rejects_invalid_versions(input: &str) {
        assert_eq!(
            input.parse::<Version>(),
            Err(VersionError::InvalidVersion(input.to_string()))
        );
    }

    #[test]
    fn builds_qualified_versions() {
        let version = Version::with_qualifier(1, 2, 3, "v2024").unwrap();
        assert_eq!(version.to_string(), "1.2.3.v2024");
        assert_eq!(version, "1.2.3.v2024".parse().unwrap());
        assert_eq!(
            Version::with_qualifier(1, 0, 0, "bad!"),
            Err(VersionError::InvalidVersion("1.0.0.bad!".to_string()))
        );
    }

    #[test]
    fn orders_by_segments_then_qualifier() {
        let v = |s: &str| s.parse::<Version>().unwrap();
        assert!(v("1.0.0") < v("1.0.1"));
        assert!(v("1.10.0") > v("1.9.9"));
        assert!(v("1.0.0") < v("1.0.0.a"));
        assert!(v("1.0.0.v2024") < v("1.0.0.v2025"));
        assert!(Version::ZERO.is_zero());
    }

    #[test_case("[1.0.0,2.0.0)", "1.0.0", true; "inclusive minimum")]
    #[test_case("[1.0.0,2.0.0)", "2.0.0", false; "exclusive maximum")]
    #[test_case("(1.0.0,2.0.0]", "1.0.0", false; "exclusive minimum")]
    #[test_case("(1.0.0,2.0.0]", "2.0.0", true; "inclusive maximum")]
    #[test_case("1.5.0", "9.0.0", true; "bare version is a lower bound")]
    #[test_case("1.5.0", "1.4.9", false; "below bare lower bound")]
    #[test_case("[1.0.0,1.0.0]", "1.0.0", true; "single version")]
    fn range_inclusion(range: &str, version: &str, expected: bool) {
        let range: VersionRange = range.parse().unwrap();
        let version: Version = version.parse().unwrap();
        assert_eq!(range.includes(&version), expected);
    }

    #[test_case("[2.0.0,1.0.0]"; "inverted")]
    #[test_case("[1.0.0,1.0.0)"; "empty interval")]
    #[test_case("[1.0.0;2.0.0]"; "missing comma")]
    #[test_case("[1.0.0,2.0.0"; "unterminated")]
    #[test_case(""; "empty")]
    fn rejects_invalid_ranges(input: &str) {
        assert!(matches!(
            input.parse::<VersionRange>(),
            Err(VersionError::InvalidRange(_))
        ));
    }

    #[test]
    fn any_contains_everything() {
        assert!(VersionRange::ANY.includes(&Version::ZERO));
        assert!(VersionRange::ANY.includes(&"99.0.0.zzz".parse().unwrap()));
    }

    #[test]
    fn range_display_round_trips_through_parse() {
        let range: VersionRange = "[1.2.0,2.0.0)".parse().unwrap();
        assert_eq!(range.to_string(), "[1.2.0,2.0.0)");
        assert_eq!(VersionRange::exact(Version::new(1, 0, 0)).to_string(), "[1.0.0,1.0.0]");
    }
}
