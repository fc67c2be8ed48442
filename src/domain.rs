//! Domain models for dependency usage analysis.
//!
//! This module contains units and versions, target definitions, the usage
//! graph engine and configuration.

mod config;
pub use config::{Config, DEFAULT_LINE_WRAP_LIMIT, DEFAULT_SYNTHETIC_UNIT_ID};

mod version;
pub use version::{Version, VersionError, VersionRange};

/// Installable units, requirements and unit queries.
pub mod unit;
pub use unit::{Capability, IU_NAMESPACE, Requirement, Unit, UnitQuery};

pub mod target;
pub use target::{
    Location, ReferenceLocation, Repository, TargetDefinition, UnitLocation, UnitReference,
};

pub mod report;
pub use report::{LocationError, Provenance, UsageReport};
