//! Dependency usage auditing for target definitions.
//!
//! A target definition declares, per location, the installable units a build
//! may draw on. Given the units each project actually consumes, a
//! [`UsageReport`] works out which declarations are used directly, which only
//! matter through the units they pull in, and which can be removed.

pub mod domain;
pub use domain::{Config, Location, LocationError, TargetDefinition, Unit, UsageReport};

pub mod layout;
pub use layout::{LayoutRegistry, ReportLayout};

pub mod resolver;
pub use resolver::{MemoryResolver, TargetDefinitionResolver};

pub mod storage;
pub use storage::Snapshot;
