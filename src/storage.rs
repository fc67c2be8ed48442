//! Loading analysis inputs from disk.
//!
//! A [`Snapshot`] captures everything one run of the report needs: the
//! target definitions of a build, their resolved content and the units each
//! project consumes.

mod snapshot;

pub use snapshot::{Snapshot, SnapshotError, SnapshotFormat, TargetSnapshot};
