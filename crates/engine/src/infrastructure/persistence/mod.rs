//! Persistence adapters.

mod json_snapshot;

pub use json_snapshot::JsonFactionSnapshotStore;
