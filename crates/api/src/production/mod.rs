//! Queue of production instructions handed to design-tool bridges.

pub mod queue;

pub use queue::{ProductionQueue, StoredArtifact};
