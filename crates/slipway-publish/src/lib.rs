//! Artifact publishing for Slipway.

pub mod publisher;
pub mod stores;

pub use publisher::{ArtifactPublisher, PublishResult, ReleaseOutcome};
pub use stores::{LocalArtifactStore, LocalReleaseStore};
