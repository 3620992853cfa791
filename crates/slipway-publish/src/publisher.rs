//! Routing of finished artifacts to their sinks.
//!
//! Every artifact goes to the ephemeral store; a failure there fails the
//! job. The permanent release store is written only on canonical tag
//! pushes, and its outcome is independent: a release-sink failure is
//! surfaced on the result but does not retroactively fail a job whose
//! ephemeral upload succeeded.

use slipway_core::artifact::Artifact;
use slipway_core::condition::Condition;
use slipway_core::context::TriggerContext;
use slipway_core::ports::{ArtifactStore, ReleaseStore};
use slipway_core::Result;
use std::sync::Arc;
use tracing::{info, warn};

pub use slipway_core::artifact::{PublishResult, ReleaseOutcome};

/// Names and routes finished artifacts to their sinks.
pub struct ArtifactPublisher {
    ephemeral: Arc<dyn ArtifactStore>,
    release: Arc<dyn ReleaseStore>,
    /// Canonical release predicate gating the permanent store.
    release_condition: Condition,
}

impl ArtifactPublisher {
    pub fn new(
        ephemeral: Arc<dyn ArtifactStore>,
        release: Arc<dyn ReleaseStore>,
        release_condition: Condition,
    ) -> Self {
        Self {
            ephemeral,
            release,
            release_condition,
        }
    }

    /// Publish one artifact for the given context.
    pub async fn publish(
        &self,
        artifact: &Artifact,
        ctx: &TriggerContext,
    ) -> Result<PublishResult> {
        let stored = self.ephemeral.upload(artifact).await?;
        info!(
            artifact = %artifact.name,
            digest = %artifact.digest,
            location = %stored.location,
            "uploaded to ephemeral store"
        );

        let release = if self.release_condition.evaluate(ctx)? {
            match self.release.attach(artifact, &ctx.ref_name).await {
                Ok(attached) => {
                    info!(
                        artifact = %artifact.name,
                        tag = %ctx.ref_name,
                        location = %attached.location,
                        "attached to release"
                    );
                    ReleaseOutcome::Published {
                        location: attached.location,
                    }
                }
                Err(err) => {
                    warn!(artifact = %artifact.name, error = %err, "release upload failed");
                    ReleaseOutcome::Failed {
                        message: err.to_string(),
                    }
                }
            }
        } else {
            ReleaseOutcome::Skipped
        };

        Ok(PublishResult {
            ephemeral: stored,
            release,
        })
    }
}
