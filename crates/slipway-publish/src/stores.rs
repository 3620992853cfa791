//! Filesystem-backed store adapters.
//!
//! The real artifact and release backends are external services; these
//! adapters implement the same contracts against local directories so the
//! orchestrator can run self-contained.

use async_trait::async_trait;
use slipway_core::artifact::{Artifact, SinkKind};
use slipway_core::ports::{ArtifactStore, ReleaseStore, StoredArtifact};
use slipway_core::{Error, Result};
use std::path::PathBuf;
use tracing::debug;

/// Ephemeral store rooted at a run-scoped directory.
pub struct LocalArtifactStore {
    root: PathBuf,
}

impl LocalArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl ArtifactStore for LocalArtifactStore {
    async fn upload(&self, artifact: &Artifact) -> Result<StoredArtifact> {
        let dest = self.root.join(&artifact.name);
        tokio::fs::create_dir_all(&self.root).await?;
        tokio::fs::copy(&artifact.path, &dest)
            .await
            .map_err(|e| Error::Publish {
                sink: SinkKind::Ephemeral,
                artifact: artifact.name.clone(),
                message: e.to_string(),
            })?;
        debug!(artifact = %artifact.name, dest = %dest.display(), "stored");
        Ok(StoredArtifact {
            name: artifact.name.clone(),
            location: dest.display().to_string(),
        })
    }
}

/// Release store laying assets out under one directory per tag.
pub struct LocalReleaseStore {
    root: PathBuf,
}

impl LocalReleaseStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl ReleaseStore for LocalReleaseStore {
    async fn attach(&self, artifact: &Artifact, tag: &str) -> Result<StoredArtifact> {
        let dir = self.root.join(tag);
        let dest = dir.join(&artifact.name);
        tokio::fs::create_dir_all(&dir).await?;
        tokio::fs::copy(&artifact.path, &dest)
            .await
            .map_err(|e| Error::Publish {
                sink: SinkKind::Release,
                artifact: artifact.name.clone(),
                message: e.to_string(),
            })?;
        debug!(artifact = %artifact.name, tag, dest = %dest.display(), "attached");
        Ok(StoredArtifact {
            name: artifact.name.clone(),
            location: dest.display().to_string(),
        })
    }
}
