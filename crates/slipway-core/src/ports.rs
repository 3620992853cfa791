//! Capability traits (hexagonal architecture).
//!
//! These traits define the interfaces between the orchestration core and the
//! external tools it drives: compiler invocation, signing and notarization,
//! and artifact storage. Each call blocks until a terminal response; the
//! orchestrator never retries.

use crate::artifact::Artifact;
pub use crate::artifact::StoredArtifact;
use crate::target::{BuildTarget, Platform};
use crate::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Output of a successful build.
#[derive(Debug, Clone)]
pub struct BuiltBinary {
    pub path: PathBuf,
}

/// Terminal verdict from a notarization service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotarizeVerdict {
    Accepted,
    Rejected { reason: String },
}

/// The build capability: produces a binary for a target or fails.
///
/// `env` is opaque passthrough configuration (incremental-compile toggle,
/// codegen flags, clean-intermediate toggle); the orchestrator does not
/// interpret it.
#[async_trait]
pub trait BuildCapability: Send + Sync {
    async fn build(
        &self,
        target: &BuildTarget,
        env: &HashMap<String, String>,
    ) -> Result<BuiltBinary>;
}

/// Installs cross-compilation prerequisites for a platform family.
/// Invoked at most once per family per run.
#[async_trait]
pub trait ToolchainBootstrap: Send + Sync {
    async fn prepare(&self, platform: Platform) -> Result<()>;
}

/// The signing capability for one platform family.
///
/// Credentials are read-only, scoped to the platform, and never surfaced to
/// the orchestrator beyond success or failure.
#[async_trait]
pub trait SigningCapability: Send + Sync {
    async fn sign(&self, binary: &Path, target: &BuildTarget) -> Result<()>;

    /// Submit a signed bundle and block until a verdict. Only meaningful for
    /// platforms with `SigningSupport::SignAndNotarize`.
    async fn notarize(&self, bundle: &Path, target: &BuildTarget) -> Result<NotarizeVerdict>;
}

/// Ephemeral artifact store, scoped to a single run.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    async fn upload(&self, artifact: &Artifact) -> Result<StoredArtifact>;
}

/// Permanent release-asset store, written only on canonical tag pushes.
#[async_trait]
pub trait ReleaseStore: Send + Sync {
    async fn attach(&self, artifact: &Artifact, tag: &str) -> Result<StoredArtifact>;
}
