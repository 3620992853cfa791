//! The per-job pipeline state machine.
//!
//! Each job steps through build → sign → package → upload strictly in
//! order; no stage begins before the prior stage's outcome is known. Every
//! capability call blocks until a terminal response and is never retried.

use crate::packager;
use crate::policy::ErrorPolicy;
use chrono::Utc;
use slipway_core::context::TriggerContext;
use slipway_core::job::{Job, JobState, StageKind, StageOutcome};
use slipway_core::ports::{
    BuildCapability, BuiltBinary, NotarizeVerdict, SigningCapability, ToolchainBootstrap,
};
use slipway_core::target::{BuildTarget, MatrixEntry, Platform, SigningSupport};
use slipway_core::{Error, Result};
use slipway_publish::ArtifactPublisher;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// A platform family's signing capability and its shape.
#[derive(Clone)]
pub struct SignerSlot {
    pub support: SigningSupport,
    pub signer: Arc<dyn SigningCapability>,
}

/// The external capabilities a pipeline drives.
pub struct Capabilities {
    pub builder: Arc<dyn BuildCapability>,
    /// Cross-compilation bootstrap; required when any target sets
    /// `cross_compile`.
    pub toolchain: Option<Arc<dyn ToolchainBootstrap>>,
    /// Signing capability per platform family. Absent platforms skip the
    /// signing stage entirely.
    pub signers: HashMap<Platform, SignerSlot>,
}

/// Executes one job at a time through the stage sequence.
pub struct JobPipeline {
    binary: String,
    dist_dir: PathBuf,
    build_env: HashMap<String, String>,
    capabilities: Capabilities,
    policy: ErrorPolicy,
    publisher: ArtifactPublisher,
    /// Platform families whose cross prerequisites are already installed.
    prepared: Mutex<HashSet<Platform>>,
}

impl JobPipeline {
    pub fn new(
        binary: impl Into<String>,
        dist_dir: impl Into<PathBuf>,
        build_env: HashMap<String, String>,
        capabilities: Capabilities,
        policy: ErrorPolicy,
        publisher: ArtifactPublisher,
    ) -> Self {
        Self {
            binary: binary.into(),
            dist_dir: dist_dir.into(),
            build_env,
            capabilities,
            policy,
            publisher,
            prepared: Mutex::new(HashSet::new()),
        }
    }

    pub fn policy(&self) -> &ErrorPolicy {
        &self.policy
    }

    /// Run one matrix entry to a terminal state. Never panics, never
    /// retries; the returned job is `Done` or `Failed`.
    pub async fn run_job(&self, entry: MatrixEntry, ctx: &TriggerContext) -> Job {
        let mut job = Job::new(entry);
        job.started_at = Some(Utc::now());
        info!(job = %job.display_name(), runner = %job.entry.runner, "job started");

        match self.drive(&mut job, ctx).await {
            Ok(()) => {
                info!(job = %job.display_name(), "job done");
            }
            Err(err) => {
                warn!(job = %job.display_name(), error = %err, "job failed");
                job.fail(err.to_string());
            }
        }
        job
    }

    async fn drive(&self, job: &mut Job, ctx: &TriggerContext) -> Result<()> {
        let target = job.entry.target.clone();

        // Build
        job.transition(JobState::Building);
        if target.cross_compile {
            self.prepare_toolchain(target.platform).await?;
        }
        let built = match self
            .capabilities
            .builder
            .build(&target, &self.build_env)
            .await
        {
            Ok(built) => {
                job.record(StageOutcome::success(StageKind::Build));
                built
            }
            Err(err) => {
                job.record(StageOutcome::failure(StageKind::Build, false, err.to_string()));
                return Err(err);
            }
        };

        // Sign
        let signed = self.sign_stage(job, ctx, &target, &built).await?;

        // Package
        job.transition(JobState::Packaging);
        let artifact = match packager::package(
            &self.binary,
            &target,
            &ctx.ref_name,
            signed,
            &built.path,
            &self.dist_dir,
        )
        .await
        {
            Ok(artifact) => {
                job.record(StageOutcome::success(StageKind::Package));
                artifact
            }
            Err(err) => {
                job.record(StageOutcome::failure(
                    StageKind::Package,
                    false,
                    err.to_string(),
                ));
                return Err(err);
            }
        };
        job.artifact = Some(artifact.clone());

        // Upload
        job.transition(JobState::Uploading);
        match self.publisher.publish(&artifact, ctx).await {
            Ok(result) => {
                job.record(StageOutcome::success(StageKind::Upload));
                job.publish = Some(result);
            }
            Err(err) => {
                job.record(StageOutcome::failure(
                    StageKind::Upload,
                    false,
                    err.to_string(),
                ));
                return Err(err);
            }
        }

        job.complete();
        Ok(())
    }

    /// Run the signing stage if the platform has a signing capability.
    /// Returns whether the artifact carries a signature.
    async fn sign_stage(
        &self,
        job: &mut Job,
        ctx: &TriggerContext,
        target: &BuildTarget,
        built: &BuiltBinary,
    ) -> Result<bool> {
        let slot = match self.capabilities.signers.get(&target.platform) {
            Some(slot) if slot.support != SigningSupport::None => slot.clone(),
            _ => {
                job.record(StageOutcome::skipped(
                    StageKind::Sign,
                    "no signing capability configured",
                ));
                return Ok(false);
            }
        };

        job.transition(JobState::Signing);
        match self.sign_and_notarize(&slot, target, &built.path).await {
            Ok(()) => {
                job.record(StageOutcome::success(StageKind::Sign));
                Ok(true)
            }
            Err(err) => {
                if self.policy.is_tolerated(StageKind::Sign, ctx)? {
                    warn!(job = %job.display_name(), error = %err, "signing failed, tolerated");
                    job.record(StageOutcome::failure(StageKind::Sign, true, err.to_string()));
                    Ok(false)
                } else {
                    job.record(StageOutcome::failure(StageKind::Sign, false, err.to_string()));
                    Err(err)
                }
            }
        }
    }

    async fn sign_and_notarize(
        &self,
        slot: &SignerSlot,
        target: &BuildTarget,
        binary: &Path,
    ) -> Result<()> {
        slot.signer.sign(binary, target).await?;
        if slot.support == SigningSupport::SignAndNotarize {
            match slot.signer.notarize(binary, target).await? {
                NotarizeVerdict::Accepted => {}
                NotarizeVerdict::Rejected { reason } => {
                    return Err(Error::Notarize {
                        target: target.identity(),
                        message: reason,
                    });
                }
            }
        }
        Ok(())
    }

    /// Install cross prerequisites at most once per platform family. The
    /// first job of a family installs; siblings wait on the lock.
    async fn prepare_toolchain(&self, platform: Platform) -> Result<()> {
        let toolchain = self.capabilities.toolchain.as_ref().ok_or_else(|| {
            Error::Toolchain {
                platform,
                message: "cross-compilation required but no bootstrap configured".to_string(),
            }
        })?;

        let mut prepared = self.prepared.lock().await;
        if prepared.contains(&platform) {
            return Ok(());
        }
        toolchain.prepare(platform).await?;
        prepared.insert(platform);
        Ok(())
    }
}
