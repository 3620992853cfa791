//! Command handlers: wire the manifest into the orchestration crates.

use crate::commands::ContextArgs;
use crate::config::ReleaseManifest;
use anyhow::{bail, Context};
use slipway_core::context::TriggerContext;
use slipway_core::job::JobState;
use slipway_core::ports::{
    ArtifactStore, BuildCapability, ReleaseStore, SigningCapability, ToolchainBootstrap,
};
use slipway_core::target::SigningSupport;
use slipway_matrix::{MatrixExpander, RunnerTable};
use slipway_pipeline::{
    Capabilities, ErrorPolicy, JobPipeline, RunCoordinator, RunReport, RunStatus, SignerSlot,
};
use slipway_publish::{ArtifactPublisher, LocalArtifactStore, LocalReleaseStore};
use slipway_runner::{ProcessBootstrap, ProcessBuilder, ProcessSigner};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::warn;

pub async fn plan(manifest_path: &Path, context: &ContextArgs) -> anyhow::Result<()> {
    let manifest = ReleaseManifest::load(manifest_path)?;
    let ctx = context.to_context()?;
    let entries = expander(&manifest).expand(&manifest.targets, &ctx)?;

    if entries.is_empty() {
        println!("matrix is empty for this context");
        return Ok(());
    }
    println!("{:<45} {:<10} runner", "target", "platform");
    for entry in &entries {
        println!(
            "{:<45} {:<10} {}",
            entry.target.identity(),
            entry.target.platform.to_string(),
            entry.runner
        );
    }
    Ok(())
}

pub async fn run(manifest_path: &Path, context: &ContextArgs) -> anyhow::Result<()> {
    let manifest = ReleaseManifest::load(manifest_path)?;
    let ctx = context.to_context()?;
    let entries = expander(&manifest).expand(&manifest.targets, &ctx)?;
    if entries.is_empty() {
        println!("matrix is empty for this context; nothing to do");
        return Ok(());
    }

    let pipeline = Arc::new(build_pipeline(&manifest)?);
    let coordinator = RunCoordinator::new(pipeline);

    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling run");
            let _ = cancel_tx.send(true);
        }
    });

    let report = coordinator.execute(entries, &ctx, cancel_rx).await?;
    print_report(&report, &ctx);

    if report.status == RunStatus::Failure {
        bail!("release run failed");
    }
    Ok(())
}

pub async fn validate(manifest_path: &Path) -> anyhow::Result<()> {
    ReleaseManifest::load(manifest_path)
        .with_context(|| format!("manifest {} is invalid", manifest_path.display()))?;
    println!("{} is valid", manifest_path.display());
    Ok(())
}

pub fn schema() -> anyhow::Result<()> {
    let schema = schemars::schema_for!(ReleaseManifest);
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}

fn expander(manifest: &ReleaseManifest) -> MatrixExpander {
    MatrixExpander::new(
        manifest.run_scope(),
        manifest.exclude.clone(),
        RunnerTable::new(manifest.runners.clone()),
    )
}

fn build_pipeline(manifest: &ReleaseManifest) -> anyhow::Result<JobPipeline> {
    let mut builder = ProcessBuilder::new(manifest.build.command.clone(), &manifest.binary);
    if let Some(workdir) = &manifest.build.workdir {
        builder = builder.with_workdir(workdir);
    }

    let toolchain = manifest
        .toolchain
        .clone()
        .map(|command| Arc::new(ProcessBootstrap::new(command)) as Arc<dyn ToolchainBootstrap>);

    let mut signers = HashMap::new();
    for (platform, signing) in &manifest.signing {
        let mut signer = ProcessSigner::new(signing.sign.clone())
            .with_credential_env(signing.credential_env.clone());
        if signing.support == SigningSupport::SignAndNotarize {
            let notarize = signing.notarize.clone().ok_or_else(|| {
                anyhow::anyhow!("signing for {} has no notarize command", platform)
            })?;
            signer = signer.with_notarize(notarize, signing.notarize_timeout_minutes);
        }
        signers.insert(
            *platform,
            SignerSlot {
                support: signing.support,
                signer: Arc::new(signer) as Arc<dyn SigningCapability>,
            },
        );
    }

    let policy = ErrorPolicy::new(&manifest.owner);
    let publisher = ArtifactPublisher::new(
        Arc::new(LocalArtifactStore::new(&manifest.stores.artifacts_dir))
            as Arc<dyn ArtifactStore>,
        Arc::new(LocalReleaseStore::new(&manifest.stores.releases_dir)) as Arc<dyn ReleaseStore>,
        policy.release_condition().clone(),
    );

    Ok(JobPipeline::new(
        &manifest.binary,
        &manifest.dist_dir,
        manifest.build.env.clone(),
        Capabilities {
            builder: Arc::new(builder) as Arc<dyn BuildCapability>,
            toolchain,
            signers,
        },
        policy,
        publisher,
    ))
}

fn print_report(report: &RunReport, ctx: &TriggerContext) {
    println!(
        "run {} ({} @ {}): {}",
        report.run_id, ctx.event, ctx.ref_name, report.status
    );
    for job in &report.jobs {
        let detail = match job.state {
            JobState::Done => job
                .artifact
                .as_ref()
                .map(|a| a.name.clone())
                .unwrap_or_default(),
            JobState::Failed => job.failure.clone().unwrap_or_default(),
            _ => String::new(),
        };
        println!(
            "  {:<45} {:<8} {}",
            job.display_name(),
            job.state.to_string(),
            detail
        );
    }
}
