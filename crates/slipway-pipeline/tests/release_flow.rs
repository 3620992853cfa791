//! End-to-end pipeline tests against in-memory capabilities.

use async_trait::async_trait;
use slipway_core::artifact::{Artifact, ReleaseOutcome, StoredArtifact};
use slipway_core::condition::Condition;
use slipway_core::context::{EventKind, RefKind, TriggerContext};
use slipway_core::job::{JobState, StageKind, StageStatus};
use slipway_core::ports::{
    ArtifactStore, BuildCapability, BuiltBinary, NotarizeVerdict, ReleaseStore, SigningCapability,
    ToolchainBootstrap,
};
use slipway_core::target::{
    BuildTarget, MatrixEntry, Platform, RunnerPool, SigningSupport,
};
use slipway_core::{Error, Result};
use slipway_pipeline::{Capabilities, ErrorPolicy, JobPipeline, RunCoordinator, RunStatus, SignerSlot};
use slipway_publish::ArtifactPublisher;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::Mutex;
use tokio::sync::watch;

const CANONICAL: &str = "slipway-dev";

#[derive(Default)]
struct FakeBuilder {
    dir: PathBuf,
    fail: HashSet<String>,
    hang: HashSet<String>,
    calls: Mutex<Vec<String>>,
}

impl FakeBuilder {
    fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
            ..Default::default()
        }
    }
}

#[async_trait]
impl BuildCapability for FakeBuilder {
    async fn build(
        &self,
        target: &BuildTarget,
        _env: &HashMap<String, String>,
    ) -> Result<BuiltBinary> {
        self.calls.lock().unwrap().push(target.triple.clone());
        if self.hang.contains(&target.triple) {
            std::future::pending::<()>().await;
        }
        if self.fail.contains(&target.triple) {
            return Err(Error::Build {
                target: target.identity(),
                message: "compiler exited with status 1".to_string(),
            });
        }
        let path = self.dir.join(format!("bin-{}", target.triple));
        tokio::fs::write(&path, b"binary").await?;
        Ok(BuiltBinary { path })
    }
}

struct FakeSigner {
    fail_sign: bool,
    reject_notarize: bool,
}

#[async_trait]
impl SigningCapability for FakeSigner {
    async fn sign(&self, _binary: &Path, target: &BuildTarget) -> Result<()> {
        if self.fail_sign {
            return Err(Error::Sign {
                target: target.identity(),
                message: "no signing identity".to_string(),
            });
        }
        Ok(())
    }

    async fn notarize(&self, _bundle: &Path, _target: &BuildTarget) -> Result<NotarizeVerdict> {
        if self.reject_notarize {
            Ok(NotarizeVerdict::Rejected {
                reason: "invalid entitlements".to_string(),
            })
        } else {
            Ok(NotarizeVerdict::Accepted)
        }
    }
}

#[derive(Default)]
struct FakeToolchain {
    calls: Mutex<Vec<Platform>>,
}

#[async_trait]
impl ToolchainBootstrap for FakeToolchain {
    async fn prepare(&self, platform: Platform) -> Result<()> {
        self.calls.lock().unwrap().push(platform);
        Ok(())
    }
}

#[derive(Default)]
struct MemoryArtifactStore {
    uploads: Mutex<Vec<String>>,
    fail: bool,
}

#[async_trait]
impl ArtifactStore for MemoryArtifactStore {
    async fn upload(&self, artifact: &Artifact) -> Result<StoredArtifact> {
        if self.fail {
            return Err(Error::Publish {
                sink: slipway_core::artifact::SinkKind::Ephemeral,
                artifact: artifact.name.clone(),
                message: "storage unavailable".to_string(),
            });
        }
        self.uploads.lock().unwrap().push(artifact.name.clone());
        Ok(StoredArtifact {
            name: artifact.name.clone(),
            location: format!("mem://artifacts/{}", artifact.name),
        })
    }
}

#[derive(Default)]
struct MemoryReleaseStore {
    attached: Mutex<Vec<(String, String)>>,
    fail: bool,
}

#[async_trait]
impl ReleaseStore for MemoryReleaseStore {
    async fn attach(&self, artifact: &Artifact, tag: &str) -> Result<StoredArtifact> {
        if self.fail {
            return Err(Error::Publish {
                sink: slipway_core::artifact::SinkKind::Release,
                artifact: artifact.name.clone(),
                message: "release API error".to_string(),
            });
        }
        self.attached
            .lock()
            .unwrap()
            .push((tag.to_string(), artifact.name.clone()));
        Ok(StoredArtifact {
            name: artifact.name.clone(),
            location: format!("mem://releases/{}/{}", tag, artifact.name),
        })
    }
}

struct Harness {
    pipeline: Arc<JobPipeline>,
    builder: Arc<FakeBuilder>,
    toolchain: Arc<FakeToolchain>,
    store: Arc<MemoryArtifactStore>,
    releases: Arc<MemoryReleaseStore>,
    _dist: tempfile::TempDir,
}

struct HarnessOptions {
    fail_builds: Vec<&'static str>,
    hang_builds: Vec<&'static str>,
    fail_sign: bool,
    reject_notarize: bool,
    fail_store: bool,
    fail_release: bool,
    policy: Option<ErrorPolicy>,
}

impl Default for HarnessOptions {
    fn default() -> Self {
        Self {
            fail_builds: vec![],
            hang_builds: vec![],
            fail_sign: false,
            reject_notarize: false,
            fail_store: false,
            fail_release: false,
            policy: None,
        }
    }
}

fn harness(options: HarnessOptions) -> Harness {
    let dist = tempfile::tempdir().unwrap();
    let mut builder = FakeBuilder::new(dist.path());
    builder.fail = options.fail_builds.iter().map(|s| s.to_string()).collect();
    builder.hang = options.hang_builds.iter().map(|s| s.to_string()).collect();
    let builder = Arc::new(builder);
    let toolchain = Arc::new(FakeToolchain::default());
    let store = Arc::new(MemoryArtifactStore {
        fail: options.fail_store,
        ..Default::default()
    });
    let releases = Arc::new(MemoryReleaseStore {
        fail: options.fail_release,
        ..Default::default()
    });

    let mut signers = HashMap::new();
    signers.insert(
        Platform::Macos,
        SignerSlot {
            support: SigningSupport::SignAndNotarize,
            signer: Arc::new(FakeSigner {
                fail_sign: options.fail_sign,
                reject_notarize: options.reject_notarize,
            }) as Arc<dyn SigningCapability>,
        },
    );

    let policy = options.policy.unwrap_or_else(|| ErrorPolicy::new(CANONICAL));
    let publisher = ArtifactPublisher::new(
        store.clone() as Arc<dyn ArtifactStore>,
        releases.clone() as Arc<dyn ReleaseStore>,
        policy.release_condition().clone(),
    );

    let pipeline = Arc::new(JobPipeline::new(
        "pulsar",
        dist.path().join("dist"),
        HashMap::new(),
        Capabilities {
            builder: builder.clone() as Arc<dyn BuildCapability>,
            toolchain: Some(toolchain.clone() as Arc<dyn ToolchainBootstrap>),
            signers,
        },
        policy,
        publisher,
    ));

    Harness {
        pipeline,
        builder,
        toolchain,
        store,
        releases,
        _dist: dist,
    }
}

fn entry(platform: Platform, triple: &str) -> MatrixEntry {
    MatrixEntry {
        target: BuildTarget::new(platform, triple),
        runner: RunnerPool::Hosted {
            image: "test".to_string(),
        },
    }
}

fn linux_v2_entry() -> MatrixEntry {
    MatrixEntry {
        target: BuildTarget::new(Platform::Linux, "x86_64-unknown-linux-gnu")
            .with_cpu_profile("v2"),
        runner: RunnerPool::Hosted {
            image: "test".to_string(),
        },
    }
}

fn canonical_tag_push() -> TriggerContext {
    TriggerContext::new(EventKind::Push, "v1.2.0", RefKind::Tag, CANONICAL)
}

fn fork_pull_request() -> TriggerContext {
    TriggerContext::new(EventKind::PullRequest, "patch-1", RefKind::Branch, "some-fork")
}

fn no_cancel() -> watch::Receiver<bool> {
    let (_tx, rx) = watch::channel(false);
    rx
}

#[tokio::test]
async fn test_linux_release_skips_signing_and_publishes_to_both_sinks() {
    let harness = harness(HarnessOptions::default());
    let ctx = canonical_tag_push();

    let job = harness.pipeline.run_job(linux_v2_entry(), &ctx).await;

    assert_eq!(job.state, JobState::Done);
    let stages: Vec<(StageKind, StageStatus)> =
        job.outcomes.iter().map(|o| (o.stage, o.status)).collect();
    assert_eq!(
        stages,
        vec![
            (StageKind::Build, StageStatus::Success),
            (StageKind::Sign, StageStatus::Skipped),
            (StageKind::Package, StageStatus::Success),
            (StageKind::Upload, StageStatus::Success),
        ]
    );

    let artifact = job.artifact.as_ref().unwrap();
    assert_eq!(artifact.name, "pulsar-linux-x86_64-v2-v1.2.0");
    assert!(!artifact.signed);

    assert_eq!(
        harness.store.uploads.lock().unwrap().as_slice(),
        ["pulsar-linux-x86_64-v2-v1.2.0"]
    );
    assert_eq!(
        harness.releases.attached.lock().unwrap().as_slice(),
        [(
            "v1.2.0".to_string(),
            "pulsar-linux-x86_64-v2-v1.2.0".to_string()
        )]
    );
    assert!(matches!(
        job.publish.as_ref().unwrap().release,
        ReleaseOutcome::Published { .. }
    ));
}

#[tokio::test]
async fn test_fork_pull_request_tolerates_macos_signing_failure() {
    let harness = harness(HarnessOptions {
        fail_sign: true,
        ..Default::default()
    });
    let ctx = fork_pull_request();

    let job = harness
        .pipeline
        .run_job(entry(Platform::Macos, "aarch64-apple-darwin"), &ctx)
        .await;

    assert_eq!(job.state, JobState::Done);
    let sign = job
        .outcomes
        .iter()
        .find(|o| o.stage == StageKind::Sign)
        .unwrap();
    assert_eq!(sign.status, StageStatus::Failure);
    assert!(sign.tolerated);
    assert!(!job.artifact.as_ref().unwrap().signed);

    // Permanent publish not attempted outside a canonical tag push.
    assert!(harness.releases.attached.lock().unwrap().is_empty());
    assert_eq!(job.publish.as_ref().unwrap().release, ReleaseOutcome::Skipped);
}

#[tokio::test]
async fn test_canonical_tag_push_does_not_tolerate_notarization_rejection() {
    let harness = harness(HarnessOptions {
        reject_notarize: true,
        ..Default::default()
    });
    let ctx = canonical_tag_push();

    let job = harness
        .pipeline
        .run_job(entry(Platform::Macos, "aarch64-apple-darwin"), &ctx)
        .await;

    assert_eq!(job.state, JobState::Failed);
    let sign = job
        .outcomes
        .iter()
        .find(|o| o.stage == StageKind::Sign)
        .unwrap();
    assert_eq!(sign.status, StageStatus::Failure);
    assert!(!sign.tolerated);
    // The job never reached packaging.
    assert!(job.outcomes.iter().all(|o| o.stage != StageKind::Package));
    assert!(harness.store.uploads.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_one_failed_job_does_not_cancel_siblings() {
    let harness = harness(HarnessOptions {
        fail_builds: vec!["aarch64-unknown-linux-gnu"],
        ..Default::default()
    });
    let ctx = canonical_tag_push();
    let coordinator = RunCoordinator::new(harness.pipeline.clone());

    let report = coordinator
        .execute(
            vec![
                entry(Platform::Linux, "x86_64-unknown-linux-gnu"),
                entry(Platform::Linux, "aarch64-unknown-linux-gnu"),
            ],
            &ctx,
            no_cancel(),
        )
        .await
        .unwrap();

    assert_eq!(report.status, RunStatus::Failure);
    assert_eq!(report.jobs.len(), 2);
    assert_eq!(report.jobs[0].state, JobState::Done);
    assert_eq!(report.jobs[1].state, JobState::Failed);
    assert_eq!(report.failed_jobs().count(), 1);
}

#[tokio::test]
async fn test_cancellation_aborts_non_terminal_jobs_and_publishes_nothing() {
    let harness = harness(HarnessOptions {
        hang_builds: vec!["x86_64-unknown-linux-gnu"],
        ..Default::default()
    });
    let (cancel_tx, cancel_rx) = watch::channel(false);
    let handle = tokio::spawn({
        let pipeline = harness.pipeline.clone();
        async move {
            RunCoordinator::new(pipeline)
                .execute(
                    vec![entry(Platform::Linux, "x86_64-unknown-linux-gnu")],
                    &canonical_tag_push(),
                    cancel_rx,
                )
                .await
        }
    });
    // Let the build start, then cancel.
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    cancel_tx.send(true).unwrap();

    let report = handle.await.unwrap().unwrap();
    assert_eq!(report.status, RunStatus::Failure);
    assert_eq!(report.jobs.len(), 1);
    assert_eq!(report.jobs[0].state, JobState::Failed);
    assert!(report.jobs[0].failure.as_ref().unwrap().contains("cancel"));
    assert!(harness.store.uploads.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_release_sink_failure_leaves_job_done() {
    let harness = harness(HarnessOptions {
        fail_release: true,
        ..Default::default()
    });
    let ctx = canonical_tag_push();

    let job = harness.pipeline.run_job(linux_v2_entry(), &ctx).await;

    assert_eq!(job.state, JobState::Done);
    assert_eq!(harness.store.uploads.lock().unwrap().len(), 1);
    assert!(matches!(
        job.publish.as_ref().unwrap().release,
        ReleaseOutcome::Failed { .. }
    ));
}

#[tokio::test]
async fn test_ephemeral_store_failure_fails_job() {
    let harness = harness(HarnessOptions {
        fail_store: true,
        ..Default::default()
    });
    let ctx = fork_pull_request();

    let job = harness.pipeline.run_job(linux_v2_entry(), &ctx).await;

    assert_eq!(job.state, JobState::Failed);
    let upload = job
        .outcomes
        .iter()
        .find(|o| o.stage == StageKind::Upload)
        .unwrap();
    assert_eq!(upload.status, StageStatus::Failure);
    assert!(!upload.tolerated);
}

#[tokio::test]
async fn test_cross_prerequisites_installed_once_per_family() {
    let harness = harness(HarnessOptions::default());
    let ctx = canonical_tag_push();
    let coordinator = RunCoordinator::new(harness.pipeline.clone());

    let mut first = entry(Platform::Linux, "aarch64-unknown-linux-gnu");
    first.target.cross_compile = true;
    let mut second = entry(Platform::Linux, "riscv64gc-unknown-linux-gnu");
    second.target.cross_compile = true;

    let report = coordinator
        .execute(vec![first, second], &ctx, no_cancel())
        .await
        .unwrap();

    assert_eq!(report.status, RunStatus::Success);
    assert_eq!(
        harness.toolchain.calls.lock().unwrap().as_slice(),
        [Platform::Linux]
    );
}

#[tokio::test]
async fn test_broken_gating_condition_aborts_run_before_any_job() {
    let harness = harness(HarnessOptions {
        policy: Some(ErrorPolicy::from_condition(Condition::eq(
            "repository_owner",
            CANONICAL,
        ))),
        ..Default::default()
    });
    let ctx = canonical_tag_push();
    let coordinator = RunCoordinator::new(harness.pipeline.clone());

    let err = coordinator
        .execute(
            vec![entry(Platform::Linux, "x86_64-unknown-linux-gnu")],
            &ctx,
            no_cancel(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, Error::UnknownConditionField(_)));
    assert!(harness.builder.calls.lock().unwrap().is_empty());
}
