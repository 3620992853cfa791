//! Job and stage execution types.

use crate::artifact::{Artifact, PublishResult};
use crate::ids::JobId;
use crate::target::MatrixEntry;
use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The stages a job steps through, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    Build,
    Sign,
    Package,
    Upload,
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StageKind::Build => "build",
            StageKind::Sign => "sign",
            StageKind::Package => "package",
            StageKind::Upload => "upload",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Success,
    Failure,
    Skipped,
}

/// Outcome of one stage. Outcomes are append-only and ordered; a later stage
/// never runs if an earlier mandatory stage failed.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct StageOutcome {
    pub stage: StageKind,
    pub status: StageStatus,
    /// A tolerated failure is recorded but not fatal to the job.
    pub tolerated: bool,
    pub message: Option<String>,
    pub finished_at: DateTime<Utc>,
}

impl StageOutcome {
    pub fn success(stage: StageKind) -> Self {
        Self {
            stage,
            status: StageStatus::Success,
            tolerated: false,
            message: None,
            finished_at: Utc::now(),
        }
    }

    pub fn skipped(stage: StageKind, message: impl Into<String>) -> Self {
        Self {
            stage,
            status: StageStatus::Skipped,
            tolerated: false,
            message: Some(message.into()),
            finished_at: Utc::now(),
        }
    }

    pub fn failure(stage: StageKind, tolerated: bool, message: impl Into<String>) -> Self {
        Self {
            stage,
            status: StageStatus::Failure,
            tolerated,
            message: Some(message.into()),
            finished_at: Utc::now(),
        }
    }
}

/// Job pipeline states. `Failed` is absorbing and reachable from every
/// non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Pending,
    Building,
    Signing,
    Packaging,
    Uploading,
    Done,
    Failed,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Done | JobState::Failed)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobState::Pending => "pending",
            JobState::Building => "building",
            JobState::Signing => "signing",
            JobState::Packaging => "packaging",
            JobState::Uploading => "uploading",
            JobState::Done => "done",
            JobState::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}

/// One matrix entry's run through the pipeline. Created at matrix expansion,
/// mutated only by its own pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Job {
    pub id: JobId,
    pub entry: MatrixEntry,
    pub state: JobState,
    pub outcomes: Vec<StageOutcome>,
    pub artifact: Option<Artifact>,
    pub publish: Option<PublishResult>,
    pub failure: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl Job {
    pub fn new(entry: MatrixEntry) -> Self {
        Self {
            id: JobId::new(),
            entry,
            state: JobState::Pending,
            outcomes: Vec::new(),
            artifact: None,
            publish: None,
            failure: None,
            started_at: None,
            finished_at: None,
        }
    }

    pub fn display_name(&self) -> String {
        self.entry.target.identity()
    }

    /// Append a stage outcome. Outcomes are never rewritten.
    pub fn record(&mut self, outcome: StageOutcome) {
        self.outcomes.push(outcome);
    }

    pub fn transition(&mut self, state: JobState) {
        self.state = state;
    }

    /// Move to the absorbing `Failed` state.
    pub fn fail(&mut self, reason: impl Into<String>) {
        self.state = JobState::Failed;
        self.failure = Some(reason.into());
        self.finished_at = Some(Utc::now());
    }

    pub fn complete(&mut self) {
        self.state = JobState::Done;
        self.finished_at = Some(Utc::now());
    }

    /// Whether the signing stage produced a signature. False when signing
    /// was skipped or its failure was tolerated.
    pub fn signed(&self) -> bool {
        self.outcomes
            .iter()
            .any(|o| o.stage == StageKind::Sign && o.status == StageStatus::Success)
    }
}
