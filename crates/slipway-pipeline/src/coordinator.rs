//! Run-level orchestration.
//!
//! One task per matrix entry, no shared mutable state between jobs, and a
//! fail-soft policy: a job's failure never cancels its siblings. External
//! cancellation aborts every non-terminal job and discards whatever those
//! jobs had produced.

use crate::pipeline::JobPipeline;
use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use slipway_core::context::TriggerContext;
use slipway_core::ids::RunId;
use slipway_core::job::{Job, JobState};
use slipway_core::target::MatrixEntry;
use slipway_core::{Error, Result};
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

/// Aggregate status of a run: failure if any job failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Success,
    Failure,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunStatus::Success => "success",
            RunStatus::Failure => "failure",
        };
        write!(f, "{}", s)
    }
}

/// Terminal report of a run. Each job reports its own terminal state
/// independently; the aggregate is the only run-wide status.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RunReport {
    pub run_id: RunId,
    pub status: RunStatus,
    pub jobs: Vec<Job>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunReport {
    pub fn failed_jobs(&self) -> impl Iterator<Item = &Job> {
        self.jobs.iter().filter(|j| j.state == JobState::Failed)
    }
}

/// Drives all jobs of a run in parallel.
pub struct RunCoordinator {
    pipeline: Arc<JobPipeline>,
}

impl RunCoordinator {
    pub fn new(pipeline: Arc<JobPipeline>) -> Self {
        Self { pipeline }
    }

    /// Execute every entry to a terminal state and aggregate the outcome.
    ///
    /// `cancel` flips true to abort the run; non-terminal jobs are recorded
    /// as failed with a cancellation reason and publish nothing.
    pub async fn execute(
        &self,
        entries: Vec<MatrixEntry>,
        ctx: &TriggerContext,
        cancel: watch::Receiver<bool>,
    ) -> Result<RunReport> {
        // Gating conditions are evaluated before any job starts so a
        // configuration defect aborts the run, not a single job.
        self.pipeline.policy().check(ctx)?;

        let run_id = RunId::new();
        let started_at = Utc::now();
        info!(%run_id, jobs = entries.len(), event = %ctx.event, git_ref = %ctx.ref_name, "run started");

        let mut set: JoinSet<(usize, Job)> = JoinSet::new();
        for (index, entry) in entries.into_iter().enumerate() {
            let pipeline = self.pipeline.clone();
            let ctx = ctx.clone();
            let mut cancel = cancel.clone();
            set.spawn(async move {
                let fallback = entry.clone();
                let job = tokio::select! {
                    job = pipeline.run_job(entry, &ctx) => job,
                    _ = cancelled(&mut cancel) => {
                        let mut job = Job::new(fallback);
                        job.fail(
                            Error::RunCancelled {
                                reason: "run cancellation requested".to_string(),
                            }
                            .to_string(),
                        );
                        job
                    }
                };
                (index, job)
            });
        }

        let mut indexed: Vec<(usize, Job)> = Vec::new();
        let mut panicked = false;
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(pair) => indexed.push(pair),
                Err(err) => {
                    error!(error = %err, "job task aborted");
                    panicked = true;
                }
            }
        }

        // Jobs complete in any order; report in matrix order.
        indexed.sort_by_key(|(index, _)| *index);
        let jobs: Vec<Job> = indexed.into_iter().map(|(_, job)| job).collect();

        discard_failed_artifacts(&jobs).await;

        let status = if panicked || jobs.iter().any(|j| j.state == JobState::Failed) {
            RunStatus::Failure
        } else {
            RunStatus::Success
        };
        info!(%run_id, %status, "run finished");

        Ok(RunReport {
            run_id,
            status,
            jobs,
            started_at,
            finished_at: Utc::now(),
        })
    }
}

/// Partially-produced artifacts of failed jobs are discarded, never
/// published.
async fn discard_failed_artifacts(jobs: &[Job]) {
    for job in jobs {
        if job.state == JobState::Failed {
            if let Some(artifact) = &job.artifact {
                if tokio::fs::remove_file(&artifact.path).await.is_ok() {
                    debug!(artifact = %artifact.name, "discarded");
                }
            }
        }
    }
}

async fn cancelled(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow() {
            return;
        }
        if rx.changed().await.is_err() {
            // Sender gone without cancelling; this run can no longer be
            // cancelled externally.
            std::future::pending::<()>().await;
        }
    }
}
