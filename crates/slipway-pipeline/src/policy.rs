//! Per-stage error tolerance.
//!
//! Only the signing stage is ever tolerated, and only outside the canonical
//! release context. Build, packaging, and the ephemeral upload are always
//! fatal to their job. The permanent release upload is gated by the same
//! predicate that disables tolerance, so it is never tolerated either — it
//! is simply not attempted.

use slipway_core::condition::Condition;
use slipway_core::context::TriggerContext;
use slipway_core::job::StageKind;
use slipway_core::Result;

/// Decides, per stage and context, whether a failure aborts the job.
#[derive(Debug, Clone)]
pub struct ErrorPolicy {
    /// Canonical release predicate: owner is canonical AND the event is a
    /// push AND the ref is a tag.
    release: Condition,
}

impl ErrorPolicy {
    pub fn new(canonical_owner: &str) -> Self {
        Self {
            release: Condition::all([
                Condition::eq("owner", canonical_owner),
                Condition::eq("event", "push"),
                Condition::eq("ref_kind", "tag"),
            ]),
        }
    }

    /// Build a policy from an explicit release predicate.
    pub fn from_condition(release: Condition) -> Self {
        Self { release }
    }

    /// The predicate gating release publishing, shared with the publisher.
    pub fn release_condition(&self) -> &Condition {
        &self.release
    }

    /// Validate the policy's conditions against a context up front. A
    /// condition error is a configuration defect and must abort the whole
    /// run, never silently misroute a job.
    pub fn check(&self, ctx: &TriggerContext) -> Result<()> {
        self.release.evaluate(ctx).map(|_| ())
    }

    /// Whether the context is a canonical push to a tag.
    pub fn is_release(&self, ctx: &TriggerContext) -> Result<bool> {
        self.release.evaluate(ctx)
    }

    /// Whether a failure of `stage` is tolerated in this context.
    pub fn is_tolerated(&self, stage: StageKind, ctx: &TriggerContext) -> Result<bool> {
        match stage {
            StageKind::Sign => Ok(!self.is_release(ctx)?),
            StageKind::Build | StageKind::Package | StageKind::Upload => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slipway_core::context::{EventKind, RefKind};

    const CANONICAL: &str = "slipway-dev";

    fn ctx(event: EventKind, ref_kind: RefKind, owner: &str) -> TriggerContext {
        let ref_name = match ref_kind {
            RefKind::Tag => "v1.0.0",
            RefKind::Branch => "main",
        };
        TriggerContext::new(event, ref_name, ref_kind, owner)
    }

    #[test]
    fn test_fork_owner_tolerates_signing_regardless_of_event() {
        let policy = ErrorPolicy::new(CANONICAL);
        for event in [
            EventKind::Push,
            EventKind::PullRequest,
            EventKind::WorkflowDispatch,
            EventKind::MergeGroup,
        ] {
            for ref_kind in [RefKind::Branch, RefKind::Tag] {
                let ctx = ctx(event, ref_kind, "some-fork");
                assert!(policy.is_tolerated(StageKind::Sign, &ctx).unwrap());
            }
        }
    }

    #[test]
    fn test_canonical_tag_push_disables_tolerance_and_enables_release() {
        let policy = ErrorPolicy::new(CANONICAL);
        let ctx = ctx(EventKind::Push, RefKind::Tag, CANONICAL);
        assert!(!policy.is_tolerated(StageKind::Sign, &ctx).unwrap());
        assert!(policy.is_release(&ctx).unwrap());
    }

    #[test]
    fn test_canonical_branch_push_still_tolerates_signing() {
        let policy = ErrorPolicy::new(CANONICAL);
        let ctx = ctx(EventKind::Push, RefKind::Branch, CANONICAL);
        assert!(policy.is_tolerated(StageKind::Sign, &ctx).unwrap());
        assert!(!policy.is_release(&ctx).unwrap());
    }

    #[test]
    fn test_other_stages_never_tolerated() {
        let policy = ErrorPolicy::new(CANONICAL);
        let ctx = ctx(EventKind::PullRequest, RefKind::Branch, "some-fork");
        for stage in [StageKind::Build, StageKind::Package, StageKind::Upload] {
            assert!(!policy.is_tolerated(stage, &ctx).unwrap());
        }
    }
}
