//! Trigger context types.
//!
//! A [`TriggerContext`] is created once per invocation from the event that
//! started the run and is never mutated afterwards. All gating decisions
//! (matrix scope, signing tolerance, release publishing) read from it.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// The kind of event that triggered the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Push,
    PullRequest,
    WorkflowDispatch,
    MergeGroup,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EventKind::Push => "push",
            EventKind::PullRequest => "pull_request",
            EventKind::WorkflowDispatch => "workflow_dispatch",
            EventKind::MergeGroup => "merge_group",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for EventKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "push" => Ok(EventKind::Push),
            "pull_request" => Ok(EventKind::PullRequest),
            "workflow_dispatch" => Ok(EventKind::WorkflowDispatch),
            "merge_group" => Ok(EventKind::MergeGroup),
            other => Err(format!("unknown event kind: {}", other)),
        }
    }
}

/// Whether the triggering ref is a branch or a tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RefKind {
    Branch,
    Tag,
}

impl fmt::Display for RefKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RefKind::Branch => "branch",
            RefKind::Tag => "tag",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for RefKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "branch" => Ok(RefKind::Branch),
            "tag" => Ok(RefKind::Tag),
            other => Err(format!("unknown ref kind: {}", other)),
        }
    }
}

/// Immutable description of the event a run was triggered by.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TriggerContext {
    pub event: EventKind,
    pub ref_name: String,
    pub ref_kind: RefKind,
    /// Owner of the repository the run executes in.
    pub owner: String,
    /// Manual-dispatch inputs. Empty for every other event kind, so every
    /// flag reads false outside a dispatch.
    #[serde(default)]
    pub flags: HashMap<String, bool>,
}

impl TriggerContext {
    pub fn new(
        event: EventKind,
        ref_name: impl Into<String>,
        ref_kind: RefKind,
        owner: impl Into<String>,
    ) -> Self {
        Self {
            event,
            ref_name: ref_name.into(),
            ref_kind,
            owner: owner.into(),
            flags: HashMap::new(),
        }
    }

    pub fn with_flag(mut self, name: impl Into<String>, value: bool) -> Self {
        self.flags.insert(name.into(), value);
        self
    }

    /// Truthiness of a dispatch flag. Absent flags read false.
    pub fn flag(&self, name: &str) -> bool {
        self.flags.get(name).copied().unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_flag_reads_false() {
        let ctx = TriggerContext::new(EventKind::Push, "main", RefKind::Branch, "slipway-dev");
        assert!(!ctx.flag("extended-os"));
    }

    #[test]
    fn test_flag_roundtrip() {
        let ctx = TriggerContext::new(
            EventKind::WorkflowDispatch,
            "main",
            RefKind::Branch,
            "slipway-dev",
        )
        .with_flag("extended-os", true);
        assert!(ctx.flag("extended-os"));
    }

    #[test]
    fn test_event_kind_parse() {
        assert_eq!("push".parse::<EventKind>().unwrap(), EventKind::Push);
        assert_eq!(
            "merge_group".parse::<EventKind>().unwrap(),
            EventKind::MergeGroup
        );
        assert!("released".parse::<EventKind>().is_err());
    }
}
