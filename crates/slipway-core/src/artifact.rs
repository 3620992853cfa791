//! Artifact types and the release naming convention.

use crate::target::{BuildTarget, Platform};
use crate::template;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

/// Which store an artifact is published to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SinkKind {
    /// Short-lived build-output storage scoped to a single run.
    Ephemeral,
    /// Durable storage attached to a tagged release.
    Release,
}

impl fmt::Display for SinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SinkKind::Ephemeral => "ephemeral",
            SinkKind::Release => "release",
        };
        write!(f, "{}", s)
    }
}

/// A packaged release artifact, produced by the packaging stage and consumed
/// by the publisher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Artifact {
    /// Logical name following the release naming convention.
    pub name: String,
    /// On-disk location of the packaged file. For macOS this is the zip
    /// wrapper, not the bare binary.
    pub path: PathBuf,
    pub platform: Platform,
    pub signed: bool,
    /// SHA-256 of the packaged file, hex encoded.
    pub digest: String,
}

/// Where a published artifact ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct StoredArtifact {
    pub name: String,
    pub location: String,
}

/// Outcome of the optional release-store upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReleaseOutcome {
    /// Context did not satisfy the release predicate; upload not attempted.
    Skipped,
    Published { location: String },
    /// Attempted and failed. Surfaced, but independent of the job's state.
    Failed { message: String },
}

/// The two sink outcomes of publishing one artifact. Not atomic: the
/// ephemeral and release uploads succeed or fail independently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PublishResult {
    pub ephemeral: StoredArtifact,
    pub release: ReleaseOutcome,
}

/// Name an artifact for a target and ref:
/// `<binary>-<platform>-<arch>[-<cpu-profile>]-<ref-name>[.<ext>]`.
///
/// Pure and deterministic: the same (target, ref name) always yields the
/// same name. The `.exe` extension applies on Windows only; the macOS zip
/// wrapper is a packaging concern and not part of the logical name.
pub fn artifact_name(binary: &str, target: &BuildTarget, ref_name: &str) -> String {
    let suffix = match &target.artifact_suffix {
        Some(tpl) => {
            let mut values = HashMap::new();
            values.insert("platform".to_string(), target.platform.to_string());
            values.insert("arch".to_string(), target.arch().to_string());
            values.insert(
                "profile".to_string(),
                target.cpu_profile.clone().unwrap_or_default(),
            );
            template::render(tpl, &values)
        }
        None => match &target.cpu_profile {
            Some(profile) => format!("{}-{}-{}", target.platform, target.arch(), profile),
            None => format!("{}-{}", target.platform, target.arch()),
        },
    };
    format!(
        "{}-{}-{}{}",
        binary,
        suffix,
        ref_name,
        target.platform.exe_suffix()
    )
}
