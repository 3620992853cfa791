//! Release manifest loading and validation.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use slipway_core::target::{BuildTarget, Platform, SigningSupport};
use slipway_core::{Error, Result};
use slipway_matrix::{ExcludeRule, RunScope, RunnerRule};
use slipway_runner::CommandSpec;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// The declarative release manifest, usually `slipway.yaml` at the
/// repository root.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ReleaseManifest {
    /// Name of the binary being released.
    pub binary: String,
    /// Canonical repository owner; signing tolerance and release publishing
    /// key off this.
    pub owner: String,
    #[serde(default = "default_primary_branch")]
    pub primary_branch: String,
    /// Manual-dispatch flag that pulls macOS/Windows into the matrix.
    #[serde(default = "default_extended_os_flag")]
    pub extended_os_flag: String,
    #[serde(default = "default_dist_dir")]
    pub dist_dir: PathBuf,
    pub build: BuildConfig,
    /// Installer for cross-compilation prerequisites, run once per platform
    /// family. Required when any target sets `cross_compile`.
    #[serde(default)]
    pub toolchain: Option<CommandSpec>,
    /// Signing configuration per platform family. Platforms without an
    /// entry skip the signing stage.
    #[serde(default)]
    pub signing: HashMap<Platform, SigningConfig>,
    #[serde(default)]
    pub stores: StoreConfig,
    pub targets: Vec<BuildTarget>,
    #[serde(default)]
    pub exclude: Vec<ExcludeRule>,
    #[serde(default)]
    pub runners: Vec<RunnerRule>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct BuildConfig {
    #[serde(flatten)]
    pub command: CommandSpec,
    /// Opaque environment passthrough to the build capability
    /// (incremental-compile toggle, codegen flags, and the like).
    #[serde(default)]
    pub env: HashMap<String, String>,
    #[serde(default)]
    pub workdir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SigningConfig {
    #[serde(default)]
    pub support: SigningSupport,
    pub sign: CommandSpec,
    #[serde(default)]
    pub notarize: Option<CommandSpec>,
    /// Names of credential environment variables handed to the signing
    /// tools. Values are never stored or logged.
    #[serde(default)]
    pub credential_env: Vec<String>,
    #[serde(default)]
    pub notarize_timeout_minutes: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct StoreConfig {
    #[serde(default = "default_artifacts_dir")]
    pub artifacts_dir: PathBuf,
    #[serde(default = "default_releases_dir")]
    pub releases_dir: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            artifacts_dir: default_artifacts_dir(),
            releases_dir: default_releases_dir(),
        }
    }
}

fn default_primary_branch() -> String {
    "main".to_string()
}

fn default_extended_os_flag() -> String {
    "extended-os".to_string()
}

fn default_dist_dir() -> PathBuf {
    PathBuf::from("dist")
}

fn default_artifacts_dir() -> PathBuf {
    PathBuf::from(".slipway/artifacts")
}

fn default_releases_dir() -> PathBuf {
    PathBuf::from(".slipway/releases")
}

impl ReleaseManifest {
    /// Load and validate a manifest from a YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::InvalidManifest(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let manifest: ReleaseManifest =
            serde_yaml::from_str(content).map_err(|e| Error::InvalidManifest(e.to_string()))?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// The run scope gating the extended OS set.
    pub fn run_scope(&self) -> RunScope {
        RunScope::standard(&self.extended_os_flag, &self.primary_branch)
    }

    fn validate(&self) -> Result<()> {
        if self.targets.is_empty() {
            return Err(Error::InvalidManifest(
                "at least one build target is required".to_string(),
            ));
        }
        for (platform, signing) in &self.signing {
            if signing.support == SigningSupport::SignAndNotarize && signing.notarize.is_none() {
                return Err(Error::InvalidManifest(format!(
                    "signing for {} requires notarization but no notarize command is configured",
                    platform
                )));
            }
        }
        if self.toolchain.is_none() && self.targets.iter().any(|t| t.cross_compile) {
            return Err(Error::InvalidManifest(
                "a target requires cross-compilation but no toolchain bootstrap is configured"
                    .to_string(),
            ));
        }
        Ok(())
    }
}
