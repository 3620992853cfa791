//! Build target and matrix entry types.
//!
//! These types represent the user-authored release matrix configuration.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Platform family a target builds for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Linux,
    Macos,
    Windows,
}

impl Platform {
    /// Executable suffix appended by the packaging convention.
    pub fn exe_suffix(&self) -> &'static str {
        match self {
            Platform::Windows => ".exe",
            _ => "",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Platform::Linux => "linux",
            Platform::Macos => "macos",
            Platform::Windows => "windows",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "linux" => Ok(Platform::Linux),
            "macos" => Ok(Platform::Macos),
            "windows" => Ok(Platform::Windows),
            other => Err(format!("unknown platform: {}", other)),
        }
    }
}

/// Signing capability shape for a platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SigningSupport {
    /// No signing step; the pipeline goes straight from build to packaging.
    #[default]
    None,
    SignOnly,
    SignAndNotarize,
}

/// One concrete (platform, triple, codegen profile) combination to build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct BuildTarget {
    pub platform: Platform,
    /// Target triple handed to the build capability, e.g.
    /// `x86_64-unknown-linux-gnu`.
    pub triple: String,
    /// Codegen profile name folded into the artifact suffix, e.g. `v2`.
    #[serde(default)]
    pub cpu_profile: Option<String>,
    /// Template for the built binary location. Placeholders: `{triple}`,
    /// `{bin}`, `{profile}`. Defaults to the conventional
    /// `target/{triple}/release/{bin}` layout.
    #[serde(default)]
    pub output_path: Option<String>,
    /// Override for the artifact name suffix. Placeholders: `{platform}`,
    /// `{arch}`, `{profile}`. Defaults to `<platform>-<arch>[-<profile>]`.
    #[serde(default)]
    pub artifact_suffix: Option<String>,
    /// Extra toolchain flags, passed through opaquely to the build
    /// capability.
    #[serde(default)]
    pub rustflags: Vec<String>,
    /// Whether cross-compilation prerequisites must be installed before the
    /// first build of this platform family.
    #[serde(default)]
    pub cross_compile: bool,
}

impl BuildTarget {
    pub fn new(platform: Platform, triple: impl Into<String>) -> Self {
        Self {
            platform,
            triple: triple.into(),
            cpu_profile: None,
            output_path: None,
            artifact_suffix: None,
            rustflags: Vec::new(),
            cross_compile: false,
        }
    }

    pub fn with_cpu_profile(mut self, profile: impl Into<String>) -> Self {
        self.cpu_profile = Some(profile.into());
        self
    }

    /// CPU architecture, taken from the leading component of the triple.
    pub fn arch(&self) -> &str {
        self.triple.split('-').next().unwrap_or(&self.triple)
    }

    /// Matrix identity. Unique within a run: the same (platform, triple,
    /// profile) combination never produces two concurrent jobs.
    pub fn identity(&self) -> String {
        match &self.cpu_profile {
            Some(profile) => format!("{}-{}-{}", self.platform, self.triple, profile),
            None => format!("{}-{}", self.platform, self.triple),
        }
    }
}

/// Runner pool a job is scheduled on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RunnerPool {
    SelfHosted { labels: Vec<String> },
    Hosted { image: String },
}

impl fmt::Display for RunnerPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunnerPool::SelfHosted { labels } => write!(f, "self-hosted[{}]", labels.join(",")),
            RunnerPool::Hosted { image } => write!(f, "{}", image),
        }
    }
}

/// One expanded matrix entry: a target plus the runner pool chosen for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct MatrixEntry {
    pub target: BuildTarget,
    pub runner: RunnerPool,
}
