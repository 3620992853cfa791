//! Error types for Slipway.
//!
//! Every failure in the orchestrator is terminal for its stage or job; the
//! taxonomy below is what the pipeline's tolerance policy discriminates on.

use crate::artifact::SinkKind;
use crate::target::Platform;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    // Stage failures
    #[error("Build failed for {target}: {message}")]
    Build { target: String, message: String },

    #[error("Signing failed for {target}: {message}")]
    Sign { target: String, message: String },

    #[error("Notarization failed for {target}: {message}")]
    Notarize { target: String, message: String },

    #[error("Packaging failed for {artifact}: {message}")]
    Package { artifact: String, message: String },

    #[error("Publish to {sink} store failed for {artifact}: {message}")]
    Publish {
        sink: SinkKind,
        artifact: String,
        message: String,
    },

    #[error("Toolchain bootstrap failed for {platform}: {message}")]
    Toolchain {
        platform: Platform,
        message: String,
    },

    // Configuration defects — these abort the whole run, never a single job
    #[error("Condition references unknown context field: {0}")]
    UnknownConditionField(String),

    #[error("Invalid release manifest: {0}")]
    InvalidManifest(String),

    #[error("Duplicate matrix entry: {0}")]
    DuplicateMatrixEntry(String),

    // Run lifecycle
    #[error("Run cancelled: {reason}")]
    RunCancelled { reason: String },

    // Infrastructure
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// True for failures of the signing stage, including notarization.
    pub fn is_signing(&self) -> bool {
        matches!(self, Error::Sign { .. } | Error::Notarize { .. })
    }

    /// True for configuration defects that must abort the whole run rather
    /// than a single job.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Error::UnknownConditionField(_)
                | Error::InvalidManifest(_)
                | Error::DuplicateMatrixEntry(_)
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}
