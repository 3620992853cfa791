//! Process-backed signing and notarization.

use crate::process::{run_command, CommandSpec};
use async_trait::async_trait;
use slipway_core::ports::{NotarizeVerdict, SigningCapability};
use slipway_core::target::BuildTarget;
use slipway_core::{Error, Result};
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

/// Drives a platform's signing tool, and optionally its notarization
/// service, as external commands.
///
/// Argument templates may reference `{file}` and `{triple}`. Credential
/// environment variable names are configuration; their values are read
/// from the orchestrator's environment at call time and never logged.
pub struct ProcessSigner {
    sign: CommandSpec,
    notarize: Option<CommandSpec>,
    credential_env: Vec<String>,
    /// Bound on the notarization wait. The service is a single opaque
    /// blocking call; expiry counts as a signing failure.
    notarize_timeout_minutes: Option<u32>,
}

impl ProcessSigner {
    pub fn new(sign: CommandSpec) -> Self {
        Self {
            sign,
            notarize: None,
            credential_env: Vec::new(),
            notarize_timeout_minutes: None,
        }
    }

    pub fn with_notarize(mut self, command: CommandSpec, timeout_minutes: Option<u32>) -> Self {
        self.notarize = Some(command);
        self.notarize_timeout_minutes = timeout_minutes;
        self
    }

    pub fn with_credential_env(mut self, names: Vec<String>) -> Self {
        self.credential_env = names;
        self
    }

    fn values(file: &Path, target: &BuildTarget) -> HashMap<String, String> {
        let mut values = HashMap::new();
        values.insert("file".to_string(), file.display().to_string());
        values.insert("triple".to_string(), target.triple.clone());
        values
    }

    fn credentials(&self) -> HashMap<String, String> {
        let mut env = HashMap::new();
        for name in &self.credential_env {
            match std::env::var(name) {
                Ok(value) => {
                    env.insert(name.clone(), value);
                }
                Err(_) => warn!(variable = %name, "signing credential not set"),
            }
        }
        env
    }
}

#[async_trait]
impl SigningCapability for ProcessSigner {
    async fn sign(&self, binary: &Path, target: &BuildTarget) -> Result<()> {
        let values = Self::values(binary, target);
        let (program, args) = self.sign.render(&values);

        info!(target = %target.identity(), file = %binary.display(), "signing");
        let outcome = run_command("sign", &program, &args, &self.credentials(), None, None)
            .await
            .map_err(|e| Error::Sign {
                target: target.identity(),
                message: e.to_string(),
            })?;

        if !outcome.success() {
            return Err(Error::Sign {
                target: target.identity(),
                message: format!(
                    "signing tool exited with status {}: {}",
                    outcome.exit_code, outcome.stderr_tail
                ),
            });
        }
        Ok(())
    }

    async fn notarize(&self, bundle: &Path, target: &BuildTarget) -> Result<NotarizeVerdict> {
        let command = self.notarize.as_ref().ok_or_else(|| Error::Notarize {
            target: target.identity(),
            message: "no notarization command configured".to_string(),
        })?;
        let values = Self::values(bundle, target);
        let (program, args) = command.render(&values);

        info!(target = %target.identity(), "submitting for notarization");
        let outcome = run_command(
            "notarize",
            &program,
            &args,
            &self.credentials(),
            None,
            self.notarize_timeout_minutes,
        )
        .await
        .map_err(|e| Error::Notarize {
            target: target.identity(),
            message: e.to_string(),
        })?;

        if outcome.success() {
            Ok(NotarizeVerdict::Accepted)
        } else {
            Ok(NotarizeVerdict::Rejected {
                reason: format!(
                    "notarization service returned status {}: {}",
                    outcome.exit_code, outcome.stderr_tail
                ),
            })
        }
    }
}
