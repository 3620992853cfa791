//! Shared process spawning for the capability adapters.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use slipway_core::template;
use slipway_core::{Error, Result};
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

/// A configured external command. `args` may contain `{placeholder}`
/// tokens rendered per invocation.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CommandSpec {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Render the argument templates with `values`.
    pub fn render(&self, values: &HashMap<String, String>) -> (String, Vec<String>) {
        let args = self
            .args
            .iter()
            .map(|arg| template::render(arg, values))
            .collect();
        (self.program.clone(), args)
    }
}

/// Outcome of a finished process.
#[derive(Debug, Clone)]
pub struct ProcessOutcome {
    pub exit_code: i32,
    pub stderr_tail: String,
}

impl ProcessOutcome {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Spawn a command, stream its output into tracing, and wait for exit.
///
/// `env` is merged over the inherited environment and passed through
/// opaquely. With `timeout_minutes` set, expiry kills the process and is
/// reported as an internal error for the caller to map.
pub async fn run_command(
    label: &str,
    program: &str,
    args: &[String],
    env: &HashMap<String, String>,
    workdir: Option<&PathBuf>,
    timeout_minutes: Option<u32>,
) -> Result<ProcessOutcome> {
    debug!(%label, %program, ?args, "spawning");

    let mut command = Command::new(program);
    command
        .args(args)
        .envs(env)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(dir) = workdir {
        command.current_dir(dir);
    }

    let mut child = command
        .spawn()
        .map_err(|e| Error::Internal(format!("failed to spawn {}: {}", program, e)))?;

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    let stdout_label = label.to_string();
    let stdout_handle = tokio::spawn(async move {
        if let Some(stdout) = stdout {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                debug!(label = %stdout_label, "{}", line);
            }
        }
    });

    let stderr_label = label.to_string();
    let stderr_handle = tokio::spawn(async move {
        let mut tail = Vec::new();
        if let Some(stderr) = stderr {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                debug!(label = %stderr_label, "{}", line);
                tail.push(line);
                if tail.len() > 20 {
                    tail.remove(0);
                }
            }
        }
        tail.join("\n")
    });

    let status = if let Some(minutes) = timeout_minutes {
        match timeout(Duration::from_secs(u64::from(minutes) * 60), child.wait()).await {
            Ok(status) => status,
            Err(_) => {
                warn!(%label, minutes, "timed out, killing process");
                let _ = child.kill().await;
                return Err(Error::Internal(format!(
                    "{} timed out after {} minutes",
                    label, minutes
                )));
            }
        }
    } else {
        child.wait().await
    };

    let _ = stdout_handle.await;
    let stderr_tail = stderr_handle.await.unwrap_or_default();

    let status =
        status.map_err(|e| Error::Internal(format!("failed to wait for {}: {}", program, e)))?;
    let exit_code = status.code().unwrap_or(-1);
    debug!(%label, exit_code, "finished");

    Ok(ProcessOutcome {
        exit_code,
        stderr_tail,
    })
}
