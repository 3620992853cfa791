//! Process-backed build capability.

use crate::process::{run_command, CommandSpec};
use async_trait::async_trait;
use slipway_core::ports::{BuildCapability, BuiltBinary};
use slipway_core::target::BuildTarget;
use slipway_core::template;
use slipway_core::{Error, Result};
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::info;

const DEFAULT_OUTPUT_PATH: &str = "target/{triple}/release/{bin}";

/// Invokes the configured build command per target.
///
/// The command's argument templates may reference `{triple}`, `{bin}`, and
/// `{profile}`. Extra toolchain flags from the target are appended to
/// `RUSTFLAGS`; everything else in the environment is passed through
/// without interpretation.
pub struct ProcessBuilder {
    command: CommandSpec,
    binary: String,
    workdir: Option<PathBuf>,
}

impl ProcessBuilder {
    pub fn new(command: CommandSpec, binary: impl Into<String>) -> Self {
        Self {
            command,
            binary: binary.into(),
            workdir: None,
        }
    }

    pub fn with_workdir(mut self, workdir: impl Into<PathBuf>) -> Self {
        self.workdir = Some(workdir.into());
        self
    }

    fn values(&self, target: &BuildTarget) -> HashMap<String, String> {
        let mut values = HashMap::new();
        values.insert("triple".to_string(), target.triple.clone());
        values.insert("bin".to_string(), self.binary.clone());
        values.insert(
            "profile".to_string(),
            target.cpu_profile.clone().unwrap_or_default(),
        );
        values
    }
}

#[async_trait]
impl BuildCapability for ProcessBuilder {
    async fn build(
        &self,
        target: &BuildTarget,
        env: &HashMap<String, String>,
    ) -> Result<BuiltBinary> {
        let values = self.values(target);
        let (program, args) = self.command.render(&values);

        let mut env = env.clone();
        if !target.rustflags.is_empty() {
            let mut flags = env.get("RUSTFLAGS").cloned().unwrap_or_default();
            for flag in &target.rustflags {
                if !flags.is_empty() {
                    flags.push(' ');
                }
                flags.push_str(flag);
            }
            env.insert("RUSTFLAGS".to_string(), flags);
        }

        info!(target = %target.identity(), %program, "building");
        let outcome = run_command(
            "build",
            &program,
            &args,
            &env,
            self.workdir.as_ref(),
            None,
        )
        .await
        .map_err(|e| Error::Build {
            target: target.identity(),
            message: e.to_string(),
        })?;

        if !outcome.success() {
            return Err(Error::Build {
                target: target.identity(),
                message: format!(
                    "build command exited with status {}: {}",
                    outcome.exit_code, outcome.stderr_tail
                ),
            });
        }

        let output_template = target
            .output_path
            .as_deref()
            .unwrap_or(DEFAULT_OUTPUT_PATH);
        let rendered = template::render(output_template, &values);
        let path = match &self.workdir {
            Some(dir) => dir.join(rendered),
            None => PathBuf::from(rendered),
        };
        if !path.exists() {
            return Err(Error::Build {
                target: target.identity(),
                message: format!("build succeeded but produced no binary at {}", path.display()),
            });
        }

        Ok(BuiltBinary { path })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slipway_core::target::Platform;

    #[tokio::test]
    async fn test_build_produces_binary_at_rendered_path() {
        let dir = tempfile::tempdir().unwrap();
        let command = CommandSpec::new(
            "sh",
            vec![
                "-c".to_string(),
                "mkdir -p out/{triple} && printf binary > out/{triple}/{bin}".to_string(),
            ],
        );
        let mut target = BuildTarget::new(Platform::Linux, "x86_64-unknown-linux-gnu");
        target.output_path = Some("out/{triple}/{bin}".to_string());

        let builder = ProcessBuilder::new(command, "app").with_workdir(dir.path());
        let built = builder.build(&target, &HashMap::new()).await.unwrap();

        assert!(built.path.exists());
        assert_eq!(
            std::fs::read_to_string(&built.path).unwrap(),
            "binary"
        );
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_build_failure() {
        let dir = tempfile::tempdir().unwrap();
        let command = CommandSpec::new(
            "sh",
            vec!["-c".to_string(), "echo 'error: boom' >&2; exit 101".to_string()],
        );
        let target = BuildTarget::new(Platform::Linux, "x86_64-unknown-linux-gnu");

        let builder = ProcessBuilder::new(command, "app").with_workdir(dir.path());
        let err = builder.build(&target, &HashMap::new()).await.unwrap_err();

        match err {
            Error::Build { message, .. } => {
                assert!(message.contains("101"));
                assert!(message.contains("boom"));
            }
            other => panic!("expected build error, got {}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_output_binary_is_build_failure() {
        let dir = tempfile::tempdir().unwrap();
        let command = CommandSpec::new("sh", vec!["-c".to_string(), "true".to_string()]);
        let target = BuildTarget::new(Platform::Linux, "x86_64-unknown-linux-gnu");

        let builder = ProcessBuilder::new(command, "app").with_workdir(dir.path());
        let err = builder.build(&target, &HashMap::new()).await.unwrap_err();
        assert!(matches!(err, Error::Build { .. }));
    }
}
