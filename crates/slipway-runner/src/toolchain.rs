//! Cross-compilation prerequisite bootstrap.

use crate::process::{run_command, CommandSpec};
use async_trait::async_trait;
use slipway_core::ports::ToolchainBootstrap;
use slipway_core::target::Platform;
use slipway_core::{Error, Result};
use std::collections::HashMap;
use tracing::info;

/// Runs a configured installer command for a platform family's cross
/// prerequisites. The pipeline guarantees at most one call per family per
/// run.
pub struct ProcessBootstrap {
    command: CommandSpec,
}

impl ProcessBootstrap {
    pub fn new(command: CommandSpec) -> Self {
        Self { command }
    }
}

#[async_trait]
impl ToolchainBootstrap for ProcessBootstrap {
    async fn prepare(&self, platform: Platform) -> Result<()> {
        let mut values = HashMap::new();
        values.insert("platform".to_string(), platform.to_string());
        let (program, args) = self.command.render(&values);

        info!(%platform, "installing cross-compilation prerequisites");
        let outcome = run_command("toolchain", &program, &args, &HashMap::new(), None, None)
            .await
            .map_err(|e| Error::Toolchain {
                platform,
                message: e.to_string(),
            })?;

        if !outcome.success() {
            return Err(Error::Toolchain {
                platform,
                message: format!(
                    "bootstrap exited with status {}: {}",
                    outcome.exit_code, outcome.stderr_tail
                ),
            });
        }
        Ok(())
    }
}
