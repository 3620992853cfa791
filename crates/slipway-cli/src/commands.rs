//! CLI command and argument definitions.

use clap::{Args, Subcommand};
use slipway_core::context::{EventKind, RefKind, TriggerContext};
use slipway_core::{Error, Result};
use std::path::PathBuf;

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Print the expanded matrix for a context without running anything.
    Plan {
        #[arg(long, default_value = "slipway.yaml")]
        manifest: PathBuf,
        #[command(flatten)]
        context: ContextArgs,
    },
    /// Execute a release run.
    Run {
        #[arg(long, default_value = "slipway.yaml")]
        manifest: PathBuf,
        #[command(flatten)]
        context: ContextArgs,
    },
    /// Check a manifest for configuration defects.
    Validate {
        #[arg(long, default_value = "slipway.yaml")]
        manifest: PathBuf,
    },
    /// Emit the manifest JSON schema.
    Schema,
}

/// Trigger context, supplied by the invoking automation.
#[derive(Debug, Args)]
pub struct ContextArgs {
    /// Event kind: push, pull_request, workflow_dispatch, or merge_group.
    #[arg(long)]
    pub event: EventKind,
    /// Ref name, e.g. `main` or `v1.2.0`.
    #[arg(long)]
    pub ref_name: String,
    /// Ref kind: branch or tag.
    #[arg(long, default_value = "branch")]
    pub ref_kind: RefKind,
    /// Repository owner the run executes in.
    #[arg(long)]
    pub owner: String,
    /// Dispatch flag, `name` or `name=false`. Repeatable.
    #[arg(long = "flag", value_name = "NAME[=BOOL]")]
    pub flags: Vec<String>,
}

impl ContextArgs {
    pub fn to_context(&self) -> Result<TriggerContext> {
        let mut ctx = TriggerContext::new(
            self.event,
            self.ref_name.clone(),
            self.ref_kind,
            self.owner.clone(),
        );
        for flag in &self.flags {
            match flag.split_once('=') {
                Some((name, value)) => {
                    let value = value.parse::<bool>().map_err(|_| {
                        Error::InvalidManifest(format!("invalid flag value in `{}`", flag))
                    })?;
                    ctx = ctx.with_flag(name, value);
                }
                None => ctx = ctx.with_flag(flag.clone(), true),
            }
        }
        Ok(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_parse() {
        let args = ContextArgs {
            event: EventKind::WorkflowDispatch,
            ref_name: "main".to_string(),
            ref_kind: RefKind::Branch,
            owner: "slipway-dev".to_string(),
            flags: vec!["extended-os".to_string(), "debug-symbols=false".to_string()],
        };
        let ctx = args.to_context().unwrap();
        assert!(ctx.flag("extended-os"));
        assert!(!ctx.flag("debug-symbols"));
    }

    #[test]
    fn test_bad_flag_value_rejected() {
        let args = ContextArgs {
            event: EventKind::Push,
            ref_name: "main".to_string(),
            ref_kind: RefKind::Branch,
            owner: "slipway-dev".to_string(),
            flags: vec!["extended-os=yes".to_string()],
        };
        assert!(args.to_context().is_err());
    }
}
