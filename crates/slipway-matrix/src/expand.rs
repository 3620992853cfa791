//! Matrix expansion.
//!
//! The declared target list is flat rather than a cross-product: each target
//! already names its platform. Expansion filters by run scope and exclude
//! rules, then attaches a runner pool per entry. Same context plus same
//! target list always yields the same entry set in declared order.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use slipway_core::condition::Condition;
use slipway_core::context::TriggerContext;
use slipway_core::target::{BuildTarget, MatrixEntry, Platform};
use slipway_core::{Error, Result};
use std::collections::HashSet;
use tracing::debug;

use crate::runners::RunnerTable;

/// Which platforms are part of the extended OS set, and when that set is
/// included in a run.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RunScope {
    #[serde(default = "default_extended_platforms")]
    pub extended_platforms: Vec<Platform>,
    /// Entries on an extended platform are included only when this evaluates
    /// true.
    pub condition: Condition,
}

fn default_extended_platforms() -> Vec<Platform> {
    vec![Platform::Macos, Platform::Windows]
}

impl RunScope {
    /// The stock scope: macOS and Windows build only when a manual dispatch
    /// requests the extended OS set or the ref is the primary branch.
    pub fn standard(extended_os_flag: &str, primary_branch: &str) -> Self {
        Self {
            extended_platforms: default_extended_platforms(),
            condition: Condition::any([
                Condition::flag(extended_os_flag),
                Condition::eq("ref_name", primary_branch),
            ]),
        }
    }
}

/// A declarative exclusion. Target fields that are present must all match;
/// `when`, if present, must also evaluate true against the context.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ExcludeRule {
    #[serde(default)]
    pub platform: Option<Platform>,
    #[serde(default)]
    pub triple: Option<String>,
    #[serde(default)]
    pub cpu_profile: Option<String>,
    #[serde(default)]
    pub when: Option<Condition>,
}

impl ExcludeRule {
    fn matches_target(&self, target: &BuildTarget) -> bool {
        self.platform.is_none_or(|p| p == target.platform)
            && self.triple.as_deref().is_none_or(|t| t == target.triple)
            && (self.cpu_profile.is_none() || self.cpu_profile == target.cpu_profile)
    }

    fn applies(&self, target: &BuildTarget, ctx: &TriggerContext) -> Result<bool> {
        if !self.matches_target(target) {
            return Ok(false);
        }
        match &self.when {
            Some(condition) => condition.evaluate(ctx),
            None => Ok(true),
        }
    }
}

/// Produces the concrete job set for a run.
pub struct MatrixExpander {
    scope: RunScope,
    rules: Vec<ExcludeRule>,
    runners: RunnerTable,
}

impl MatrixExpander {
    pub fn new(scope: RunScope, rules: Vec<ExcludeRule>, runners: RunnerTable) -> Self {
        Self {
            scope,
            rules,
            runners,
        }
    }

    /// Expand the declared targets for a context.
    ///
    /// A condition error here is a configuration defect and aborts the run
    /// before any job starts.
    pub fn expand(
        &self,
        targets: &[BuildTarget],
        ctx: &TriggerContext,
    ) -> Result<Vec<MatrixEntry>> {
        let extended_in_scope = self.scope.condition.evaluate(ctx)?;
        let mut seen = HashSet::new();
        let mut entries = Vec::new();

        for target in targets {
            let identity = target.identity();
            if !seen.insert(identity.clone()) {
                return Err(Error::DuplicateMatrixEntry(identity));
            }

            if self.scope.extended_platforms.contains(&target.platform) && !extended_in_scope {
                debug!(target = %identity, "excluded: extended OS set not in scope");
                continue;
            }

            let mut excluded = false;
            for rule in &self.rules {
                if rule.applies(target, ctx)? {
                    debug!(target = %identity, "excluded by rule");
                    excluded = true;
                    break;
                }
            }
            if excluded {
                continue;
            }

            entries.push(MatrixEntry {
                target: target.clone(),
                runner: self.runners.select(&ctx.owner, target.platform),
            });
        }

        debug!(
            declared = targets.len(),
            expanded = entries.len(),
            "matrix expanded"
        );
        Ok(entries)
    }
}
