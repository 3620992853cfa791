//! Runner pool selection.
//!
//! Self-hosted versus hosted runner selection keyed by repository owner is a
//! configuration lookup table, not business logic. Rules are checked in
//! declaration order; the first match wins.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use slipway_core::target::{Platform, RunnerPool};

/// One lookup rule. An absent `owner` or `platform` matches anything.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RunnerRule {
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub platform: Option<Platform>,
    pub pool: RunnerPool,
}

impl RunnerRule {
    fn matches(&self, owner: &str, platform: Platform) -> bool {
        self.owner.as_deref().is_none_or(|o| o == owner)
            && self.platform.is_none_or(|p| p == platform)
    }
}

/// Owner-keyed runner lookup table with hosted-image fallbacks.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct RunnerTable {
    #[serde(default)]
    pub rules: Vec<RunnerRule>,
}

impl RunnerTable {
    pub fn new(rules: Vec<RunnerRule>) -> Self {
        Self { rules }
    }

    /// Select the runner pool for a job. Falls back to the platform's stock
    /// hosted image when no rule matches.
    pub fn select(&self, owner: &str, platform: Platform) -> RunnerPool {
        self.rules
            .iter()
            .find(|rule| rule.matches(owner, platform))
            .map(|rule| rule.pool.clone())
            .unwrap_or_else(|| RunnerPool::Hosted {
                image: default_image(platform).to_string(),
            })
    }
}

fn default_image(platform: Platform) -> &'static str {
    match platform {
        Platform::Linux => "ubuntu-latest",
        Platform::Macos => "macos-latest",
        Platform::Windows => "windows-latest",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_owner_rule_beats_fallback() {
        let table = RunnerTable::new(vec![RunnerRule {
            owner: Some("slipway-dev".to_string()),
            platform: Some(Platform::Linux),
            pool: RunnerPool::SelfHosted {
                labels: vec!["self-hosted".to_string(), "x86_64".to_string()],
            },
        }]);

        let pool = table.select("slipway-dev", Platform::Linux);
        assert_eq!(
            pool,
            RunnerPool::SelfHosted {
                labels: vec!["self-hosted".to_string(), "x86_64".to_string()],
            }
        );
    }

    #[test]
    fn test_fork_falls_back_to_hosted_image() {
        let table = RunnerTable::new(vec![RunnerRule {
            owner: Some("slipway-dev".to_string()),
            platform: None,
            pool: RunnerPool::SelfHosted {
                labels: vec!["self-hosted".to_string()],
            },
        }]);

        let pool = table.select("some-fork", Platform::Macos);
        assert_eq!(
            pool,
            RunnerPool::Hosted {
                image: "macos-latest".to_string(),
            }
        );
    }

    #[test]
    fn test_first_matching_rule_wins() {
        let table = RunnerTable::new(vec![
            RunnerRule {
                owner: None,
                platform: Some(Platform::Windows),
                pool: RunnerPool::Hosted {
                    image: "windows-2022".to_string(),
                },
            },
            RunnerRule {
                owner: None,
                platform: None,
                pool: RunnerPool::Hosted {
                    image: "generic".to_string(),
                },
            },
        ]);

        assert_eq!(
            table.select("anyone", Platform::Windows),
            RunnerPool::Hosted {
                image: "windows-2022".to_string(),
            }
        );
    }
}
