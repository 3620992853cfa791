//! Typed predicate expressions over a [`TriggerContext`].
//!
//! Conditions gate matrix scope, signing tolerance, and release publishing,
//! so mis-evaluation is worse than failure: a predicate that references a
//! context field that does not exist is a hard configuration error, never a
//! silent false.

use crate::context::TriggerContext;
use crate::error::{Error, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A boolean predicate over trigger-context fields.
///
/// `all` and `any` short-circuit in declaration order, so an unknown field
/// in a later operand is only reported when it is actually reached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    All(Vec<Condition>),
    Any(Vec<Condition>),
    Not(Box<Condition>),
    /// Equality against a named context field: `event`, `ref_kind`,
    /// `ref_name`, or `owner`.
    Eq { field: String, value: String },
    /// Truthiness of a manual-dispatch flag. Absent flags read false.
    Flag { name: String },
}

impl Condition {
    pub fn eq(field: impl Into<String>, value: impl Into<String>) -> Self {
        Condition::Eq {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn flag(name: impl Into<String>) -> Self {
        Condition::Flag { name: name.into() }
    }

    pub fn all(conditions: impl IntoIterator<Item = Condition>) -> Self {
        Condition::All(conditions.into_iter().collect())
    }

    pub fn any(conditions: impl IntoIterator<Item = Condition>) -> Self {
        Condition::Any(conditions.into_iter().collect())
    }

    pub fn not(condition: Condition) -> Self {
        Condition::Not(Box::new(condition))
    }

    /// Evaluate against a context. No side effects.
    pub fn evaluate(&self, ctx: &TriggerContext) -> Result<bool> {
        match self {
            Condition::All(conditions) => {
                for condition in conditions {
                    if !condition.evaluate(ctx)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Condition::Any(conditions) => {
                for condition in conditions {
                    if condition.evaluate(ctx)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Condition::Not(condition) => Ok(!condition.evaluate(ctx)?),
            Condition::Eq { field, value } => Ok(field_value(ctx, field)? == *value),
            Condition::Flag { name } => Ok(ctx.flag(name)),
        }
    }
}

fn field_value(ctx: &TriggerContext, field: &str) -> Result<String> {
    match field {
        "event" => Ok(ctx.event.to_string()),
        "ref_kind" => Ok(ctx.ref_kind.to_string()),
        "ref_name" => Ok(ctx.ref_name.clone()),
        "owner" => Ok(ctx.owner.clone()),
        other => Err(Error::UnknownConditionField(other.to_string())),
    }
}
