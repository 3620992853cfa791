//! Matrix expansion and runner selection for Slipway.

pub mod expand;
pub mod runners;

pub use expand::{ExcludeRule, MatrixExpander, RunScope};
pub use runners::{RunnerRule, RunnerTable};
