//! Slipway Core
//!
//! Core domain types, traits, and error handling for the Slipway release
//! orchestrator. This crate has minimal dependencies and defines the shared
//! vocabulary used across all other crates.

pub mod artifact;
pub mod condition;
pub mod context;
pub mod error;
pub mod ids;
pub mod job;
pub mod ports;
pub mod target;
pub mod template;

pub use error::{Error, Result};
pub use ids::*;
