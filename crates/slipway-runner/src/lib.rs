//! Process-backed capability adapters for Slipway.
//!
//! The compiler, signing tools, and notarization service are external
//! programs; these adapters spawn them with configured commands, stream
//! their output into tracing, and map exit status to stage outcomes.

pub mod builder;
pub mod process;
pub mod signer;
pub mod toolchain;

pub use builder::ProcessBuilder;
pub use process::CommandSpec;
pub use signer::ProcessSigner;
pub use toolchain::ProcessBootstrap;
