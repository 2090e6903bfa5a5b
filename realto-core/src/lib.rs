//! Realto Core - Shared data structures, errors, configuration and logging
//!
//! This crate defines the core abstractions used across the Realto client workspace

pub mod config;
pub mod error;
pub mod logging;
pub mod types;

pub use config::*;
pub use error::*;
pub use logging::*;
pub use types::*;

// Re-export commonly used external types
pub use tokio;
pub use tracing;
