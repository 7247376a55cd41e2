//! Conclave Common - Shared utilities and types
//!
//! This crate provides common error types, configuration structs,
//! and utility functions used across all Conclave components.

pub mod config;
pub mod constants;
pub mod error;
pub mod types;
pub mod utils;

// Re-export commonly used items
pub use config::{ConclaveConfig, ModelConfig, RateLimitConfig, RetryConfig};
pub use error::{ConclaveError, GenerationError, Result};
pub use types::ModelTier;
pub use utils::*;
