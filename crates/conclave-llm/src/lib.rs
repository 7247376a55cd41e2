//! Conclave LLM - generation service integration
//!
//! This crate defines the narrow interface through which agents reach a
//! language model, plus the production implementation over `genai`.

pub mod llm;

// Re-export key types for convenience
pub use llm::{GenaiService, GenerationRequest, GenerationService, classify_provider_error};
