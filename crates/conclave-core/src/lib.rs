//! Conclave Core - command protocol and execution engine
//!
//! This crate provides the machinery behind a Conclave network:
//! - A shared rate budget and retry policy for generation calls
//! - Agents with private mailboxes, held in a registry
//! - A response engine that assembles each agent's context
//! - The coordinator command language (parser and executor)
//! - The network that runs one user turn end to end

pub mod agents;
pub mod commands;
pub mod engine;
pub mod network;
pub mod prompts;
pub mod rate_budget;
pub mod retry;
pub mod synthesis;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export key types for convenience
pub use agents::{Addressee, Agent, AgentRegistry, AgentStatus, Envelope, Mailbox, Turn};
pub use commands::{Command, CommandExecutor, CreateSpec, CreatedAgent, ExecutionReport, parse_commands};
pub use engine::ResponseEngine;
pub use network::{AgentListing, AgentSummary, Network, NetworkState, NetworkStats};
pub use prompts::{PromptStore, RoleProfile};
pub use rate_budget::RateBudget;
pub use retry::{RetryPolicy, Retryable};
pub use synthesis::{SYNTHESIS_FALLBACK, SYNTHESIS_FALLBACK_MARKER};
