//! The coordinator's command language
//!
//! A coordinator response is free text in which some lines are commands:
//!
//! ```text
//! ANALYZE: <analysis>
//! CREATE: <role> | <model tier> | <initial prompt>
//! TO <agent-id>: <task>
//! CONNECT: <agent-a> <-> <agent-b>
//! MESSAGE: <from-id> -> <to-id>: <text>
//! SYNTHESIZE
//! ```
//!
//! [`parse_commands`] turns the text into typed [`Command`]s and
//! [`CommandExecutor`] applies them to the live agent network.

pub mod executor;
pub mod parser;

pub use executor::{CommandExecutor, CreatedAgent, ExecutionReport};
pub use parser::parse_commands;

use conclave_common::ModelTier;
use serde::{Deserialize, Serialize};

/// One agent to create
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateSpec {
    pub role: String,
    pub model_tier: ModelTier,
    /// Seeded as a system turn right after creation
    pub initial_prompt: Option<String>,
}

impl CreateSpec {
    pub fn new(role: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            model_tier: ModelTier::default(),
            initial_prompt: None,
        }
    }
}

/// A parsed coordinator command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Command {
    Analyze { content: String },
    Create { agents: Vec<CreateSpec> },
    To { target: String, task: String },
    Connect { first: String, second: String },
    Message { from: String, to: String, text: String },
    Synthesize,
}

impl Command {
    /// Keyword of this command as written by the coordinator
    pub fn keyword(&self) -> &'static str {
        match self {
            Command::Analyze { .. } => "ANALYZE",
            Command::Create { .. } => "CREATE",
            Command::To { .. } => "TO",
            Command::Connect { .. } => "CONNECT",
            Command::Message { .. } => "MESSAGE",
            Command::Synthesize => "SYNTHESIZE",
        }
    }
}
