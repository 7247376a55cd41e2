//! A single addressable agent and its conversation state

use super::mailbox::Mailbox;
use chrono::{DateTime, Utc};
use conclave_common::ModelTier;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;

/// One generated turn in an agent's history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    /// Role of the agent that produced the text
    pub role: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

/// Snapshot of an agent for listings and detail views
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentStatus {
    pub id: String,
    pub role: String,
    pub model_tier: ModelTier,
    pub created_at: DateTime<Utc>,
    pub task_completed: bool,
    pub message_count: usize,
    pub pending_messages: usize,
    pub connected_to: Vec<String>,
}

/// Conversation state of one agent
#[derive(Debug)]
pub struct Agent {
    id: String,
    role: String,
    model_tier: ModelTier,
    history: Vec<Turn>,
    outputs: Vec<String>,
    mailbox: Arc<Mailbox>,
    peers: BTreeSet<String>,
    task_completed: bool,
    created_at: DateTime<Utc>,
}

impl Agent {
    /// `id` must already be normalized
    pub fn new(id: impl Into<String>, role: impl Into<String>, model_tier: ModelTier) -> Self {
        Self {
            id: id.into(),
            role: role.into(),
            model_tier,
            history: Vec::new(),
            outputs: Vec::new(),
            mailbox: Mailbox::new(),
            peers: BTreeSet::new(),
            task_completed: false,
            created_at: Utc::now(),
        }
    }

    /// Override the creation time (idle eviction is based on it)
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn role(&self) -> &str {
        &self.role
    }

    pub fn model_tier(&self) -> ModelTier {
        self.model_tier
    }

    pub fn history(&self) -> &[Turn] {
        &self.history
    }

    pub fn outputs(&self) -> &[String] {
        &self.outputs
    }

    pub fn last_output(&self) -> Option<&str> {
        self.outputs.last().map(String::as_str)
    }

    pub fn mailbox(&self) -> &Arc<Mailbox> {
        &self.mailbox
    }

    pub fn peers(&self) -> &BTreeSet<String> {
        &self.peers
    }

    pub fn is_connected_to(&self, id: &str) -> bool {
        self.peers.contains(id)
    }

    pub fn task_completed(&self) -> bool {
        self.task_completed
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Append a generated (non-system) response and mark the task done
    pub fn record_output(&mut self, text: impl Into<String>) {
        let text = text.into();
        self.history.push(Turn {
            role: self.role.clone(),
            text: text.clone(),
            timestamp: Utc::now(),
        });
        self.outputs.push(text);
        self.task_completed = true;
    }

    /// Start of a new round
    pub fn reset_task(&mut self) {
        self.task_completed = false;
    }

    /// Forget history and outputs, keeping identity, peers and mailbox
    pub fn clear_history(&mut self) {
        self.history.clear();
        self.outputs.clear();
        self.task_completed = false;
    }

    pub(crate) fn add_peer(&mut self, id: &str) -> bool {
        self.peers.insert(id.to_string())
    }

    pub(crate) fn remove_peer(&mut self, id: &str) -> bool {
        self.peers.remove(id)
    }

    pub fn status(&self) -> AgentStatus {
        AgentStatus {
            id: self.id.clone(),
            role: self.role.clone(),
            model_tier: self.model_tier,
            created_at: self.created_at,
            task_completed: self.task_completed,
            message_count: self.history.len(),
            pending_messages: self.mailbox.len(),
            connected_to: self.peers.iter().cloned().collect(),
        }
    }
}
