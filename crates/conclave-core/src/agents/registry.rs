//! Agent registry for the coordinator and its team

use super::agent::Agent;
use super::mailbox::Envelope;
use chrono::{DateTime, Utc};
use conclave_common::{ConclaveError, Result};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Which agent a call is addressed to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Addressee {
    Coordinator,
    Member(String),
}

impl Addressee {
    pub fn member(id: impl Into<String>) -> Self {
        Addressee::Member(id.into())
    }
}

/// The coordinator plus every team member, keyed by normalized id.
///
/// The coordinator lives outside the member map: commands cannot address it
/// and it takes no part in the mesh or in idle eviction.
#[derive(Debug, Default)]
pub struct AgentRegistry {
    coordinator: Option<Agent>,
    members: HashMap<String, Agent>,
    /// Member ids in insertion order
    order: Vec<String>,
    round_counter: u64,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_coordinator(&mut self, agent: Agent) {
        self.coordinator = Some(agent);
    }

    pub fn coordinator(&self) -> Option<&Agent> {
        self.coordinator.as_ref()
    }

    pub fn coordinator_mut(&mut self) -> Option<&mut Agent> {
        self.coordinator.as_mut()
    }

    pub fn resolve(&self, who: &Addressee) -> Option<&Agent> {
        match who {
            Addressee::Coordinator => self.coordinator(),
            Addressee::Member(id) => self.members.get(id),
        }
    }

    pub fn resolve_mut(&mut self, who: &Addressee) -> Option<&mut Agent> {
        match who {
            Addressee::Coordinator => self.coordinator_mut(),
            Addressee::Member(id) => self.members.get_mut(id),
        }
    }

    /// Register a member; an agent with the same id is replaced and returned
    pub fn insert(&mut self, agent: Agent) -> Option<Agent> {
        let id = agent.id().to_string();
        let replaced = self.members.insert(id.clone(), agent);
        if replaced.is_some() {
            warn!("Agent {} already existed and was replaced", id);
            self.detach_peer_links(&id);
        } else {
            self.order.push(id.clone());
        }
        debug!("Registered agent: {}", id);
        replaced
    }

    pub fn get(&self, id: &str) -> Option<&Agent> {
        self.members.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Agent> {
        self.members.get_mut(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.members.contains_key(id)
    }

    pub fn remove(&mut self, id: &str) -> Option<Agent> {
        let removed = self.members.remove(id)?;
        self.order.retain(|existing| existing != id);
        self.detach_peer_links(id);
        debug!("Removed agent: {}", id);
        Some(removed)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Member ids in insertion order
    pub fn ids(&self) -> &[String] {
        &self.order
    }

    /// Members in insertion order
    pub fn members(&self) -> impl Iterator<Item = &Agent> {
        self.order.iter().filter_map(|id| self.members.get(id))
    }

    /// Next default id (`inst_<n>`)
    pub fn next_default_id(&mut self) -> String {
        self.round_counter += 1;
        format!("inst_{}", self.round_counter)
    }

    /// Deliver `text` from `from` into `to`'s mailbox; a missing target is a no-op
    pub fn send(&self, from: &str, to: &str, text: &str) -> bool {
        match self.members.get(to) {
            Some(target) => {
                target.mailbox().push(Envelope::new(from, text));
                debug!("Queued message from {} to {}", from, to);
                true
            }
            None => false,
        }
    }

    /// Link two members symmetrically. Returns false when already linked.
    pub fn connect(&mut self, a: &str, b: &str) -> Result<bool> {
        for id in [a, b] {
            if !self.members.contains_key(id) {
                return Err(ConclaveError::UnresolvedReference(id.to_string()));
            }
        }
        if a == b {
            return Ok(false);
        }

        let mut added = false;
        if let Some(agent) = self.members.get_mut(a) {
            added |= agent.add_peer(b);
        }
        if let Some(agent) = self.members.get_mut(b) {
            added |= agent.add_peer(a);
        }
        Ok(added)
    }

    /// Connect every pair of members; returns the number of new links
    pub fn full_mesh(&mut self) -> usize {
        let ids = self.order.clone();
        let mut linked = 0;
        for (i, a) in ids.iter().enumerate() {
            for b in &ids[i + 1..] {
                if let Ok(true) = self.connect(a, b) {
                    linked += 1;
                }
            }
        }
        linked
    }

    /// Clear `task_completed` on every member
    pub fn reset_round(&mut self) {
        for agent in self.members.values_mut() {
            agent.reset_task();
        }
    }

    /// True when every member finished its task in the current round
    pub fn all_complete(&self) -> bool {
        self.members.values().all(Agent::task_completed)
    }

    /// Latest output of every member except `exclude`, in insertion order
    pub fn latest_outputs_except(&self, exclude: &Addressee) -> Vec<(String, String)> {
        self.members()
            .filter(|agent| !matches!(exclude, Addressee::Member(id) if id == agent.id()))
            .filter_map(|agent| {
                agent
                    .last_output()
                    .map(|output| (agent.id().to_string(), output.to_string()))
            })
            .collect()
    }

    /// Every output of every member, in insertion order
    pub fn all_outputs(&self) -> Vec<String> {
        self.members()
            .flat_map(|agent| agent.outputs().iter().cloned())
            .collect()
    }

    /// Remove members created before `cutoff`; returns their ids
    pub fn evict_created_before(&mut self, cutoff: DateTime<Utc>) -> Vec<String> {
        let stale: Vec<String> = self
            .members()
            .filter(|agent| agent.created_at() < cutoff)
            .map(|agent| agent.id().to_string())
            .collect();
        for id in &stale {
            self.remove(id);
        }
        stale
    }

    /// Drop every member and the coordinator's history; the coordinator stays
    pub fn clear(&mut self) {
        self.members.clear();
        self.order.clear();
        if let Some(coordinator) = self.coordinator.as_mut() {
            coordinator.clear_history();
        }
    }

    fn detach_peer_links(&mut self, id: &str) {
        for agent in self.members.values_mut() {
            agent.remove_peer(id);
        }
    }
}
