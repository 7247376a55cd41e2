//! The coordinator network and its request/response cycle
//!
//! A [`Network`] owns the coordinating agent and its team. Each user turn asks
//! the coordinator for commands, executes them, and returns the synthesized
//! answer (or the best available fallback).

use crate::agents::{Addressee, Agent, AgentRegistry, AgentStatus};
use crate::commands::{CommandExecutor, CreateSpec, CreatedAgent, ExecutionReport, parse_commands};
use crate::engine::ResponseEngine;
use crate::prompts::PromptStore;
use chrono::{DateTime, Utc};
use conclave_common::constants::{
    APOLOGY_MESSAGE, COORDINATOR_ID, COORDINATOR_ROLE, EXIT_KEYWORDS, FAREWELL_MESSAGE,
    UNABLE_TO_PROCESS_MESSAGE, prompts,
};
use conclave_common::{ConclaveConfig, ConclaveError, ModelTier, Result, generate_short_id};
use conclave_llm::GenerationService;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{Instrument, debug, error, info, info_span, warn};

/// Lifecycle of the network; a turn moves Ready -> Dispatching -> AwaitingResponses -> Synthesized -> Ready
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkState {
    Uninitialized,
    Ready,
    Dispatching,
    AwaitingResponses,
    Synthesized,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentSummary {
    pub id: String,
    pub role: String,
}

/// The coordinator and every team member
#[derive(Debug, Clone, Serialize)]
pub struct AgentListing {
    pub mother_node: Option<AgentSummary>,
    pub instances: Vec<AgentSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NetworkStats {
    pub instance_count: usize,
    /// History turns across all team members
    pub total_messages: usize,
    pub mother_node_status: String,
    /// Seconds since the coordinator was created
    pub uptime: f64,
    pub state: NetworkState,
}

/// Coordinator, team and response engine
pub struct Network {
    engine: ResponseEngine,
    registry: AgentRegistry,
    state: NetworkState,
    idle_max_age_hours: f64,
}

impl Network {
    pub fn new(engine: ResponseEngine, idle_max_age_hours: f64) -> Self {
        Self {
            engine,
            registry: AgentRegistry::new(),
            state: NetworkState::Uninitialized,
            idle_max_age_hours,
        }
    }

    pub fn from_config(
        service: Arc<dyn GenerationService>,
        prompts: Arc<PromptStore>,
        config: &ConclaveConfig,
    ) -> Self {
        Self::new(
            ResponseEngine::from_config(service, prompts, config),
            config.idle_max_age_hours,
        )
    }

    pub fn state(&self) -> NetworkState {
        self.state
    }

    pub fn registry(&self) -> &AgentRegistry {
        &self.registry
    }

    pub fn engine(&self) -> &ResponseEngine {
        &self.engine
    }

    /// Create the coordinator and seed it with its initialization prompt
    pub async fn initialize(&mut self) -> Result<()> {
        if self.state != NetworkState::Uninitialized {
            debug!("Network already initialized");
            return Ok(());
        }

        let seed = self
            .engine
            .prompts()
            .require(prompts::MOTHER_NODE_INITIALIZATION)?
            .to_string();

        info!("Initializing coordinator");
        self.registry.set_coordinator(Agent::new(
            COORDINATOR_ID,
            COORDINATOR_ROLE,
            ModelTier::Standard,
        ));
        self.engine
            .respond(&mut self.registry, &Addressee::Coordinator, &seed, true)
            .await?;

        self.state = NetworkState::Ready;
        info!("Coordinator initialized");
        Ok(())
    }

    /// Answer one user turn.
    ///
    /// Only blank input and an uninitialized network are errors; any failure
    /// during the turn itself is logged and answered with a neutral message.
    pub async fn handle_user_input(&mut self, user_input: &str) -> Result<String> {
        let trimmed = user_input.trim();
        if trimmed.is_empty() {
            return Err(ConclaveError::InvalidInput(
                "User input cannot be empty".to_string(),
            ));
        }
        if EXIT_KEYWORDS.contains(&trimmed.to_lowercase().as_str()) {
            return Ok(FAREWELL_MESSAGE.to_string());
        }
        if self.state == NetworkState::Uninitialized {
            return Err(ConclaveError::Configuration(
                "network is not initialized".to_string(),
            ));
        }

        let request_id = generate_short_id();
        let span = info_span!("turn", request_id = %request_id);
        debug!(parent: &span, "Full user input: {}", user_input);

        let mut turn = TurnState::begin(&mut self.state);
        let result = run_turn(&self.engine, &mut self.registry, &mut turn, user_input)
            .instrument(span.clone())
            .await;
        drop(turn);

        match result {
            Ok(answer) => Ok(answer),
            Err(e) => {
                error!(parent: &span, "Error during coordinator turn: {:?}", e);
                Ok(UNABLE_TO_PROCESS_MESSAGE.to_string())
            }
        }
    }

    /// Directive sent to the coordinator for one user request
    pub fn directive_prompt(&self, user_input: &str) -> String {
        directive_for(&self.registry, user_input)
    }

    /// Parse a command response and execute it against the team
    pub async fn execute_response(&mut self, response: &str) -> ExecutionReport {
        execute_commands(&self.engine, &mut self.registry, response).await
    }

    /// Create a team member outside of a coordinator turn
    pub async fn create_agent(&mut self, spec: &CreateSpec, id: Option<&str>) -> Result<CreatedAgent> {
        CommandExecutor::new(&self.engine, &mut self.registry)
            .create_agent(spec, id)
            .await
    }

    /// Link two team members
    pub fn connect(&mut self, first: &str, second: &str) -> Result<bool> {
        self.registry.connect(first, second)
    }

    /// Remove team members older than `max_age_hours`; returns how many were removed
    pub fn cleanup(&mut self, max_age_hours: f64) -> usize {
        let Some(cutoff) = eviction_cutoff(max_age_hours) else {
            debug!("No instance can be older than {} hours; nothing to clean up", max_age_hours);
            return 0;
        };
        let removed = self.registry.evict_created_before(cutoff);
        for id in &removed {
            info!("Removing old instance: {}", id);
        }
        if !removed.is_empty() {
            info!("Cleaned up {} instance(s) older than {} hours", removed.len(), max_age_hours);
        }
        removed.len()
    }

    /// Cleanup with the configured idle age
    pub fn cleanup_idle(&mut self) -> usize {
        self.cleanup(self.idle_max_age_hours)
    }

    /// Drop the whole team and the coordinator's history
    pub fn reset(&mut self) {
        info!("Resetting network ({} instance(s))", self.registry.len());
        self.registry.clear();
    }

    /// Final idle sweep before the network is dropped
    pub fn shutdown(&mut self) -> usize {
        let removed = self.cleanup_idle();
        info!("Network shut down");
        removed
    }

    pub fn list_agents(&self) -> AgentListing {
        let summary = |agent: &Agent| AgentSummary {
            id: agent.id().to_string(),
            role: agent.role().to_string(),
        };
        AgentListing {
            mother_node: self.registry.coordinator().map(summary),
            instances: self.registry.members().map(summary).collect(),
        }
    }

    pub fn agent_status(&self, id: &str) -> Option<AgentStatus> {
        self.registry.get(id).map(Agent::status)
    }

    pub fn stats(&self) -> NetworkStats {
        let coordinator = self.registry.coordinator();
        NetworkStats {
            instance_count: self.registry.len(),
            total_messages: self.registry.members().map(|a| a.history().len()).sum(),
            mother_node_status: (if coordinator.is_some() { "active" } else { "inactive" }).to_string(),
            uptime: coordinator.map_or(0.0, |c| seconds_since(c.created_at())),
            state: self.state,
        }
    }

    /// True when every team member completed its task this round
    pub fn all_complete(&self) -> bool {
        self.registry.all_complete()
    }
}

/// Moves the network through a turn's states; dropping it, even mid-turn, returns to Ready
struct TurnState<'a> {
    state: &'a mut NetworkState,
}

impl<'a> TurnState<'a> {
    fn begin(state: &'a mut NetworkState) -> Self {
        *state = NetworkState::Dispatching;
        Self { state }
    }

    fn enter(&mut self, next: NetworkState) {
        *self.state = next;
    }
}

impl Drop for TurnState<'_> {
    fn drop(&mut self) {
        *self.state = NetworkState::Ready;
    }
}

async fn run_turn(
    engine: &ResponseEngine,
    registry: &mut AgentRegistry,
    turn: &mut TurnState<'_>,
    user_input: &str,
) -> Result<String> {
    let started = Instant::now();

    let directive = directive_for(registry, user_input);
    let response = engine
        .respond(registry, &Addressee::Coordinator, &directive, false)
        .await?;
    debug!("Coordinator response:\n{}", response);

    if response.trim().is_empty() {
        warn!("Coordinator returned an empty response");
        return Ok(UNABLE_TO_PROCESS_MESSAGE.to_string());
    }

    turn.enter(NetworkState::AwaitingResponses);
    let mut report = execute_commands(engine, registry, &response).await;

    if !report.has_responses() {
        warn!("No responses from coordinator commands. Using direct command");
        let direct = engine
            .prompts()
            .render(prompts::DIRECT_COMMAND_TEMPLATE, &[("user_input", user_input)])?;
        report = execute_commands(engine, registry, &direct).await;
    }

    let answer = final_answer(&report);
    turn.enter(NetworkState::Synthesized);

    info!(
        user_input_length = user_input.chars().count(),
        response_length = answer.chars().count(),
        instances_created = report.new_instances.len(),
        actions_taken = report.actions_taken.len(),
        responses_generated = report.responses.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "User interaction metrics"
    );

    Ok(answer)
}

async fn execute_commands(
    engine: &ResponseEngine,
    registry: &mut AgentRegistry,
    response: &str,
) -> ExecutionReport {
    let commands = parse_commands(response);
    debug!("Executing {} command(s)", commands.len());
    CommandExecutor::new(engine, registry).execute(&commands).await
}

fn directive_for(registry: &AgentRegistry, user_input: &str) -> String {
    let previous = registry
        .coordinator()
        .and_then(|c| c.history().last())
        .map(|turn| turn.text.as_str())
        .filter(|text| !text.is_empty())
        .map(|text| format!("\nPrevious response:\n{}\n", text))
        .unwrap_or_default();

    let roster = if registry.is_empty() {
        "(none)".to_string()
    } else {
        registry
            .members()
            .map(|agent| format!("{}: {}", agent.id(), agent.role()))
            .collect::<Vec<_>>()
            .join(", ")
    };

    format!(
        "User request: {user_input}
{previous}
As a Scrum Master, analyze and break down this request following these EXACT steps:

1. ANALYZE: Provide clear task analysis
2. CREATE: Make specialist instances if needed (format: CREATE: role | model_type | responsibility)
   Available model types:
   - normal: Standard model for basic tasks
   - thinking: Enhanced model for complex reasoning
3. TO: Assign specific tasks to instances (format: TO instance-id: detailed task)
4. SYNTHESIZE: At the end

Current team: {roster}

Rules:
- Must use ANALYZE, CREATE, TO, and SYNTHESIZE commands
- Each command must be on its own line
- Keep responses focused and actionable
- Always delegate tasks using TO commands
- Specify model_type in CREATE commands
- End with SYNTHESIZE"
    )
}

/// Synthesized answer, else the joined responses, else the apology
pub fn final_answer(report: &ExecutionReport) -> String {
    if let Some(synthesized) = report.synthesized() {
        synthesized.to_string()
    } else if report.has_responses() {
        report.joined_responses()
    } else {
        APOLOGY_MESSAGE.to_string()
    }
}

/// Creation time before which an agent counts as idle; `None` when no representable time is that old
fn eviction_cutoff(max_age_hours: f64) -> Option<DateTime<Utc>> {
    if max_age_hours.is_nan() {
        return None;
    }
    let max_age_ms = max_age_hours.max(0.0) * 3_600_000.0;
    if max_age_ms >= i64::MAX as f64 {
        return None;
    }
    let max_age = chrono::Duration::try_milliseconds(max_age_ms as i64)?;
    Utc::now().checked_sub_signed(max_age)
}

fn seconds_since(at: DateTime<Utc>) -> f64 {
    (Utc::now() - at).num_milliseconds().max(0) as f64 / 1000.0
}
