//! Response engine: one agent, one task, one generation call
//!
//! The engine assembles an agent's full context (mailbox, its own previous
//! outputs, the latest outputs of its peers), selects the system prompt from
//! the agent's role and runs the call through the shared rate budget and
//! retry policy.

use crate::agents::{Addressee, AgentRegistry, Envelope};
use crate::prompts::{PromptStore, RoleProfile};
use crate::rate_budget::RateBudget;
use crate::retry::RetryPolicy;
use conclave_common::{ConclaveConfig, ConclaveError, GenerationError, ModelConfig, Result};
use conclave_llm::{GenerationRequest, GenerationService};
use std::sync::Arc;
use std::time::Duration;
use tracing::{Instrument, debug, info, info_span, warn};

/// Produces agent responses against a generation service
pub struct ResponseEngine {
    service: Arc<dyn GenerationService>,
    budget: Arc<RateBudget>,
    retry: RetryPolicy,
    prompts: Arc<PromptStore>,
    models: ModelConfig,
    call_timeout: Duration,
}

impl ResponseEngine {
    pub fn new(
        service: Arc<dyn GenerationService>,
        budget: Arc<RateBudget>,
        retry: RetryPolicy,
        prompts: Arc<PromptStore>,
        models: ModelConfig,
        call_timeout: Duration,
    ) -> Self {
        Self {
            service,
            budget,
            retry,
            prompts,
            models,
            call_timeout,
        }
    }

    pub fn from_config(
        service: Arc<dyn GenerationService>,
        prompts: Arc<PromptStore>,
        config: &ConclaveConfig,
    ) -> Self {
        Self::new(
            service,
            Arc::new(RateBudget::from_config(&config.rate_limit)),
            RetryPolicy::from_config(&config.retry),
            prompts,
            config.models.clone(),
            config.call_timeout(),
        )
    }

    pub fn prompts(&self) -> &PromptStore {
        &self.prompts
    }

    pub fn budget(&self) -> &Arc<RateBudget> {
        &self.budget
    }

    /// Generate a response from `who` for `task`.
    ///
    /// System calls (`is_system`) leave the agent's history untouched. A call
    /// that hits the per-call deadline yields an empty string. Envelopes taken
    /// from the mailbox are put back unless the call produced a response.
    pub async fn respond(
        &self,
        registry: &mut AgentRegistry,
        who: &Addressee,
        task: &str,
        is_system: bool,
    ) -> Result<String> {
        let agent_id = match registry.resolve(who) {
            Some(agent) => agent.id().to_string(),
            None => {
                let id = match who {
                    Addressee::Coordinator => "coordinator".to_string(),
                    Addressee::Member(id) => id.clone(),
                };
                return Err(ConclaveError::UnresolvedReference(id));
            }
        };

        self.respond_inner(registry, who, task, is_system)
            .instrument(info_span!("agent", id = %agent_id, system = is_system))
            .await
    }

    async fn respond_inner(
        &self,
        registry: &mut AgentRegistry,
        who: &Addressee,
        task: &str,
        is_system: bool,
    ) -> Result<String> {
        let peer_outputs = registry.latest_outputs_except(who);
        let agent = registry
            .resolve(who)
            .ok_or_else(|| ConclaveError::UnresolvedReference(format!("{:?}", who)))?;

        let drained = agent.mailbox().drain();
        let prompt = assemble_context(drained.envelopes(), agent.outputs(), &peer_outputs, task);
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(ConclaveError::InvalidMessage(format!(
                "assembled prompt for {} is empty",
                agent.id()
            )));
        }

        let system_prompt = RoleProfile::for_role(agent.role()).system_prompt(&self.prompts);
        let model = self.models.model_for(agent.model_tier());
        let request = GenerationRequest::new(model, system_prompt, prompt);
        let label = format!("generation for {}", agent.id());
        debug!("Agent {} ({}) received:\n{}", agent.id(), agent.role(), request.user_prompt);

        let outcome = self.generate_with_retry(&label, &request).await;

        match outcome {
            Ok(text) => {
                drained.commit();
                debug!("Agent responded:\n{}", text);
                if !is_system && !text.trim().is_empty() {
                    if let Some(agent) = registry.resolve_mut(who) {
                        agent.record_output(text.clone());
                    }
                }
                Ok(text)
            }
            Err(ConclaveError::Generation(GenerationError::Timeout(after))) => {
                warn!("Generation timed out after {:?}; treating as empty response", after);
                Ok(String::new())
            }
            Err(e) => Err(e),
        }
    }

    async fn generate_with_retry(&self, label: &str, request: &GenerationRequest) -> Result<String> {
        let budget = &self.budget;
        let service = &self.service;
        let call_timeout = self.call_timeout;

        self.retry
            .run(label, move |attempt| async move {
                if let Err(e) = budget.acquire(1).await {
                    return Err(e);
                }
                if attempt > 1 {
                    info!("Retrying generation, attempt {}", attempt);
                }
                match tokio::time::timeout(call_timeout, service.generate(request)).await {
                    Ok(result) => result.map_err(ConclaveError::from),
                    Err(_) => Err(GenerationError::Timeout(call_timeout).into()),
                }
            })
            .await
    }
}

/// Wrap `task` in the agent's context layers; the outermost layer comes first
pub fn assemble_context(
    envelopes: &[Envelope],
    own_outputs: &[String],
    peer_outputs: &[(String, String)],
    task: &str,
) -> String {
    let mut prompt = task.to_string();

    if !envelopes.is_empty() {
        let context = envelopes
            .iter()
            .map(|env| format!("Message from {}: {}", env.from, env.content))
            .collect::<Vec<_>>()
            .join("\n");
        prompt = format!("Context from other instances:\n{}\n\nTask:\n{}", context, prompt);
    }

    if !own_outputs.is_empty() {
        prompt = format!("Previous outputs:\n{}\n\nTask:\n{}", own_outputs.join("\n"), prompt);
    }

    if !peer_outputs.is_empty() {
        let others = peer_outputs
            .iter()
            .map(|(id, output)| format!("{}: {}", id, output))
            .collect::<Vec<_>>()
            .join("\n");
        prompt = format!("Outputs from other instances:\n{}\n\nTask:\n{}", others, prompt);
    }

    prompt
}
