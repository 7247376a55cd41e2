//! Scripted generation service for unit tests

use crate::engine::ResponseEngine;
use crate::prompts::PromptStore;
use crate::rate_budget::RateBudget;
use crate::retry::RetryPolicy;
use async_trait::async_trait;
use conclave_common::{GenerationError, ModelConfig};
use conclave_llm::{GenerationRequest, GenerationService};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// One scripted outcome
#[derive(Debug, Clone)]
pub enum Step {
    Reply(String),
    Fail(GenerationError),
    /// Never completes; only the call deadline ends it
    Hang,
}

type Responder = dyn Fn(&GenerationRequest) -> Step + Send + Sync;

/// Replays scripted steps in order and records every request.
///
/// Once the script runs out the responder (if any) decides, otherwise the
/// call fails with a service error.
pub struct ScriptedService {
    steps: Mutex<VecDeque<Step>>,
    responder: Option<Box<Responder>>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedService {
    pub fn new(steps: Vec<Step>) -> Arc<Self> {
        Arc::new(Self {
            steps: Mutex::new(steps.into()),
            responder: None,
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn with_responder<F>(steps: Vec<Step>, responder: F) -> Arc<Self>
    where
        F: Fn(&GenerationRequest) -> Step + Send + Sync + 'static,
    {
        Arc::new(Self {
            steps: Mutex::new(steps.into()),
            responder: Some(Box::new(responder)),
            requests: Mutex::new(Vec::new()),
        })
    }

    /// Every call fails with `error`
    pub fn failing(error: GenerationError) -> Arc<Self> {
        Self::with_responder(vec![], move |_| Step::Fail(error.clone()))
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl GenerationService for ScriptedService {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        self.requests.lock().unwrap().push(request.clone());
        let scripted = self.steps.lock().unwrap().pop_front();
        let step = match (scripted, &self.responder) {
            (Some(step), _) => step,
            (None, Some(responder)) => responder(request),
            (None, None) => Step::Fail(GenerationError::Service("script exhausted".into())),
        };

        match step {
            Step::Reply(text) => Ok(text),
            Step::Fail(error) => Err(error),
            Step::Hang => {
                std::future::pending::<()>().await;
                Ok(String::new())
            }
        }
    }
}

pub fn test_models() -> ModelConfig {
    ModelConfig {
        standard: "standard-model".to_string(),
        deep_reasoning: "deep-model".to_string(),
    }
}

/// Engine over `service` with the built-in prompts, a roomy budget and no jitter
pub fn test_engine(service: Arc<ScriptedService>) -> ResponseEngine {
    let prompts = PromptStore::builtin().expect("built-in prompts parse");
    ResponseEngine::new(
        service,
        Arc::new(RateBudget::new(1000, Duration::from_secs(60))),
        RetryPolicy {
            max_attempts: 5,
            base_delay: Duration::from_secs(1),
            multiplier: 2.0,
            max_delay: Duration::from_secs(60),
            jitter: 0.0,
        },
        Arc::new(prompts),
        test_models(),
        Duration::from_secs(5),
    )
}
