//! Applies parsed commands to the agent network

use super::{Command, CreateSpec};
use crate::agents::{Addressee, Agent, AgentRegistry};
use crate::engine::ResponseEngine;
use crate::synthesis;
use conclave_common::constants::SYNTHESIZED_KEY;
use conclave_common::{ConclaveError, Result, normalize_agent_id};
use serde::{Deserialize, Serialize, Serializer};
use tracing::{debug, info, warn};

/// An agent created while executing commands
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedAgent {
    pub id: String,
    pub role: String,
}

/// Outcome of one round of command execution
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExecutionReport {
    pub actions_taken: Vec<String>,

    /// Responses keyed by agent id, in the order they were first produced
    #[serde(serialize_with = "ordered_map")]
    pub responses: Vec<(String, String)>,

    pub new_instances: Vec<CreatedAgent>,
}

fn ordered_map<S: Serializer>(entries: &[(String, String)], serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_map(entries.iter().map(|(k, v)| (k, v)))
}

impl ExecutionReport {
    pub fn response(&self, id: &str) -> Option<&str> {
        self.responses
            .iter()
            .find(|(key, _)| key == id)
            .map(|(_, text)| text.as_str())
    }

    /// Store a response; a later response for the same id replaces the earlier one in place
    pub fn set_response(&mut self, id: &str, text: String) {
        match self.responses.iter_mut().find(|(key, _)| key == id) {
            Some(entry) => entry.1 = text,
            None => self.responses.push((id.to_string(), text)),
        }
    }

    pub fn synthesized(&self) -> Option<&str> {
        self.response(SYNTHESIZED_KEY)
    }

    pub fn has_responses(&self) -> bool {
        !self.responses.is_empty()
    }

    /// Responses other than the synthesized answer, joined by newlines
    pub fn joined_responses(&self) -> String {
        self.responses
            .iter()
            .filter(|(key, _)| key != SYNTHESIZED_KEY)
            .map(|(_, text)| text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Interprets commands against the registry, one at a time and in order
pub struct CommandExecutor<'a> {
    engine: &'a ResponseEngine,
    registry: &'a mut AgentRegistry,
}

impl<'a> CommandExecutor<'a> {
    pub fn new(engine: &'a ResponseEngine, registry: &'a mut AgentRegistry) -> Self {
        Self { engine, registry }
    }

    /// Run one round. Failures of individual commands are logged and skipped.
    pub async fn execute(&mut self, commands: &[Command]) -> ExecutionReport {
        self.registry.reset_round();

        let mut report = ExecutionReport::default();
        // (agent id, response) pairs produced by TO commands this round
        let mut transcript: Vec<(String, String)> = Vec::new();

        for command in commands {
            match command {
                Command::Analyze { content } => {
                    report.actions_taken.push(format!("Analyzed task: {}", content));
                }
                Command::Create { agents } => {
                    for spec in agents {
                        match self.create_agent(spec, None).await {
                            Ok(created) => {
                                report
                                    .actions_taken
                                    .push(format!("Created new instance: {}", created.role));
                                report.new_instances.push(created);
                            }
                            Err(e) => warn!("Failed to create instance '{}': {}", spec.role, e),
                        }
                    }
                }
                Command::To { target, task } => {
                    self.dispatch(target, task, &mut transcript, &mut report).await;
                }
                Command::Connect { first, second } => match self.registry.connect(first, second) {
                    Ok(_) => {
                        let action = format!("Connected instances {} <-> {}", first, second);
                        info!("{}", action);
                        report.actions_taken.push(action);
                    }
                    Err(e) => warn!("Failed to connect {} and {}: {}", first, second, e),
                },
                Command::Message { from, to, text } => {
                    if text.is_empty() {
                        warn!("Empty MESSAGE from {} to {} skipped", from, to);
                    } else if self.registry.contains(from) && self.registry.send(from, to, text) {
                        report.actions_taken.push(format!("Sent message from {} to {}", from, to));
                    } else {
                        warn!("Invalid MESSAGE command: {} -> {}", from, to);
                    }
                }
                Command::Synthesize => {
                    match synthesis::synthesize(self.engine, self.registry).await {
                        Ok(text) if !text.trim().is_empty() => {
                            report.set_response(SYNTHESIZED_KEY, text);
                            report
                                .actions_taken
                                .push("Synthesized responses from all instances".to_string());
                        }
                        Ok(_) => warn!("Synthesis produced an empty response"),
                        Err(e) => warn!("Failed to synthesize responses: {}", e),
                    }
                }
            }
        }

        let linked = self.registry.full_mesh();
        debug!("Full mesh added {} link(s) across {} agent(s)", linked, self.registry.len());

        report
    }

    /// Create and register an agent, seeding it with its initial prompt.
    ///
    /// The id is `id` when given, else the normalized role, else the next
    /// `inst_<n>`. An existing agent with the same id is replaced.
    pub async fn create_agent(&mut self, spec: &CreateSpec, id: Option<&str>) -> Result<CreatedAgent> {
        let id = match id.map(normalize_agent_id).filter(|id| !id.is_empty()) {
            Some(id) => id,
            None => {
                let from_role = normalize_agent_id(&spec.role);
                if from_role.is_empty() {
                    self.registry.next_default_id()
                } else {
                    from_role
                }
            }
        };

        info!("Creating instance {} with role '{}' ({})", id, spec.role, spec.model_tier);
        self.registry
            .insert(Agent::new(id.clone(), spec.role.clone(), spec.model_tier));

        if let Some(prompt) = &spec.initial_prompt {
            let who = Addressee::Member(id.clone());
            if let Err(e) = self.engine.respond(self.registry, &who, prompt, true).await {
                warn!("Initial prompt for {} failed: {}", id, e);
            }
        }

        Ok(CreatedAgent {
            id,
            role: spec.role.clone(),
        })
    }

    async fn dispatch(
        &mut self,
        target: &str,
        task: &str,
        transcript: &mut Vec<(String, String)>,
        report: &mut ExecutionReport,
    ) {
        if task.is_empty() {
            warn!("TO {} has no task; skipped", target);
            return;
        }
        if !self.registry.contains(target) {
            warn!("{}", ConclaveError::UnresolvedReference(target.to_string()));
            return;
        }

        let prompt = if transcript.is_empty() {
            task.to_string()
        } else {
            let previous = transcript
                .iter()
                .map(|(id, output)| format!("{}: {}", id, output))
                .collect::<Vec<_>>()
                .join("\n");
            format!("Previous outputs:\n{}\n\nTask:\n{}", previous, task)
        };

        let who = Addressee::member(target);
        match self.engine.respond(self.registry, &who, &prompt, false).await {
            Ok(text) if !text.is_empty() => {
                transcript.push((target.to_string(), text.clone()));
                report.set_response(target, text);
                report
                    .actions_taken
                    .push(format!("Got response from instance {}", target));
            }
            Ok(_) => warn!("Instance {} returned no response", target),
            Err(e) => warn!("Task for {} failed: {}", target, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::parse_commands;
    use crate::test_support::{ScriptedService, Step, test_engine};
    use conclave_common::ModelTier;
    use conclave_common::constants::{COORDINATOR_ID, COORDINATOR_ROLE};

    fn registry() -> AgentRegistry {
        let mut registry = AgentRegistry::new();
        registry.set_coordinator(Agent::new(COORDINATOR_ID, COORDINATOR_ROLE, ModelTier::Standard));
        registry
    }

    #[tokio::test]
    async fn test_full_round() {
        let service = ScriptedService::new(vec![
            Step::Reply("seeded".into()),
            Step::Reply("intro text".into()),
            Step::Reply("final answer".into()),
        ]);
        let engine = test_engine(service.clone());
        let mut registry = registry();

        let commands = parse_commands(
            "ANALYZE: Need a writer\n\
             CREATE: Writer | normal | Write well\n\
             TO writer: Draft intro\n\
             SYNTHESIZE",
        );
        let report = CommandExecutor::new(&engine, &mut registry).execute(&commands).await;

        assert_eq!(
            report.actions_taken,
            vec![
                "Analyzed task: Need a writer",
                "Created new instance: Writer",
                "Got response from instance writer",
                "Synthesized responses from all instances",
            ]
        );
        assert_eq!(report.new_instances, vec![CreatedAgent { id: "writer".into(), role: "Writer".into() }]);
        assert_eq!(report.response("writer"), Some("intro text"));
        assert_eq!(report.synthesized(), Some("final answer"));

        let writer = registry.get("writer").unwrap();
        assert_eq!(writer.outputs(), ["intro text"]);
        assert_eq!(service.call_count(), 3);
    }

    #[tokio::test]
    async fn test_unknown_target_is_silent() {
        let service = ScriptedService::new(vec![]);
        let engine = test_engine(service.clone());
        let mut registry = registry();

        let commands = parse_commands("TO ghost: do something");
        let report = CommandExecutor::new(&engine, &mut registry).execute(&commands).await;

        assert!(report.actions_taken.is_empty());
        assert!(!report.has_responses());
        assert_eq!(service.call_count(), 0);
    }

    #[tokio::test]
    async fn test_later_tasks_see_the_round_transcript() {
        let service = ScriptedService::new(vec![Step::Reply("facts".into()), Step::Reply("prose".into())]);
        let engine = test_engine(service.clone());
        let mut registry = registry();

        let commands = parse_commands(
            "CREATE:\nResearcher\nWriter\nTO researcher: find facts\nTO writer: write it up",
        );
        let report = CommandExecutor::new(&engine, &mut registry).execute(&commands).await;

        assert_eq!(report.responses.len(), 2);
        let second = &service.requests()[1].user_prompt;
        assert!(second.ends_with("Previous outputs:\nresearcher: facts\n\nTask:\nwrite it up"));
    }

    #[tokio::test]
    async fn test_connect_message_and_mesh() {
        let service = ScriptedService::new(vec![]);
        let engine = test_engine(service.clone());
        let mut registry = registry();

        let commands = parse_commands(
            "CREATE:\nAlpha\nBeta\nGamma\n\
             CONNECT: alpha <-> beta\n\
             CONNECT: alpha <-> ghost\n\
             MESSAGE: alpha -> beta: hello\n\
             MESSAGE: ghost -> beta: hi",
        );
        let report = CommandExecutor::new(&engine, &mut registry).execute(&commands).await;

        assert!(report.actions_taken.contains(&"Connected instances alpha <-> beta".to_string()));
        assert!(report.actions_taken.contains(&"Sent message from alpha to beta".to_string()));
        assert_eq!(report.actions_taken.len(), 5);
        assert_eq!(registry.get("beta").unwrap().mailbox().len(), 1);

        for agent in registry.members() {
            assert_eq!(agent.peers().len(), 2);
        }
        assert!(registry.coordinator().unwrap().peers().is_empty());
    }

    #[tokio::test]
    async fn test_failed_task_does_not_stop_the_round() {
        let service = ScriptedService::new(vec![
            Step::Fail(conclave_common::GenerationError::Service("down".into())),
            Step::Reply("second".into()),
        ]);
        let engine = test_engine(service.clone());
        let mut registry = registry();

        let commands = parse_commands("CREATE:\nA\nB\nTO a: one\nTO b: two");
        let report = CommandExecutor::new(&engine, &mut registry).execute(&commands).await;

        assert_eq!(report.response("a"), None);
        assert_eq!(report.response("b"), Some("second"));
    }

    #[tokio::test]
    async fn test_blank_role_gets_default_id_and_duplicates_replace() {
        let service = ScriptedService::new(vec![]);
        let engine = test_engine(service.clone());
        let mut registry = registry();
        let mut executor = CommandExecutor::new(&engine, &mut registry);

        let first = executor.create_agent(&CreateSpec::new(""), None).await.unwrap();
        assert_eq!(first.id, "inst_1");

        executor.create_agent(&CreateSpec::new("Writer"), None).await.unwrap();
        let mut deep = CreateSpec::new("writer");
        deep.model_tier = ModelTier::DeepReasoning;
        executor.create_agent(&deep, None).await.unwrap();

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get("writer").unwrap().model_tier(), ModelTier::DeepReasoning);
    }

    #[tokio::test]
    async fn test_round_resets_completion_flags() {
        let service = ScriptedService::new(vec![]);
        let engine = test_engine(service.clone());
        let mut registry = registry();
        registry.insert(Agent::new("a", "A", ModelTier::Standard));
        registry.get_mut("a").unwrap().record_output("old");
        assert!(registry.all_complete());

        CommandExecutor::new(&engine, &mut registry)
            .execute(&parse_commands("ANALYZE: nothing to do"))
            .await;
        assert!(!registry.all_complete());
    }

    #[test]
    fn test_report_serializes_responses_in_order() {
        let mut report = ExecutionReport::default();
        report.set_response("zeta", "z".into());
        report.set_response("alpha", "a".into());
        report.set_response("zeta", "z2".into());

        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains(r#""responses":{"zeta":"z2","alpha":"a"}"#), "{}", json);
        assert_eq!(report.joined_responses(), "z2\na");
    }
}
