//! Final answer synthesis on the coordinator

use crate::agents::{Addressee, AgentRegistry};
use crate::engine::ResponseEngine;
use conclave_common::Result;
use conclave_common::constants::prompts;
use tracing::info;

/// Marker line opening [`SYNTHESIS_FALLBACK`]
pub const SYNTHESIS_FALLBACK_MARKER: &str = "[NO INSTANCE OUTPUTS]";

/// Stands in for instance outputs when no agent produced any
pub const SYNTHESIS_FALLBACK: &str = "[NO INSTANCE OUTPUTS]
No specialist instance produced output in this round. Describe what the Conclave network offers instead:

1. Coordinator:
   - A single scrum-master agent reads every user request
   - It analyzes the request and answers only with commands
   - It synthesizes the team's results into the final answer

2. Specialist instances:
   - Created on demand with a role, a model tier and optional instructions
   - Receive tasks together with the outputs produced earlier in the round
   - Exchange direct messages through private mailboxes

3. Network:
   - Every instance is connected to every other after each round
   - All model calls share one rate budget
   - Idle instances are removed after a configurable age";

/// Text substituted for `{outputs_text}`: every member output, or the fallback passage
pub fn outputs_text(registry: &AgentRegistry) -> String {
    let outputs = registry.all_outputs();
    if outputs.is_empty() {
        SYNTHESIS_FALLBACK.to_string()
    } else {
        outputs.join("\n")
    }
}

/// Ask the coordinator to merge every member's outputs into one answer
pub async fn synthesize(engine: &ResponseEngine, registry: &mut AgentRegistry) -> Result<String> {
    info!("Synthesizing outputs with the coordinator");
    let outputs_text = outputs_text(registry);
    let prompt = engine
        .prompts()
        .render(prompts::SYNTHESIS_PROMPT, &[("outputs_text", &outputs_text)])?;
    engine
        .respond(registry, &Addressee::Coordinator, &prompt, false)
        .await
}
