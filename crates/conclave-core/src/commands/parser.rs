//! Line-oriented parser for coordinator responses

use super::{Command, CreateSpec};
use conclave_common::{ConclaveError, ModelTier, Result, normalize_agent_id};
use tracing::{debug, warn};

/// Prefixes that end a multi-line CREATE block
const BLOCK_TERMINATORS: &[&str] = &["ANALYZE:", "CREATE:", "CONNECT:", "MESSAGE:", "TO ", "SYNTHESIZE"];

/// Strip surrounding whitespace and leading bullet markers
fn clean_line(line: &str) -> &str {
    line.trim()
        .trim_start_matches(['-', '*', ' '])
        .trim_end()
}

/// Parse a coordinator response into commands, in order of appearance.
///
/// Malformed commands are dropped with a warning; any other text is ignored.
pub fn parse_commands(response: &str) -> Vec<Command> {
    let lines: Vec<&str> = response.lines().map(clean_line).collect();
    let mut commands = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i];
        i += 1;
        if line.is_empty() {
            continue;
        }

        let parsed = if let Some(rest) = line.strip_prefix("ANALYZE:") {
            Ok(Some(Command::Analyze {
                content: rest.trim().to_string(),
            }))
        } else if let Some(rest) = line.strip_prefix("CREATE:") {
            let mut block: Vec<&str> = Vec::new();
            if !rest.trim().is_empty() {
                block.push(rest.trim());
            }
            while i < lines.len() && !BLOCK_TERMINATORS.iter().any(|kw| lines[i].starts_with(kw)) {
                if !lines[i].is_empty() {
                    block.push(lines[i]);
                }
                i += 1;
            }
            Ok(Some(Command::Create {
                agents: block.into_iter().map(parse_create_line).collect(),
            }))
        } else if let Some(rest) = line.strip_prefix("TO ") {
            parse_to(rest).map(Some)
        } else if let Some(rest) = line.strip_prefix("CONNECT:") {
            parse_connect(rest).map(Some)
        } else if let Some(rest) = line.strip_prefix("MESSAGE:") {
            parse_message(rest).map(Some)
        } else if line.starts_with("SYNTHESIZE") {
            Ok(Some(Command::Synthesize))
        } else {
            Ok(None)
        };

        match parsed {
            Ok(Some(command)) => {
                debug!("Parsed {} command", command.keyword());
                commands.push(command);
            }
            Ok(None) => {}
            Err(e) => warn!("Skipping line: {}", e),
        }
    }

    commands
}

/// `role | tier | prompt`, `role | tier`, `role | prompt` or `role`
pub fn parse_create_line(line: &str) -> CreateSpec {
    let fields: Vec<&str> = line.splitn(3, '|').map(str::trim).collect();
    let mut spec = CreateSpec::new(fields[0]);

    match fields.as_slice() {
        [_, tier, prompt] => {
            spec.model_tier = ModelTier::from_name(tier).unwrap_or_else(|| {
                warn!("Unknown model tier '{}' for {}, using {}", tier, fields[0], ModelTier::default());
                ModelTier::default()
            });
            spec.initial_prompt = non_empty(prompt);
        }
        [_, second] => match ModelTier::from_name(second) {
            Some(tier) => spec.model_tier = tier,
            None => spec.initial_prompt = non_empty(second),
        },
        _ => {}
    }

    spec
}

fn non_empty(text: &str) -> Option<String> {
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

fn parse_to(rest: &str) -> Result<Command> {
    let (target, task) = rest
        .split_once(':')
        .ok_or_else(|| ConclaveError::MalformedCommand(format!("TO without ':': TO {}", rest)))?;
    let target = normalize_agent_id(target);
    if target.is_empty() {
        return Err(ConclaveError::MalformedCommand(format!("TO without target: TO {}", rest)));
    }
    Ok(Command::To {
        target,
        task: task.trim().to_string(),
    })
}

fn parse_connect(rest: &str) -> Result<Command> {
    let malformed = || ConclaveError::MalformedCommand(format!("CONNECT:{}", rest));
    let (first, second) = rest.split_once("<->").ok_or_else(malformed)?;
    let (first, second) = (normalize_agent_id(first), normalize_agent_id(second));
    if first.is_empty() || second.is_empty() {
        return Err(malformed());
    }
    Ok(Command::Connect { first, second })
}

fn parse_message(rest: &str) -> Result<Command> {
    let malformed = || ConclaveError::MalformedCommand(format!("MESSAGE:{}", rest));
    let (from, routed) = rest.split_once("->").ok_or_else(malformed)?;
    let (to, text) = routed.split_once(':').ok_or_else(malformed)?;
    let (from, to) = (normalize_agent_id(from), normalize_agent_id(to));
    if from.is_empty() || to.is_empty() {
        return Err(malformed());
    }
    Ok(Command::Message {
        from,
        to,
        text: text.trim().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_four_command_response() {
        let commands = parse_commands(
            "ANALYZE: Need a writer\n\
             CREATE: Writer | normal | Write well\n\
             TO writer: Draft intro\n\
             SYNTHESIZE",
        );

        assert_eq!(
            commands,
            vec![
                Command::Analyze {
                    content: "Need a writer".into()
                },
                Command::Create {
                    agents: vec![CreateSpec {
                        role: "Writer".into(),
                        model_tier: ModelTier::Standard,
                        initial_prompt: Some("Write well".into()),
                    }]
                },
                Command::To {
                    target: "writer".into(),
                    task: "Draft intro".into()
                },
                Command::Synthesize,
            ]
        );
    }

    #[test]
    fn test_create_three_fields_verbatim() {
        let spec = parse_create_line("Data Analyzer | thinking | Analyze data | keep the pipe");
        assert_eq!(spec.role, "Data Analyzer");
        assert_eq!(spec.model_tier, ModelTier::DeepReasoning);
        assert_eq!(spec.initial_prompt.as_deref(), Some("Analyze data | keep the pipe"));
    }

    #[test]
    fn test_create_two_field_forms() {
        let tiered = parse_create_line("Researcher | THINKING");
        assert_eq!(tiered.model_tier, ModelTier::DeepReasoning);
        assert_eq!(tiered.initial_prompt, None);

        let prompted = parse_create_line("Researcher | find sources");
        assert_eq!(prompted.model_tier, ModelTier::Standard);
        assert_eq!(prompted.initial_prompt.as_deref(), Some("find sources"));

        let bare = parse_create_line("Researcher");
        assert_eq!(bare, CreateSpec::new("Researcher"));
    }

    #[test]
    fn test_unknown_tier_falls_back_to_default() {
        let spec = parse_create_line("Critic | galaxy-brain | Review");
        assert_eq!(spec.model_tier, ModelTier::Standard);
        assert_eq!(spec.initial_prompt.as_deref(), Some("Review"));
    }

    #[test]
    fn test_multi_line_create_block_with_bullets() {
        let commands = parse_commands(
            "CREATE:\n\
             - Writer | normal | Draft\n\
             \n\
             * Editor | thinking\n\
             TO writer: go",
        );
        assert_eq!(commands.len(), 2);
        match &commands[0] {
            Command::Create { agents } => {
                assert_eq!(agents.len(), 2);
                assert_eq!(agents[1].role, "Editor");
                assert_eq!(agents[1].model_tier, ModelTier::DeepReasoning);
            }
            other => panic!("expected CREATE, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_lines_are_dropped() {
        let commands = parse_commands(
            "TO writer draft without colon\n\
             CONNECT: writer and editor\n\
             MESSAGE: writer -> editor no payload\n\
             MESSAGE: writer to editor: no arrow\n\
             create: lowercase is not a keyword\n\
             Some chatter",
        );
        assert!(commands.is_empty());
    }

    #[test]
    fn test_connect_and_message_normalize_ids() {
        let commands = parse_commands(
            "CONNECT: Data Analyzer <-> Report Writer\n\
             MESSAGE: Data Analyzer -> Report Writer: Use the table: row 3\n\
             SYNTHESIZE the results",
        );
        assert_eq!(
            commands,
            vec![
                Command::Connect {
                    first: "data-analyzer".into(),
                    second: "report-writer".into()
                },
                Command::Message {
                    from: "data-analyzer".into(),
                    to: "report-writer".into(),
                    text: "Use the table: row 3".into()
                },
                Command::Synthesize,
            ]
        );
    }

    #[test]
    fn test_parser_is_deterministic() {
        let response = "ANALYZE: x\nCREATE: A | normal\nTO a: y\nSYNTHESIZE";
        assert_eq!(parse_commands(response), parse_commands(response));
    }
}
