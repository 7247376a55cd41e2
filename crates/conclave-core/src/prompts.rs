//! Prompt templates loaded from markdown
//!
//! A prompt file is split into sections by `## <Section Name>` headings.
//! Section bodies may contain `{name}` placeholders filled in by [`PromptStore::render`].

use conclave_common::constants::{self, prompts};
use conclave_common::{ConclaveError, Result};
use regex::{Captures, Regex};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

const BUILTIN_PROMPTS: &str = include_str!("../prompts/prompts.md");
const PLACEHOLDER_PATTERN: &str = r"\{(\w+)\}";

/// Named prompt sections
#[derive(Debug, Clone, Default)]
pub struct PromptStore {
    sections: HashMap<String, String>,
}

impl PromptStore {
    /// Parse markdown content; fails when no section is found
    pub fn parse(content: &str) -> Result<Self> {
        let mut sections = HashMap::new();
        let mut current: Option<String> = None;
        let mut body: Vec<&str> = Vec::new();

        for line in content.lines() {
            if let Some(name) = line.strip_prefix("## ") {
                if let Some(section) = current.take() {
                    sections.insert(section, body.join("\n").trim().to_string());
                }
                current = Some(name.trim().to_string());
                body.clear();
            } else if current.is_some() {
                body.push(line);
            }
        }
        if let Some(section) = current {
            sections.insert(section, body.join("\n").trim().to_string());
        }

        if sections.is_empty() {
            return Err(ConclaveError::Configuration(
                "no prompt sections found".to_string(),
            ));
        }

        debug!("Parsed {} prompt sections", sections.len());
        Ok(Self { sections })
    }

    /// Load prompts from a markdown file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ConclaveError::Configuration(format!(
                "failed to read prompts from {}: {}",
                path.display(),
                e
            ))
        })?;
        let store = Self::parse(&content)?;
        info!("Loaded {} prompt sections from {}", store.len(), path.display());
        Ok(store)
    }

    /// Prompts compiled into the crate
    pub fn builtin() -> Result<Self> {
        Self::parse(BUILTIN_PROMPTS)
    }

    /// Load from `path` when given, else the built-in prompts, then check required sections
    pub fn from_path(path: Option<&Path>) -> Result<Self> {
        let store = match path {
            Some(path) => Self::load(path)?,
            None => Self::builtin()?,
        };
        store.ensure_required()?;
        Ok(store)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.sections.get(name).map(String::as_str)
    }

    /// Section text, or a configuration error when the section is missing
    pub fn require(&self, name: &str) -> Result<&str> {
        self.get(name).ok_or_else(|| {
            ConclaveError::Configuration(format!("prompt template '{}' is missing", name))
        })
    }

    /// Fill `{name}` placeholders of a section; unknown placeholders are left as written
    pub fn render(&self, name: &str, vars: &[(&str, &str)]) -> Result<String> {
        let template = self.require(name)?;
        let placeholder = Regex::new(PLACEHOLDER_PATTERN)
            .map_err(|e| ConclaveError::Configuration(format!("placeholder pattern: {}", e)))?;

        let rendered = placeholder.replace_all(template, |caps: &Captures| {
            let key = &caps[1];
            vars.iter()
                .find(|(name, _)| *name == key)
                .map(|(_, value)| value.to_string())
                .unwrap_or_else(|| caps[0].to_string())
        });
        Ok(rendered.into_owned())
    }

    /// Fail unless every template the network needs is present
    pub fn ensure_required(&self) -> Result<()> {
        for name in prompts::REQUIRED {
            self.require(name)?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

/// System prompt profile selected from an agent's role
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleProfile {
    /// The coordinating agent
    Coordinator,
    /// The general assistant created by the direct-command fallback
    Assistant,
    /// Any other named specialist
    Specialist,
    /// Blank role: the call carries no system prompt
    Unknown,
}

impl RoleProfile {
    pub fn for_role(role: &str) -> Self {
        match role.trim() {
            "" => RoleProfile::Unknown,
            constants::COORDINATOR_ROLE => RoleProfile::Coordinator,
            constants::ASSISTANT_ROLE => RoleProfile::Assistant,
            _ => RoleProfile::Specialist,
        }
    }

    /// Prompt section backing this profile
    pub fn section(self) -> Option<&'static str> {
        match self {
            RoleProfile::Coordinator => Some(prompts::MOTHER_NODE_INITIALIZATION),
            RoleProfile::Assistant => Some(prompts::DIRECT_COMMAND_TEMPLATE),
            RoleProfile::Specialist => Some(prompts::SYNTHESIS_PROMPT),
            RoleProfile::Unknown => None,
        }
    }

    /// System prompt text for this profile, if the store has it
    pub fn system_prompt(self, store: &PromptStore) -> Option<String> {
        self.section()
            .and_then(|name| store.get(name))
            .map(str::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_sections() {
        let store = PromptStore::parse(
            "preamble\n## First\nline one\nline two\n\n## Second\n  body  \n",
        )
        .unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.get("First"), Some("line one\nline two"));
        assert_eq!(store.get("Second"), Some("body"));
        assert_eq!(store.get("preamble"), None);
    }

    #[test]
    fn test_no_sections_is_an_error() {
        let result = PromptStore::parse("just text\n# not a section\n");
        assert!(matches!(result, Err(ConclaveError::Configuration(_))));
    }

    #[test]
    fn test_render_fills_known_placeholders() {
        let store = PromptStore::parse("## T\nHello {name}, keep {other}.").unwrap();
        let rendered = store.render("T", &[("name", "team")]).unwrap();
        assert_eq!(rendered, "Hello team, keep {other}.");
        assert!(matches!(
            store.render("Missing", &[]),
            Err(ConclaveError::Configuration(_))
        ));
    }

    #[test]
    fn test_builtin_prompts_have_required_sections() {
        let store = PromptStore::builtin().unwrap();
        store.ensure_required().unwrap();
        let direct = store
            .render(prompts::DIRECT_COMMAND_TEMPLATE, &[("user_input", "hi")])
            .unwrap();
        assert!(direct.contains("TO assistant: hi"));
    }

    #[test]
    fn test_load_from_file_and_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prompts.md");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "## Mother Node Initialization\nlead").unwrap();

        let store = PromptStore::load(&path).unwrap();
        assert_eq!(store.require(prompts::MOTHER_NODE_INITIALIZATION).unwrap(), "lead");
        assert!(store.ensure_required().is_err());

        let missing = PromptStore::from_path(Some(&dir.path().join("absent.md")));
        assert!(matches!(missing, Err(ConclaveError::Configuration(_))));
    }

    #[test]
    fn test_role_profiles() {
        assert_eq!(RoleProfile::for_role("scrum_master"), RoleProfile::Coordinator);
        assert_eq!(RoleProfile::for_role("assistant"), RoleProfile::Assistant);
        assert_eq!(RoleProfile::for_role("Data Analyst"), RoleProfile::Specialist);
        assert_eq!(RoleProfile::for_role("  "), RoleProfile::Unknown);

        let store = PromptStore::builtin().unwrap();
        assert!(RoleProfile::Unknown.system_prompt(&store).is_none());
        assert!(RoleProfile::Specialist.system_prompt(&store).is_some());
    }
}
