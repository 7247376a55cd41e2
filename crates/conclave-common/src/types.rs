//! Common types used across Conclave components

use serde::{Deserialize, Serialize};

/// Which model variant answers an agent's calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModelTier {
    /// Standard model for basic tasks
    #[default]
    Standard,
    /// Enhanced model for complex reasoning
    DeepReasoning,
}

impl ModelTier {
    /// Parse a tier name as written by the coordinator, case-insensitively.
    ///
    /// Accepts the canonical names as well as the `normal`/`thinking` aliases
    /// the coordinator prompt advertises.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "standard" | "normal" => Some(ModelTier::Standard),
            "deep-reasoning" | "deep_reasoning" | "thinking" => Some(ModelTier::DeepReasoning),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelTier::Standard => "standard",
            ModelTier::DeepReasoning => "deep-reasoning",
        }
    }
}

impl std::fmt::Display for ModelTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_names_are_case_insensitive() {
        assert_eq!(ModelTier::from_name("Thinking"), Some(ModelTier::DeepReasoning));
        assert_eq!(ModelTier::from_name(" NORMAL "), Some(ModelTier::Standard));
        assert_eq!(ModelTier::from_name("deep-reasoning"), Some(ModelTier::DeepReasoning));
        assert_eq!(ModelTier::from_name("write a poem"), None);
    }

    #[test]
    fn test_tier_display_round_trips() {
        for tier in [ModelTier::Standard, ModelTier::DeepReasoning] {
            assert_eq!(ModelTier::from_name(&tier.to_string()), Some(tier));
        }
    }
}
