//! Common utility functions used across Conclave components

use uuid::Uuid;

/// Normalize an agent identifier.
///
/// Lower-cases and joins whitespace-separated words with hyphens so that a
/// role name ("Data Analyzer") and a reference to it ("data-analyzer")
/// resolve to the same identity. Idempotent.
pub fn normalize_agent_id(identifier: &str) -> String {
    identifier
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
        .to_lowercase()
}

/// Generate a short ID for request correlation (8 characters)
pub fn generate_short_id() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}

/// Truncate string to at most `max_chars` characters, adding an ellipsis
pub fn truncate_string(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_chars).collect();
        format!("{}...", kept)
    }
}
