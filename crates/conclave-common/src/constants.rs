//! Common constants used across Conclave

/// Id of the coordinating agent
pub const COORDINATOR_ID: &str = "mother";

/// Role of the coordinating agent
pub const COORDINATOR_ROLE: &str = "scrum_master";

/// Role that selects the direct-command system prompt
pub const ASSISTANT_ROLE: &str = "assistant";

/// Key under which the synthesized answer is stored in a round's responses
pub const SYNTHESIZED_KEY: &str = "synthesized";

/// User inputs that end a session without any model call
pub const EXIT_KEYWORDS: &[&str] = &["exit", "quit"];

/// Returned for exit keywords
pub const FAREWELL_MESSAGE: &str = "Goodbye! Thank you for using the system.";

/// Returned when a turn produced no responses at all
pub const APOLOGY_MESSAGE: &str = "I apologize, but I couldn't process your request properly.";

/// Returned when a turn failed internally
pub const UNABLE_TO_PROCESS_MESSAGE: &str = "Sorry, I'm unable to process your request at this time.";

/// Names of the prompt templates the network requires
pub mod prompts {
    pub const MOTHER_NODE_INITIALIZATION: &str = "Mother Node Initialization";
    pub const DIRECT_COMMAND_TEMPLATE: &str = "Direct Command Template";
    pub const SYNTHESIS_PROMPT: &str = "Synthesis Prompt";

    /// Every section a usable prompt store must provide
    pub const REQUIRED: &[&str] = &[
        MOTHER_NODE_INITIALIZATION,
        DIRECT_COMMAND_TEMPLATE,
        SYNTHESIS_PROMPT,
    ];
}

/// Default model identifiers per tier
pub mod models {
    pub const STANDARD: &str = "gemini-1.5-flash";
    pub const DEEP_REASONING: &str = "gemini-2.0-flash-thinking-exp";
}

/// Default limits and timeouts
pub mod defaults {
    pub const RATE_LIMIT_MAX_CALLS: u32 = 15;
    pub const RATE_LIMIT_PERIOD_SECS: u64 = 60;
    pub const CALL_TIMEOUT_SECS: u64 = 120;
    pub const IDLE_MAX_AGE_HOURS: f64 = 1.0;
    pub const CLEANUP_INTERVAL_SECS: u64 = 600;
    pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

    pub const RETRY_MAX_ATTEMPTS: u32 = 5;
    pub const RETRY_BASE_DELAY_MS: u64 = 1000;
    pub const RETRY_MULTIPLIER: f64 = 2.0;
    pub const RETRY_MAX_DELAY_MS: u64 = 60_000;
    pub const RETRY_JITTER: f64 = 0.1;
}
