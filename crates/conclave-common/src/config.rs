//! Configuration types and loading for Conclave
//!
//! Values resolve in three layers: built-in defaults, an optional TOML file,
//! then environment variables.

use crate::constants::{defaults, models};
use crate::error::{ConclaveError, Result};
use crate::types::ModelTier;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// Top-level configuration shared by the binaries
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConclaveConfig {
    pub rate_limit: RateLimitConfig,
    pub models: ModelConfig,
    pub retry: RetryConfig,
    /// Deadline for a single generation call, in seconds
    pub call_timeout_secs: u64,
    /// Agents older than this are evicted by cleanup
    pub idle_max_age_hours: f64,
    /// How often the API server sweeps idle agents
    pub cleanup_interval_secs: u64,
    /// Environment variable holding the provider API key
    pub api_key_env: String,
    /// Prompt file; the built-in prompts are used when unset
    pub prompts_path: Option<PathBuf>,
}

/// Shared call budget for the generation service
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub max_calls: u32,
    pub period_secs: u64,
}

/// Model name per tier
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub standard: String,
    pub deep_reasoning: String,
}

/// Backoff policy for transient generation failures
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub multiplier: f64,
    pub max_delay_ms: u64,
    /// Fractional jitter applied to every delay (0.1 = +/-10%)
    pub jitter: f64,
}

impl Default for ConclaveConfig {
    fn default() -> Self {
        Self {
            rate_limit: RateLimitConfig::default(),
            models: ModelConfig::default(),
            retry: RetryConfig::default(),
            call_timeout_secs: defaults::CALL_TIMEOUT_SECS,
            idle_max_age_hours: defaults::IDLE_MAX_AGE_HOURS,
            cleanup_interval_secs: defaults::CLEANUP_INTERVAL_SECS,
            api_key_env: defaults::API_KEY_ENV.to_string(),
            prompts_path: None,
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_calls: defaults::RATE_LIMIT_MAX_CALLS,
            period_secs: defaults::RATE_LIMIT_PERIOD_SECS,
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            standard: models::STANDARD.to_string(),
            deep_reasoning: models::DEEP_REASONING.to_string(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: defaults::RETRY_MAX_ATTEMPTS,
            base_delay_ms: defaults::RETRY_BASE_DELAY_MS,
            multiplier: defaults::RETRY_MULTIPLIER,
            max_delay_ms: defaults::RETRY_MAX_DELAY_MS,
            jitter: defaults::RETRY_JITTER,
        }
    }
}

impl RateLimitConfig {
    pub fn period(&self) -> Duration {
        Duration::from_secs(self.period_secs)
    }
}

impl ModelConfig {
    /// Model name serving the given tier
    pub fn model_for(&self, tier: ModelTier) -> &str {
        match tier {
            ModelTier::Standard => &self.standard,
            ModelTier::DeepReasoning => &self.deep_reasoning,
        }
    }
}

impl ConclaveConfig {
    /// Load defaults, then the optional TOML file, then process environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_toml_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML file; missing keys keep their defaults
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: ConclaveConfig = toml::from_str(&raw)?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Apply overrides from a key lookup (the process environment in production).
    ///
    /// Values that fail to parse are ignored with a warning.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = parsed(&lookup, "RATE_LIMIT_MAX_CALLS") {
            self.rate_limit.max_calls = value;
        }
        if let Some(value) = parsed(&lookup, "RATE_LIMIT_PERIOD") {
            self.rate_limit.period_secs = value;
        }
        if let Some(value) = parsed(&lookup, "CALL_TIMEOUT_SECS") {
            self.call_timeout_secs = value;
        }
        if let Some(model) = lookup("DEFAULT_MODEL").filter(|m| !m.trim().is_empty()) {
            self.models.standard = model;
        }
        if let Some(model) = lookup("THINKING_MODEL").filter(|m| !m.trim().is_empty()) {
            self.models.deep_reasoning = model;
        }
        if let Some(path) = lookup("CONCLAVE_PROMPTS").filter(|p| !p.trim().is_empty()) {
            self.prompts_path = Some(PathBuf::from(path));
        }
    }

    /// Reject limits that would stall or disable the network
    pub fn validate(&self) -> Result<()> {
        if self.rate_limit.max_calls == 0 {
            return Err(ConclaveError::Configuration(
                "RATE_LIMIT_MAX_CALLS must be a positive integer".to_string(),
            ));
        }
        if self.rate_limit.period_secs == 0 {
            return Err(ConclaveError::Configuration(
                "RATE_LIMIT_PERIOD must be a positive integer".to_string(),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(ConclaveError::Configuration(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.call_timeout_secs == 0 {
            return Err(ConclaveError::Configuration(
                "call_timeout_secs must be positive".to_string(),
            ));
        }
        if !self.idle_max_age_hours.is_finite() || self.idle_max_age_hours < 0.0 {
            return Err(ConclaveError::Configuration(format!(
                "idle_max_age_hours must be a finite, non-negative number (got {})",
                self.idle_max_age_hours
            )));
        }
        Ok(())
    }

    /// The provider API key, or a configuration error when unset
    pub fn require_api_key(&self) -> Result<String> {
        match std::env::var(&self.api_key_env) {
            Ok(key) if !key.trim().is_empty() => Ok(key),
            _ => Err(ConclaveError::Configuration(format!(
                "{} is not set. Please set it in the .env file or as an environment variable.",
                self.api_key_env
            ))),
        }
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }
}

fn parsed<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("Invalid value for {}: {}. Keeping previous value", key, raw);
            None
        }
    }
}
