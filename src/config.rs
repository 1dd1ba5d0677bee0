use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::info;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CognosConfig {
    pub memory: MemoryConfig,
    pub retrieval: RetrievalConfig,
    pub context: ContextConfig,
    pub reasoning: ReasoningConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MemoryConfig {
    /// Embedding dimension every record must match.
    pub vector_dim: usize,
    /// Maximum number of live records; insertion beyond this evicts first.
    pub max_memories: usize,
    /// Age at which effective importance reaches the decay floor.
    pub decay_horizon_days: f64,
    /// Fraction of baseline importance remaining at the decay horizon.
    pub decay_floor_fraction: f64,
    /// Weight applied to ln(1 + access_count) when boosting importance.
    pub access_weight: f64,
    /// Turns retained per session in short-term memory.
    pub short_term_window: usize,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Default number of candidates returned by search.
    pub default_top_k: usize,
    /// Relative weight of vector similarity in the composite rank.
    pub similarity_weight: f64,
    /// Relative weight of effective importance in the composite rank.
    pub importance_weight: f64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ContextConfig {
    /// Hard cap on assembled context size in estimated tokens.
    pub max_context_tokens: usize,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ReasoningConfig {
    /// Route queries through the chain-of-thought tracer by default.
    pub enable_cot: bool,
    /// Upper bound on think/act/observe iterations per run.
    pub max_reasoning_steps: usize,
    /// Confidence assumed when a generation omits or garbles the field.
    pub default_confidence: f64,
    /// Timeout applied to each external port call.
    pub port_timeout_secs: u64,
}

impl Default for CognosConfig {
    fn default() -> Self {
        Self {
            memory: MemoryConfig::default(),
            retrieval: RetrievalConfig::default(),
            context: ContextConfig::default(),
            reasoning: ReasoningConfig::default(),
        }
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            vector_dim: 768,
            max_memories: 1000,
            decay_horizon_days: 90.0,
            decay_floor_fraction: 0.05,
            access_weight: 0.1,
            short_term_window: 10,
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            default_top_k: 5,
            similarity_weight: 0.7,
            importance_weight: 0.3,
        }
    }
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_context_tokens: 4000,
        }
    }
}

impl Default for ReasoningConfig {
    fn default() -> Self {
        Self {
            enable_cot: true,
            max_reasoning_steps: 5,
            default_confidence: 0.7,
            port_timeout_secs: 30,
        }
    }
}

impl CognosConfig {
    /// Load from a TOML file (if it exists), then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            CognosConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides (COGNOS_MAX_MEMORIES,
    /// COGNOS_MAX_CONTEXT_TOKENS, COGNOS_ENABLE_COT).
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("COGNOS_MAX_MEMORIES") {
            if let Ok(parsed) = val.parse() {
                self.memory.max_memories = parsed;
            }
        }
        if let Ok(val) = std::env::var("COGNOS_MAX_CONTEXT_TOKENS") {
            if let Ok(parsed) = val.parse() {
                self.context.max_context_tokens = parsed;
            }
        }
        if let Ok(val) = std::env::var("COGNOS_ENABLE_COT") {
            if let Ok(parsed) = val.parse() {
                self.reasoning.enable_cot = parsed;
            }
        }
    }

    /// Timeout for external port calls as a `Duration`.
    pub fn port_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.reasoning.port_timeout_secs)
    }
}
