//! COGNOS memory and context engine.
//!
//! Gives an LLM chat assistant memory that persists across turns: long-term
//! records with embeddings, importance that decays with age and reinforces
//! with access, ranked retrieval, budgeted context assembly, and an optional
//! bounded chain-of-thought loop over the generation port.
//!
//! Module map:
//! - [`config`] — TOML + env configuration
//! - [`error`] — typed error taxonomy
//! - [`ports`] — embedding/generation traits the host implements
//! - [`index`] — exact k-NN vector index
//! - [`memory`] — record types, ranking math, and the authoritative store
//! - [`session`] — short-term per-conversation turn windows
//! - [`context`] — token-budgeted context assembly
//! - [`reasoning`] — bounded think/act/observe tracing
//! - [`engine`] — facade wiring it all together

pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod index;
pub mod memory;
pub mod ports;
pub mod reasoning;
pub mod session;

pub use config::CognosConfig;
pub use context::{AssembledContext, ContextBuilder, ContextOptions};
pub use engine::Engine;
pub use error::{CoreError, Result};
pub use memory::{MemoryRecord, MemoryStats, MemoryStore, MemoryType, SearchHit};
pub use ports::{EmbeddingPort, Generation, GenerationPort};
pub use reasoning::{
    Reflection, ReasoningMethod, ReasoningOutcome, ReasoningStep, ReasoningTracer,
};
pub use session::{SessionStore, Turn};

/// Initialize tracing output for hosts that have not set up their own
/// subscriber. Filter via `RUST_LOG` (defaults to `info` for this crate).
/// Safe to call more than once; later calls are no-ops.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("cognos=info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
