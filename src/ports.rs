//! External capability interfaces.
//!
//! The core never talks to a model provider directly; it depends on two narrow
//! ports supplied by the caller: [`EmbeddingPort`] (text → vector) and
//! [`GenerationPort`] (prompt + trace → text). Implementations live outside
//! this crate (HTTP clients, local inference, test stubs).

use async_trait::async_trait;
use std::time::Duration;

use crate::error::{CoreError, Result};
use crate::reasoning::ReasoningStep;

/// Maps text to a fixed-dimension embedding vector.
///
/// Implementations must produce vectors of exactly [`dimensions`](Self::dimensions)
/// entries; the store rejects anything else with a dimension-mismatch error.
#[async_trait]
pub trait EmbeddingPort: Send + Sync {
    /// Embed a single text string into a vector.
    async fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>>;

    /// Number of dimensions this port produces.
    fn dimensions(&self) -> usize;
}

/// One result from the generation capability.
#[derive(Debug, Clone)]
pub struct Generation {
    /// Raw generated text.
    pub text: String,
    /// Confidence reported by the provider, if any. Out-of-range values are
    /// clamped by the consumer, never rejected.
    pub confidence: Option<f64>,
    /// Provider marked this step as the end of the run.
    pub terminal: bool,
}

/// Produces text from a prompt plus the reasoning trace accumulated so far.
#[async_trait]
pub trait GenerationPort: Send + Sync {
    async fn generate(&self, prompt: &str, trace_so_far: &[ReasoningStep])
        -> anyhow::Result<Generation>;
}

/// Run a port call under a caller-supplied timeout.
///
/// A timeout is reported as [`CoreError::Timeout`], never silently treated as
/// an empty result.
pub async fn with_timeout<T, F>(limit: Duration, fut: F) -> Result<T>
where
    F: std::future::Future<Output = anyhow::Result<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(inner) => inner.map_err(CoreError::Port),
        Err(_) => Err(CoreError::Timeout(limit)),
    }
}
