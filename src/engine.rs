//! Top-level facade wiring memory, sessions, context assembly, and reasoning.
//!
//! [`Engine`] owns the whole pipeline behind a pair of injected ports
//! (embedding and generation). Callers that only need a slice of the
//! functionality can use the component types directly; [`Engine::respond`]
//! is the full remember → retrieve → assemble → reason round trip.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

use crate::config::CognosConfig;
use crate::context::{AssembledContext, CharEstimator, ContextBuilder, ContextOptions};
use crate::error::Result;
use crate::memory::{MemoryRecord, MemoryStats, MemoryStore, MemoryType, SearchHit};
use crate::ports::{EmbeddingPort, GenerationPort};
use crate::reasoning::{ReasoningOutcome, ReasoningTracer, Reflection};
use crate::session::SessionStore;

pub struct Engine {
    config: CognosConfig,
    memories: Arc<MemoryStore>,
    sessions: Arc<SessionStore>,
    context: ContextBuilder,
    tracer: ReasoningTracer,
}

impl Engine {
    /// Wire the full pipeline from config plus the two external ports.
    ///
    /// Fails if the embedder's reported dimensionality disagrees with
    /// `config.memory.vector_dim`.
    pub fn new(
        config: CognosConfig,
        embedder: Arc<dyn EmbeddingPort>,
        generator: Arc<dyn GenerationPort>,
    ) -> Result<Self> {
        let memories = Arc::new(MemoryStore::new(
            config.memory.clone(),
            config.retrieval.clone(),
            embedder,
            config.port_timeout(),
        )?);
        let sessions = Arc::new(SessionStore::new(config.memory.short_term_window));
        let context = ContextBuilder::new(
            Arc::clone(&memories),
            Arc::clone(&sessions),
            Box::new(CharEstimator),
        );
        let tracer = ReasoningTracer::new(generator, config.reasoning.clone());

        info!(
            vector_dim = config.memory.vector_dim,
            max_memories = config.memory.max_memories,
            enable_cot = config.reasoning.enable_cot,
            "engine initialized"
        );

        Ok(Self {
            config,
            memories,
            sessions,
            context,
            tracer,
        })
    }

    pub fn config(&self) -> &CognosConfig {
        &self.config
    }

    pub fn memories(&self) -> &Arc<MemoryStore> {
        &self.memories
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    /// Assembly options seeded from config; per-call tweaks go through
    /// struct update syntax.
    pub fn default_options(&self) -> ContextOptions {
        ContextOptions {
            max_context_tokens: self.config.context.max_context_tokens,
            top_k: self.config.retrieval.default_top_k,
            memory_type_filter: None,
            enable_reasoning: self.config.reasoning.enable_cot,
        }
    }

    // ---- long-term memory ----

    pub async fn insert_memory(
        &self,
        content: &str,
        memory_type: MemoryType,
        importance: f64,
        metadata: HashMap<String, Value>,
    ) -> Result<u64> {
        self.memories
            .insert(content, memory_type, importance, metadata)
            .await
    }

    pub async fn get_memory(&self, id: u64) -> Result<MemoryRecord> {
        self.memories.get(id).await
    }

    pub async fn delete_memory(&self, id: u64) -> Result<()> {
        self.memories.delete(id).await
    }

    pub async fn delete_all_memories(&self) -> usize {
        self.memories.delete_all().await
    }

    pub async fn memory_stats(&self) -> MemoryStats {
        self.memories.stats().await
    }

    pub async fn export_memories(&self) -> Vec<MemoryRecord> {
        self.memories.export().await
    }

    /// Embed `query_text` and rank stored memories against it.
    pub async fn search_memories(
        &self,
        query_text: &str,
        top_k: usize,
        filter: Option<MemoryType>,
    ) -> Result<Vec<SearchHit>> {
        let embedding = self.memories.embed(query_text).await?;
        self.memories.search(&embedding, top_k, filter).await
    }

    // ---- short-term memory ----

    pub async fn record_turn(&self, session_id: &str, role: &str, content: &str) {
        self.sessions.append(session_id, role, content).await;
    }

    pub async fn clear_session(&self, session_id: &str) -> usize {
        self.sessions.clear(session_id).await
    }

    // ---- context and reasoning ----

    pub async fn build_context(
        &self,
        query_text: &str,
        session_id: &str,
        options: &ContextOptions,
    ) -> Result<AssembledContext> {
        self.context.build(query_text, session_id, options).await
    }

    /// Run the tracer over an already-assembled context.
    pub async fn run_reasoning(
        &self,
        context: &AssembledContext,
        max_steps: usize,
    ) -> Result<ReasoningOutcome> {
        self.tracer.run(context, max_steps).await
    }

    /// Evaluate a finished run's answer and steps. Advisory; never fails.
    pub async fn reflect(&self, query: &str, outcome: &ReasoningOutcome) -> Reflection {
        self.tracer
            .self_reflect(query, &outcome.answer, &outcome.steps)
            .await
    }

    /// Full round trip: record the user turn, assemble context, answer via
    /// chain-of-thought or a direct generation, record the assistant turn.
    pub async fn respond(
        &self,
        session_id: &str,
        query_text: &str,
        options: &ContextOptions,
    ) -> Result<ReasoningOutcome> {
        self.sessions.append(session_id, "user", query_text).await;
        let context = self.context.build(query_text, session_id, options).await?;

        let outcome = if options.enable_reasoning {
            self.tracer
                .run(&context, self.config.reasoning.max_reasoning_steps)
                .await?
        } else {
            self.tracer.direct(&context).await?
        };

        self.sessions
            .append(session_id, "assistant", &outcome.answer)
            .await;
        Ok(outcome)
    }
}
