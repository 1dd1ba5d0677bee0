//! Budgeted context assembly.
//!
//! [`ContextBuilder`] merges a session's short-term window with ranked
//! long-term memories into an [`AssembledContext`] that fits a token budget.
//! The short-term window is non-negotiable context and is placed first; ranked
//! memories fill whatever budget remains, whole or not at all.

use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

use crate::error::Result;
use crate::memory::{MemoryRecord, MemoryStore, MemoryType};
use crate::session::{SessionStore, Turn};

/// Pluggable token-cost estimation. The default is the crude but serviceable
/// four-characters-per-token heuristic.
pub trait TokenEstimator: Send + Sync {
    fn estimate(&self, text: &str) -> usize;
}

/// `len / 4` estimator used when no tokenizer-backed estimator is supplied.
pub struct CharEstimator;

impl TokenEstimator for CharEstimator {
    fn estimate(&self, text: &str) -> usize {
        text.len() / 4
    }
}

/// Per-request assembly options.
#[derive(Debug, Clone)]
pub struct ContextOptions {
    /// Hard cap on assembled size in estimated tokens.
    pub max_context_tokens: usize,
    /// Maximum number of memory candidates considered.
    pub top_k: usize,
    /// Restrict retrieval to one memory type.
    pub memory_type_filter: Option<MemoryType>,
    /// Route the downstream generation through the reasoning tracer.
    pub enable_reasoning: bool,
}

impl Default for ContextOptions {
    fn default() -> Self {
        Self {
            max_context_tokens: 4000,
            top_k: 5,
            memory_type_filter: None,
            enable_reasoning: false,
        }
    }
}

/// The bounded context handed to generation.
#[derive(Debug, Clone, Serialize)]
pub struct AssembledContext {
    /// The query being answered — the framing, always present.
    pub query: String,
    /// Short-term turns that fit the budget, oldest first.
    pub turns: Vec<Turn>,
    /// Included memories in descending rank order.
    pub memories_used: Vec<MemoryRecord>,
    /// Estimated token cost of `turns` plus `memories_used`.
    pub total_estimated_tokens: usize,
}

impl AssembledContext {
    /// Render the context as prompt text: recent conversation, then relevant
    /// memories, then the current query.
    pub fn to_prompt(&self) -> String {
        let mut parts = Vec::new();

        if !self.turns.is_empty() {
            let lines: Vec<String> = self
                .turns
                .iter()
                .map(|t| format!("{}: {}", t.role, t.content))
                .collect();
            parts.push(format!("Recent conversation:\n{}", lines.join("\n")));
        }

        if !self.memories_used.is_empty() {
            let lines: Vec<String> = self
                .memories_used
                .iter()
                .enumerate()
                .map(|(i, m)| format!("{}. [{}] {}", i + 1, m.memory_type, m.content))
                .collect();
            parts.push(format!("Relevant memories:\n{}", lines.join("\n")));
        }

        parts.push(format!("Current query: {}", self.query));
        parts.join("\n\n")
    }
}

/// Stateless orchestrator over the memory store, session store, and estimator.
pub struct ContextBuilder {
    memories: Arc<MemoryStore>,
    sessions: Arc<SessionStore>,
    estimator: Box<dyn TokenEstimator>,
}

impl ContextBuilder {
    pub fn new(
        memories: Arc<MemoryStore>,
        sessions: Arc<SessionStore>,
        estimator: Box<dyn TokenEstimator>,
    ) -> Self {
        Self {
            memories,
            sessions,
            estimator,
        }
    }

    /// Assemble a context for `query_text` within `options.max_context_tokens`.
    ///
    /// The full short-term window is included first; if it alone exceeds the
    /// budget, oldest turns are dropped until it fits. Remaining budget is
    /// filled with ranked memories in descending rank order — an oversized
    /// candidate is skipped whole, never truncated. `top_k == 0` or a zero
    /// budget yields a short-term-only (or empty) context, never an error.
    pub async fn build(
        &self,
        query_text: &str,
        session_id: &str,
        options: &ContextOptions,
    ) -> Result<AssembledContext> {
        let budget = options.max_context_tokens;

        // 1. Short-term window, favoring recency.
        let mut turns = self.sessions.window(session_id).await;
        let mut turn_cost: usize = turns.iter().map(|t| self.turn_tokens(t)).sum();
        while !turns.is_empty() && turn_cost > budget {
            let dropped = turns.remove(0);
            turn_cost -= self.turn_tokens(&dropped);
        }

        // 2. Fill what remains with ranked memories.
        let mut remaining = budget - turn_cost;
        let mut memories_used = Vec::new();
        if options.top_k > 0 && remaining > 0 && !self.memories.is_empty().await {
            let query_embedding = self.memories.embed(query_text).await?;
            let hits = self
                .memories
                .search(&query_embedding, options.top_k, options.memory_type_filter)
                .await?;

            for hit in hits {
                let cost = self.memory_tokens(&hit.record);
                if cost > remaining {
                    // Skip oversized candidates whole and keep trying smaller ones.
                    continue;
                }
                remaining -= cost;
                memories_used.push(hit.record);
            }
        }

        let total_estimated_tokens =
            turn_cost + memories_used.iter().map(|m| self.memory_tokens(m)).sum::<usize>();

        debug!(
            turns = turns.len(),
            memories = memories_used.len(),
            total_estimated_tokens,
            budget,
            "assembled context"
        );

        Ok(AssembledContext {
            query: query_text.to_string(),
            turns,
            memories_used,
            total_estimated_tokens,
        })
    }

    fn turn_tokens(&self, turn: &Turn) -> usize {
        self.estimator.estimate(&turn.role) + self.estimator.estimate(&turn.content)
    }

    fn memory_tokens(&self, record: &MemoryRecord) -> usize {
        self.estimator.estimate(&record.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MemoryConfig, RetrievalConfig};
    use crate::ports::EmbeddingPort;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::time::Duration;

    const DIM: usize = 8;

    struct SpikeEmbedder;

    #[async_trait]
    impl EmbeddingPort for SpikeEmbedder {
        async fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
            let mut v = vec![0.0f32; DIM];
            v[text.bytes().next().unwrap_or(0) as usize % DIM] = 1.0;
            Ok(v)
        }

        fn dimensions(&self) -> usize {
            DIM
        }
    }

    fn builder() -> (Arc<MemoryStore>, Arc<SessionStore>, ContextBuilder) {
        let memories = Arc::new(
            MemoryStore::new(
                MemoryConfig {
                    vector_dim: DIM,
                    max_memories: 100,
                    ..MemoryConfig::default()
                },
                RetrievalConfig::default(),
                Arc::new(SpikeEmbedder),
                Duration::from_secs(5),
            )
            .unwrap(),
        );
        let sessions = Arc::new(SessionStore::new(10));
        let builder = ContextBuilder::new(
            Arc::clone(&memories),
            Arc::clone(&sessions),
            Box::new(CharEstimator),
        );
        (memories, sessions, builder)
    }

    #[tokio::test]
    async fn empty_everything_yields_query_framing_only() {
        let (_, _, builder) = builder();
        let ctx = builder
            .build("hello", "s1", &ContextOptions::default())
            .await
            .unwrap();

        assert!(ctx.turns.is_empty());
        assert!(ctx.memories_used.is_empty());
        assert_eq!(ctx.total_estimated_tokens, 0);
        assert!(ctx.to_prompt().contains("Current query: hello"));
    }

    #[tokio::test]
    async fn short_term_window_is_included_first() {
        let (memories, sessions, builder) = builder();
        sessions.append("s1", "user", "what is rust").await;
        sessions.append("s1", "assistant", "a systems language").await;
        memories
            .insert("was discussed before", MemoryType::Conversation, 0.9, HashMap::new())
            .await
            .unwrap();

        let ctx = builder
            .build("tell me more", "s1", &ContextOptions::default())
            .await
            .unwrap();

        assert_eq!(ctx.turns.len(), 2);
        assert_eq!(ctx.memories_used.len(), 1);
        let prompt = ctx.to_prompt();
        assert!(prompt.contains("Recent conversation:"));
        assert!(prompt.contains("Relevant memories:"));
    }

    #[tokio::test]
    async fn tight_budget_drops_oldest_turns_and_skips_memories() {
        let (memories, sessions, builder) = builder();
        // Each turn costs ~ (4 + 40) / 4 = 11 tokens.
        for i in 0..4 {
            sessions
                .append("s1", "user", &format!("turn number {i} padded out to forty ch"))
                .await;
        }
        memories
            .insert("a long stored memory body", MemoryType::Knowledge, 0.9, HashMap::new())
            .await
            .unwrap();

        let options = ContextOptions {
            max_context_tokens: 25,
            ..ContextOptions::default()
        };
        let ctx = builder.build("query", "s1", &options).await.unwrap();

        // Only the newest turns fit; memories got no budget.
        assert!(ctx.total_estimated_tokens <= 25);
        assert!(ctx.turns.len() < 4);
        assert_eq!(
            ctx.turns.last().unwrap().content,
            "turn number 3 padded out to forty ch"
        );
        assert!(ctx.memories_used.is_empty());
    }

    #[tokio::test]
    async fn oversized_memory_is_skipped_whole_not_truncated() {
        let (memories, _, builder) = builder();
        let big = "q".repeat(400); // ~100 tokens
        memories
            .insert(&big, MemoryType::Knowledge, 0.9, HashMap::new())
            .await
            .unwrap();
        memories
            .insert("q small", MemoryType::Knowledge, 0.5, HashMap::new())
            .await
            .unwrap();

        let options = ContextOptions {
            max_context_tokens: 20,
            ..ContextOptions::default()
        };
        let ctx = builder.build("query", "s1", &options).await.unwrap();

        assert_eq!(ctx.memories_used.len(), 1);
        assert_eq!(ctx.memories_used[0].content, "q small");
        assert!(ctx.total_estimated_tokens <= 20);
    }

    #[tokio::test]
    async fn zero_k_and_zero_budget_never_error() {
        let (memories, sessions, builder) = builder();
        sessions.append("s1", "user", "hello there").await;
        memories
            .insert("stored", MemoryType::Knowledge, 0.9, HashMap::new())
            .await
            .unwrap();

        let ctx = builder
            .build(
                "query",
                "s1",
                &ContextOptions {
                    top_k: 0,
                    ..ContextOptions::default()
                },
            )
            .await
            .unwrap();
        assert!(ctx.memories_used.is_empty());
        assert_eq!(ctx.turns.len(), 1);

        let ctx = builder
            .build(
                "query",
                "s1",
                &ContextOptions {
                    max_context_tokens: 0,
                    ..ContextOptions::default()
                },
            )
            .await
            .unwrap();
        assert!(ctx.turns.is_empty());
        assert!(ctx.memories_used.is_empty());
        assert_eq!(ctx.total_estimated_tokens, 0);
    }

    #[tokio::test]
    async fn budget_is_respected_across_inputs() {
        let (memories, sessions, builder) = builder();
        for i in 0..6 {
            sessions.append("s1", "user", &format!("message {i} with some length")).await;
            memories
                .insert(
                    &format!("{} memory body {i}", (b'a' + i) as char),
                    MemoryType::Knowledge,
                    0.7,
                    HashMap::new(),
                )
                .await
                .unwrap();
        }

        for budget in [0, 5, 17, 60, 400] {
            let ctx = builder
                .build(
                    "query",
                    "s1",
                    &ContextOptions {
                        max_context_tokens: budget,
                        top_k: 6,
                        ..ContextOptions::default()
                    },
                )
                .await
                .unwrap();
            assert!(
                ctx.total_estimated_tokens <= budget,
                "budget {budget} exceeded: {}",
                ctx.total_estimated_tokens
            );
        }
    }
}
