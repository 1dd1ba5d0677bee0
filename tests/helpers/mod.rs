//! Shared fixtures: deterministic ports and engine construction.
#![allow(dead_code)]

use async_trait::async_trait;
use cognos::config::{CognosConfig, MemoryConfig};
use cognos::ports::Generation;
use cognos::{Engine, EmbeddingPort, GenerationPort, ReasoningStep};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub const DIM: usize = 8;

/// Deterministic embedder: a unit spike at the first byte of the text mod DIM.
/// Texts sharing a first byte are maximally similar; others are equidistant.
pub struct SpikeEmbedder;

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

/// Generator that emits structured steps, going terminal on call
/// `terminal_at` (0 = never terminal).
pub struct ScriptedGenerator {
    calls: AtomicUsize,
    terminal_at: usize,
}

impl ScriptedGenerator {
    pub fn new(terminal_at: usize) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            terminal_at,
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GenerationPort for ScriptedGenerator {
    async fn generate(
        &self,
        _prompt: &str,
        _trace: &[ReasoningStep],
    ) -> anyhow::Result<Generation> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let terminal = self.terminal_at != 0 && call >= self.terminal_at;
        let text = if terminal {
            format!("Thought: wrap up\nAction: conclude\nObservation: settled on call {call}\nConfidence: 0.9\nFINAL ANSWER: answer {call}")
        } else {
            format!("Thought: thinking\nAction: looking\nObservation: partial {call}\nConfidence: 0.8")
        };
        Ok(Generation {
            text,
            confidence: None,
            terminal,
        })
    }
}

/// Config sized for the spike embedder.
pub fn small_config(max_memories: usize) -> CognosConfig {
    CognosConfig {
        memory: MemoryConfig {
            vector_dim: DIM,
            max_memories,
            ..MemoryConfig::default()
        },
        ..CognosConfig::default()
    }
}

pub fn engine_with(max_memories: usize, terminal_at: usize) -> Engine {
    Engine::new(
        small_config(max_memories),
        Arc::new(SpikeEmbedder),
        Arc::new(ScriptedGenerator::new(terminal_at)),
    )
    .unwrap()
}
