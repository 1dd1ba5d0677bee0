//! Bounded chain-of-thought reasoning.
//!
//! [`ReasoningTracer`] drives a `Start → (Thought → Action → Observation)* →
//! Conclude` loop, one generation call per step, capped at a configured maximum.
//! Reaching the cap is a normal terminal condition — the last partial answer is
//! returned, not an error. A single step's generation failure degrades that step
//! (marked failed, confidence 0) and the run continues; timeouts abort the run.

use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::ReasoningConfig;
use crate::context::AssembledContext;
use crate::error::Result;
use crate::ports::{with_timeout, Generation, GenerationPort};

/// Single step in a reasoning chain.
#[derive(Debug, Clone, Serialize)]
pub struct ReasoningStep {
    /// 1-based, sequential.
    pub step_number: usize,
    pub thought: String,
    pub action: String,
    pub observation: String,
    /// Always in `[0.0, 1.0]`; out-of-range provider values are clamped.
    pub confidence: f64,
    /// True when the step's generation failed and was degraded rather than
    /// aborting the run.
    pub failed: bool,
}

/// How an answer was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasoningMethod {
    ChainOfThought,
    Direct,
}

/// Result of one reasoning run.
#[derive(Debug, Clone, Serialize)]
pub struct ReasoningOutcome {
    pub answer: String,
    pub steps: Vec<ReasoningStep>,
    /// Mean step confidence (or the single generation's confidence in direct mode).
    pub confidence: f64,
    pub method: ReasoningMethod,
}

/// Self-assessment of a finished run.
#[derive(Debug, Clone, Serialize)]
pub struct Reflection {
    /// Free-form evaluation text from the generator.
    pub evaluation: String,
    /// Always in `[0.0, 1.0]`; falls back to the configured default when the
    /// generator omits or garbles the score.
    pub quality_score: f64,
}

/// Stateless orchestrator over the generation port. Steps live only for the
/// duration of one run; they are never persisted as memories.
pub struct ReasoningTracer {
    generator: Arc<dyn GenerationPort>,
    config: ReasoningConfig,
}

impl ReasoningTracer {
    pub fn new(generator: Arc<dyn GenerationPort>, config: ReasoningConfig) -> Self {
        Self { generator, config }
    }

    /// Run the bounded think/act/observe loop.
    ///
    /// Terminates on the first generation marked terminal or after `max_steps`
    /// iterations, whichever comes first. `max_steps == 0` degenerates to a
    /// direct answer.
    pub async fn run(
        &self,
        context: &AssembledContext,
        max_steps: usize,
    ) -> Result<ReasoningOutcome> {
        if max_steps == 0 {
            return self.direct(context).await;
        }

        let prompt = self.build_step_prompt(context);
        let mut steps: Vec<ReasoningStep> = Vec::new();
        let mut last_text = String::new();

        for step_number in 1..=max_steps {
            let generated = with_timeout(
                self.config_timeout(),
                self.generator.generate(&prompt, &steps),
            )
            .await;

            let generation = match generated {
                Ok(generation) => generation,
                Err(err) if err.is_fatal_for_reasoning() => return Err(err),
                Err(err) => {
                    // Recoverable: record a degraded step and keep going.
                    warn!(step_number, %err, "reasoning step failed, degrading");
                    steps.push(ReasoningStep {
                        step_number,
                        thought: String::new(),
                        action: String::new(),
                        observation: format!("step failed: {err}"),
                        confidence: 0.0,
                        failed: true,
                    });
                    continue;
                }
            };

            let terminal = generation.terminal;
            last_text = generation.text.clone();
            steps.push(self.parse_step(step_number, generation));

            if terminal {
                debug!(step_number, "generation marked terminal");
                break;
            }
        }

        let answer = self.extract_answer(&last_text, &steps);
        let confidence = mean_confidence(&steps, self.config.default_confidence);
        Ok(ReasoningOutcome {
            answer,
            steps,
            confidence,
            method: ReasoningMethod::ChainOfThought,
        })
    }

    /// Single direct generation with no step loop.
    pub async fn direct(&self, context: &AssembledContext) -> Result<ReasoningOutcome> {
        let prompt = context.to_prompt();
        let generation = with_timeout(
            self.config_timeout(),
            self.generator.generate(&prompt, &[]),
        )
        .await?;

        let confidence = generation
            .confidence
            .unwrap_or(self.config.default_confidence)
            .clamp(0.0, 1.0);
        Ok(ReasoningOutcome {
            answer: generation.text,
            steps: Vec::new(),
            confidence,
            method: ReasoningMethod::Direct,
        })
    }

    /// Post-run evaluation of the reasoning chain and its answer.
    ///
    /// Advisory only: the run has already produced its outcome, so any failure
    /// here (including a timeout) degrades to a placeholder evaluation at the
    /// default confidence rather than surfacing an error.
    pub async fn self_reflect(
        &self,
        query: &str,
        answer: &str,
        steps: &[ReasoningStep],
    ) -> Reflection {
        let prompt = self.build_reflection_prompt(query, answer, steps);
        let generated = with_timeout(
            self.config_timeout(),
            self.generator.generate(&prompt, steps),
        )
        .await;

        match generated {
            Ok(generation) => {
                let quality_score = extract_field(&generation.text, "Quality Score")
                    .split_whitespace()
                    .next()
                    .and_then(|token| token.parse::<f64>().ok())
                    .unwrap_or(self.config.default_confidence)
                    .clamp(0.0, 1.0);
                Reflection {
                    evaluation: generation.text,
                    quality_score,
                }
            }
            Err(err) => {
                warn!(%err, "self-reflection failed, degrading");
                Reflection {
                    evaluation: "Reflection unavailable".to_string(),
                    quality_score: self.config.default_confidence,
                }
            }
        }
    }

    fn build_reflection_prompt(
        &self,
        query: &str,
        answer: &str,
        steps: &[ReasoningStep],
    ) -> String {
        let formatted: Vec<String> = steps
            .iter()
            .map(|s| {
                format!(
                    "Step {}:\n  Thought: {}\n  Action: {}\n  Observation: {}\n  Confidence: {}",
                    s.step_number, s.thought, s.action, s.observation, s.confidence
                )
            })
            .collect();

        format!(
            "Evaluate the following reasoning process and answer:\n\n\
             Query: {query}\n\n\
             Reasoning Steps:\n{}\n\n\
             Final Answer:\n{answer}\n\n\
             Provide a brief evaluation covering:\n\
             1. Logical consistency of the reasoning\n\
             2. Completeness of the answer\n\
             3. Potential improvements\n\
             4. Overall quality score (0.0 to 1.0)\n\n\
             Format as:\n\
             Consistency: [evaluation]\n\
             Completeness: [evaluation]\n\
             Improvements: [suggestions]\n\
             Quality Score: [0.0-1.0]",
            formatted.join("\n")
        )
    }

    fn config_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.config.port_timeout_secs)
    }

    /// Prompt asking for exactly one thought/action/observation step.
    fn build_step_prompt(&self, context: &AssembledContext) -> String {
        format!(
            "{}\n\n\
             Reason toward the answer one step at a time. Produce the next step as:\n\
             Thought: [what you are considering]\n\
             Action: [what you are doing]\n\
             Observation: [what you concluded]\n\
             Confidence: [0.0-1.0]\n\n\
             When the answer is complete, finish with:\n\
             FINAL ANSWER: [the answer]",
            context.to_prompt()
        )
    }

    /// Build a step from one generation, preferring the provider-reported
    /// confidence over a `Confidence:` field in the text.
    fn parse_step(&self, step_number: usize, generation: Generation) -> ReasoningStep {
        let text = &generation.text;
        let thought = extract_field(text, "Thought");
        let action = extract_field(text, "Action");
        let mut observation = extract_field(text, "Observation");
        if thought.is_empty() && action.is_empty() && observation.is_empty() {
            // Unstructured output: treat the whole text as the observation.
            observation = strip_final_answer(text).trim().to_string();
        }

        let confidence = generation
            .confidence
            .or_else(|| extract_field(text, "Confidence").parse().ok())
            .unwrap_or(self.config.default_confidence)
            .clamp(0.0, 1.0);

        ReasoningStep {
            step_number,
            thought,
            action,
            observation,
            confidence,
            failed: false,
        }
    }

    /// Final answer: an explicit `FINAL ANSWER:` marker in the last generation,
    /// falling back to the last non-failed step's observation.
    fn extract_answer(&self, last_text: &str, steps: &[ReasoningStep]) -> String {
        if let Some(idx) = last_text.find("FINAL ANSWER:") {
            let answer = last_text[idx + "FINAL ANSWER:".len()..].trim();
            if !answer.is_empty() {
                return answer.to_string();
            }
        }
        steps
            .iter()
            .rev()
            .find(|s| !s.failed && !s.observation.is_empty())
            .map(|s| s.observation.clone())
            .unwrap_or_default()
    }
}

fn mean_confidence(steps: &[ReasoningStep], default: f64) -> f64 {
    if steps.is_empty() {
        return default;
    }
    steps.iter().map(|s| s.confidence).sum::<f64>() / steps.len() as f64
}

/// Extract `Name: value` from step text, stopping at the next known field.
fn extract_field(text: &str, field: &str) -> String {
    let marker = format!("{field}:");
    let Some(start) = text.find(&marker) else {
        return String::new();
    };
    let rest = &text[start + marker.len()..];

    let mut end = rest.len();
    for next in ["\nThought:", "\nAction:", "\nObservation:", "\nConfidence:", "\nFINAL ANSWER:"] {
        if let Some(pos) = rest.find(next) {
            end = end.min(pos);
        }
    }
    rest[..end].trim().to_string()
}

fn strip_final_answer(text: &str) -> &str {
    match text.find("FINAL ANSWER:") {
        Some(idx) => &text[..idx],
        None => text,
    }
}
