//! # Estimation Module
//!
//! Prospective cost and latency estimates for a request against a catalog model
//!
//! ## Key Components
//! - [`TokenEstimate`] - Input/output token split derived from the request text
//! - [`estimate_cost`] - Estimated request cost for a model
//! - [`estimate_latency`] - Estimated latency in milliseconds for a model

use crate::models::ModelConfig;

/// Characters per token used for the input-size heuristic.
const CHARS_PER_TOKEN: f64 = 4.0;
const MAX_OUTPUT_TOKENS: f64 = 1000.0;
const LATENCY_LENGTH_SCALE: f64 = 10_000.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TokenEstimate {
    pub input_tokens: f64,
    pub output_tokens: f64,
}

impl TokenEstimate {
    pub fn from_text(input_text: &str) -> Self {
        let input_tokens = (text_length(input_text) as f64 / CHARS_PER_TOKEN).ceil();
        let output_tokens = (input_tokens * 0.5).min(MAX_OUTPUT_TOKENS);
        Self {
            input_tokens,
            output_tokens,
        }
    }

    pub fn total(&self) -> f64 {
        self.input_tokens + self.output_tokens
    }
}

/// Length of the request text in characters.
pub fn text_length(input_text: &str) -> usize {
    input_text.chars().count()
}

/// Returns `None` for models without a per-token price.
pub fn estimate_cost(model: &ModelConfig, input_text: &str) -> Option<f64> {
    let cost_per_token = model.cost_per_token?;
    Some(TokenEstimate::from_text(input_text).total() * cost_per_token)
}

pub fn estimate_latency(model: &ModelConfig, input_text: &str) -> u64 {
    let base = model.latency.base_latency_ms();
    let multiplier = 1.0 + text_length(input_text) as f64 / LATENCY_LENGTH_SCALE;
    (base * multiplier).ceil() as u64
}

pub fn format_cost(cost: f64) -> String {
    if cost == 0.0 {
        "$0".to_string()
    } else if cost < 0.01 {
        format!("${:.6}", cost)
    } else {
        format!("${:.4}", cost)
    }
}
