//! # Model Metrics Module
//!
//! Running per-model aggregates updated after every completed request
//!
//! ## Key Components
//! - [`ModelMetrics`] - Aggregates for a single model id
//! - [`RequestOutcome`] - One completed request fed into the aggregates
//! - [`running_average`] - `(old * n + new) / (n + 1)`

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelMetrics {
    pub model_id: String,
    pub total_requests: u64,
    /// Percentage, 0-100.
    pub success_rate: f64,
    pub average_latency: f64,
    pub average_tokens_per_request: f64,
    pub total_cost: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_used: Option<DateTime<Utc>>,
    pub error_count: u64,
    pub user_satisfaction_score: f64,
    #[serde(default)]
    pub rating_count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RequestOutcome {
    pub success: bool,
    pub latency_ms: f64,
    pub token_count: u64,
    pub user_rating: Option<f64>,
}

pub fn running_average(old: f64, count: u64, new: f64) -> f64 {
    let n = count as f64;
    (old * n + new) / (n + 1.0)
}

impl ModelMetrics {
    pub fn new(model_id: &str) -> Self {
        Self {
            model_id: model_id.to_string(),
            total_requests: 0,
            success_rate: 0.0,
            average_latency: 0.0,
            average_tokens_per_request: 0.0,
            total_cost: 0.0,
            last_used: None,
            error_count: 0,
            user_satisfaction_score: 0.0,
            rating_count: 0,
        }
    }

    /// Fold one request into the aggregates. `cost_per_token` is the catalog price, if any.
    pub fn record(&mut self, outcome: &RequestOutcome, cost_per_token: Option<f64>, now: DateTime<Utc>) {
        let n = self.total_requests;
        let success_value = if outcome.success { 100.0 } else { 0.0 };

        self.success_rate = running_average(self.success_rate, n, success_value);
        self.average_latency = running_average(self.average_latency, n, outcome.latency_ms);
        self.average_tokens_per_request =
            running_average(self.average_tokens_per_request, n, outcome.token_count as f64);

        if let Some(cost) = cost_per_token {
            self.total_cost += outcome.token_count as f64 * cost;
        }

        if !outcome.success {
            self.error_count += 1;
        }

        if let Some(rating) = outcome.user_rating {
            self.user_satisfaction_score =
                running_average(self.user_satisfaction_score, self.rating_count, rating);
            self.rating_count += 1;
        }

        self.total_requests = n + 1;
        self.last_used = Some(now);
    }

    /// Score bonus derived from past performance.
    pub fn history_bonus(&self) -> f64 {
        self.success_rate * 0.20 + (self.user_satisfaction_score * 10.0).min(10.0)
    }
}
