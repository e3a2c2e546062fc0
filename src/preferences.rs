//! # User Preferences Module
//!
//! Per-user routing preferences: preferred models, fallback strategy and cost ceiling
//!
//! ## Key Components
//! - [`UserModelPreferences`] - One record per user
//! - [`FallbackStrategy`] - Local/remote ordering of candidates
//! - [`PerformancePreference`] - Which quality the scorer favours
//! - [`PreferencesUpdate`] - Partial update applied by [`UserModelPreferences::apply`]

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::models::Capability;

pub const DEFAULT_MAX_COST_PER_REQUEST: f64 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum FallbackStrategy {
    LocalFirst,
    ApiFirst,
    Balanced,
}

impl FallbackStrategy {
    pub fn name(&self) -> &'static str {
        match self {
            FallbackStrategy::LocalFirst => "local-first",
            FallbackStrategy::ApiFirst => "api-first",
            FallbackStrategy::Balanced => "balanced",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum PerformancePreference {
    Speed,
    Accuracy,
    Cost,
    Privacy,
}

impl PerformancePreference {
    pub fn name(&self) -> &'static str {
        match self {
            PerformancePreference::Speed => "speed",
            PerformancePreference::Accuracy => "accuracy",
            PerformancePreference::Cost => "cost",
            PerformancePreference::Privacy => "privacy",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserModelPreferences {
    pub user_id: String,
    #[serde(default)]
    pub preferred_models: HashMap<Capability, String>,
    pub fallback_strategy: FallbackStrategy,
    pub max_cost_per_request: f64,
    pub allow_local_models: bool,
    #[serde(default)]
    pub performance_preference: Option<PerformancePreference>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserModelPreferences {
    pub fn new(user_id: &str) -> Self {
        let now = Utc::now();
        Self {
            user_id: user_id.to_string(),
            preferred_models: HashMap::new(),
            fallback_strategy: FallbackStrategy::LocalFirst,
            max_cost_per_request: DEFAULT_MAX_COST_PER_REQUEST,
            allow_local_models: true,
            performance_preference: Some(PerformancePreference::Accuracy),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn preferred_model(&self, capability: Capability) -> Option<&str> {
        self.preferred_models.get(&capability).map(String::as_str)
    }

    pub fn apply(&mut self, update: PreferencesUpdate) {
        for (capability, model_id) in update.preferred_models {
            self.preferred_models.insert(capability, model_id);
        }
        for capability in update.cleared_models {
            self.preferred_models.remove(&capability);
        }
        if let Some(strategy) = update.fallback_strategy {
            self.fallback_strategy = strategy;
        }
        if let Some(max_cost) = update.max_cost_per_request {
            self.max_cost_per_request = max_cost;
        }
        if let Some(allow) = update.allow_local_models {
            self.allow_local_models = allow;
        }
        if let Some(preference) = update.performance_preference {
            self.performance_preference = Some(preference);
        }
        if update.clear_performance_preference {
            self.performance_preference = None;
        }
        self.updated_at = Utc::now();
    }
}

#[derive(Debug, Default, Clone)]
pub struct PreferencesUpdate {
    pub preferred_models: Vec<(Capability, String)>,
    pub cleared_models: Vec<Capability>,
    pub fallback_strategy: Option<FallbackStrategy>,
    pub max_cost_per_request: Option<f64>,
    pub allow_local_models: Option<bool>,
    pub performance_preference: Option<PerformancePreference>,
    pub clear_performance_preference: bool,
}

impl PreferencesUpdate {
    pub fn is_empty(&self) -> bool {
        self.preferred_models.is_empty()
            && self.cleared_models.is_empty()
            && self.fallback_strategy.is_none()
            && self.max_cost_per_request.is_none()
            && self.allow_local_models.is_none()
            && self.performance_preference.is_none()
            && !self.clear_performance_preference
    }
}
