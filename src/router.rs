//! # Model Routing Module
//!
//! Capability-based model selection over a fixed catalog
//!
//! ## Key Components
//! - [`ModelRoutingService`] - Selection and metrics bookkeeping
//! - [`ModelRequest`] - Task capability, input text and constraints
//! - [`ModelResponse`] - Selected model, fallbacks, estimates and reasoning
//! - [`RoutingError`] - Configuration and wiring failures
//!
//! Selection runs in a fixed order: capability filter, user preferences,
//! routing rules, constraint filters, scoring. An explicit preference or
//! rule pins its model to the head of the ranking as long as it survives
//! the constraint filters; everything else is ranked by score.

use chrono::Utc;
use log::{debug, warn};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashMap;
use thiserror::Error;

use crate::metrics::{ModelMetrics, RequestOutcome};
use crate::models::{Capability, ModelConfig, find_in_catalog};
use crate::preferences::{FallbackStrategy, PerformancePreference, UserModelPreferences};
use crate::pricing::{estimate_cost, estimate_latency, format_cost, text_length};
use crate::rules::{ModelRoutingRule, Priority, find_matching_rule};

const MAX_FALLBACK_MODELS: usize = 3;
const LARGE_INPUT_CHARS: usize = 1000;
const LARGE_CONTEXT_TOKENS: u64 = 8000;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum RoutingError {
    #[error("Routing service not initialized")]
    NotInitialized,
    #[error("No suitable models found for task type '{task_type}'")]
    NoSuitableModels { task_type: Capability },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelRequest {
    pub task_type: Capability,
    pub input_text: String,
    pub user_role: Option<String>,
    pub priority: Option<Priority>,
    pub max_latency: Option<u64>,
    pub max_cost: Option<f64>,
    pub requires_privacy: bool,
}

impl ModelRequest {
    pub fn new(task_type: Capability, input_text: &str) -> Self {
        Self {
            task_type,
            input_text: input_text.to_string(),
            user_role: None,
            priority: None,
            max_latency: None,
            max_cost: None,
            requires_privacy: false,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelResponse {
    pub selected_model: ModelConfig,
    pub fallback_models: Vec<ModelConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_cost: Option<f64>,
    pub estimated_latency: u64,
    pub reasoning: Vec<String>,
}

pub struct ModelRoutingService {
    catalog: Vec<ModelConfig>,
    preferences: UserModelPreferences,
    routing_rules: Vec<ModelRoutingRule>,
    metrics: HashMap<String, ModelMetrics>,
}

impl ModelRoutingService {
    pub fn new(
        catalog: Vec<ModelConfig>,
        preferences: UserModelPreferences,
        routing_rules: Vec<ModelRoutingRule>,
        metrics: Vec<ModelMetrics>,
    ) -> Self {
        let metrics = metrics
            .into_iter()
            .map(|m| (m.model_id.clone(), m))
            .collect();

        Self {
            catalog,
            preferences,
            routing_rules,
            metrics,
        }
    }

    #[cfg(test)]
    pub fn catalog(&self) -> &[ModelConfig] {
        &self.catalog
    }

    pub fn preferences(&self) -> &UserModelPreferences {
        &self.preferences
    }

    pub fn set_preferences(&mut self, preferences: UserModelPreferences) {
        self.preferences = preferences;
    }

    pub fn routing_rules(&self) -> &[ModelRoutingRule] {
        &self.routing_rules
    }

    pub fn set_routing_rules(&mut self, rules: Vec<ModelRoutingRule>) {
        self.routing_rules = rules;
    }

    /// All metrics records, ordered by model id.
    pub fn all_metrics(&self) -> Vec<ModelMetrics> {
        let mut all: Vec<ModelMetrics> = self.metrics.values().cloned().collect();
        all.sort_by(|a, b| a.model_id.cmp(&b.model_id));
        all
    }

    pub fn clear_metrics(&mut self) {
        self.metrics.clear();
    }

    pub fn select_model(&self, request: &ModelRequest) -> Result<ModelResponse, RoutingError> {
        let mut reasoning = Vec::new();

        let mut candidates: Vec<&ModelConfig> = self
            .catalog
            .iter()
            .filter(|model| model.supports(request.task_type))
            .collect();

        if candidates.is_empty() {
            reasoning.push(format!("No catalog models support {}", request.task_type));
            return self.emergency_fallback(request, reasoning);
        }

        reasoning.push(format!(
            "Found {} model(s) supporting {}",
            candidates.len(),
            request.task_type
        ));

        let mut pinned = self.apply_preferences(request, &mut candidates, &mut reasoning);
        if let Some(rule_target) = self.apply_routing_rules(request, &mut candidates, &mut reasoning) {
            pinned = Some(rule_target);
        }

        self.apply_constraints(request, &mut candidates, &mut reasoning);

        if candidates.is_empty() {
            reasoning.push("No candidates satisfied the request constraints".to_string());
            return self.emergency_fallback(request, reasoning);
        }

        let ranked = self.rank_candidates(request, candidates, pinned, &mut reasoning);

        let selected = ranked[0];
        let fallback_models: Vec<ModelConfig> = ranked
            .iter()
            .skip(1)
            .take(MAX_FALLBACK_MODELS)
            .map(|model| (*model).clone())
            .collect();

        reasoning.push(format!("Selected {}", selected.id));
        debug!(
            "Routed {} request to {} with {} fallback(s)",
            request.task_type,
            selected.id,
            fallback_models.len()
        );

        Ok(self.build_response(selected, fallback_models, request, reasoning))
    }

    fn apply_preferences<'a>(
        &self,
        request: &ModelRequest,
        candidates: &mut Vec<&'a ModelConfig>,
        reasoning: &mut Vec<String>,
    ) -> Option<&'a str> {
        let mut pinned = None;

        if let Some(preferred) = self.preferences.preferred_model(request.task_type) {
            if let Some(model) = move_to_front(candidates, preferred) {
                reasoning.push(format!(
                    "Using preferred model {} for {}",
                    preferred, request.task_type
                ));
                pinned = Some(model);
            } else {
                reasoning.push(format!(
                    "Preferred model {} does not support {}; ignoring preference",
                    preferred, request.task_type
                ));
            }
        }

        if !self.preferences.allow_local_models {
            let before = candidates.len();
            candidates.retain(|model| !model.is_local);
            if candidates.len() < before {
                reasoning.push(format!(
                    "Excluded {} local model(s) (disabled in preferences)",
                    before - candidates.len()
                ));
            }
            if let Some(model) = pinned.filter(|model| model.is_local) {
                reasoning.push(format!(
                    "Preferred model {} is local and local models are disabled; ignoring preference",
                    model.id
                ));
                pinned = None;
            }
        }

        match self.preferences.fallback_strategy {
            FallbackStrategy::LocalFirst => {
                candidates.sort_by_key(|model| !model.is_local);
                reasoning.push("Applied local-first fallback strategy".to_string());
            }
            FallbackStrategy::ApiFirst => {
                candidates.sort_by_key(|model| model.is_local);
                reasoning.push("Applied api-first fallback strategy".to_string());
            }
            FallbackStrategy::Balanced => {}
        }

        pinned.map(|model| model.id.as_str())
    }

    fn apply_routing_rules<'a>(
        &self,
        request: &ModelRequest,
        candidates: &mut Vec<&'a ModelConfig>,
        reasoning: &mut Vec<String>,
    ) -> Option<&'a str> {
        let rule = find_matching_rule(&self.routing_rules, request)?;

        match move_to_front(candidates, &rule.target_model) {
            Some(model) => {
                debug!("Routing rule '{}' routes to {}", rule.name, model.id);
                reasoning.push(format!(
                    "Routing rule '{}' matched; routing to {}",
                    rule.name, model.id
                ));
                Some(model.id.as_str())
            }
            None => {
                reasoning.push(format!(
                    "Routing rule '{}' matched but target {} is not a candidate",
                    rule.name, rule.target_model
                ));
                None
            }
        }
    }

    fn apply_constraints(
        &self,
        request: &ModelRequest,
        candidates: &mut Vec<&ModelConfig>,
        reasoning: &mut Vec<String>,
    ) {
        let max_cost = request
            .max_cost
            .unwrap_or(self.preferences.max_cost_per_request);
        if max_cost > 0.0 {
            let before = candidates.len();
            candidates.retain(|model| {
                estimate_cost(model, &request.input_text).is_none_or(|cost| cost <= max_cost)
            });
            if candidates.len() < before {
                reasoning.push(format!(
                    "Filtered {} model(s) exceeding cost limit {}",
                    before - candidates.len(),
                    format_cost(max_cost)
                ));
            }
        }

        if let Some(max_latency) = request.max_latency {
            let before = candidates.len();
            candidates.retain(|model| estimate_latency(model, &request.input_text) <= max_latency);
            if candidates.len() < before {
                reasoning.push(format!(
                    "Filtered {} model(s) exceeding latency limit {}ms",
                    before - candidates.len(),
                    max_latency
                ));
            }
        }

        if request.requires_privacy {
            let before = candidates.len();
            candidates.retain(|model| model.is_local);
            reasoning.push(format!(
                "Privacy required: filtered {} non-local model(s)",
                before - candidates.len()
            ));
        }
    }

    fn rank_candidates<'a>(
        &self,
        request: &ModelRequest,
        candidates: Vec<&'a ModelConfig>,
        pinned: Option<&str>,
        reasoning: &mut Vec<String>,
    ) -> Vec<&'a ModelConfig> {
        let mut scored: Vec<(&ModelConfig, f64)> = candidates
            .into_iter()
            .map(|model| (model, self.score_model(model, request)))
            .collect();

        // sort_by is stable: equal scores keep their candidate order
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));

        if let Some(pinned_id) = pinned {
            match scored.iter().position(|(model, _)| model.id == pinned_id) {
                Some(position) => {
                    let entry = scored.remove(position);
                    scored.insert(0, entry);
                }
                None => reasoning.push(format!(
                    "{} was excluded by request constraints; ranking remaining models",
                    pinned_id
                )),
            }
        }

        for (model, score) in &scored {
            reasoning.push(format!("Scored {} at {:.1}", model.id, score));
        }

        scored.into_iter().map(|(model, _)| model).collect()
    }

    /// Higher is better. Not normalised.
    pub fn score_model(&self, model: &ModelConfig, request: &ModelRequest) -> f64 {
        let accuracy_score = model.accuracy.score();
        let mut score = accuracy_score * 0.30;

        score += match self.preferences.performance_preference {
            Some(PerformancePreference::Speed) => model.latency.inverse_score() * 0.40,
            Some(PerformancePreference::Accuracy) => accuracy_score * 0.40,
            Some(PerformancePreference::Cost) => match model.cost_per_token {
                Some(cost) => (50.0 - cost * 100_000.0).max(0.0) * 0.40,
                None => 40.0,
            },
            Some(PerformancePreference::Privacy) => {
                if model.is_local {
                    40.0
                } else {
                    0.0
                }
            }
            None => 0.0,
        };

        if let Some(metrics) = self.metrics.get(&model.id) {
            score += metrics.history_bonus();
        }

        if text_length(&request.input_text) > LARGE_INPUT_CHARS
            && model.context_window > LARGE_CONTEXT_TOKENS
        {
            score += 10.0;
        }

        score
    }

    fn emergency_fallback(
        &self,
        request: &ModelRequest,
        mut reasoning: Vec<String>,
    ) -> Result<ModelResponse, RoutingError> {
        // privacy and disabled local models stay hard constraints even here
        let fallback = self.catalog.iter().find(|model| {
            model.supports(request.task_type)
                && (!request.requires_privacy || model.is_local)
                && (self.preferences.allow_local_models || !model.is_local)
        });

        match fallback {
            Some(model) => {
                warn!(
                    "Using emergency fallback {} for {} request",
                    model.id, request.task_type
                );
                reasoning.push(format!("Emergency fallback: using {}", model.id));
                Ok(self.build_response(model, Vec::new(), request, reasoning))
            }
            None => Err(RoutingError::NoSuitableModels {
                task_type: request.task_type,
            }),
        }
    }

    fn build_response(
        &self,
        selected: &ModelConfig,
        fallback_models: Vec<ModelConfig>,
        request: &ModelRequest,
        reasoning: Vec<String>,
    ) -> ModelResponse {
        let estimated_cost = selected
            .billable_cost_per_token()
            .and_then(|_| estimate_cost(selected, &request.input_text));

        ModelResponse {
            selected_model: selected.clone(),
            fallback_models,
            estimated_cost,
            estimated_latency: estimate_latency(selected, &request.input_text),
            reasoning,
        }
    }

    /// Fold a completed request into the running aggregates for `model_id`.
    pub fn update_model_metrics(
        &mut self,
        model_id: &str,
        success: bool,
        latency_ms: f64,
        token_count: u64,
        user_rating: Option<f64>,
    ) -> &ModelMetrics {
        let cost_per_token = find_in_catalog(&self.catalog, model_id).and_then(|m| m.cost_per_token);
        let outcome = RequestOutcome {
            success,
            latency_ms,
            token_count,
            user_rating,
        };

        let metrics = self
            .metrics
            .entry(model_id.to_string())
            .or_insert_with(|| ModelMetrics::new(model_id));
        metrics.record(&outcome, cost_per_token, Utc::now());
        metrics
    }
}

fn move_to_front<'a>(candidates: &mut Vec<&'a ModelConfig>, model_id: &str) -> Option<&'a ModelConfig> {
    let position = candidates.iter().position(|model| model.id == model_id)?;
    let model = candidates.remove(position);
    candidates.insert(0, model);
    Some(model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AccuracyTier, LatencyTier, default_catalog};
    use crate::rules::RuleConditions;

    fn model(
        id: &str,
        capabilities: &[Capability],
        accuracy: AccuracyTier,
        latency: LatencyTier,
        cost_per_token: Option<f64>,
        is_local: bool,
        context_window: u64,
    ) -> ModelConfig {
        ModelConfig {
            id: id.to_string(),
            name: id.to_uppercase(),
            capabilities: capabilities.to_vec(),
            accuracy,
            latency,
            cost_per_token,
            context_window,
            is_local,
        }
    }

    fn chat_catalog() -> Vec<ModelConfig> {
        vec![
            model("a", &[Capability::Chat], AccuracyTier::High, LatencyTier::Low, None, true, 4_000),
            model("b", &[Capability::Chat], AccuracyTier::High, LatencyTier::Low, Some(0.000_02), false, 16_000),
        ]
    }

    fn mixed_catalog() -> Vec<ModelConfig> {
        vec![
            model("local-small", &[Capability::Chat, Capability::Code], AccuracyTier::Low, LatencyTier::Medium, None, true, 4_000),
            model("remote-best", &[Capability::Chat, Capability::Medical], AccuracyTier::VeryHigh, LatencyTier::Medium, Some(0.000_01), false, 128_000),
            model("remote-fast", &[Capability::Chat], AccuracyTier::Medium, LatencyTier::Low, Some(0.000_001), false, 32_000),
            model("remote-med", &[Capability::Medical], AccuracyTier::High, LatencyTier::High, Some(0.000_02), false, 8_000),
        ]
    }

    fn preferences(performance: Option<PerformancePreference>) -> UserModelPreferences {
        let mut prefs = UserModelPreferences::new("tester");
        prefs.performance_preference = performance;
        prefs
    }

    fn service(catalog: Vec<ModelConfig>, prefs: UserModelPreferences) -> ModelRoutingService {
        ModelRoutingService::new(catalog, prefs, Vec::new(), Vec::new())
    }

    fn ids(response: &ModelResponse) -> Vec<String> {
        std::iter::once(&response.selected_model)
            .chain(response.fallback_models.iter())
            .map(|m| m.id.clone())
            .collect()
    }

    #[test]
    fn test_privacy_preference_scenario() {
        let svc = service(chat_catalog(), preferences(Some(PerformancePreference::Privacy)));
        let response = svc.select_model(&ModelRequest::new(Capability::Chat, "hi")).unwrap();

        assert_eq!(response.selected_model.id, "a");
        assert_eq!(response.fallback_models.len(), 1);
        assert_eq!(response.fallback_models[0].id, "b");
        assert!(response.estimated_cost.is_none());
        assert!(!response.reasoning.is_empty());
    }

    #[test]
    fn test_selected_model_always_supports_capability() {
        let svc = service(default_catalog().to_vec(), UserModelPreferences::new("tester"));
        for capability in [
            Capability::Chat,
            Capability::Code,
            Capability::Medical,
            Capability::Embeddings,
            Capability::Classification,
            Capability::Summarization,
        ] {
            let response = svc
                .select_model(&ModelRequest::new(capability, "Summarise the discharge notes"))
                .unwrap();
            assert!(response.selected_model.supports(capability));
            assert!(response.fallback_models.iter().all(|m| m.supports(capability)));
        }
    }

    #[test]
    fn test_unsupported_capability_is_an_error() {
        let svc = service(chat_catalog(), preferences(None));
        let err = svc
            .select_model(&ModelRequest::new(Capability::Embeddings, "text"))
            .unwrap_err();
        assert_eq!(
            err,
            RoutingError::NoSuitableModels {
                task_type: Capability::Embeddings
            }
        );
    }

    #[test]
    fn test_preferred_model_wins_over_score() {
        let mut prefs = preferences(Some(PerformancePreference::Accuracy));
        prefs
            .preferred_models
            .insert(Capability::Chat, "remote-fast".to_string());
        let svc = service(mixed_catalog(), prefs);

        let response = svc.select_model(&ModelRequest::new(Capability::Chat, "hello")).unwrap();
        assert_eq!(response.selected_model.id, "remote-fast");
        // remaining candidates ranked by score
        assert_eq!(response.fallback_models[0].id, "remote-best");
    }

    #[test]
    fn test_preference_for_unsupported_model_is_ignored() {
        let mut prefs = preferences(Some(PerformancePreference::Accuracy));
        prefs
            .preferred_models
            .insert(Capability::Chat, "remote-med".to_string());
        let svc = service(mixed_catalog(), prefs);

        let response = svc.select_model(&ModelRequest::new(Capability::Chat, "hello")).unwrap();
        assert_eq!(response.selected_model.id, "remote-best");
        assert!(response.reasoning.iter().any(|r| r.contains("ignoring preference")));
    }

    #[test]
    fn test_routing_rule_beats_preference() {
        let mut prefs = preferences(Some(PerformancePreference::Accuracy));
        prefs
            .preferred_models
            .insert(Capability::Chat, "remote-fast".to_string());
        let mut svc = service(mixed_catalog(), prefs);
        svc.set_routing_rules(vec![ModelRoutingRule::new(
            "clinicians use local",
            RuleConditions {
                user_roles: vec!["clinician".to_string()],
                ..Default::default()
            },
            "local-small",
        )]);

        let mut request = ModelRequest::new(Capability::Chat, "hello");
        request.user_role = Some("clinician".to_string());
        let response = svc.select_model(&request).unwrap();
        assert_eq!(response.selected_model.id, "local-small");
        assert!(ids(&response).contains(&"remote-fast".to_string()));

        request.user_role = Some("admin".to_string());
        let response = svc.select_model(&request).unwrap();
        assert_eq!(response.selected_model.id, "remote-fast");
    }

    #[test]
    fn test_only_first_matching_rule_fires() {
        let mut svc = service(mixed_catalog(), preferences(None));
        svc.set_routing_rules(vec![
            ModelRoutingRule::new("missing target", RuleConditions::default(), "remote-med"),
            ModelRoutingRule::new("would match", RuleConditions::default(), "local-small"),
        ]);

        let response = svc.select_model(&ModelRequest::new(Capability::Chat, "hello")).unwrap();
        assert_ne!(response.selected_model.id, "local-small");
        assert!(response.reasoning.iter().any(|r| r.contains("is not a candidate")));
    }

    #[test]
    fn test_disallowing_local_models() {
        let mut prefs = preferences(Some(PerformancePreference::Privacy));
        prefs.allow_local_models = false;
        let svc = service(mixed_catalog(), prefs);

        let response = svc.select_model(&ModelRequest::new(Capability::Chat, "hello")).unwrap();
        assert!(ids(&response).iter().all(|id| id != "local-small"));
    }

    #[test]
    fn test_fallback_strategy_breaks_ties() {
        let catalog = vec![
            model("remote", &[Capability::Chat], AccuracyTier::High, LatencyTier::Low, Some(0.000_01), false, 4_000),
            model("local", &[Capability::Chat], AccuracyTier::High, LatencyTier::Low, None, true, 4_000),
        ];

        let mut prefs = preferences(None);
        prefs.fallback_strategy = FallbackStrategy::LocalFirst;
        let svc = service(catalog.clone(), prefs.clone());
        let response = svc.select_model(&ModelRequest::new(Capability::Chat, "hi")).unwrap();
        assert_eq!(response.selected_model.id, "local");

        prefs.fallback_strategy = FallbackStrategy::ApiFirst;
        let svc = service(catalog.clone(), prefs.clone());
        let response = svc.select_model(&ModelRequest::new(Capability::Chat, "hi")).unwrap();
        assert_eq!(response.selected_model.id, "remote");

        prefs.fallback_strategy = FallbackStrategy::Balanced;
        let svc = service(catalog, prefs);
        let response = svc.select_model(&ModelRequest::new(Capability::Chat, "hi")).unwrap();
        assert_eq!(response.selected_model.id, "remote");
    }

    #[test]
    fn test_cost_filter_is_exact() {
        let cost_per_token = 0.000_02;
        let svc = service(chat_catalog(), preferences(Some(PerformancePreference::Accuracy)));
        let text = "a".repeat(400);
        let exact = 150.0 * cost_per_token;

        let mut request = ModelRequest::new(Capability::Chat, &text);
        request.max_cost = Some(exact);
        let response = svc.select_model(&request).unwrap();
        assert!(ids(&response).contains(&"b".to_string()));

        request.max_cost = Some(exact * 0.999);
        let response = svc.select_model(&request).unwrap();
        assert_eq!(ids(&response), vec!["a".to_string()]);
    }

    #[test]
    fn test_preference_cost_limit_applies_when_request_has_none() {
        let mut prefs = preferences(Some(PerformancePreference::Accuracy));
        prefs.max_cost_per_request = 0.000_001;
        let svc = service(chat_catalog(), prefs);

        let response = svc
            .select_model(&ModelRequest::new(Capability::Chat, &"a".repeat(400)))
            .unwrap();
        assert_eq!(ids(&response), vec!["a".to_string()]);
    }

    #[test]
    fn test_zero_cost_limit_disables_cost_filter() {
        let mut prefs = preferences(Some(PerformancePreference::Accuracy));
        prefs.max_cost_per_request = 0.0;
        let svc = service(chat_catalog(), prefs);

        let response = svc
            .select_model(&ModelRequest::new(Capability::Chat, &"a".repeat(400_000)))
            .unwrap();
        assert_eq!(ids(&response).len(), 2);
    }

    #[test]
    fn test_latency_filter() {
        let svc = service(mixed_catalog(), preferences(Some(PerformancePreference::Accuracy)));
        let mut request = ModelRequest::new(Capability::Chat, "hello");
        request.max_latency = Some(500);

        let response = svc.select_model(&request).unwrap();
        assert_eq!(ids(&response), vec!["remote-fast".to_string()]);
        assert_eq!(response.estimated_latency, 201);
    }

    #[test]
    fn test_constraint_exhaustion_uses_emergency_fallback() {
        let svc = service(mixed_catalog(), preferences(None));
        let mut request = ModelRequest::new(Capability::Medical, "hello");
        request.max_latency = Some(1);

        let response = svc.select_model(&request).unwrap();
        assert_eq!(response.selected_model.id, "remote-best");
        assert!(response.fallback_models.is_empty());
        assert!(response.reasoning.iter().any(|r| r.starts_with("Emergency fallback")));
    }

    #[test]
    fn test_privacy_filter_keeps_only_local_models() {
        let svc = service(default_catalog().to_vec(), preferences(Some(PerformancePreference::Accuracy)));
        let mut request = ModelRequest::new(Capability::Chat, "patient summary");
        request.requires_privacy = true;

        let response = svc.select_model(&request).unwrap();
        assert!(response.selected_model.is_local);
        assert!(response.fallback_models.iter().all(|m| m.is_local));
    }

    #[test]
    fn test_privacy_exhaustion_is_an_error() {
        let svc = service(mixed_catalog(), preferences(None));
        let mut request = ModelRequest::new(Capability::Medical, "hello");
        request.requires_privacy = true;

        let err = svc.select_model(&request).unwrap_err();
        assert_eq!(
            err,
            RoutingError::NoSuitableModels {
                task_type: Capability::Medical
            }
        );
    }

    #[test]
    fn test_privacy_emergency_fallback_stays_local() {
        let svc = service(mixed_catalog(), preferences(None));
        let mut request = ModelRequest::new(Capability::Chat, "hello");
        request.requires_privacy = true;
        request.max_latency = Some(1);

        let response = svc.select_model(&request).unwrap();
        assert_eq!(response.selected_model.id, "local-small");
    }

    #[test]
    fn test_emergency_fallback_respects_disabled_local_models() {
        let catalog = vec![
            model("local", &[Capability::Chat], AccuracyTier::High, LatencyTier::Low, None, true, 4_000),
            model("remote", &[Capability::Chat], AccuracyTier::High, LatencyTier::High, Some(0.000_01), false, 4_000),
        ];
        let mut prefs = preferences(None);
        prefs.allow_local_models = false;
        let svc = service(catalog, prefs);

        let mut request = ModelRequest::new(Capability::Chat, "hello");
        request.max_latency = Some(500);
        let response = svc.select_model(&request).unwrap();
        assert_eq!(response.selected_model.id, "remote");
        assert!(!response.selected_model.is_local);
        assert!(response.reasoning.iter().any(|r| r.starts_with("Emergency fallback")));
    }

    #[test]
    fn test_disabled_local_models_with_only_local_capable_is_an_error() {
        let mut prefs = preferences(None);
        prefs.allow_local_models = false;
        let svc = service(mixed_catalog(), prefs);

        let err = svc
            .select_model(&ModelRequest::new(Capability::Code, "hello"))
            .unwrap_err();
        assert_eq!(
            err,
            RoutingError::NoSuitableModels {
                task_type: Capability::Code
            }
        );
    }

    #[test]
    fn test_local_preferred_model_dropped_when_local_disabled() {
        let mut prefs = preferences(Some(PerformancePreference::Accuracy));
        prefs
            .preferred_models
            .insert(Capability::Chat, "local-small".to_string());
        prefs.allow_local_models = false;
        let svc = service(mixed_catalog(), prefs);

        let response = svc.select_model(&ModelRequest::new(Capability::Chat, "hello")).unwrap();
        assert_eq!(response.selected_model.id, "remote-best");
        assert!(response.reasoning.iter().any(|r| r.contains("local models are disabled")));
        assert!(!response.reasoning.iter().any(|r| r.contains("excluded by request constraints")));
    }

    #[test]
    fn test_pinned_model_excluded_by_constraints() {
        let mut prefs = preferences(Some(PerformancePreference::Accuracy));
        prefs
            .preferred_models
            .insert(Capability::Chat, "remote-best".to_string());
        let svc = service(mixed_catalog(), prefs);

        let mut request = ModelRequest::new(Capability::Chat, "hello");
        request.requires_privacy = true;
        let response = svc.select_model(&request).unwrap();
        assert_eq!(response.selected_model.id, "local-small");
        assert!(response.reasoning.iter().any(|r| r.contains("excluded by request constraints")));
    }

    #[test]
    fn test_scoring_terms() {
        let request = ModelRequest::new(Capability::Chat, "hi");
        let remote = model("r", &[Capability::Chat], AccuracyTier::Medium, LatencyTier::High, Some(0.000_1), false, 4_000);
        let local = model("l", &[Capability::Chat], AccuracyTier::Low, LatencyTier::Low, None, true, 4_000);

        let speed = service(vec![], preferences(Some(PerformancePreference::Speed)));
        assert!((speed.score_model(&remote, &request) - (15.0 + 10.0)).abs() < 1e-9);
        assert!((speed.score_model(&local, &request) - (7.5 + 40.0)).abs() < 1e-9);

        let accuracy = service(vec![], preferences(Some(PerformancePreference::Accuracy)));
        assert!((accuracy.score_model(&remote, &request) - (15.0 + 20.0)).abs() < 1e-9);

        let cost = service(vec![], preferences(Some(PerformancePreference::Cost)));
        assert!((cost.score_model(&remote, &request) - (15.0 + 16.0)).abs() < 1e-9);
        assert!((cost.score_model(&local, &request) - (7.5 + 40.0)).abs() < 1e-9);

        let unset = service(vec![], preferences(None));
        assert!((unset.score_model(&remote, &request) - 15.0).abs() < 1e-9);
    }

    #[test]
    fn test_expensive_models_floor_at_zero_cost_term() {
        let request = ModelRequest::new(Capability::Chat, "hi");
        let pricey = model("p", &[Capability::Chat], AccuracyTier::Low, LatencyTier::Low, Some(0.01), false, 4_000);
        let cost = service(vec![], preferences(Some(PerformancePreference::Cost)));
        assert!((cost.score_model(&pricey, &request) - 7.5).abs() < 1e-9);
    }

    #[test]
    fn test_large_context_bonus() {
        let svc = service(vec![], preferences(None));
        let big = model("big", &[Capability::Chat], AccuracyTier::Low, LatencyTier::Low, None, true, 16_000);
        let small = model("small", &[Capability::Chat], AccuracyTier::Low, LatencyTier::Low, None, true, 8_000);

        let long = ModelRequest::new(Capability::Chat, &"x".repeat(1_001));
        let short = ModelRequest::new(Capability::Chat, &"x".repeat(1_000));

        assert!((svc.score_model(&big, &long) - 17.5).abs() < 1e-9);
        assert!((svc.score_model(&big, &short) - 7.5).abs() < 1e-9);
        assert!((svc.score_model(&small, &long) - 7.5).abs() < 1e-9);
    }

    #[test]
    fn test_metrics_history_bonus_changes_ranking() {
        let catalog = vec![
            model("first", &[Capability::Chat], AccuracyTier::High, LatencyTier::Low, None, false, 4_000),
            model("second", &[Capability::Chat], AccuracyTier::High, LatencyTier::Low, None, false, 4_000),
        ];
        let mut prefs = preferences(None);
        prefs.fallback_strategy = FallbackStrategy::Balanced;
        let mut svc = service(catalog, prefs);

        let request = ModelRequest::new(Capability::Chat, "hi");
        assert_eq!(svc.select_model(&request).unwrap().selected_model.id, "first");

        svc.update_model_metrics("second", true, 120.0, 40, Some(5.0));
        assert_eq!(svc.select_model(&request).unwrap().selected_model.id, "second");
    }

    #[test]
    fn test_update_model_metrics_shape() {
        let mut svc = service(chat_catalog(), preferences(None));
        for _ in 0..5 {
            svc.update_model_metrics("b", true, 300.0, 200, None);
        }

        let all = svc.all_metrics();
        assert_eq!(all.len(), 1);
        let metrics = &all[0];
        assert_eq!(metrics.model_id, "b");
        assert_eq!(metrics.total_requests, 5);
        assert_eq!(metrics.average_latency, 300.0);
        assert_eq!(metrics.average_tokens_per_request, 200.0);
        assert_eq!(metrics.success_rate, 100.0);
        assert!(metrics.total_cost > 0.0);

        svc.clear_metrics();
        assert!(svc.all_metrics().is_empty());
    }

    #[test]
    fn test_estimated_cost_only_for_priced_models() {
        let mut prefs = preferences(None);
        prefs.fallback_strategy = FallbackStrategy::ApiFirst;
        let svc = service(chat_catalog(), prefs);
        let response = svc
            .select_model(&ModelRequest::new(Capability::Chat, &"a".repeat(400)))
            .unwrap();
        assert_eq!(response.selected_model.id, "b");
        assert_eq!(response.estimated_cost, Some(150.0 * 0.000_02));
    }

    #[test]
    fn test_select_model_does_not_mutate_inputs() {
        let svc = service(mixed_catalog(), preferences(Some(PerformancePreference::Speed)));
        let before = svc.catalog().to_vec();
        let request = ModelRequest::new(Capability::Chat, "hello");
        let first = svc.select_model(&request).unwrap();
        let second = svc.select_model(&request).unwrap();

        assert_eq!(svc.catalog(), before.as_slice());
        assert_eq!(ids(&first), ids(&second));
        assert_eq!(first.reasoning, second.reasoning);
    }
}
