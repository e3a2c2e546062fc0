//! # Routing Manager Module
//!
//! Wires a [`RoutingStore`] to a [`ModelRoutingService`]: loads state on
//! initialisation, and persists every change to preferences, rules and metrics.
//!
//! ## Key Components
//! - [`RoutingManager`] - Stateful front for selection and bookkeeping
//! - [`RoutingManager::initialize`] - Load (or create) the user's state
//! - [`RoutingManager::select_model`] - Fails until initialised

use anyhow::{Context, Result};
use log::{debug, info};

use crate::metrics::ModelMetrics;
use crate::models::{ModelConfig, find_in_catalog};
use crate::preferences::{PreferencesUpdate, UserModelPreferences};
use crate::router::{ModelRequest, ModelResponse, ModelRoutingService, RoutingError};
use crate::rules::ModelRoutingRule;
use crate::storage::RoutingStore;

pub struct RoutingManager<S: RoutingStore> {
    store: S,
    catalog: Vec<ModelConfig>,
    user_id: String,
    service: Option<ModelRoutingService>,
}

impl<S: RoutingStore> RoutingManager<S> {
    pub fn new(store: S, catalog: Vec<ModelConfig>, user_id: &str) -> Self {
        Self {
            store,
            catalog,
            user_id: user_id.to_string(),
            service: None,
        }
    }

    #[cfg(test)]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Load preferences, rules and metrics. Preferences are created with
    /// defaults and saved on first use.
    pub fn initialize(&mut self) -> Result<()> {
        let preferences = match self.store.load_preferences(&self.user_id)? {
            Some(preferences) => preferences,
            None => {
                info!("Creating default model preferences for {}", self.user_id);
                let preferences = UserModelPreferences::new(&self.user_id);
                self.store
                    .save_preferences(&preferences)
                    .context("Failed to save default preferences")?;
                preferences
            }
        };

        let rules = self.store.load_rules().context("Failed to load routing rules")?;
        let metrics = self.store.load_metrics().context("Failed to load model metrics")?;
        debug!(
            "Initialized router for {} with {} rule(s) and {} metrics record(s)",
            self.user_id,
            rules.len(),
            metrics.len()
        );

        self.service = Some(ModelRoutingService::new(
            self.catalog.clone(),
            preferences,
            rules,
            metrics,
        ));
        Ok(())
    }

    fn service(&self) -> Result<&ModelRoutingService, RoutingError> {
        self.service.as_ref().ok_or(RoutingError::NotInitialized)
    }

    fn service_mut(&mut self) -> Result<&mut ModelRoutingService, RoutingError> {
        self.service.as_mut().ok_or(RoutingError::NotInitialized)
    }

    pub fn select_model(&self, request: &ModelRequest) -> Result<ModelResponse, RoutingError> {
        self.service()?.select_model(request)
    }

    pub fn catalog(&self) -> &[ModelConfig] {
        &self.catalog
    }

    pub fn preferences(&self) -> Result<&UserModelPreferences, RoutingError> {
        Ok(self.service()?.preferences())
    }

    pub fn update_preferences(&mut self, update: PreferencesUpdate) -> Result<UserModelPreferences> {
        for (capability, model_id) in &update.preferred_models {
            let model = find_in_catalog(&self.catalog, model_id)
                .with_context(|| format!("Unknown model id: {}", model_id))?;
            if !model.supports(*capability) {
                anyhow::bail!("Model {} does not support {}", model_id, capability);
            }
        }
        if update.max_cost_per_request.is_some_and(|cost| cost < 0.0) {
            anyhow::bail!("Maximum cost per request must not be negative");
        }

        let mut preferences = self.service()?.preferences().clone();
        preferences.apply(update);
        self.replace_preferences(preferences)
    }

    pub fn reset_preferences(&mut self) -> Result<UserModelPreferences> {
        self.service()?;
        self.replace_preferences(UserModelPreferences::new(&self.user_id))
    }

    fn replace_preferences(&mut self, preferences: UserModelPreferences) -> Result<UserModelPreferences> {
        self.store.save_preferences(&preferences)?;
        self.service_mut()?.set_preferences(preferences.clone());
        Ok(preferences)
    }

    pub fn rules(&self) -> Result<&[ModelRoutingRule], RoutingError> {
        Ok(self.service()?.routing_rules())
    }

    pub fn add_rule(&mut self, rule: ModelRoutingRule) -> Result<ModelRoutingRule> {
        if find_in_catalog(&self.catalog, &rule.target_model).is_none() {
            anyhow::bail!("Unknown target model: {}", rule.target_model);
        }
        if let (Some(min), Some(max)) = (rule.conditions.min_length, rule.conditions.max_length) {
            if min > max {
                anyhow::bail!("Rule minimum length {} exceeds maximum length {}", min, max);
            }
        }

        let mut rules = self.rules()?.to_vec();
        rules.push(rule.clone());
        self.replace_rules(rules)?;
        Ok(rule)
    }

    pub fn update_rule<F>(&mut self, rule_id: &str, edit: F) -> Result<ModelRoutingRule>
    where
        F: FnOnce(&mut ModelRoutingRule),
    {
        let mut rules = self.rules()?.to_vec();
        let rule = rules
            .iter_mut()
            .find(|rule| rule.id == rule_id)
            .with_context(|| format!("No routing rule with id {}", rule_id))?;
        edit(rule);
        let updated = rule.clone();

        self.replace_rules(rules)?;
        Ok(updated)
    }

    pub fn set_rule_active(&mut self, rule_id: &str, active: bool) -> Result<ModelRoutingRule> {
        self.update_rule(rule_id, |rule| rule.is_active = active)
    }

    pub fn delete_rule(&mut self, rule_id: &str) -> Result<ModelRoutingRule> {
        let mut rules = self.rules()?.to_vec();
        let position = rules
            .iter()
            .position(|rule| rule.id == rule_id)
            .with_context(|| format!("No routing rule with id {}", rule_id))?;
        let removed = rules.remove(position);

        self.replace_rules(rules)?;
        Ok(removed)
    }

    fn replace_rules(&mut self, rules: Vec<ModelRoutingRule>) -> Result<()> {
        self.store.save_rules(&rules)?;
        self.service_mut()?.set_routing_rules(rules);
        Ok(())
    }

    pub fn metrics(&self) -> Result<Vec<ModelMetrics>, RoutingError> {
        Ok(self.service()?.all_metrics())
    }

    /// Record a completed request and persist the updated aggregates.
    pub fn record_request(
        &mut self,
        model_id: &str,
        success: bool,
        latency_ms: f64,
        token_count: u64,
        user_rating: Option<f64>,
    ) -> Result<ModelMetrics> {
        if find_in_catalog(&self.catalog, model_id).is_none() {
            anyhow::bail!("Unknown model id: {}", model_id);
        }

        let service = self.service_mut()?;
        let updated = service
            .update_model_metrics(model_id, success, latency_ms, token_count, user_rating)
            .clone();
        let all = service.all_metrics();

        self.store.save_metrics(&all)?;
        Ok(updated)
    }

    pub fn reset_metrics(&mut self) -> Result<()> {
        self.service_mut()?.clear_metrics();
        self.store.save_metrics(&[])
    }
}
