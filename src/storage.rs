//! # Storage Module
//!
//! Persistence of preferences, routing rules and metrics behind a swappable store
//!
//! ## Key Components
//! - [`RoutingStore`] - Load/save interface for the three persisted collections
//! - [`JsonFileStore`] - One JSON file per collection in a data directory
//! - [`MemoryStore`] - In-process store for tests

use anyhow::{Context, Result};
use log::debug;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use crate::metrics::ModelMetrics;
use crate::preferences::UserModelPreferences;
use crate::rules::ModelRoutingRule;

pub const PREFERENCES_FILE: &str = "model-preferences.json";
pub const RULES_FILE: &str = "model-routing-rules.json";
pub const METRICS_FILE: &str = "model-metrics.json";

pub trait RoutingStore {
    fn load_preferences(&self, user_id: &str) -> Result<Option<UserModelPreferences>>;
    fn save_preferences(&mut self, preferences: &UserModelPreferences) -> Result<()>;
    fn load_rules(&self) -> Result<Vec<ModelRoutingRule>>;
    fn save_rules(&mut self, rules: &[ModelRoutingRule]) -> Result<()>;
    fn load_metrics(&self) -> Result<Vec<ModelMetrics>>;
    fn save_metrics(&mut self, metrics: &[ModelMetrics]) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn read_json<T: DeserializeOwned + Default>(&self, file_name: &str) -> Result<T> {
        let path = self.dir.join(file_name);
        if !path.exists() {
            debug!("{} does not exist yet, using defaults", path.display());
            return Ok(T::default());
        }

        let data = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        if data.trim().is_empty() {
            return Ok(T::default());
        }

        serde_json::from_str(&data).with_context(|| format!("Failed to parse {}", path.display()))
    }

    fn write_json<T: Serialize + ?Sized>(&self, file_name: &str, value: &T) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create data directory {}", self.dir.display()))?;

        let path = self.dir.join(file_name);
        let json = serde_json::to_string_pretty(value)
            .with_context(|| format!("Failed to serialize {}", file_name))?;
        fs::write(&path, json).with_context(|| format!("Failed to write {}", path.display()))?;

        debug!("Saved {}", path.display());
        Ok(())
    }
}

impl RoutingStore for JsonFileStore {
    fn load_preferences(&self, user_id: &str) -> Result<Option<UserModelPreferences>> {
        let mut all: HashMap<String, UserModelPreferences> = self.read_json(PREFERENCES_FILE)?;
        Ok(all.remove(user_id))
    }

    fn save_preferences(&mut self, preferences: &UserModelPreferences) -> Result<()> {
        let mut all: HashMap<String, UserModelPreferences> = self.read_json(PREFERENCES_FILE)?;
        all.insert(preferences.user_id.clone(), preferences.clone());
        self.write_json(PREFERENCES_FILE, &all)
    }

    fn load_rules(&self) -> Result<Vec<ModelRoutingRule>> {
        self.read_json(RULES_FILE)
    }

    fn save_rules(&mut self, rules: &[ModelRoutingRule]) -> Result<()> {
        self.write_json(RULES_FILE, rules)
    }

    fn load_metrics(&self) -> Result<Vec<ModelMetrics>> {
        self.read_json(METRICS_FILE)
    }

    fn save_metrics(&mut self, metrics: &[ModelMetrics]) -> Result<()> {
        self.write_json(METRICS_FILE, metrics)
    }
}

#[cfg(test)]
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    preferences: HashMap<String, UserModelPreferences>,
    rules: Vec<ModelRoutingRule>,
    metrics: Vec<ModelMetrics>,
}

#[cfg(test)]
impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
impl RoutingStore for MemoryStore {
    fn load_preferences(&self, user_id: &str) -> Result<Option<UserModelPreferences>> {
        Ok(self.preferences.get(user_id).cloned())
    }

    fn save_preferences(&mut self, preferences: &UserModelPreferences) -> Result<()> {
        self.preferences
            .insert(preferences.user_id.clone(), preferences.clone());
        Ok(())
    }

    fn load_rules(&self) -> Result<Vec<ModelRoutingRule>> {
        Ok(self.rules.clone())
    }

    fn save_rules(&mut self, rules: &[ModelRoutingRule]) -> Result<()> {
        self.rules = rules.to_vec();
        Ok(())
    }

    fn load_metrics(&self) -> Result<Vec<ModelMetrics>> {
        Ok(self.metrics.clone())
    }

    fn save_metrics(&mut self, metrics: &[ModelMetrics]) -> Result<()> {
        self.metrics = metrics.to_vec();
        Ok(())
    }
}
