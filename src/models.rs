//! # Model Catalog Module
//!
//! Defines the static catalog of routable models and their qualitative tiers
//!
//! ## Key Components
//! - [`ModelConfig`] - Catalog entry for a single model
//! - [`Capability`] - Capability tags a model can serve
//! - [`default_catalog`] - Built-in catalog shared by the whole process
//! - [`find_in_catalog`] - Look up an entry by id
//! - [`load_catalog_file`] - Load a replacement catalog from JSON

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Capability {
    Chat,
    Code,
    Medical,
    Embeddings,
    Classification,
    Summarization,
}

impl Capability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::Chat => "chat",
            Capability::Code => "code",
            Capability::Medical => "medical",
            Capability::Embeddings => "embeddings",
            Capability::Classification => "classification",
            Capability::Summarization => "summarization",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AccuracyTier {
    Low,
    Medium,
    High,
    VeryHigh,
}

impl AccuracyTier {
    /// Numeric weight used by the scorer.
    pub fn score(&self) -> f64 {
        match self {
            AccuracyTier::Low => 25.0,
            AccuracyTier::Medium => 50.0,
            AccuracyTier::High => 75.0,
            AccuracyTier::VeryHigh => 100.0,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            AccuracyTier::Low => "low",
            AccuracyTier::Medium => "medium",
            AccuracyTier::High => "high",
            AccuracyTier::VeryHigh => "very-high",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LatencyTier {
    Low,
    Medium,
    High,
    #[serde(other)]
    Unknown,
}

impl LatencyTier {
    /// Base latency in milliseconds before the input-length multiplier.
    pub fn base_latency_ms(&self) -> f64 {
        match self {
            LatencyTier::Low => 200.0,
            LatencyTier::Medium => 1000.0,
            LatencyTier::High => 3000.0,
            LatencyTier::Unknown => 1000.0,
        }
    }

    /// Higher is faster.
    pub fn inverse_score(&self) -> f64 {
        match self {
            LatencyTier::Low => 100.0,
            LatencyTier::Medium => 50.0,
            LatencyTier::High => 25.0,
            LatencyTier::Unknown => 50.0,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            LatencyTier::Low => "low",
            LatencyTier::Medium => "medium",
            LatencyTier::High => "high",
            LatencyTier::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelConfig {
    pub id: String,
    pub name: String,
    pub capabilities: Vec<Capability>,
    pub accuracy: AccuracyTier,
    pub latency: LatencyTier,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_per_token: Option<f64>,
    pub context_window: u64,
    #[serde(default)]
    pub is_local: bool,
}

impl ModelConfig {
    pub fn supports(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }

    /// Cost per token, treating a zero price the same as no price.
    pub fn billable_cost_per_token(&self) -> Option<f64> {
        self.cost_per_token.filter(|cost| *cost > 0.0)
    }
}

fn entry(
    id: &str,
    name: &str,
    capabilities: &[Capability],
    accuracy: AccuracyTier,
    latency: LatencyTier,
    cost_per_token: Option<f64>,
    context_window: u64,
    is_local: bool,
) -> ModelConfig {
    ModelConfig {
        id: id.to_string(),
        name: name.to_string(),
        capabilities: capabilities.to_vec(),
        accuracy,
        latency,
        cost_per_token,
        context_window,
        is_local,
    }
}

lazy_static::lazy_static! {
    static ref DEFAULT_CATALOG: Vec<ModelConfig> = {
        use AccuracyTier as A;
        use Capability::*;
        use LatencyTier as L;

        vec![
            entry("gpt-4o", "GPT-4o", &[Chat, Code, Medical, Summarization, Classification],
                A::VeryHigh, L::Medium, Some(0.000_01), 128_000, false),
            entry("gpt-4o-mini", "GPT-4o mini", &[Chat, Code, Summarization, Classification],
                A::High, L::Low, Some(0.000_000_6), 128_000, false),
            entry("claude-3-5-sonnet", "Claude 3.5 Sonnet", &[Chat, Code, Medical, Summarization],
                A::VeryHigh, L::Medium, Some(0.000_015), 200_000, false),
            entry("claude-3-haiku", "Claude 3 Haiku", &[Chat, Summarization, Classification],
                A::Medium, L::Low, Some(0.000_001_25), 200_000, false),
            entry("med-palm-2", "Med-PaLM 2", &[Medical, Chat],
                A::VeryHigh, L::High, Some(0.000_02), 8_192, false),
            entry("text-embedding-3-small", "OpenAI Embeddings (small)", &[Embeddings],
                A::High, L::Low, Some(0.000_000_02), 8_191, false),
            entry("llama-3-8b-local", "Llama 3 8B (on-device)", &[Chat, Code, Summarization],
                A::Medium, L::Medium, None, 8_192, true),
            entry("biomistral-7b-local", "BioMistral 7B (on-device)", &[Medical, Chat],
                A::Medium, L::High, None, 4_096, true),
            entry("minilm-embeddings-local", "MiniLM Embeddings (on-device)", &[Embeddings],
                A::Medium, L::Low, None, 512, true),
            entry("distilbert-classifier-local", "DistilBERT Classifier (on-device)", &[Classification],
                A::Low, L::Low, None, 512, true),
        ]
    };
}

pub fn default_catalog() -> &'static [ModelConfig] {
    &DEFAULT_CATALOG
}

pub fn find_in_catalog<'a>(catalog: &'a [ModelConfig], model_id: &str) -> Option<&'a ModelConfig> {
    catalog.iter().find(|model| model.id == model_id)
}

/// Load a catalog from a JSON array of model entries.
pub fn load_catalog_file(path: &Path) -> Result<Vec<ModelConfig>> {
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read catalog file {}", path.display()))?;
    let catalog: Vec<ModelConfig> = serde_json::from_str(&data)
        .with_context(|| format!("Catalog file {} is not a valid model list", path.display()))?;
    validate_catalog(&catalog)?;
    Ok(catalog)
}

pub fn validate_catalog(catalog: &[ModelConfig]) -> Result<()> {
    if catalog.is_empty() {
        anyhow::bail!("Model catalog is empty");
    }

    let mut seen = HashSet::new();
    for model in catalog {
        if !seen.insert(model.id.as_str()) {
            anyhow::bail!("Duplicate model id in catalog: {}", model.id);
        }
        if model.capabilities.is_empty() {
            anyhow::bail!("Model {} declares no capabilities", model.id);
        }
    }

    Ok(())
}
