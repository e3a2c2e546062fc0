//! # Configuration Module
//!
//! Resolves the data directory, user id and catalog source from flags and environment
//!
//! ## Key Components
//! - [`RouterConfig`] - Resolved runtime configuration
//! - [`RouterConfig::resolve`] - Flags first, then environment, then defaults
//! - [`RouterConfig::validate`] - Reject unusable configurations early

use anyhow::{Context, Result};
use log::debug;
use std::path::PathBuf;

use crate::models::{ModelConfig, default_catalog, load_catalog_file};

pub const DATA_DIR_ENV: &str = "MODEL_ROUTER_DIR";
pub const USER_ENV: &str = "MODEL_ROUTER_USER";
pub const DEFAULT_USER: &str = "default";
const DATA_DIR_NAME: &str = "model-router";

#[derive(Debug, Clone, PartialEq)]
pub struct RouterConfig {
    pub data_dir: PathBuf,
    pub user_id: String,
    pub catalog_path: Option<PathBuf>,
}

impl RouterConfig {
    pub fn resolve(
        data_dir: Option<&str>,
        user_id: Option<&str>,
        catalog_path: Option<&str>,
    ) -> Result<Self> {
        Self::resolve_with(data_dir, user_id, catalog_path, |key| std::env::var(key).ok())
    }

    /// Same as [`RouterConfig::resolve`] with an injectable environment lookup.
    pub fn resolve_with<F>(
        data_dir: Option<&str>,
        user_id: Option<&str>,
        catalog_path: Option<&str>,
        env: F,
    ) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let data_dir = match data_dir.map(str::to_string).or_else(|| env(DATA_DIR_ENV)) {
            Some(dir) => PathBuf::from(dir),
            None => dirs::data_dir()
                .context("Could not determine a data directory; pass --data-dir or set MODEL_ROUTER_DIR")?
                .join(DATA_DIR_NAME),
        };

        let user_id = user_id
            .map(str::to_string)
            .or_else(|| env(USER_ENV))
            .unwrap_or_else(|| DEFAULT_USER.to_string());

        let config = Self {
            data_dir,
            user_id,
            catalog_path: catalog_path.map(PathBuf::from),
        };
        config.validate()?;

        debug!("Resolved configuration: {:?}", config);
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.user_id.trim().is_empty() {
            anyhow::bail!("User id must not be empty");
        }

        if self.data_dir.exists() && !self.data_dir.is_dir() {
            anyhow::bail!("Data path {} is not a directory", self.data_dir.display());
        }

        if let Some(path) = &self.catalog_path {
            if !path.is_file() {
                anyhow::bail!("Catalog file {} does not exist", path.display());
            }
        }

        Ok(())
    }

    /// The catalog file if one was given, otherwise the built-in catalog.
    pub fn load_catalog(&self) -> Result<Vec<ModelConfig>> {
        match &self.catalog_path {
            Some(path) => load_catalog_file(path),
            None => Ok(default_catalog().to_vec()),
        }
    }
}
