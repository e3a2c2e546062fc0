//! # Model Router
//!
//! Capability-based model selection with user preferences, routing rules and usage metrics
//!
//! ## Key Components
//! - [`router::ModelRoutingService`] - Filters, scores and ranks catalog models
//! - [`manager::RoutingManager`] - Loads and persists routing state
//! - [`commands`] - CLI command handlers

mod cli;
mod commands;
mod config;
mod manager;
mod metrics;
mod models;
mod preferences;
mod pricing;
mod router;
mod rules;
mod storage;
mod table_display;

use anyhow::{Context, Result};
use clap::Parser;
use log::debug;

use crate::cli::{Args, Commands};
use crate::config::RouterConfig;
use crate::manager::RoutingManager;
use crate::storage::JsonFileStore;

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logger based on debug flag
    if args.debug {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    }

    let config = RouterConfig::resolve(
        args.data_dir.as_deref(),
        args.user.as_deref(),
        args.catalog_file.as_deref(),
    )
    .context("Invalid configuration")?;

    let catalog = config.load_catalog()?;
    debug!(
        "Loaded {} catalog models, data directory {}",
        catalog.len(),
        config.data_dir.display()
    );

    let store = JsonFileStore::new(&config.data_dir);
    let mut manager = RoutingManager::new(store, catalog, &config.user_id);
    manager
        .initialize()
        .with_context(|| format!("Failed to load routing state from {}", config.data_dir.display()))?;

    match args.command {
        Commands::Select(select) => commands::handle_select_command(&manager, &select),
        Commands::Catalog { task, json } => commands::handle_catalog_command(&manager, task, json),
        Commands::Prefs { action } => commands::handle_prefs_command(&mut manager, action),
        Commands::Rules { action } => commands::handle_rules_command(&mut manager, action),
        Commands::Metrics { action } => commands::handle_metrics_command(&mut manager, action),
    }
}
