//! # Commands Module
//!
//! Command handlers for selection, catalog, preferences, rules and metrics
//!
//! ## Key Components
//! - [`handle_select_command`] - Route a request and print the selection
//! - [`handle_catalog_command`] - List catalog entries
//! - [`handle_prefs_command`] - Show, update or reset preferences
//! - [`handle_rules_command`] - Manage routing rules
//! - [`handle_metrics_command`] - Show, record or reset metrics

use anyhow::{Context, Result};
use log::info;

use crate::cli::{MetricsAction, Outcome, PrefsAction, RulesAction, SelectArgs};
use crate::manager::RoutingManager;
use crate::models::Capability;
use crate::preferences::PreferencesUpdate;
use crate::router::ModelRequest;
use crate::rules::{ModelRoutingRule, RuleConditions};
use crate::storage::RoutingStore;
use crate::table_display::{
    format_catalog_table, format_metrics_table, format_preferences, format_rules_table,
    format_selection,
};

pub fn build_request(args: &SelectArgs) -> Result<ModelRequest> {
    let input_text = match (&args.text, &args.file) {
        (Some(text), _) => text.clone(),
        (None, Some(path)) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read request text from {}", path))?,
        (None, None) => anyhow::bail!("Either --text or --file is required"),
    };

    if args.max_cost.is_some_and(|cost| cost < 0.0) {
        anyhow::bail!("--max-cost must not be negative");
    }

    let mut request = ModelRequest::new(args.task, &input_text);
    request.user_role = args.role.clone();
    request.priority = args.priority;
    request.max_latency = args.max_latency;
    request.max_cost = args.max_cost;
    request.requires_privacy = args.private;
    Ok(request)
}

/// Route a request and print the selection
pub fn handle_select_command<S: RoutingStore>(
    manager: &RoutingManager<S>,
    args: &SelectArgs,
) -> Result<()> {
    let request = build_request(args)?;
    let response = manager
        .select_model(&request)
        .with_context(|| format!("Failed to select a model for {}", request.task_type))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        println!("{}", format_selection(&response));
    }

    Ok(())
}

/// List catalog entries, optionally only those supporting a capability
pub fn handle_catalog_command<S: RoutingStore>(
    manager: &RoutingManager<S>,
    task: Option<Capability>,
    json: bool,
) -> Result<()> {
    let models: Vec<_> = manager
        .catalog()
        .iter()
        .filter(|model| task.is_none_or(|capability| model.supports(capability)))
        .cloned()
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&models)?);
    } else if models.is_empty() {
        println!("No models found for the requested capability.");
    } else {
        println!("{}", format_catalog_table(&models));
    }

    Ok(())
}

pub fn handle_prefs_command<S: RoutingStore>(
    manager: &mut RoutingManager<S>,
    action: PrefsAction,
) -> Result<()> {
    match action {
        PrefsAction::Show { json } => {
            let preferences = manager.preferences()?;
            if json {
                println!("{}", serde_json::to_string_pretty(preferences)?);
            } else {
                println!("{}", format_preferences(preferences));
            }
        }
        PrefsAction::Set {
            prefer,
            clear,
            strategy,
            max_cost,
            allow_local,
            performance,
            clear_performance,
        } => {
            let update = PreferencesUpdate {
                preferred_models: prefer,
                cleared_models: clear,
                fallback_strategy: strategy,
                max_cost_per_request: max_cost,
                allow_local_models: allow_local,
                performance_preference: performance,
                clear_performance_preference: clear_performance,
            };
            if update.is_empty() {
                anyhow::bail!("Nothing to update; pass at least one preference flag");
            }

            let preferences = manager
                .update_preferences(update)
                .context("Failed to update preferences")?;
            info!("Updated preferences for {}", preferences.user_id);
            println!("{}", format_preferences(&preferences));
        }
        PrefsAction::Reset => {
            let preferences = manager.reset_preferences()?;
            println!("Preferences for {} reset to defaults.", preferences.user_id);
        }
    }

    Ok(())
}

pub fn handle_rules_command<S: RoutingStore>(
    manager: &mut RoutingManager<S>,
    action: RulesAction,
) -> Result<()> {
    match action {
        RulesAction::List { json } => {
            let rules = manager.rules()?;
            if json {
                println!("{}", serde_json::to_string_pretty(rules)?);
            } else {
                println!("{}", format_rules_table(rules));
            }
        }
        RulesAction::Add {
            name,
            target,
            task_types,
            roles,
            priority,
            min_length,
            max_length,
            inactive,
        } => {
            if name.trim().is_empty() {
                anyhow::bail!("Rule name must not be empty");
            }

            let conditions = RuleConditions {
                task_types,
                user_roles: roles,
                priority,
                min_length,
                max_length,
            };
            let mut rule = ModelRoutingRule::new(name.trim(), conditions, &target);
            rule.is_active = !inactive;

            let rule = manager.add_rule(rule).context("Failed to add routing rule")?;
            println!("Added rule '{}' ({}) -> {}", rule.name, rule.id, rule.target_model);
        }
        RulesAction::Remove { id } => {
            let rule = manager.delete_rule(&id)?;
            println!("Removed rule '{}' ({})", rule.name, rule.id);
        }
        RulesAction::Enable { id } => {
            let rule = manager.set_rule_active(&id, true)?;
            println!("Enabled rule '{}'", rule.name);
        }
        RulesAction::Disable { id } => {
            let rule = manager.set_rule_active(&id, false)?;
            println!("Disabled rule '{}'", rule.name);
        }
    }

    Ok(())
}

pub fn handle_metrics_command<S: RoutingStore>(
    manager: &mut RoutingManager<S>,
    action: MetricsAction,
) -> Result<()> {
    match action {
        MetricsAction::Show { json } => {
            let metrics = manager.metrics()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&metrics)?);
            } else {
                println!("{}", format_metrics_table(&metrics));
            }
        }
        MetricsAction::Record {
            model,
            outcome,
            latency,
            tokens,
            rating,
        } => {
            if latency < 0.0 {
                anyhow::bail!("--latency must not be negative");
            }

            let metrics = manager
                .record_request(&model, outcome == Outcome::Success, latency, tokens, rating)
                .context("Failed to record request metrics")?;
            println!(
                "Recorded request for {} ({} total, {:.1}% success)",
                metrics.model_id, metrics.total_requests, metrics.success_rate
            );
        }
        MetricsAction::Reset => {
            manager.reset_metrics()?;
            println!("All model metrics cleared.");
        }
    }

    Ok(())
}
