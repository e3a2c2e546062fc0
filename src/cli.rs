//! # CLI Module
//!
//! Command-line interface definitions and argument parsing for model-router-rs
//!
//! ## Key Components
//! - [`Args`] - Main CLI arguments structure
//! - [`Commands`] - Subcommand definitions
//! - [`PrefsAction`], [`RulesAction`], [`MetricsAction`] - Nested actions
//! - [`Outcome`] - Result of a recorded request

use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};

use crate::models::Capability;
use crate::preferences::{FallbackStrategy, PerformancePreference};
use crate::rules::Priority;

#[derive(Debug, Clone, Copy, PartialEq, ValueEnum)]
pub enum Outcome {
    Success,
    Failure,
}

#[derive(Debug, ClapArgs)]
pub struct SelectArgs {
    /// Capability the request needs
    #[arg(long, value_enum)]
    pub task: Capability,

    /// Request text (only its length is used)
    #[arg(long, conflicts_with = "file", required_unless_present = "file")]
    pub text: Option<String>,

    /// Read the request text from a file
    #[arg(long)]
    pub file: Option<String>,

    /// Role of the requesting user
    #[arg(long)]
    pub role: Option<String>,

    /// Request priority
    #[arg(long, value_enum)]
    pub priority: Option<Priority>,

    /// Maximum acceptable latency in milliseconds
    #[arg(long)]
    pub max_latency: Option<u64>,

    /// Maximum acceptable cost in USD (overrides the preference)
    #[arg(long)]
    pub max_cost: Option<f64>,

    /// Only consider on-device models
    #[arg(long)]
    pub private: bool,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Subcommand)]
pub enum PrefsAction {
    /// Show current preferences
    Show {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
    /// Update preferences
    Set {
        /// Preferred model for a capability, as CAPABILITY=MODEL_ID (repeatable)
        #[arg(long = "prefer", value_parser = parse_preferred_model)]
        prefer: Vec<(Capability, String)>,

        /// Remove the preferred model for a capability (repeatable)
        #[arg(long = "clear", value_enum)]
        clear: Vec<Capability>,

        /// Ordering of local and remote candidates
        #[arg(long, value_enum)]
        strategy: Option<FallbackStrategy>,

        /// Maximum cost per request in USD (0 disables the cost filter)
        #[arg(long)]
        max_cost: Option<f64>,

        /// Allow on-device models
        #[arg(long)]
        allow_local: Option<bool>,

        /// Quality the scorer should favour
        #[arg(long, value_enum)]
        performance: Option<PerformancePreference>,

        /// Stop favouring any quality in the scorer
        #[arg(long, conflicts_with = "performance")]
        clear_performance: bool,
    },
    /// Restore default preferences
    Reset,
}

#[derive(Debug, Subcommand)]
pub enum RulesAction {
    /// List routing rules in evaluation order
    List {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
    /// Append a routing rule
    Add {
        /// Rule name
        #[arg(long)]
        name: String,

        /// Model the rule routes to
        #[arg(long)]
        target: String,

        /// Task types the rule applies to (comma separated)
        #[arg(long, value_enum, value_delimiter = ',')]
        task_types: Vec<Capability>,

        /// User roles the rule applies to (comma separated)
        #[arg(long, value_delimiter = ',')]
        roles: Vec<String>,

        /// Exact request priority the rule applies to
        #[arg(long, value_enum)]
        priority: Option<Priority>,

        /// Minimum request length in characters
        #[arg(long)]
        min_length: Option<usize>,

        /// Maximum request length in characters
        #[arg(long)]
        max_length: Option<usize>,

        /// Create the rule disabled
        #[arg(long)]
        inactive: bool,
    },
    /// Delete a routing rule
    Remove { id: String },
    /// Activate a routing rule
    Enable { id: String },
    /// Deactivate a routing rule
    Disable { id: String },
}

#[derive(Debug, Subcommand)]
pub enum MetricsAction {
    /// Show per-model metrics
    Show {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
    /// Record the outcome of a completed request
    Record {
        /// Model that served the request
        #[arg(long)]
        model: String,

        /// Whether the request succeeded
        #[arg(long, value_enum)]
        outcome: Outcome,

        /// Observed latency in milliseconds
        #[arg(long)]
        latency: f64,

        /// Tokens consumed
        #[arg(long)]
        tokens: u64,

        /// User satisfaction rating
        #[arg(long)]
        rating: Option<f64>,
    },
    /// Delete all metrics
    Reset,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Choose a model for a request
    Select(SelectArgs),
    /// List the model catalog
    Catalog {
        /// Only models supporting this capability
        #[arg(long, value_enum)]
        task: Option<Capability>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
    /// Show or change routing preferences
    Prefs {
        #[command(subcommand)]
        action: PrefsAction,
    },
    /// Manage routing rules
    Rules {
        #[command(subcommand)]
        action: RulesAction,
    },
    /// Show or record model metrics
    Metrics {
        #[command(subcommand)]
        action: MetricsAction,
    },
}

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Model Router - capability-based model selection with preferences, rules and metrics"
)]
pub struct Args {
    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Directory holding preferences, rules and metrics (can also use MODEL_ROUTER_DIR env var)
    #[arg(long, global = true)]
    pub data_dir: Option<String>,

    /// User whose preferences are used (can also use MODEL_ROUTER_USER env var)
    #[arg(long, global = true)]
    pub user: Option<String>,

    /// JSON file replacing the built-in model catalog
    #[arg(long, global = true)]
    pub catalog_file: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

fn parse_preferred_model(value: &str) -> Result<(Capability, String), String> {
    let (capability, model_id) = value
        .split_once('=')
        .ok_or_else(|| format!("expected CAPABILITY=MODEL_ID, got '{}'", value))?;

    let capability = Capability::from_str(capability.trim(), true)?;
    let model_id = model_id.trim();
    if model_id.is_empty() {
        return Err(format!("missing model id in '{}'", value));
    }

    Ok((capability, model_id.to_string()))
}
