//! # Table Display Module
//!
//! Terminal rendering for selections, the catalog, preferences, rules and metrics
//!
//! ## Key Components
//! - [`format_selection`] - Selected model, fallbacks and reasoning
//! - [`format_catalog_table`] - Catalog entries as a table
//! - [`format_rules_table`] - Routing rules in evaluation order
//! - [`format_metrics_table`] - Per-model running aggregates
//! - [`format_preferences`] - Current user preferences

use crate::metrics::ModelMetrics;
use crate::models::{Capability, ModelConfig};
use crate::preferences::UserModelPreferences;
use crate::pricing::format_cost;
use crate::router::ModelResponse;
use crate::rules::ModelRoutingRule;

const GRAY: &str = "\x1b[90m";
const RESET: &str = "\x1b[39m";
const CYAN: &str = "\x1b[36m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";

#[derive(Clone, Copy)]
enum Align {
    Left,
    Right,
}

fn format_number_compact(n: u64) -> String {
    if n >= 1_000_000 {
        format!("{:.1}M", n as f64 / 1_000_000.0)
    } else if n >= 1_000 {
        format!("{:.0}K", n as f64 / 1_000.0)
    } else {
        n.to_string()
    }
}

fn banner(title: &str) -> String {
    let width = title.chars().count() + 4;
    let line = "─".repeat(width);
    let blank = " ".repeat(width);

    let mut output = String::new();
    output.push('\n');
    output.push_str(&format!(" ╭{}╮\n", line));
    output.push_str(&format!(" │{}│\n", blank));
    output.push_str(&format!(" │  {}  │\n", title));
    output.push_str(&format!(" │{}│\n", blank));
    output.push_str(&format!(" ╰{}╯\n", line));
    output.push('\n');
    output
}

fn border(widths: &[usize], left: &str, middle: &str, right: &str) -> String {
    let segments: Vec<String> = widths.iter().map(|w| "─".repeat(w + 2)).collect();
    format!("{GRAY}{}{}{}{RESET}\n", left, segments.join(middle), right)
}

fn pad(cell: &str, width: usize, align: Align) -> String {
    match align {
        Align::Left => format!("{:<width$}", cell, width = width),
        Align::Right => format!("{:>width$}", cell, width = width),
    }
}

fn render_table(headers: &[(&str, Align)], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|(h, _)| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    let mut output = String::new();
    output.push_str(&border(&widths, "┌", "┬", "┐"));

    output.push_str(&format!("{GRAY}│{RESET}"));
    for ((header, align), width) in headers.iter().zip(&widths) {
        output.push_str(&format!("{CYAN} {} {RESET}{GRAY}│{RESET}", pad(header, *width, *align)));
    }
    output.push('\n');

    for row in rows {
        output.push_str(&border(&widths, "├", "┼", "┤"));
        output.push_str(&format!("{GRAY}│{RESET}"));
        for ((cell, (_, align)), width) in row.iter().zip(headers).zip(&widths) {
            output.push_str(&format!(" {} {GRAY}│{RESET}", pad(cell, *width, *align)));
        }
        output.push('\n');
    }

    output.push_str(&border(&widths, "└", "┴", "┘"));
    output
}

fn capability_list(capabilities: &[Capability]) -> String {
    capabilities
        .iter()
        .map(|c| c.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn format_selection(response: &ModelResponse) -> String {
    let selected = &response.selected_model;
    let mut output = banner("Model Selection");

    output.push_str(&format!(
        "{GREEN}✔ Selected: {} ({}){RESET}\n",
        selected.name, selected.id
    ));
    output.push_str(&format!(
        "  Estimated latency: {}ms\n",
        response.estimated_latency
    ));
    match response.estimated_cost {
        Some(cost) => output.push_str(&format!("  Estimated cost:    {}\n", format_cost(cost))),
        None => output.push_str("  Estimated cost:    free\n"),
    }

    if !response.fallback_models.is_empty() {
        output.push_str(&format!("\n{CYAN}Fallbacks{RESET}\n"));
        for (i, model) in response.fallback_models.iter().enumerate() {
            output.push_str(&format!("  {}. {} ({})\n", i + 1, model.name, model.id));
        }
    }

    output.push_str(&format!("\n{CYAN}Reasoning{RESET}\n"));
    for line in &response.reasoning {
        output.push_str(&format!("{GRAY}  - {}{RESET}\n", line));
    }

    output
}

pub fn format_catalog_table(models: &[ModelConfig]) -> String {
    let headers = [
        ("Model", Align::Left),
        ("Capabilities", Align::Left),
        ("Accuracy", Align::Left),
        ("Latency", Align::Left),
        ("Cost/Token", Align::Right),
        ("Context", Align::Right),
        ("Local", Align::Left),
    ];

    let rows: Vec<Vec<String>> = models
        .iter()
        .map(|model| {
            vec![
                model.id.clone(),
                capability_list(&model.capabilities),
                model.accuracy.name().to_string(),
                model.latency.name().to_string(),
                model
                    .cost_per_token
                    .map(|cost| format!("${:.8}", cost))
                    .unwrap_or_else(|| "-".to_string()),
                format_number_compact(model.context_window),
                if model.is_local { "yes" } else { "no" }.to_string(),
            ]
        })
        .collect();

    let mut output = banner("Model Catalog");
    output.push_str(&render_table(&headers, &rows));
    output
}

pub fn format_preferences(preferences: &UserModelPreferences) -> String {
    let mut output = banner(&format!("Routing Preferences - {}", preferences.user_id));

    output.push_str(&format!(
        "  Fallback strategy:   {}\n",
        preferences.fallback_strategy.name()
    ));
    output.push_str(&format!(
        "  Max cost / request:  {}\n",
        format_cost(preferences.max_cost_per_request)
    ));
    output.push_str(&format!(
        "  Local models:        {}\n",
        if preferences.allow_local_models { "allowed" } else { "disabled" }
    ));
    output.push_str(&format!(
        "  Optimise for:        {}\n",
        preferences
            .performance_preference
            .map(|p| p.name())
            .unwrap_or("-")
    ));
    output.push_str(&format!(
        "  Updated:             {}\n",
        preferences.updated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));

    output.push_str(&format!("\n{CYAN}Preferred models{RESET}\n"));
    if preferences.preferred_models.is_empty() {
        output.push_str("  none\n");
    } else {
        let mut preferred: Vec<(&Capability, &String)> = preferences.preferred_models.iter().collect();
        preferred.sort_by_key(|(capability, _)| capability.as_str());
        for (capability, model_id) in preferred {
            output.push_str(&format!("  {:<15} {}\n", capability.as_str(), model_id));
        }
    }

    output
}

pub fn format_rules_table(rules: &[ModelRoutingRule]) -> String {
    let mut output = banner("Routing Rules");
    if rules.is_empty() {
        output.push_str("No routing rules defined.\n");
        return output;
    }

    let headers = [
        ("#", Align::Right),
        ("Id", Align::Left),
        ("Name", Align::Left),
        ("Active", Align::Left),
        ("Conditions", Align::Left),
        ("Target", Align::Left),
    ];

    let rows: Vec<Vec<String>> = rules
        .iter()
        .enumerate()
        .map(|(i, rule)| {
            vec![
                (i + 1).to_string(),
                rule.id.clone(),
                rule.name.clone(),
                if rule.is_active { "yes" } else { "no" }.to_string(),
                rule.conditions.describe(),
                rule.target_model.clone(),
            ]
        })
        .collect();

    output.push_str(&render_table(&headers, &rows));
    output
}

pub fn format_metrics_table(metrics: &[ModelMetrics]) -> String {
    let mut output = banner("Model Metrics");
    if metrics.is_empty() {
        output.push_str("No requests recorded yet.\n");
        return output;
    }

    let headers = [
        ("Model", Align::Left),
        ("Requests", Align::Right),
        ("Success", Align::Right),
        ("Avg Latency", Align::Right),
        ("Avg Tokens", Align::Right),
        ("Errors", Align::Right),
        ("Rating", Align::Right),
        ("Cost", Align::Right),
        ("Last Used", Align::Left),
    ];

    let rows: Vec<Vec<String>> = metrics
        .iter()
        .map(|m| {
            vec![
                m.model_id.clone(),
                format_number_compact(m.total_requests),
                format!("{:.1}%", m.success_rate),
                format!("{:.0}ms", m.average_latency),
                format_number_compact(m.average_tokens_per_request.round() as u64),
                m.error_count.to_string(),
                if m.rating_count > 0 {
                    format!("{:.2}", m.user_satisfaction_score)
                } else {
                    "-".to_string()
                },
                format_cost(m.total_cost),
                m.last_used
                    .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_else(|| "-".to_string()),
            ]
        })
        .collect();

    output.push_str(&render_table(&headers, &rows));

    let total_cost: f64 = metrics.iter().map(|m| m.total_cost).sum();
    let total_requests: u64 = metrics.iter().map(|m| m.total_requests).sum();
    output.push_str(&format!(
        "\n{YELLOW}📊 Total: {} requests | {}{RESET}\n",
        format_number_compact(total_requests),
        format_cost(total_cost)
    ));
    output
}
