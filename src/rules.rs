//! # Routing Rules Module
//!
//! Declarative overrides that pin a target model for matching requests
//!
//! ## Key Components
//! - [`ModelRoutingRule`] - Named rule with match conditions and a target model
//! - [`RuleConditions`] - Optional conditions, all of which must hold
//! - [`find_matching_rule`] - First active rule matching a request

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::Capability;
use crate::pricing::text_length;
use crate::router::ModelRequest;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

impl Priority {
    pub fn name(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Critical => "critical",
        }
    }
}

/// An absent condition matches every request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleConditions {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub task_types: Vec<Capability>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub user_roles: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
}

impl RuleConditions {
    pub fn matches(&self, request: &ModelRequest) -> bool {
        if !self.task_types.is_empty() && !self.task_types.contains(&request.task_type) {
            return false;
        }

        if !self.user_roles.is_empty() {
            match &request.user_role {
                Some(role) if self.user_roles.iter().any(|r| r == role) => {}
                _ => return false,
            }
        }

        if let Some(priority) = self.priority {
            if request.priority != Some(priority) {
                return false;
            }
        }

        let length = text_length(&request.input_text);
        let above_min = self.min_length.is_none_or(|min| length >= min);
        let below_max = self.max_length.is_none_or(|max| length <= max);
        above_min && below_max
    }

    pub fn describe(&self) -> String {
        let mut parts = Vec::new();
        if !self.task_types.is_empty() {
            let tasks: Vec<&str> = self.task_types.iter().map(|t| t.as_str()).collect();
            parts.push(format!("task in [{}]", tasks.join(", ")));
        }
        if !self.user_roles.is_empty() {
            parts.push(format!("role in [{}]", self.user_roles.join(", ")));
        }
        if let Some(priority) = self.priority {
            parts.push(format!("priority = {}", priority.name()));
        }
        match (self.min_length, self.max_length) {
            (Some(min), Some(max)) => parts.push(format!("length {}..={}", min, max)),
            (Some(min), None) => parts.push(format!("length >= {}", min)),
            (None, Some(max)) => parts.push(format!("length <= {}", max)),
            (None, None) => {}
        }

        if parts.is_empty() {
            "any request".to_string()
        } else {
            parts.join(", ")
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelRoutingRule {
    pub id: String,
    pub name: String,
    pub is_active: bool,
    #[serde(default)]
    pub conditions: RuleConditions,
    pub target_model: String,
    pub created_at: DateTime<Utc>,
}

impl ModelRoutingRule {
    pub fn new(name: &str, conditions: RuleConditions, target_model: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            is_active: true,
            conditions,
            target_model: target_model.to_string(),
            created_at: Utc::now(),
        }
    }
}

/// First active rule whose conditions hold. Later rules are never evaluated.
pub fn find_matching_rule<'a>(
    rules: &'a [ModelRoutingRule],
    request: &ModelRequest,
) -> Option<&'a ModelRoutingRule> {
    rules
        .iter()
        .filter(|rule| rule.is_active)
        .find(|rule| rule.conditions.matches(request))
}
