//! Safety policy evaluation.
//!
//! The check order is load-bearing: denylist dominates mode, mode dominates
//! confirmation, confirmation dominates blast radius. Each layer is strictly
//! more permissive than the one before it, so evaluation short-circuits at
//! the first denial.

use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::classify;
use crate::command::{OperationCategory, SafetyMode};
use crate::denylist;
use crate::errors::GateError;

/// Policy knobs for the enforcer. Injected, not global; `mode` is the
/// initial mode and may be switched at runtime through
/// [`SafetyEnforcer::set_mode`] (single administrative writer).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SafetyConfig {
    pub mode: SafetyMode,
    /// Categories that require caller confirmation before execution.
    pub require_confirmation_for: Vec<OperationCategory>,
    pub dry_run_when_available: bool,
    /// Blast-radius ceiling: deny any operation whose estimated affected
    /// resource count exceeds this, regardless of category and mode.
    pub max_resources_per_operation: usize,
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            mode: SafetyMode::ReadOnly,
            require_confirmation_for: vec![
                OperationCategory::Write,
                OperationCategory::Destructive,
            ],
            dry_run_when_available: true,
            max_resources_per_operation: 50,
        }
    }
}

/// Outcome of one safety evaluation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SafetyDecision {
    pub allowed: bool,
    pub category: OperationCategory,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub requires_confirmation: bool,
    pub requires_double_confirmation: bool,
    pub can_dry_run: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_mode: Option<SafetyMode>,
    pub affected_resource_count: usize,
}

impl SafetyDecision {
    fn denied(category: OperationCategory, reason: String) -> Self {
        Self {
            allowed: false,
            category,
            reason: Some(reason),
            requires_confirmation: false,
            requires_double_confirmation: false,
            can_dry_run: false,
            warning: None,
            suggested_mode: None,
            affected_resource_count: 1,
        }
    }
}

/// Categories permitted under a safety mode.
pub fn allowed_categories(mode: SafetyMode) -> &'static [OperationCategory] {
    match mode {
        SafetyMode::ReadOnly => &[OperationCategory::Read],
        SafetyMode::Standard | SafetyMode::Unrestricted => &[
            OperationCategory::Read,
            OperationCategory::Write,
            OperationCategory::Destructive,
        ],
    }
}

/// Minimal mode that would permit the category.
fn suggested_mode_for(category: OperationCategory) -> SafetyMode {
    match category {
        OperationCategory::Write | OperationCategory::Destructive => SafetyMode::Standard,
        _ => SafetyMode::ReadOnly,
    }
}

pub struct SafetyEnforcer {
    config: SafetyConfig,
    mode: RwLock<SafetyMode>,
}

impl SafetyEnforcer {
    pub fn new(config: SafetyConfig) -> Self {
        let mode = RwLock::new(config.mode);
        Self { config, mode }
    }

    /// One consistent read per evaluation; concurrent `set_mode` calls never
    /// let two checks inside the same evaluation observe different modes.
    pub fn mode(&self) -> SafetyMode {
        match self.mode.read() {
            Ok(mode) => *mode,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    /// Switch the active mode. Administrative operation, single writer.
    pub fn set_mode(&self, mode: SafetyMode) {
        let previous = match self.mode.write() {
            Ok(mut guard) => std::mem::replace(&mut *guard, mode),
            Err(poisoned) => std::mem::replace(&mut *poisoned.into_inner(), mode),
        };
        info!(old_mode = %previous, new_mode = %mode, "safety mode changed");
    }

    /// Evaluate an operation against the full policy stack.
    pub fn evaluate(
        &self,
        service: &str,
        operation: &str,
        parameters: &Map<String, Value>,
    ) -> SafetyDecision {
        // 1. Denylist. Ignores mode entirely.
        if let Some(reason) = denylist::block_reason(service, operation) {
            warn!(service, operation, reason = %reason, "operation blocked by denylist");
            return SafetyDecision::denied(OperationCategory::Blocked, reason.message().to_string());
        }

        // 2. Risk category.
        let category = classify::classify(service, operation);

        // 3. Mode gate.
        let mode = self.mode();
        if !allowed_categories(mode).contains(&category) {
            info!(service, operation, %category, %mode, "operation denied by safety mode");
            return SafetyDecision {
                suggested_mode: Some(suggested_mode_for(category)),
                ..SafetyDecision::denied(
                    category,
                    format!("Operation '{operation}' ({category}) is not allowed in {mode} mode"),
                )
            };
        }

        // 4. Confirmation and dry-run flags.
        let requires_confirmation = self.config.require_confirmation_for.contains(&category);
        let requires_double_confirmation =
            denylist::requires_double_confirmation(service, operation);
        let can_dry_run =
            self.config.dry_run_when_available && classify::supports_dry_run(service, operation);
        let warning = denylist::should_warn(service, operation).then(|| {
            format!("Operation '{operation}' can have significant security implications")
        });

        // 5. Blast radius. A circuit breaker independent of category.
        let affected = count_affected_resources(parameters);
        if affected > self.config.max_resources_per_operation {
            info!(service, operation, affected, "operation denied by blast radius ceiling");
            return SafetyDecision {
                affected_resource_count: affected,
                ..SafetyDecision::denied(
                    category,
                    format!(
                        "Operation would affect {affected} resources, exceeding limit of {}",
                        self.config.max_resources_per_operation
                    ),
                )
            };
        }

        debug!(service, operation, %category, requires_confirmation, "operation allowed");
        SafetyDecision {
            allowed: true,
            category,
            reason: None,
            requires_confirmation,
            requires_double_confirmation,
            can_dry_run,
            warning,
            suggested_mode: None,
            affected_resource_count: affected,
        }
    }

    /// Same evaluation, but a denial comes back as a typed error.
    pub fn enforce(
        &self,
        service: &str,
        operation: &str,
        parameters: &Map<String, Value>,
    ) -> Result<SafetyDecision, GateError> {
        let decision = self.evaluate(service, operation, parameters);
        if decision.allowed {
            return Ok(decision);
        }

        let reason =
            decision.reason.clone().unwrap_or_else(|| "operation denied".to_string());
        if decision.category == OperationCategory::Blocked {
            Err(GateError::Blocked {
                operation: format!("{}.{}", service.to_ascii_lowercase(), operation.to_ascii_lowercase()),
                reason,
            })
        } else {
            Err(GateError::Safety {
                message: reason,
                category: decision.category,
                current_mode: self.mode(),
                suggested_mode: decision.suggested_mode,
            })
        }
    }
}

/// Estimate how many resources a call would touch from well-known bulk
/// parameter shapes. Always at least 1.
fn count_affected_resources(parameters: &Map<String, Value>) -> usize {
    let mut count = 1;

    for key in ["InstanceIds", "ResourceIds", "ResourceArns", "FunctionNames"] {
        if let Some(Value::Array(items)) = parameters.get(key) {
            count = count.max(items.len());
        }
    }
    if let Some(objects) = parameters
        .get("Delete")
        .and_then(|delete| delete.get("Objects"))
        .and_then(Value::as_array)
    {
        count = count.max(objects.len());
    }

    count
}
