//! The execution pipeline.
//!
//! Every request, natural language or explicit, flows through the same
//! stages in the same order: parse, validate, safety, confirm, execute,
//! record. No stage can be skipped; in particular there is no execution
//! path that bypasses the safety evaluation.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Map, Value};
use tracing::{debug, info, instrument, warn};

use crate::audit::{AuditEvent, AuditOutcome, AuditSink};
use crate::catalog::{SchemaValidator, ServiceCatalog};
use crate::command::{OperationCategory, SafetyMode, StructuredCommand};
use crate::config::GateConfig;
use crate::context::ContextStore;
use crate::error_map;
use crate::errors::GateError;
use crate::intent::IntentClassifier;
use crate::pagination::{direct_result, PaginatedResult, PaginationHandler};
use crate::safety::{SafetyDecision, SafetyEnforcer};
use crate::session::SessionProvider;

/// How much approval the caller has supplied for this request. Ordered:
/// a stronger level satisfies any weaker requirement.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum Confirmation {
    #[default]
    None,
    Confirmed,
    DoubleConfirmed,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct ExecutionOptions {
    pub confirmation: Confirmation,
    /// Rehearse the call without side effects, where the provider supports
    /// it.
    pub dry_run: bool,
}

/// Successful outcome of one pipeline run. Failures are [`GateError`]s;
/// a result never carries an error and an error never carries result data.
#[derive(Clone, Debug)]
pub struct ExecutionResult {
    pub command: StructuredCommand,
    pub decision: SafetyDecision,
    pub items: Vec<Value>,
    pub scalar_fields: BTreeMap<String, Value>,
    pub pages_fetched: usize,
    pub truncated: bool,
    /// True when the provider confirmed the call would succeed without
    /// executing it.
    pub dry_run: bool,
    pub formatted: String,
}

impl ExecutionResult {
    /// JSON rendering for transport surfaces.
    pub fn to_value(&self) -> Value {
        json!({
            "success": true,
            "service": self.command.service,
            "operation": self.command.operation,
            "category": self.command.category,
            "item_count": self.items.len(),
            "items": self.items,
            "fields": self.scalar_fields,
            "truncated": self.truncated,
            "dry_run": self.dry_run,
        })
    }
}

pub struct ExecutionEngine {
    catalog: Arc<dyn ServiceCatalog>,
    validator: SchemaValidator,
    intent: IntentClassifier,
    enforcer: SafetyEnforcer,
    session: Arc<dyn SessionProvider>,
    context: Arc<dyn ContextStore>,
    audit: Arc<dyn AuditSink>,
    pagination: PaginationHandler,
    request_timeout: Duration,
}

impl ExecutionEngine {
    /// Build an engine whose context store is chosen by `config.context`.
    pub fn new(
        config: &GateConfig,
        catalog: Arc<dyn ServiceCatalog>,
        session: Arc<dyn SessionProvider>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        let context = crate::context::store_from_config(&config.context);
        Self::with_context_store(config, catalog, session, context, audit)
    }

    /// Build an engine around a caller-supplied context store.
    pub fn with_context_store(
        config: &GateConfig,
        catalog: Arc<dyn ServiceCatalog>,
        session: Arc<dyn SessionProvider>,
        context: Arc<dyn ContextStore>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            validator: SchemaValidator::new(Arc::clone(&catalog)),
            catalog,
            intent: IntentClassifier::new(),
            enforcer: SafetyEnforcer::new(config.safety.clone()),
            session,
            context,
            audit,
            pagination: PaginationHandler::new(
                config.pagination.max_pages,
                config.pagination.max_items,
            ),
            request_timeout: Duration::from_secs(config.execution.request_timeout_secs),
        }
    }

    pub fn safety_mode(&self) -> SafetyMode {
        self.enforcer.mode()
    }

    pub fn set_safety_mode(&self, mode: SafetyMode) {
        self.enforcer.set_mode(mode);
    }

    /// Resolve a natural-language request and run it through the pipeline.
    #[instrument(skip(self, input), fields(input_len = input.len()))]
    pub async fn execute_natural_language(
        &self,
        input: &str,
        options: ExecutionOptions,
    ) -> Result<ExecutionResult, GateError> {
        let parsed = self.intent.classify(input);
        let command = match parsed.command {
            Some(command) if parsed.success => command,
            _ => {
                debug!(input, "could not resolve input to a command");
                return Err(GateError::Parse {
                    message: parsed
                        .error
                        .unwrap_or_else(|| "request did not match any known operation".to_string()),
                    suggestions: parsed.suggestions,
                });
            }
        };
        info!(
            service = %command.service,
            operation = %command.operation,
            confidence = command.confidence,
            "resolved natural-language request"
        );
        self.execute_command(command, options).await
    }

    /// Run an explicitly constructed call through the pipeline. The risk
    /// category is always derived here, never trusted from the caller.
    pub async fn execute_explicit(
        &self,
        service: &str,
        operation: &str,
        parameters: Map<String, Value>,
        region: Option<String>,
        options: ExecutionOptions,
    ) -> Result<ExecutionResult, GateError> {
        let category = crate::classify::classify(service, operation);
        let mut command = StructuredCommand::new(service, operation, parameters, category);
        command.region = region;
        self.execute_command(command, options).await
    }

    /// The shared back half of the pipeline: validate, enforce, confirm,
    /// call, record.
    pub async fn execute_command(
        &self,
        mut command: StructuredCommand,
        options: ExecutionOptions,
    ) -> Result<ExecutionResult, GateError> {
        let validation =
            self.validator.validate(&command.service, &command.operation, &command.parameters);
        if !validation.valid {
            return Err(GateError::Validation {
                errors: validation.errors,
                missing_required: validation.missing_required,
                suggestions: validation.suggestions,
            });
        }
        for warning in &validation.warnings {
            warn!(service = %command.service, operation = %command.operation, warning, "validation warning");
        }

        let decision = match self.enforcer.enforce(
            &command.service,
            &command.operation,
            &command.parameters,
        ) {
            Ok(decision) => decision,
            Err(err) => {
                let outcome = match err {
                    GateError::Blocked { .. } => AuditOutcome::Blocked,
                    _ => AuditOutcome::Denied,
                };
                self.audit.emit(
                    AuditEvent::new(
                        command.service.clone(),
                        command.operation.clone(),
                        command.category,
                        outcome,
                    )
                    .with_metadata("mode", self.enforcer.mode().as_str()),
                );
                return Err(err);
            }
        };
        command.category = decision.category;

        self.check_confirmation(&command, &decision, options.confirmation)?;

        let dry_run = options.dry_run && decision.can_dry_run;
        if dry_run {
            command.parameters.insert("DryRun".to_string(), Value::Bool(true));
        }

        let (outcome, dry_run_passed) = self.call_provider(&command, dry_run).await?;

        if decision.category == OperationCategory::Read {
            self.context.record_query(&command, &outcome.items);
            self.context.add_resources_from_response(
                &command.service,
                infer_resource_type(&command.operation),
                &outcome.items,
            );
        }
        self.audit.emit(
            AuditEvent::new(
                command.service.clone(),
                command.operation.clone(),
                decision.category,
                AuditOutcome::Executed,
            )
            .with_metadata("items", outcome.items.len().to_string())
            .with_metadata("truncated", outcome.truncated.to_string())
            .with_metadata("dry_run", dry_run_passed.to_string()),
        );

        let formatted = format_response(&command, &outcome, dry_run_passed);
        Ok(ExecutionResult {
            command,
            decision,
            items: outcome.items,
            scalar_fields: outcome.scalar_fields,
            pages_fetched: outcome.pages_fetched,
            truncated: outcome.truncated,
            dry_run: dry_run_passed,
            formatted,
        })
    }

    fn check_confirmation(
        &self,
        command: &StructuredCommand,
        decision: &SafetyDecision,
        supplied: Confirmation,
    ) -> Result<(), GateError> {
        let required = if decision.requires_double_confirmation {
            Confirmation::DoubleConfirmed
        } else if decision.requires_confirmation {
            Confirmation::Confirmed
        } else {
            Confirmation::None
        };
        if supplied >= required {
            return Ok(());
        }

        self.audit.emit(
            AuditEvent::new(
                command.service.clone(),
                command.operation.clone(),
                decision.category,
                AuditOutcome::ConfirmationPending,
            )
            .with_metadata("affected_resources", decision.affected_resource_count.to_string()),
        );
        Err(GateError::ConfirmationRequired {
            message: confirmation_message(command, decision),
            double: required == Confirmation::DoubleConfirmed,
        })
    }

    /// Issue the provider call under the request deadline. Dropping the
    /// call future on timeout abandons any pages fetched so far.
    async fn call_provider(
        &self,
        command: &StructuredCommand,
        dry_run: bool,
    ) -> Result<(PaginatedResult, bool), GateError> {
        let client = self
            .session
            .client(&command.service, command.region.as_deref())
            .await
            .map_err(|err| error_map::normalize(&command.service, &command.operation, err))?;

        let result_key = self.catalog.result_key(&command.service, &command.operation);
        let call = async {
            if self.catalog.supports_pagination(&command.service, &command.operation) {
                self.pagination
                    .execute_paginated(
                        client.as_ref(),
                        &command.operation,
                        &command.parameters,
                        result_key.as_deref(),
                    )
                    .await
            } else {
                client
                    .call(&command.operation, &command.parameters)
                    .await
                    .map(|body| direct_result(body, result_key.as_deref()))
            }
        };

        let outcome = match tokio::time::timeout(self.request_timeout, call).await {
            Err(_) => {
                self.audit.emit(
                    AuditEvent::new(
                        command.service.clone(),
                        command.operation.clone(),
                        command.category,
                        AuditOutcome::Failed,
                    )
                    .with_metadata("error", "timeout"),
                );
                return Err(GateError::Timeout {
                    operation: command.operation_key(),
                    seconds: self.request_timeout.as_secs(),
                });
            }
            Ok(Ok(outcome)) => outcome,
            // A rejected dry run is the provider saying the real call would
            // have succeeded.
            Ok(Err(err)) if dry_run && err.code == "DryRunOperation" => {
                return Ok((PaginatedResult::default(), true));
            }
            Ok(Err(err)) => {
                let normalized = error_map::normalize(&command.service, &command.operation, err);
                self.audit.emit(
                    AuditEvent::new(
                        command.service.clone(),
                        command.operation.clone(),
                        command.category,
                        AuditOutcome::Failed,
                    )
                    .with_metadata("code", normalized.code.clone())
                    .with_metadata("category", normalized.category.as_str()),
                );
                return Err(GateError::Execution(normalized));
            }
        };

        Ok((outcome, false))
    }
}

/// Human-facing confirmation prompt for a pending operation.
pub fn confirmation_message(command: &StructuredCommand, decision: &SafetyDecision) -> String {
    let mut message = format!(
        "{} operation '{}' on {} will affect {} resource{}.",
        match decision.category {
            OperationCategory::Destructive => "Destructive",
            OperationCategory::Write => "Write",
            _ => "This",
        },
        command.operation_key(),
        infer_resource_type(&command.operation),
        decision.affected_resource_count,
        if decision.affected_resource_count == 1 { "" } else { "s" },
    );
    if let Some(warning) = &decision.warning {
        message.push(' ');
        message.push_str(warning);
        message.push('.');
    }
    if decision.requires_double_confirmation {
        message.push_str(" This action cannot be undone; confirm twice to proceed.");
    } else {
        message.push_str(" Confirm to proceed.");
    }
    message
}

/// Guess the resource noun from the operation name, for prompts.
fn infer_resource_type(operation: &str) -> &str {
    for prefix in
        ["list_", "describe_", "get_", "delete_", "create_", "terminate_", "update_", "stop_", "start_"]
    {
        if let Some(rest) = operation.strip_prefix(prefix) {
            if !rest.is_empty() {
                return rest;
            }
        }
    }
    operation
}

const TABLE_MAX_COLUMNS: usize = 6;
const TABLE_MAX_ROWS: usize = 50;

/// Markdown summary of an execution outcome.
fn format_response(command: &StructuredCommand, outcome: &PaginatedResult, dry_run: bool) -> String {
    if dry_run {
        return format!("Dry run of `{}` succeeded; no changes were made.", command.operation_key());
    }

    let mut lines = vec![format!(
        "`{}` returned {} item{}{}.",
        command.operation_key(),
        outcome.items.len(),
        if outcome.items.len() == 1 { "" } else { "s" },
        if outcome.truncated { " (truncated)" } else { "" },
    )];

    if let Some(table) = format_table(&outcome.items) {
        lines.push(String::new());
        lines.push(table);
    }
    if !outcome.scalar_fields.is_empty() {
        lines.push(String::new());
        for (key, value) in &outcome.scalar_fields {
            lines.push(format!("- {key}: {}", render_cell(value)));
        }
    }
    lines.join("\n")
}

/// Tabulate homogeneous object items; other shapes get no table.
fn format_table(items: &[Value]) -> Option<String> {
    let first = items.first()?.as_object()?;
    let columns: Vec<&String> = first.keys().take(TABLE_MAX_COLUMNS).collect();
    if columns.is_empty() {
        return None;
    }

    let mut out = String::new();
    out.push_str("| ");
    out.push_str(&columns.iter().map(|c| c.as_str()).collect::<Vec<_>>().join(" | "));
    out.push_str(" |\n|");
    for _ in &columns {
        out.push_str(" --- |");
    }
    for item in items.iter().take(TABLE_MAX_ROWS) {
        out.push_str("\n| ");
        let row: Vec<String> = columns
            .iter()
            .map(|column| {
                item.get(column.as_str()).map(render_cell).unwrap_or_default()
            })
            .collect();
        out.push_str(&row.join(" | "));
        out.push_str(" |");
    }
    if items.len() > TABLE_MAX_ROWS {
        out.push_str(&format!("\n\n... and {} more rows", items.len() - TABLE_MAX_ROWS));
    }
    Some(out)
}

fn render_cell(value: &Value) -> String {
    let rendered = match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    if rendered.chars().count() > 60 {
        let head: String = rendered.chars().take(57).collect();
        format!("{head}...")
    } else {
        rendered
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{format_table, infer_resource_type, Confirmation};

    #[test]
    fn confirmation_levels_are_ordered() {
        assert!(Confirmation::DoubleConfirmed > Confirmation::Confirmed);
        assert!(Confirmation::Confirmed > Confirmation::None);
        assert_eq!(Confirmation::default(), Confirmation::None);
    }

    #[test]
    fn resource_type_comes_from_operation_name() {
        assert_eq!(infer_resource_type("list_buckets"), "buckets");
        assert_eq!(infer_resource_type("terminate_instances"), "instances");
        assert_eq!(infer_resource_type("assume_role"), "assume_role");
    }

    #[test]
    fn table_caps_rows_and_columns() {
        let items: Vec<_> = (0..60)
            .map(|i| {
                json!({
                    "A": i, "B": i, "C": i, "D": i, "E": i, "F": i, "G": i, "H": i,
                })
            })
            .collect();
        let table = format_table(&items).expect("table");
        assert!(table.contains("... and 10 more rows"));
        let header = table.lines().next().expect("header");
        assert_eq!(header.matches('|').count(), 7, "six columns plus borders");
    }

    #[test]
    fn non_object_items_get_no_table() {
        assert!(format_table(&[json!("plain string")]).is_none());
        assert!(format_table(&[]).is_none());
    }
}
