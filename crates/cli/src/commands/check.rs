//! Dry run of the gate's front half: parse, validate, evaluate. Nothing is
//! executed; the output is the decision the engine would act on.

use std::sync::Arc;

use serde_json::json;

use cloudgate_core::engine::confirmation_message;
use cloudgate_core::intent::rules::DEFAULT_OPERATIONS;
use cloudgate_core::{
    GateConfig, InMemoryCatalog, IntentClassifier, LoadOptions, OperationSpec, SafetyEnforcer,
    SafetyMode, SchemaValidator,
};

use super::CommandResult;

pub fn run(request: &str, mode: Option<SafetyMode>) -> CommandResult {
    let mut config = match GateConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure("check", "config", json!(error.to_string()), 2)
        }
    };
    if let Some(mode) = mode {
        config.safety.mode = mode;
    }

    let classifier = IntentClassifier::new();
    let parsed = classifier.classify(request);
    let Some(command) = parsed.command else {
        let payload = json!({
            "message": parsed.error,
            "suggestions": parsed.suggestions,
        });
        return CommandResult::failure("check", "parse", payload, 1);
    };

    let validator = SchemaValidator::new(Arc::new(known_operations_catalog()));
    let validation = validator.validate(&command.service, &command.operation, &command.parameters);

    let enforcer = SafetyEnforcer::new(config.safety.clone());
    let decision = enforcer.evaluate(&command.service, &command.operation, &command.parameters);

    let prompt = (decision.requires_confirmation || decision.requires_double_confirmation)
        .then(|| confirmation_message(&command, &decision));

    let payload = json!({
        "mode": config.safety.mode,
        "resolved": {
            "service": command.service,
            "operation": command.operation,
            "category": command.category,
            "parameters": command.parameters,
            "region": command.region,
            "confidence": command.confidence,
        },
        "validation": {
            "valid": validation.valid,
            "errors": validation.errors,
            "warnings": validation.warnings,
        },
        "decision": decision,
        "confirmation_prompt": prompt,
    });
    CommandResult::ok("check", payload)
}

/// Catalog of the well-known operations the intent rules can resolve to.
/// Execution surfaces load real schemas; the CLI only needs names.
fn known_operations_catalog() -> InMemoryCatalog {
    let mut catalog = InMemoryCatalog::new();
    for (service, operations) in DEFAULT_OPERATIONS {
        for (_, operation) in operations.iter() {
            let paginated =
                operation.starts_with("list_") || operation.starts_with("describe_");
            catalog.register(
                *service,
                *operation,
                OperationSpec { paginated, ..OperationSpec::default() },
            );
        }
    }
    catalog
}
