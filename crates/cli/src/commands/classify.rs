use serde_json::json;

use cloudgate_core::{category_description, classify, denylist, supports_dry_run};

use super::CommandResult;

pub fn run(service: &str, operation: &str) -> CommandResult {
    let category = classify(service, operation);
    let block_reason = denylist::block_reason(service, operation);

    let payload = json!({
        "service": service.to_ascii_lowercase(),
        "operation": operation.to_ascii_lowercase(),
        "category": category,
        "description": category_description(category),
        "blocked": block_reason.is_some(),
        "block_reason": block_reason.map(|reason| reason.message()),
        "requires_double_confirmation": denylist::requires_double_confirmation(service, operation),
        "warning": denylist::should_warn(service, operation),
        "supports_dry_run": supports_dry_run(service, operation),
    });
    CommandResult::ok("classify", payload)
}
