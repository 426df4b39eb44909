use serde_json::json;

use cloudgate_core::denylist;

use super::CommandResult;

pub fn run() -> CommandResult {
    let entries: Vec<_> = denylist::entries()
        .iter()
        .map(|key| {
            let (service, operation) = key.split_once('.').unwrap_or((key, ""));
            json!({
                "operation": key,
                "reason": denylist::block_reason(service, operation).map(|r| r.message()),
            })
        })
        .collect();

    let payload = json!({
        "count": entries.len(),
        "entries": entries,
    });
    CommandResult::ok("denylist", payload)
}
