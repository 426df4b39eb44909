pub mod check;
pub mod classify;
pub mod config;
pub mod denylist;

use serde_json::{json, Map, Value};

/// Outcome of one subcommand: a JSON line for stdout plus the process exit
/// code.
#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

impl CommandResult {
    pub fn ok(command: &str, payload: Value) -> Self {
        Self { exit_code: 0, output: envelope(command, "ok", None, payload) }
    }

    pub fn failure(command: &str, error_class: &str, payload: Value, exit_code: u8) -> Self {
        Self { exit_code, output: envelope(command, "error", Some(error_class), payload) }
    }
}

/// Stamp the shared envelope fields, then splice in the payload. A
/// non-object payload becomes the `message` field.
fn envelope(command: &str, status: &str, error_class: Option<&str>, payload: Value) -> String {
    let mut body = Map::new();
    body.insert("command".to_string(), json!(command));
    body.insert("status".to_string(), json!(status));
    if let Some(class) = error_class {
        body.insert("error_class".to_string(), json!(class));
    }
    match payload {
        Value::Object(fields) => body.extend(fields),
        Value::Null => {}
        other => {
            body.insert("message".to_string(), other);
        }
    }
    Value::Object(body).to_string()
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use super::CommandResult;

    #[test]
    fn ok_envelope_carries_command_and_payload() {
        let result = CommandResult::ok("classify", json!({ "category": "read" }));
        assert_eq!(result.exit_code, 0);
        let parsed: Value = serde_json::from_str(&result.output).unwrap();
        assert_eq!(parsed["command"], "classify");
        assert_eq!(parsed["status"], "ok");
        assert_eq!(parsed["category"], "read");
        assert!(parsed.get("error_class").is_none());
    }

    #[test]
    fn failure_envelope_carries_error_class_and_exit_code() {
        let result = CommandResult::failure("check", "parse", json!("no intent matched"), 1);
        assert_eq!(result.exit_code, 1);
        let parsed: Value = serde_json::from_str(&result.output).unwrap();
        assert_eq!(parsed["status"], "error");
        assert_eq!(parsed["error_class"], "parse");
        assert_eq!(parsed["message"], "no intent matched");
    }
}
