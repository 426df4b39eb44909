//! Command-level tests exercising the CLI output contracts.

use serde_json::Value;

use cloudgate_cli::commands::{check, classify, denylist};
use cloudgate_core::SafetyMode;

fn parse_output(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be JSON")
}

#[test]
fn classify_reports_category_and_flags() {
    let result = classify::run("EC2", "Terminate_Instances");
    assert_eq!(result.exit_code, 0);
    let payload = parse_output(&result.output);
    assert_eq!(payload["category"], "destructive");
    assert_eq!(payload["blocked"], false);
    assert_eq!(payload["requires_double_confirmation"], true);
    assert_eq!(payload["supports_dry_run"], true);
}

#[test]
fn classify_reports_blocked_operations() {
    let result = classify::run("cloudtrail", "delete_trail");
    let payload = parse_output(&result.output);
    assert_eq!(payload["blocked"], true);
    assert!(payload["block_reason"]
        .as_str()
        .unwrap_or_default()
        .contains("security monitoring or audit"));
}

#[test]
fn denylist_lists_every_entry_with_a_reason() {
    let result = denylist::run();
    assert_eq!(result.exit_code, 0);
    let payload = parse_output(&result.output);
    let entries = payload["entries"].as_array().expect("entries array");
    assert_eq!(payload["count"].as_u64().map(|n| n as usize), Some(entries.len()));
    assert!(entries.iter().all(|entry| entry["reason"].is_string()));
}

#[test]
fn check_resolves_a_read_request_without_executing() {
    let result = check::run("list s3 buckets", Some(SafetyMode::ReadOnly));
    assert_eq!(result.exit_code, 0);
    let payload = parse_output(&result.output);
    assert_eq!(payload["resolved"]["service"], "s3");
    assert_eq!(payload["resolved"]["operation"], "list_buckets");
    assert_eq!(payload["decision"]["allowed"], true);
    assert_eq!(payload["confirmation_prompt"], Value::Null);
}

#[test]
fn check_extracts_parameters_into_the_resolved_command() {
    let result =
        check::run("describe ec2 instance i-1234567890abcdef0 in us-west-2", Some(SafetyMode::ReadOnly));
    let payload = parse_output(&result.output);
    assert_eq!(payload["resolved"]["operation"], "describe_instances");
    assert_eq!(payload["resolved"]["region"], "us-west-2");
    assert_eq!(payload["resolved"]["parameters"]["InstanceIds"][0], "i-1234567890abcdef0");
}

#[test]
fn check_rejects_unparseable_input_with_examples() {
    let result = check::run("frobnicate the bazzle", None);
    assert_eq!(result.exit_code, 1);
    let payload = parse_output(&result.output);
    assert_eq!(payload["error_class"], "parse");
    assert!(!payload["suggestions"].as_array().expect("suggestions").is_empty());
}
