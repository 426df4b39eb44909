//! Operation risk classification.
//!
//! Pure and deterministic: the same `(service, operation)` pair always yields
//! the same category, so callers may cache results freely.

use crate::command::OperationCategory;

const READ_PREFIXES: &[&str] = &[
    "list",
    "describe",
    "get",
    "batch_get",
    "scan",
    "query",
    "head",
    "check",
    "lookup",
    "search",
    "filter",
    "poll",
];

const WRITE_PREFIXES: &[&str] = &[
    "create",
    "put",
    "update",
    "modify",
    "set",
    "tag",
    "untag",
    "enable",
    "disable",
    "start",
    "stop",
    "attach",
    "detach",
    "associate",
    "disassociate",
    "register",
    "add",
    "import",
    "copy",
    "restore",
    "reboot",
    "reset",
    "renew",
];

const DESTRUCTIVE_PREFIXES: &[&str] = &[
    "delete",
    "terminate",
    "destroy",
    "remove",
    "deregister",
    "revoke",
    "cancel",
    "purge",
    "release",
    "deprecate",
];

/// Overrides for operations whose names lie about their impact, plus
/// explicitly destructive operations pinned regardless of prefix drift.
fn override_for(service: &str, operation: &str) -> Option<OperationCategory> {
    use OperationCategory::{Destructive, Read, Write};

    Some(match (service, operation) {
        // Looks like a read, is a write.
        ("logs", "put_log_events") => Write,
        ("kinesis", "put_record") | ("kinesis", "put_records") => Write,
        ("firehose", "put_record") | ("firehose", "put_record_batch") => Write,
        // Looks like a write, is a read.
        ("logs", "filter_log_events") | ("logs", "get_log_events") => Read,
        ("cloudwatch", "get_metric_data") | ("cloudwatch", "get_metric_statistics") => Read,
        // Pinned destructive.
        ("ec2", "terminate_instances") => Destructive,
        ("autoscaling", "terminate_instance_in_auto_scaling_group") => Destructive,
        ("ecs", "deregister_container_instance") => Destructive,
        ("ecs", "deregister_task_definition") => Destructive,
        ("lambda", "delete_function") => Destructive,
        ("s3", "delete_object") | ("s3", "delete_objects") | ("s3", "delete_bucket") => {
            Destructive
        }
        ("dynamodb", "delete_table") | ("dynamodb", "delete_item") => Destructive,
        ("rds", "delete_db_instance") | ("rds", "delete_db_cluster") => Destructive,
        _ => return None,
    })
}

/// Operations that accept the provider's dry-run flag.
const EC2_DRY_RUN_OPERATIONS: &[&str] = &[
    "run_instances",
    "start_instances",
    "stop_instances",
    "terminate_instances",
    "create_security_group",
    "delete_security_group",
    "authorize_security_group_ingress",
    "authorize_security_group_egress",
    "revoke_security_group_ingress",
    "revoke_security_group_egress",
    "create_vpc",
    "delete_vpc",
    "create_subnet",
    "delete_subnet",
    "create_internet_gateway",
    "delete_internet_gateway",
    "attach_internet_gateway",
    "detach_internet_gateway",
    "create_nat_gateway",
    "delete_nat_gateway",
    "create_route_table",
    "delete_route_table",
    "create_route",
    "delete_route",
    "create_volume",
    "delete_volume",
    "attach_volume",
    "detach_volume",
    "create_snapshot",
    "delete_snapshot",
    "create_image",
    "deregister_image",
    "create_key_pair",
    "delete_key_pair",
    "import_key_pair",
    "create_launch_template",
    "delete_launch_template",
    "modify_instance_attribute",
    "modify_volume",
];

/// Classify an operation by its impact.
///
/// Override table first, then prefixes in strict priority order
/// `destructive > write > read`. Anything unrecognized defaults to `Write`:
/// an unclassified operation must never be treated as safe.
pub fn classify(service: &str, operation: &str) -> OperationCategory {
    let service = service.to_ascii_lowercase();
    let operation = operation.to_ascii_lowercase();

    if let Some(category) = override_for(&service, &operation) {
        return category;
    }

    if DESTRUCTIVE_PREFIXES.iter().any(|prefix| operation.starts_with(prefix)) {
        return OperationCategory::Destructive;
    }
    if WRITE_PREFIXES.iter().any(|prefix| operation.starts_with(prefix)) {
        return OperationCategory::Write;
    }
    if READ_PREFIXES.iter().any(|prefix| operation.starts_with(prefix)) {
        return OperationCategory::Read;
    }

    OperationCategory::Write
}

/// Whether the operation supports the provider's dry-run flag.
pub fn supports_dry_run(service: &str, operation: &str) -> bool {
    let operation = operation.to_ascii_lowercase();
    match service.to_ascii_lowercase().as_str() {
        "ec2" => EC2_DRY_RUN_OPERATIONS.contains(&operation.as_str()),
        _ => false,
    }
}

pub fn category_description(category: OperationCategory) -> &'static str {
    match category {
        OperationCategory::Read => "Read-only operation that doesn't modify resources",
        OperationCategory::Write => "Write operation that creates or modifies resources",
        OperationCategory::Destructive => {
            "Destructive operation that deletes or terminates resources"
        }
        OperationCategory::Blocked => "Operation that is blocked for security reasons",
    }
}

#[cfg(test)]
mod tests {
    use super::{classify, supports_dry_run};
    use crate::command::OperationCategory;

    #[test]
    fn overrides_win_over_prefixes() {
        // `put_log_events` has a write prefix but so does the override; the
        // interesting cases are the ones where the prefix disagrees.
        assert_eq!(classify("logs", "filter_log_events"), OperationCategory::Read);
        assert_eq!(classify("cloudwatch", "get_metric_data"), OperationCategory::Read);
        assert_eq!(classify("ec2", "terminate_instances"), OperationCategory::Destructive);
        assert_eq!(
            classify("ecs", "deregister_task_definition"),
            OperationCategory::Destructive
        );
    }

    #[test]
    fn destructive_prefix_dominates_write_prefix() {
        // "deregister" would also match the write prefix "de..." family;
        // destructive is checked first.
        assert_eq!(classify("elbv2", "deregister_targets"), OperationCategory::Destructive);
        assert_eq!(classify("kms", "revoke_grant"), OperationCategory::Destructive);
        assert_eq!(classify("ec2", "release_address"), OperationCategory::Destructive);
    }

    #[test]
    fn read_prefixes_classify_as_read() {
        assert_eq!(classify("s3", "list_buckets"), OperationCategory::Read);
        assert_eq!(classify("ec2", "describe_instances"), OperationCategory::Read);
        assert_eq!(classify("dynamodb", "batch_get_item"), OperationCategory::Read);
        assert_eq!(classify("s3", "head_object"), OperationCategory::Read);
    }

    #[test]
    fn unknown_prefix_defaults_to_write() {
        assert_eq!(classify("ec2", "monitor_instances"), OperationCategory::Write);
        assert_eq!(classify("sts", "assume_role"), OperationCategory::Write);
        assert_eq!(classify("ec2", "unmonitor_instances"), OperationCategory::Write);
    }

    #[test]
    fn classification_is_case_insensitive() {
        assert_eq!(classify("S3", "List_Buckets"), OperationCategory::Read);
        assert_eq!(classify("EC2", "TERMINATE_INSTANCES"), OperationCategory::Destructive);
    }

    #[test]
    fn dry_run_table_is_service_scoped() {
        assert!(supports_dry_run("ec2", "terminate_instances"));
        assert!(supports_dry_run("EC2", "create_vpc"));
        assert!(!supports_dry_run("ec2", "describe_instances"));
        assert!(!supports_dry_run("s3", "delete_bucket"));
    }
}
