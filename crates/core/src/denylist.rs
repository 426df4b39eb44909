//! The hard boundary of the system.
//!
//! Operations listed here are never permitted, regardless of safety mode.
//! Every other policy layer (mode, confirmation, blast radius) can be
//! escalated past by the caller; this set cannot. Membership is exact-match
//! on the fully qualified `service.operation` key, never pattern-based.

use serde::{Deserialize, Serialize};

/// Never allowed. Disabling audit or security monitoring, destroying
/// encryption keys or backups, altering organization membership, opening
/// storage to public access.
const DENYLIST: &[&str] = &[
    // IAM account-level configuration
    "iam.delete_account_alias",
    "iam.delete_account_password_policy",
    "iam.update_account_password_policy",
    "iam.create_account_alias",
    "iam.delete_service_linked_role",
    "iam.delete_saml_provider",
    "iam.delete_open_id_connect_provider",
    "iam.generate_credential_report",
    // Organizations
    "organizations.leave_organization",
    "organizations.delete_organization",
    "organizations.remove_account_from_organization",
    "organizations.close_account",
    "organizations.delete_organizational_unit",
    // CloudTrail audit logging
    "cloudtrail.delete_trail",
    "cloudtrail.stop_logging",
    "cloudtrail.update_trail",
    "cloudtrail.delete_event_data_store",
    // GuardDuty security monitoring
    "guardduty.delete_detector",
    "guardduty.disable_organization_admin_account",
    "guardduty.disassociate_from_administrator_account",
    "guardduty.disassociate_members",
    "guardduty.delete_members",
    // Config compliance recording
    "config.delete_configuration_recorder",
    "config.stop_configuration_recorder",
    "config.delete_delivery_channel",
    // SecurityHub
    "securityhub.disable_security_hub",
    "securityhub.delete_insight",
    "securityhub.disable_import_findings_for_product",
    // KMS
    "kms.schedule_key_deletion",
    "kms.disable_key",
    "kms.delete_alias",
    "kms.delete_imported_key_material",
    // S3 account and bucket security settings
    "s3control.delete_public_access_block",
    "s3control.put_public_access_block",
    "s3.delete_bucket_policy",
    "s3.put_bucket_policy",
    "s3.put_bucket_acl",
    "s3.delete_bucket_encryption",
    "s3.put_public_access_block",
    "s3.delete_public_access_block",
    // EC2 flow logs and default networking
    "ec2.delete_flow_logs",
    "ec2.delete_default_vpc",
    "ec2.delete_default_subnet",
    // RDS snapshots and backups
    "rds.delete_db_cluster_snapshot",
    "rds.delete_db_snapshot",
    "rds.delete_db_instance_automated_backup",
    "rds.modify_db_cluster",
    // Backup
    "backup.delete_backup_vault",
    "backup.delete_backup_plan",
    "backup.delete_recovery_point",
    // Route 53 / domains
    "route53.delete_hosted_zone",
    "route53domains.delete_domain",
    "route53domains.transfer_domain_to_another_aws_account",
    // ACM
    "acm.delete_certificate",
    // Secrets Manager
    "secretsmanager.delete_secret",
    // Cost and billing
    "ce.delete_cost_category_definition",
    "budgets.delete_budget",
    "cur.delete_report_definition",
    // Service Quotas
    "service-quotas.delete_service_quota_increase_request_from_template",
    // SSO / Identity Center
    "sso-admin.delete_instance",
    "sso-admin.delete_permission_set",
    "identitystore.delete_user",
    "identitystore.delete_group",
    // RAM
    "ram.delete_resource_share",
    "ram.disassociate_resource_share",
    // Service Catalog
    "servicecatalog.delete_portfolio",
    "servicecatalog.delete_product",
    // Control Tower
    "controltower.disable_control",
    "controltower.delete_landing_zone",
];

/// Allowed, but require explicit double confirmation even in unrestricted
/// mode.
const DOUBLE_CONFIRM: &[&str] = &[
    "ec2.terminate_instances",
    "rds.delete_db_instance",
    "rds.delete_db_cluster",
    "dynamodb.delete_table",
    "s3.delete_bucket",
    "lambda.delete_function",
    "ecs.delete_cluster",
    "eks.delete_cluster",
    "cloudformation.delete_stack",
    "elasticbeanstalk.terminate_environment",
];

/// Allowed, but flagged with a warning in the safety decision.
const WARN: &[&str] = &[
    "iam.attach_role_policy",
    "iam.attach_user_policy",
    "iam.put_role_policy",
    "iam.put_user_policy",
    "iam.create_access_key",
    "ec2.authorize_security_group_ingress",
    "ec2.authorize_security_group_egress",
    "s3.put_bucket_versioning",
    "rds.modify_db_instance",
    "lambda.update_function_configuration",
];

/// Why a denylisted operation is blocked. Gives the caller an actionable
/// message instead of a bare denial.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockReason {
    AuditDisabling,
    IdentityEscalation,
    Organization,
    EncryptionDestructive,
    BackupDestructive,
    StorageSecurity,
    DnsCritical,
    SecurityPolicy,
}

impl BlockReason {
    pub fn message(&self) -> &'static str {
        match self {
            Self::AuditDisabling => {
                "This operation could disable security monitoring or audit logging"
            }
            Self::IdentityEscalation => {
                "This operation could affect account-level identity configuration"
            }
            Self::Organization => "This operation could affect your organization structure",
            Self::EncryptionDestructive => {
                "This operation could permanently destroy encryption keys"
            }
            Self::BackupDestructive => "This operation could destroy backup data",
            Self::StorageSecurity => {
                "This operation could change storage bucket security settings"
            }
            Self::DnsCritical => "This operation could affect DNS configuration",
            Self::SecurityPolicy => "This operation is blocked for security reasons",
        }
    }
}

impl std::fmt::Display for BlockReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

/// The full denylist, for display surfaces.
pub fn entries() -> &'static [&'static str] {
    DENYLIST
}

fn operation_key(service: &str, operation: &str) -> String {
    format!("{}.{}", service.to_ascii_lowercase(), operation.to_ascii_lowercase())
}

pub fn is_blocked(service: &str, operation: &str) -> bool {
    DENYLIST.contains(&operation_key(service, operation).as_str())
}

pub fn requires_double_confirmation(service: &str, operation: &str) -> bool {
    DOUBLE_CONFIRM.contains(&operation_key(service, operation).as_str())
}

pub fn should_warn(service: &str, operation: &str) -> bool {
    WARN.contains(&operation_key(service, operation).as_str())
}

/// Classified reason for a blocked operation, `None` if it is not blocked.
pub fn block_reason(service: &str, operation: &str) -> Option<BlockReason> {
    let key = operation_key(service, operation);
    if !DENYLIST.contains(&key.as_str()) {
        return None;
    }

    let reason = if key.starts_with("cloudtrail.")
        || key.starts_with("guardduty.")
        || key.starts_with("config.")
        || key.starts_with("securityhub.")
        || key == "ec2.delete_flow_logs"
    {
        BlockReason::AuditDisabling
    } else if key.starts_with("iam.") || key.starts_with("sso-admin.") || key.starts_with("identitystore.")
    {
        BlockReason::IdentityEscalation
    } else if key.starts_with("organizations.") {
        BlockReason::Organization
    } else if key.starts_with("kms.") {
        BlockReason::EncryptionDestructive
    } else if key.starts_with("backup.") || key.contains("snapshot") || key.contains("automated_backup")
    {
        BlockReason::BackupDestructive
    } else if key.starts_with("s3") && (key.contains("policy") || key.contains("acl") || key.contains("public"))
    {
        BlockReason::StorageSecurity
    } else if key.starts_with("route53") {
        BlockReason::DnsCritical
    } else {
        BlockReason::SecurityPolicy
    };

    Some(reason)
}
