//! Provider error taxonomy.
//!
//! Raw provider error codes are an open, inconsistent set. This module
//! folds them into a small fixed taxonomy with a remediation hint and a
//! retry policy per code, so callers never branch on raw code strings.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::pagination::ProviderError;

/// Normalized failure class.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Credentials missing, expired, or lacking permission.
    Auth,
    /// The named resource does not exist.
    Resource,
    /// The request itself is malformed.
    Validation,
    /// Throttled; retry after a delay.
    RateLimit,
    /// The provider side is unhealthy.
    Service,
    /// An account quota or service limit was hit.
    Limit,
    /// The resource is in a state that rejects the operation.
    Conflict,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Auth => "auth",
            Self::Resource => "resource",
            Self::Validation => "validation",
            Self::RateLimit => "rate_limit",
            Self::Service => "service",
            Self::Limit => "limit",
            Self::Conflict => "conflict",
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Taxonomy entry for one provider error code.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ErrorInfo {
    pub category: ErrorCategory,
    pub suggestion: &'static str,
    pub recoverable: bool,
    pub retry_after_seconds: Option<u64>,
}

const fn entry(category: ErrorCategory, suggestion: &'static str) -> ErrorInfo {
    ErrorInfo { category, suggestion, recoverable: false, retry_after_seconds: None }
}

const fn retryable(
    category: ErrorCategory,
    suggestion: &'static str,
    after: u64,
) -> ErrorInfo {
    ErrorInfo { category, suggestion, recoverable: true, retry_after_seconds: Some(after) }
}

/// Taxonomy lookup by raw provider error code. Unknown codes map to
/// [`ErrorCategory::Service`] with no retry.
pub fn lookup(code: &str) -> ErrorInfo {
    match code {
        // Auth
        "AccessDenied" | "AccessDeniedException" | "UnauthorizedOperation" => entry(
            ErrorCategory::Auth,
            "Check that your credentials have permission for this operation",
        ),
        "ExpiredToken" | "ExpiredTokenException" | "TokenRefreshRequired" => entry(
            ErrorCategory::Auth,
            "Your session has expired; refresh your credentials and try again",
        ),
        "InvalidClientTokenId" | "UnrecognizedClientException" | "AuthFailure" => entry(
            ErrorCategory::Auth,
            "The configured credentials were not recognized; verify the active profile",
        ),
        "SignatureDoesNotMatch" => entry(
            ErrorCategory::Auth,
            "Request signing failed; verify the secret key for the active profile",
        ),

        // Resource
        "ResourceNotFoundException"
        | "NoSuchEntity"
        | "NotFoundException"
        | "NoSuchHostedZone"
        | "DBInstanceNotFound"
        | "InvalidInstanceID.NotFound" => entry(
            ErrorCategory::Resource,
            "Verify the resource identifier and that you are in the right region",
        ),
        "NoSuchBucket" => entry(
            ErrorCategory::Resource,
            "The bucket does not exist; check the name and the bucket's region",
        ),
        "NoSuchKey" => entry(
            ErrorCategory::Resource,
            "The object key does not exist in this bucket",
        ),

        // Validation
        "ValidationException" | "ValidationError" | "InvalidParameterValue"
        | "InvalidParameterCombination" | "MissingParameter" | "MalformedQueryString"
        | "InvalidInput" => entry(
            ErrorCategory::Validation,
            "One or more request parameters are invalid; check the operation's input shape",
        ),

        // Rate limits
        "Throttling" | "ThrottlingException" | "TooManyRequestsException"
        | "ProvisionedThroughputExceededException" => {
            retryable(ErrorCategory::RateLimit, "Request rate exceeded; retry after a short delay", 5)
        }
        "RequestLimitExceeded" => {
            retryable(ErrorCategory::RateLimit, "API request limit exceeded; back off and retry", 10)
        }

        // Service health
        "ServiceUnavailable" | "ServiceUnavailableException" | "InternalError"
        | "InternalFailure" | "InternalServerError" => retryable(
            ErrorCategory::Service,
            "The service is temporarily unavailable; retry later",
            30,
        ),

        // Quotas
        "LimitExceededException" | "LimitExceeded" | "QuotaExceededException"
        | "ServiceQuotaExceededException" => entry(
            ErrorCategory::Limit,
            "An account quota was reached; delete unused resources or request a limit increase",
        ),

        // State conflicts
        "ResourceInUseException" | "ResourceInUse" | "IncorrectInstanceState"
        | "InvalidDBInstanceState" => retryable(
            ErrorCategory::Conflict,
            "The resource is busy or in a conflicting state; wait and retry",
            10,
        ),
        "ConditionalCheckFailedException" => entry(
            ErrorCategory::Conflict,
            "A conditional check failed; the item state did not match the condition",
        ),
        "ResourceAlreadyExistsException" | "AlreadyExistsException" | "EntityAlreadyExists"
        | "BucketAlreadyExists" | "BucketAlreadyOwnedByYou" => entry(
            ErrorCategory::Conflict,
            "A resource with this name already exists; pick a different name",
        ),

        _ => entry(
            ErrorCategory::Service,
            "Unrecognized provider error; inspect the raw code and message",
        ),
    }
}

/// A provider failure after taxonomy normalization. This is what execution
/// surfaces; the raw code is preserved for operators.
#[derive(Clone, Debug, Error, PartialEq, Serialize, Deserialize)]
#[error("{service}.{operation} failed ({code}): {message}")]
pub struct ExecutionError {
    pub service: String,
    pub operation: String,
    pub code: String,
    pub message: String,
    pub category: ErrorCategory,
    pub suggestion: String,
    pub recoverable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_seconds: Option<u64>,
}

/// Fold a raw provider error into the taxonomy.
pub fn normalize(service: &str, operation: &str, err: ProviderError) -> ExecutionError {
    let info = lookup(&err.code);
    ExecutionError {
        service: service.to_string(),
        operation: operation.to_string(),
        code: err.code,
        message: err.message,
        category: info.category,
        suggestion: info.suggestion.to_string(),
        recoverable: info.recoverable,
        retry_after_seconds: info.retry_after_seconds,
    }
}

pub fn should_retry(err: &ExecutionError) -> bool {
    err.recoverable
}

/// Suggested wait before retrying, for recoverable errors only.
pub fn retry_delay(err: &ExecutionError) -> Option<std::time::Duration> {
    err.recoverable
        .then(|| err.retry_after_seconds.map(std::time::Duration::from_secs))
        .flatten()
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{lookup, normalize, retry_delay, should_retry, ErrorCategory};
    use crate::pagination::ProviderError;

    #[test]
    fn auth_codes_are_not_retryable() {
        let info = lookup("AccessDenied");
        assert_eq!(info.category, ErrorCategory::Auth);
        assert!(!info.recoverable);
        assert_eq!(info.retry_after_seconds, None);
    }

    #[test]
    fn throttling_maps_to_rate_limit_with_delay() {
        let info = lookup("ThrottlingException");
        assert_eq!(info.category, ErrorCategory::RateLimit);
        assert!(info.recoverable);
        assert_eq!(info.retry_after_seconds, Some(5));

        assert_eq!(lookup("RequestLimitExceeded").retry_after_seconds, Some(10));
        assert_eq!(lookup("ServiceUnavailable").retry_after_seconds, Some(30));
    }

    #[test]
    fn unknown_codes_fall_back_to_service_category() {
        let info = lookup("SomethingEntirelyNovel");
        assert_eq!(info.category, ErrorCategory::Service);
        assert!(!info.recoverable);
    }

    #[test]
    fn quota_and_conflict_are_distinct_categories() {
        assert_eq!(lookup("LimitExceededException").category, ErrorCategory::Limit);
        assert_eq!(
            lookup("ConditionalCheckFailedException").category,
            ErrorCategory::Conflict
        );
        assert_eq!(lookup("ResourceInUseException").category, ErrorCategory::Conflict);
    }

    #[test]
    fn normalize_preserves_raw_code_and_message() {
        let err = normalize(
            "s3",
            "list_objects_v2",
            ProviderError::new("NoSuchBucket", "The specified bucket does not exist"),
        );
        assert_eq!(err.code, "NoSuchBucket");
        assert_eq!(err.category, ErrorCategory::Resource);
        assert!(err.suggestion.contains("bucket"));
        assert!(!should_retry(&err));
        assert_eq!(retry_delay(&err), None);
    }

    #[test]
    fn retry_delay_comes_from_taxonomy() {
        let err = normalize("ec2", "describe_instances", ProviderError::new("Throttling", "slow down"));
        assert!(should_retry(&err));
        assert_eq!(retry_delay(&err), Some(Duration::from_secs(5)));
    }
}
