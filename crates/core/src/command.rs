//! Value objects shared across the command pipeline.
//!
//! Everything here is created and consumed within the scope of a single
//! request; nothing is persisted.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Impact category of a provider operation.
///
/// Severity is totally ordered `Read < Write < Destructive`. `Blocked` is an
/// absolute override applied by the denylist, independent of the other three.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum OperationCategory {
    Read,
    Write,
    Destructive,
    Blocked,
}

impl OperationCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
            Self::Destructive => "destructive",
            Self::Blocked => "blocked",
        }
    }
}

impl std::fmt::Display for OperationCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Policy level controlling which operation categories may execute.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SafetyMode {
    /// Only read operations.
    ReadOnly,
    /// All categories, mutations require confirmation.
    Standard,
    /// All categories. The denylist still applies.
    Unrestricted,
}

impl SafetyMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ReadOnly => "read_only",
            Self::Standard => "standard",
            Self::Unrestricted => "unrestricted",
        }
    }
}

impl std::fmt::Display for SafetyMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SafetyMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "read_only" | "readonly" => Ok(Self::ReadOnly),
            "standard" => Ok(Self::Standard),
            "unrestricted" => Ok(Self::Unrestricted),
            other => Err(format!(
                "unsupported safety mode `{other}` (expected read_only|standard|unrestricted)"
            )),
        }
    }
}

/// A fully resolved request against the provider control plane.
///
/// `service` and `operation` are lower-cased identifiers. `category` must
/// equal `classify(service, operation)` unless the caller deliberately
/// overrides it for an already-validated command.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StructuredCommand {
    pub service: String,
    pub operation: String,
    #[serde(default)]
    pub parameters: Map<String, Value>,
    pub category: OperationCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_input: Option<String>,
    #[serde(default = "full_confidence")]
    pub confidence: f64,
}

fn full_confidence() -> f64 {
    1.0
}

impl StructuredCommand {
    pub fn new(
        service: impl Into<String>,
        operation: impl Into<String>,
        parameters: Map<String, Value>,
        category: OperationCategory,
    ) -> Self {
        Self {
            service: service.into().to_ascii_lowercase(),
            operation: operation.into().to_ascii_lowercase(),
            parameters,
            category,
            region: None,
            raw_input: None,
            confidence: 1.0,
        }
    }

    /// Fully qualified key used by denylist and audit lookups.
    pub fn operation_key(&self) -> String {
        format!("{}.{}", self.service, self.operation)
    }
}

/// Detected verb phrase, the first stage of free-text classification.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParsedIntent {
    pub intent_type: String,
    pub confidence: f64,
}

/// Identified target service with the keywords that matched.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParsedService {
    pub service_name: String,
    pub display_name: String,
    pub confidence: f64,
    pub matched_keywords: Vec<String>,
}

/// Resolved operation name, possibly a low-confidence guess.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParsedOperation {
    pub operation_name: String,
    pub category: OperationCategory,
    pub confidence: f64,
    #[serde(default)]
    pub suggested_alternatives: Vec<String>,
}

/// A scalar parameter extracted from free text.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParsedParameter {
    pub name: String,
    pub value: Value,
}

/// Outcome of classifying a free-text query.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParseResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<StructuredCommand>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub suggestions: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intent: Option<ParsedIntent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<ParsedService>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation: Option<ParsedOperation>,
}

impl ParseResult {
    pub fn parsed(
        command: StructuredCommand,
        intent: ParsedIntent,
        service: ParsedService,
        operation: ParsedOperation,
    ) -> Self {
        Self {
            success: true,
            command: Some(command),
            error: None,
            suggestions: Vec::new(),
            intent: Some(intent),
            service: Some(service),
            operation: Some(operation),
        }
    }

    pub fn failed(error: impl Into<String>, suggestions: Vec<String>) -> Self {
        Self {
            success: false,
            command: None,
            error: Some(error.into()),
            suggestions,
            intent: None,
            service: None,
            operation: None,
        }
    }
}

/// Outcome of checking a command against the service schema.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(default)]
    pub missing_required: Vec<String>,
    #[serde(default)]
    pub suggestions: Vec<String>,
}

impl ValidationResult {
    pub fn valid(warnings: Vec<String>) -> Self {
        Self { valid: true, warnings, ..Self::default() }
    }

    pub fn invalid(errors: Vec<String>, suggestions: Vec<String>) -> Self {
        Self { valid: false, errors, suggestions, ..Self::default() }
    }
}
