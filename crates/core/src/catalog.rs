//! Service schema catalog and command validation.
//!
//! The catalog is an external, versioned description of the provider's
//! operation surface. The core only consumes it through the
//! [`ServiceCatalog`] trait; [`InMemoryCatalog`] is an explicit registry
//! built once at startup (and the workhorse for tests).

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::command::ValidationResult;

/// Primitive parameter types understood by the schema source.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamType {
    String,
    Integer,
    Long,
    Boolean,
    List,
    Map,
    Structure,
    Blob,
    Timestamp,
    Float,
    Double,
}

impl ParamType {
    /// Loose structural check against a JSON value. Unknown combinations are
    /// permissive; schemas evolve faster than this table.
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            Self::String | Self::Blob => value.is_string(),
            Self::Integer | Self::Long => value.is_i64() || value.is_u64(),
            Self::Float | Self::Double => value.is_number(),
            Self::Boolean => value.is_boolean(),
            Self::List => value.is_array(),
            Self::Map | Self::Structure => value.is_object(),
            Self::Timestamp => value.is_string() || value.is_number(),
        }
    }
}

/// Input shape of one operation: required parameter names plus the typed
/// member table.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputShape {
    #[serde(default)]
    pub required: Vec<String>,
    #[serde(default)]
    pub members: BTreeMap<String, ParamType>,
}

/// External schema source for the provider's operations.
pub trait ServiceCatalog: Send + Sync {
    fn service_exists(&self, service: &str) -> bool;
    fn list_services(&self) -> Vec<String>;
    fn list_operations(&self, service: &str) -> Vec<String>;
    fn input_shape(&self, service: &str, operation: &str) -> Option<InputShape>;
    fn supports_pagination(&self, service: &str, operation: &str) -> bool;
    /// Key of the array-valued response field holding the result list.
    fn result_key(&self, service: &str, operation: &str) -> Option<String>;
}

/// Full description of one registered operation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationSpec {
    #[serde(default)]
    pub shape: InputShape,
    #[serde(default)]
    pub paginated: bool,
    #[serde(default)]
    pub result_key: Option<String>,
}

impl OperationSpec {
    pub fn read_listing(result_key: impl Into<String>) -> Self {
        Self { shape: InputShape::default(), paginated: true, result_key: Some(result_key.into()) }
    }
}

/// Registry mapping `(service, operation)` to a typed call descriptor,
/// built once at startup from the schema source.
#[derive(Clone, Debug, Default)]
pub struct InMemoryCatalog {
    services: BTreeMap<String, BTreeMap<String, OperationSpec>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        service: impl Into<String>,
        operation: impl Into<String>,
        spec: OperationSpec,
    ) -> &mut Self {
        self.services
            .entry(service.into().to_ascii_lowercase())
            .or_default()
            .insert(operation.into().to_ascii_lowercase(), spec);
        self
    }

    fn operation_spec(&self, service: &str, operation: &str) -> Option<&OperationSpec> {
        self.services
            .get(&service.to_ascii_lowercase())?
            .get(&operation.to_ascii_lowercase())
    }
}

impl ServiceCatalog for InMemoryCatalog {
    fn service_exists(&self, service: &str) -> bool {
        self.services.contains_key(&service.to_ascii_lowercase())
    }

    fn list_services(&self) -> Vec<String> {
        self.services.keys().cloned().collect()
    }

    fn list_operations(&self, service: &str) -> Vec<String> {
        self.services
            .get(&service.to_ascii_lowercase())
            .map(|operations| operations.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn input_shape(&self, service: &str, operation: &str) -> Option<InputShape> {
        self.operation_spec(service, operation).map(|spec| spec.shape.clone())
    }

    fn supports_pagination(&self, service: &str, operation: &str) -> bool {
        self.operation_spec(service, operation).map(|spec| spec.paginated).unwrap_or(false)
    }

    fn result_key(&self, service: &str, operation: &str) -> Option<String> {
        self.operation_spec(service, operation).and_then(|spec| spec.result_key.clone())
    }
}

/// Top-N closest candidates by normalized string similarity.
fn closest_matches(input: &str, candidates: &[String], limit: usize) -> Vec<String> {
    let input = input.to_ascii_lowercase();
    let mut scored: Vec<(f64, &String)> = candidates
        .iter()
        .map(|candidate| {
            (strsim::normalized_levenshtein(&input, &candidate.to_ascii_lowercase()), candidate)
        })
        .filter(|(score, _)| *score >= 0.6)
        .collect();
    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    scored.into_iter().take(limit).map(|(_, candidate)| candidate.clone()).collect()
}

/// Validates commands against the catalog before they reach the safety layer.
#[derive(Clone)]
pub struct SchemaValidator {
    catalog: Arc<dyn ServiceCatalog>,
}

impl SchemaValidator {
    pub fn new(catalog: Arc<dyn ServiceCatalog>) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &Arc<dyn ServiceCatalog> {
        &self.catalog
    }

    /// Check that the service/operation pair exists and that required,
    /// typed parameters are present.
    ///
    /// Missing required parameters are reported as a single aggregated
    /// error. Extra parameters and type mismatches are warnings only.
    pub fn validate(
        &self,
        service: &str,
        operation: &str,
        parameters: &Map<String, Value>,
    ) -> ValidationResult {
        let service = service.to_ascii_lowercase();
        let operation = operation.to_ascii_lowercase();

        if !self.catalog.service_exists(&service) {
            let suggestions = closest_matches(&service, &self.catalog.list_services(), 3);
            let hint = if suggestions.is_empty() {
                String::new()
            } else {
                format!(" Did you mean: {}?", suggestions.join(", "))
            };
            return ValidationResult::invalid(
                vec![format!("Unknown service '{service}'.{hint}")],
                suggestions,
            );
        }

        let known_operations = self.catalog.list_operations(&service);
        if !known_operations.iter().any(|known| known == &operation) {
            let suggestions = closest_matches(&operation, &known_operations, 3);
            let hint = if suggestions.is_empty() {
                String::new()
            } else {
                format!(" Similar operations: {}", suggestions.join(", "))
            };
            return ValidationResult::invalid(
                vec![format!("Operation '{operation}' not found for service '{service}'.{hint}")],
                suggestions,
            );
        }

        let shape = self.catalog.input_shape(&service, &operation).unwrap_or_default();
        let mut warnings = Vec::new();

        let missing: Vec<String> = shape
            .required
            .iter()
            .filter(|name| !parameters.contains_key(name.as_str()))
            .cloned()
            .collect();

        let unknown: Vec<&str> = parameters
            .keys()
            .filter(|name| !shape.members.is_empty() && !shape.members.contains_key(name.as_str()))
            .map(String::as_str)
            .collect();
        if !unknown.is_empty() {
            warnings.push(format!("Unknown parameters (may be ignored): {}", unknown.join(", ")));
        }

        for (name, value) in parameters {
            if let Some(expected) = shape.members.get(name) {
                if !expected.matches(value) {
                    warnings.push(format!(
                        "Parameter '{name}' does not look like a {expected:?} value"
                    ));
                }
            }
        }

        if missing.is_empty() {
            ValidationResult::valid(warnings)
        } else {
            ValidationResult {
                valid: false,
                errors: vec![format!("Missing required parameters: {}", missing.join(", "))],
                warnings,
                missing_required: missing,
                suggestions: Vec::new(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::{json, Map};

    use super::{InMemoryCatalog, InputShape, OperationSpec, ParamType, SchemaValidator};

    fn catalog() -> InMemoryCatalog {
        let mut catalog = InMemoryCatalog::new();
        catalog.register("s3", "list_buckets", OperationSpec::read_listing("Buckets"));
        catalog.register("lambda", "list_functions", OperationSpec::read_listing("Functions"));
        catalog.register(
            "s3",
            "delete_bucket",
            OperationSpec {
                shape: InputShape {
                    required: vec!["Bucket".to_string()],
                    members: [("Bucket".to_string(), ParamType::String)].into_iter().collect(),
                },
                ..OperationSpec::default()
            },
        );
        catalog.register(
            "ec2",
            "terminate_instances",
            OperationSpec {
                shape: InputShape {
                    required: vec!["InstanceIds".to_string()],
                    members: [
                        ("InstanceIds".to_string(), ParamType::List),
                        ("DryRun".to_string(), ParamType::Boolean),
                    ]
                    .into_iter()
                    .collect(),
                },
                ..OperationSpec::default()
            },
        );
        catalog
    }

    fn validator() -> SchemaValidator {
        SchemaValidator::new(Arc::new(catalog()))
    }

    #[test]
    fn unknown_service_suggests_closest_names() {
        let result = validator().validate("lamda", "list_functions", &Map::new());
        assert!(!result.valid);
        assert_eq!(result.suggestions, vec!["lambda".to_string()]);
        assert!(result.errors[0].contains("Unknown service 'lamda'"));
    }

    #[test]
    fn unknown_service_with_no_near_miss_fails_without_suggestions() {
        let result = validator().validate("quantumdb", "list_things", &Map::new());
        assert!(!result.valid);
        assert!(result.suggestions.is_empty());
    }

    #[test]
    fn unknown_operation_suggests_similar_operations() {
        let result = validator().validate("s3", "list_bucket", &Map::new());
        assert!(!result.valid);
        assert!(result.suggestions.contains(&"list_buckets".to_string()));
    }

    #[test]
    fn missing_required_parameters_are_one_aggregated_error() {
        let result = validator().validate("ec2", "terminate_instances", &Map::new());
        assert!(!result.valid);
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].contains("InstanceIds"));
        assert_eq!(result.missing_required, vec!["InstanceIds".to_string()]);
    }

    #[test]
    fn extra_parameters_are_warnings_not_errors() {
        let mut parameters = Map::new();
        parameters.insert("Bucket".to_string(), json!("my-bucket"));
        parameters.insert("Sparkles".to_string(), json!(true));
        let result = validator().validate("s3", "delete_bucket", &parameters);
        assert!(result.valid);
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].contains("Sparkles"));
    }

    #[test]
    fn type_mismatch_is_a_warning_when_parameter_present() {
        let mut parameters = Map::new();
        parameters.insert("InstanceIds".to_string(), json!("i-not-a-list"));
        let result = validator().validate("ec2", "terminate_instances", &parameters);
        assert!(result.valid);
        assert!(result.warnings.iter().any(|warning| warning.contains("InstanceIds")));
    }

    #[test]
    fn well_formed_command_validates_cleanly() {
        let mut parameters = Map::new();
        parameters.insert("InstanceIds".to_string(), json!(["i-0123456789abcdef0"]));
        parameters.insert("DryRun".to_string(), json!(true));
        let result = validator().validate("EC2", "Terminate_Instances", &parameters);
        assert!(result.valid);
        assert!(result.warnings.is_empty());
    }
}
