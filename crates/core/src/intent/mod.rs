//! Free-text classification into a [`StructuredCommand`].
//!
//! A four-stage pipeline: intent detection, service identification,
//! operation determination, parameter extraction. Every stage returns an
//! explicit optional result; the pipeline short-circuits into a
//! [`ParseResult`] failure with example phrasings instead of guessing.
//! Overall confidence is the minimum of the stage confidences; a pipeline is
//! only as confident as its weakest stage.

pub mod rules;

use regex::Regex;
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::classify;
use crate::command::{
    ParseResult, ParsedIntent, ParsedOperation, ParsedParameter, ParsedService, StructuredCommand,
};
use rules::{default_operation, service_rule, INTENT_RULES, SERVICE_RULES};

const EXAMPLE_PHRASES: &[&str] =
    &["list s3 buckets", "describe ec2 instances", "get lambda functions"];

pub struct IntentClassifier {
    compiled: Vec<Vec<Regex>>,
    region: Regex,
    instance_id: Regex,
    bucket: Regex,
    function: Regex,
    tag: Regex,
    limit: Regex,
}

impl Default for IntentClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl IntentClassifier {
    pub fn new() -> Self {
        let compiled = INTENT_RULES
            .iter()
            .map(|rule| {
                rule.patterns
                    .iter()
                    .map(|pattern| Regex::new(pattern).expect("intent rule patterns are valid"))
                    .collect()
            })
            .collect();
        let parameter = |pattern: &str| {
            Regex::new(pattern).expect("parameter extraction patterns are valid")
        };
        Self {
            compiled,
            region: parameter(r"(?:in|region)\s+(us-\w+-\d+|eu-\w+-\d+|ap-\w+-\d+)"),
            instance_id: parameter(r"(i-[a-f0-9]{8,17})"),
            bucket: parameter(r#"bucket\s+['"]?([a-z0-9][a-z0-9.-]{1,61}[a-z0-9])['"]?"#),
            function: parameter(r#"function\s+['"]?([a-zA-Z0-9_-]+)['"]?"#),
            tag: parameter(r#"tagged?\s+(?:with\s+)?['"]?(\w+)['"]?\s*[=:]\s*['"]?(\w+)['"]?"#),
            limit: parameter(r"(?:top|first|limit)\s+(\d+)"),
        }
    }

    /// Classify a free-text query. Never panics; all failure modes come back
    /// as a [`ParseResult`] with suggestions.
    pub fn classify(&self, query: &str) -> ParseResult {
        let query = query.trim();
        if query.is_empty() {
            return ParseResult::failed("Empty query provided", Vec::new());
        }
        let query_lower = query.to_ascii_lowercase();

        let Some(intent) = self.detect_intent(&query_lower) else {
            return ParseResult::failed(
                "Could not understand the intent. Try phrases like 'list buckets' or \
                 'describe instances'.",
                EXAMPLE_PHRASES.iter().map(|s| s.to_string()).collect(),
            );
        };

        let Some(service) = identify_service(&query_lower) else {
            return ParseResult::failed(
                "Could not identify the service. Please name one, for example s3, ec2 or lambda.",
                EXAMPLE_PHRASES.iter().map(|s| s.to_string()).collect(),
            );
        };

        let operation = determine_operation(&intent, &service, &query_lower);
        let parameters = self.extract_parameters(&query_lower, &service.service_name);

        let mut command = StructuredCommand::new(
            service.service_name.clone(),
            operation.operation_name.clone(),
            Map::new(),
            operation.category,
        );
        for parameter in parameters {
            if parameter.name == "region" {
                command.region = parameter.value.as_str().map(str::to_string);
            } else {
                command.parameters.insert(parameter.name, parameter.value);
            }
        }
        command.raw_input = Some(query.to_string());
        command.confidence =
            intent.confidence.min(service.confidence).min(operation.confidence);

        debug!(
            service = %command.service,
            operation = %command.operation,
            confidence = command.confidence,
            "query classified"
        );

        ParseResult::parsed(command, intent, service, operation)
    }

    fn detect_intent(&self, query: &str) -> Option<ParsedIntent> {
        for (rule, patterns) in INTENT_RULES.iter().zip(&self.compiled) {
            if patterns.iter().any(|pattern| pattern.is_match(query)) {
                return Some(ParsedIntent { intent_type: rule.intent.to_string(), confidence: 0.9 });
            }
        }
        // No grammatical match but clearly a listing request.
        if ["list", "show", "get", "all"].iter().any(|word| query.contains(word)) {
            return Some(ParsedIntent { intent_type: "list".to_string(), confidence: 0.6 });
        }
        None
    }

    fn extract_parameters(&self, query: &str, service: &str) -> Vec<ParsedParameter> {
        let mut parameters = Vec::new();

        if let Some(captures) = self.region.captures(query) {
            parameters
                .push(ParsedParameter { name: "region".to_string(), value: json!(&captures[1]) });
        }
        if let Some(captures) = self.instance_id.captures(query) {
            parameters.push(ParsedParameter {
                name: "InstanceIds".to_string(),
                value: json!([&captures[1]]),
            });
        }
        if service == "s3" {
            if let Some(captures) = self.bucket.captures(query) {
                parameters.push(ParsedParameter {
                    name: "Bucket".to_string(),
                    value: json!(&captures[1]),
                });
            }
        }
        if service == "lambda" {
            if let Some(captures) = self.function.captures(query) {
                parameters.push(ParsedParameter {
                    name: "FunctionName".to_string(),
                    value: json!(&captures[1]),
                });
            }
        }
        if let Some(captures) = self.tag.captures(query) {
            parameters.push(ParsedParameter {
                name: "Filters".to_string(),
                value: json!([{ "Name": format!("tag:{}", &captures[1]), "Values": [&captures[2]] }]),
            });
        }
        if let Some(captures) = self.limit.captures(query) {
            if let Ok(limit) = captures[1].parse::<u64>() {
                parameters
                    .push(ParsedParameter { name: "MaxResults".to_string(), value: json!(limit) });
            }
        }

        parameters
    }
}

/// Score every known service by the fraction of its keywords present in the
/// text, with a bonus when the canonical name itself appears. Strictly
/// greater-than comparison keeps the first service in enumeration order on
/// ties, which keeps classification deterministic.
fn identify_service(query: &str) -> Option<ParsedService> {
    let mut best: Option<(f64, ParsedService)> = None;

    for rule in SERVICE_RULES {
        let matched: Vec<String> = rule
            .keywords
            .iter()
            .filter(|keyword| query.contains(*keyword))
            .map(|keyword| keyword.to_string())
            .collect();
        if matched.is_empty() {
            continue;
        }

        let mut score = matched.len() as f64 / rule.keywords.len() as f64;
        if query.contains(rule.service) {
            score += 0.3;
        }

        if best.as_ref().map(|(best_score, _)| score > *best_score).unwrap_or(true) {
            best = Some((
                score,
                ParsedService {
                    service_name: rule.service.to_string(),
                    display_name: rule.display_name.to_string(),
                    confidence: score.min(1.0),
                    matched_keywords: matched,
                },
            ));
        }
    }

    best.map(|(_, service)| service)
}

/// Resolve the concrete operation: resource-type mention first, then the
/// per-service default table, finally a synthesized guess flagged with
/// alternatives at the lowest confidence.
fn determine_operation(
    intent: &ParsedIntent,
    service: &ParsedService,
    query: &str,
) -> ParsedOperation {
    let resource_types =
        service_rule(&service.service_name).map(|rule| rule.resource_types).unwrap_or(&[]);

    for (resource_type, operation) in resource_types {
        if query.contains(resource_type) {
            return ParsedOperation {
                operation_name: operation.to_string(),
                category: classify::classify(&service.service_name, operation),
                confidence: 0.9,
                suggested_alternatives: Vec::new(),
            };
        }
    }

    if let Some(operation) = default_operation(&service.service_name, &intent.intent_type) {
        return ParsedOperation {
            operation_name: operation.to_string(),
            category: classify::classify(&service.service_name, operation),
            confidence: 0.7,
            suggested_alternatives: Vec::new(),
        };
    }

    let guess = resource_types
        .first()
        .map(|(_, operation)| operation.to_string())
        .unwrap_or_else(|| format!("{}_resources", intent.intent_type));
    ParsedOperation {
        category: classify::classify(&service.service_name, &guess),
        operation_name: guess,
        confidence: 0.5,
        suggested_alternatives: resource_types
            .iter()
            .take(3)
            .map(|(_, operation)| operation.to_string())
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::IntentClassifier;
    use crate::command::OperationCategory;

    fn classifier() -> IntentClassifier {
        IntentClassifier::new()
    }

    #[test]
    fn list_s3_buckets_classifies_to_read_command() {
        let result = classifier().classify("list s3 buckets");
        assert!(result.success);
        let command = result.command.expect("command");
        assert_eq!(command.service, "s3");
        assert_eq!(command.operation, "list_buckets");
        assert_eq!(command.category, OperationCategory::Read);
        assert!(command.confidence > 0.7);
    }

    #[test]
    fn describe_instance_extracts_instance_id() {
        let result = classifier().classify("describe ec2 instance i-1234567890abcdef0");
        assert!(result.success);
        let command = result.command.expect("command");
        assert_eq!(command.service, "ec2");
        assert_eq!(command.operation, "describe_instances");
        assert_eq!(
            command.parameters.get("InstanceIds"),
            Some(&json!(["i-1234567890abcdef0"]))
        );
    }

    #[test]
    fn terminate_phrasing_maps_to_destructive_intent() {
        let result = classifier().classify("terminate ec2 instance i-0abc0abc0abc0abc0");
        assert!(result.success);
        let intent = result.intent.expect("intent");
        assert_eq!(intent.intent_type, "delete");
        // The resolved operation is still the resource's canonical read op;
        // explicit destructive calls come in through the structured path.
        assert_eq!(result.operation.expect("operation").operation_name, "describe_instances");
    }

    #[test]
    fn region_moves_onto_the_command_not_the_parameters() {
        let result = classifier().classify("list ec2 instances in us-west-2");
        let command = result.command.expect("command");
        assert_eq!(command.region.as_deref(), Some("us-west-2"));
        assert!(!command.parameters.contains_key("region"));
    }

    #[test]
    fn multiple_extractors_fire_on_one_input() {
        let result =
            classifier().classify("show ec2 instances tagged env=prod in eu-central-1 limit 5");
        let command = result.command.expect("command");
        assert_eq!(command.region.as_deref(), Some("eu-central-1"));
        assert_eq!(command.parameters.get("MaxResults"), Some(&json!(5)));
        assert_eq!(
            command.parameters.get("Filters"),
            Some(&json!([{ "Name": "tag:env", "Values": ["prod"] }]))
        );
    }

    #[test]
    fn generic_show_me_falls_back_to_list_at_reduced_confidence() {
        let result = classifier().classify("everything you have, all the lambda functions please");
        assert!(result.success);
        let intent = result.intent.expect("intent");
        assert_eq!(intent.intent_type, "list");
        assert_eq!(intent.confidence, 0.6);
    }

    #[test]
    fn overall_confidence_is_the_minimum_of_the_stages() {
        let result = classifier().classify("list s3 buckets");
        let command = result.command.clone().expect("command");
        let stages = [
            result.intent.expect("intent").confidence,
            result.service.expect("service").confidence,
            result.operation.expect("operation").confidence,
        ];
        let min = stages.iter().cloned().fold(f64::INFINITY, f64::min);
        assert!((command.confidence - min).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_and_unintelligible_inputs_fail_with_distinct_errors() {
        let empty = classifier().classify("   ");
        assert!(!empty.success);
        assert_eq!(empty.error.as_deref(), Some("Empty query provided"));

        let nonsense = classifier().classify("frobnicate the bazzle");
        assert!(!nonsense.success);
        assert!(nonsense.error.expect("error").contains("intent"));
        assert!(!nonsense.suggestions.is_empty());

        let no_service = classifier().classify("list all the things");
        assert!(!no_service.success);
        assert!(no_service.error.expect("error").contains("service"));
    }

    #[test]
    fn unknown_resource_for_known_service_synthesizes_low_confidence_guess() {
        let result = classifier().classify("show me eks");
        assert!(result.success);
        let operation = result.operation.expect("operation");
        assert_eq!(operation.confidence, 0.5);
        assert_eq!(operation.operation_name, "list_clusters");
        assert!(!operation.suggested_alternatives.is_empty());
    }
}
