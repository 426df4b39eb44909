//! Ordered rule tables for free-text classification.
//!
//! Rules are plain data so each table is independently testable; the pipeline
//! in the parent module is just the interpreter.

use crate::command::OperationCategory;

/// One intent: the verb phrases that select it, the category it implies and
/// the operation-name prefix convention it maps to.
pub struct IntentRule {
    pub intent: &'static str,
    pub patterns: &'static [&'static str],
    pub category: OperationCategory,
    pub operation_prefix: &'static str,
}

/// Matched top to bottom; the first rule with a matching pattern wins.
pub const INTENT_RULES: &[IntentRule] = &[
    IntentRule {
        intent: "list",
        patterns: &[
            r"^list\s+(?:all\s+)?(.+)",
            r"^show\s+(?:me\s+)?(?:all\s+)?(.+)",
            r"^get\s+(?:all\s+)?(.+)",
            r"^what\s+(.+)\s+(?:do\s+)?(?:i\s+)?have",
            r"^display\s+(.+)",
            r"^find\s+(?:all\s+)?(.+)",
        ],
        category: OperationCategory::Read,
        operation_prefix: "list",
    },
    IntentRule {
        intent: "describe",
        patterns: &[
            r"^describe\s+(.+)",
            r"^tell\s+me\s+about\s+(.+)",
            r"^details\s+(?:of|for|about)\s+(.+)",
            r"^info\s+(?:on|about|for)\s+(.+)",
            r"^what\s+is\s+(.+)",
        ],
        category: OperationCategory::Read,
        operation_prefix: "describe",
    },
    IntentRule {
        intent: "get",
        patterns: &[r"^get\s+(.+?)(?:\s+details|\s+info)?$", r"^fetch\s+(.+)", r"^retrieve\s+(.+)"],
        category: OperationCategory::Read,
        operation_prefix: "get",
    },
    IntentRule {
        intent: "create",
        patterns: &[
            r"^create\s+(?:a\s+)?(?:new\s+)?(.+)",
            r"^make\s+(?:a\s+)?(?:new\s+)?(.+)",
            r"^add\s+(?:a\s+)?(?:new\s+)?(.+)",
            r"^launch\s+(?:a\s+)?(?:new\s+)?(.+)",
            r"^start\s+(?:a\s+)?(?:new\s+)?(.+)",
        ],
        category: OperationCategory::Write,
        operation_prefix: "create",
    },
    IntentRule {
        intent: "delete",
        patterns: &[
            r"^delete\s+(.+)",
            r"^remove\s+(.+)",
            r"^destroy\s+(.+)",
            r"^terminate\s+(.+)",
            r"^drop\s+(.+)",
        ],
        category: OperationCategory::Destructive,
        operation_prefix: "delete",
    },
    IntentRule {
        intent: "update",
        patterns: &[r"^update\s+(.+)", r"^modify\s+(.+)", r"^change\s+(.+)", r"^edit\s+(.+)"],
        category: OperationCategory::Write,
        operation_prefix: "update",
    },
    IntentRule {
        intent: "stop",
        patterns: &[r"^stop\s+(.+)", r"^halt\s+(.+)", r"^pause\s+(.+)"],
        category: OperationCategory::Write,
        operation_prefix: "stop",
    },
    IntentRule {
        intent: "start",
        patterns: &[r"^start\s+(.+)", r"^resume\s+(.+)", r"^run\s+(.+)"],
        category: OperationCategory::Write,
        operation_prefix: "start",
    },
];

/// Keyword profile of one known service.
///
/// `resource_types` maps a resource-type keyword mentioned in the text to
/// that resource's canonical read operation.
pub struct ServiceRule {
    pub service: &'static str,
    pub display_name: &'static str,
    pub keywords: &'static [&'static str],
    pub resource_types: &'static [(&'static str, &'static str)],
}

/// Enumeration order is stable: ties in keyword scoring resolve to the first
/// service listed here.
pub const SERVICE_RULES: &[ServiceRule] = &[
    ServiceRule {
        service: "s3",
        display_name: "Amazon S3",
        keywords: &["s3", "bucket", "buckets", "object", "objects", "storage"],
        resource_types: &[("bucket", "list_buckets"), ("object", "list_objects_v2")],
    },
    ServiceRule {
        service: "ec2",
        display_name: "Amazon EC2",
        keywords: &[
            "ec2",
            "instance",
            "instances",
            "ami",
            "amis",
            "ebs",
            "volume",
            "volumes",
            "vpc",
            "vpcs",
            "subnet",
            "subnets",
            "security group",
            "security groups",
        ],
        resource_types: &[
            ("instance", "describe_instances"),
            ("volume", "describe_volumes"),
            ("vpc", "describe_vpcs"),
            ("subnet", "describe_subnets"),
            ("security group", "describe_security_groups"),
            ("ami", "describe_images"),
        ],
    },
    ServiceRule {
        service: "lambda",
        display_name: "AWS Lambda",
        keywords: &["lambda", "function", "functions", "serverless"],
        resource_types: &[("function", "list_functions")],
    },
    ServiceRule {
        service: "iam",
        display_name: "AWS IAM",
        keywords: &[
            "iam",
            "role",
            "roles",
            "user",
            "users",
            "policy",
            "policies",
            "permission",
            "permissions",
            "group",
            "groups",
        ],
        resource_types: &[
            ("role", "list_roles"),
            ("user", "list_users"),
            ("policy", "list_policies"),
            ("group", "list_groups"),
        ],
    },
    ServiceRule {
        service: "rds",
        display_name: "Amazon RDS",
        keywords: &[
            "rds",
            "database",
            "databases",
            "db",
            "mysql",
            "postgres",
            "postgresql",
            "aurora",
            "mariadb",
        ],
        resource_types: &[
            ("instance", "describe_db_instances"),
            ("cluster", "describe_db_clusters"),
            ("snapshot", "describe_db_snapshots"),
        ],
    },
    ServiceRule {
        service: "dynamodb",
        display_name: "Amazon DynamoDB",
        keywords: &["dynamodb", "dynamo", "table", "tables", "nosql"],
        resource_types: &[("table", "list_tables")],
    },
    ServiceRule {
        service: "ecs",
        display_name: "Amazon ECS",
        keywords: &[
            "ecs",
            "container",
            "containers",
            "cluster",
            "clusters",
            "task",
            "tasks",
            "service",
            "services",
        ],
        resource_types: &[
            ("cluster", "list_clusters"),
            ("service", "list_services"),
            ("task", "list_tasks"),
        ],
    },
    ServiceRule {
        service: "eks",
        display_name: "Amazon EKS",
        keywords: &["eks", "kubernetes", "k8s"],
        resource_types: &[("cluster", "list_clusters")],
    },
    ServiceRule {
        service: "cloudformation",
        display_name: "AWS CloudFormation",
        keywords: &["cloudformation", "cfn", "stack", "stacks", "template", "templates"],
        resource_types: &[("stack", "list_stacks")],
    },
    ServiceRule {
        service: "cloudwatch",
        display_name: "Amazon CloudWatch",
        keywords: &[
            "cloudwatch",
            "logs",
            "log",
            "metric",
            "metrics",
            "alarm",
            "alarms",
            "dashboard",
            "dashboards",
        ],
        resource_types: &[
            ("alarm", "describe_alarms"),
            ("metric", "list_metrics"),
            ("log group", "describe_log_groups"),
        ],
    },
    ServiceRule {
        service: "sns",
        display_name: "Amazon SNS",
        keywords: &["sns", "notification", "notifications", "topic", "topics"],
        resource_types: &[("topic", "list_topics")],
    },
    ServiceRule {
        service: "sqs",
        display_name: "Amazon SQS",
        keywords: &["sqs", "queue", "queues", "message", "messages"],
        resource_types: &[("queue", "list_queues")],
    },
    ServiceRule {
        service: "secretsmanager",
        display_name: "AWS Secrets Manager",
        keywords: &["secret", "secrets", "secretsmanager", "secrets manager"],
        resource_types: &[("secret", "list_secrets")],
    },
    ServiceRule {
        service: "ssm",
        display_name: "AWS Systems Manager",
        keywords: &["ssm", "parameter", "parameters", "systems manager"],
        resource_types: &[("parameter", "describe_parameters")],
    },
    ServiceRule {
        service: "route53",
        display_name: "Amazon Route 53",
        keywords: &[
            "route53",
            "dns",
            "domain",
            "domains",
            "hosted zone",
            "hosted zones",
            "record",
            "records",
        ],
        resource_types: &[("hosted zone", "list_hosted_zones")],
    },
    ServiceRule {
        service: "cloudfront",
        display_name: "Amazon CloudFront",
        keywords: &["cloudfront", "cdn", "distribution", "distributions"],
        resource_types: &[("distribution", "list_distributions")],
    },
    ServiceRule {
        service: "apigateway",
        display_name: "Amazon API Gateway",
        keywords: &["apigateway", "api gateway", "api", "apis", "rest api"],
        resource_types: &[("api", "get_rest_apis")],
    },
    ServiceRule {
        service: "elasticache",
        display_name: "Amazon ElastiCache",
        keywords: &["elasticache", "redis", "memcached", "cache"],
        resource_types: &[("cluster", "describe_cache_clusters")],
    },
    ServiceRule {
        service: "kinesis",
        display_name: "Amazon Kinesis",
        keywords: &["kinesis", "stream", "streams"],
        resource_types: &[("stream", "list_streams")],
    },
    ServiceRule {
        service: "sagemaker",
        display_name: "Amazon SageMaker",
        keywords: &["sagemaker", "ml", "machine learning", "model", "notebook"],
        resource_types: &[("notebook", "list_notebook_instances"), ("model", "list_models")],
    },
];

/// Per-service default operation for an intent, consulted when the text
/// names no specific resource type.
pub const DEFAULT_OPERATIONS: &[(&str, &[(&str, &str)])] = &[
    ("s3", &[("list", "list_buckets"), ("describe", "list_buckets"), ("get", "list_buckets")]),
    (
        "ec2",
        &[
            ("list", "describe_instances"),
            ("describe", "describe_instances"),
            ("get", "describe_instances"),
        ],
    ),
    (
        "lambda",
        &[("list", "list_functions"), ("describe", "list_functions"), ("get", "get_function")],
    ),
    ("iam", &[("list", "list_roles"), ("describe", "list_roles"), ("get", "get_role")]),
    ("rds", &[("list", "describe_db_instances"), ("describe", "describe_db_instances")]),
    ("dynamodb", &[("list", "list_tables"), ("describe", "list_tables")]),
    ("ecs", &[("list", "list_clusters"), ("describe", "describe_clusters")]),
    ("cloudformation", &[("list", "list_stacks"), ("describe", "describe_stacks")]),
    ("secretsmanager", &[("list", "list_secrets"), ("describe", "list_secrets")]),
];

pub fn service_rule(service: &str) -> Option<&'static ServiceRule> {
    SERVICE_RULES.iter().find(|rule| rule.service == service)
}

pub fn default_operation(service: &str, intent: &str) -> Option<&'static str> {
    DEFAULT_OPERATIONS
        .iter()
        .find(|(name, _)| *name == service)
        .and_then(|(_, table)| table.iter().find(|(kind, _)| *kind == intent))
        .map(|(_, operation)| *operation)
}
