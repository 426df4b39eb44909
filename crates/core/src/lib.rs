pub mod audit;
pub mod catalog;
pub mod classify;
pub mod command;
pub mod config;
pub mod context;
pub mod denylist;
pub mod engine;
pub mod error_map;
pub mod errors;
pub mod intent;
pub mod pagination;
pub mod safety;
pub mod session;

pub use audit::{AuditEvent, AuditOutcome, AuditSink, InMemoryAuditSink, TracingAuditSink};
pub use catalog::{
    InMemoryCatalog, InputShape, OperationSpec, ParamType, SchemaValidator, ServiceCatalog,
};
pub use classify::{category_description, classify, supports_dry_run};
pub use command::{
    OperationCategory, ParseResult, SafetyMode, StructuredCommand, ValidationResult,
};
pub use config::{ConfigError, ConfigOverrides, GateConfig, LoadOptions, LogFormat};
pub use context::{
    store_from_config, ContextStore, InMemoryContextStore, NoopContextStore, QueryRecord,
    ResourceEntry,
};
pub use engine::{
    confirmation_message, Confirmation, ExecutionEngine, ExecutionOptions, ExecutionResult,
};
pub use error_map::{normalize, should_retry, ErrorCategory, ErrorInfo, ExecutionError};
pub use errors::GateError;
pub use intent::IntentClassifier;
pub use pagination::{
    PaginatedResult, PaginationHandler, ProviderClient, ProviderError, ProviderPage,
};
pub use safety::{SafetyConfig, SafetyDecision, SafetyEnforcer};
pub use session::{SessionProvider, StaticSession};
