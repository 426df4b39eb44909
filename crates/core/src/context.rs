//! Conversational context.
//!
//! Executed queries and the resources they returned are recorded so later
//! requests can refer back to them. Recording happens off the response
//! path; a context failure never fails an execution.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

use crate::command::StructuredCommand;
use crate::config::ContextConfig;

/// One executed query with the identifiers it surfaced.
#[derive(Clone, Debug, PartialEq)]
pub struct QueryRecord {
    pub id: Uuid,
    pub service: String,
    pub operation: String,
    pub raw_input: Option<String>,
    pub resource_ids: Vec<String>,
    pub executed_at: DateTime<Utc>,
}

/// One resource surfaced by a listing, kept so later requests can refer
/// back to it by name.
#[derive(Clone, Debug, PartialEq)]
pub struct ResourceEntry {
    pub service: String,
    pub resource_type: String,
    pub resource_id: String,
    pub recorded_at: DateTime<Utc>,
}

pub trait ContextStore: Send + Sync {
    fn record_query(&self, command: &StructuredCommand, items: &[Value]);
    fn add_resources_from_response(&self, service: &str, resource_type: &str, items: &[Value]);
    fn recent_queries(&self, limit: usize) -> Vec<QueryRecord>;
    fn recent_resources(&self, limit: usize) -> Vec<ResourceEntry>;
}

/// Discards everything. Used when context tracking is disabled.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopContextStore;

impl ContextStore for NoopContextStore {
    fn record_query(&self, _command: &StructuredCommand, _items: &[Value]) {}

    fn add_resources_from_response(&self, _service: &str, _resource_type: &str, _items: &[Value]) {}

    fn recent_queries(&self, _limit: usize) -> Vec<QueryRecord> {
        Vec::new()
    }

    fn recent_resources(&self, _limit: usize) -> Vec<ResourceEntry> {
        Vec::new()
    }
}

/// Bounded in-memory store, newest first.
pub struct InMemoryContextStore {
    records: Mutex<Vec<QueryRecord>>,
    resources: Mutex<Vec<ResourceEntry>>,
    capacity: usize,
}

impl InMemoryContextStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            resources: Mutex::new(Vec::new()),
            capacity: capacity.max(1),
        }
    }
}

/// Pick a store from config: tracking off means nothing is kept.
pub fn store_from_config(config: &ContextConfig) -> Arc<dyn ContextStore> {
    if config.enabled {
        Arc::new(InMemoryContextStore::new(config.capacity))
    } else {
        Arc::new(NoopContextStore)
    }
}

impl Default for InMemoryContextStore {
    fn default() -> Self {
        Self::new(100)
    }
}

impl ContextStore for InMemoryContextStore {
    fn record_query(&self, command: &StructuredCommand, items: &[Value]) {
        let record = QueryRecord {
            id: Uuid::new_v4(),
            service: command.service.clone(),
            operation: command.operation.clone(),
            raw_input: command.raw_input.clone(),
            resource_ids: extract_resource_ids(items),
            executed_at: Utc::now(),
        };
        let mut records = match self.records.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        records.insert(0, record);
        records.truncate(self.capacity);
    }

    fn add_resources_from_response(&self, service: &str, resource_type: &str, items: &[Value]) {
        let now = Utc::now();
        let mut entries: Vec<ResourceEntry> = extract_resource_ids(items)
            .into_iter()
            .map(|resource_id| ResourceEntry {
                service: service.to_string(),
                resource_type: resource_type.to_string(),
                resource_id,
                recorded_at: now,
            })
            .collect();
        let mut resources = match self.resources.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        entries.append(&mut std::mem::take(&mut resources));
        *resources = entries;
        resources.truncate(self.capacity);
    }

    fn recent_queries(&self, limit: usize) -> Vec<QueryRecord> {
        let records = match self.records.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        records.iter().take(limit).cloned().collect()
    }

    fn recent_resources(&self, limit: usize) -> Vec<ResourceEntry> {
        let resources = match self.resources.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        resources.iter().take(limit).cloned().collect()
    }
}

/// Pull well-known identifier fields out of listed items.
fn extract_resource_ids(items: &[Value]) -> Vec<String> {
    const ID_FIELDS: &[&str] = &[
        "InstanceId",
        "Name",
        "FunctionName",
        "TableName",
        "DBInstanceIdentifier",
        "StackName",
        "ClusterName",
        "Arn",
        "Id",
    ];
    items
        .iter()
        .filter_map(|item| {
            ID_FIELDS
                .iter()
                .find_map(|field| item.get(field))
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{store_from_config, ContextStore, InMemoryContextStore};
    use crate::command::{OperationCategory, StructuredCommand};
    use crate::config::ContextConfig;

    fn command() -> StructuredCommand {
        StructuredCommand::new(
            "ec2",
            "describe_instances",
            serde_json::Map::new(),
            OperationCategory::Read,
        )
    }

    #[test]
    fn records_resource_ids_from_items() {
        let store = InMemoryContextStore::default();
        store.record_query(
            &command(),
            &[json!({ "InstanceId": "i-abc" }), json!({ "InstanceId": "i-def" })],
        );
        let recent = store.recent_queries(10);
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].resource_ids, vec!["i-abc", "i-def"]);
    }

    #[test]
    fn store_is_bounded_and_newest_first() {
        let store = InMemoryContextStore::new(2);
        for i in 0..3 {
            let mut cmd = command();
            cmd.operation = format!("op_{i}");
            store.record_query(&cmd, &[]);
        }
        let recent = store.recent_queries(10);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].operation, "op_2");
        assert_eq!(recent[1].operation, "op_1");
    }

    #[test]
    fn resources_are_recorded_per_item_with_their_type() {
        let store = InMemoryContextStore::default();
        store.add_resources_from_response(
            "s3",
            "buckets",
            &[json!({ "Name": "logs" }), json!({ "Name": "backups" })],
        );
        store.add_resources_from_response("ec2", "instances", &[json!({ "InstanceId": "i-abc" })]);
        let recent = store.recent_resources(10);
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].service, "ec2");
        assert_eq!(recent[0].resource_type, "instances");
        assert_eq!(recent[0].resource_id, "i-abc");
        assert_eq!(recent[2].resource_id, "backups");
    }

    #[test]
    fn disabled_config_selects_a_store_that_keeps_nothing() {
        let store = store_from_config(&ContextConfig { enabled: false, capacity: 100 });
        store.record_query(&command(), &[json!({ "InstanceId": "i-abc" })]);
        store.add_resources_from_response("ec2", "instances", &[json!({ "InstanceId": "i-abc" })]);
        assert!(store.recent_queries(10).is_empty());
        assert!(store.recent_resources(10).is_empty());
    }

    #[test]
    fn enabled_config_selects_a_bounded_store() {
        let store = store_from_config(&ContextConfig { enabled: true, capacity: 1 });
        for _ in 0..2 {
            store.record_query(&command(), &[]);
        }
        assert_eq!(store.recent_queries(10).len(), 1);
    }
}
