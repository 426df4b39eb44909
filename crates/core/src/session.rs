//! Provider session abstraction.
//!
//! The engine never constructs provider clients itself; a session hands
//! them out per service and region. Credential handling, client caching,
//! and region fallback all live behind this trait.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::pagination::{ProviderClient, ProviderError};

#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// A connected client for `service`. `region` of `None` means the
    /// session's active region.
    async fn client(
        &self,
        service: &str,
        region: Option<&str>,
    ) -> Result<Arc<dyn ProviderClient>, ProviderError>;

    fn active_region(&self) -> String;

    fn active_profile(&self) -> Option<String> {
        None
    }
}

/// Session over a fixed set of pre-built clients, keyed by service name.
/// Region is recorded but does not select a different client.
#[derive(Default)]
pub struct StaticSession {
    region: String,
    clients: Mutex<BTreeMap<String, Arc<dyn ProviderClient>>>,
}

impl StaticSession {
    pub fn new(region: impl Into<String>) -> Self {
        Self { region: region.into(), clients: Mutex::new(BTreeMap::new()) }
    }

    pub fn insert(&self, service: impl Into<String>, client: Arc<dyn ProviderClient>) {
        let mut clients = match self.clients.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        clients.insert(service.into().to_ascii_lowercase(), client);
    }
}

#[async_trait]
impl SessionProvider for StaticSession {
    async fn client(
        &self,
        service: &str,
        _region: Option<&str>,
    ) -> Result<Arc<dyn ProviderClient>, ProviderError> {
        let clients = match self.clients.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        clients.get(&service.to_ascii_lowercase()).cloned().ok_or_else(|| {
            ProviderError::new(
                "UnknownService",
                format!("no client registered for service '{service}'"),
            )
        })
    }

    fn active_region(&self) -> String {
        self.region.clone()
    }
}
