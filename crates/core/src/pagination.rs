//! Bounded pagination over provider list calls.
//!
//! Providers hand back opaque continuation tokens with no upper bound on
//! how far they go. The handler walks them behind hard ceilings on both
//! page count and accumulated item count, so a single natural-language
//! request can never turn into an unbounded scan.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

/// Transport-level failure from the provider, before taxonomy
/// normalization.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{code}: {message}")]
pub struct ProviderError {
    pub code: String,
    pub message: String,
}

impl ProviderError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self { code: code.into(), message: message.into() }
    }
}

/// One page of a paginated response.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ProviderPage {
    pub body: Map<String, Value>,
    pub next_token: Option<String>,
}

/// A connected client for one provider service in one region.
#[async_trait]
pub trait ProviderClient: Send + Sync {
    /// Invoke an operation directly, without pagination.
    async fn call(
        &self,
        operation: &str,
        parameters: &Map<String, Value>,
    ) -> Result<Map<String, Value>, ProviderError>;

    /// Fetch one page; `token` is the continuation token from the previous
    /// page, `None` for the first.
    async fn call_page(
        &self,
        operation: &str,
        parameters: &Map<String, Value>,
        token: Option<&str>,
    ) -> Result<ProviderPage, ProviderError>;

    fn supports_pagination(&self, operation: &str) -> bool;
}

/// Result of a bounded paginated walk.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PaginatedResult {
    pub items: Vec<Value>,
    /// Non-array response fields from the first page, result metadata
    /// stripped.
    pub scalar_fields: BTreeMap<String, Value>,
    pub pages_fetched: usize,
    /// True when a ceiling cut the walk short of the provider's full
    /// result set.
    pub truncated: bool,
}

#[derive(Clone, Copy, Debug)]
pub struct PaginationHandler {
    max_pages: usize,
    max_items: usize,
}

impl Default for PaginationHandler {
    fn default() -> Self {
        Self { max_pages: 100, max_items: 1000 }
    }
}

impl PaginationHandler {
    pub fn new(max_pages: usize, max_items: usize) -> Self {
        Self { max_pages: max_pages.max(1), max_items: max_items.max(1) }
    }

    /// Walk the operation's pages up to the ceilings.
    ///
    /// The item ceiling is exact: when a page would overflow it, only the
    /// fitting prefix of that page is kept and the result is marked
    /// truncated. Any pagination failure falls back to one direct
    /// unpaginated call rather than surfacing a partial walk.
    pub async fn execute_paginated(
        &self,
        client: &dyn ProviderClient,
        operation: &str,
        parameters: &Map<String, Value>,
        result_key: Option<&str>,
    ) -> Result<PaginatedResult, ProviderError> {
        if !client.supports_pagination(operation) {
            let body = client.call(operation, parameters).await?;
            return Ok(direct_result(body, result_key));
        }

        let mut items: Vec<Value> = Vec::new();
        let mut scalar_fields = BTreeMap::new();
        let mut pages_fetched = 0usize;
        let mut truncated = false;
        let mut token: Option<String> = None;

        loop {
            let page = match client.call_page(operation, parameters, token.as_deref()).await {
                Ok(page) => page,
                Err(err) => {
                    // Partial walks are worse than a plain single call.
                    warn!(operation, pages_fetched, error = %err, "pagination failed, retrying unpaginated");
                    let body = client.call(operation, parameters).await?;
                    return Ok(direct_result(body, result_key));
                }
            };
            pages_fetched += 1;

            let (page_items, page_scalars) = extract_items(&page.body, result_key);
            if pages_fetched == 1 {
                scalar_fields = page_scalars;
            }

            let room = self.max_items - items.len();
            if page_items.len() > room {
                items.extend(page_items.into_iter().take(room));
                truncated = true;
                break;
            }
            items.extend(page_items);

            match page.next_token {
                // A token left at the item ceiling means more data exists;
                // do not spend a call discovering that.
                Some(_) if items.len() >= self.max_items => {
                    truncated = true;
                    break;
                }
                Some(next) if pages_fetched < self.max_pages => token = Some(next),
                Some(_) => {
                    truncated = true;
                    break;
                }
                None => break,
            }
        }

        debug!(operation, pages_fetched, items = items.len(), truncated, "pagination complete");
        Ok(PaginatedResult { items, scalar_fields, pages_fetched, truncated })
    }
}

/// Shape a single unpaginated response like a one-page walk.
pub fn direct_result(body: Map<String, Value>, result_key: Option<&str>) -> PaginatedResult {
    let (items, scalar_fields) = extract_items(&body, result_key);
    PaginatedResult { items, scalar_fields, pages_fetched: 1, truncated: false }
}

/// Split a response body into the result list and the remaining scalar
/// fields. The result key hint wins; otherwise the first array-valued
/// field is taken as the list.
fn extract_items(
    body: &Map<String, Value>,
    result_key: Option<&str>,
) -> (Vec<Value>, BTreeMap<String, Value>) {
    let mut items = Vec::new();
    let mut scalars = BTreeMap::new();
    let mut list_field: Option<&str> = result_key;

    if list_field.is_none() {
        list_field = body
            .iter()
            .find(|(key, value)| value.is_array() && !is_metadata_field(key))
            .map(|(key, _)| key.as_str());
    }

    for (key, value) in body {
        if is_metadata_field(key) {
            continue;
        }
        if Some(key.as_str()) == list_field {
            if let Value::Array(list) = value {
                items = list.clone();
            }
        } else if !value.is_array() || list_field.is_some() {
            scalars.insert(key.clone(), value.clone());
        }
    }

    (items, scalars)
}

fn is_metadata_field(key: &str) -> bool {
    matches!(key, "ResponseMetadata" | "NextToken" | "NextMarker" | "Marker" | "ContinuationToken")
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::{json, Map, Value};

    use super::{
        extract_items, PaginationHandler, ProviderClient, ProviderError, ProviderPage,
    };

    /// Serves a fixed sequence of pages, then errors.
    struct PagedStub {
        pages: Vec<ProviderPage>,
        calls: Mutex<usize>,
        fail_from_page: Option<usize>,
        fail_direct: bool,
    }

    impl PagedStub {
        fn with_pages(page_count: usize, items_per_page: usize) -> Self {
            let pages = (0..page_count)
                .map(|page| {
                    let items: Vec<Value> = (0..items_per_page)
                        .map(|i| json!({ "Name": format!("item-{page}-{i}") }))
                        .collect();
                    let mut body = Map::new();
                    body.insert("Items".to_string(), json!(items));
                    body.insert("Owner".to_string(), json!("acct-123"));
                    let next_token =
                        (page + 1 < page_count).then(|| format!("token-{}", page + 1));
                    ProviderPage { body, next_token }
                })
                .collect();
            Self { pages, calls: Mutex::new(0), fail_from_page: None, fail_direct: false }
        }

        fn page_calls(&self) -> usize {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl ProviderClient for PagedStub {
        async fn call(
            &self,
            _operation: &str,
            _parameters: &Map<String, Value>,
        ) -> Result<Map<String, Value>, ProviderError> {
            if self.fail_direct {
                return Err(ProviderError::new("ServiceUnavailable", "simulated"));
            }
            Ok(self.pages[0].body.clone())
        }

        async fn call_page(
            &self,
            _operation: &str,
            _parameters: &Map<String, Value>,
            token: Option<&str>,
        ) -> Result<ProviderPage, ProviderError> {
            *self.calls.lock().unwrap() += 1;
            let index = match token {
                None => 0,
                Some(token) => token
                    .rsplit('-')
                    .next()
                    .and_then(|n| n.parse::<usize>().ok())
                    .unwrap_or(0),
            };
            if self.fail_from_page.is_some_and(|fail| index >= fail) {
                return Err(ProviderError::new("Throttling", "simulated"));
            }
            Ok(self.pages[index].clone())
        }

        fn supports_pagination(&self, _operation: &str) -> bool {
            true
        }
    }

    #[tokio::test]
    async fn item_ceiling_truncates_mid_page_exactly() {
        // 3 pages of 40 against a ceiling of 100 keeps exactly 100.
        let stub = PagedStub::with_pages(3, 40);
        let handler = PaginationHandler::new(100, 100);
        let result = handler
            .execute_paginated(&stub, "list_items", &Map::new(), Some("Items"))
            .await
            .unwrap();
        assert_eq!(result.items.len(), 100);
        assert!(result.truncated);
        assert_eq!(result.pages_fetched, 3);
    }

    #[tokio::test]
    async fn page_ceiling_marks_truncation_when_tokens_remain() {
        let stub = PagedStub::with_pages(5, 10);
        let handler = PaginationHandler::new(2, 1000);
        let result = handler
            .execute_paginated(&stub, "list_items", &Map::new(), Some("Items"))
            .await
            .unwrap();
        assert_eq!(result.items.len(), 20);
        assert_eq!(result.pages_fetched, 2);
        assert!(result.truncated);
    }

    #[tokio::test]
    async fn short_walk_is_not_truncated() {
        let stub = PagedStub::with_pages(2, 10);
        let handler = PaginationHandler::default();
        let result = handler
            .execute_paginated(&stub, "list_items", &Map::new(), Some("Items"))
            .await
            .unwrap();
        assert_eq!(result.items.len(), 20);
        assert!(!result.truncated);
        assert_eq!(result.scalar_fields.get("Owner"), Some(&json!("acct-123")));
    }

    #[tokio::test]
    async fn mid_walk_failure_falls_back_to_single_call() {
        let mut stub = PagedStub::with_pages(3, 10);
        stub.fail_from_page = Some(1);
        let handler = PaginationHandler::default();
        let result = handler
            .execute_paginated(&stub, "list_items", &Map::new(), Some("Items"))
            .await
            .unwrap();
        // The fallback direct call serves page zero only.
        assert_eq!(result.items.len(), 10);
        assert_eq!(result.pages_fetched, 1);
        assert!(!result.truncated);
    }

    #[tokio::test]
    async fn first_page_failure_falls_back_to_single_call() {
        // A throttled first page recovers the same way a mid-walk one does.
        let mut stub = PagedStub::with_pages(3, 10);
        stub.fail_from_page = Some(0);
        let handler = PaginationHandler::default();
        let result = handler
            .execute_paginated(&stub, "list_items", &Map::new(), Some("Items"))
            .await
            .unwrap();
        assert_eq!(result.items.len(), 10);
        assert_eq!(result.pages_fetched, 1);
        assert!(!result.truncated);
    }

    #[tokio::test]
    async fn failure_of_the_fallback_call_propagates() {
        let mut stub = PagedStub::with_pages(3, 10);
        stub.fail_from_page = Some(1);
        stub.fail_direct = true;
        let handler = PaginationHandler::default();
        let err = handler
            .execute_paginated(&stub, "list_items", &Map::new(), Some("Items"))
            .await
            .unwrap_err();
        assert_eq!(err.code, "ServiceUnavailable");
    }

    #[tokio::test]
    async fn exact_ceiling_with_token_left_skips_the_next_fetch() {
        // Page 2 lands exactly on the ceiling with a token remaining; no
        // third call is made to learn what is already known.
        let stub = PagedStub::with_pages(3, 50);
        let handler = PaginationHandler::new(100, 100);
        let result = handler
            .execute_paginated(&stub, "list_items", &Map::new(), Some("Items"))
            .await
            .unwrap();
        assert_eq!(result.items.len(), 100);
        assert!(result.truncated);
        assert_eq!(result.pages_fetched, 2);
        assert_eq!(stub.page_calls(), 2);
    }

    #[test]
    fn extract_items_without_hint_uses_first_array_field() {
        let mut body = Map::new();
        body.insert("ResponseMetadata".to_string(), json!({ "RequestId": "r" }));
        body.insert("IsTruncated".to_string(), json!(false));
        body.insert("Buckets".to_string(), json!([{ "Name": "a" }, { "Name": "b" }]));
        let (items, scalars) = extract_items(&body, None);
        assert_eq!(items.len(), 2);
        assert_eq!(scalars.get("IsTruncated"), Some(&json!(false)));
        assert!(!scalars.contains_key("ResponseMetadata"));
    }
}
