//! Cached reads on top of a [`BackendClient`]

use crate::client::BackendClient;
use crate::query::Query;
use serde_json::Value as JsonValue;
use spotter_caching::{FetchCache, FetchOptions};
use spotter_config::CacheConfig;
use spotter_core::NormalizedError;

/// [`BackendClient`] wrapper serving repeated reads from a [`FetchCache`].
///
/// Selects are keyed by table and query string, RPCs by function name and
/// arguments, so different filters on one table are cached separately.
pub struct CachedBackend<C> {
    client: C,
    cache: FetchCache<Option<JsonValue>>,
}

impl<C: BackendClient> CachedBackend<C> {
    pub fn new(client: C, config: &CacheConfig) -> Self {
        Self {
            client,
            cache: FetchCache::from_config(config),
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn cache(&self) -> &FetchCache<Option<JsonValue>> {
        &self.cache
    }

    /// Rows of `table` matching `query`, from the cache while live
    pub async fn select(
        &self,
        table: &str,
        query: &Query,
        options: &FetchOptions,
    ) -> Result<Option<JsonValue>, NormalizedError> {
        let key = select_key(table, query);
        self.cache
            .fetch(
                &key,
                || async { self.client.select(table, query).await.into_result() },
                options,
            )
            .await
    }

    /// Result of a stored procedure, from the cache while live
    pub async fn rpc(
        &self,
        function: &str,
        args: &JsonValue,
        options: &FetchOptions,
    ) -> Result<Option<JsonValue>, NormalizedError> {
        let key = rpc_key(function, args);
        self.cache
            .fetch(
                &key,
                || async { self.client.rpc(function, args).await.into_result() },
                options,
            )
            .await
    }

    /// Drop every cached select on `table`
    pub fn invalidate_table(&self, table: &str) -> usize {
        let prefix = format!("{}?", table);
        self.cache.invalidate_where(|key| key.starts_with(&prefix))
    }

    /// Drop everything
    pub fn invalidate_all(&self) -> usize {
        self.cache.invalidate_all()
    }
}

/// Cache key of a select: the table and its query string
pub fn select_key(table: &str, query: &Query) -> String {
    let query = query
        .to_pairs()
        .into_iter()
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<_>>()
        .join("&");
    format!("{}?{}", table, query)
}

fn rpc_key(function: &str, args: &JsonValue) -> String {
    format!("rpc/{}({})", function, args)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::RemoteResponse;
    use serde_json::json;
    use spotter_core::{ErrorKind, RemoteError};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    #[derive(Default)]
    struct CountingClient {
        selects: AtomicU32,
        rpcs: AtomicU32,
    }

    #[async_trait::async_trait]
    impl BackendClient for CountingClient {
        async fn select(&self, table: &str, _query: &Query) -> RemoteResponse<JsonValue> {
            let n = self.selects.fetch_add(1, Ordering::SeqCst) + 1;
            if table == "payments" {
                return RemoteResponse::failure(
                    RemoteError::new("permission denied for table payments").with_status(403),
                );
            }
            RemoteResponse::success(json!([{ "table": table, "read": n }]))
        }

        async fn rpc(&self, function: &str, args: &JsonValue) -> RemoteResponse<JsonValue> {
            self.rpcs.fetch_add(1, Ordering::SeqCst);
            RemoteResponse::success(json!({ "function": function, "args": args }))
        }
    }

    fn backend() -> CachedBackend<CountingClient> {
        CachedBackend::new(CountingClient::default(), &CacheConfig::default())
    }

    #[test]
    fn test_select_key() {
        let query = Query::new().select("id,name").eq("gym_id", 4).limit(10);
        assert_eq!(
            select_key("athletes", &query),
            "athletes?select=id,name&gym_id=eq.4&limit=10"
        );
        assert_eq!(select_key("documents", &Query::new()), "documents?select=*");
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeated_select_is_served_from_cache() {
        let backend = backend();
        let query = Query::new().eq("gym_id", 1);
        let options = FetchOptions::default();

        let first = backend.select("appointments", &query, &options).await.unwrap();
        let second = backend.select("appointments", &query, &options).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(backend.client().selects.load(Ordering::SeqCst), 1);

        // A different filter is a different entry
        backend
            .select("appointments", &Query::new().eq("gym_id", 2), &options)
            .await
            .unwrap();
        assert_eq!(backend.client().selects.load(Ordering::SeqCst), 2);

        tokio::time::advance(Duration::from_secs(30)).await;
        let third = backend.select("appointments", &query, &options).await.unwrap();
        assert_eq!(third, Some(json!([{ "table": "appointments", "read": 3 }])));
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalidate_table() {
        let backend = backend();
        let options = FetchOptions::default();

        for gym in 1..=3 {
            backend
                .select("appointments", &Query::new().eq("gym_id", gym), &options)
                .await
                .unwrap();
        }
        backend.select("documents", &Query::new(), &options).await.unwrap();

        assert_eq!(backend.invalidate_table("appointments"), 3);
        assert_eq!(backend.cache().len(), 1);

        backend
            .select("appointments", &Query::new().eq("gym_id", 1), &options)
            .await
            .unwrap();
        assert_eq!(backend.client().selects.load(Ordering::SeqCst), 5);

        assert_eq!(backend.invalidate_all(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backend_error_is_classified_and_not_cached() {
        let backend = backend();
        let options = FetchOptions::default();

        let error = backend
            .select("payments", &Query::new(), &options)
            .await
            .unwrap_err();
        assert_eq!(error.kind, ErrorKind::Generic);
        assert_eq!(error.status, Some(403));
        assert_eq!(error.code.as_deref(), Some("HTTP_403"));
        assert_eq!(error.context, "payments?select=*");

        backend.select("payments", &Query::new(), &options).await.unwrap_err();
        assert_eq!(backend.client().selects.load(Ordering::SeqCst), 2);
        assert!(backend.cache().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rpc_is_cached_per_arguments() {
        let backend = backend();
        let options = FetchOptions::default();
        let march = json!({ "month": "2026-03" });

        backend.rpc("monthly_revenue", &march, &options).await.unwrap();
        backend.rpc("monthly_revenue", &march, &options).await.unwrap();
        backend
            .rpc("monthly_revenue", &json!({ "month": "2026-04" }), &options)
            .await
            .unwrap();
        backend
            .rpc("monthly_revenue", &march, &FetchOptions::default().force_refresh())
            .await
            .unwrap();

        assert_eq!(backend.client().rpcs.load(Ordering::SeqCst), 3);
    }
}
