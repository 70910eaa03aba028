//! Database client
//!
//! `Client` is the entry point: every operation reports to the event sink,
//! is validated, and runs against the backend through the retry policy.
//! Multi-path variants fan out with [`for_each_path`] and pagination is
//! built on [`PageIterator`].
//!
//! ```ignore
//! let client = Client::from_config(&ClientConfig::from_file(Path::new("fireman.toml"))?)?;
//! client.put("user/abcd", json!({"name": "Joshua Moreno", "age": 85})).await?;
//! client
//!     .iterate("user", 100, 8, |key, user| async move {
//!         println!("{key}: {user}");
//!         Ok(())
//!     })
//!     .await?;
//! ```

use crate::backend::Backend;
use crate::config::{BackendKind, ClientConfig};
use crate::fanout::{for_each_path, Concat, Discard, MergeObjects};
use crate::iterator::PageIterator;
use crate::local::LocalBackend;
use crate::path;
use crate::query::Query;
use crate::remote::RemoteBackend;
use crate::sink::{EventSink, OperationEvent, TracingSink};
use fireman_concurrency::{run_all, RetryConfig};
use fireman_core::json::{keys_of, values_of};
use fireman_core::{decode_timestamp, key_for_timestamp, to_page, Clock, Error, Result, SystemClock};
use serde_json::{json, Map, Number, Value};
use std::future::Future;
use std::sync::Arc;

/// Handle to one database. Cheap to clone; clones share the backend.
#[derive(Clone)]
pub struct Client {
    backend: Arc<dyn Backend>,
    retry: RetryConfig,
    sink: Arc<dyn EventSink>,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("backend", &self.backend.name())
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Client over `backend` retrying with `retry`; events go to `tracing`
    pub fn new(backend: Arc<dyn Backend>, retry: RetryConfig) -> Self {
        Self {
            backend,
            retry,
            sink: Arc::new(TracingSink),
        }
    }

    /// Client for the backend `config` selects.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` when the config is incomplete, or the error
    /// from opening the local database file.
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        config.validate()?;
        let backend: Arc<dyn Backend> = match config.backend {
            BackendKind::Local => match &config.db_file {
                Some(file) => Arc::new(LocalBackend::open(file)?),
                None => Arc::new(LocalBackend::new()),
            },
            BackendKind::Remote => {
                let (Some(app_name), Some(api_key)) = (&config.app_name, &config.api_key) else {
                    return Err(Error::Config("remote backend requires app_name and api_key".to_string()));
                };
                Arc::new(RemoteBackend::new(app_name, api_key, config.timeout()))
            }
        };
        tracing::info!(
            target: "fireman::client",
            backend = backend.name(),
            max_retries = config.retry_policy().max_retries,
            "Client configured"
        );
        Ok(Self::new(backend, config.retry_policy()))
    }

    /// Replace the event sink
    pub fn with_sink(mut self, sink: impl EventSink + 'static) -> Self {
        self.sink = Arc::new(sink);
        self
    }

    /// Backend this client talks to
    pub fn backend(&self) -> &dyn Backend {
        self.backend.as_ref()
    }

    /// Retry policy applied to every operation
    pub fn retry_policy(&self) -> RetryConfig {
        self.retry
    }

    fn record(&self, operation: &'static str, path: &str, payload: Option<&Value>) {
        self.sink.record(&OperationEvent {
            operation,
            path,
            payload,
        });
    }

    // ========================================================================
    // Single-path operations
    // ========================================================================

    /// Read `path`, shaped by `query`
    pub async fn get(&self, path: &str, query: &Query) -> Result<Value> {
        let rendered = if query.is_empty() {
            None
        } else {
            Some(serde_json::to_value(query)?)
        };
        self.record("get", path, rendered.as_ref());
        query.validate()?;
        self.retry.run(|| self.backend.get(path, query)).await
    }

    /// Replace the data at `path`; null deletes
    pub async fn put(&self, path: &str, value: Value) -> Result<Value> {
        self.record("put", path, Some(&value));
        self.retry.run(|| self.backend.put(path, value.clone())).await
    }

    /// Overwrite the given children of `path`
    pub async fn patch(&self, path: &str, value: Value) -> Result<Value> {
        self.record("patch", path, Some(&value));
        self.retry.run(|| self.backend.patch(path, value.clone())).await
    }

    /// Add `value` under a new time-ordered key; returns `{"name": key}`
    pub async fn post(&self, path: &str, value: Value) -> Result<Value> {
        self.record("post", path, Some(&value));
        self.retry.run(|| self.backend.post(path, value.clone())).await
    }

    /// Write `value` under a caller-chosen `key` by patching `path/key`.
    ///
    /// Returns `{"name": key}`, or null when the write returned nothing.
    pub async fn post_with_key(&self, path: &str, key: &str, value: Value) -> Result<Value> {
        let target = path::child(path, key);
        self.record("post", &target, Some(&value));
        let written = self
            .retry
            .run(|| self.backend.patch(&target, value.clone()))
            .await?;
        Ok(if written.is_null() {
            Value::Null
        } else {
            json!({ "name": key })
        })
    }

    /// Remove the data at `path`
    pub async fn delete(&self, path: &str) -> Result<Value> {
        self.record("delete", path, None);
        self.retry.run(|| self.backend.delete(path)).await
    }

    // ========================================================================
    // Multi-path operations
    // ========================================================================

    /// Read every path and shallow-merge the object results, later paths
    /// winning. `None` when no path held an object.
    pub async fn get_many<P: AsRef<str>>(
        &self,
        paths: &[P],
        query: &Query,
    ) -> Result<Option<Map<String, Value>>> {
        for_each_path(paths, MergeObjects, |path| self.get(path, query)).await
    }

    /// Write `value` to every path
    pub async fn put_many<P: AsRef<str>>(&self, paths: &[P], value: &Value) -> Result<()> {
        for_each_path(paths, Discard, |path| self.put(path, value.clone())).await
    }

    /// Patch every path with `value`
    pub async fn patch_many<P: AsRef<str>>(&self, paths: &[P], value: &Value) -> Result<()> {
        for_each_path(paths, Discard, |path| self.patch(path, value.clone())).await
    }

    /// Post `value` under every path
    pub async fn post_many<P: AsRef<str>>(&self, paths: &[P], value: &Value) -> Result<()> {
        for_each_path(paths, Discard, |path| self.post(path, value.clone())).await
    }

    /// Delete every path
    pub async fn delete_many<P: AsRef<str>>(&self, paths: &[P]) -> Result<()> {
        for_each_path(paths, Discard, |path| self.delete(path)).await
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    /// Child keys of `path`, fetched shallow
    pub async fn keys(&self, path: &str) -> Result<Vec<String>> {
        keys_of(self.get(path, &Query::new().shallow()).await?)
    }

    /// Child values of `path`, shaped by `query`
    pub async fn values(&self, path: &str, query: &Query) -> Result<Vec<Value>> {
        values_of(self.get(path, query).await?)
    }

    /// Child keys of every path, concatenated in path order
    pub async fn keys_many<P: AsRef<str>>(&self, paths: &[P]) -> Result<Vec<String>> {
        for_each_path(paths, Concat, |path| self.keys(path)).await
    }

    /// Child values of every path, concatenated in path order
    pub async fn values_many<P: AsRef<str>>(&self, paths: &[P], query: &Query) -> Result<Vec<Value>> {
        for_each_path(paths, Concat, |path| self.values(path, query)).await
    }

    /// Add each delta to the number stored under the same child of `path`
    /// (absent children count as 0), then patch the sums back.
    ///
    /// The read and the write are separate requests; concurrent writers
    /// can interleave between them.
    pub async fn increment(&self, path: &str, deltas: &Map<String, Value>) -> Result<Value> {
        let current = to_page(self.get(path, &Query::new()).await?)?;
        let mut sums = Map::new();
        for (key, delta) in deltas {
            sums.insert(key.clone(), add(key, current.get(key), delta)?);
        }
        self.patch(path, Value::Object(sums)).await
    }

    /// [`increment`](Self::increment) every path with the same deltas
    pub async fn increment_many<P: AsRef<str>>(
        &self,
        paths: &[P],
        deltas: &Map<String, Value>,
    ) -> Result<()> {
        for_each_path(paths, Discard, |path| self.increment(path, deltas)).await
    }

    /// Up to `limit` children of `path` ordered by key, starting at `start`
    /// (from the first child when `start` is empty)
    pub async fn batch(&self, path: &str, start: &str, limit: usize) -> Result<Value> {
        let mut query = Query::new().order_by_key().limit_to_first(limit);
        if !start.is_empty() {
            query = query.start_at(start);
        }
        self.get(path, &query).await
    }

    /// Page through `path`, `limit` children at a time
    pub fn iterator(&self, path: &str, limit: usize) -> Result<PageIterator> {
        PageIterator::new(self.clone(), path, limit)
    }

    /// Run `operation` once for every child of `path`.
    ///
    /// Pages of `limit` children are fetched in order; the children of a
    /// page run with at most `concurrency` operations in flight, and the
    /// next page is fetched only after the whole page finished. The first
    /// error aborts the walk; operations already applied stay applied.
    pub async fn iterate<F, Fut, T>(
        &self,
        path: &str,
        limit: usize,
        concurrency: usize,
        operation: F,
    ) -> Result<()>
    where
        F: Fn(String, Value) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let pages = self.iterator(path, limit)?;
        let operation = &operation;
        while let Some(page) = pages.next().await? {
            let units: Vec<_> = page
                .into_iter()
                .map(|(key, value)| move || operation(key, value))
                .collect();
            run_all(units, concurrency).await?;
        }
        Ok(())
    }

    // ========================================================================
    // Keys and snapshots
    // ========================================================================

    /// Fresh key for the current time
    pub fn key_for_now() -> Result<String> {
        key_for_timestamp(SystemClock.now_millis())
    }

    /// Fresh key for `timestamp` (milliseconds since the Unix epoch)
    pub fn key_for_timestamp(timestamp: i64) -> Result<String> {
        key_for_timestamp(timestamp)
    }

    /// Millisecond timestamp a key was minted at
    pub fn timestamp_for_key(key: &str) -> Result<u64> {
        decode_timestamp(key)
    }

    /// Copy the whole database into a new local backend
    pub async fn sync_to_local(&self) -> Result<LocalBackend> {
        let root = self.get("", &Query::new()).await?;
        tracing::info!(target: "fireman::client", from = self.backend.name(), "Synced database to local");
        Ok(LocalBackend::from_value(root))
    }
}

/// `current + delta`, keeping integers integral
fn add(key: &str, current: Option<&Value>, delta: &Value) -> Result<Value> {
    let Value::Number(delta) = delta else {
        return Err(Error::UnexpectedShape(format!("delta for {key:?} is not a number")));
    };
    let current = match current {
        None | Some(Value::Null) => Number::from(0),
        Some(Value::Number(n)) => n.clone(),
        Some(_) => {
            return Err(Error::UnexpectedShape(format!("value at {key:?} is not a number")));
        }
    };
    if let (Some(a), Some(b)) = (current.as_i64(), delta.as_i64()) {
        if let Some(sum) = a.checked_add(b) {
            return Ok(Value::from(sum));
        }
    }
    let sum = current.as_f64().unwrap_or(0.0) + delta.as_f64().unwrap_or(0.0);
    Number::from_f64(sum)
        .map(Value::Number)
        .ok_or_else(|| Error::UnexpectedShape(format!("sum for {key:?} is not finite")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_keeps_integers() {
        assert_eq!(add("n", None, &json!(3)).unwrap(), json!(3));
        assert_eq!(add("n", Some(&json!(4)), &json!(-1)).unwrap(), json!(3));
        assert_eq!(add("n", Some(&Value::Null), &json!(2)).unwrap(), json!(2));
    }

    #[test]
    fn add_mixed_is_float() {
        assert_eq!(add("n", Some(&json!(1.5)), &json!(1)).unwrap(), json!(2.5));
    }

    #[test]
    fn add_rejects_non_numbers() {
        assert!(add("n", Some(&json!("7")), &json!(1)).is_err());
        assert!(add("n", None, &json!("1")).is_err());
    }

    #[test]
    fn key_helpers() {
        let key = Client::key_for_timestamp(1486072494923).unwrap();
        assert!(key.starts_with("-Kc-ofhA"));
        assert_eq!(Client::timestamp_for_key(&key).unwrap(), 1486072494923);
        assert_eq!(Client::key_for_now().unwrap().len(), 20);
        assert!(Client::key_for_timestamp(-1).is_err());
    }

    #[test]
    fn zero_limit_iterator_is_rejected() {
        let client = Client::new(Arc::new(LocalBackend::new()), RetryConfig::no_retry());
        assert!(matches!(client.iterator("user", 0), Err(Error::InvalidQuery(_))));
    }
}
