//! Backend abstraction
//!
//! A backend executes single-path reads and writes against a database.
//! Fan-out, retry, logging and pagination live in the client above it.

use crate::query::Query;
use async_trait::async_trait;
use fireman_core::Result;
use serde_json::Value;

/// Single-path database operations.
///
/// Return values mirror the REST service: `put` and `patch` return the
/// written data, `post` returns `{"name": <new key>}` and `delete` returns
/// null.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Read the data at `path`, shaped by `query`
    async fn get(&self, path: &str, query: &Query) -> Result<Value>;

    /// Replace the data at `path`; null deletes
    async fn put(&self, path: &str, value: Value) -> Result<Value>;

    /// Overwrite the given children of `path`, leaving the others alone
    async fn patch(&self, path: &str, value: Value) -> Result<Value>;

    /// Add a child under a freshly generated key
    async fn post(&self, path: &str, value: Value) -> Result<Value>;

    /// Remove the data at `path`
    async fn delete(&self, path: &str) -> Result<Value>;
}
