//! REST backend for the hosted database
//!
//! Each operation is one blocking `ureq` request run on tokio's blocking
//! pool. Requests go to `https://<app>.firebaseio.com/<path>.json` with the
//! secret passed as `auth`.

use crate::backend::Backend;
use crate::path;
use crate::query::Query;
use async_trait::async_trait;
use fireman_core::{Error, Result};
use serde_json::Value;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Method {
    Get,
    Put,
    Patch,
    Post,
    Delete,
}

impl Method {
    fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Post => "POST",
            Method::Delete => "DELETE",
        }
    }
}

/// Backend talking to `<app_name>.firebaseio.com`
#[derive(Clone)]
pub struct RemoteBackend {
    agent: ureq::Agent,
    app_name: String,
    api_key: String,
}

impl std::fmt::Debug for RemoteBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteBackend")
            .field("app_name", &self.app_name)
            .finish_non_exhaustive()
    }
}

impl RemoteBackend {
    /// Backend for `app_name`, authenticated with `api_key`; every request
    /// is bounded by `timeout`
    pub fn new(app_name: impl Into<String>, api_key: impl Into<String>, timeout: Duration) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build();
        Self {
            agent: ureq::Agent::new_with_config(config),
            app_name: app_name.into(),
            api_key: api_key.into(),
        }
    }

    /// REST endpoint for `path`
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "https://{}.firebaseio.com/{}.json",
            self.app_name,
            path::normalize(path)
        )
    }

    /// Query parameters for a request: `auth` first, then the query's
    pub fn params(&self, query: &Query) -> Vec<(&'static str, String)> {
        let mut params = vec![("auth", self.api_key.clone())];
        params.extend(query.to_params());
        params
    }

    async fn request(
        &self,
        method: Method,
        path: &str,
        query: &Query,
        body: Option<&Value>,
    ) -> Result<Value> {
        let url = self.endpoint(path);
        let params = self.params(query);
        let body = body.map(serde_json::to_vec).transpose()?;
        let agent = self.agent.clone();

        tracing::debug!(target: "fireman::remote", method = method.as_str(), url = %url, "Request");
        tokio::task::spawn_blocking(move || call(&agent, method, &url, &params, body.as_deref()))
            .await
            .map_err(|e| Error::transport(format!("request task failed: {e}")))?
    }
}

fn with_params<B>(
    mut request: ureq::RequestBuilder<B>,
    params: &[(&'static str, String)],
) -> ureq::RequestBuilder<B> {
    for (key, value) in params {
        request = request.query(*key, value);
    }
    request
}

fn call(
    agent: &ureq::Agent,
    method: Method,
    url: &str,
    params: &[(&'static str, String)],
    body: Option<&[u8]>,
) -> Result<Value> {
    let body = body.unwrap_or(b"null");
    let result = match method {
        Method::Get => with_params(agent.get(url), params).call(),
        Method::Delete => with_params(agent.delete(url), params).call(),
        Method::Put => with_params(agent.put(url), params)
            .header("Content-Type", "application/json")
            .send(body),
        Method::Patch => with_params(agent.patch(url), params)
            .header("Content-Type", "application/json")
            .send(body),
        Method::Post => with_params(agent.post(url), params)
            .header("Content-Type", "application/json")
            .send(body),
    };

    let mut response = result.map_err(|e| {
        let error = transport_error(e);
        tracing::warn!(target: "fireman::remote", method = method.as_str(), error = %error, "Request failed");
        error
    })?;
    let text = response
        .body_mut()
        .read_to_string()
        .map_err(|e| Error::transport(format!("failed to read response: {e}")))?;
    parse_body(&text)
}

fn transport_error(error: ureq::Error) -> Error {
    match error {
        ureq::Error::StatusCode(status) => Error::Transport {
            status: Some(status),
            reason: format!("service answered HTTP {status}"),
        },
        other => Error::transport(other.to_string()),
    }
}

/// Response body as JSON; an empty body is null
fn parse_body(text: &str) -> Result<Value> {
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_str(text)?)
}

#[async_trait]
impl Backend for RemoteBackend {
    fn name(&self) -> &'static str {
        "remote"
    }

    async fn get(&self, path: &str, query: &Query) -> Result<Value> {
        query.validate()?;
        self.request(Method::Get, path, query, None).await
    }

    async fn put(&self, path: &str, value: Value) -> Result<Value> {
        self.request(Method::Put, path, &Query::new(), Some(&value)).await
    }

    async fn patch(&self, path: &str, value: Value) -> Result<Value> {
        self.request(Method::Patch, path, &Query::new(), Some(&value)).await
    }

    async fn post(&self, path: &str, value: Value) -> Result<Value> {
        self.request(Method::Post, path, &Query::new(), Some(&value)).await
    }

    async fn delete(&self, path: &str) -> Result<Value> {
        self.request(Method::Delete, path, &Query::new(), None).await
    }
}
