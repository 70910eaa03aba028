//! Observational hook for client operations
//!
//! Every client operation reports one [`OperationEvent`] before it runs.
//! Sinks cannot influence the operation; the default forwards events to
//! `tracing`.

use serde_json::Value;

/// One client operation about to run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OperationEvent<'a> {
    /// Operation name (`get`, `put`, `patch`, `post`, `delete`)
    pub operation: &'static str,
    /// Database path the operation targets
    pub path: &'a str,
    /// Query or written value, when there is one
    pub payload: Option<&'a Value>,
}

/// Receiver of operation events
pub trait EventSink: Send + Sync {
    /// Observe one event
    fn record(&self, event: &OperationEvent<'_>);
}

/// Emits events as `tracing` debug records under `fireman::client`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn record(&self, event: &OperationEvent<'_>) {
        match event.payload {
            Some(payload) => tracing::debug!(
                target: "fireman::client",
                op = event.operation,
                path = event.path,
                payload = %payload,
                "Database operation"
            ),
            None => tracing::debug!(
                target: "fireman::client",
                op = event.operation,
                path = event.path,
                "Database operation"
            ),
        }
    }
}

/// Discards every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn record(&self, _event: &OperationEvent<'_>) {}
}

impl<F> EventSink for F
where
    F: Fn(&OperationEvent<'_>) + Send + Sync,
{
    fn record(&self, event: &OperationEvent<'_>) {
        self(event)
    }
}
