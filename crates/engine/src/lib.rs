//! Database client engine for fireman
//!
//! This crate ties the lower layers to a database:
//! - Client: single-path, multi-path and helper operations
//! - Backends: local in-memory emulation and the hosted REST service
//! - Pagination: cursor-driven page iterator and `iterate`
//! - Configuration: `fireman.toml` loading
//! - Rules: security rules sync/deploy/diff
//!
//! The engine is the only component that knows about:
//! - Paths and queries
//! - The REST wire format
//! - Operation events

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backend;
pub mod client;
pub mod config;
pub mod fanout;
pub mod iterator;
pub mod local;
pub mod path;
pub mod query;
pub mod remote;
pub mod rules;
pub mod sink;

pub use backend::Backend;
pub use client::Client;
pub use config::{BackendKind, ClientConfig, CONFIG_FILE_NAME};
pub use fanout::{for_each_path, Combine, Concat, Discard, MergeObjects};
pub use iterator::{next_cursor, PageIterator};
pub use local::LocalBackend;
pub use query::{OrderBy, Query};
pub use remote::RemoteBackend;
pub use rules::RULES_PATH;
pub use sink::{EventSink, NullSink, OperationEvent, TracingSink};
