//! Fireman - resilient paginated client for hierarchical JSON databases
//!
//! Fireman reads and writes a Firebase-style realtime database, either the
//! hosted REST service or a local in-memory emulation backed by a JSON
//! file, and walks large collections page by page with bounded
//! concurrency.
//!
//! # Quick Start
//!
//! ```ignore
//! use fireman::{json, Client, ClientConfig};
//!
//! let client = Client::from_config(&ClientConfig::local("database.json"))?;
//! client.put("user/abcd", json!({"name": "Joshua Moreno", "age": 85})).await?;
//!
//! client
//!     .iterate("user", 100, 8, |key, user| async move {
//!         println!("{key} is {}", user["age"]);
//!         Ok(())
//!     })
//!     .await?;
//! ```
//!
//! # Architecture
//!
//! - `fireman-core`: key codec, JSON diff/merge, error taxonomy
//! - `fireman-concurrency`: retry with backoff, bounded executor
//! - `fireman-engine`: client, backends, pagination, config, rules

pub use fireman_concurrency::{retry, run_all, RetryConfig};
pub use fireman_core::{
    decode_timestamp, diff, encode_key, key_for_timestamp, merge, to_page, Clock, Error,
    KeyGenerator, Page, Result, SystemClock,
};
pub use fireman_engine::*;
pub use serde_json::{json, Map, Value};
