//! Concurrency layer for fireman
//!
//! This crate provides the two scheduling primitives the client is built on:
//! - retry: Exponential-backoff retry of fallible async operations
//! - executor: Bounded-concurrency execution with index-stable results
//!
//! Both are cooperative: they suspend on tokio timers and never spawn
//! threads or tasks of their own.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod executor;
pub mod retry;

pub use executor::run_all;
pub use retry::{retry, RetryConfig};
