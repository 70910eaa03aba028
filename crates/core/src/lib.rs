//! Core types for fireman
//!
//! This crate defines the foundational pieces used throughout the client:
//! - Error: Error type hierarchy
//! - key: Time-ordered key codec and key generator
//! - json: Structural diff, shallow merge, page normalization

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod json;
pub mod key;

pub use error::{Error, Result};
pub use json::{diff, merge, to_page, Page};
pub use key::{decode_timestamp, encode_key, key_for_timestamp, Clock, KeyGenerator, SystemClock};
