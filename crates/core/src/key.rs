//! Time-ordered key codec
//!
//! Keys are 20 characters long: an 8-character timestamp segment followed by
//! 12 characters of randomness, all drawn from a 64-symbol alphabet whose
//! byte order equals its index order. Comparing two keys as strings therefore
//! compares their timestamps first.
//!
//! ```
//! use fireman_core::key::{decode_timestamp, key_for_timestamp};
//!
//! let key = key_for_timestamp(1_486_072_494_923).unwrap();
//! assert!(key.starts_with("-Kc-ofhA"));
//! assert_eq!(decode_timestamp(&key).unwrap(), 1_486_072_494_923);
//! ```

use crate::error::{Error, Result};
use rand::{Rng, RngCore};

/// Ordered key alphabet; `ALPHABET[i] < ALPHABET[i + 1]` as bytes
pub const ALPHABET: &[u8; 64] = b"-0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ_abcdefghijklmnopqrstuvwxyz";

/// Characters in the timestamp segment
pub const TIMESTAMP_LENGTH: usize = 8;

/// Characters in the randomness segment
pub const RANDOM_LENGTH: usize = 12;

/// Total key length
pub const KEY_LENGTH: usize = TIMESTAMP_LENGTH + RANDOM_LENGTH;

/// Largest timestamp a key can carry (2^48 - 1)
pub const MAX_TIMESTAMP: i64 = (1 << 48) - 1;

/// Source of the current time in milliseconds since the Unix epoch
pub trait Clock: Send + Sync {
    /// Current time in milliseconds
    fn now_millis(&self) -> i64;
}

/// Wall clock backed by `chrono`
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

fn symbol_index(c: u8) -> Option<u8> {
    match c {
        b'-' => Some(0),
        b'0'..=b'9' => Some(c - b'0' + 1),
        b'A'..=b'Z' => Some(c - b'A' + 11),
        b'_' => Some(37),
        b'a'..=b'z' => Some(c - b'a' + 38),
        _ => None,
    }
}

/// Encode a timestamp into the 8-character timestamp segment
pub fn encode_timestamp(timestamp: i64) -> Result<String> {
    if !(0..=MAX_TIMESTAMP).contains(&timestamp) {
        return Err(Error::TimestampOutOfRange { timestamp });
    }
    let mut segment = [0u8; TIMESTAMP_LENGTH];
    let mut remaining = timestamp as u64;
    for slot in segment.iter_mut().rev() {
        *slot = ALPHABET[(remaining & 0x3f) as usize];
        remaining >>= 6;
    }
    Ok(segment.iter().map(|&b| b as char).collect())
}

/// Encode a timestamp plus fresh randomness into a full key
pub fn encode_key<R: RngCore + ?Sized>(timestamp: i64, rng: &mut R) -> Result<String> {
    let mut key = encode_timestamp(timestamp)?;
    key.reserve(RANDOM_LENGTH);
    for _ in 0..RANDOM_LENGTH {
        key.push(ALPHABET[rng.gen_range(0..ALPHABET.len())] as char);
    }
    Ok(key)
}

/// Decode the timestamp carried by a key's first 8 characters
pub fn decode_timestamp(key: &str) -> Result<u64> {
    let bytes = key.as_bytes();
    if bytes.len() < TIMESTAMP_LENGTH {
        return Err(Error::invalid_key(
            key,
            format!("expected at least {TIMESTAMP_LENGTH} characters"),
        ));
    }
    bytes[..TIMESTAMP_LENGTH]
        .iter()
        .enumerate()
        .try_fold(0u64, |acc, (position, &c)| match symbol_index(c) {
            Some(index) => Ok((acc << 6) | u64::from(index)),
            None => Err(Error::invalid_key(
                key,
                format!("character at position {position} is outside the key alphabet"),
            )),
        })
}

/// Mint a key for the given timestamp using the thread-local RNG
pub fn key_for_timestamp(timestamp: i64) -> Result<String> {
    encode_key(timestamp, &mut rand::thread_rng())
}

/// Generates strictly increasing keys.
///
/// Keys minted in the same millisecond reuse the previous randomness
/// segment incremented by one, so they never collide and still sort in
/// creation order. A clock that steps backwards is held at the last
/// timestamp used until it catches up.
pub struct KeyGenerator<C: Clock = SystemClock> {
    clock: C,
    last_timestamp: i64,
    last_random: [u8; RANDOM_LENGTH],
}

impl KeyGenerator<SystemClock> {
    /// Generator on the system clock
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for KeyGenerator<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> KeyGenerator<C> {
    /// Generator on a custom clock
    pub fn with_clock(clock: C) -> Self {
        Self {
            clock,
            last_timestamp: -1,
            last_random: [0; RANDOM_LENGTH],
        }
    }

    /// Mint the next key with the thread-local RNG
    pub fn next_key(&mut self) -> Result<String> {
        self.next_key_with(&mut rand::thread_rng())
    }

    /// Mint the next key drawing randomness from `rng`
    pub fn next_key_with<R: RngCore + ?Sized>(&mut self, rng: &mut R) -> Result<String> {
        let mut now = self.clock.now_millis();
        if self.last_timestamp >= 0 && now < self.last_timestamp {
            now = self.last_timestamp;
        }
        let mut key = encode_timestamp(now)?;

        if now == self.last_timestamp {
            increment_random(&mut self.last_random);
        } else {
            self.last_timestamp = now;
            for digit in self.last_random.iter_mut() {
                *digit = rng.gen_range(0..ALPHABET.len() as u8);
            }
        }

        key.extend(self.last_random.iter().map(|&i| ALPHABET[i as usize] as char));
        Ok(key)
    }
}

/// Add one to a base-64 digit string, carrying leftwards; wraps at the top
fn increment_random(digits: &mut [u8; RANDOM_LENGTH]) {
    for digit in digits.iter_mut().rev() {
        if *digit == 63 {
            *digit = 0;
        } else {
            *digit += 1;
            return;
        }
    }
}
