//! Cursor pagination over a collection
//!
//! Pages are fetched ordered by key, starting at a cursor and limited to
//! `limit` children. A full page moves the cursor just past its last key; a
//! short page ends the iteration.
//!
//! Cursor sequence for `{abcd, efgh}` with `limit = 1`:
//!
//! ```text
//! ""  -> [abcd]  cursor "abce"
//! "abce" -> [efgh]  cursor "efgi"
//! "efgi" -> []   DONE
//! ```

use crate::client::Client;
use crate::local::compare_keys;
use fireman_core::{to_page, Error, Page, Result};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

/// Cursor that sorts immediately after `key`.
///
/// All-digit keys get their decimal successor (`"41"` -> `"42"`); other keys
/// have their last character's code point incremented (`"abcd"` ->
/// `"abce"`). The empty key is followed by `"\0"`.
///
/// # Errors
///
/// Returns `Error::InvalidKey` when the last character has no successor
/// code point (`char::MAX`, or the character just below the surrogate
/// range). Such keys cannot be paged past.
///
/// # Limitations
///
/// The successor does not always sort after `key` in the service's key
/// order, and a full page ending on such a key is fetched again forever:
/// - negative integer keys: `"-5"` gives `"-6"`, which sorts before `"-5"`
/// - all-digit keys that are not canonical integers: `"007"` is ordered as
///   a string, but its successor `"8"` is an integer and sorts before every
///   string key
pub fn next_cursor(key: &str) -> Result<String> {
    if key.bytes().all(|b| b.is_ascii_digit()) {
        if let Some(next) = key.parse::<u64>().ok().and_then(|n| n.checked_add(1)) {
            return Ok(next.to_string());
        }
    }
    let mut chars = key.chars();
    let Some(last) = chars.next_back() else {
        return Ok("\0".to_string());
    };
    let next = char::from_u32(u32::from(last) + 1)
        .ok_or_else(|| Error::invalid_key(key, "last character has no successor"))?;
    Ok(format!("{}{}", chars.as_str(), next))
}

/// Releases the busy flag however the fetch ends
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Sequential page reader for one collection.
///
/// Only one fetch may be outstanding: calling [`next`](Self::next) again
/// before the previous call resolved fails with `Error::IteratorBusy`
/// instead of queueing.
pub struct PageIterator {
    client: Client,
    path: String,
    limit: usize,
    /// `None` once the collection is exhausted
    cursor: Mutex<Option<String>>,
    busy: AtomicBool,
}

impl std::fmt::Debug for PageIterator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageIterator")
            .field("path", &self.path)
            .field("limit", &self.limit)
            .field("cursor", &*self.cursor.lock())
            .field("busy", &self.busy.load(Ordering::Acquire))
            .finish()
    }
}

impl PageIterator {
    /// Iterator over `path` in pages of `limit` children
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidQuery` when `limit` is 0.
    pub fn new(client: Client, path: impl Into<String>, limit: usize) -> Result<Self> {
        if limit == 0 {
            return Err(Error::InvalidQuery("page limit must be at least 1".to_string()));
        }
        Ok(Self {
            client,
            path: path.into(),
            limit,
            cursor: Mutex::new(Some(String::new())),
            busy: AtomicBool::new(false),
        })
    }

    /// Page size
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Cursor the next fetch starts at; `None` when done
    pub fn cursor(&self) -> Option<String> {
        self.cursor.lock().clone()
    }

    /// True once a short page has been returned
    pub fn is_done(&self) -> bool {
        self.cursor.lock().is_none()
    }

    /// Fetch the next page, ordered by key. `Ok(None)` once done.
    ///
    /// A failed fetch leaves the cursor where it was, so the call can be
    /// repeated.
    pub async fn next(&self) -> Result<Option<Page>> {
        if self.busy.swap(true, Ordering::AcqRel) {
            return Err(Error::IteratorBusy);
        }
        let _guard = BusyGuard(&self.busy);

        let Some(cursor) = self.cursor() else {
            return Ok(None);
        };
        let fetched = self.client.batch(&self.path, &cursor, self.limit).await?;
        let mut entries: Vec<_> = to_page(fetched)?.into_iter().collect();
        entries.sort_by(|(a, _), (b, _)| compare_keys(a, b));

        let next = match entries.last() {
            Some((last, _)) if entries.len() >= self.limit => Some(next_cursor(last)?),
            _ => None,
        };
        tracing::debug!(
            target: "fireman::iterator",
            path = %self.path,
            cursor = %cursor,
            items = entries.len(),
            done = next.is_none(),
            "Fetched page"
        );
        *self.cursor.lock() = next;
        Ok(Some(entries.into_iter().collect()))
    }
}
