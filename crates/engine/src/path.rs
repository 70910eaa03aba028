//! Database path handling
//!
//! Paths are slash-separated; leading, trailing and repeated slashes are
//! ignored, so `""`, `"/"` and `"//"` all name the root.

/// Non-empty segments of a path
pub fn segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// Canonical form: segments joined by single slashes, no leading slash
pub fn normalize(path: &str) -> String {
    segments(path).join("/")
}

/// Path of `key` under `parent`
pub fn child(parent: &str, key: &str) -> String {
    let parent = normalize(parent);
    let key = normalize(key);
    match (parent.is_empty(), key.is_empty()) {
        (true, _) => key,
        (_, true) => parent,
        _ => format!("{parent}/{key}"),
    }
}
