//! Request path normalisation.
//!
//! Routes are matched against the percent-decoded path, so `%20` in a
//! request reaches handlers as a space and `/caf%C3%A9` matches `/café`.
//! A decoded `%2F` is an ordinary separator.

use std::borrow::Cow;

/// Percent-decode a request path. Paths that do not decode to UTF-8 are
/// returned as received.
pub fn decode(path: &str) -> Cow<'_, str> {
    match urlencoding::decode(path) {
        Ok(decoded) => decoded,
        Err(_) => {
            tracing::debug!(path = %path, "Request path is not UTF-8 once decoded, matching raw");
            Cow::Borrowed(path)
        }
    }
}

/// Percent-encode a decoded path segment by segment, keeping the `/`
/// separators.
pub fn encode(path: &str) -> String {
    path.split('/')
        .map(urlencoding::encode)
        .collect::<Vec<_>>()
        .join("/")
}

/// Lexically clean an absolute path: collapse repeated slashes, drop `.`
/// segments and resolve `..` without climbing above the root. A trailing
/// slash survives.
pub fn clean(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }

    let mut cleaned = String::with_capacity(path.len() + 1);
    for segment in &segments {
        cleaned.push('/');
        cleaned.push_str(segment);
    }
    if cleaned.is_empty() || path.ends_with('/') {
        cleaned.push('/');
    }
    cleaned
}
