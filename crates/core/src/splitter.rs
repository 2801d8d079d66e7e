//! # Output Splitter
//!
//! Partitions the final generated text into a primary document and an
//! ordered list of fragments (slides) at a literal sentinel token. Plain
//! substring matching; the caller picks a sentinel that the generator was
//! instructed to emit and that will not collide with ordinary content.

use serde::{Deserialize, Serialize};

/// A document plus the fragments that followed it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitResult {
    /// Text preceding the first sentinel, or the whole input if the
    /// sentinel never occurs.
    pub document: String,
    /// Trimmed pieces after each sentinel, noise filtered out, in order.
    pub fragments: Vec<String>,
}

/// Split `text` at every occurrence of `sentinel`.
///
/// The first piece becomes the document (trimmed when a split actually
/// happened). Remaining pieces are trimmed and kept only if non-empty and
/// at least `min_len` characters long, which drops the empty pieces a
/// sentinel at a text boundary produces. An empty sentinel is treated as
/// absent.
pub fn split(text: &str, sentinel: &str, min_len: usize) -> SplitResult {
    if sentinel.is_empty() || !text.contains(sentinel) {
        return SplitResult {
            document: text.to_string(),
            fragments: Vec::new(),
        };
    }

    let mut pieces = text.split(sentinel);
    let document = pieces.next().unwrap_or_default().trim().to_string();

    let fragments = pieces
        .map(str::trim)
        .filter(|piece| !piece.is_empty() && piece.chars().count() >= min_len)
        .map(str::to_string)
        .collect();

    SplitResult {
        document,
        fragments,
    }
}
