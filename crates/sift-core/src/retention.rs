//! Category-driven content retention policy.
//!
//! Applied exactly once, after classification (which must see the full
//! content) and before the item is persisted.

use std::borrow::Cow;

use crate::taxonomy::{Category, CategoryGroup};

/// Retained characters for signal, meta, and outlier content.
pub const RETAIN_SIGNAL_CHARS: usize = 5000;

/// Retained characters for noise and unrelated content.
pub const RETAIN_NOISE_CHARS: usize = 500;

/// Character budget for a category.
pub fn retention_limit(category: Category) -> usize {
    match category.group() {
        CategoryGroup::Noise | CategoryGroup::Unrelated => RETAIN_NOISE_CHARS,
        CategoryGroup::Signal | CategoryGroup::Meta | CategoryGroup::Other => RETAIN_SIGNAL_CHARS,
    }
}

/// Truncates `content` to the category's retention budget.
///
/// Counts characters rather than bytes so multi-byte text is never split
/// mid-codepoint. Content at or under the budget is returned borrowed.
pub fn retain(category: Category, content: &str) -> Cow<'_, str> {
    let limit = retention_limit(category);
    match content.char_indices().nth(limit) {
        Some((offset, _)) => Cow::Owned(content[..offset].to_string()),
        None => Cow::Borrowed(content),
    }
}

/// Heuristic used by the digest selector: retained content of exactly the
/// signal budget is treated as possibly truncated. Genuinely 5000-character
/// content is indistinguishable after truncation; the ambiguity is accepted
/// and resolved by attempting a best-effort refetch.
pub fn is_possibly_truncated(content: &str) -> bool {
    content.chars().count() == RETAIN_SIGNAL_CHARS
}
