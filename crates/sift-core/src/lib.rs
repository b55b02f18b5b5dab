//! Core types shared across Sift crates.
//!
//! Holds the classification taxonomy, the canonical item and classification
//! models, the content retention policy, and per-project configuration.

pub mod models;
pub mod project;
pub mod retention;
pub mod taxonomy;

pub use models::{
    Bookmark, BookmarkStatus, Classification, DigestStory, Item, ScanRecord, ScanReport,
};
pub use project::{ProjectConfig, ProjectError, ProjectLoader};
pub use retention::{is_possibly_truncated, retain, RETAIN_NOISE_CHARS, RETAIN_SIGNAL_CHARS};
pub use taxonomy::{normalize_category, Category, CategoryGroup};
