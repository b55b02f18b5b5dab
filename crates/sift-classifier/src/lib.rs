//! Batch classification of content items against the fixed taxonomy.
//!
//! The classifier never leaves an item behind: a failed batch call drops
//! to per-item calls, and a failed per-item call yields an outlier
//! fallback with zero confidence. Callers always get exactly one
//! classification per submitted item.
mod classifier;
mod prompt;
mod response;

pub use classifier::{BatchClassifier, ClassifierConfig, ClassifyOutcome, DEFAULT_BATCH_SIZE};
pub use response::{parse_batch_response, ResponseError, ValidatedEntry};

/// Reasoning text attached to items whose classification could not be
/// recovered through the failure ladder.
pub const FALLBACK_REASONING: &str = "classification_failed";
