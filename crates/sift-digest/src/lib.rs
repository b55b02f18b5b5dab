//! Digest selection, narrative generation, and output writing.
//!
//! Selection is idempotent: an item enters at most one digest per
//! project, enforced by the set-once `sent_in_digest_at` marker. A story
//! whose narrative call fails is skipped and stays pending for the next
//! run; nothing is marked until every narrative call has finished.
mod generator;
mod narrative;
mod writer;

use thiserror::Error;

pub use generator::{DigestGenerator, DigestOptions, DigestOutcome};
pub use narrative::{
    GenerationError, LlmNarrativeGenerator, Narrative, NarrativeConfig, NarrativeGenerator,
};
pub use writer::{render_markdown, write_digest_files};

#[derive(Debug, Error)]
/// Enumerates supported `DigestError` values.
pub enum DigestError {
    #[error(transparent)]
    Store(#[from] sift_store::StoreError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
