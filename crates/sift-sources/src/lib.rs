//! Source adapters that turn external feeds into canonical items.
//!
//! Each adapter implements the same `fetch(config, limit)` contract and
//! mints globally unique, source-prefixed item ids. Adapters never
//! classify or persist; they only normalize.
mod hackernews;
mod reddit;
mod refetch;

use async_trait::async_trait;
use thiserror::Error;

use sift_core::{Item, ProjectConfig};

pub use hackernews::HackerNewsSource;
pub use reddit::RedditSource;
pub use refetch::{fetch_full_content, REFETCH_MAX_CHARS};

#[derive(Debug, Error)]
/// Enumerates supported `SourceError` values.
pub enum SourceError {
    #[error("unknown source {0}")]
    UnknownSource(String),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("source {adapter} returned status {status}")]
    Status { adapter: &'static str, status: u16 },
    #[error("source {adapter} returned an unexpected payload: {detail}")]
    Malformed {
        adapter: &'static str,
        detail: String,
    },
}

#[async_trait]
/// Trait contract for `SourceAdapter` behavior.
pub trait SourceAdapter: Send + Sync {
    fn name(&self) -> &'static str;

    /// Fetches up to `limit` items for the project. A failure here
    /// aborts only this source for the current run.
    async fn fetch(&self, config: &ProjectConfig, limit: usize) -> Result<Vec<Item>, SourceError>;
}

/// Names of the built-in adapters, in registry order.
pub const SOURCE_NAMES: [&str; 2] = ["reddit", "hackernews"];

/// Builds an adapter by name against the public endpoints.
pub fn create_source(name: &str) -> Result<Box<dyn SourceAdapter>, SourceError> {
    match name {
        "reddit" => Ok(Box::new(RedditSource::new()?)),
        "hackernews" | "hn" => Ok(Box::new(HackerNewsSource::new()?)),
        other => Err(SourceError::UnknownSource(other.to_string())),
    }
}

/// All built-in adapters, for scans that cover every source.
pub fn all_sources() -> Result<Vec<Box<dyn SourceAdapter>>, SourceError> {
    SOURCE_NAMES.iter().map(|name| create_source(name)).collect()
}

pub(crate) fn http_client() -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .user_agent("sift/0.1 (content digest pipeline)")
        .timeout(std::time::Duration::from_secs(15))
        .build()
}
