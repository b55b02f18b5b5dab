//! Command handlers for the `sift` binary.

pub mod bookmark;
pub mod db;
pub mod digest;
pub mod info;
pub mod scan;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;

use sift_ai::{AnthropicClient, AnthropicConfig};
use sift_core::ProjectLoader;
use sift_store::SqliteContentStore;

/// Resolved global options shared by every command.
pub struct AppContext {
    pub projects: ProjectLoader,
    pub projects_dir: PathBuf,
    pub db_path: PathBuf,
    pub api_key: Option<String>,
    pub model: String,
}

impl AppContext {
    /// Opens the SQLite store, creating file and schema on first use.
    pub fn open_store(&self) -> anyhow::Result<Arc<SqliteContentStore>> {
        let store = SqliteContentStore::new(&self.db_path)
            .with_context(|| format!("failed to open database at {}", self.db_path.display()))?;
        Ok(Arc::new(store))
    }

    pub fn llm_client(&self) -> anyhow::Result<Arc<AnthropicClient>> {
        let client = AnthropicClient::new(AnthropicConfig {
            api_key: self.api_key.clone().unwrap_or_default(),
            ..AnthropicConfig::default()
        })
        .context("set ANTHROPIC_API_KEY or pass --api-key")?;
        Ok(Arc::new(client))
    }

    pub fn http_client(&self) -> anyhow::Result<reqwest::Client> {
        reqwest::Client::builder()
            .user_agent("sift/0.1 (content digest pipeline)")
            .timeout(std::time::Duration::from_secs(15))
            .build()
            .context("failed to build http client")
    }
}
