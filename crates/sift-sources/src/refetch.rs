//! Best-effort full-content refetch for possibly-truncated items.

use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;
use tracing::{debug, warn};

/// Upper bound on recovered content; keeps narrative prompts sane.
pub const REFETCH_MAX_CHARS: usize = 15_000;

fn block_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"(?is)<script[^>]*>.*?</script>|<style[^>]*>.*?</style>|<nav[^>]*>.*?</nav>|<header[^>]*>.*?</header>|<footer[^>]*>.*?</footer>|<aside[^>]*>.*?</aside>|<form[^>]*>.*?</form>",
        )
        .expect("constant pattern")
    })
}

fn tag_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"<[^>]+>").expect("constant pattern"))
}

/// Tries to recover the full body behind `url`. Reddit permalinks go
/// through the public `.json` endpoint; HN item pages carry no body and
/// are skipped; anything else gets naive HTML text extraction. Every
/// failure is a `None`, never an error.
pub async fn fetch_full_content(client: &reqwest::Client, url: &str) -> Option<String> {
    if url.is_empty() {
        return None;
    }
    if url.contains("news.ycombinator.com") {
        return None;
    }

    let result = if url.contains("reddit.com") {
        fetch_reddit_selftext(client, url).await
    } else {
        fetch_external_text(client, url).await
    };

    match result {
        Ok(Some(content)) => {
            debug!(%url, chars = content.chars().count(), "recovered full content");
            Some(truncate_chars(&content, REFETCH_MAX_CHARS))
        }
        Ok(None) => None,
        Err(error) => {
            warn!(%url, %error, "full-content refetch failed");
            None
        }
    }
}

async fn fetch_reddit_selftext(
    client: &reqwest::Client,
    url: &str,
) -> Result<Option<String>, reqwest::Error> {
    let json_url = format!("{}.json", url.trim_end_matches('/'));
    let response = client.get(&json_url).send().await?;
    if !response.status().is_success() {
        return Ok(None);
    }

    // Permalink JSON is [listing, comments]; the post body lives at
    // listing.data.children[0].data.selftext.
    let payload: Value = response.json().await?;
    let selftext = payload
        .get(0)
        .and_then(|listing| listing.pointer("/data/children/0/data/selftext"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .filter(|text| !text.is_empty());
    Ok(selftext)
}

async fn fetch_external_text(
    client: &reqwest::Client,
    url: &str,
) -> Result<Option<String>, reqwest::Error> {
    let response = client.get(url).send().await?;
    if !response.status().is_success() {
        return Ok(None);
    }

    let html = response.text().await?;
    let without_blocks = block_pattern().replace_all(&html, " ");
    let text = tag_pattern().replace_all(&without_blocks, " ");
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        Ok(None)
    } else {
        Ok(Some(collapsed))
    }
}

fn truncate_chars(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((cut, _)) => text[..cut].to_string(),
        None => text.to_string(),
    }
}
