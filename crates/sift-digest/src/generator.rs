use chrono::Utc;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use sift_core::{is_possibly_truncated, Category, DigestStory, ProjectConfig};
use sift_sources::fetch_full_content;
use sift_store::{ContentStore, PendingStory};

use crate::narrative::NarrativeGenerator;
use crate::writer::{next_sequence, render_markdown, write_digest_files};
use crate::DigestError;

#[derive(Debug, Clone)]
/// Settings for one digest run.
pub struct DigestOptions {
    pub limit: usize,
    pub output_dir: PathBuf,
    /// Render without writing files or marking anything sent.
    pub dry_run: bool,
}

impl Default for DigestOptions {
    fn default() -> Self {
        Self {
            limit: 15,
            output_dir: PathBuf::from("outputs/digests"),
            dry_run: false,
        }
    }
}

/// What one digest run produced.
#[derive(Debug)]
pub struct DigestOutcome {
    pub digest_id: String,
    pub stories: Vec<DigestStory>,
    /// Candidates dropped because narrative generation failed; they
    /// stay pending for the next run.
    pub generation_failures: usize,
    /// Item ids whose digest marker was written this run.
    pub marked: Vec<String>,
    pub markdown_path: Option<PathBuf>,
    pub json_path: Option<PathBuf>,
}

/// Selects pending SIGNAL stories, narrates them, writes the digest,
/// and marks the narrated items sent.
pub struct DigestGenerator {
    store: Arc<dyn ContentStore>,
    narrator: Arc<dyn NarrativeGenerator>,
    http: reqwest::Client,
}

impl DigestGenerator {
    pub fn new(
        store: Arc<dyn ContentStore>,
        narrator: Arc<dyn NarrativeGenerator>,
        http: reqwest::Client,
    ) -> Self {
        Self {
            store,
            narrator,
            http,
        }
    }

    pub async fn run(
        &self,
        config: &ProjectConfig,
        options: &DigestOptions,
    ) -> Result<DigestOutcome, DigestError> {
        let project = config.name.as_str();
        let pending = self
            .store
            .pending_for_digest(project, &Category::SIGNAL, config.min_confidence, options.limit)
            .await?;

        let now = Utc::now();
        let date = now.format("%Y-%m-%d").to_string();
        let sequence = next_sequence(&options.output_dir, project, &date);
        let digest_id = format!("digest_{project}_{date}_{sequence:02}");

        info!(
            %project,
            candidates = pending.len(),
            %digest_id,
            "starting digest run"
        );

        let mut stories = Vec::new();
        let mut generation_failures = 0;

        for (index, PendingStory { item, classification }) in pending.into_iter().enumerate() {
            let mut content = item.content.clone();
            if is_possibly_truncated(&content) {
                if let Some(full) = fetch_full_content(&self.http, &item.url).await {
                    content = full;
                }
            }

            match self.narrator.generate(&item, &content, &config.topic).await {
                Ok(narrative) => stories.push(DigestStory {
                    id: format!("{date}_{sequence:02}_{index:03}", index = index + 1),
                    item_id: item.id,
                    title: narrative.title,
                    body: narrative.body,
                    commentary: narrative.commentary,
                    source: item.source,
                    url: item.url,
                    category: classification.category,
                    topic_tags: classification.topic_tags,
                    format_tag: classification.format_tag,
                }),
                Err(error) => {
                    // Skipped stories keep their pending marker and are
                    // picked up by the next run.
                    warn!(item_id = %item.id, %error, "narrative generation failed, skipping");
                    generation_failures += 1;
                }
            }
        }

        if stories.is_empty() {
            return Ok(DigestOutcome {
                digest_id,
                stories,
                generation_failures,
                marked: Vec::new(),
                markdown_path: None,
                json_path: None,
            });
        }

        let mut outcome = DigestOutcome {
            digest_id: digest_id.clone(),
            marked: Vec::new(),
            markdown_path: None,
            json_path: None,
            generation_failures,
            stories,
        };

        if options.dry_run {
            return Ok(outcome);
        }

        let markdown = render_markdown(
            project,
            &date,
            &now.format("%Y-%m-%d %H:%M").to_string(),
            &outcome.stories,
        );
        let (markdown_path, json_path) =
            write_digest_files(&options.output_dir, &digest_id, &markdown, &outcome.stories)?;

        // Marking happens only after every narrative call finished and
        // the files are on disk.
        let item_ids: Vec<String> = outcome
            .stories
            .iter()
            .map(|story| story.item_id.clone())
            .collect();
        self.store.mark_sent(&item_ids, project, now).await?;
        self.store
            .record_digest(&digest_id, project, now, outcome.stories.len())
            .await?;

        outcome.marked = item_ids;
        outcome.markdown_path = Some(markdown_path);
        outcome.json_path = Some(json_path);
        Ok(outcome)
    }
}
