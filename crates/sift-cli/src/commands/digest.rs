//! `sift digest`: narrate pending stories and write the digest files.

use std::path::PathBuf;
use std::sync::Arc;

use sift_digest::{DigestGenerator, DigestOptions, LlmNarrativeGenerator, NarrativeConfig};

use super::AppContext;

pub async fn run(
    context: &AppContext,
    project: &str,
    limit: usize,
    min_confidence: Option<f64>,
    output_dir: PathBuf,
    dry_run: bool,
) -> anyhow::Result<()> {
    let mut config = context.projects.load(project)?;
    if let Some(threshold) = min_confidence {
        config.min_confidence = threshold;
    }

    // The digest reads and marks cached rows; without the store there
    // is nothing to select from.
    let store = context.open_store()?;
    let client = context.llm_client()?;
    let narrator = Arc::new(LlmNarrativeGenerator::new(
        client,
        NarrativeConfig {
            model: context.model.clone(),
            ..NarrativeConfig::default()
        },
    ));

    let generator = DigestGenerator::new(store, narrator, context.http_client()?);
    let options = DigestOptions {
        limit,
        output_dir,
        dry_run,
    };

    let outcome = generator.run(&config, &options).await?;

    if outcome.stories.is_empty() {
        println!(
            "No pending stories above confidence {:.2} for project '{project}'",
            config.min_confidence
        );
        if outcome.generation_failures > 0 {
            println!(
                "{} candidates failed narrative generation and stay pending",
                outcome.generation_failures
            );
        }
        return Ok(());
    }

    println!("{}: {} stories", outcome.digest_id, outcome.stories.len());
    for story in &outcome.stories {
        println!("  {}  {}", story.id, story.title);
    }
    if outcome.generation_failures > 0 {
        println!(
            "{} candidates failed narrative generation and stay pending",
            outcome.generation_failures
        );
    }

    if dry_run {
        println!("Dry run: nothing written, nothing marked sent");
        return Ok(());
    }

    if let Some(path) = &outcome.markdown_path {
        println!("Wrote {}", path.display());
    }
    if let Some(path) = &outcome.json_path {
        println!("Wrote {}", path.display());
    }
    println!("Marked {} items as sent", outcome.marked.len());

    Ok(())
}
