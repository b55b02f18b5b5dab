//! `sift bookmark`: keep track of digest stories worth revisiting.

use std::path::Path;

use anyhow::{bail, Context};
use chrono::{NaiveDate, Utc};

use sift_core::{Bookmark, BookmarkStatus, DigestStory};
use sift_store::{ContentStore, StoreError};

use crate::cli_args::BookmarkCommand;

use super::AppContext;

pub async fn run(context: &AppContext, command: BookmarkCommand) -> anyhow::Result<()> {
    match command {
        BookmarkCommand::Show {
            digest_id,
            output_dir,
        } => show(&output_dir, &digest_id),
        BookmarkCommand::Add {
            story_id,
            project,
            note,
            status,
            output_dir,
        } => add(context, &story_id, &project, note, &status, &output_dir).await,
        BookmarkCommand::List { status, limit } => list(context, status.as_deref(), limit).await,
        BookmarkCommand::Status { story_id, status } => {
            update(context, &story_id, &status).await
        }
        BookmarkCommand::Done { story_id } => update(context, &story_id, "done").await,
    }
}

fn show(output_dir: &Path, digest_id: &str) -> anyhow::Result<()> {
    let stories = load_stories(output_dir, digest_id)?;
    println!("{digest_id}: {} stories", stories.len());
    for story in &stories {
        println!("  {}  [{}] {}", story.id, story.category.as_str(), story.title);
        println!("         {}", story.url);
    }
    Ok(())
}

async fn add(
    context: &AppContext,
    story_id: &str,
    project: &str,
    note: Option<String>,
    status: &str,
    output_dir: &Path,
) -> anyhow::Result<()> {
    let Some(status) = BookmarkStatus::parse(status) else {
        bail!("invalid status '{status}', use: to_read, to_implement, done");
    };

    let (date, sequence) = split_story_id(story_id)?;
    let digest_id = format!("digest_{project}_{date}_{sequence}");
    let stories = load_stories(output_dir, &digest_id)?;
    let Some(story) = stories.iter().find(|story| story.id == story_id) else {
        bail!("story {story_id} not found in {digest_id}");
    };

    let now = Utc::now();
    let bookmark = Bookmark {
        story_id: story.id.clone(),
        digest_date: date.to_string(),
        title: story.title.clone(),
        url: story.url.clone(),
        source: story.source.clone(),
        category: story.category,
        topic_tags: story.topic_tags.clone(),
        format_tag: story.format_tag.clone(),
        item_id: Some(story.item_id.clone()),
        notes: note,
        status,
        created_at: now,
        updated_at: now,
    };

    let store = context.open_store()?;
    match store.add_bookmark(&bookmark).await {
        Ok(()) => {
            println!("Bookmarked {story_id}: {}", story.title);
            Ok(())
        }
        Err(StoreError::BookmarkAlreadyExists(_)) => {
            println!("Already bookmarked: {story_id}");
            Ok(())
        }
        Err(error) => Err(error.into()),
    }
}

async fn list(context: &AppContext, status: Option<&str>, limit: usize) -> anyhow::Result<()> {
    let filter = match status {
        None | Some("all") => None,
        Some(value) => match BookmarkStatus::parse(value) {
            Some(status) => Some(status),
            None => bail!("invalid status '{value}', use: to_read, to_implement, done, all"),
        },
    };

    let store = context.open_store()?;
    let bookmarks = store.list_bookmarks(filter, limit).await?;
    if bookmarks.is_empty() {
        println!("No bookmarks found");
        return Ok(());
    }

    for bookmark in &bookmarks {
        println!(
            "{}  [{}] {}",
            bookmark.story_id,
            bookmark.status.as_str(),
            bookmark.title
        );
        if let Some(notes) = &bookmark.notes {
            println!("         note: {notes}");
        }
    }
    Ok(())
}

async fn update(context: &AppContext, story_id: &str, status: &str) -> anyhow::Result<()> {
    let Some(status) = BookmarkStatus::parse(status) else {
        bail!("invalid status '{status}', use: to_read, to_implement, done");
    };

    let store = context.open_store()?;
    if store.update_bookmark_status(story_id, status).await? {
        println!("Updated {story_id} to {}", status.as_str());
        Ok(())
    } else {
        bail!("bookmark not found: {story_id}");
    }
}

fn load_stories(output_dir: &Path, digest_id: &str) -> anyhow::Result<Vec<DigestStory>> {
    let path = output_dir.join(format!("{digest_id}.json"));
    let raw = std::fs::read_to_string(&path)
        .with_context(|| format!("digest not found: {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("malformed digest file {}", path.display()))
}

/// Splits `2026-08-30_01_003` into its date and digest sequence parts.
fn split_story_id(story_id: &str) -> anyhow::Result<(&str, &str)> {
    let parts: Vec<&str> = story_id.split('_').collect();
    if parts.len() != 3
        || NaiveDate::parse_from_str(parts[0], "%Y-%m-%d").is_err()
        || parts[1].len() != 2
    {
        bail!("invalid story id '{story_id}', expected YYYY-MM-DD_NN_NNN");
    }
    Ok((parts[0], parts[1]))
}
