//! Markdown and JSON output for generated digests.

use std::fs;
use std::path::{Path, PathBuf};

use sift_core::DigestStory;

use crate::DigestError;

/// Next free sequence number for `digest_<project>_<date>_NN.md` in the
/// output directory.
pub fn next_sequence(output_dir: &Path, project: &str, date: &str) -> u32 {
    let prefix = format!("digest_{project}_{date}_");
    let mut highest = 0;
    if let Ok(entries) = fs::read_dir(output_dir) {
        for entry in entries.flatten() {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            let Some(rest) = name.strip_prefix(&prefix) else {
                continue;
            };
            if let Ok(number) = rest.trim_end_matches(".md").trim_end_matches(".json").parse::<u32>()
            {
                highest = highest.max(number);
            }
        }
    }
    highest + 1
}

/// Renders the digest body shown to readers.
pub fn render_markdown(
    project: &str,
    date: &str,
    generated_at: &str,
    stories: &[DigestStory],
) -> String {
    let mut lines = vec![
        format!("# Daily Digest - {date}"),
        String::new(),
        format!(
            "*The {count} most relevant stories for project `{project}`*",
            count = stories.len()
        ),
        String::new(),
        "---".to_string(),
        String::new(),
    ];

    for (index, story) in stories.iter().enumerate() {
        lines.extend([
            format!("## {}. {}", index + 1, story.title),
            String::new(),
            story.body.clone(),
            String::new(),
            format!("**Source:** [{}]({})", story.source, story.url),
            String::new(),
            "### Commentary".to_string(),
            String::new(),
            story.commentary.clone(),
            String::new(),
            "---".to_string(),
            String::new(),
        ]);
    }

    lines.extend([
        String::new(),
        format!("*Generated by sift - project: {project}*"),
        format!("*Date: {generated_at}*"),
    ]);

    lines.join("\n")
}

/// Writes the markdown and JSON renditions side by side and returns
/// their paths.
pub fn write_digest_files(
    output_dir: &Path,
    digest_id: &str,
    markdown: &str,
    stories: &[DigestStory],
) -> Result<(PathBuf, PathBuf), DigestError> {
    fs::create_dir_all(output_dir)?;

    let markdown_path = output_dir.join(format!("{digest_id}.md"));
    fs::write(&markdown_path, markdown)?;

    let json_path = output_dir.join(format!("{digest_id}.json"));
    fs::write(&json_path, serde_json::to_string_pretty(stories)?)?;

    Ok((markdown_path, json_path))
}
