//! Clap argument models for the `sift` binary.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

fn parse_positive_usize(value: &str) -> Result<usize, String> {
    let parsed = value
        .parse::<usize>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(parsed)
}

fn parse_confidence(value: &str) -> Result<f64, String> {
    let parsed = value
        .parse::<f64>()
        .map_err(|error| format!("failed to parse float: {error}"))?;
    if !parsed.is_finite() || !(0.0..=1.0).contains(&parsed) {
        return Err("value must be in range 0.0..=1.0".to_string());
    }
    Ok(parsed)
}

#[derive(Debug, Parser)]
#[command(
    name = "sift",
    about = "Classification cache and digest pipeline for community feeds",
    version
)]
pub struct Cli {
    #[arg(
        long,
        env = "SIFT_PROJECTS_DIR",
        default_value = "projects",
        help = "Directory holding one subdirectory with config.toml per project"
    )]
    pub projects_dir: PathBuf,

    #[arg(
        long,
        env = "SIFT_DB_PATH",
        default_value = "outputs/sift.db",
        help = "SQLite database file for the classification cache"
    )]
    pub db_path: PathBuf,

    #[arg(
        long,
        env = "ANTHROPIC_API_KEY",
        hide_env_values = true,
        help = "Anthropic API key used for classification and narratives"
    )]
    pub api_key: Option<String>,

    #[arg(
        long,
        env = "SIFT_MODEL",
        default_value = "claude-sonnet-4-20250514",
        help = "Model used for classification and narrative generation"
    )]
    pub model: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch, classify, and cache items for a project
    Scan {
        #[arg(help = "Project name, a subdirectory of the projects directory")]
        project: String,

        #[arg(
            long,
            help = "Scan a single source (reddit, hackernews) instead of all"
        )]
        source: Option<String>,

        #[arg(
            long,
            default_value = "50",
            value_parser = parse_positive_usize,
            help = "Maximum number of items fetched per source"
        )]
        limit: usize,

        #[arg(
            long,
            help = "Classify everything fresh and skip the cache entirely"
        )]
        no_cache: bool,
    },

    /// Generate a digest from pending classified stories
    Digest {
        #[arg(help = "Project name, a subdirectory of the projects directory")]
        project: String,

        #[arg(
            long,
            default_value = "15",
            value_parser = parse_positive_usize,
            help = "Maximum number of stories in the digest"
        )]
        limit: usize,

        #[arg(
            long,
            value_parser = parse_confidence,
            help = "Override the project's minimum classification confidence"
        )]
        min_confidence: Option<f64>,

        #[arg(
            long,
            env = "SIFT_OUTPUT_DIR",
            default_value = "outputs/digests",
            help = "Directory for digest markdown and JSON files"
        )]
        output_dir: PathBuf,

        #[arg(
            long,
            help = "Select and narrate stories without writing files or marking them sent"
        )]
        dry_run: bool,
    },

    /// Manage bookmarks for stories worth keeping
    Bookmark {
        #[command(subcommand)]
        command: BookmarkCommand,
    },

    /// Database maintenance and statistics
    Db {
        #[command(subcommand)]
        command: DbCommand,
    },

    /// Show resolved configuration and discovered projects
    Info,
}

#[derive(Debug, Subcommand)]
pub enum BookmarkCommand {
    /// List the stories of a written digest
    Show {
        #[arg(help = "Digest id, e.g. digest_myproject_2026-08-30_01")]
        digest_id: String,

        #[arg(
            long,
            env = "SIFT_OUTPUT_DIR",
            default_value = "outputs/digests",
            help = "Directory holding digest JSON files"
        )]
        output_dir: PathBuf,
    },

    /// Bookmark a story from a written digest
    Add {
        #[arg(help = "Story id from a digest, e.g. 2026-08-30_01_003")]
        story_id: String,

        #[arg(long, help = "Project the digest belongs to")]
        project: String,

        #[arg(long, help = "Optional note attached to the bookmark")]
        note: Option<String>,

        #[arg(
            long,
            default_value = "to_read",
            help = "Initial status: to_read, to_implement, done"
        )]
        status: String,

        #[arg(
            long,
            env = "SIFT_OUTPUT_DIR",
            default_value = "outputs/digests",
            help = "Directory holding digest JSON files"
        )]
        output_dir: PathBuf,
    },

    /// List saved bookmarks
    List {
        #[arg(long, help = "Filter by status: to_read, to_implement, done")]
        status: Option<String>,

        #[arg(
            long,
            default_value = "20",
            value_parser = parse_positive_usize,
            help = "Maximum number of bookmarks to show"
        )]
        limit: usize,
    },

    /// Change a bookmark's status
    Status {
        #[arg(help = "Story id of the bookmark")]
        story_id: String,

        #[arg(help = "New status: to_read, to_implement, done")]
        status: String,
    },

    /// Mark a bookmark as done
    Done {
        #[arg(help = "Story id of the bookmark")]
        story_id: String,
    },
}

#[derive(Debug, Subcommand)]
pub enum DbCommand {
    /// Create the database file and schema
    Init,

    /// Open the database and run a connectivity check
    Test,

    /// Show row counts per table
    Stats,

    /// Show recent scan history
    History {
        #[arg(help = "Filter by community, e.g. a subreddit name")]
        community: Option<String>,

        #[arg(
            long,
            default_value = "10",
            value_parser = parse_positive_usize,
            help = "Number of history entries to show"
        )]
        limit: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::{parse_confidence, parse_positive_usize, Cli};
    use clap::Parser;

    #[test]
    fn validators_reject_out_of_range_values() {
        assert!(parse_positive_usize("0").is_err());
        assert!(parse_positive_usize("12").is_ok());
        assert!(parse_confidence("1.5").is_err());
        assert!(parse_confidence("nan").is_err());
        assert_eq!(parse_confidence("0.8"), Ok(0.8));
    }

    #[test]
    fn scan_defaults_apply() {
        let cli = Cli::parse_from(["sift", "scan", "myproject"]);
        match cli.command {
            super::Command::Scan {
                project,
                source,
                limit,
                no_cache,
            } => {
                assert_eq!(project, "myproject");
                assert!(source.is_none());
                assert_eq!(limit, 50);
                assert!(!no_cache);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
