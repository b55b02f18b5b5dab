//! `sift` binary: scan community feeds, cache classifications, and
//! generate digests.

mod cli_args;
mod commands;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{filter::LevelFilter, EnvFilter};

use crate::cli_args::{Cli, Command};
use crate::commands::AppContext;

fn init_tracing() {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let context = AppContext {
        projects: sift_core::ProjectLoader::new(&cli.projects_dir),
        projects_dir: cli.projects_dir,
        db_path: cli.db_path,
        api_key: cli.api_key,
        model: cli.model,
    };

    match cli.command {
        Command::Scan {
            project,
            source,
            limit,
            no_cache,
        } => commands::scan::run(&context, &project, source.as_deref(), limit, no_cache).await,
        Command::Digest {
            project,
            limit,
            min_confidence,
            output_dir,
            dry_run,
        } => commands::digest::run(&context, &project, limit, min_confidence, output_dir, dry_run)
            .await,
        Command::Bookmark { command } => commands::bookmark::run(&context, command).await,
        Command::Db { command } => commands::db::run(&context, command).await,
        Command::Info => commands::info::run(&context),
    }
}
