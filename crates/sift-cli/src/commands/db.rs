//! `sift db`: schema setup, connectivity checks, and history.

use sift_store::ContentStore;

use crate::cli_args::DbCommand;

use super::AppContext;

pub async fn run(context: &AppContext, command: DbCommand) -> anyhow::Result<()> {
    match command {
        DbCommand::Init => init(context),
        DbCommand::Test => test(context).await,
        DbCommand::Stats => stats(context).await,
        DbCommand::History { community, limit } => {
            history(context, community.as_deref(), limit).await
        }
    }
}

fn init(context: &AppContext) -> anyhow::Result<()> {
    // Opening the store creates the file and schema when missing.
    context.open_store()?;
    println!("Database ready at {}", context.db_path.display());
    Ok(())
}

async fn test(context: &AppContext) -> anyhow::Result<()> {
    let store = context.open_store()?;
    store.stats().await?;
    println!("Connection ok: {}", context.db_path.display());
    Ok(())
}

async fn stats(context: &AppContext) -> anyhow::Result<()> {
    let store = context.open_store()?;
    let stats = store.stats().await?;
    println!("items            {}", stats.items);
    println!("classifications  {}", stats.classifications);
    println!("digests          {}", stats.digests);
    println!("bookmarks        {}", stats.bookmarks);
    Ok(())
}

async fn history(
    context: &AppContext,
    community: Option<&str>,
    limit: usize,
) -> anyhow::Result<()> {
    let store = context.open_store()?;
    let records = store.scan_history(community, limit).await?;
    if records.is_empty() {
        println!("No scan history found");
        return Ok(());
    }

    println!(
        "{:<17} {:<20} {:<12} {:>7} {:>6} {:>7} {:>8}",
        "date", "community", "source", "fetched", "new", "cached", "signal%"
    );
    for record in &records {
        println!(
            "{:<17} {:<20} {:<12} {:>7} {:>6} {:>7} {:>7.1}%",
            record.scanned_at.format("%Y-%m-%d %H:%M"),
            record.community,
            record.source,
            record.fetched,
            record.newly_classified,
            record.cache_hits,
            record.signal_ratio * 100.0
        );
    }
    Ok(())
}
