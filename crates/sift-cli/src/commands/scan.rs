//! `sift scan`: fetch, classify, and cache items for a project.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use tracing::warn;

use sift_classifier::{BatchClassifier, ClassifierConfig};
use sift_core::{Category, Classification, Item, ScanRecord, ScanReport};
use sift_pipeline::IngestPipeline;
use sift_sources::{all_sources, create_source, SourceAdapter};
use sift_store::{ContentStore, InMemoryContentStore};

use super::AppContext;

pub async fn run(
    context: &AppContext,
    project: &str,
    source: Option<&str>,
    limit: usize,
    no_cache: bool,
) -> anyhow::Result<()> {
    let config = context.projects.load(project)?;
    let client = context.llm_client()?;
    let classifier = BatchClassifier::new(
        client,
        ClassifierConfig {
            model: context.model.clone(),
            ..ClassifierConfig::default()
        },
    );

    // A store outage degrades the scan to classify-only; a digest later
    // needs the cache, a scan does not.
    let store: Arc<dyn ContentStore> = if no_cache {
        println!("Cache bypassed, classifying everything fresh");
        Arc::new(InMemoryContentStore::new())
    } else {
        match context.open_store() {
            Ok(store) => store,
            Err(error) => {
                warn!(%error, "database unavailable, scanning without cache");
                Arc::new(InMemoryContentStore::new())
            }
        }
    };

    let pipeline = IngestPipeline::new(store.clone(), classifier);

    let single_source = source.is_some();
    let adapters: Vec<Box<dyn SourceAdapter>> = match source {
        Some(name) => vec![create_source(name)?],
        None => all_sources()?,
    };

    println!(
        "Scanning project '{project}' ({})",
        adapters
            .iter()
            .map(|adapter| adapter.name())
            .collect::<Vec<_>>()
            .join(", ")
    );

    for adapter in adapters {
        let items = match adapter.fetch(&config, limit).await {
            Ok(items) => items,
            Err(error) => {
                // A single requested source failing is the caller's
                // problem; in a full scan the other sources still run.
                if single_source {
                    return Err(error)
                        .with_context(|| format!("source {} unavailable", adapter.name()));
                }
                warn!(source = adapter.name(), %error, "source unavailable, skipping");
                continue;
            }
        };

        if items.is_empty() {
            println!("\n{}: no items found", adapter.name());
            continue;
        }

        let outcome = pipeline.run(items, &config).await;
        let summary = &outcome.summary;

        println!(
            "\n{}: fetched {}, cache hits {}, newly classified {}, fallbacks {}",
            adapter.name(),
            summary.fetched,
            summary.cache_hits,
            summary.newly_classified,
            summary.fallbacks
        );
        if !summary.persisted {
            println!("  (results were not persisted, cache unavailable)");
        }

        print_community_reports(&outcome.items, &outcome.classifications);

        if summary.persisted && !no_cache {
            let record = ScanRecord {
                community: communities(&outcome.items).join(","),
                source: adapter.name().to_string(),
                project: config.name.clone(),
                fetched: summary.fetched,
                newly_classified: summary.newly_classified,
                cache_hits: summary.cache_hits,
                signal_ratio: signal_ratio(&outcome.classifications),
                scanned_at: Utc::now(),
            };
            if let Err(error) = store.record_scan(&record).await {
                warn!(%error, "failed to record scan history");
            }
        }
    }

    Ok(())
}

fn communities(items: &[Item]) -> Vec<String> {
    let mut seen = Vec::new();
    for item in items {
        let community = item.community.clone().unwrap_or_else(|| item.source.clone());
        if !seen.contains(&community) {
            seen.push(community);
        }
    }
    seen
}

fn signal_ratio(classifications: &[Classification]) -> f64 {
    if classifications.is_empty() {
        return 0.0;
    }
    let signal = classifications
        .iter()
        .filter(|classification| classification.category.is_signal())
        .count();
    signal as f64 / classifications.len() as f64
}

fn print_community_reports(items: &[Item], classifications: &[Classification]) {
    let mut by_community: HashMap<String, Vec<&Item>> = HashMap::new();
    for item in items {
        let community = item.community.clone().unwrap_or_else(|| item.source.clone());
        by_community.entry(community).or_default().push(item);
    }

    let mut names: Vec<&String> = by_community.keys().collect();
    names.sort();

    for name in names {
        let group = &by_community[name.as_str()];
        let ids: Vec<&str> = group.iter().map(|item| item.id.as_str()).collect();
        let group_items: Vec<Item> = group.iter().map(|item| (*item).clone()).collect();
        let group_classifications: Vec<Classification> = classifications
            .iter()
            .filter(|classification| ids.contains(&classification.item_id.as_str()))
            .cloned()
            .collect();

        let report = ScanReport::build(name, "current scan", &group_items, &group_classifications);
        println!(
            "\n  {} - {} items, signal ratio {:.0}% (grade {})",
            report.community,
            report.total_items,
            report.signal_ratio * 100.0,
            report.health_grade()
        );
        for category in Category::ALL {
            if let Some(count) = report.category_counts.get(&category) {
                println!("    {:<20} {count}", category.as_str());
            }
        }
        if let Some(top) = report.top_signal.first() {
            println!("    top signal: {} ({:.2})", top.title, top.confidence);
        }
    }
}
