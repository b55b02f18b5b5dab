//! `sift info`: resolved configuration and discovered projects.

use super::AppContext;

pub fn run(context: &AppContext) -> anyhow::Result<()> {
    println!("Model:    {}", context.model);
    println!(
        "API key:  {}",
        if context.api_key.as_deref().is_some_and(|key| !key.trim().is_empty()) {
            "configured"
        } else {
            "not configured (set ANTHROPIC_API_KEY)"
        }
    );
    println!("Database: {}", context.db_path.display());

    let projects = context.projects.list();
    if projects.is_empty() {
        println!(
            "Projects: none found in {}",
            context.projects_dir.display()
        );
        return Ok(());
    }

    println!("Projects:");
    for name in projects {
        match context.projects.load(&name) {
            Ok(config) => {
                println!("  {name}: {}", config.description);
                if !config.subreddits.is_empty() {
                    println!(
                        "    subreddits: {}",
                        config
                            .subreddits
                            .iter()
                            .map(|s| format!("r/{s}"))
                            .collect::<Vec<_>>()
                            .join(", ")
                    );
                }
                if !config.hn_keywords.is_empty() {
                    println!("    hn keywords: {}", config.hn_keywords.join(", "));
                }
                println!("    min confidence: {:.2}", config.min_confidence);
            }
            Err(error) => println!("  {name}: unreadable config ({error})"),
        }
    }

    Ok(())
}
