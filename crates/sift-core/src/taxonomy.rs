//! Fixed 10-value classification taxonomy and label normalization.

use serde::{Deserialize, Serialize};

/// One of the ten classification categories.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    // SIGNAL
    Technical,
    Troubleshooting,
    ResearchVerified,
    // NOISE
    Mystical,
    UnverifiedClaim,
    EngagementBait,
    // META
    Community,
    Meme,
    // OTHER
    Outlier,
    // UNRELATED
    Unrelated,
}

/// The five category groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CategoryGroup {
    Signal,
    Noise,
    Meta,
    Other,
    Unrelated,
}

impl Category {
    pub const ALL: [Category; 10] = [
        Category::Technical,
        Category::Troubleshooting,
        Category::ResearchVerified,
        Category::Mystical,
        Category::UnverifiedClaim,
        Category::EngagementBait,
        Category::Community,
        Category::Meme,
        Category::Outlier,
        Category::Unrelated,
    ];

    pub const SIGNAL: [Category; 3] = [
        Category::Technical,
        Category::Troubleshooting,
        Category::ResearchVerified,
    ];

    pub const NOISE: [Category; 3] = [
        Category::Mystical,
        Category::UnverifiedClaim,
        Category::EngagementBait,
    ];

    pub fn group(self) -> CategoryGroup {
        match self {
            Category::Technical | Category::Troubleshooting | Category::ResearchVerified => {
                CategoryGroup::Signal
            }
            Category::Mystical | Category::UnverifiedClaim | Category::EngagementBait => {
                CategoryGroup::Noise
            }
            Category::Community | Category::Meme => CategoryGroup::Meta,
            Category::Outlier => CategoryGroup::Other,
            Category::Unrelated => CategoryGroup::Unrelated,
        }
    }

    pub fn is_signal(self) -> bool {
        self.group() == CategoryGroup::Signal
    }

    pub fn is_noise(self) -> bool {
        self.group() == CategoryGroup::Noise
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Technical => "technical",
            Category::Troubleshooting => "troubleshooting",
            Category::ResearchVerified => "research_verified",
            Category::Mystical => "mystical",
            Category::UnverifiedClaim => "unverified_claim",
            Category::EngagementBait => "engagement_bait",
            Category::Community => "community",
            Category::Meme => "meme",
            Category::Outlier => "outlier",
            Category::Unrelated => "unrelated",
        }
    }

    /// Parses an exact taxonomy label. Out-of-taxonomy strings are handled
    /// by [`normalize_category`], not here.
    pub fn parse(value: &str) -> Option<Category> {
        match value {
            "technical" => Some(Category::Technical),
            "troubleshooting" => Some(Category::Troubleshooting),
            "research_verified" => Some(Category::ResearchVerified),
            "mystical" => Some(Category::Mystical),
            "unverified_claim" => Some(Category::UnverifiedClaim),
            "engagement_bait" => Some(Category::EngagementBait),
            "community" => Some(Category::Community),
            "meme" => Some(Category::Meme),
            "outlier" => Some(Category::Outlier),
            "unrelated" => Some(Category::Unrelated),
            _ => None,
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maps an arbitrary model-emitted label onto the closed taxonomy.
///
/// Exact labels pass through. Known near-miss labels are corrected by a
/// fixed table; everything else lands on the catch-all `Outlier`. The
/// mapping is total and deterministic so reclassifying the same response
/// always yields the same category.
pub fn normalize_category(raw: &str) -> Category {
    let label = raw.trim().to_ascii_lowercase().replace([' ', '-'], "_");
    if let Some(category) = Category::parse(&label) {
        return category;
    }

    match label.as_str() {
        "news" | "article" | "announcement" => Category::Community,
        "question" | "discussion" | "ask" => Category::Community,
        "humor" | "humour" | "joke" | "funny" => Category::Meme,
        "tutorial" | "guide" | "how_to" | "howto" => Category::Technical,
        "bug" | "bug_report" | "help" | "support" => Category::Troubleshooting,
        "research" | "paper" | "study" => Category::ResearchVerified,
        "clickbait" | "spam" | "bait" => Category::EngagementBait,
        "off_topic" | "offtopic" | "irrelevant" | "unrelated_content" => Category::Unrelated,
        _ => Category::Outlier,
    }
}
