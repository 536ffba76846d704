//! Read-only knowledge store.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result, bail};
use grchub_protocol::Category;
use serde::Deserialize;

use crate::knowledge::types::{KnowledgeEntry, KnowledgeStats, Severity, Status};

/// Default feed compiled into the binary.
const DEFAULT_FEED: &str = include_str!("data.toml");

#[derive(Debug, Deserialize)]
struct KnowledgeFeed {
    entries: Vec<KnowledgeEntry>,
}

/// Ordered, immutable collection of [`KnowledgeEntry`].
///
/// Loaded once at process start and shared read-only across requests, so
/// concurrent access needs no synchronization.
pub struct KnowledgeStore {
    entries: Vec<KnowledgeEntry>,
}

impl KnowledgeStore {
    /// Build a store, rejecting duplicate ids. Insertion order is preserved
    /// and is the order every lookup returns.
    pub fn from_entries(entries: Vec<KnowledgeEntry>) -> Result<Self> {
        let mut seen = HashSet::new();
        for entry in &entries {
            if !seen.insert(entry.id.as_str()) {
                bail!("duplicate knowledge entry id: {}", entry.id);
            }
        }
        Ok(Self { entries })
    }

    /// Load the feed compiled into the binary.
    pub fn load_default() -> Result<Self> {
        let feed: KnowledgeFeed =
            toml::from_str(DEFAULT_FEED).context("parsing built-in knowledge feed")?;
        Self::from_entries(feed.entries)
    }

    /// Load an external TOML feed (same shape as the built-in one).
    pub fn load_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading knowledge feed {}", path.display()))?;
        let feed: KnowledgeFeed = toml::from_str(&raw)
            .with_context(|| format!("parsing knowledge feed {}", path.display()))?;
        Self::from_entries(feed.entries)
    }

    pub fn all(&self) -> &[KnowledgeEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&KnowledgeEntry> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    /// All entries in the given category, in store order.
    pub fn by_category(&self, category: Category) -> Vec<&KnowledgeEntry> {
        self.entries
            .iter()
            .filter(|entry| entry.category == category)
            .collect()
    }

    /// Case-insensitive substring search over title, description, framework,
    /// recommendation, and region. An empty or whitespace-only query returns
    /// the full store.
    pub fn search(&self, query: &str) -> Vec<&KnowledgeEntry> {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return self.entries.iter().collect();
        }

        self.entries
            .iter()
            .filter(|entry| {
                let hit = |field: &str| field.to_lowercase().contains(&query);
                hit(&entry.title)
                    || hit(&entry.description)
                    || entry.framework.as_deref().is_some_and(hit)
                    || entry.recommendation.as_deref().is_some_and(hit)
                    || entry.region.as_deref().is_some_and(hit)
            })
            .collect()
    }

    /// Aggregate counts for the dashboard stat cards.
    pub fn stats(&self) -> KnowledgeStats {
        let count = |category| self.entries.iter().filter(|e| e.category == category).count();
        KnowledgeStats {
            total: self.entries.len(),
            risks: count(Category::Risks),
            compliance: count(Category::Compliance),
            regulatory: count(Category::Regulatory),
            recommendations: count(Category::Recommendation),
            active: self
                .entries
                .iter()
                .filter(|e| e.status == Some(Status::Active))
                .count(),
            critical: self
                .entries
                .iter()
                .filter(|e| e.severity == Some(Severity::Critical))
                .count(),
            generated_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}
