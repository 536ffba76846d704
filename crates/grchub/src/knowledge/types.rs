//! Knowledge base data models.

use std::fmt;

use grchub_protocol::Category;
use serde::{Deserialize, Serialize};

/// Severity of a knowledge entry.
///
/// Variants are declared lowest-first so the derived `Ord` ranks
/// critical > high > medium > low.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

/// Lifecycle status of a knowledge entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Active,
    Pending,
    Mitigated,
    Resolved,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Pending => write!(f, "pending"),
            Self::Mitigated => write!(f, "mitigated"),
            Self::Resolved => write!(f, "resolved"),
        }
    }
}

/// One immutable record in the knowledge base.
///
/// Field names stay camelCase on the wire to match the dashboard data feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeEntry {
    /// Stable id of the form `<PREFIX>-<NNN>`, e.g. `RSK-001`.
    pub id: String,
    pub category: Category,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub framework: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<String>,
    pub last_updated: String,
}

/// Aggregate counts for the dashboard stat cards.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeStats {
    pub total: usize,
    pub risks: usize,
    pub compliance: usize,
    pub regulatory: usize,
    pub recommendations: usize,
    /// Entries currently in `active` status.
    pub active: usize,
    /// Entries rated `critical`.
    pub critical: usize,
    pub generated_at: String,
}
