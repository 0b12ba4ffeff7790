use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub display_name: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CheckIn {
    pub date: NaiveDate,
    pub mood_score: Option<i32>,
    pub stress_level: Option<i32>,
    pub energy_level: Option<i32>,
}

impl CheckIn {
    /// Sub-scores that were actually recorded.
    pub fn scores(&self) -> impl Iterator<Item = i32> {
        [self.mood_score, self.stress_level, self.energy_level]
            .into_iter()
            .flatten()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct QuestionResponse {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub response_score: i32,
    pub category: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryKind {
    Checkin,
    Assessment,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub date: NaiveDate,
    #[serde(rename = "type")]
    pub kind: HistoryKind,
    pub response_count: usize,
    /// `None` when the day only has check-ins with no recorded sub-scores.
    pub average_score: Option<f64>,
    pub categories: BTreeSet<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InsightKind {
    Immediate,
    Trend,
    Achievement,
    Suggestion,
}

/// Declared low to high so the derived `Ord` ranks `High` greatest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Insight {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: InsightKind,
    pub title: String,
    pub message: String,
    pub confidence: f64,
    pub priority: Priority,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnifiedInsights {
    pub days_active: usize,
    pub total_responses: usize,
    pub current_streak: usize,
    pub has_data_today: bool,
    pub next_milestone: String,
    pub progress: f64,
    pub live_insights: Vec<Insight>,
    pub assessment_history: Vec<HistoryEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Improving,
    Declining,
    Stable,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategorySummary {
    pub category: String,
    pub label: String,
    pub count: usize,
    pub average_score: f64,
    pub trend: Option<TrendDirection>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatternReport {
    pub insights: Vec<Insight>,
    pub categories: Vec<CategorySummary>,
}
