use chrono::{Duration, FixedOffset, NaiveDate, Utc};
use serde::Serialize;

use crate::aggregate::{aggregate, split_today, ActivityWindow};
use crate::models::{CheckIn, PatternReport, QuestionResponse, UnifiedInsights};
use crate::patterns::generate_patterns;

pub const DEFAULT_WINDOW_DAYS: i64 = 30;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub today: NaiveDate,
    pub summary: UnifiedInsights,
    pub patterns: PatternReport,
}

pub fn local_today(offset: &FixedOffset) -> NaiveDate {
    Utc::now().with_timezone(offset).date_naive()
}

/// First day of a trailing window of `window_days` days ending today.
pub fn cutoff_date(today: NaiveDate, window_days: i64) -> NaiveDate {
    today - Duration::days(window_days.max(1) - 1)
}

pub fn build_snapshot(
    checkins: &[CheckIn],
    responses: &[QuestionResponse],
    today: NaiveDate,
    offset: &FixedOffset,
) -> Snapshot {
    let (today_checkins, today_responses) = split_today(checkins, responses, today, offset);
    let summary = aggregate(&ActivityWindow {
        today,
        offset: *offset,
        checkins,
        responses,
        today_checkins: &today_checkins,
        today_responses: &today_responses,
    });
    let patterns = generate_patterns(responses, summary.days_active, today, offset);

    Snapshot {
        today,
        summary,
        patterns,
    }
}
