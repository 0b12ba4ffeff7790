use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};

use crate::models::{
    CheckIn, HistoryEntry, HistoryKind, Insight, InsightKind, Priority, QuestionResponse,
    UnifiedInsights,
};

pub const LIVE_INSIGHT_LIMIT: usize = 3;

/// Everything the aggregator reads. The caller owns the clock and the
/// day boundary; nothing here reads either.
#[derive(Debug, Clone, Copy)]
pub struct ActivityWindow<'a> {
    pub today: NaiveDate,
    pub offset: FixedOffset,
    pub checkins: &'a [CheckIn],
    pub responses: &'a [QuestionResponse],
    pub today_checkins: &'a [CheckIn],
    pub today_responses: &'a [QuestionResponse],
}

pub fn local_day(timestamp: DateTime<Utc>, offset: &FixedOffset) -> NaiveDate {
    timestamp.with_timezone(offset).date_naive()
}

pub fn split_today(
    checkins: &[CheckIn],
    responses: &[QuestionResponse],
    today: NaiveDate,
    offset: &FixedOffset,
) -> (Vec<CheckIn>, Vec<QuestionResponse>) {
    let today_checkins = checkins
        .iter()
        .filter(|checkin| checkin.date == today)
        .cloned()
        .collect();
    let today_responses = responses
        .iter()
        .filter(|response| local_day(response.created_at, offset) == today)
        .cloned()
        .collect();
    (today_checkins, today_responses)
}

pub fn aggregate(window: &ActivityWindow<'_>) -> UnifiedInsights {
    let active = active_days(window.checkins, window.responses, &window.offset);
    let days_active = active.len();
    let (progress, next_milestone) = progress_milestone(days_active);

    let mut insights = Vec::new();
    insights.extend(today_performance_insight(window.today_responses));
    insights.extend(mood_balance_insight(window.today_checkins));
    insights.extend(engagement_nudge(window.today_checkins, window.today_responses));

    UnifiedInsights {
        days_active,
        total_responses: window.responses.len(),
        current_streak: current_streak(&active, window.today),
        has_data_today: !window.today_checkins.is_empty() || !window.today_responses.is_empty(),
        next_milestone,
        progress,
        live_insights: rank_insights(insights, LIVE_INSIGHT_LIMIT),
        assessment_history: build_history(window.checkins, window.responses, &window.offset),
    }
}

pub fn active_days(
    checkins: &[CheckIn],
    responses: &[QuestionResponse],
    offset: &FixedOffset,
) -> BTreeSet<NaiveDate> {
    checkins
        .iter()
        .map(|checkin| checkin.date)
        .chain(
            responses
                .iter()
                .map(|response| local_day(response.created_at, offset)),
        )
        .collect()
}

/// Consecutive active days ending today, or ending yesterday when today
/// has no activity yet.
pub fn current_streak(active: &BTreeSet<NaiveDate>, today: NaiveDate) -> usize {
    let mut day = if active.contains(&today) {
        today
    } else {
        match today.pred_opt() {
            Some(yesterday) => yesterday,
            None => return 0,
        }
    };

    let mut streak = 0;
    while active.contains(&day) {
        streak += 1;
        match day.pred_opt() {
            Some(previous) => day = previous,
            None => break,
        }
    }
    streak
}

pub fn progress_milestone(days_active: usize) -> (f64, String) {
    match days_active {
        0 => (5.0, "Complete your first assessment".to_string()),
        1..=6 => (
            10.0 + (days_active - 1) as f64 / 6.0 * 60.0,
            format!("{} more days for pattern recognition", 7 - days_active),
        ),
        7..=14 => (
            70.0 + (days_active - 7) as f64 / 8.0 * 30.0,
            format!("{} more days for trend analysis", 15 - days_active),
        ),
        _ => (100.0, "All insights unlocked!".to_string()),
    }
}

#[derive(Default)]
struct DayTotals {
    score_sum: i64,
    score_count: usize,
    response_count: usize,
    categories: BTreeSet<String>,
}

pub fn build_history(
    checkins: &[CheckIn],
    responses: &[QuestionResponse],
    offset: &FixedOffset,
) -> Vec<HistoryEntry> {
    let mut days: BTreeMap<NaiveDate, DayTotals> = BTreeMap::new();

    for checkin in checkins {
        let totals = days.entry(checkin.date).or_default();
        for score in checkin.scores() {
            totals.score_sum += i64::from(score);
            totals.score_count += 1;
        }
    }

    for response in responses {
        let totals = days
            .entry(local_day(response.created_at, offset))
            .or_default();
        totals.score_sum += i64::from(response.response_score);
        totals.score_count += 1;
        totals.response_count += 1;
        totals.categories.insert(response.category.clone());
    }

    days.into_iter()
        .rev()
        .map(|(date, totals)| HistoryEntry {
            date,
            kind: if totals.response_count > 0 {
                HistoryKind::Assessment
            } else {
                HistoryKind::Checkin
            },
            response_count: totals.response_count,
            average_score: (totals.score_count > 0)
                .then(|| totals.score_sum as f64 / totals.score_count as f64),
            categories: totals.categories,
        })
        .collect()
}

fn today_performance_insight(today_responses: &[QuestionResponse]) -> Option<Insight> {
    if today_responses.is_empty() {
        return None;
    }

    let total: i32 = today_responses.iter().map(|r| r.response_score).sum();
    let mean = f64::from(total) / today_responses.len() as f64;

    if mean >= 4.0 {
        Some(Insight {
            id: "today-performance".to_string(),
            kind: InsightKind::Achievement,
            title: "Strong session today".to_string(),
            message: format!(
                "Your answers today averaged {mean:.1} out of 5 across {} questions.",
                today_responses.len()
            ),
            confidence: 0.9,
            priority: Priority::High,
        })
    } else if mean < 3.0 {
        Some(Insight {
            id: "today-performance".to_string(),
            kind: InsightKind::Suggestion,
            title: "Today felt harder".to_string(),
            message: format!(
                "Your answers today averaged {mean:.1} out of 5. A short reflection in your journal may help you spot what is weighing on you."
            ),
            confidence: 0.9,
            priority: Priority::High,
        })
    } else {
        None
    }
}

fn mood_balance_insight(today_checkins: &[CheckIn]) -> Option<Insight> {
    let (mood, stress) = today_checkins
        .iter()
        .find_map(|checkin| Some((checkin.mood_score?, checkin.stress_level?)))?;
    let balance = mood - stress;

    if balance >= 2 {
        Some(Insight {
            id: "mood-balance".to_string(),
            kind: InsightKind::Achievement,
            title: "Mood is outpacing stress".to_string(),
            message: format!(
                "Your mood ({mood}/5) is well ahead of your stress ({stress}/5) today."
            ),
            confidence: 0.85,
            priority: Priority::Medium,
        })
    } else if balance <= -2 {
        Some(Insight {
            id: "mood-balance".to_string(),
            kind: InsightKind::Suggestion,
            title: "Stress is running high".to_string(),
            message: format!(
                "Your stress ({stress}/5) is well above your mood ({mood}/5) today. Consider a short break or a breathing exercise."
            ),
            confidence: 0.8,
            priority: Priority::High,
        })
    } else {
        None
    }
}

fn engagement_nudge(
    today_checkins: &[CheckIn],
    today_responses: &[QuestionResponse],
) -> Option<Insight> {
    if !today_checkins.is_empty() || !today_responses.is_empty() {
        return None;
    }

    Some(Insight {
        id: "engagement-nudge".to_string(),
        kind: InsightKind::Suggestion,
        title: "Check in for today".to_string(),
        message: "A quick mood check-in keeps your streak going and sharpens your insights."
            .to_string(),
        confidence: 0.7,
        priority: Priority::Low,
    })
}

/// Highest priority first, then highest confidence, keeping at most `limit`.
pub fn rank_insights(mut insights: Vec<Insight>, limit: usize) -> Vec<Insight> {
    insights.sort_by(|a, b| {
        b.priority.cmp(&a.priority).then_with(|| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(Ordering::Equal)
        })
    });
    insights.truncate(limit);
    insights
}
