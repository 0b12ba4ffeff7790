use std::collections::BTreeMap;

use chrono::{Duration, FixedOffset, NaiveDate};

use crate::aggregate::{local_day, rank_insights};
use crate::category::{normalize_code, Category};
use crate::models::{
    CategorySummary, Insight, InsightKind, PatternReport, Priority, QuestionResponse,
    TrendDirection,
};

pub const PATTERN_MIN_DAYS: usize = 7;
pub const TREND_MIN_DAYS: usize = 15;
pub const PATTERN_MIN_POINTS: usize = 5;
pub const TREND_MIN_POINTS: usize = 10;
pub const SLOPE_THRESHOLD: f64 = 0.1;
pub const WEEKLY_SHIFT_THRESHOLD: f64 = 0.5;
pub const PATTERN_INSIGHT_LIMIT: usize = 5;

pub fn generate_patterns(
    responses: &[QuestionResponse],
    days_active: usize,
    today: NaiveDate,
    offset: &FixedOffset,
) -> PatternReport {
    let mut chronological: Vec<&QuestionResponse> = responses.iter().collect();
    chronological.sort_by_key(|response| response.created_at);

    // keyed by stored code so unknown codes keep separate statistics
    let mut by_category: BTreeMap<String, (Category, Vec<f64>)> = BTreeMap::new();
    for response in chronological {
        by_category
            .entry(normalize_code(&response.category))
            .or_insert_with(|| (Category::from_code(&response.category), Vec::new()))
            .1
            .push(f64::from(response.response_score));
    }

    let mut insights = Vec::new();
    let mut categories = Vec::new();

    for (code, (category, scores)) in by_category {
        let count = scores.len();
        let average = mean(&scores);

        if days_active >= PATTERN_MIN_DAYS && count >= PATTERN_MIN_POINTS {
            insights.extend(pattern_insight(&code, category, count, average));
        }

        let trend = if days_active >= TREND_MIN_DAYS && count >= TREND_MIN_POINTS {
            ols_slope(&scores).map(classify_slope)
        } else {
            None
        };
        if let Some(direction) = trend {
            insights.extend(trend_insight(&code, category, direction));
        }

        categories.push(CategorySummary {
            category: code,
            label: category.label().to_string(),
            count,
            average_score: average,
            trend,
        });
    }

    if days_active >= TREND_MIN_DAYS {
        insights.extend(weekly_insight(responses, today, offset));
    }

    categories.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.category.cmp(&b.category)));

    PatternReport {
        insights: rank_insights(insights, PATTERN_INSIGHT_LIMIT),
        categories,
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Least-squares slope with x = position in the sequence.
pub fn ols_slope(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }

    let n = values.len() as f64;
    let sum_x: f64 = (0..values.len()).map(|x| x as f64).sum();
    let sum_y: f64 = values.iter().sum();
    let sum_x2: f64 = (0..values.len()).map(|x| (x * x) as f64).sum();
    let sum_xy: f64 = values.iter().enumerate().map(|(x, y)| x as f64 * y).sum();

    let denom = n * sum_x2 - sum_x * sum_x;
    if denom.abs() < 1e-9 {
        return None;
    }

    Some((n * sum_xy - sum_x * sum_y) / denom)
}

pub fn classify_slope(slope: f64) -> TrendDirection {
    if slope > SLOPE_THRESHOLD {
        TrendDirection::Improving
    } else if slope < -SLOPE_THRESHOLD {
        TrendDirection::Declining
    } else {
        TrendDirection::Stable
    }
}

fn pattern_insight(code: &str, category: Category, count: usize, average: f64) -> Option<Insight> {
    let confidence = (count as f64 / 10.0).min(0.9);

    if average >= 4.0 {
        Some(Insight {
            id: format!("pattern-{code}"),
            kind: InsightKind::Achievement,
            title: format!("{category} is a strength"),
            message: format!(
                "Across {count} answers your {} score averages {average:.1} out of 5.",
                category.label().to_lowercase()
            ),
            confidence,
            priority: Priority::Medium,
        })
    } else if average < 3.0 {
        Some(Insight {
            id: format!("pattern-{code}"),
            kind: InsightKind::Suggestion,
            title: format!("Growth area: {category}"),
            message: format!(
                "Across {count} answers your {} score averages {average:.1} out of 5. A focused exercise here could pay off.",
                category.label().to_lowercase()
            ),
            confidence,
            priority: Priority::Medium,
        })
    } else {
        None
    }
}

fn trend_insight(code: &str, category: Category, direction: TrendDirection) -> Option<Insight> {
    match direction {
        TrendDirection::Improving => Some(Insight {
            id: format!("trend-{code}"),
            kind: InsightKind::Trend,
            title: format!("{category} is improving"),
            message: format!(
                "Your recent {} answers are trending upward.",
                category.label().to_lowercase()
            ),
            confidence: 0.85,
            priority: Priority::Medium,
        }),
        TrendDirection::Declining => Some(Insight {
            id: format!("trend-{code}"),
            kind: InsightKind::Trend,
            title: format!("{category} is slipping"),
            message: format!(
                "Your recent {} answers are trending downward. It may be worth revisiting with your coach.",
                category.label().to_lowercase()
            ),
            confidence: 0.9,
            priority: Priority::High,
        }),
        TrendDirection::Stable => None,
    }
}

fn weekly_insight(
    responses: &[QuestionResponse],
    today: NaiveDate,
    offset: &FixedOffset,
) -> Option<Insight> {
    let recent_start = today - Duration::days(6);
    let previous_start = today - Duration::days(13);

    let mut recent = Vec::new();
    let mut previous = Vec::new();
    for response in responses {
        let day = local_day(response.created_at, offset);
        let score = f64::from(response.response_score);
        if day >= recent_start && day <= today {
            recent.push(score);
        } else if day >= previous_start && day < recent_start {
            previous.push(score);
        }
    }

    if recent.is_empty() || previous.is_empty() {
        return None;
    }

    let shift = mean(&recent) - mean(&previous);
    if shift >= WEEKLY_SHIFT_THRESHOLD {
        Some(Insight {
            id: "weekly-change".to_string(),
            kind: InsightKind::Trend,
            title: "Week over week lift".to_string(),
            message: format!("Your answers this week are up {shift:.1} points on last week."),
            confidence: 0.85,
            priority: Priority::Medium,
        })
    } else if shift <= -WEEKLY_SHIFT_THRESHOLD {
        Some(Insight {
            id: "weekly-change".to_string(),
            kind: InsightKind::Trend,
            title: "Week over week dip".to_string(),
            message: format!(
                "Your answers this week are down {:.1} points on last week.",
                shift.abs()
            ),
            confidence: 0.9,
            priority: Priority::High,
        })
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 10).unwrap()
    }

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn response(days_ago: i64, score: i32, category: &str) -> QuestionResponse {
        let day = today() - Duration::days(days_ago);
        QuestionResponse {
            id: Uuid::new_v4(),
            created_at: Utc.from_utc_datetime(&day.and_hms_opt(12, 0, 0).unwrap()),
            response_score: score,
            category: category.to_string(),
        }
    }

    #[test]
    fn slope_of_rising_sequence() {
        let slope = ols_slope(&[1.0, 2.0, 3.0, 4.0]).unwrap();
        assert!((slope - 1.0).abs() < 1e-9);
        assert_eq!(ols_slope(&[3.0]), None);
    }

    #[test]
    fn slope_threshold_is_exclusive() {
        assert_eq!(classify_slope(0.1), TrendDirection::Stable);
        assert_eq!(classify_slope(0.11), TrendDirection::Improving);
        assert_eq!(classify_slope(-0.1), TrendDirection::Stable);
        assert_eq!(classify_slope(-0.11), TrendDirection::Declining);
    }

    #[test]
    fn patterns_wait_for_seven_active_days() {
        let responses: Vec<_> = (0..6).map(|d| response(d, 5, "focus")).collect();
        let report = generate_patterns(&responses, 6, today(), &utc());
        assert!(report.insights.is_empty());
        assert_eq!(report.categories.len(), 1);
        assert_eq!(report.categories[0].count, 6);
        assert_eq!(report.categories[0].trend, None);
    }

    #[test]
    fn pattern_confidence_scales_with_sample_count() {
        let responses: Vec<_> = (0..6).map(|d| response(d, 5, "focus")).collect();
        let report = generate_patterns(&responses, 7, today(), &utc());
        assert_eq!(report.insights.len(), 1);
        let insight = &report.insights[0];
        assert_eq!(insight.id, "pattern-focus");
        assert_eq!(insight.kind, InsightKind::Achievement);
        assert!((insight.confidence - 0.6).abs() < 1e-9);
    }

    #[test]
    fn pattern_confidence_caps_at_point_nine() {
        let responses: Vec<_> = (0..12).map(|d| response(d, 2, "empathy")).collect();
        let report = generate_patterns(&responses, 12, today(), &utc());
        let insight = report
            .insights
            .iter()
            .find(|i| i.id == "pattern-empathy")
            .unwrap();
        assert_eq!(insight.kind, InsightKind::Suggestion);
        assert_eq!(insight.confidence, 0.9);
    }

    #[test]
    fn small_categories_are_not_patterns() {
        let responses: Vec<_> = (0..4).map(|d| response(d, 5, "focus")).collect();
        let report = generate_patterns(&responses, 10, today(), &utc());
        assert!(report.insights.is_empty());
    }

    #[test]
    fn declining_category_after_fifteen_days() {
        // oldest first: 5,5,5,4,4,4,3,3,2,2 over the last 20 days
        let scores = [5, 5, 5, 4, 4, 4, 3, 3, 2, 2];
        let responses: Vec<_> = scores
            .iter()
            .enumerate()
            .map(|(i, score)| response(20 - (i as i64) * 2, *score, "resilience"))
            .collect();
        let report = generate_patterns(&responses, 15, today(), &utc());

        assert_eq!(report.categories[0].trend, Some(TrendDirection::Declining));
        let trend = report
            .insights
            .iter()
            .find(|i| i.id == "trend-resilience")
            .unwrap();
        assert_eq!(trend.kind, InsightKind::Trend);
        assert_eq!(trend.priority, Priority::High);
        assert_eq!(trend.confidence, 0.9);
    }

    #[test]
    fn trends_use_chronological_order_not_input_order() {
        // most-recent-first input, rising over time
        let responses: Vec<_> = (0..10)
            .map(|i| response(i, 5 - (i as i32) / 2, "communication"))
            .collect();
        let report = generate_patterns(&responses, 15, today(), &utc());
        assert_eq!(report.categories[0].trend, Some(TrendDirection::Improving));

        let trend = report
            .insights
            .iter()
            .find(|i| i.id == "trend-communication")
            .unwrap();
        assert_eq!(trend.kind, InsightKind::Trend);
        assert_eq!(trend.priority, Priority::Medium);
        assert_eq!(trend.confidence, 0.85);
    }

    #[test]
    fn middling_category_average_emits_no_pattern() {
        let responses: Vec<_> = (0..6)
            .map(|d| response(d, if d % 2 == 0 { 3 } else { 4 }, "focus"))
            .collect();
        let report = generate_patterns(&responses, 7, today(), &utc());
        assert!((report.categories[0].average_score - 3.5).abs() < 1e-9);
        assert!(report.insights.is_empty());
    }

    #[test]
    fn unknown_codes_keep_separate_statistics() {
        let mut responses: Vec<_> = (0..3).map(|d| response(d, 5, "leadership")).collect();
        responses.extend((3..5).map(|d| response(d, 5, "Delegation")));
        let report = generate_patterns(&responses, 7, today(), &utc());

        let counts: Vec<(&str, usize)> = report
            .categories
            .iter()
            .map(|c| (c.category.as_str(), c.count))
            .collect();
        assert_eq!(counts, vec![("leadership", 3), ("delegation", 2)]);
        assert!(report.categories.iter().all(|c| c.label == "General wellbeing"));
        // neither reaches five points on its own
        assert!(report.insights.is_empty());
    }

    #[test]
    fn weekly_dip_is_flagged() {
        let mut responses: Vec<_> = (0..3).map(|d| response(d, 2, "focus")).collect();
        responses.extend((8..11).map(|d| response(d, 4, "empathy")));
        let report = generate_patterns(&responses, 15, today(), &utc());
        let weekly = report
            .insights
            .iter()
            .find(|i| i.id == "weekly-change")
            .unwrap();
        assert_eq!(weekly.title, "Week over week dip");
        assert_eq!(weekly.priority, Priority::High);
    }

    #[test]
    fn weekly_lift_is_flagged() {
        let mut responses: Vec<_> = (0..3).map(|d| response(d, 5, "focus")).collect();
        responses.extend((8..11).map(|d| response(d, 3, "empathy")));
        let report = generate_patterns(&responses, 15, today(), &utc());
        let weekly = report
            .insights
            .iter()
            .find(|i| i.id == "weekly-change")
            .unwrap();
        assert_eq!(weekly.title, "Week over week lift");
        assert_eq!(weekly.kind, InsightKind::Trend);
        assert_eq!(weekly.priority, Priority::Medium);
        assert_eq!(weekly.confidence, 0.85);
    }

    #[test]
    fn weekly_change_needs_both_weeks() {
        let responses: Vec<_> = (0..3).map(|d| response(d, 5, "focus")).collect();
        let report = generate_patterns(&responses, 15, today(), &utc());
        assert!(report.insights.iter().all(|i| i.id != "weekly-change"));
    }
}
