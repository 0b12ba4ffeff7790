use std::fmt::Write;

use chrono::NaiveDate;

use crate::models::{Insight, TrendDirection, User};
use crate::snapshot::Snapshot;

fn insight_line(insight: &Insight) -> String {
    format!(
        "[{:?}/{:?}] {}: {} (confidence {:.0}%)",
        insight.priority,
        insight.kind,
        insight.title,
        insight.message,
        insight.confidence * 100.0
    )
}

/// Short plain-text summary for terminal output.
pub fn render_summary(user: &User, snapshot: &Snapshot) -> String {
    let summary = &snapshot.summary;
    let mut output = String::new();

    let _ = writeln!(output, "{} ({}) on {}", user.display_name, user.email, snapshot.today);
    let _ = writeln!(
        output,
        "- {} active days, {} responses, streak {} day(s){}",
        summary.days_active,
        summary.total_responses,
        summary.current_streak,
        if summary.has_data_today {
            ""
        } else {
            ", nothing logged today"
        }
    );
    let _ = writeln!(
        output,
        "- progress {:.0}%: {}",
        summary.progress, summary.next_milestone
    );

    for insight in summary.live_insights.iter().chain(snapshot.patterns.insights.iter()) {
        let _ = writeln!(output, "- {}", insight_line(insight));
    }

    output
}

pub fn build_report(user: &User, window_days: i64, cutoff: NaiveDate, snapshot: &Snapshot) -> String {
    let summary = &snapshot.summary;
    let mut output = String::new();

    let _ = writeln!(output, "# Coaching Insights Report");
    let _ = writeln!(
        output,
        "Generated for {} ({}) covering {} days since {}",
        user.display_name, user.email, window_days, cutoff
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Progress");
    let _ = writeln!(output, "- Active days: {}", summary.days_active);
    let _ = writeln!(output, "- Responses: {}", summary.total_responses);
    let _ = writeln!(output, "- Current streak: {} day(s)", summary.current_streak);
    let _ = writeln!(
        output,
        "- Progress: {:.0}% ({})",
        summary.progress, summary.next_milestone
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "## Today");

    if summary.live_insights.is_empty() {
        let _ = writeln!(output, "Nothing stands out today.");
    } else {
        for insight in summary.live_insights.iter() {
            let _ = writeln!(output, "- {}", insight_line(insight));
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Patterns and Trends");

    if snapshot.patterns.insights.is_empty() {
        let _ = writeln!(output, "Not enough history for patterns yet.");
    } else {
        for insight in snapshot.patterns.insights.iter() {
            let _ = writeln!(output, "- {}", insight_line(insight));
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Categories");

    if snapshot.patterns.categories.is_empty() {
        let _ = writeln!(output, "No assessment answers recorded for this window.");
    } else {
        for category in snapshot.patterns.categories.iter() {
            let trend = match category.trend {
                Some(TrendDirection::Improving) => ", improving",
                Some(TrendDirection::Declining) => ", declining",
                Some(TrendDirection::Stable) => ", stable",
                None => "",
            };
            let _ = writeln!(
                output,
                "- {}: {} answers (avg {:.1}{})",
                category.label, category.count, category.average_score, trend
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Recent Days");

    if summary.assessment_history.is_empty() {
        let _ = writeln!(output, "No activity recorded for this window.");
    } else {
        for entry in summary.assessment_history.iter().take(7) {
            let average = match entry.average_score {
                Some(score) => format!("avg {score:.1}"),
                None => "no scores".to_string(),
            };
            let _ = writeln!(
                output,
                "- {} ({:?}): {} across {} answers",
                entry.date, entry.kind, average, entry.response_count
            );
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::build_snapshot;
    use chrono::FixedOffset;
    use uuid::Uuid;

    fn user() -> User {
        User {
            id: Uuid::new_v4(),
            display_name: "Maya Chen".to_string(),
            email: "maya@example.com".to_string(),
        }
    }

    #[test]
    fn empty_report_has_placeholders() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap();
        let offset = FixedOffset::east_opt(0).unwrap();
        let snapshot = build_snapshot(&[], &[], today, &offset);
        let report = build_report(&user(), 30, today, &snapshot);

        assert!(report.starts_with("# Coaching Insights Report"));
        assert!(report.contains("- Progress: 5% (Complete your first assessment)"));
        assert!(report.contains("Check in for today"));
        assert!(report.contains("Not enough history for patterns yet."));
        assert!(report.contains("No activity recorded for this window."));
    }

    #[test]
    fn unscored_day_is_not_reported_as_zero() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap();
        let offset = FixedOffset::east_opt(0).unwrap();
        let checkins = vec![crate::models::CheckIn {
            date: today,
            mood_score: None,
            stress_level: None,
            energy_level: None,
        }];
        let snapshot = build_snapshot(&checkins, &[], today, &offset);
        let report = build_report(&user(), 30, today, &snapshot);
        assert!(report.contains("- 2026-03-10 (Checkin): no scores across 0 answers"));
        assert!(!report.contains("avg 0.0"));
    }

    #[test]
    fn summary_mentions_missing_today() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap();
        let offset = FixedOffset::east_opt(0).unwrap();
        let snapshot = build_snapshot(&[], &[], today, &offset);
        let summary = render_summary(&user(), &snapshot);
        assert!(summary.contains("nothing logged today"));
        assert!(summary.contains("[Low/Suggestion] Check in for today"));
    }
}
