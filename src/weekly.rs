use std::fmt::Write;

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc};

use crate::models::WeeklySummary;

pub const WEEKLY_SUMMARY_SUBJECT: &str = "Your Weekly Screen Time Summary";
pub const WEEKLY_SUMMARY_EMAIL_TYPE: &str = "weekly_summary";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    Improving,
    Declining,
    Steady,
}

impl Trend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Trend::Improving => "improving",
            Trend::Declining => "declining",
            Trend::Steady => "steady",
        }
    }
}

/// Monday-based week containing `date`, as (start, end) inclusive.
pub fn week_bounds(date: NaiveDate) -> (NaiveDate, NaiveDate) {
    let start = date - Duration::days(i64::from(date.weekday().num_days_from_monday()));
    (start, start + Duration::days(6))
}

/// Half-open UTC window [Monday 00:00, next Monday 00:00) for a week start.
pub fn week_window_utc(week_start: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = Utc.from_utc_datetime(&week_start.and_time(NaiveTime::MIN));
    (start, start + Duration::days(7))
}

/// Compare this week's average risk against the previous week's. Changes
/// within 1.0 either way count as steady, as does a missing prior week.
pub fn trend_between(previous_avg: Option<f64>, current_avg: f64) -> Trend {
    match previous_avg {
        Some(previous) => {
            let delta = current_avg - previous;
            if delta < -1.0 {
                Trend::Improving
            } else if delta > 1.0 {
                Trend::Declining
            } else {
                Trend::Steady
            }
        }
        None => Trend::Steady,
    }
}

pub fn render_summary_body(email: &str, summary: &WeeklySummary) -> String {
    let mut body = String::new();

    let _ = writeln!(body, "# Weekly Screen Time Summary");
    let _ = writeln!(
        body,
        "Week {} to {} for {}.",
        summary.week_start, summary.week_end, email
    );
    let _ = writeln!(body);

    if summary.total_assessments == 0 {
        let _ = writeln!(body, "No assessments were recorded this week.");
    } else {
        let _ = writeln!(
            body,
            "- Assessments completed: {}",
            summary.total_assessments
        );
        let _ = writeln!(body, "- Average risk score: {:.1}", summary.avg_risk_score);
        let _ = writeln!(
            body,
            "- Trend vs last week: {}",
            summary.improvement_trend
        );
    }

    let _ = writeln!(body);
    let _ = writeln!(
        body,
        "Tip of the week: keep screens out of the last hour before bed."
    );

    body
}
