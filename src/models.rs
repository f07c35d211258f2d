use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

fn default_rating() -> i64 {
    3
}

/// One submitted questionnaire, keyed the way the frontend posts it.
///
/// Band answers arrive as the exact option strings shown to the user and
/// map to ordinal codes in `predict`; self-ratings are 1-5 integers that
/// default to 3 when omitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyAnswers {
    #[serde(default)]
    pub total_screen_time: String,
    #[serde(default)]
    pub social_media: String,
    #[serde(default)]
    pub entertainment: String,
    #[serde(default)]
    pub work_time: String,
    #[serde(default)]
    pub sleep_duration: String,
    #[serde(default = "default_rating")]
    pub sleep_quality: i64,
    #[serde(default)]
    pub screen_before_sleep: String,
    #[serde(default)]
    pub exercise: String,
    #[serde(default = "default_rating")]
    pub stress: i64,
    #[serde(default = "default_rating")]
    pub anxious: i64,
    #[serde(default = "default_rating")]
    pub eye_strain: i64,
    #[serde(default)]
    pub addicted: String,
    #[serde(default)]
    pub age_group: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskScores {
    pub total_risk: f64,
    pub screen_time_score: f64,
    pub sleep_risk: f64,
    pub behavioral_risk: f64,
    pub screen_index: f64,
    pub sleep_health: f64,
    pub wellbeing_score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prediction {
    pub is_healthy: bool,
    pub confidence: f64,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub name: Option<String>,
    pub age_group: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_assessment: Option<DateTime<Utc>>,
    pub last_login: Option<DateTime<Utc>>,
    pub weekly_email_enabled: bool,
    pub total_logins: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Assessment {
    pub id: i64,
    pub uid: Uuid,
    pub user_id: i64,
    pub answers: serde_json::Value,
    pub prediction: serde_json::Value,
    pub risk_scores: serde_json::Value,
    pub is_healthy: bool,
    pub confidence: f64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrendPoint {
    pub is_healthy: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserStats {
    pub total_assessments: i64,
    pub avg_risk_score: f64,
    pub healthy_count: i64,
    pub unhealthy_count: i64,
    pub recent_trend: Vec<TrendPoint>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdminStats {
    pub total_users: i64,
    pub total_assessments: i64,
    pub recent_assessments: i64,
    pub email_subscribers: i64,
    pub database_size: u64,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct WeeklySummary {
    pub id: i64,
    pub user_id: i64,
    pub week_start: NaiveDate,
    pub week_end: NaiveDate,
    pub total_assessments: i64,
    pub avg_risk_score: f64,
    pub improvement_trend: String,
    pub email_recorded: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct EmailLog {
    pub id: i64,
    pub user_id: i64,
    pub email_type: String,
    pub subject: String,
    pub sent_at: DateTime<Utc>,
    pub success: bool,
    pub error_message: Option<String>,
}
