use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{Duration, Utc};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::http::{ApiError, AppState};
use crate::models::{AdminStats, SurveyAnswers, UserStats};
use crate::predict::risk_scores;
use crate::{auth, db, recommend, weekly};

const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Deserialize)]
pub struct PredictRequest {
    #[serde(default)]
    pub email: String,
    #[serde(flatten)]
    pub answers: SurveyAnswers,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub age_group: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct EmailRequest {
    #[serde(default)]
    pub email: String,
}

pub async fn index() -> Json<Value> {
    Json(json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": [
            "GET /api/health",
            "POST /api/predict",
            "POST /api/register",
            "POST /api/login",
            "POST /api/recommendations",
            "POST /api/subscribe",
            "POST /api/send-weekly-summary",
            "GET /api/user/:email/history",
            "GET /api/user/:email/stats",
            "GET /api/admin/stats",
        ],
    }))
}

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "model_loaded": state.predictor.model_loaded(),
        "timestamp": Utc::now(),
    }))
}

/// Score a questionnaire, persist the assessment under the submitting
/// email (creating a passwordless user on first contact), and return the
/// prediction with recommendations.
pub async fn predict(
    State(state): State<AppState>,
    Json(req): Json<PredictRequest>,
) -> Result<Json<Value>, ApiError> {
    let email = normalized_email(&req.email)?;
    let user = db::ensure_user(&state.pool, &email, req.answers.age_group.as_deref())
        .await
        .map_err(ApiError::internal)?;

    let (prediction, scores) = state.predictor.evaluate(&req.answers);
    let recommendations = recommend::generate(&req.answers, &scores);
    let assessment = db::save_assessment(&state.pool, user.id, &req.answers, &prediction, &scores)
        .await
        .map_err(ApiError::internal)?;

    tracing::info!(
        email = %email,
        status = %prediction.status,
        total_risk = scores.total_risk,
        "assessment recorded"
    );

    Ok(Json(json!({
        "assessment_uid": assessment.uid,
        "prediction": prediction,
        "risk_scores": scores,
        "recommendations": recommendations,
        "timestamp": assessment.created_at,
    })))
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let email = normalized_email(&req.email)?;
    if req.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::invalid_input(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    let password_hash = auth::hash_password(&req.password).map_err(ApiError::internal)?;
    let user = match db::create_user(
        &state.pool,
        &email,
        Some(&password_hash),
        req.name.as_deref(),
        req.age_group.as_deref(),
    )
    .await
    {
        Ok(user) => user,
        Err(err) if db::is_unique_violation(&err) => {
            return Err(ApiError::duplicate_email("email already registered"));
        }
        Err(err) => return Err(ApiError::internal(err)),
    };

    tracing::info!(email = %user.email, "user registered");
    Ok((StatusCode::CREATED, Json(json!({ "user": user }))))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<CredentialsRequest>,
) -> Result<Json<Value>, ApiError> {
    let email = normalized_email(&req.email)?;
    let user = db::find_user_by_email(&state.pool, &email)
        .await
        .map_err(ApiError::internal)?
        .ok_or_else(|| ApiError::unauthorized("invalid email or password"))?;

    // Accounts auto-created by /api/predict carry no password and cannot
    // log in until they register.
    let stored = user
        .password_hash
        .as_deref()
        .ok_or_else(|| ApiError::unauthorized("invalid email or password"))?;
    if !auth::verify_password(&req.password, stored) {
        return Err(ApiError::unauthorized("invalid email or password"));
    }

    let user = db::record_login(&state.pool, user.id)
        .await
        .map_err(ApiError::internal)?;

    tracing::info!(email = %user.email, total_logins = user.total_logins, "login succeeded");
    Ok(Json(json!({ "user": user })))
}

/// Recompute recommendations for a questionnaire without persisting
/// anything, so the frontend can refresh advice as answers change.
pub async fn recommendations(Json(answers): Json<SurveyAnswers>) -> Json<Value> {
    let scores = risk_scores(&answers);
    let recommendations = recommend::generate(&answers, &scores);
    Json(json!({
        "recommendations": recommendations,
        "risk_scores": scores,
        "timestamp": Utc::now(),
    }))
}

pub async fn subscribe(
    State(state): State<AppState>,
    Json(req): Json<EmailRequest>,
) -> Result<Json<Value>, ApiError> {
    let email = normalized_email(&req.email)?;
    let user = db::find_user_by_email(&state.pool, &email)
        .await
        .map_err(ApiError::internal)?
        .ok_or_else(|| ApiError::unknown_user("no user with that email"))?;

    db::set_weekly_opt_in(&state.pool, user.id, true)
        .await
        .map_err(ApiError::internal)?;

    tracing::info!(email = %email, "weekly summary subscription enabled");
    Ok(Json(json!({ "subscribed": true, "email": email })))
}

/// Aggregate the current Monday-based week, upsert the summary row, and
/// record the matching email log entry. Re-sending within the same week
/// refreshes the stored row instead of duplicating it.
pub async fn send_weekly_summary(
    State(state): State<AppState>,
    Json(req): Json<EmailRequest>,
) -> Result<Json<Value>, ApiError> {
    let email = normalized_email(&req.email)?;
    let user = db::find_user_by_email(&state.pool, &email)
        .await
        .map_err(ApiError::internal)?
        .ok_or_else(|| ApiError::unknown_user("no user with that email"))?;

    let (week_start, week_end) = weekly::week_bounds(Utc::now().date_naive());
    let (window_start, window_end) = weekly::week_window_utc(week_start);
    let (total, avg_risk) =
        db::assessment_window_stats(&state.pool, user.id, window_start, window_end)
            .await
            .map_err(ApiError::internal)?;

    let previous = db::weekly_summary_for(&state.pool, user.id, week_start - Duration::days(7))
        .await
        .map_err(ApiError::internal)?;
    let trend = weekly::trend_between(previous.map(|s| s.avg_risk_score), avg_risk);

    let summary = db::upsert_weekly_summary(
        &state.pool,
        user.id,
        week_start,
        week_end,
        total,
        avg_risk,
        trend.as_str(),
        true,
    )
    .await
    .map_err(ApiError::internal)?;

    let body = weekly::render_summary_body(&email, &summary);
    let log = db::log_email(
        &state.pool,
        user.id,
        weekly::WEEKLY_SUMMARY_EMAIL_TYPE,
        weekly::WEEKLY_SUMMARY_SUBJECT,
        true,
        None,
    )
    .await
    .map_err(ApiError::internal)?;

    tracing::info!(
        email = %email,
        week_start = %summary.week_start,
        trend = %summary.improvement_trend,
        "weekly summary recorded"
    );

    Ok(Json(json!({
        "summary": summary,
        "subject": weekly::WEEKLY_SUMMARY_SUBJECT,
        "body": body,
        "email_log_id": log.id,
    })))
}

pub async fn history(
    State(state): State<AppState>,
    Path(email): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Value>, ApiError> {
    let email = normalized_email(&email)?;
    let user = db::find_user_by_email(&state.pool, &email)
        .await
        .map_err(ApiError::internal)?
        .ok_or_else(|| ApiError::unknown_user("no user with that email"))?;

    // Unparseable limits fall back to the default rather than erroring.
    let limit = params
        .get("limit")
        .and_then(|raw| raw.parse::<i64>().ok())
        .unwrap_or(db::DEFAULT_HISTORY_LIMIT);
    let assessments = db::history(&state.pool, user.id, limit)
        .await
        .map_err(ApiError::internal)?;

    Ok(Json(json!({
        "email": email,
        "count": assessments.len(),
        "assessments": assessments,
    })))
}

pub async fn user_stats(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> Result<Json<UserStats>, ApiError> {
    let email = normalized_email(&email)?;
    let user = db::find_user_by_email(&state.pool, &email)
        .await
        .map_err(ApiError::internal)?
        .ok_or_else(|| ApiError::unknown_user("no user with that email"))?;

    let stats = db::user_stats(&state.pool, user.id)
        .await
        .map_err(ApiError::internal)?;
    Ok(Json(stats))
}

pub async fn admin_stats(State(state): State<AppState>) -> Result<Json<AdminStats>, ApiError> {
    let stats = db::admin_stats(&state.pool)
        .await
        .map_err(ApiError::internal)?;
    Ok(Json(stats))
}

/// Trim, validate, and lowercase an email address. Lookups and inserts
/// always see the normalized form, so case differences cannot create
/// duplicate accounts.
fn normalized_email(raw: &str) -> Result<String, ApiError> {
    let email = raw.trim();
    if email.is_empty() {
        return Err(ApiError::invalid_input("email is required"));
    }
    if !looks_like_email(email) {
        return Err(ApiError::invalid_input("email address is malformed"));
    }
    Ok(email.to_ascii_lowercase())
}

fn looks_like_email(value: &str) -> bool {
    if value.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}
