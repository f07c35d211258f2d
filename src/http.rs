use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use sqlx::SqlitePool;

use crate::handlers;
use crate::predict::Predictor;

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub predictor: Arc<Predictor>,
}

impl AppState {
    pub fn new(pool: SqlitePool, predictor: Arc<Predictor>) -> Self {
        Self { pool, predictor }
    }
}

/// Request failure serialized as `{"error": {"code": ..., "message": ...}}`.
/// Internal faults are logged server-side and never leak their cause.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl ApiError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code: "invalid_input",
            message: message.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            code: "unauthorized",
            message: message.into(),
        }
    }

    pub fn unknown_user(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            code: "unknown_user",
            message: message.into(),
        }
    }

    pub fn duplicate_email(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::CONFLICT,
            code: "duplicate_email",
            message: message.into(),
        }
    }

    pub fn internal(err: impl Into<anyhow::Error>) -> Self {
        let err = err.into();
        tracing::error!("request failed: {err:#}");
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: "internal",
            message: "internal server error".to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": { "code": self.code, "message": self.message }
        }));
        (self.status, body).into_response()
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/api/health", get(handlers::health))
        .route("/api/predict", post(handlers::predict))
        .route("/api/register", post(handlers::register))
        .route("/api/login", post(handlers::login))
        .route("/api/recommendations", post(handlers::recommendations))
        .route("/api/subscribe", post(handlers::subscribe))
        .route("/api/send-weekly-summary", post(handlers::send_weekly_summary))
        .route("/api/user/:email/history", get(handlers::history))
        .route("/api/user/:email/stats", get(handlers::user_stats))
        .route("/api/admin/stats", get(handlers::admin_stats))
        .with_state(state)
}
