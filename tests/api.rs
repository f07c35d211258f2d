use std::net::SocketAddr;
use std::sync::Arc;

use serde_json::{json, Value};
use sqlx::SqlitePool;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use uuid::Uuid;

use screenhealth_api::db;
use screenhealth_api::http::{build_router, AppState};
use screenhealth_api::predict::Predictor;

async fn spawn_app() -> (SocketAddr, SqlitePool, TempDir) {
    let dir = tempfile::tempdir().expect("tempdir");
    let pool = db::connect(&dir.path().join("screenhealth.db"))
        .await
        .expect("connect");
    db::init_db(&pool).await.expect("migrate");

    let app = build_router(AppState::new(pool.clone(), Arc::new(Predictor::heuristic())));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve app");
    });

    (addr, pool, dir)
}

async fn send(addr: SocketAddr, request: String) -> (u16, Value) {
    let mut stream = tokio::net::TcpStream::connect(addr)
        .await
        .expect("connect server");
    stream
        .write_all(request.as_bytes())
        .await
        .expect("write request");

    let mut response = String::new();
    stream
        .read_to_string(&mut response)
        .await
        .expect("read response");

    let status = response
        .strip_prefix("HTTP/1.1 ")
        .and_then(|rest| rest.get(..3))
        .and_then(|code| code.parse::<u16>().ok())
        .expect("status line");
    let body = response.split("\r\n\r\n").nth(1).unwrap_or("");
    let value = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_str(body).expect("json body")
    };
    (status, value)
}

async fn get(addr: SocketAddr, path: &str) -> (u16, Value) {
    send(
        addr,
        format!("GET {path} HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n\r\n"),
    )
    .await
}

async fn post_json(addr: SocketAddr, path: &str, body: &Value) -> (u16, Value) {
    let payload = body.to_string();
    send(
        addr,
        format!(
            "POST {path} HTTP/1.1\r\nHost: {addr}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{payload}",
            payload.len()
        ),
    )
    .await
}

/// Questionnaire that scores a 98.0 total risk under the heuristic rules.
fn heavy_survey(email: &str) -> Value {
    json!({
        "email": email,
        "totalScreenTime": "More than 6 hours",
        "socialMedia": "5–6 hours",
        "entertainment": "3–4 hours",
        "workTime": "3–4 hours",
        "sleepDuration": "Less than 5",
        "sleepQuality": 1,
        "screenBeforeSleep": "Always",
        "exercise": "Never",
        "stress": 5,
        "anxious": 5,
        "eyeStrain": 5,
        "addicted": "Yes",
        "ageGroup": "18–24",
    })
}

/// Questionnaire that scores a 13.0 total risk under the heuristic rules.
fn calm_survey(email: &str) -> Value {
    json!({
        "email": email,
        "totalScreenTime": "1–2 hours",
        "socialMedia": "Less than 1 hour",
        "entertainment": "Less than 1 hour",
        "workTime": "1–2 hours",
        "sleepDuration": "7–8",
        "sleepQuality": 5,
        "screenBeforeSleep": "Never",
        "exercise": "Daily",
        "stress": 1,
        "anxious": 1,
        "eyeStrain": 1,
        "addicted": "No",
    })
}

async fn count(pool: &SqlitePool, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(pool)
        .await
        .expect("count rows")
}

#[tokio::test]
async fn index_lists_endpoints() {
    let (addr, _pool, _dir) = spawn_app().await;
    let (status, body) = get(addr, "/").await;
    assert_eq!(status, 200);
    assert_eq!(body["name"], "screenhealth-api");
    let endpoints = body["endpoints"].as_array().expect("endpoints");
    assert!(endpoints.iter().any(|e| e == "POST /api/predict"));
}

#[tokio::test]
async fn health_reports_model_state() {
    let (addr, _pool, _dir) = spawn_app().await;
    let (status, body) = get(addr, "/api/health").await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["model_loaded"], false);
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn predict_scores_and_persists() {
    let (addr, pool, _dir) = spawn_app().await;

    let (status, body) = post_json(addr, "/api/predict", &heavy_survey("kai@example.com")).await;
    assert_eq!(status, 200);
    assert_eq!(body["prediction"]["is_healthy"], false);
    assert_eq!(body["prediction"]["status"], "Needs Improvement");
    assert_eq!(body["prediction"]["confidence"], 0.75);
    assert_eq!(body["risk_scores"]["total_risk"], 98.0);
    assert_eq!(body["risk_scores"]["screen_index"], 100.0);
    assert!(
        !body["recommendations"]["wellness_tips"]
            .as_array()
            .expect("tips")
            .is_empty()
    );
    Uuid::parse_str(body["assessment_uid"].as_str().expect("uid")).expect("valid uuid");

    // First contact auto-creates the user and stores the assessment.
    assert_eq!(count(&pool, "users").await, 1);
    assert_eq!(count(&pool, "assessments").await, 1);
}

#[tokio::test]
async fn predict_requires_a_usable_email() {
    let (addr, pool, _dir) = spawn_app().await;

    let mut survey = heavy_survey("");
    survey["email"] = json!("not-an-email");
    let (status, body) = post_json(addr, "/api/predict", &survey).await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["code"], "invalid_input");
    assert_eq!(count(&pool, "assessments").await, 0);
}

#[tokio::test]
async fn register_then_duplicate_conflicts() {
    let (addr, _pool, _dir) = spawn_app().await;

    let payload = json!({
        "email": "rowan@example.com",
        "password": "sufficiently-long",
        "name": "Rowan",
        "ageGroup": "25–34",
    });
    let (status, body) = post_json(addr, "/api/register", &payload).await;
    assert_eq!(status, 201);
    assert_eq!(body["user"]["email"], "rowan@example.com");
    assert_eq!(body["user"]["name"], "Rowan");
    assert!(body["user"]["id"].is_i64());
    // The hash must never appear in a response.
    assert!(body["user"].get("password_hash").is_none());

    let (status, body) = post_json(addr, "/api/register", &payload).await;
    assert_eq!(status, 409);
    assert_eq!(body["error"]["code"], "duplicate_email");
}

#[tokio::test]
async fn register_validates_email_and_password() {
    let (addr, _pool, _dir) = spawn_app().await;

    let (status, body) = post_json(
        addr,
        "/api/register",
        &json!({"email": "rowan@example.com", "password": "short"}),
    )
    .await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["code"], "invalid_input");

    let (status, body) = post_json(
        addr,
        "/api/register",
        &json!({"email": "rowan", "password": "sufficiently-long"}),
    )
    .await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["code"], "invalid_input");
}

#[tokio::test]
async fn login_checks_credentials() {
    let (addr, _pool, _dir) = spawn_app().await;

    post_json(
        addr,
        "/api/register",
        &json!({"email": "rowan@example.com", "password": "sufficiently-long"}),
    )
    .await;

    let (status, body) = post_json(
        addr,
        "/api/login",
        &json!({"email": "Rowan@Example.com", "password": "sufficiently-long"}),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["user"]["total_logins"], 1);
    assert!(body["user"]["last_login"].is_string());

    let (status, body) = post_json(
        addr,
        "/api/login",
        &json!({"email": "rowan@example.com", "password": "wrong-password"}),
    )
    .await;
    assert_eq!(status, 401);
    assert_eq!(body["error"]["code"], "unauthorized");
}

#[tokio::test]
async fn passwordless_accounts_cannot_log_in() {
    let (addr, _pool, _dir) = spawn_app().await;

    // Created implicitly by a prediction, so it has no password hash.
    post_json(addr, "/api/predict", &calm_survey("sage@example.com")).await;

    let (status, body) = post_json(
        addr,
        "/api/login",
        &json!({"email": "sage@example.com", "password": "anything-at-all"}),
    )
    .await;
    assert_eq!(status, 401);
    assert_eq!(body["error"]["code"], "unauthorized");
}

#[tokio::test]
async fn history_returns_creation_order() {
    let (addr, _pool, _dir) = spawn_app().await;
    let email = "kai@example.com";

    let mut uids = Vec::new();
    for survey in [calm_survey(email), heavy_survey(email), calm_survey(email)] {
        let (status, body) = post_json(addr, "/api/predict", &survey).await;
        assert_eq!(status, 200);
        uids.push(body["assessment_uid"].as_str().expect("uid").to_string());
    }

    let (status, body) = get(addr, "/api/user/kai@example.com/history").await;
    assert_eq!(status, 200);
    assert_eq!(body["count"], 3);
    let returned: Vec<&str> = body["assessments"]
        .as_array()
        .expect("assessments")
        .iter()
        .map(|a| a["uid"].as_str().expect("uid"))
        .collect();
    assert_eq!(returned, uids);
    assert_eq!(
        body["assessments"][0]["answers"]["totalScreenTime"],
        "1–2 hours"
    );

    let (status, body) = get(addr, "/api/user/kai@example.com/history?limit=2").await;
    assert_eq!(status, 200);
    assert_eq!(body["count"], 2);
    assert_eq!(body["assessments"][0]["uid"], uids[0].as_str());
    assert_eq!(body["assessments"][1]["uid"], uids[1].as_str());
}

#[tokio::test]
async fn user_stats_reconcile_with_submissions() {
    let (addr, _pool, _dir) = spawn_app().await;
    let email = "kai@example.com";

    post_json(addr, "/api/predict", &calm_survey(email)).await;
    post_json(addr, "/api/predict", &heavy_survey(email)).await;

    let (status, body) = get(addr, "/api/user/kai@example.com/stats").await;
    assert_eq!(status, 200);
    assert_eq!(body["total_assessments"], 2);
    assert_eq!(body["healthy_count"], 1);
    assert_eq!(body["unhealthy_count"], 1);
    assert_eq!(body["avg_risk_score"], 55.5);

    let trend = body["recent_trend"].as_array().expect("trend");
    assert_eq!(trend.len(), 2);
    // Most recent first: the heavy submission came last.
    assert_eq!(trend[0]["is_healthy"], false);
    assert_eq!(trend[1]["is_healthy"], true);
}

#[tokio::test]
async fn unknown_users_return_404() {
    let (addr, _pool, _dir) = spawn_app().await;

    let (status, body) = get(addr, "/api/user/ghost@example.com/history").await;
    assert_eq!(status, 404);
    assert_eq!(body["error"]["code"], "unknown_user");

    let (status, body) = get(addr, "/api/user/ghost@example.com/stats").await;
    assert_eq!(status, 404);
    assert_eq!(body["error"]["code"], "unknown_user");

    let (status, body) = post_json(
        addr,
        "/api/subscribe",
        &json!({"email": "ghost@example.com"}),
    )
    .await;
    assert_eq!(status, 404);
    assert_eq!(body["error"]["code"], "unknown_user");
}

#[tokio::test]
async fn subscribe_shows_up_in_admin_stats() {
    let (addr, _pool, _dir) = spawn_app().await;

    post_json(
        addr,
        "/api/register",
        &json!({"email": "rowan@example.com", "password": "sufficiently-long"}),
    )
    .await;
    post_json(addr, "/api/predict", &calm_survey("sage@example.com")).await;

    let (status, body) = post_json(
        addr,
        "/api/subscribe",
        &json!({"email": "rowan@example.com"}),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["subscribed"], true);

    let (status, body) = get(addr, "/api/admin/stats").await;
    assert_eq!(status, 200);
    assert_eq!(body["total_users"], 2);
    assert_eq!(body["total_assessments"], 1);
    assert_eq!(body["recent_assessments"], 1);
    assert_eq!(body["email_subscribers"], 1);
    assert!(body["database_size"].as_u64().expect("size") > 0);
}

#[tokio::test]
async fn weekly_summary_upserts_and_logs() {
    let (addr, pool, _dir) = spawn_app().await;
    let email = "kai@example.com";

    post_json(addr, "/api/predict", &heavy_survey(email)).await;
    post_json(addr, "/api/predict", &heavy_survey(email)).await;

    let (status, body) =
        post_json(addr, "/api/send-weekly-summary", &json!({"email": email})).await;
    assert_eq!(status, 200);
    assert_eq!(body["summary"]["total_assessments"], 2);
    assert_eq!(body["summary"]["avg_risk_score"], 98.0);
    // No stored summary for the previous week, so the trend is steady.
    assert_eq!(body["summary"]["improvement_trend"], "steady");
    assert_eq!(body["subject"], "Your Weekly Screen Time Summary");
    assert!(body["body"].as_str().expect("body").contains(email));
    assert!(body["email_log_id"].is_i64());

    // Re-sending refreshes the summary row instead of duplicating it,
    // while every send is logged.
    post_json(addr, "/api/predict", &heavy_survey(email)).await;
    let (status, body) =
        post_json(addr, "/api/send-weekly-summary", &json!({"email": email})).await;
    assert_eq!(status, 200);
    assert_eq!(body["summary"]["total_assessments"], 3);

    assert_eq!(count(&pool, "weekly_summaries").await, 1);
    assert_eq!(count(&pool, "email_logs").await, 2);
}

#[tokio::test]
async fn recommendations_do_not_persist_anything() {
    let (addr, pool, _dir) = spawn_app().await;

    let mut survey = heavy_survey("");
    survey.as_object_mut().expect("object").remove("email");
    let (status, body) = post_json(addr, "/api/recommendations", &survey).await;
    assert_eq!(status, 200);
    assert_eq!(body["risk_scores"]["total_risk"], 98.0);
    assert!(
        !body["recommendations"]["wellness_tips"]
            .as_array()
            .expect("tips")
            .is_empty()
    );
    assert!(
        !body["recommendations"]["app_lock_suggestions"]
            .as_array()
            .expect("suggestions")
            .is_empty()
    );

    assert_eq!(count(&pool, "users").await, 0);
    assert_eq!(count(&pool, "assessments").await, 0);
}
