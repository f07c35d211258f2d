use std::path::Path;

use anyhow::Context;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::models::{
    AdminStats, Assessment, EmailLog, Prediction, RiskScores, SurveyAnswers, TrendPoint, User,
    UserStats, WeeklySummary,
};
use crate::predict::Predictor;

pub const DEFAULT_HISTORY_LIMIT: i64 = 50;
pub const MAX_HISTORY_LIMIT: i64 = 200;

pub async fn connect(path: &Path) -> anyhow::Result<SqlitePool> {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .foreign_keys(true);

    SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .with_context(|| format!("failed to open database {}", path.display()))
}

pub async fn init_db(pool: &SqlitePool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// True when `err` wraps a sqlx unique-constraint failure, e.g. a second
/// insert for an already-registered email.
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    err.downcast_ref::<sqlx::Error>()
        .and_then(|err| err.as_database_error())
        .is_some_and(|db_err| db_err.is_unique_violation())
}

pub async fn create_user(
    pool: &SqlitePool,
    email: &str,
    password_hash: Option<&str>,
    name: Option<&str>,
    age_group: Option<&str>,
) -> anyhow::Result<User> {
    sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (email, password_hash, name, age_group, created_at)
        VALUES (?, ?, ?, ?, ?)
        RETURNING id, email, password_hash, name, age_group, created_at,
                  last_assessment, last_login, weekly_email_enabled, total_logins
        "#,
    )
    .bind(email)
    .bind(password_hash)
    .bind(name)
    .bind(age_group)
    .bind(Utc::now())
    .fetch_one(pool)
    .await
    .context("failed to insert user")
}

pub async fn find_user_by_email(pool: &SqlitePool, email: &str) -> anyhow::Result<Option<User>> {
    sqlx::query_as::<_, User>(
        r#"
        SELECT id, email, password_hash, name, age_group, created_at,
               last_assessment, last_login, weekly_email_enabled, total_logins
        FROM users
        WHERE email = ?
        "#,
    )
    .bind(email)
    .fetch_optional(pool)
    .await
    .context("failed to look up user")
}

/// Fetch the user row for `email`, creating a passwordless one when absent.
/// A concurrent insert of the same email is resolved by re-reading.
pub async fn ensure_user(
    pool: &SqlitePool,
    email: &str,
    age_group: Option<&str>,
) -> anyhow::Result<User> {
    if let Some(user) = find_user_by_email(pool, email).await? {
        return Ok(user);
    }
    match create_user(pool, email, None, None, age_group).await {
        Ok(user) => Ok(user),
        Err(err) if is_unique_violation(&err) => find_user_by_email(pool, email)
            .await?
            .context("user row missing after conflicting insert"),
        Err(err) => Err(err),
    }
}

pub async fn record_login(pool: &SqlitePool, user_id: i64) -> anyhow::Result<User> {
    sqlx::query_as::<_, User>(
        r#"
        UPDATE users
        SET last_login = ?, total_logins = total_logins + 1
        WHERE id = ?
        RETURNING id, email, password_hash, name, age_group, created_at,
                  last_assessment, last_login, weekly_email_enabled, total_logins
        "#,
    )
    .bind(Utc::now())
    .bind(user_id)
    .fetch_one(pool)
    .await
    .context("failed to record login")
}

pub async fn set_weekly_opt_in(
    pool: &SqlitePool,
    user_id: i64,
    enabled: bool,
) -> anyhow::Result<()> {
    sqlx::query("UPDATE users SET weekly_email_enabled = ? WHERE id = ?")
        .bind(enabled)
        .bind(user_id)
        .execute(pool)
        .await
        .context("failed to update weekly email opt-in")?;
    Ok(())
}

/// Persist one scored questionnaire and stamp the user's last_assessment
/// in the same transaction.
pub async fn save_assessment(
    pool: &SqlitePool,
    user_id: i64,
    answers: &SurveyAnswers,
    prediction: &Prediction,
    risk_scores: &RiskScores,
) -> anyhow::Result<Assessment> {
    let uid = Uuid::new_v4();
    let created_at = Utc::now();
    let answers_json = serde_json::to_value(answers).context("failed to encode answers")?;
    let prediction_json =
        serde_json::to_value(prediction).context("failed to encode prediction")?;
    let risk_json = serde_json::to_value(risk_scores).context("failed to encode risk scores")?;

    let mut tx = pool.begin().await.context("failed to begin transaction")?;

    let id: i64 = sqlx::query(
        r#"
        INSERT INTO assessments
        (uid, user_id, answers, prediction, risk_scores, is_healthy, confidence, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(uid.to_string())
    .bind(user_id)
    .bind(answers_json.to_string())
    .bind(prediction_json.to_string())
    .bind(risk_json.to_string())
    .bind(prediction.is_healthy)
    .bind(prediction.confidence)
    .bind(created_at)
    .fetch_one(&mut *tx)
    .await
    .context("failed to insert assessment")?
    .get("id");

    sqlx::query("UPDATE users SET last_assessment = ? WHERE id = ?")
        .bind(created_at)
        .bind(user_id)
        .execute(&mut *tx)
        .await
        .context("failed to stamp last assessment")?;

    tx.commit().await.context("failed to commit assessment")?;

    Ok(Assessment {
        id,
        uid,
        user_id,
        answers: answers_json,
        prediction: prediction_json,
        risk_scores: risk_json,
        is_healthy: prediction.is_healthy,
        confidence: prediction.confidence,
        created_at,
    })
}

/// Assessments for a user in creation order (oldest first), with the row
/// id breaking same-instant ties. `limit` is clamped to 1..=200.
pub async fn history(
    pool: &SqlitePool,
    user_id: i64,
    limit: i64,
) -> anyhow::Result<Vec<Assessment>> {
    let rows = sqlx::query(
        r#"
        SELECT id, uid, user_id, answers, prediction, risk_scores,
               is_healthy, confidence, created_at
        FROM assessments
        WHERE user_id = ?
        ORDER BY created_at ASC, id ASC
        LIMIT ?
        "#,
    )
    .bind(user_id)
    .bind(limit.clamp(1, MAX_HISTORY_LIMIT))
    .fetch_all(pool)
    .await
    .context("failed to fetch assessment history")?;

    rows.into_iter().map(map_assessment).collect()
}

fn map_assessment(row: SqliteRow) -> anyhow::Result<Assessment> {
    let uid: String = row.get("uid");
    let answers: String = row.get("answers");
    let prediction: String = row.get("prediction");
    let risk_scores: String = row.get("risk_scores");

    Ok(Assessment {
        id: row.get("id"),
        uid: Uuid::parse_str(&uid).context("assessment uid is not a valid UUID")?,
        user_id: row.get("user_id"),
        answers: serde_json::from_str(&answers).context("stored answers are not valid JSON")?,
        prediction: serde_json::from_str(&prediction)
            .context("stored prediction is not valid JSON")?,
        risk_scores: serde_json::from_str(&risk_scores)
            .context("stored risk scores are not valid JSON")?,
        is_healthy: row.get("is_healthy"),
        confidence: row.get("confidence"),
        created_at: row.get("created_at"),
    })
}

pub async fn user_stats(pool: &SqlitePool, user_id: i64) -> anyhow::Result<UserStats> {
    let totals = sqlx::query(
        r#"
        SELECT COUNT(*) AS total,
               COALESCE(AVG(json_extract(risk_scores, '$.total_risk')), 0.0) AS avg_risk,
               COALESCE(SUM(CASE WHEN is_healthy = 1 THEN 1 ELSE 0 END), 0) AS healthy,
               COALESCE(SUM(CASE WHEN is_healthy = 0 THEN 1 ELSE 0 END), 0) AS unhealthy
        FROM assessments
        WHERE user_id = ?
        "#,
    )
    .bind(user_id)
    .fetch_one(pool)
    .await
    .context("failed to aggregate user stats")?;

    let recent = sqlx::query(
        r#"
        SELECT is_healthy, created_at
        FROM assessments
        WHERE user_id = ?
        ORDER BY created_at DESC, id DESC
        LIMIT 5
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .context("failed to fetch recent trend")?;

    Ok(UserStats {
        total_assessments: totals.get("total"),
        avg_risk_score: totals.get("avg_risk"),
        healthy_count: totals.get("healthy"),
        unhealthy_count: totals.get("unhealthy"),
        recent_trend: recent
            .into_iter()
            .map(|row| TrendPoint {
                is_healthy: row.get("is_healthy"),
                created_at: row.get("created_at"),
            })
            .collect(),
    })
}

pub async fn admin_stats(pool: &SqlitePool) -> anyhow::Result<AdminStats> {
    let total_users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await
        .context("failed to count users")?;

    let total_assessments: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM assessments")
        .fetch_one(pool)
        .await
        .context("failed to count assessments")?;

    let recent_assessments: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM assessments WHERE created_at >= ?")
            .bind(Utc::now() - Duration::days(7))
            .fetch_one(pool)
            .await
            .context("failed to count recent assessments")?;

    let email_subscribers: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE weekly_email_enabled = 1")
            .fetch_one(pool)
            .await
            .context("failed to count subscribers")?;

    // Allocated pages times page size is the on-disk size of the main file.
    let database_size: i64 = sqlx::query_scalar(
        "SELECT page_count * page_size FROM pragma_page_count(), pragma_page_size()",
    )
    .fetch_one(pool)
    .await
    .context("failed to read database size")?;

    Ok(AdminStats {
        total_users,
        total_assessments,
        recent_assessments,
        email_subscribers,
        database_size: database_size.max(0) as u64,
    })
}

/// Assessment count and average total risk inside [start, end).
pub async fn assessment_window_stats(
    pool: &SqlitePool,
    user_id: i64,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> anyhow::Result<(i64, f64)> {
    let row = sqlx::query(
        r#"
        SELECT COUNT(*) AS total,
               COALESCE(AVG(json_extract(risk_scores, '$.total_risk')), 0.0) AS avg_risk
        FROM assessments
        WHERE user_id = ? AND created_at >= ? AND created_at < ?
        "#,
    )
    .bind(user_id)
    .bind(start)
    .bind(end)
    .fetch_one(pool)
    .await
    .context("failed to aggregate weekly window")?;

    Ok((row.get("total"), row.get("avg_risk")))
}

pub async fn upsert_weekly_summary(
    pool: &SqlitePool,
    user_id: i64,
    week_start: NaiveDate,
    week_end: NaiveDate,
    total_assessments: i64,
    avg_risk_score: f64,
    improvement_trend: &str,
    email_recorded: bool,
) -> anyhow::Result<WeeklySummary> {
    sqlx::query_as::<_, WeeklySummary>(
        r#"
        INSERT INTO weekly_summaries
        (user_id, week_start, week_end, total_assessments, avg_risk_score,
         improvement_trend, email_recorded, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT (user_id, week_start) DO UPDATE
        SET week_end = EXCLUDED.week_end,
            total_assessments = EXCLUDED.total_assessments,
            avg_risk_score = EXCLUDED.avg_risk_score,
            improvement_trend = EXCLUDED.improvement_trend,
            email_recorded = EXCLUDED.email_recorded,
            created_at = EXCLUDED.created_at
        RETURNING id, user_id, week_start, week_end, total_assessments,
                  avg_risk_score, improvement_trend, email_recorded, created_at
        "#,
    )
    .bind(user_id)
    .bind(week_start)
    .bind(week_end)
    .bind(total_assessments)
    .bind(avg_risk_score)
    .bind(improvement_trend)
    .bind(email_recorded)
    .bind(Utc::now())
    .fetch_one(pool)
    .await
    .context("failed to upsert weekly summary")
}

pub async fn weekly_summary_for(
    pool: &SqlitePool,
    user_id: i64,
    week_start: NaiveDate,
) -> anyhow::Result<Option<WeeklySummary>> {
    sqlx::query_as::<_, WeeklySummary>(
        r#"
        SELECT id, user_id, week_start, week_end, total_assessments,
               avg_risk_score, improvement_trend, email_recorded, created_at
        FROM weekly_summaries
        WHERE user_id = ? AND week_start = ?
        "#,
    )
    .bind(user_id)
    .bind(week_start)
    .fetch_optional(pool)
    .await
    .context("failed to look up weekly summary")
}

pub async fn log_email(
    pool: &SqlitePool,
    user_id: i64,
    email_type: &str,
    subject: &str,
    success: bool,
    error_message: Option<&str>,
) -> anyhow::Result<EmailLog> {
    sqlx::query_as::<_, EmailLog>(
        r#"
        INSERT INTO email_logs (user_id, email_type, subject, sent_at, success, error_message)
        VALUES (?, ?, ?, ?, ?, ?)
        RETURNING id, user_id, email_type, subject, sent_at, success, error_message
        "#,
    )
    .bind(user_id)
    .bind(email_type)
    .bind(subject)
    .bind(Utc::now())
    .bind(success)
    .bind(error_message)
    .fetch_one(pool)
    .await
    .context("failed to record email log")
}

/// Most recent email log rows paired with the owning user's email.
pub async fn recent_email_logs(
    pool: &SqlitePool,
    limit: i64,
) -> anyhow::Result<Vec<(EmailLog, String)>> {
    let rows = sqlx::query(
        r#"
        SELECT e.id, e.user_id, e.email_type, e.subject, e.sent_at,
               e.success, e.error_message, u.email
        FROM email_logs e
        JOIN users u ON u.id = e.user_id
        ORDER BY e.sent_at DESC, e.id DESC
        LIMIT ?
        "#,
    )
    .bind(limit.clamp(1, 200))
    .fetch_all(pool)
    .await
    .context("failed to fetch email logs")?;

    Ok(rows
        .into_iter()
        .map(|row| {
            (
                EmailLog {
                    id: row.get("id"),
                    user_id: row.get("user_id"),
                    email_type: row.get("email_type"),
                    subject: row.get("subject"),
                    sent_at: row.get("sent_at"),
                    success: row.get("success"),
                    error_message: row.get("error_message"),
                },
                row.get("email"),
            )
        })
        .collect())
}

pub async fn export(pool: &SqlitePool) -> anyhow::Result<serde_json::Value> {
    let users = sqlx::query_as::<_, User>(
        r#"
        SELECT id, email, password_hash, name, age_group, created_at,
               last_assessment, last_login, weekly_email_enabled, total_logins
        FROM users
        ORDER BY id ASC
        "#,
    )
    .fetch_all(pool)
    .await
    .context("failed to export users")?;

    let assessments = sqlx::query(
        r#"
        SELECT id, uid, user_id, answers, prediction, risk_scores,
               is_healthy, confidence, created_at
        FROM assessments
        ORDER BY id ASC
        "#,
    )
    .fetch_all(pool)
    .await
    .context("failed to export assessments")?
    .into_iter()
    .map(map_assessment)
    .collect::<anyhow::Result<Vec<_>>>()?;

    let email_logs = sqlx::query_as::<_, EmailLog>(
        r#"
        SELECT id, user_id, email_type, subject, sent_at, success, error_message
        FROM email_logs
        ORDER BY id ASC
        "#,
    )
    .fetch_all(pool)
    .await
    .context("failed to export email logs")?;

    Ok(serde_json::json!({
        "export_date": Utc::now(),
        "users": users,
        "assessments": assessments,
        "email_logs": email_logs,
    }))
}

/// Import survey responses from a CSV file, scoring each row and saving
/// the resulting assessment. Returns the number of rows imported.
pub async fn import_csv(
    pool: &SqlitePool,
    predictor: &Predictor,
    csv_path: &Path,
) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct CsvRow {
        email: String,
        #[serde(default)]
        total_screen_time: String,
        #[serde(default)]
        social_media: String,
        #[serde(default)]
        entertainment: String,
        #[serde(default)]
        work_time: String,
        #[serde(default)]
        sleep_duration: String,
        #[serde(default = "default_rating")]
        sleep_quality: i64,
        #[serde(default)]
        screen_before_sleep: String,
        #[serde(default)]
        exercise: String,
        #[serde(default = "default_rating")]
        stress: i64,
        #[serde(default = "default_rating")]
        anxious: i64,
        #[serde(default = "default_rating")]
        eye_strain: i64,
        #[serde(default)]
        addicted: String,
        #[serde(default)]
        age_group: Option<String>,
    }

    fn default_rating() -> i64 {
        3
    }

    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let mut imported = 0usize;

    for result in reader.deserialize::<CsvRow>() {
        let row = result.context("malformed CSV row")?;
        let answers = SurveyAnswers {
            total_screen_time: row.total_screen_time,
            social_media: row.social_media,
            entertainment: row.entertainment,
            work_time: row.work_time,
            sleep_duration: row.sleep_duration,
            sleep_quality: row.sleep_quality,
            screen_before_sleep: row.screen_before_sleep,
            exercise: row.exercise,
            stress: row.stress,
            anxious: row.anxious,
            eye_strain: row.eye_strain,
            addicted: row.addicted,
            age_group: row.age_group,
        };

        let user = ensure_user(pool, row.email.trim(), answers.age_group.as_deref()).await?;
        let (prediction, scores) = predictor.evaluate(&answers);
        save_assessment(pool, user.id, &answers, &prediction, &scores).await?;
        imported += 1;
    }

    Ok(imported)
}

pub async fn seed(pool: &SqlitePool, predictor: &Predictor) -> anyhow::Result<()> {
    let members = [
        (
            "maya.chen@example.com",
            "Maya Chen",
            "18–24",
            SurveyAnswers {
                total_screen_time: "More than 6 hours".to_string(),
                social_media: "5–6 hours".to_string(),
                entertainment: "3–4 hours".to_string(),
                work_time: "3–4 hours".to_string(),
                sleep_duration: "5–6".to_string(),
                sleep_quality: 2,
                screen_before_sleep: "Always".to_string(),
                exercise: "Never".to_string(),
                stress: 4,
                anxious: 4,
                eye_strain: 3,
                addicted: "Yes".to_string(),
                age_group: Some("18–24".to_string()),
            },
        ),
        (
            "dev.patel@example.com",
            "Dev Patel",
            "25–34",
            SurveyAnswers {
                total_screen_time: "3–4 hours".to_string(),
                social_media: "1–2 hours".to_string(),
                entertainment: "1–2 hours".to_string(),
                work_time: "5–6 hours".to_string(),
                sleep_duration: "6–7".to_string(),
                sleep_quality: 3,
                screen_before_sleep: "Sometimes".to_string(),
                exercise: "1–2 days per week".to_string(),
                stress: 3,
                anxious: 2,
                eye_strain: 3,
                addicted: "Maybe".to_string(),
                age_group: Some("25–34".to_string()),
            },
        ),
        (
            "sofia.reyes@example.com",
            "Sofia Reyes",
            "35–44",
            SurveyAnswers {
                total_screen_time: "1–2 hours".to_string(),
                social_media: "Less than 1 hour".to_string(),
                entertainment: "Less than 1 hour".to_string(),
                work_time: "3–4 hours".to_string(),
                sleep_duration: "7–8".to_string(),
                sleep_quality: 4,
                screen_before_sleep: "Rarely".to_string(),
                exercise: "3–4 days per week".to_string(),
                stress: 2,
                anxious: 1,
                eye_strain: 1,
                addicted: "No".to_string(),
                age_group: Some("35–44".to_string()),
            },
        ),
    ];

    for (email, name, age_group, answers) in members {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, password_hash, name, age_group, created_at)
            VALUES (?, NULL, ?, ?, ?)
            ON CONFLICT (email) DO UPDATE
            SET name = EXCLUDED.name, age_group = EXCLUDED.age_group
            RETURNING id, email, password_hash, name, age_group, created_at,
                      last_assessment, last_login, weekly_email_enabled, total_logins
            "#,
        )
        .bind(email)
        .bind(name)
        .bind(age_group)
        .bind(Utc::now())
        .fetch_one(pool)
        .await
        .context("failed to seed user")?;

        // Re-running the seed must not pile up duplicate assessments.
        let existing: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM assessments WHERE user_id = ?")
                .bind(user.id)
                .fetch_one(pool)
                .await?;
        if existing == 0 {
            let (prediction, scores) = predictor.evaluate(&answers);
            save_assessment(pool, user.id, &answers, &prediction, &scores).await?;
        }
    }

    set_weekly_opt_in(
        pool,
        find_user_by_email(pool, "maya.chen@example.com")
            .await?
            .context("seed user missing")?
            .id,
        true,
    )
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn test_pool() -> (SqlitePool, TempDir) {
        let dir = tempfile::tempdir().expect("tempdir");
        let pool = connect(&dir.path().join("test.db")).await.expect("connect");
        init_db(&pool).await.expect("migrate");
        (pool, dir)
    }

    fn calm_answers() -> SurveyAnswers {
        SurveyAnswers {
            total_screen_time: "1–2 hours".to_string(),
            social_media: "Less than 1 hour".to_string(),
            entertainment: "Less than 1 hour".to_string(),
            work_time: "1–2 hours".to_string(),
            sleep_duration: "7–8".to_string(),
            sleep_quality: 5,
            screen_before_sleep: "Never".to_string(),
            exercise: "Daily".to_string(),
            stress: 1,
            anxious: 1,
            eye_strain: 1,
            addicted: "No".to_string(),
            age_group: None,
        }
    }

    async fn scored_assessment(pool: &SqlitePool, user_id: i64) -> Assessment {
        let answers = calm_answers();
        let (prediction, scores) = Predictor::heuristic().evaluate(&answers);
        save_assessment(pool, user_id, &answers, &prediction, &scores)
            .await
            .expect("save assessment")
    }

    #[tokio::test]
    async fn duplicate_email_is_a_unique_violation() {
        let (pool, _dir) = test_pool().await;
        create_user(&pool, "a@example.com", None, None, None)
            .await
            .expect("first insert");
        let err = create_user(&pool, "a@example.com", None, None, None)
            .await
            .expect_err("second insert must fail");
        assert!(is_unique_violation(&err));
    }

    #[tokio::test]
    async fn ensure_user_reuses_the_existing_row() {
        let (pool, _dir) = test_pool().await;
        let first = ensure_user(&pool, "a@example.com", Some("18–24"))
            .await
            .expect("create");
        let second = ensure_user(&pool, "a@example.com", None).await.expect("reuse");
        assert_eq!(first.id, second.id);
        assert_eq!(second.age_group.as_deref(), Some("18–24"));
    }

    #[tokio::test]
    async fn history_orders_by_creation_and_clamps_limit() {
        let (pool, _dir) = test_pool().await;
        let user = ensure_user(&pool, "a@example.com", None).await.expect("user");

        let mut uids = Vec::new();
        for _ in 0..3 {
            uids.push(scored_assessment(&pool, user.id).await.uid);
        }

        let all = history(&pool, user.id, 500).await.expect("history");
        assert_eq!(all.iter().map(|a| a.uid).collect::<Vec<_>>(), uids);

        let clamped = history(&pool, user.id, 0).await.expect("history");
        assert_eq!(clamped.len(), 1);
        assert_eq!(clamped[0].uid, uids[0]);
    }

    #[tokio::test]
    async fn save_assessment_stamps_the_user_row() {
        let (pool, _dir) = test_pool().await;
        let user = ensure_user(&pool, "a@example.com", None).await.expect("user");
        assert!(user.last_assessment.is_none());

        scored_assessment(&pool, user.id).await;

        let reloaded = find_user_by_email(&pool, "a@example.com")
            .await
            .expect("lookup")
            .expect("exists");
        assert!(reloaded.last_assessment.is_some());
    }

    #[tokio::test]
    async fn weekly_upsert_replaces_the_same_week() {
        let (pool, _dir) = test_pool().await;
        let user = ensure_user(&pool, "a@example.com", None).await.expect("user");
        let week_start = NaiveDate::from_ymd_opt(2026, 8, 24).expect("date");
        let week_end = NaiveDate::from_ymd_opt(2026, 8, 30).expect("date");

        let first = upsert_weekly_summary(
            &pool, user.id, week_start, week_end, 2, 40.0, "steady", true,
        )
        .await
        .expect("insert");
        let second = upsert_weekly_summary(
            &pool, user.id, week_start, week_end, 5, 35.0, "improving", true,
        )
        .await
        .expect("upsert");

        assert_eq!(first.id, second.id);
        assert_eq!(second.total_assessments, 5);
        assert_eq!(second.improvement_trend, "improving");

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM weekly_summaries")
            .fetch_one(&pool)
            .await
            .expect("count");
        assert_eq!(count, 1);

        let found = weekly_summary_for(&pool, user.id, week_start)
            .await
            .expect("lookup")
            .expect("exists");
        assert_eq!(found.avg_risk_score, 35.0);
    }

    #[tokio::test]
    async fn empty_window_aggregates_to_zero() {
        let (pool, _dir) = test_pool().await;
        let user = ensure_user(&pool, "a@example.com", None).await.expect("user");
        let (total, avg) = assessment_window_stats(
            &pool,
            user.id,
            Utc::now() - Duration::days(7),
            Utc::now(),
        )
        .await
        .expect("window stats");
        assert_eq!(total, 0);
        assert_eq!(avg, 0.0);
    }

    #[tokio::test]
    async fn admin_stats_reconcile_with_rows() {
        let (pool, _dir) = test_pool().await;
        let first = ensure_user(&pool, "a@example.com", None).await.expect("user");
        ensure_user(&pool, "b@example.com", None).await.expect("user");
        set_weekly_opt_in(&pool, first.id, true).await.expect("opt in");
        scored_assessment(&pool, first.id).await;

        let stats = admin_stats(&pool).await.expect("admin stats");
        assert_eq!(stats.total_users, 2);
        assert_eq!(stats.total_assessments, 1);
        assert_eq!(stats.recent_assessments, 1);
        assert_eq!(stats.email_subscribers, 1);
        assert!(stats.database_size > 0);
    }

    #[tokio::test]
    async fn export_carries_all_tables() {
        let (pool, _dir) = test_pool().await;
        let user = ensure_user(&pool, "a@example.com", None).await.expect("user");
        scored_assessment(&pool, user.id).await;
        log_email(&pool, user.id, "weekly_summary", "subject", true, None)
            .await
            .expect("log email");

        let data = export(&pool).await.expect("export");
        assert_eq!(data["users"].as_array().map(Vec::len), Some(1));
        assert_eq!(data["assessments"].as_array().map(Vec::len), Some(1));
        assert_eq!(data["email_logs"].as_array().map(Vec::len), Some(1));
        // Password hashes never leave the database through the export.
        assert!(data["users"][0].get("password_hash").is_none());
    }

    #[tokio::test]
    async fn seed_is_idempotent() {
        let (pool, _dir) = test_pool().await;
        let predictor = Predictor::heuristic();
        seed(&pool, &predictor).await.expect("first seed");
        seed(&pool, &predictor).await.expect("second seed");

        let users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&pool)
            .await
            .expect("count users");
        let assessments: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM assessments")
            .fetch_one(&pool)
            .await
            .expect("count assessments");
        assert_eq!(users, 3);
        assert_eq!(assessments, 3);
    }
}
