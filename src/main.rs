use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use screenhealth_api::config::AppConfig;
use screenhealth_api::db;
use screenhealth_api::http::{build_router, AppState};
use screenhealth_api::predict::Predictor;

#[derive(Parser)]
#[command(name = "screenhealth-api")]
#[command(about = "Screen time mental health survey API for ScreenHealth", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API server
    Serve {
        /// Override the bind address from SCREENHEALTH_BIND
        #[arg(long)]
        bind: Option<String>,
    },
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed data
    Seed,
    /// Import survey responses from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Show database-wide statistics
    Stats,
    /// Show one user's profile and assessment stats
    User {
        #[arg(long)]
        email: String,
    },
    /// List recent email log entries
    EmailLogs {
        #[arg(long, default_value_t = 20)]
        limit: i64,
    },
    /// Export users, assessments, and email logs as JSON
    Export {
        #[arg(long, default_value = "screenhealth_export.json")]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    let config = AppConfig::from_env();
    let pool = db::connect(&config.database_path).await?;
    db::init_db(&pool).await?;

    match cli.command {
        Commands::Serve { bind } => {
            let predictor = Arc::new(Predictor::load(&config.model_path));

            let addr: SocketAddr = bind
                .unwrap_or_else(|| config.bind_addr.clone())
                .parse()
                .context("invalid bind address")?;
            let listener = tokio::net::TcpListener::bind(addr)
                .await
                .with_context(|| format!("failed to bind {addr}"))?;

            let app = build_router(AppState::new(pool, predictor));
            tracing::info!(%addr, database = %config.database_path.display(), "listening");
            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await
                .context("server exited with an error")?;
        }
        Commands::InitDb => {
            println!("Schema ready.");
        }
        Commands::Seed => {
            let predictor = Predictor::load(&config.model_path);
            db::seed(&pool, &predictor).await?;
            println!("Seed data inserted.");
        }
        Commands::Import { csv } => {
            let predictor = Predictor::load(&config.model_path);
            let imported = db::import_csv(&pool, &predictor, &csv).await?;
            println!("Imported {imported} assessments from {}.", csv.display());
        }
        Commands::Stats => {
            let stats = db::admin_stats(&pool).await?;
            println!("Users: {}", stats.total_users);
            println!("Assessments: {}", stats.total_assessments);
            println!("Assessments in the last 7 days: {}", stats.recent_assessments);
            println!("Weekly email subscribers: {}", stats.email_subscribers);
            println!("Database size: {} bytes", stats.database_size);
        }
        Commands::User { email } => {
            let email = email.trim().to_ascii_lowercase();
            let Some(user) = db::find_user_by_email(&pool, &email).await? else {
                println!("No user found for {email}.");
                return Ok(());
            };
            let stats = db::user_stats(&pool, user.id).await?;

            println!("{} ({})", user.email, user.name.as_deref().unwrap_or("no name"));
            println!("Created: {}", user.created_at);
            if let Some(age_group) = &user.age_group {
                println!("Age group: {age_group}");
            }
            println!("Logins: {}", user.total_logins);
            println!(
                "Weekly email: {}",
                if user.weekly_email_enabled { "subscribed" } else { "not subscribed" }
            );
            println!(
                "Assessments: {} ({} healthy, {} needing improvement, avg risk {:.1})",
                stats.total_assessments,
                stats.healthy_count,
                stats.unhealthy_count,
                stats.avg_risk_score
            );
            if !stats.recent_trend.is_empty() {
                println!("Recent assessments:");
                for point in &stats.recent_trend {
                    println!(
                        "- {} {}",
                        point.created_at,
                        if point.is_healthy { "healthy" } else { "needs improvement" }
                    );
                }
            }
        }
        Commands::EmailLogs { limit } => {
            let logs = db::recent_email_logs(&pool, limit).await?;
            if logs.is_empty() {
                println!("No email logs recorded.");
            }
            for (log, email) in logs {
                println!(
                    "- #{} {} \"{}\" to {} at {} ({})",
                    log.id,
                    log.email_type,
                    log.subject,
                    email,
                    log.sent_at,
                    if log.success { "ok" } else { "failed" }
                );
            }
        }
        Commands::Export { out } => {
            let data = db::export(&pool).await?;
            std::fs::write(&out, serde_json::to_string_pretty(&data)?)?;
            println!("Export written to {}.", out.display());
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
