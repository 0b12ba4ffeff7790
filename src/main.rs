use std::path::PathBuf;

use anyhow::Context;
use clap::{ArgGroup, Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;

mod aggregate;
mod category;
mod config;
mod db;
mod error;
mod models;
mod patterns;
mod report;
mod snapshot;
mod watch;

use crate::config::Config;
use crate::models::User;
use crate::snapshot::DEFAULT_WINDOW_DAYS;

#[derive(Parser)]
#[command(name = "coaching-insights")]
#[command(about = "Streaks, progress and insights from coaching check-ins", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load demo users with a few weeks of activity
    Seed,
    /// Import check-ins or question responses from a CSV file
    #[command(group(
        ArgGroup::new("source")
            .args(["checkins", "responses"])
            .required(true)
            .multiple(false)
    ))]
    Import {
        #[arg(long)]
        checkins: Option<PathBuf>,
        #[arg(long)]
        responses: Option<PathBuf>,
    },
    /// Print streak, progress and insights for a user
    Insights {
        #[arg(long)]
        email: String,
        #[arg(long, default_value_t = DEFAULT_WINDOW_DAYS)]
        window_days: i64,
        /// Emit the full snapshot as JSON
        #[arg(long)]
        json: bool,
    },
    /// Generate a markdown report
    Report {
        #[arg(long)]
        email: String,
        #[arg(long, default_value_t = DEFAULT_WINDOW_DAYS)]
        window_days: i64,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
    /// Recompute insights whenever new activity is recorded
    Watch {
        #[arg(long)]
        email: String,
        #[arg(long, default_value_t = DEFAULT_WINDOW_DAYS)]
        window_days: i64,
    },
}

fn init_tracing() {
    let filter = std::env::var("COACHING_LOG")
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| "info".to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_new(format!("{filter},sqlx=warn"))
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,sqlx=warn"));
    tracing_subscriber::fmt()
        .compact()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_env_filter(env_filter)
        .init();
}

async fn require_user(pool: &sqlx::PgPool, email: &str) -> anyhow::Result<User> {
    db::find_user(pool, email)
        .await?
        .with_context(|| format!("no user with email {email}"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = Config::from_env().context("invalid configuration")?;

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await
        .context("failed to connect to Postgres")?;
    tracing::debug!(max_connections = config.max_connections, "connected to Postgres");

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(&pool, &config.utc_offset).await?;
            println!("Seed data inserted.");
        }
        Commands::Import {
            checkins,
            responses,
        } => {
            if let Some(csv) = checkins {
                let upserted = db::import_checkins_csv(&pool, &csv).await?;
                println!("Upserted {upserted} check-ins from {}.", csv.display());
            } else if let Some(csv) = responses {
                let inserted = db::import_responses_csv(&pool, &csv).await?;
                println!("Inserted {inserted} responses from {}.", csv.display());
            }
        }
        Commands::Insights {
            email,
            window_days,
            json,
        } => {
            let user = require_user(&pool, &email).await?;
            let today = snapshot::local_today(&config.utc_offset);
            let since_date = snapshot::cutoff_date(today, window_days);
            let data =
                db::fetch_window(&pool, user.id, since_date, today, &config.utc_offset).await;
            let current =
                snapshot::build_snapshot(&data.checkins, &data.responses, today, &config.utc_offset);

            if json {
                println!("{}", serde_json::to_string_pretty(&current)?);
            } else {
                print!("{}", report::render_summary(&user, &current));
            }
        }
        Commands::Report {
            email,
            window_days,
            out,
        } => {
            let user = require_user(&pool, &email).await?;
            let today = snapshot::local_today(&config.utc_offset);
            let since_date = snapshot::cutoff_date(today, window_days);
            let data =
                db::fetch_window(&pool, user.id, since_date, today, &config.utc_offset).await;
            let current =
                snapshot::build_snapshot(&data.checkins, &data.responses, today, &config.utc_offset);
            let report = report::build_report(&user, window_days, since_date, &current);
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
        Commands::Watch { email, window_days } => {
            let user = require_user(&pool, &email).await?;
            watch::run(&pool, &user, window_days, config.utc_offset).await?;
        }
    }

    Ok(())
}
