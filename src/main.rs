use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use uuid::Uuid;

mod api;
mod calculator;
mod config;
mod db;
mod models;
mod narrative;
mod report;
mod store;
mod validation;

use config::{DatabaseArgs, NarrativeArgs};
use models::{DiagnosticInput, DisciplineLevel};
use narrative::NarrativeConfig;
use store::{DiagnosticStore, MemoryStore, PgStore};

#[derive(Parser)]
#[command(name = "discipline-diagnostic")]
#[command(about = "Discipline score and five-year projections for income, spending and time", long_about = None)]
struct Cli {
    #[command(flatten)]
    database: DatabaseArgs,

    #[command(flatten)]
    narrative: NarrativeArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load demo diagnostics
    Seed,
    /// Import past submissions from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
        #[arg(long)]
        user: Uuid,
    },
    /// Score one submission without storing it
    Calculate {
        #[arg(long)]
        income: f64,
        #[arg(long)]
        impulsive: f64,
        #[arg(long)]
        wasted: f64,
        #[arg(long)]
        studying: f64,
        #[arg(long)]
        json: bool,
    },
    /// List a user's recent diagnostics
    History {
        #[arg(long)]
        user: Uuid,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Generate a markdown history report
    Report {
        #[arg(long)]
        user: Uuid,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
    /// Generate the narrative report for a stored diagnostic
    Narrate {
        #[arg(long)]
        id: Uuid,
        #[arg(long)]
        user: Uuid,
    },
    /// Run the HTTP API
    Serve {
        #[arg(long, env = "BIND_ADDR", default_value = "127.0.0.1:3000")]
        addr: String,
        /// Keep diagnostics in memory instead of Postgres
        #[arg(long)]
        ephemeral: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::InitDb => {
            let pool = cli.database.connect().await?;
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            let store = PgStore::new(cli.database.connect().await?);
            let user_id = db::seed(&store).await?;
            println!("Seed diagnostics inserted for user {user_id}.");
        }
        Commands::Import { csv, user } => {
            let store = PgStore::new(cli.database.connect().await?);
            let summary = db::import_csv(&store, user, &csv)
                .await
                .with_context(|| format!("failed to import {}", csv.display()))?;
            println!(
                "Inserted {} diagnostics from {} ({} rows skipped).",
                summary.inserted,
                csv.display(),
                summary.skipped
            );
        }
        Commands::Calculate {
            income,
            impulsive,
            wasted,
            studying,
            json,
        } => {
            let input = DiagnosticInput {
                monthly_income: income,
                monthly_impulsive_spending: impulsive,
                hours_wasted_per_day: wasted,
                hours_studying_per_day: studying,
            };
            validation::validate_input(&input)?;
            let result = calculator::calculate_diagnostic(&input);

            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!(
                    "Discipline score: {}/100 ({})",
                    result.discipline_score,
                    DisciplineLevel::from_score(result.discipline_score)
                );
                println!("Hours wasted over 5 years: {:.0}", result.five_year_wasted_hours);
                println!("Money wasted over 5 years: {:.2}", result.five_year_money_wasted);
                println!(
                    "Monthly income in 5 years if unchanged: {:.2}",
                    result.projected_income_if_unchanged
                );
                println!(
                    "Monthly income in 5 years if disciplined: {:.2}",
                    result.projected_income_if_disciplined
                );
            }
        }
        Commands::History { user, limit } => {
            let store = PgStore::new(cli.database.connect().await?);
            let diagnostics = store.list_for_user(user, limit).await?;

            if diagnostics.is_empty() {
                println!("No diagnostics found for this user.");
                return Ok(());
            }

            println!("Recent diagnostics:");
            for diagnostic in diagnostics.iter() {
                println!(
                    "- {} {} score {} (wasted {}h/day, studying {}h/day)",
                    diagnostic.id,
                    diagnostic.created_at.format("%Y-%m-%d %H:%M"),
                    diagnostic.result.discipline_score,
                    diagnostic.result.input.hours_wasted_per_day,
                    diagnostic.result.input.hours_studying_per_day
                );
            }
        }
        Commands::Report { user, out } => {
            let store = PgStore::new(cli.database.connect().await?);
            let diagnostics = store.list_for_user(user, usize::MAX).await?;
            let report = report::build_history_report(user, &diagnostics);
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
        Commands::Narrate { id, user } => {
            let store = PgStore::new(cli.database.connect().await?);
            let diagnostic = store
                .get_for_user(id, user)
                .await?
                .context("diagnostic not found for this user")?;

            let reports = narrative::from_config(&NarrativeConfig::from(&cli.narrative));
            let text = tokio::task::spawn_blocking(move || reports.generate(&diagnostic.result))
                .await??;
            println!("{text}");
        }
        Commands::Serve { addr, ephemeral } => {
            let store: Arc<dyn DiagnosticStore> = if ephemeral {
                tracing::warn!("serving with an in-memory store, diagnostics are lost on exit");
                Arc::new(MemoryStore::new())
            } else {
                Arc::new(PgStore::new(cli.database.connect().await?))
            };
            let state = api::AppState {
                store,
                reports: narrative::from_config(&NarrativeConfig::from(&cli.narrative)),
            };
            api::run_server(&addr, state).await?;
        }
    }

    Ok(())
}
