mod config;
mod errors;
mod gateway;
mod resume;
mod schema;
mod search;
mod session;
mod state;

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::resume::{FlowState, ResumeFile};
use crate::schema::resume::AnalysisRequest;
use crate::schema::search::{SearchCategory, SearchQuery};
use crate::state::ClientState;

#[derive(Parser)]
#[command(name = "scout", version, about = "Job-search assistant client")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Search people, companies, job offers or pages.
    Search {
        query: String,
        #[arg(long, default_value_t = SearchCategory::LinkedinProfile)]
        category: SearchCategory,
        #[arg(long, default_value_t = 10)]
        limit: u32,
    },
    /// Upload a PDF resume and analyze it against a job posting.
    Analyze {
        pdf_path: PathBuf,
        #[arg(long)]
        job_url: String,
    },
    /// End the current session.
    SignOut,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env()?;

    // Logs go to stderr so stdout stays machine-readable
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting scout v{}", env!("CARGO_PKG_VERSION"));
    let state = ClientState::from_config(config).await?;
    info!("Backend: {}", state.config.api_url);

    match cli.command {
        Command::Search {
            query,
            category,
            limit,
        } => run_search(&state, query, category, limit).await,
        Command::Analyze { pdf_path, job_url } => run_analysis(&state, pdf_path, job_url).await,
        Command::SignOut => {
            state.session.sign_out().await;
            info!("Signed out");
            Ok(())
        }
    }
}

async fn run_search(
    state: &ClientState,
    query: String,
    category: SearchCategory,
    limit: u32,
) -> Result<()> {
    let query = SearchQuery::new(query, category, limit)?;
    state.search.fetch_results(query).await;

    let snapshot = state.search.snapshot();
    if let Some(error) = snapshot.error {
        bail!(error);
    }
    print_json(&snapshot)
}

async fn run_analysis(state: &ClientState, pdf_path: PathBuf, job_url: String) -> Result<()> {
    let file = ResumeFile::from_path(&pdf_path).await?;
    state.resume.upload_file(file).await?;

    let uploaded = state.resume.snapshot();
    let file_id = match (uploaded.state, uploaded.file_id) {
        (FlowState::ReadyToAnalyze, Some(file_id)) => file_id,
        _ => bail!(uploaded
            .error
            .unwrap_or_else(|| format!("Upload ended in state {}", uploaded.state))),
    };

    let request = AnalysisRequest::new(file_id, &job_url)?;
    state.resume.start_analysis(request).await?;

    let analyzed = state.resume.snapshot();
    match analyzed.report {
        Some(report) if analyzed.state == FlowState::ReportReady => print_json(&report),
        _ => bail!(analyzed
            .error
            .unwrap_or_else(|| format!("Analysis ended in state {}", analyzed.state))),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
