//! nips CLI
//!
//! Scrape the NIP documents into a dataset, chat with the hosted model,
//! prepare or launch adapter fine-tuning, and run the predict server.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::io::BufReader;

use nips_chat::chat;
use nips_chat::core::config::defaults::{default_nip_urls, GITHUB_TOKEN_ENV};
use nips_chat::core::config::{require_secret, AppConfig, AppPaths, ConfigService};
use nips_chat::core::logging;
use nips_chat::docs::github::GitHubUrlListFetcher;
use nips_chat::docs::{DatasetWriter, DirSource, DocumentSource, HttpSource, Scraper};
use nips_chat::finetune::{prepare_job, ExternalTrainer, Trainer};
use nips_chat::server;
use nips_chat::state::AppState;

#[derive(Parser)]
#[command(name = "nips")]
#[command(about = "NIPS scrape, fine-tune and chat CLI", long_about = None)]
struct Cli {
    /// Path to config.yml (defaults to NIPS_CONFIG_PATH or ./config.yml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape NIPS documents and write the JSONL and CSV dataset
    Scrape {
        /// Fetch the URL list from the private GitHub repository
        #[arg(long, conflicts_with = "dir")]
        private: bool,
        /// Read *.md files from a local directory instead of fetching
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// Ask questions interactively
    Chat,
    /// Render the trainer config and optionally launch training
    Finetune {
        /// Run the external trainer after writing its config
        #[arg(long)]
        launch: bool,
    },
    /// Serve POST /predict
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let paths = Arc::new(AppPaths::new(cli.config.as_deref()));

    // chat answers share stdout with the log
    let default_filter = match cli.command {
        Commands::Chat => "warn",
        _ => "info",
    };
    logging::init(&paths.log_dir, default_filter);

    let config = ConfigService::new(paths.clone())
        .load()
        .with_context(|| format!("Failed to load {}", paths.config_path.display()))?;

    match cli.command {
        Commands::Scrape { private, dir } => scrape(&paths, &config, private, dir).await,
        Commands::Chat => {
            let state = AppState::from_config(paths, config)
                .await
                .context("Failed to initialize chat")?;
            println!("Initializing NIPS Q&A system... {} records loaded.", state.qa.record_count());
            chat::run(&state.qa, BufReader::new(tokio::io::stdin()), tokio::io::stdout())
                .await
                .context("Chat loop failed")
        }
        Commands::Finetune { launch } => finetune(&paths, &config, launch).await,
        Commands::Serve => {
            let state = AppState::from_config(paths, config)
                .await
                .context("Failed to initialize nips-chat")?;
            server::serve(state).await
        }
    }
}

async fn scrape(
    paths: &AppPaths,
    config: &AppConfig,
    private: bool,
    dir: Option<PathBuf>,
) -> anyhow::Result<()> {
    let scraping = &config.scraping;
    let timeout = Duration::from_secs(scraping.fetch_timeout_secs);

    let local_dir = dir.or_else(|| scraping.local_dir.clone());
    let source: Arc<dyn DocumentSource> = match local_dir {
        Some(dir) => {
            let dir = paths.resolve(&dir);
            println!("Reading NIPS documents from {}", dir.display());
            Arc::new(DirSource::new(&dir)?)
        }
        None => {
            let urls = if private {
                let github = scraping
                    .github
                    .clone()
                    .context("--private requires a `scraping.github` section in the config")?;
                let token = require_secret(
                    "scraping.github.access_token",
                    GITHUB_TOKEN_ENV,
                    github.access_token.as_deref(),
                )?;
                GitHubUrlListFetcher::new(github, token, timeout)?
                    .fetch_urls()
                    .await?
            } else if scraping.urls.is_empty() {
                default_nip_urls()
            } else {
                scraping.urls.clone()
            };
            Arc::new(HttpSource::new(urls, timeout)?)
        }
    };

    let jsonl = paths.resolve(&scraping.output.jsonl);
    let csv = paths.resolve(&scraping.output.csv);
    println!("Using min_heading_length={}", scraping.min_heading_length);
    println!("Saving JSONL output to: {}", jsonl.display());
    println!("Saving CSV output to: {}", csv.display());

    let scraper = Scraper::new(source, scraping.min_heading_length)
        .with_concurrency(scraping.concurrency);
    let (dataset, report) = scraper.scrape().await;

    DatasetWriter::new(jsonl, csv)
        .write(&dataset)
        .context("Failed to write dataset")?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn finetune(paths: &AppPaths, config: &AppConfig, launch: bool) -> anyhow::Result<()> {
    let mut finetune = config.finetune.clone();
    finetune.output_dir = paths.resolve(&finetune.output_dir);
    let dataset = paths.resolve(&finetune.dataset_path());

    if launch {
        let artifact = ExternalTrainer::from_config(&finetune)
            .train(&dataset, &finetune)
            .await
            .context("Fine-tuning failed")?;
        println!("Adapter written to {}", artifact.output_dir.display());
    } else {
        let job = prepare_job(&dataset, &finetune).context("Failed to prepare fine-tuning")?;
        println!(
            "Wrote {} ({} records). Re-run with --launch to train.",
            job.config_path.display(),
            job.records
        );
    }
    Ok(())
}
