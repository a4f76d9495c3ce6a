// Command-line entry point for hashtag collection
//
// `scrape` submits one job and waits for it, `login` refreshes the persisted
// session, `window` reads back what the store holds for the rolling window.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use kodegen_tools_tagscrape::{
    AuthStateStore, ChromiumBackend, JobOrchestrator, JsonlStore, ScrapeConfig, ScrapeEngine,
    WindowClock,
};

const JOB_POLL_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Parser)]
#[command(name = "kodegen-tagscrape", version, about = "Rolling-window hashtag collection")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one collection job and print its record
    Scrape {
        /// Hashtags to collect, comma separated (defaults to TAGSCRAPE_HASHTAGS)
        #[arg(long, value_delimiter = ',')]
        hashtags: Vec<String>,
        /// Total unique items to keep across all hashtags
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Establish a session and persist its auth state
    Login {
        /// Forget the persisted state and log in from scratch
        #[arg(long)]
        fresh: bool,
    },
    /// Count stored items inside the current rolling window
    Window,
}

fn init_logging() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))?
        .add_directive("chromiumoxide::conn=off".parse()?)
        .add_directive("chromiumoxide::handler=off".parse()?);
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
    Ok(())
}

fn chromium_engine(config: &Arc<ScrapeConfig>) -> ScrapeEngine<ChromiumBackend> {
    let backend = ChromiumBackend::new(
        config.headless(),
        config.data_dir().join("profiles"),
        config.site_profile().clone(),
    );
    ScrapeEngine::new(backend, Arc::clone(config))
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging()?;
    let cli = Cli::parse();
    let config = Arc::new(ScrapeConfig::from_env().context("Failed to load configuration")?);
    info!("Data directory: {}", config.data_dir().display());

    match cli.command {
        Command::Scrape { hashtags, limit } => {
            let hashtags = if hashtags.is_empty() {
                config.default_hashtags().to_vec()
            } else {
                hashtags
            };
            let limit = limit.unwrap_or(config.default_limit());

            let store = JsonlStore::new(config.data_dir(), config.compress_output());
            let jobs = Arc::new(JobOrchestrator::from_config(
                chromium_engine(&config),
                store,
                &config,
            ));
            let cleanup = Arc::clone(&jobs).start_cleanup_task();

            let job_id = jobs.submit(&hashtags, limit).await?;
            let job = jobs
                .wait(&job_id, JOB_POLL_INTERVAL)
                .await
                .with_context(|| format!("Job {job_id} disappeared before finishing"))?;
            cleanup.abort();

            println!("{}", serde_json::to_string_pretty(&job)?);
            if let Some(error) = job.error {
                anyhow::bail!("Job {job_id} failed: {error}");
            }
        }
        Command::Login { fresh } => {
            if fresh {
                AuthStateStore::new(config.auth_state_path()).clear()?;
                info!("Cleared persisted session");
            }
            let session = chromium_engine(&config).session_manager();
            let result = session.acquire().await.map(|_| ());
            session.shutdown().await;
            result?;
            println!("Session ready; auth state at {}", config.auth_state_path().display());
        }
        Command::Window => {
            let window = config.rolling_window().current();
            let store = JsonlStore::new(config.data_dir(), config.compress_output());
            let items = store.load_window(window).await?;
            println!(
                "{} unique item(s) between {} and {}",
                items.len(),
                window.since,
                window.until
            );
        }
    }
    Ok(())
}
