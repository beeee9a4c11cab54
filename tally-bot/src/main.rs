//! Word tally bot: counts configured target words per user in Discord
//! servers, with leaderboards and a history backfill.

use dotenv::dotenv;
use std::sync::Arc;

mod backfill;
mod channels;
mod commands;
mod config;
mod db;
mod detection;
mod ingestion;
mod store;


use backfill::RunningBackfills;
use config::Config;
use db::Database;
use detection::Detector;
use ingestion::Ingestor;
use store::CounterStore;

/// Explicit context shared by every component
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn CounterStore>,
    pub ingestor: Arc<Ingestor>,
    pub backfills: Arc<RunningBackfills>,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn CounterStore>) -> Result<Self, String> {
        let strategy = config.build_strategy()?;
        let detector = Detector::new(config.targets.clone(), strategy);
        let ingestor = Arc::new(Ingestor::new(detector, store.clone(), &config.command_prefix));

        Ok(Self {
            config,
            store,
            ingestor,
            backfills: Arc::new(RunningBackfills::default()),
        })
    }
}

#[tokio::main]
async fn main() {
    dotenv().ok();
    env_logger::init();

    if let Err(e) = run().await {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), String> {
    let config = Config::from_env()?;

    log::info!(
        "Tracking {} target words: {}",
        config.targets.len(),
        config.targets.iter().collect::<Vec<_>>().join(", ")
    );

    log::info!("Initializing database at {}", config.database_url);
    let db = Database::new(&config.database_url)
        .map_err(|e| format!("Failed to initialize database: {}", e))?;

    let state = Arc::new(AppState::new(config, Arc::new(db))?);

    channels::discord::start_discord_listener(state).await
}
