use std::{path::PathBuf, sync::Arc};

use anyhow::Context;
use clap::{Parser, Subcommand};
use weather_core::{Config, IngestClient, WeatherService, ingest::parse_records, store_from_url};

use crate::{
    http::{self, AppState},
    ws::Broadcaster,
};

/// How many broadcasts a slow subscriber may fall behind before skipping.
const BROADCAST_CAPACITY: usize = 256;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather", version, about = "Daily weather observation service")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the HTTP server.
    Serve {
        /// Config file; defaults to the platform config directory.
        #[arg(long, short)]
        config: Option<PathBuf>,
    },

    /// Upload observations from a tab-separated data file.
    Ingest {
        /// File with one `date<TAB>humidity<TAB>temperature` row per line.
        file: PathBuf,

        /// Base URL of a running server, e.g. "http://localhost:3000".
        #[arg(long, env = "API_HOST")]
        host: String,

        #[arg(long, env = "API_TOKEN", hide_env_values = true)]
        token: String,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Serve { config } => serve(config).await,
            Command::Ingest { file, host, token } => ingest(file, &host, token).await,
        }
    }
}

async fn serve(config: Option<PathBuf>) -> anyhow::Result<()> {
    let mut config = Config::load(config.as_deref())?;
    config.apply_env();
    let settings = config.into_settings().context("Invalid configuration")?;
    tracing::info!("Configuration loaded successfully");

    let store = store_from_url(&settings.database_url)
        .with_context(|| format!("Failed to open database {}", settings.database_url))?;
    let service = WeatherService::new(Arc::from(store), settings.units);

    let hub = Broadcaster::new(BROADCAST_CAPACITY);
    let state = AppState::new(service, settings.api_token, hub.clone(), Arc::new(hub));

    tracing::info!("Starting server at {}", settings.listen_addr);
    http::run_http_server(state, &settings.listen_addr).await
}

async fn ingest(file: PathBuf, host: &str, token: String) -> anyhow::Result<()> {
    let contents = tokio::fs::read_to_string(&file)
        .await
        .with_context(|| format!("Failed to read data file: {}", file.display()))?;
    let records = parse_records(&contents)?;
    let client = IngestClient::new(host, token)?;

    tracing::info!("Ready to ingest {} weather records into {}", records.len(), client.endpoint());
    let started = std::time::Instant::now();

    let sent = client.send_all(&records).await?;

    tracing::info!("Ingestion of {sent} records complete in {:.2?}", started.elapsed());
    Ok(())
}
