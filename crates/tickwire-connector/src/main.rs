//! tickwire-connector: trade feed ingestion binary
//!
//! Streams trades from the feed websocket into the partitioned event stream,
//! one record per trade keyed by symbol.

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tickwire_connector_lib::{
    run_sharded, BackoffConfig, EnvResolver, KeyResolver, Pipeline, RetryPolicy, SessionConfig,
    StreamPublisher, SystemClock, WebSocketConnector,
};
use tickwire_metadata::{Environment, Feed};
use tickwire_middleware::MiddlewareFactory;

#[derive(Parser, Debug)]
#[command(name = "tickwire-connector")]
#[command(about = "Trade feed to event stream ingestion bridge")]
struct Args {
    /// Path to feed configuration file
    #[arg(short, long, env = "TICKWIRE_FEED")]
    feed: PathBuf,

    /// Path to environment configuration file
    #[arg(short, long, env = "TICKWIRE_ENV")]
    env: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Optional .env with the feed token and overrides for the arguments below
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let feed = Feed::load(&args.feed)?;
    info!(feed = %feed.name, symbols = feed.symbols.len(), "Loaded feed configuration");

    let env_config = Environment::load(&args.env)?;
    info!(env = %env_config.name, "Loaded environment configuration");

    let token = EnvResolver::new().resolve_single(&feed.token_source)?;
    let connector = WebSocketConnector::new(&feed.endpoint, Some(&token))?;

    let stream = MiddlewareFactory::create_event_stream(&env_config).await?;
    let publisher = StreamPublisher::new(
        stream,
        env_config.stream.name.clone(),
        RetryPolicy::from_config(&env_config.publish),
    )
    .with_max_record_bytes(env_config.stream.max_record_bytes);
    let pipeline = Pipeline::new(Arc::new(publisher), Arc::new(SystemClock));

    info!(
        url = %connector.redacted_url(),
        stream = %env_config.stream.name,
        region = %env_config.stream.region,
        symbols = %feed.symbols.join(", "),
        "Starting ingestion"
    );

    // Setup shutdown signal
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Received shutdown signal");
        shutdown_tx.send(true).ok();
    });

    let template = SessionConfig {
        name: feed.name.clone(),
        symbols: feed.symbols.clone(),
        reconnect: BackoffConfig::from_reconnect_settings(&feed.reconnect),
        read_timeout: feed.read_timeout(),
    };
    let stats = run_sharded(
        template,
        connector,
        feed.symbols_per_session,
        pipeline,
        shutdown_rx,
    )
    .await?;

    let published: u64 = stats.iter().map(|s| s.published).sum();
    let failed: u64 = stats.iter().map(|s| s.failed).sum();
    info!(sessions = stats.len(), published, failed, "tickwire-connector stopped");
    Ok(())
}
