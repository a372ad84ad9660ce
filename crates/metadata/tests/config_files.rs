use std::path::PathBuf;

use tickwire_metadata::{Environment, Feed, TransportType, DEFAULT_SYMBOLS};

fn config_path(relative: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../config")
        .join(relative)
}

#[test]
fn test_shipped_feed_config_loads() {
    let feed = Feed::load(&config_path("feeds/finnhub.yaml")).unwrap();

    assert_eq!(feed.name, "finnhub");
    assert_eq!(feed.endpoint, "wss://ws.finnhub.io");
    assert_eq!(feed.symbols, DEFAULT_SYMBOLS.to_vec());
    assert_eq!(feed.token_source, "env:FINNHUB_API_KEY");
    assert_eq!(feed.symbols_per_session, 0);
}

#[test]
fn test_shipped_environments_load() {
    let local = Environment::load(&config_path("environments/local.yaml")).unwrap();
    assert_eq!(local.transport.transport_type, TransportType::Memory);
    assert_eq!(local.stream.name, "datalake-stream");

    let prod = Environment::load(&config_path("environments/prod.yaml")).unwrap();
    assert_eq!(prod.transport.transport_type, TransportType::Nats);
    assert_eq!(prod.stream.subject_prefix(), "us-east-1.datalake-stream");
    assert_eq!(prod.publish.retry_attempts, 5);
}
