use abistorage::api::{create_api_server, AppState};
use abistorage::auth::BearerTokenAuth;
use abistorage::config::{AppConfig, StoreBackend};
use abistorage::metrics::{init_metrics, install_recorder};
use abistorage::store::{ObjectStore, SqliteKv, Stores};
use abistorage::upload::LocalPinning;
use anyhow::Context;
use clap::Parser;
use std::sync::Arc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(name = "abistorage-server")]
#[command(about = "ABI storage registry with replication metrics")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Override server.bind_addr
    #[arg(long)]
    bind: Option<String>,
}

async fn open_stores(config: &AppConfig) -> anyhow::Result<Stores> {
    match config.store.backend {
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store; data is lost on restart");
            Ok(Stores::in_memory())
        }
        StoreBackend::Sqlite => {
            let pool = SqliteKv::connect(&config.store.sqlite_url)
                .await
                .with_context(|| format!("opening {}", config.store.sqlite_url))?;
            tracing::info!(url = %config.store.sqlite_url, "SQLite store ready");
            Ok(Stores::sqlite(pool))
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutting down");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "abistorage=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref()).context("loading configuration")?;
    if let Some(bind) = cli.bind {
        config.server.bind_addr = bind;
    }
    let bind_addr = config.bind_addr()?;

    if config.metrics.include_process_metrics {
        install_recorder()?;
    } else {
        init_metrics();
    }

    let stores = open_stores(&config).await?;
    let store = ObjectStore::new(stores, config.store.scan_config());

    let auth = BearerTokenAuth::new(config.auth.tokens.clone());
    if auth.is_empty() {
        tracing::warn!("No auth tokens configured; owner routes will reject every request");
    }

    let state = AppState::new(
        store,
        Arc::new(LocalPinning),
        Arc::new(auth),
        config.metrics.export_config(),
        config.metrics.cache_policy(),
    )
    .with_metrics_origins(config.metrics.origins.clone());
    let app = create_api_server(state);

    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("binding {bind_addr}"))?;

    tracing::info!(
        addr = %bind_addr,
        backend = ?config.store.backend,
        page_size = config.store.page_size,
        cache_control = %config.metrics.cache_policy().cache_control(),
        "abistorage server listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    Ok(())
}
