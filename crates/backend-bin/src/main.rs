use anyhow::Context;
use backend_lib::{
    config::{Settings, StorageBackend},
    mailer::LogMailer,
    router::create_router,
    store::{FlatFileStore, MemoryStore, Store},
    AppState,
};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Authentication backend with request validation and resilient storage
#[derive(Debug, Parser)]
#[command(name = "authgate", version)]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = backend_lib::config::DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Override the listen host
    #[arg(long)]
    host: Option<String>,

    /// Override the listen port
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut settings = Settings::load_from(&args.config)
        .with_context(|| format!("failed to load {}", args.config.display()))?;
    if let Some(host) = args.host {
        settings.server.host = host;
    }
    if let Some(port) = args.port {
        settings.server.port = port;
    }
    settings.validate()?;

    init_tracing(&settings);

    match settings.storage.backend {
        StorageBackend::Memory => serve(Arc::new(MemoryStore::new()), settings).await,
        StorageBackend::FlatFile => {
            let store = FlatFileStore::new(&settings.storage.path)?;
            serve(Arc::new(store), settings).await
        },
    }
}

/// RUST_LOG wins over the configured level
fn init_tracing(settings: &Settings) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.log.level));

    if settings.log.json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn serve<S: Store + 'static>(store: Arc<S>, settings: Settings) -> anyhow::Result<()> {
    let addr = settings.bind_addr()?;
    let backend = settings.storage.backend;

    let state = Arc::new(AppState::new(store.clone(), settings, Arc::new(LogMailer))?);
    let app = create_router(state);

    let listener = TcpListener::bind(addr).await?;
    info!(%addr, ?backend, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("shutting down, closing store");
    store.close().await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to listen for shutdown signal");
    }
}
