use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use doctodo::{
    AppState, DocumentClientFactory, InMemoryConnector, ItemRepository, build_router,
    config::{AppConfig, StoreBackend},
    connection::Connector,
};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// To-do list server over a document database
#[derive(Parser, Debug)]
#[command(name = "doctodo", version, about)]
struct Cli {
    /// Address to bind (overrides APP_HOST)
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on (overrides APP_PORT)
    #[arg(short, long)]
    port: Option<u16>,

    /// Item store (overrides DOCTODO_STORE)
    #[arg(long, value_enum)]
    store: Option<StoreBackend>,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let mut config = AppConfig::from_env().context("failed to load application configuration")?;
    if let Some(host) = cli.host {
        config.host = host;
    }
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(store) = cli.store {
        config.store = store;
    }

    let factory = match config.store {
        StoreBackend::Rest => {
            config
                .documentdb
                .validate()
                .map_err(anyhow::Error::msg)
                .context("invalid document database settings")?;
            info!(endpoint = %config.documentdb.endpoint, "item store: document database");
            DocumentClientFactory::rest(config.documentdb.clone())
        }
        StoreBackend::Memory => {
            info!("item store: in-memory");
            let connector: Arc<dyn Connector> = Arc::new(InMemoryConnector::default());
            DocumentClientFactory::new(config.documentdb.clone(), connector)
        }
    };
    let factory = Arc::new(factory);

    // a failure is only logged; the first request bootstraps again
    if let Err(err) = factory.get_client().await {
        error!(error = %err, "document store not ready");
    }

    let items = Arc::new(ItemRepository::new(factory));
    let app = build_router(AppState::new(items));

    let addr = config.address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;

    info!(address = %addr, "doctodo started");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("doctodo=debug,tower_http=info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "unable to install Ctrl+C signal handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(error = %err, "unable to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
