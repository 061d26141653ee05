//! Rulette Back binary: HTTP server over the configured game store.

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::Context;
use rulette_back::{
    config::AppConfig,
    dao::game_store::memory::InMemoryGameStore,
    routes,
    state::{AppState, SharedState},
};
#[cfg(feature = "mongo-store")]
use rulette_back::dao::{
    game_store::{
        GameStore,
        mongodb::{MongoConfig, MongoGameStore},
    },
    storage::StorageError,
};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_PORT: u16 = 7777;
const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let state = AppState::new(AppConfig::load());
    install_storage(&state).await;

    let app = routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr = listen_addr();
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(%addr, "rulette back listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving HTTP")?;
    info!("server stopped");
    Ok(())
}

/// `PORT`, then `SERVER_PORT`, then 7777, on all interfaces.
fn listen_addr() -> SocketAddr {
    let port = ["PORT", "SERVER_PORT"]
        .iter()
        .find_map(|name| env::var(name).ok()?.parse::<u16>().ok())
        .unwrap_or(DEFAULT_PORT);
    SocketAddr::from(([0, 0, 0, 0], port))
}

/// Use MongoDB when `MONGO_URI` is set, otherwise keep everything in memory.
async fn install_storage(state: &SharedState) {
    #[cfg(feature = "mongo-store")]
    if let Ok(uri) = env::var("MONGO_URI") {
        let database = env::var("MONGO_DB").ok();
        info!("MONGO_URI set; supervising MongoDB storage");
        tokio::spawn(rulette_back::services::storage_supervisor::run(
            state.clone(),
            move || connect_mongo(uri.clone(), database.clone()),
        ));
        return;
    }

    info!("no database configured; using in-memory storage");
    state
        .install_game_store(Arc::new(InMemoryGameStore::new()))
        .await;
}

#[cfg(feature = "mongo-store")]
async fn connect_mongo(
    uri: String,
    database: Option<String>,
) -> Result<Arc<dyn GameStore>, StorageError> {
    let config = MongoConfig::from_uri(&uri, database.as_deref()).await?;
    Ok(Arc::new(MongoGameStore::connect(config).await?))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
            }
            Err(err) => {
                tracing::warn!(error = %err, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("ctrl-c received; shutting down"),
        _ = terminate => info!("SIGTERM received; shutting down"),
    }
}
