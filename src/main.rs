//! Trivia Back binary entrypoint wiring the REST layer to the configured storage backend.

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use trivia_back::{
    config::AppConfig,
    dao::trivia_store::memory::MemoryTriviaStore,
    routes,
    state::{AppState, SharedState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let app_state = AppState::new(AppConfig::load());
    install_storage(&app_state).await?;

    // Build the HTTP router once the shared state is ready.
    let app = build_router(app_state);

    let port = env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    let service = app.into_make_service();
    axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    Ok(())
}

/// Pick the storage backend: MongoDB when `MONGO_URI` is set, process memory otherwise.
async fn install_storage(state: &SharedState) -> anyhow::Result<()> {
    if env::var_os("MONGO_URI").is_none() {
        info!("MONGO_URI not set; using in-memory storage");
        state.set_store(Arc::new(MemoryTriviaStore::new())).await;
        return Ok(());
    }

    spawn_mongo_supervisor(state).await
}

#[cfg(feature = "mongo-store")]
async fn spawn_mongo_supervisor(state: &SharedState) -> anyhow::Result<()> {
    use trivia_back::{
        dao::{
            storage::StorageError,
            trivia_store::{
                TriviaStore,
                mongodb::{MongoConfig, MongoTriviaStore},
            },
        },
        services::storage_supervisor,
    };

    let config = MongoConfig::from_env()
        .await
        .context("reading MongoDB configuration")?;
    info!(database = %config.database_name, "starting MongoDB storage supervisor");

    let connect = move || {
        let config = config.clone();
        async move {
            let store = MongoTriviaStore::connect(config)
                .await
                .map_err(StorageError::from)?;
            Ok::<Arc<dyn TriviaStore>, StorageError>(Arc::new(store))
        }
    };
    tokio::spawn(storage_supervisor::run(state.clone(), connect));
    Ok(())
}

#[cfg(not(feature = "mongo-store"))]
async fn spawn_mongo_supervisor(state: &SharedState) -> anyhow::Result<()> {
    tracing::warn!("built without MongoDB support; ignoring MONGO_URI and using in-memory storage");
    state.set_store(Arc::new(MemoryTriviaStore::new())).await;
    Ok(())
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut term = signal(SignalKind::terminate()).expect("install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = term.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
