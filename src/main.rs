use anyhow::Context;
use splitledger::config::{Config, StoreBackend};
use splitledger::orchestration::{SettlementCoordinator, SystemClock};
use splitledger::store::{init_store, DocumentStore, RemoteStore, SqliteStore};
use splitledger::{api, AppError};
use std::net::SocketAddr;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into()),
        )
        .init();

    // Load configuration
    let config = Config::from_env().map_err(|e| AppError::Config(e.to_string()))?;
    let port = config.port;

    // Select the document-store backend
    let store: Arc<dyn DocumentStore> = match config.store_backend {
        StoreBackend::Sqlite => {
            let db_path = config
                .database_path
                .as_deref()
                .context("DATABASE_PATH required for the sqlite backend")?;
            let pool = init_store(db_path)
                .await
                .context("failed to initialize document store")?;
            Arc::new(SqliteStore::new(pool))
        }
        StoreBackend::Remote => {
            let base_url = config
                .store_api_url
                .clone()
                .context("STORE_API_URL required for the remote backend")?;
            Arc::new(RemoteStore::new(base_url))
        }
    };

    let coordinator = Arc::new(SettlementCoordinator::new(
        store.clone(),
        Arc::new(SystemClock),
    ));

    // Create router
    let app = api::create_router(api::AppState::new(store, coordinator));

    // Bind to address
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind to {}", addr))?;

    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
