use std::sync::Arc;

use kosmos::{config::Config, hub::HubRegistry, session, store::SqliteStore, AppState};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load();
    init_tracing(config.json_logs);

    tracing::info!("kosmos v{} starting", env!("CARGO_PKG_VERSION"));

    let store = Arc::new(SqliteStore::connect(&config.database_url, config.max_db_connections).await?);
    let registry = Arc::new(HubRegistry::new(store.clone(), config.hub_config()));
    let app_state = AppState { store, registry };

    let app = kosmos::app(
        app_state,
        session::layer(config.session_expiry_minutes, config.secure_cookies),
    );

    let listener = tokio::net::TcpListener::bind(config.addr()).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("kosmos=info"));

    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
