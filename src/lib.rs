pub mod appresult;
pub mod auth;
pub mod config;
pub mod db;
pub mod hub;
pub mod rooms;
pub mod session;
pub mod store;

use std::sync::Arc;

use axum::{
    extract::FromRef,
    http::{header, Method},
    Router,
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_sessions::{MemoryStore, SessionManagerLayer};

pub use appresult::{AppError, AppResult};

use hub::HubRegistry;
use store::ChatStore;

#[derive(Clone, FromRef)]
pub struct AppState {
    pub store: Arc<dyn ChatStore>,
    pub registry: Arc<HubRegistry>,
}

/// Every route, with the session and CORS layers applied.
pub fn app(state: AppState, session_layer: SessionManagerLayer<MemoryStore>) -> Router {
    Router::new()
        .merge(auth::router())
        .merge(rooms::router())
        .with_state(state)
        .layer(session_layer)
        .layer(cors())
}

fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_origin(AllowOrigin::mirror_request())
        .allow_credentials(true)
        .allow_headers([header::CONTENT_TYPE, header::ORIGIN, header::ACCEPT, header::AUTHORIZATION])
}
