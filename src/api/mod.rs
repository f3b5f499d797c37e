pub mod groups;
pub mod health;
pub mod relations;
pub mod settlements;

use crate::orchestration::SettlementCoordinator;
use crate::store::DocumentStore;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub coordinator: Arc<SettlementCoordinator>,
}

impl AppState {
    pub fn new(store: Arc<dyn DocumentStore>, coordinator: Arc<SettlementCoordinator>) -> Self {
        Self { store, coordinator }
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route("/v1/settlements", post(settlements::post_settlement))
        .route("/v1/users/:user/relations", get(relations::get_relations))
        .route(
            "/v1/users/:user/relations/:counterparty/balance",
            get(relations::get_balance),
        )
        .route("/v1/groups/:group", get(groups::get_group))
        .layer(cors)
        .with_state(state)
}
