mod folders;
mod items;

use std::sync::Arc;

use axum::Router;

use crate::service::EquipmentService;

/// Shared application state.
pub type AppState = Arc<EquipmentService>;

/// Build the equipment API router. Routes are relative; the server nests
/// them under `/equipment` behind the session middleware.
pub fn build_router(svc: AppState) -> Router {
    Router::new()
        .merge(items::routes())
        .merge(folders::routes())
        .with_state(svc)
}
