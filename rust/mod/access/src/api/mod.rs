mod login;
mod me;
pub mod middleware;
mod users;

use std::sync::Arc;

use axum::Router;

use crate::service::AccessService;

/// Shared application state.
pub type AppState = Arc<AccessService>;

/// Build the access API router.
///
/// Routes are relative; the server nests them under `/access`. The session
/// middleware is applied by the server over the whole application (see
/// [`middleware::protect`]).
pub fn build_router(svc: AppState) -> Router {
    Router::new()
        .merge(login::routes())
        .merge(me::routes())
        .merge(users::routes())
        .with_state(svc)
}
