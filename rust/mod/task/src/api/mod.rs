mod assignments;

use std::sync::Arc;

use axum::Router;

use crate::service::TaskService;

/// Shared application state.
pub type AppState = Arc<TaskService>;

/// Build the task module router.
///
/// Routes (nested under `/task` by the server):
/// - `POST   /assignments`              — create an assignment
/// - `GET    /assignments`              — the assignment log, filtered and sorted
/// - `GET    /assignments/{id}`         — one assignment
/// - `POST   /assignments/{id}/@status` — change its status
/// - `GET    /mine`                     — work assigned to the caller
/// - `GET    /stats`                    — summary figures
pub fn build_router(svc: AppState) -> Router {
    Router::new().merge(assignments::routes()).with_state(svc)
}

#[cfg(test)]
pub(crate) mod testing {
    use axum::body::Body;
    use axum::http::{Request, Response};
    use axum::Extension;
    use tower::ServiceExt;

    use access::Principal;

    use super::*;

    /// Router with `principal` injected as if the session middleware ran.
    pub fn app_as(svc: AppState, principal: Principal) -> Router {
        Router::new()
            .nest("/task", build_router(svc))
            .layer(Extension(principal))
    }

    pub async fn send(app: &Router, req: Request<Body>) -> (u16, serde_json::Value) {
        let resp: Response<Body> = app.clone().oneshot(req).await.unwrap();
        let status = resp.status().as_u16();
        let bytes = axum::body::to_bytes(resp.into_body(), 1024 * 1024).await.unwrap();
        let json = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    pub fn get(uri: &str) -> Request<Body> {
        Request::get(uri).body(Body::empty()).unwrap()
    }

    pub fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }
}
