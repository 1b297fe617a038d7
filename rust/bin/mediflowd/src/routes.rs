//! Route registration: module routers plus system endpoints, all behind the
//! session middleware.

use std::sync::Arc;

use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;

use access::service::AccessService;

/// Build the complete router with all routes.
///
/// Each module's router is nested under `/{module_name}`.
pub fn build_router(access: Arc<AccessService>, module_routes: Vec<(&str, Router)>) -> Router {
    let mut app: Router = Router::new()
        .route("/health", get(health))
        .route("/version", get(version));

    for (name, router) in module_routes {
        app = app.nest(&format!("/{name}"), router);
    }

    access::protect(app, access)
}

async fn health() -> impl IntoResponse {
    axum::Json(serde_json::json!({
        "status": "ok",
    }))
}

async fn version() -> impl IntoResponse {
    axum::Json(serde_json::json!({
        "name": "mediflowd",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    use access::service::directory::RoleDirectory;
    use access::service::provider::{OAuthConfig, OAuthProvider};
    use access::service::AccessConfig;
    use access::{AccessModule, RoleStore};
    use mediflow_core::Module;

    use super::*;

    fn app() -> (tempfile::TempDir, Router) {
        let dir = tempfile::tempdir().unwrap();
        let kv = Arc::new(mediflow_kv::RedbStore::open(&dir.path().join("kv.redb")).unwrap());
        let oauth: OAuthConfig = toml::from_str(
            "client_id = \"id\"\nclient_secret = \"s\"\nredirect_url = \"http://localhost/access/callback\"\n",
        )
        .unwrap();
        let module = AccessModule::new(
            Arc::new(RoleDirectory::from_store(RoleStore::new())),
            Arc::new(OAuthProvider::new(oauth)),
            kv,
            AccessConfig::default(),
        );
        let router = build_router(module.service().clone(), vec![(module.name(), module.routes())]);
        (dir, router)
    }

    async fn status_of(app: &Router, uri: &str) -> u16 {
        let req = Request::get(uri).body(Body::empty()).unwrap();
        app.clone().oneshot(req).await.unwrap().status().as_u16()
    }

    #[tokio::test]
    async fn system_endpoints_are_public() {
        let (_dir, app) = app();
        assert_eq!(status_of(&app, "/health").await, 200);
        assert_eq!(status_of(&app, "/version").await, 200);
    }

    #[tokio::test]
    async fn login_redirects_to_the_provider() {
        let (_dir, app) = app();
        assert_eq!(status_of(&app, "/access/login").await, 307);
    }

    #[tokio::test]
    async fn module_routes_need_a_session() {
        let (_dir, app) = app();
        assert_eq!(status_of(&app, "/access/me").await, 401);
        assert_eq!(status_of(&app, "/access/users").await, 401);
    }
}
