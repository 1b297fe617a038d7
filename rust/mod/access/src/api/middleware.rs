use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Router;

use mediflow_core::ServiceError;

use crate::api::AppState;
use crate::service::AccessError;

/// Paths that don't require a session.
const PUBLIC_PATHS: &[&str] = &["/health", "/version", "/access/login", "/access/callback"];

/// Session middleware.
///
/// Requires `Authorization: Bearer <token>` on every non-public path,
/// re-resolves the token's identity against the live role store and stores
/// the resulting [`Principal`](crate::model::Principal) as a request
/// extension for handlers to extract via `Extension<Principal>`.
pub async fn auth_middleware(
    State(svc): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    if is_public_path(req.uri().path()) {
        return next.run(req).await;
    }

    let token = match extract_bearer(req.headers()) {
        Some(t) => t.to_string(),
        None => {
            return ServiceError::from(AccessError::Unauthenticated(
                "missing authorization header".into(),
            ))
            .into_response();
        }
    };

    match svc.authenticate(&token) {
        Ok(principal) => {
            req.extensions_mut().insert(principal);
            next.run(req).await
        }
        Err(e) => ServiceError::from(e).into_response(),
    }
}

/// Wrap a router with the session middleware.
pub fn protect(router: Router, svc: AppState) -> Router {
    router.layer(axum::middleware::from_fn_with_state(svc, auth_middleware))
}

fn extract_bearer(headers: &axum::http::HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

fn is_public_path(path: &str) -> bool {
    PUBLIC_PATHS.contains(&path)
}
