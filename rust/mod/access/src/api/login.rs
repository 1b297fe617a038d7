use axum::extract::{Extension, Query, State};
use axum::http::StatusCode;
use axum::response::Redirect;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use mediflow_core::ServiceError;

use crate::api::AppState;
use crate::model::Principal;
use crate::service::menu::menu_for;
use crate::service::AccessError;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(login))
        .route("/callback", get(callback))
        .route("/logout", post(logout))
}

/// Redirect to the identity provider.
/// GET /access/login
async fn login(State(svc): State<AppState>) -> Result<Redirect, ServiceError> {
    let url = svc.begin_login()?;
    Ok(Redirect::temporary(&url))
}

#[derive(Deserialize)]
struct CallbackParams {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    state: String,
    #[serde(default)]
    error: Option<String>,
}

/// Provider callback: exchange the code, resolve the role, issue a token.
/// GET /access/callback?code=...&state=...
async fn callback(
    State(svc): State<AppState>,
    Query(params): Query<CallbackParams>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    if let Some(error) = params.error {
        svc.cancel_login(&params.state)?;
        return Err(AccessError::Unauthenticated(format!("login cancelled: {error}")).into());
    }
    let code = params
        .code
        .ok_or_else(|| AccessError::Validation("missing authorization code".into()))?;

    let login = svc.complete_login(&code, &params.state).await?;
    let principal = login.principal.to_json();
    Ok(Json(serde_json::json!({
        "access_token": login.token.access_token,
        "token_type": login.token.token_type,
        "expires_in": login.token.expires_in,
        "identity": principal["identity"],
        "name": principal["name"],
        "role": principal["role"],
        "principal": principal,
        "welcome": format!("Bienvenida/o {}", login.principal.role.display_name),
        "menu": menu_for(login.principal.level()),
    })))
}

/// POST /access/logout
async fn logout(
    State(svc): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Result<StatusCode, ServiceError> {
    svc.logout(&principal)?;
    Ok(StatusCode::NO_CONTENT)
}
