use axum::extract::{Extension, Path, State};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::Deserialize;

use mediflow_core::ServiceError;

use crate::api::AppState;
use crate::model::{Page, Principal, ROLE_CHOICES};
use crate::service::policy::require_page;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/roles", get(role_choices))
        .route("/roles/@reload", post(reload))
        .route("/users", get(list_users).post(add_user))
        .route("/users/@export", get(export))
        .route("/users/@commit", post(commit))
        .route("/users/{email}", delete(remove_user))
}

#[derive(Deserialize)]
struct AddUser {
    email: String,
    role: String,
}

/// Role names the form offers, with their levels.
/// GET /access/roles
async fn role_choices(
    Extension(principal): Extension<Principal>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    require_page(&principal, Page::GestionUsuarios)?;
    let items: Vec<serde_json::Value> = ROLE_CHOICES
        .iter()
        .map(|(name, level)| serde_json::json!({ "name": name, "level": level }))
        .collect();
    Ok(Json(serde_json::json!({ "items": items })))
}

/// The caller's working copy of the user list.
/// GET /access/users
async fn list_users(
    State(svc): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    require_page(&principal, Page::GestionUsuarios)?;
    let sid = &principal.session_id;
    let draft = svc.directory().draft(sid);

    let items: Vec<serde_json::Value> = draft
        .iter()
        .map(|(email, role)| {
            serde_json::json!({
                "email": email,
                "display_name": role.display_name,
                "level": role.level,
                "capabilities": role.capabilities,
            })
        })
        .collect();
    Ok(Json(serde_json::json!({
        "items": items,
        "total": draft.len(),
        "pending": svc.directory().has_pending_changes(sid),
    })))
}

/// POST /access/users
async fn add_user(
    State(svc): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(body): Json<AddUser>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    require_page(&principal, Page::GestionUsuarios)?;
    let role = svc
        .directory()
        .add_user(&principal.session_id, &body.email, &body.role)?;
    Ok(Json(serde_json::json!({
        "email": body.email.trim(),
        "display_name": role.display_name,
        "level": role.level,
    })))
}

/// DELETE /access/users/{email}
async fn remove_user(
    State(svc): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(email): Path<String>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    require_page(&principal, Page::GestionUsuarios)?;
    svc.directory()
        .remove_user(&principal.session_id, &email, &principal.identity)?;
    Ok(Json(serde_json::json!({ "removed": email })))
}

/// Draft as JSON plus a TOML snippet for the server configuration.
/// GET /access/users/@export
async fn export(
    State(svc): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    require_page(&principal, Page::GestionUsuarios)?;
    let export = svc.directory().export(&principal.session_id)?;
    Ok(Json(serde_json::json!({ "json": export.json, "toml": export.toml })))
}

/// Apply the draft to the running server (until restart or reload).
/// POST /access/users/@commit
async fn commit(
    State(svc): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    require_page(&principal, Page::GestionUsuarios)?;
    let total = svc.directory().commit_draft(&principal.session_id)?;
    tracing::info!(actor = %principal.identity, total, "user list committed");
    Ok(Json(serde_json::json!({ "total": total, "persisted": false })))
}

/// Re-read the role configuration, dropping in-memory commits.
/// POST /access/roles/@reload
async fn reload(
    State(svc): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    require_page(&principal, Page::GestionUsuarios)?;
    let total = svc.directory().reload()?;
    Ok(Json(serde_json::json!({ "total": total })))
}
