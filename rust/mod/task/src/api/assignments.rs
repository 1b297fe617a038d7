use axum::extract::{Extension, Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use access::{require_page, Page, Principal};
use mediflow_core::{ListParams, ServiceError};

use crate::api::AppState;
use crate::model::{Assignment, NewAssignment, TaskStatus};
use crate::service::assignments::AssignmentFilter;
use crate::service::TaskError;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/assignments", post(create_assignment).get(list_assignments))
        .route("/assignments/{id}", get(get_assignment))
        .route("/assignments/{id}/@status", post(update_status))
        .route("/mine", get(mine))
        .route("/stats", get(stats))
}

fn parse_status(s: &str) -> Result<TaskStatus, TaskError> {
    TaskStatus::from_str(s.trim())
        .ok_or_else(|| TaskError::Validation(format!("Estado desconocido: {s}")))
}

// ---------------------------------------------------------------------------
// POST /assignments
// ---------------------------------------------------------------------------

async fn create_assignment(
    State(svc): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(input): Json<NewAssignment>,
) -> Result<Json<Assignment>, ServiceError> {
    require_page(&principal, Page::AsignacionTareas)?;
    let assignment = svc.create(&principal, input).await?;
    Ok(Json(assignment))
}

// ---------------------------------------------------------------------------
// GET /assignments?status&assignee&mine&sort&limit&offset
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
struct AssignmentQuery {
    status: Option<String>,
    assignee: Option<String>,
    mine: Option<bool>,
    sort: Option<String>,
    limit: Option<usize>,
    offset: Option<usize>,
}

async fn list_assignments(
    State(svc): State<AppState>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<AssignmentQuery>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    require_page(&principal, Page::AsignacionTareas)?;

    let status = query
        .status
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(parse_status)
        .transpose()?;
    let filter = AssignmentFilter {
        status,
        assignee: query.assignee,
        mine: query.mine,
    };
    let defaults = ListParams::default();
    let params = ListParams {
        limit: query.limit.unwrap_or(defaults.limit),
        offset: query.offset.unwrap_or(defaults.offset),
        sort: query.sort,
        q: None,
    };

    let result = svc.list(&principal, &filter, &params)?;
    Ok(Json(serde_json::json!({
        "items": result.items,
        "total": result.total,
    })))
}

// ---------------------------------------------------------------------------
// GET /assignments/{id}
// ---------------------------------------------------------------------------

async fn get_assignment(
    State(svc): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<Json<Assignment>, ServiceError> {
    require_page(&principal, Page::AsignacionTareas)?;
    Ok(Json(svc.get(&id)?))
}

// ---------------------------------------------------------------------------
// POST /assignments/{id}/@status
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct StatusChange {
    status: String,
}

/// The assignee completes work from the home page, so only `Inicio` is
/// required here; the service decides who may set which status.
async fn update_status(
    State(svc): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    Json(body): Json<StatusChange>,
) -> Result<Json<Assignment>, ServiceError> {
    require_page(&principal, Page::Inicio)?;
    let status = parse_status(&body.status)?;
    Ok(Json(svc.update_status(&principal, &id, status)?))
}

// ---------------------------------------------------------------------------
// GET /mine
// ---------------------------------------------------------------------------

/// Work assigned to the caller.
async fn mine(
    State(svc): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    require_page(&principal, Page::Inicio)?;
    let items = svc.assigned_to(&principal.identity)?;
    Ok(Json(serde_json::json!({ "items": items, "total": items.len() })))
}

// ---------------------------------------------------------------------------
// GET /stats
// ---------------------------------------------------------------------------

async fn stats(
    State(svc): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    require_page(&principal, Page::AsignacionTareas)?;
    let stats = svc.stats()?;
    serde_json::to_value(stats)
        .map(Json)
        .map_err(|e| ServiceError::Internal(e.to_string()))
}
