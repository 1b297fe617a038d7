use axum::extract::{Extension, Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use access::{require_page, Page, Principal};
use mediflow_core::{ListParams, ListResult, ServiceError};

use crate::api::AppState;
use crate::model::Equipment;
use crate::service::catalog::EquipmentFilter;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/items", get(list_items))
        .route("/items/{code}", get(get_item))
        .route("/areas", get(areas))
        .route("/@refresh", post(refresh))
}

#[derive(Debug, Default, Deserialize)]
struct AreaQuery {
    area: Option<String>,
}

/// GET /equipment/items?area=&q=&limit=&offset=
///
/// `total` counts every match before paging.
async fn list_items(
    State(svc): State<AppState>,
    Extension(principal): Extension<Principal>,
    Query(scope): Query<AreaQuery>,
    Query(params): Query<ListParams>,
) -> Result<Json<ListResult<Equipment>>, ServiceError> {
    require_page(&principal, Page::BaseDeDatos)?;
    let filter = EquipmentFilter {
        area: scope.area,
        q: params.query().map(str::to_string),
    };
    let items = svc.catalog.list(&filter).await?;
    let total = items.len();
    Ok(Json(ListResult {
        items: params.page(items),
        total,
    }))
}

/// GET /equipment/items/{code}
async fn get_item(
    State(svc): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(code): Path<String>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    require_page(&principal, Page::BaseDeDatos)?;
    let item = svc.catalog.get(&code).await?;
    Ok(Json(serde_json::to_value(item).map_err(|e| ServiceError::Internal(e.to_string()))?))
}

/// GET /equipment/areas
async fn areas(
    State(svc): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    require_page(&principal, Page::BaseDeDatos)?;
    Ok(Json(serde_json::json!({ "items": svc.catalog.areas().await? })))
}

/// Drop the cached sheet and fetch it again.
/// POST /equipment/@refresh
async fn refresh(
    State(svc): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    require_page(&principal, Page::BaseDeDatos)?;
    svc.catalog.invalidate();
    let total = svc.catalog.all().await?.len();
    tracing::info!(actor = %principal.identity, total, "equipment catalog refreshed on request");
    Ok(Json(serde_json::json!({ "total": total })))
}
