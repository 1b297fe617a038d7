use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, Extension, Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};

use access::{require_page, Page, Principal};
use mediflow_core::ServiceError;

use crate::api::AppState;
use crate::model::DocumentKind;
use crate::service::EquipmentError;

/// Largest accepted upload (manuals are scanned PDFs).
const MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/codes/@next", get(next_code))
        .route("/folders", post(provision))
        .route("/folders/{code}", get(list_folder))
        .route(
            "/folders/{code}/{subfolder}/{name}",
            get(download)
                .put(upload)
                .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
}

fn to_json<T: serde::Serialize>(value: T) -> Result<Json<serde_json::Value>, ServiceError> {
    serde_json::to_value(value)
        .map(Json)
        .map_err(|e| ServiceError::Internal(e.to_string()))
}

/// The code a new folder would get, without reserving it.
/// GET /equipment/codes/@next
async fn next_code(
    State(svc): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    require_page(&principal, Page::GenerarQr)?;
    let code = svc.documents.next_code()?;
    Ok(Json(serde_json::json!({ "code": code.to_string() })))
}

/// Allocate the next code and create its folder tree.
/// POST /equipment/folders
async fn provision(
    State(svc): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    require_page(&principal, Page::GenerarQr)?;
    let folder = svc.documents.provision()?;
    tracing::info!(actor = %principal.identity, code = %folder.code, "folder created");
    to_json(folder)
}

/// Files stored for a scanned code.
/// GET /equipment/folders/{code}
async fn list_folder(
    State(svc): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(code): Path<String>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    require_page(&principal, Page::EscanearQr)?;
    to_json(svc.documents.list(&code)?)
}

/// GET /equipment/folders/{code}/{subfolder}/{name}
async fn download(
    State(svc): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path((code, subfolder, name)): Path<(String, String, String)>,
) -> Result<Response, ServiceError> {
    require_page(&principal, Page::EscanearQr)?;
    let (data, mime) = svc.documents.get(&code, &subfolder, &name)?;
    Ok((
        [
            (header::CONTENT_TYPE, mime.to_string()),
            (header::CONTENT_DISPOSITION, content_disposition(&name)),
        ],
        data,
    )
        .into_response())
}

/// `inline` disposition with an ASCII `filename` fallback and the exact
/// name as an RFC 5987 `filename*` parameter. Control characters are dropped.
fn content_disposition(name: &str) -> String {
    let name: String = name.chars().filter(|c| !c.is_control()).collect();
    let fallback: String = name
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii() => c,
            _ => '_',
        })
        .collect();
    let mut encoded = String::with_capacity(name.len() * 3);
    for byte in name.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' => encoded.push(byte as char),
            b'!' | b'#' | b'$' | b'&' | b'+' | b'-' | b'.' | b'^' | b'_' | b'`' | b'|' | b'~' => {
                encoded.push(byte as char)
            }
            _ => encoded.push_str(&format!("%{byte:02X}")),
        }
    }
    format!("inline; filename=\"{fallback}\"; filename*=UTF-8''{encoded}")
}

/// Upload into a subfolder; each subfolder belongs to the page that fills it.
/// PUT /equipment/folders/{code}/{subfolder}/{name}
async fn upload(
    State(svc): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path((code, subfolder, name)): Path<(String, String, String)>,
    body: Bytes,
) -> Result<Json<serde_json::Value>, ServiceError> {
    let kind = DocumentKind::from_folder_name(&subfolder).ok_or_else(|| {
        EquipmentError::Validation(format!("Subcarpeta desconocida: {subfolder}"))
    })?;
    require_page(&principal, kind.upload_page())?;
    let doc = svc.documents.put(&code, &subfolder, &name, &body)?;
    to_json(doc)
}
