use axum::extract::{Extension, State};
use axum::routing::get;
use axum::{Json, Router};

use mediflow_core::ServiceError;

use crate::api::AppState;
use crate::model::{Page, Principal};
use crate::service::assignment::assignable_targets;
use crate::service::menu::menu_for;
use crate::service::policy::require_page;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/me", get(me))
        .route("/menu", get(menu))
        .route("/assignees", get(assignees))
}

/// GET /access/me
async fn me(Extension(principal): Extension<Principal>) -> Json<serde_json::Value> {
    Json(principal.to_json())
}

/// GET /access/menu
async fn menu(Extension(principal): Extension<Principal>) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "items": menu_for(principal.level()) }))
}

/// Staff the caller may assign tasks to.
/// GET /access/assignees
async fn assignees(
    State(svc): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    require_page(&principal, Page::AsignacionTareas)?;

    let items: Vec<serde_json::Value> =
        assignable_targets(principal.level(), &svc.directory().snapshot())
            .into_iter()
            .map(|(identity, role)| {
                serde_json::json!({
                    "identity": identity,
                    "display_name": role.display_name,
                    "level": role.level,
                })
            })
            .collect();
    Ok(Json(serde_json::json!({ "items": items })))
}

#[cfg(test)]
mod tests {
    use crate::api::testing::{app, get, login, send};
    use crate::service::testing::test_service;

    #[tokio::test]
    async fn me_and_menu_reflect_the_live_role() {
        let (_dir, svc) = test_service();
        let token = login(&svc, "enfermera@hospital.pe").await;
        let app = app(svc);

        let (status, body) = send(&app, get("/access/me", &token)).await;
        assert_eq!(status, 200);
        assert_eq!(body["identity"], "enfermera@hospital.pe");
        assert_eq!(body["role"]["display_name"], "Personal de Salud");

        let (_, body) = send(&app, get("/access/menu", &token)).await;
        let labels: Vec<&str> = body["items"]
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["label"].as_str().unwrap())
            .collect();
        assert_eq!(labels, vec!["Inicio", "Base de Datos", "Escanear QR", "Informe Mal Uso"]);
    }

    #[tokio::test]
    async fn pasante_two_sees_only_interns_zero_and_one() {
        let (_dir, svc) = test_service();
        let token = login(&svc, "user@example.com").await;

        let (status, body) = send(&app(svc), get("/access/assignees", &token)).await;
        assert_eq!(status, 200);
        let levels: Vec<i64> = body["items"]
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["level"].as_i64().unwrap())
            .collect();
        assert_eq!(levels, vec![0, 1]);
    }

    #[tokio::test]
    async fn assignees_page_is_gated() {
        let (_dir, svc) = test_service();
        let token = login(&svc, "pasante1@hospital.pe").await;
        let (status, body) = send(&app(svc), get("/access/assignees", &token)).await;
        assert_eq!(status, 403);
        assert_eq!(body["code"], "PERMISSION_DENIED");
    }
}
