use std::path::PathBuf;

use async_trait::async_trait;
use tracing::debug;

use crate::model::SheetRow;
use crate::service::EquipmentError;

/// Where the equipment sheet comes from.
///
/// Rows are header → cell objects; mapping them into records is the
/// catalog's job.
#[async_trait]
pub trait EquipmentSource: Send + Sync {
    async fn fetch_rows(&self) -> Result<Vec<SheetRow>, EquipmentError>;
}

/// A JSON file holding an array of row objects (a sheet export).
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl EquipmentSource for JsonFileSource {
    async fn fetch_rows(&self) -> Result<Vec<SheetRow>, EquipmentError> {
        let bytes = tokio::fs::read(&self.path).await.map_err(|e| {
            EquipmentError::Unavailable(format!(
                "No se pudo leer la hoja de equipos {}: {e}",
                self.path.display()
            ))
        })?;
        let rows: Vec<SheetRow> = serde_json::from_slice(&bytes).map_err(|e| {
            EquipmentError::Unavailable(format!("Hoja de equipos con formato inválido: {e}"))
        })?;
        debug!(path = %self.path.display(), rows = rows.len(), "equipment sheet read");
        Ok(rows)
    }
}

/// An HTTP endpoint returning the rows as a JSON array.
pub struct HttpSource {
    url: String,
    bearer_token: Option<String>,
    client: reqwest::Client,
}

impl HttpSource {
    pub fn new(url: impl Into<String>, bearer_token: Option<String>) -> Self {
        Self {
            url: url.into(),
            bearer_token,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl EquipmentSource for HttpSource {
    async fn fetch_rows(&self) -> Result<Vec<SheetRow>, EquipmentError> {
        let mut req = self.client.get(&self.url);
        if let Some(token) = &self.bearer_token {
            req = req.bearer_auth(token);
        }
        let resp = req
            .send()
            .await
            .map_err(|e| EquipmentError::Unavailable(format!("equipment sheet request failed: {e}")))?;
        if !resp.status().is_success() {
            return Err(EquipmentError::Unavailable(format!(
                "equipment sheet returned {}",
                resp.status()
            )));
        }
        let rows: Vec<SheetRow> = resp
            .json()
            .await
            .map_err(|e| EquipmentError::Unavailable(format!("equipment sheet parse failed: {e}")))?;
        debug!(url = %self.url, rows = rows.len(), "equipment sheet fetched");
        Ok(rows)
    }
}
