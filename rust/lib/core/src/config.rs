use std::path::PathBuf;

/// Storage locations and listen address shared by the server and its modules.
///
/// Only `data_dir` is normally set; every store path falls back to a fixed
/// name underneath it.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Root directory for all persistent state.
    pub data_dir: Option<PathBuf>,

    /// Path to the redb database file (sessions, task assignments).
    /// Defaults to `{data_dir}/data.redb`.
    pub db_path: Option<PathBuf>,

    /// Root of the equipment document tree (`EQU-XXXXXXX/<subfolder>/...`).
    /// Defaults to `{data_dir}/documents`.
    pub documents_dir: Option<PathBuf>,

    /// Listen address for the HTTP server.
    pub listen: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            db_path: None,
            documents_dir: None,
            listen: "0.0.0.0:8080".to_string(),
        }
    }
}

impl ServiceConfig {
    /// Resolve the redb database path, falling back to `{data_dir}/data.redb`.
    pub fn resolve_db_path(&self) -> PathBuf {
        self.db_path
            .clone()
            .unwrap_or_else(|| self.resolve_data_subpath("data.redb"))
    }

    /// Resolve the document tree root, falling back to `{data_dir}/documents`.
    pub fn resolve_documents_dir(&self) -> PathBuf {
        self.documents_dir
            .clone()
            .unwrap_or_else(|| self.resolve_data_subpath("documents"))
    }

    fn resolve_data_subpath(&self, name: &str) -> PathBuf {
        self.data_dir
            .as_ref()
            .map(|d| d.join(name))
            .unwrap_or_else(|| PathBuf::from(name))
    }
}
