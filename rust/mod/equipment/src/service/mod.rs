pub mod catalog;
pub mod documents;
pub mod source;

use std::sync::Arc;

use thiserror::Error;

use mediflow_blob::{BlobError, BlobStore};
use mediflow_core::ServiceError;

use crate::service::catalog::Catalog;
use crate::service::documents::DocumentStore;
use crate::service::source::EquipmentSource;

/// Equipment service error type.
#[derive(Debug, Error)]
pub enum EquipmentError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Validation(String),

    /// The equipment sheet could not be read and nothing is cached.
    #[error("{0}")]
    Unavailable(String),

    #[error("{0}")]
    Storage(String),

    #[error("{0}")]
    Internal(String),
}

impl From<EquipmentError> for ServiceError {
    fn from(e: EquipmentError) -> Self {
        match e {
            EquipmentError::NotFound(m) => ServiceError::NotFound(m),
            EquipmentError::Validation(m) => ServiceError::Validation(m),
            EquipmentError::Unavailable(m) => ServiceError::Unavailable(m),
            EquipmentError::Storage(m) => ServiceError::Storage(m),
            EquipmentError::Internal(m) => ServiceError::Internal(m),
        }
    }
}

impl From<BlobError> for EquipmentError {
    fn from(e: BlobError) -> Self {
        match e {
            BlobError::InvalidKey(key) => {
                EquipmentError::Validation(format!("Ruta de documento no válida: {key}"))
            }
            other => EquipmentError::Storage(other.to_string()),
        }
    }
}

/// The equipment service: sheet catalog plus document folders.
pub struct EquipmentService {
    pub catalog: Catalog,
    pub documents: DocumentStore,
}

impl EquipmentService {
    pub fn new(
        source: Arc<dyn EquipmentSource>,
        cache_ttl_secs: u64,
        blobs: Arc<dyn BlobStore>,
    ) -> Arc<Self> {
        Arc::new(Self {
            catalog: Catalog::new(source, cache_ttl_secs),
            documents: DocumentStore::new(blobs),
        })
    }
}
