pub mod assignments;
pub mod stats;

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use access::service::directory::RoleDirectory;
use equipment::{EquipmentError, EquipmentService};
use mediflow_core::ServiceError;
use mediflow_kv::KVStore;

/// Task service error type.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Validation(String),

    /// The caller may not assign to this person or touch this assignment.
    #[error("{0}")]
    PermissionDenied(String),

    /// The equipment catalog could not be read.
    #[error("{0}")]
    Unavailable(String),

    #[error("{0}")]
    Storage(String),

    #[error("{0}")]
    Internal(String),
}

impl From<TaskError> for ServiceError {
    fn from(e: TaskError) -> Self {
        match e {
            TaskError::NotFound(m) => ServiceError::NotFound(m),
            TaskError::Validation(m) => ServiceError::Validation(m),
            TaskError::PermissionDenied(m) => ServiceError::PermissionDenied(m),
            TaskError::Unavailable(m) => ServiceError::Unavailable(m),
            TaskError::Storage(m) => ServiceError::Storage(m),
            TaskError::Internal(m) => ServiceError::Internal(m),
        }
    }
}

impl From<mediflow_kv::KVError> for TaskError {
    fn from(e: mediflow_kv::KVError) -> Self {
        TaskError::Storage(e.to_string())
    }
}

impl From<EquipmentError> for TaskError {
    fn from(e: EquipmentError) -> Self {
        match e {
            EquipmentError::NotFound(m) => TaskError::NotFound(m),
            EquipmentError::Validation(m) => TaskError::Validation(m),
            EquipmentError::Unavailable(m) => TaskError::Unavailable(m),
            EquipmentError::Storage(m) => TaskError::Storage(m),
            EquipmentError::Internal(m) => TaskError::Internal(m),
        }
    }
}

/// Task assignments: records in KV, people from the role directory,
/// equipment from the catalog.
pub struct TaskService {
    pub(crate) kv: Arc<dyn KVStore>,
    pub(crate) directory: Arc<RoleDirectory>,
    pub(crate) equipment: Arc<EquipmentService>,
}

impl TaskService {
    pub fn new(
        kv: Arc<dyn KVStore>,
        directory: Arc<RoleDirectory>,
        equipment: Arc<EquipmentService>,
    ) -> Arc<Self> {
        Arc::new(Self {
            kv,
            directory,
            equipment,
        })
    }

    // ── KV helpers ──

    pub(crate) fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, TaskError> {
        match self.kv.get(key)? {
            Some(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|e| TaskError::Internal(format!("corrupt record {key}: {e}"))),
            None => Ok(None),
        }
    }

    pub(crate) fn put_json<T: Serialize>(&self, key: &str, value: &T) -> Result<(), TaskError> {
        let bytes = serde_json::to_vec(value).map_err(|e| TaskError::Internal(e.to_string()))?;
        self.kv.set(key, &bytes)?;
        Ok(())
    }
}
