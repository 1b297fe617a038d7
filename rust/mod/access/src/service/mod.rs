pub mod assignment;
pub mod directory;
pub mod gate;
pub mod menu;
pub mod policy;
pub mod provider;
pub mod resolver;
pub mod session;

use std::sync::Arc;

use jsonwebtoken::{DecodingKey, EncodingKey, Validation};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use mediflow_core::ServiceError;
use mediflow_kv::KVStore;

use crate::service::directory::RoleDirectory;
use crate::service::provider::IdentityProvider;

/// Shown to any verified identity that is not in the role store.
pub const NOT_AUTHORIZED: &str = "No estás autorizado para acceder a esta aplicación.";

/// Access service error type.
#[derive(Debug, Error)]
pub enum AccessError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Validation(String),

    /// No usable session: missing, malformed, expired or revoked token.
    #[error("{0}")]
    Unauthenticated(String),

    /// Identity unknown to the role store, or its level does not open the page.
    #[error("{0}")]
    Forbidden(String),

    /// The identity provider or another external collaborator failed.
    #[error("{0}")]
    Upstream(String),

    /// The role configuration could not be read or parsed.
    #[error("role configuration: {0}")]
    Config(String),

    #[error("{0}")]
    Storage(String),

    #[error("{0}")]
    Internal(String),
}

impl From<AccessError> for ServiceError {
    fn from(e: AccessError) -> Self {
        match e {
            AccessError::NotFound(m) => ServiceError::NotFound(m),
            AccessError::Conflict(m) => ServiceError::Conflict(m),
            AccessError::Validation(m) => ServiceError::Validation(m),
            AccessError::Unauthenticated(m) => ServiceError::Unauthorized(m),
            AccessError::Forbidden(m) => ServiceError::PermissionDenied(m),
            AccessError::Upstream(m) => ServiceError::Unavailable(m),
            AccessError::Config(m) => ServiceError::Internal(format!("role configuration: {m}")),
            AccessError::Storage(m) => ServiceError::Storage(m),
            AccessError::Internal(m) => ServiceError::Internal(m),
        }
    }
}

impl From<mediflow_kv::KVError> for AccessError {
    fn from(e: mediflow_kv::KVError) -> Self {
        AccessError::Storage(e.to_string())
    }
}

/// Configuration for the access service.
#[derive(Debug, Clone)]
pub struct AccessConfig {
    /// JWT signing secret.
    pub jwt_secret: String,
    /// Access token lifetime in seconds (default: 8h, one working shift).
    pub token_ttl: i64,
    /// How long an OAuth `state` stays valid, in seconds (default: 10 min).
    pub login_state_ttl: i64,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "mediflow-dev-secret-change-me".to_string(),
            token_ttl: 8 * 3600,
            login_state_ttl: 600,
        }
    }
}

/// The access service: role directory, identity provider and sessions.
pub struct AccessService {
    pub(crate) directory: Arc<RoleDirectory>,
    pub(crate) provider: Arc<dyn IdentityProvider>,
    pub(crate) kv: Arc<dyn KVStore>,
    pub(crate) config: AccessConfig,
    pub(crate) encoding_key: EncodingKey,
    pub(crate) decoding_key: DecodingKey,
    pub(crate) validation: Validation,
}

impl AccessService {
    pub fn new(
        directory: Arc<RoleDirectory>,
        provider: Arc<dyn IdentityProvider>,
        kv: Arc<dyn KVStore>,
        config: AccessConfig,
    ) -> Arc<Self> {
        let encoding_key = EncodingKey::from_secret(config.jwt_secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.jwt_secret.as_bytes());
        Arc::new(Self {
            directory,
            provider,
            kv,
            config,
            encoding_key,
            decoding_key,
            validation: Validation::default(),
        })
    }

    pub fn directory(&self) -> &Arc<RoleDirectory> {
        &self.directory
    }

    // ── KV helpers ──

    pub(crate) fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, AccessError> {
        match self.kv.get(key)? {
            Some(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|e| AccessError::Internal(format!("corrupt record {key}: {e}"))),
            None => Ok(None),
        }
    }

    pub(crate) fn put_json<T: Serialize>(&self, key: &str, value: &T) -> Result<(), AccessError> {
        let bytes = serde_json::to_vec(value).map_err(|e| AccessError::Internal(e.to_string()))?;
        self.kv.set(key, &bytes)?;
        Ok(())
    }
}
