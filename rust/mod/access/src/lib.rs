//! Access module: who may use MEDIFLOW and what each of them sees.
//!
//! # Pieces
//!
//! - **Role store**: identity (email) → role (display name, level, capabilities)
//! - **Resolver**: identity → role or unauthorized
//! - **Menu builder**: level → ordered menu entries
//! - **Page policy**: a page is open to a level iff its menu lists it
//! - **Assignment authorizer**: level → staff it may assign tasks to
//! - **Gate**: login state machine, backed by OAuth and JWT sessions
//! - **Role directory**: live store with reload/commit and per-session drafts
//!
//! # Usage
//!
//! ```ignore
//! use access::{AccessModule, service::AccessConfig};
//!
//! let module = AccessModule::new(directory, provider, kv, AccessConfig::default());
//! let router = module.routes(); // Mount under /access
//! ```

pub mod api;
pub mod model;
pub mod service;

use std::sync::Arc;

use axum::Router;

use mediflow_core::Module;
use mediflow_kv::KVStore;

use crate::service::directory::RoleDirectory;
use crate::service::provider::IdentityProvider;
use crate::service::{AccessConfig, AccessService};

pub use crate::api::middleware::protect;
pub use crate::model::{Page, Principal, Role, RoleStore};
pub use crate::service::AccessError;
pub use crate::service::assignment::{assignable_targets, can_assign};
pub use crate::service::policy::{can_access, require_page};

/// Access module implementing the Module trait.
pub struct AccessModule {
    service: Arc<AccessService>,
}

impl AccessModule {
    pub fn new(
        directory: Arc<RoleDirectory>,
        provider: Arc<dyn IdentityProvider>,
        kv: Arc<dyn KVStore>,
        config: AccessConfig,
    ) -> Self {
        Self {
            service: AccessService::new(directory, provider, kv, config),
        }
    }

    /// Get a reference to the underlying AccessService.
    pub fn service(&self) -> &Arc<AccessService> {
        &self.service
    }
}

impl Module for AccessModule {
    fn name(&self) -> &str {
        "access"
    }

    fn routes(&self) -> Router {
        api::build_router(self.service.clone())
    }
}
