//! Equipment module: the read-only equipment catalog and the per-equipment
//! document folders (code generation, provisioning, scan lookup, uploads).
//!
//! The catalog reads sheet rows through an [`EquipmentSource`] and keeps them
//! in a TTL cache. Documents live in a blob store under `EQU-XXXXXXX/<subfolder>/`.

pub mod api;
pub mod model;
pub mod service;

use std::sync::Arc;

use axum::Router;

use mediflow_core::Module;

pub use crate::model::{Equipment, EquipmentCode};
pub use crate::service::source::{EquipmentSource, HttpSource, JsonFileSource};
pub use crate::service::{EquipmentError, EquipmentService};

/// Equipment module implementing the Module trait.
pub struct EquipmentModule {
    service: Arc<EquipmentService>,
}

impl EquipmentModule {
    pub fn new(service: Arc<EquipmentService>) -> Self {
        Self { service }
    }

    pub fn service(&self) -> &Arc<EquipmentService> {
        &self.service
    }
}

impl Module for EquipmentModule {
    fn name(&self) -> &str {
        "equipment"
    }

    fn routes(&self) -> Router {
        api::build_router(self.service.clone())
    }
}
