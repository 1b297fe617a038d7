pub mod api;
pub mod model;
pub mod service;

use std::sync::Arc;

use axum::Router;
use mediflow_core::Module;

use service::TaskService;

/// The Task module: assignments of maintenance work between staff.
///
/// Who may assign to whom comes from the access module's live role store;
/// equipment details come from the equipment catalog.
pub struct TaskModule {
    service: Arc<TaskService>,
}

impl TaskModule {
    pub fn new(service: Arc<TaskService>) -> Self {
        Self { service }
    }

    pub fn service(&self) -> &Arc<TaskService> {
        &self.service
    }
}

impl Module for TaskModule {
    fn name(&self) -> &str {
        "task"
    }

    fn routes(&self) -> Router {
        api::build_router(Arc::clone(&self.service))
    }
}
