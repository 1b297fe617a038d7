use axum::Router;

/// A business module that contributes HTTP routes.
///
/// `access`, `equipment` and `task` each implement this trait; `mediflowd`
/// collects the modules and nests every router under `/{name}`.
pub trait Module: Send + Sync {
    /// Module name, used for logging and as the route prefix.
    fn name(&self) -> &str;

    /// Return the module's routes, relative to `/{name}`.
    fn routes(&self) -> Router;
}
