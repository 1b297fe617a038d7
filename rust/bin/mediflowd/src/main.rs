//! `mediflowd`: the MEDIFLOW server binary.
//!
//! Usage:
//!   mediflowd -c <context-name-or-path> [--listen <addr>]
//!
//! The context name resolves to `/etc/mediflow/<name>.toml`.
//! If a path with `/` or `.` is given, it's used directly.

mod bootstrap;
mod config;
mod routes;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use mediflow_core::Module;
use tracing::info;

use access::service::directory::RoleDirectory;
use access::service::provider::OAuthProvider;
use access::service::AccessConfig;
use equipment::{EquipmentService, EquipmentSource, HttpSource, JsonFileSource};
use task::service::TaskService;

use config::ServerConfig;

/// MEDIFLOW server.
#[derive(Parser, Debug)]
#[command(name = "mediflowd", about = "MEDIFLOW biomedical engineering server")]
struct Cli {
    /// Context name or path to config file.
    #[arg(short = 'c', long = "config", required = true)]
    config: String,

    /// Listen address.
    #[arg(long = "listen", default_value = "0.0.0.0:8080")]
    listen: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    // Load server configuration.
    let config_path = ServerConfig::resolve_path(&cli.config);
    info!("Loading configuration from {}", config_path.display());
    let server_config = ServerConfig::load(&config_path)?;

    // Verify configuration is valid.
    bootstrap::verify_config(&server_config)?;

    // Initialize storage.
    let data_dir = PathBuf::from(&server_config.storage.data_dir);
    std::fs::create_dir_all(&data_dir)?;

    let core_config = mediflow_core::ServiceConfig {
        data_dir: Some(data_dir.clone()),
        documents_dir: server_config.storage.documents_dir.as_ref().map(PathBuf::from),
        listen: cli.listen.clone(),
        ..Default::default()
    };

    let kv: Arc<dyn mediflow_kv::KVStore> = Arc::new(
        mediflow_kv::RedbStore::open(&core_config.resolve_db_path())
            .map_err(|e| anyhow::anyhow!("failed to open KV store: {}", e))?,
    );
    let blob: Arc<dyn mediflow_blob::BlobStore> = Arc::new(
        mediflow_blob::FileStore::open(&core_config.resolve_documents_dir())
            .map_err(|e| anyhow::anyhow!("failed to open document store: {}", e))?,
    );

    // ── Access ──

    let role_source = server_config
        .roles
        .source()
        .ok_or_else(|| anyhow::anyhow!("no role store configured"))?;
    let directory = Arc::new(
        RoleDirectory::load(role_source)
            .map_err(|e| anyhow::anyhow!("failed to load role store: {}", e))?,
    );
    let access_config = AccessConfig {
        jwt_secret: server_config.jwt.secret.clone(),
        token_ttl: server_config.jwt.expire_secs,
        ..Default::default()
    };
    let access_module = access::AccessModule::new(
        Arc::clone(&directory),
        Arc::new(OAuthProvider::new(server_config.oauth.clone())),
        Arc::clone(&kv),
        access_config,
    );
    bootstrap::purge_sessions(access_module.service())?;
    info!("Access module initialized");

    // ── Equipment ──

    let eq = &server_config.equipment;
    let source: Arc<dyn EquipmentSource> = if eq.is_remote() {
        Arc::new(HttpSource::new(eq.source.clone(), eq.bearer_token.clone()))
    } else {
        Arc::new(JsonFileSource::new(&eq.source))
    };
    let equipment_service = EquipmentService::new(source, eq.cache_ttl_secs, blob);
    let equipment_module = equipment::EquipmentModule::new(Arc::clone(&equipment_service));
    info!(remote = eq.is_remote(), ttl = eq.cache_ttl_secs, "Equipment module initialized");

    // ── Tasks ──

    let task_service = TaskService::new(Arc::clone(&kv), directory, equipment_service);
    let task_module = task::TaskModule::new(task_service);
    info!("Task module initialized");

    let module_routes = vec![
        (access_module.name(), access_module.routes()),
        (equipment_module.name(), equipment_module.routes()),
        (task_module.name(), task_module.routes()),
    ];

    // Build router.
    let app = routes::build_router(Arc::clone(access_module.service()), module_routes);

    // Start server.
    let listener = tokio::net::TcpListener::bind(&cli.listen).await?;
    info!("MEDIFLOW server listening on {}", cli.listen);
    axum::serve(listener, app).await?;

    Ok(())
}
