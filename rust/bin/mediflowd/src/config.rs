//! Server configuration file (`/etc/mediflow/<name>.toml`).
//!
//! ```toml
//! [storage]
//! data_dir = "/var/lib/mediflow"
//!
//! [jwt]
//! secret = "..."
//! expire_secs = 28800
//!
//! [roles]
//! data = '''{"jefe@hospital.pe": ["Jefe del Departamento", 5, []]}'''
//! # or: path = "/etc/mediflow/roles.json"
//!
//! [oauth]
//! client_id = "..."
//! client_secret = "..."
//! redirect_url = "https://mediflow.hospital.pe/access/callback"
//!
//! [equipment]
//! source = "/var/lib/mediflow/equipos.json"   # or an http(s) URL
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

use access::service::directory::RoleSource;
use access::service::provider::OAuthConfig;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub storage: StorageConfig,
    pub jwt: JwtConfig,
    pub roles: RolesConfig,
    pub oauth: OAuthConfig,
    pub equipment: EquipmentConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub data_dir: String,
    /// Equipment document tree; defaults to `<data_dir>/documents`.
    #[serde(default)]
    pub documents_dir: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    #[serde(default = "default_expire_secs")]
    pub expire_secs: i64,
}

fn default_expire_secs() -> i64 {
    8 * 3600
}

/// The role blob: inline JSON or a path to a JSON file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RolesConfig {
    #[serde(default)]
    pub data: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
}

impl RolesConfig {
    /// `data` wins over `path` when both are set.
    pub fn source(&self) -> Option<RoleSource> {
        let data = self.data.as_deref().filter(|d| !d.trim().is_empty());
        let path = self.path.as_deref().filter(|p| !p.trim().is_empty());
        match (data, path) {
            (Some(d), _) => Some(RoleSource::Inline(d.to_string())),
            (None, Some(p)) => Some(RoleSource::File(PathBuf::from(p))),
            (None, None) => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EquipmentConfig {
    /// JSON file of sheet rows, or an `http(s)://` endpoint returning them.
    pub source: String,
    #[serde(default)]
    pub bearer_token: Option<String>,
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,
}

fn default_cache_ttl() -> u64 {
    equipment::service::catalog::DEFAULT_TTL_SECS
}

impl EquipmentConfig {
    pub fn is_remote(&self) -> bool {
        self.source.starts_with("http://") || self.source.starts_with("https://")
    }
}

impl ServerConfig {
    /// A bare context name maps to `/etc/mediflow/<name>.toml`; anything
    /// containing `/` or `.` is taken as a path.
    pub fn resolve_path(name: &str) -> PathBuf {
        if name.contains('/') || name.contains('.') {
            PathBuf::from(name)
        } else {
            PathBuf::from(format!("/etc/mediflow/{name}.toml"))
        }
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("cannot read {}: {e}", path.display()))?;
        Self::parse(&text).map_err(|e| anyhow::anyhow!("{}: {e}", path.display()))
    }

    pub fn parse(text: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(text)?)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub const SAMPLE: &str = r#"
[storage]
data_dir = "/tmp/mediflow"

[jwt]
secret = "s3cret"

[roles]
data = '''
{"jefe@hospital.pe": ["Jefe del Departamento", 5, ["Gestión de Usuarios"]]}
'''

[oauth]
client_id = "id"
client_secret = "secret"
redirect_url = "http://localhost:8080/access/callback"

[equipment]
source = "https://sheets.example/equipos"
bearer_token = "tok"
"#;

    #[test]
    fn parses_sample_with_defaults() {
        let config = ServerConfig::parse(SAMPLE).unwrap();
        assert_eq!(config.storage.data_dir, "/tmp/mediflow");
        assert_eq!(config.jwt.expire_secs, 28800);
        assert_eq!(config.equipment.cache_ttl_secs, 300);
        assert!(config.equipment.is_remote());
        assert!(matches!(config.roles.source(), Some(RoleSource::Inline(_))));
    }

    #[test]
    fn roles_source_prefers_inline_data() {
        let roles = RolesConfig {
            data: None,
            path: Some("/etc/mediflow/roles.json".into()),
        };
        assert!(matches!(roles.source(), Some(RoleSource::File(_))));

        let roles = RolesConfig {
            data: Some("  ".into()),
            path: None,
        };
        assert!(roles.source().is_none());
    }

    #[test]
    fn resolve_path_context_name_or_file() {
        assert_eq!(
            ServerConfig::resolve_path("hospital"),
            PathBuf::from("/etc/mediflow/hospital.toml")
        );
        assert_eq!(
            ServerConfig::resolve_path("./dev.toml"),
            PathBuf::from("./dev.toml")
        );
    }

    #[test]
    fn missing_section_is_an_error() {
        assert!(ServerConfig::parse("[storage]\ndata_dir = \"/x\"\n").is_err());
    }
}
