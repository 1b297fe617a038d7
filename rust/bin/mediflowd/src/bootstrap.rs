//! Bootstrap: first-start checks and stale-record cleanup.
//!
//! When mediflowd starts:
//! 1. Verify the config is complete; if not, refuse to start.
//! 2. Drop expired sessions and login states left by the previous run.

use tracing::info;

use access::service::AccessService;

use crate::config::ServerConfig;

/// Verify server configuration is ready for use.
pub fn verify_config(config: &ServerConfig) -> anyhow::Result<()> {
    if config.jwt.secret.is_empty() {
        anyhow::bail!("JWT secret is empty in configuration.");
    }
    if config.jwt.expire_secs <= 0 {
        anyhow::bail!("JWT expire_secs must be positive.");
    }
    if config.storage.data_dir.is_empty() {
        anyhow::bail!("Storage data_dir is empty in configuration.");
    }
    if config.roles.source().is_none() {
        anyhow::bail!(
            "No role store in configuration.\n\
             Set [roles] data = '''{{...}}''' or [roles] path = \"roles.json\"."
        );
    }
    if config.equipment.source.trim().is_empty() {
        anyhow::bail!("Equipment source is empty in configuration.");
    }
    Ok(())
}

/// Remove session records that can no longer authenticate anyone.
pub fn purge_sessions(access: &AccessService) -> anyhow::Result<()> {
    let purged = access
        .purge_expired()
        .map_err(|e| anyhow::anyhow!("failed to purge expired sessions: {e}"))?;
    if purged > 0 {
        info!(purged, "expired sessions removed");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::SAMPLE;

    #[test]
    fn sample_config_passes() {
        let config = ServerConfig::parse(SAMPLE).unwrap();
        assert!(verify_config(&config).is_ok());
    }

    #[test]
    fn empty_secret_is_rejected() {
        let mut config = ServerConfig::parse(SAMPLE).unwrap();
        config.jwt.secret.clear();
        assert!(verify_config(&config).is_err());
    }

    #[test]
    fn missing_roles_are_rejected() {
        let mut config = ServerConfig::parse(SAMPLE).unwrap();
        config.roles.data = None;
        let err = verify_config(&config).unwrap_err();
        assert!(err.to_string().contains("No role store"));
    }

    #[test]
    fn empty_data_dir_is_rejected() {
        let mut config = ServerConfig::parse(SAMPLE).unwrap();
        config.storage.data_dir.clear();
        assert!(verify_config(&config).is_err());
    }
}
