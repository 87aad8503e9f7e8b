//! Configuration loader for stickybus.
//!
//! Reads `stickybus.toml` from a configuration directory
//! (`~/.config/stickybus/` by default) and deserializes it into
//! [`BusConfig`]. The lenient loader falls back to defaults when the file is
//! missing or malformed; the strict loader reports the failure instead.

use std::path::{Path, PathBuf};

use anyhow::Context;
use stickybus_types::config::BusConfig;

/// File name looked up inside the configuration directory.
pub const CONFIG_FILE_NAME: &str = "stickybus.toml";

/// Platform configuration directory for stickybus, if one can be resolved.
pub fn default_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("stickybus"))
}

/// Load bus configuration from `{config_dir}/stickybus.toml`.
///
/// - If the file does not exist, returns [`BusConfig::default()`].
/// - If the file exists but fails to read or parse, logs a warning and returns the default.
/// - Otherwise returns the parsed config with its capacity clamped.
pub async fn load_bus_config(config_dir: &Path) -> BusConfig {
    let config_path = config_dir.join(CONFIG_FILE_NAME);

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No {CONFIG_FILE_NAME} found at {}, using defaults", config_path.display());
            return BusConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return BusConfig::default();
        }
    };

    match toml::from_str::<BusConfig>(&content) {
        Ok(config) => normalize(config),
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            BusConfig::default()
        }
    }
}

/// Load bus configuration from an explicit file, failing on any error.
pub async fn load_bus_config_strict(path: &Path) -> anyhow::Result<BusConfig> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let config = toml::from_str::<BusConfig>(&content)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    Ok(normalize(config))
}

fn normalize(mut config: BusConfig) -> BusConfig {
    config.broadcast_capacity = config.broadcast_capacity.max(1);
    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use stickybus_types::config::TransportKind;
    use tempfile::TempDir;

    #[tokio::test]
    async fn load_bus_config_missing_file_returns_default() {
        let tmp = TempDir::new().unwrap();
        let config = load_bus_config(tmp.path()).await;
        assert_eq!(config, BusConfig::default());
    }

    #[tokio::test]
    async fn load_bus_config_valid_toml_returns_parsed() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(
            tmp.path().join(CONFIG_FILE_NAME),
            r#"
app_id = "com.example.notes"
transport = "broadcast"
broadcast_capacity = 0
"#,
        )
        .await
        .unwrap();

        let config = load_bus_config(tmp.path()).await;
        assert_eq!(config.app_id, "com.example.notes");
        assert_eq!(config.transport, TransportKind::Broadcast);
        assert_eq!(config.broadcast_capacity, 1);
    }

    #[tokio::test]
    async fn load_bus_config_invalid_toml_returns_default() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(tmp.path().join(CONFIG_FILE_NAME), "this is not { valid toml !!!")
            .await
            .unwrap();

        let config = load_bus_config(tmp.path()).await;
        assert_eq!(config, BusConfig::default());
    }

    #[tokio::test]
    async fn load_bus_config_strict_reports_errors() {
        let tmp = TempDir::new().unwrap();
        let missing = load_bus_config_strict(&tmp.path().join("nope.toml")).await;
        assert!(missing.unwrap_err().to_string().contains("failed to read"));

        let path = tmp.path().join(CONFIG_FILE_NAME);
        tokio::fs::write(&path, "transport = 42").await.unwrap();
        let malformed = load_bus_config_strict(&path).await;
        assert!(malformed.unwrap_err().to_string().contains("failed to parse"));
    }

    #[tokio::test]
    async fn load_bus_config_strict_parses_valid_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(CONFIG_FILE_NAME);
        tokio::fs::write(&path, r#"channel_prefix = "vnd.acme.events""#)
            .await
            .unwrap();
        let config = load_bus_config_strict(&path).await.unwrap();
        assert_eq!(config.channel_prefix, "vnd.acme.events");
        assert_eq!(config.transport, TransportKind::InMemory);
    }

    #[test]
    fn default_config_dir_ends_with_crate_name() {
        if let Some(dir) = default_config_dir() {
            assert!(dir.ends_with("stickybus"));
        }
    }
}
