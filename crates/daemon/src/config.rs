//! Daemon configuration
//!
//! Optional TOML file layered under `INGESTFLOW__SECTION__KEY` environment
//! overrides. Paths may start with `~`.

use anyhow::{bail, Context, Result};
use config::{Config, Environment, File};
use ingestflow_api_rpc::server::{DEFAULT_RPC_HOST, DEFAULT_RPC_PORT};
use ingestflow_core::application::constants::{
    DEFAULT_AUTO_INGEST_POLL_INTERVAL, DEFAULT_MAX_CONCURRENT_ENQUEUES,
    DEFAULT_UNLOCK_MAX_RETRIES, DEFAULT_UNLOCK_POLL_INTERVAL, DEFAULT_WORKER_POOL_SIZE,
};
use ingestflow_core::application::{
    AreaConfig, AreaKind, AuthorizationSettings, IngestSettings,
};
use ingestflow_infra_http::RemoteSettings;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_PATH: &str = "~/.ingestflow/config.toml";
const DEFAULT_DB_PATH: &str = "~/.ingestflow/audit.db";
const ENV_PREFIX: &str = "INGESTFLOW";
const ENV_SEPARATOR: &str = "__";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    pub database: DatabaseConfig,
    pub rpc: RpcConfig,
    pub logging: LoggingConfig,
    pub telemetry: TelemetryConfig,
    pub ingest: IngestConfig,
    pub areas: AreasConfig,
    pub remote: RemoteConfig,
    pub validator: ValidatorConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: DEFAULT_DB_PATH.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RpcConfig {
    pub host: String,
    pub port: u16,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_RPC_HOST.to_string(),
            port: DEFAULT_RPC_PORT,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub format: LogFormat,
    /// Daily rolling log files are written here when set
    pub directory: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub otlp_endpoint: Option<String>,
    pub service_name: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            otlp_endpoint: None,
            service_name: "ingest-flow".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    pub worker_pool_size: usize,
    pub max_concurrent_enqueues: usize,
    pub unlock_poll_interval_ms: u64,
    pub unlock_max_retries: u32,
    pub collection: String,
    pub authorization: AuthorizationConfig,
    pub allowed_licenses: Vec<String>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            worker_pool_size: DEFAULT_WORKER_POOL_SIZE,
            max_concurrent_enqueues: DEFAULT_MAX_CONCURRENT_ENQUEUES,
            unlock_poll_interval_ms: DEFAULT_UNLOCK_POLL_INTERVAL.as_millis() as u64,
            unlock_max_retries: DEFAULT_UNLOCK_MAX_RETRIES,
            collection: IngestSettings::default().collection,
            authorization: AuthorizationConfig::default(),
            allowed_licenses: vec![],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthorizationConfig {
    pub enabled: bool,
    pub create_role: String,
    pub update_role: String,
}

impl Default for AuthorizationConfig {
    fn default() -> Self {
        let defaults = AuthorizationSettings::default();
        Self {
            enabled: defaults.enabled,
            create_role: defaults.create_role,
            update_role: defaults.update_role,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AreasConfig {
    pub import: Option<AreaSection>,
    pub migration: Option<AreaSection>,
    pub auto_ingest: Option<AutoIngestSection>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AreaSection {
    pub inbox: String,
    pub outbox: String,
    #[serde(default = "default_publish")]
    pub publish: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AutoIngestSection {
    pub inbox: String,
    pub outbox: String,
    #[serde(default = "default_publish")]
    pub publish: bool,
    #[serde(default = "default_auto_ingest_poll_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_publish() -> bool {
    true
}

fn default_enabled() -> bool {
    true
}

fn default_auto_ingest_poll_ms() -> u64 {
    DEFAULT_AUTO_INGEST_POLL_INTERVAL.as_millis() as u64
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    pub sword_token_field: String,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            api_key: None,
            timeout_secs: 30,
            sword_token_field: "dansSwordToken".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:20330".to_string(),
            timeout_secs: 60,
        }
    }
}

/// Expand a leading `~` in a configured path
pub fn expand_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).into_owned())
}

impl DaemonConfig {
    /// Load from `path` (or the default location) and the process environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from(path, true, None),
            None => Self::load_from(&expand_path(DEFAULT_CONFIG_PATH), false, None),
        }
    }

    /// Load `file` layered under the environment; `env` replaces the process
    /// environment when given
    pub fn load_from(
        file: &Path,
        required: bool,
        env: Option<HashMap<String, String>>,
    ) -> Result<Self> {
        let settings = Config::builder()
            .add_source(File::from(file).required(required))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator(ENV_SEPARATOR)
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("ingest.allowed_licenses")
                    .source(env),
            )
            .build()
            .with_context(|| format!("Failed to read configuration {}", file.display()))?;

        let config: DaemonConfig = settings
            .try_deserialize()
            .context("Invalid configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the daemon cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.ingest.worker_pool_size == 0 {
            bail!("ingest.worker_pool_size must be at least 1");
        }
        if self.ingest.max_concurrent_enqueues == 0 {
            bail!("ingest.max_concurrent_enqueues must be at least 1");
        }
        if self.ingest.unlock_max_retries == 0 {
            bail!("ingest.unlock_max_retries must be at least 1");
        }
        if self.ingest.collection.trim().is_empty() {
            bail!("ingest.collection must not be empty");
        }
        if let Some(auto) = &self.areas.auto_ingest {
            if auto.poll_interval_ms == 0 {
                bail!("areas.auto_ingest.poll_interval_ms must be positive");
            }
        }
        for (name, url) in [
            ("remote.base_url", &self.remote.base_url),
            ("validator.base_url", &self.validator.base_url),
        ] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                bail!("{} must be an http(s) URL, got '{}'", name, url);
            }
        }

        let areas = self.area_configs();
        for area in &areas {
            for (what, path) in [("inbox", &area.inbox), ("outbox", &area.outbox)] {
                if !path.is_absolute() {
                    bail!("areas.{}.{} must be an absolute path", area.kind, what);
                }
            }
            if area.inbox == area.outbox
                || area.outbox.starts_with(&area.inbox)
                || area.inbox.starts_with(&area.outbox)
            {
                bail!(
                    "areas.{}: inbox and outbox must be distinct, non-nested directories",
                    area.kind
                );
            }
        }
        for (i, a) in areas.iter().enumerate() {
            if let Some(b) = areas[i + 1..].iter().find(|b| b.inbox == a.inbox) {
                bail!("areas.{} and areas.{} share the inbox {}", a.kind, b.kind, a.inbox.display());
            }
        }
        Ok(())
    }

    pub fn database_path(&self) -> PathBuf {
        expand_path(&self.database.path)
    }

    /// Configured areas; a disabled auto-ingest area is left out
    pub fn area_configs(&self) -> Vec<AreaConfig> {
        let mut areas = Vec::new();
        for (kind, section) in [
            (AreaKind::Import, &self.areas.import),
            (AreaKind::Migration, &self.areas.migration),
        ] {
            if let Some(section) = section {
                areas.push(AreaConfig {
                    kind,
                    inbox: expand_path(&section.inbox),
                    outbox: expand_path(&section.outbox),
                    publish: section.publish,
                });
            }
        }
        if let Some(auto) = self.areas.auto_ingest.as_ref().filter(|a| a.enabled) {
            areas.push(AreaConfig {
                kind: AreaKind::AutoIngest,
                inbox: expand_path(&auto.inbox),
                outbox: expand_path(&auto.outbox),
                publish: auto.publish,
            });
        }
        areas
    }

    pub fn auto_ingest_poll_interval(&self) -> Duration {
        self.areas
            .auto_ingest
            .as_ref()
            .map(|a| Duration::from_millis(a.poll_interval_ms))
            .unwrap_or(DEFAULT_AUTO_INGEST_POLL_INTERVAL)
    }

    pub fn ingest_settings(&self) -> IngestSettings {
        IngestSettings {
            collection: self.ingest.collection.clone(),
            authorization: AuthorizationSettings {
                enabled: self.ingest.authorization.enabled,
                create_role: self.ingest.authorization.create_role.clone(),
                update_role: self.ingest.authorization.update_role.clone(),
            },
            allowed_licenses: self.ingest.allowed_licenses.clone(),
            unlock_poll_interval: Duration::from_millis(self.ingest.unlock_poll_interval_ms),
            unlock_max_retries: self.ingest.unlock_max_retries,
        }
    }

    pub fn remote_settings(&self) -> RemoteSettings {
        RemoteSettings {
            base_url: self.remote.base_url.clone(),
            api_key: self.remote.api_key.clone(),
            timeout: Duration::from_secs(self.remote.timeout_secs),
            sword_token_field: self.remote.sword_token_field.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;
    use tokio_test::assert_ok;

    const CONFIG: &str = r#"
[database]
path = "/var/lib/ingestflow/audit.db"

[ingest]
worker_pool_size = 8
collection = "dans"
allowed_licenses = ["CC0-1.0", "CC-BY-4.0"]

[ingest.authorization]
enabled = true

[areas.import]
inbox = "/data/import/inbox"
outbox = "/data/import/outbox"

[areas.migration]
inbox = "/data/migration/inbox"
outbox = "/data/migration/outbox"
publish = false

[areas.auto_ingest]
inbox = "/data/auto/inbox"
outbox = "/data/auto/outbox"
poll_interval_ms = 250

[remote]
base_url = "https://dataverse.example.org"
api_key = "secret"
"#;

    fn write_config(content: &str) -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, content).unwrap();
        (dir, path)
    }

    fn load(content: &str, env: &[(&str, &str)]) -> Result<DaemonConfig> {
        let (_dir, path) = write_config(content);
        let env = env
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        DaemonConfig::load_from(&path, true, Some(env))
    }

    #[test]
    fn test_defaults_without_file() {
        let dir = TempDir::new().unwrap();
        let config = assert_ok!(DaemonConfig::load_from(
            &dir.path().join("missing.toml"),
            false,
            Some(HashMap::new()),
        ));
        assert_eq!(config.ingest.worker_pool_size, DEFAULT_WORKER_POOL_SIZE);
        assert_eq!(config.rpc.port, DEFAULT_RPC_PORT);
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert!(config.area_configs().is_empty());
    }

    #[test]
    fn test_file_values_are_read() {
        let config = assert_ok!(load(CONFIG, &[]));

        assert_eq!(config.ingest.worker_pool_size, 8);
        assert_eq!(config.database_path(), PathBuf::from("/var/lib/ingestflow/audit.db"));

        let settings = config.ingest_settings();
        assert_eq!(settings.collection, "dans");
        assert!(settings.authorization.enabled);
        assert_eq!(settings.authorization.create_role, "dsContributor");
        assert_eq!(settings.allowed_licenses, vec!["CC0-1.0", "CC-BY-4.0"]);

        let areas = config.area_configs();
        assert_eq!(areas.len(), 3);
        assert!(areas[0].publish);
        assert!(!areas[1].publish);
        assert_eq!(areas[2].kind, AreaKind::AutoIngest);
        assert_eq!(config.auto_ingest_poll_interval(), Duration::from_millis(250));
    }

    #[test]
    fn test_environment_overrides_file() {
        let config = assert_ok!(load(
            CONFIG,
            &[
                ("INGESTFLOW__INGEST__WORKER_POOL_SIZE", "2"),
                ("INGESTFLOW__LOGGING__FORMAT", "json"),
                ("INGESTFLOW__INGEST__ALLOWED_LICENSES", "MIT,CC0-1.0"),
            ],
        ));
        assert_eq!(config.ingest.worker_pool_size, 2);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.ingest.allowed_licenses, vec!["MIT", "CC0-1.0"]);
    }

    #[test]
    fn test_zero_pool_size_is_rejected() {
        let err = load(CONFIG, &[("INGESTFLOW__INGEST__WORKER_POOL_SIZE", "0")]).unwrap_err();
        assert!(err.to_string().contains("worker_pool_size"));
    }

    #[test]
    fn test_nested_outbox_is_rejected() {
        let err = load(
            "[areas.import]\ninbox = \"/data/in\"\noutbox = \"/data/in/out\"\n",
            &[],
        )
        .unwrap_err();
        assert!(err.to_string().contains("distinct"));
    }

    #[test]
    fn test_relative_inbox_is_rejected() {
        let err = load(
            "[areas.import]\ninbox = \"data/in\"\noutbox = \"/data/out\"\n",
            &[],
        )
        .unwrap_err();
        assert!(err.to_string().contains("absolute"));
    }

    #[test]
    fn test_shared_inbox_is_rejected() {
        let err = load(
            "[areas.import]\ninbox = \"/data/in\"\noutbox = \"/data/out-a\"\n\
             [areas.migration]\ninbox = \"/data/in\"\noutbox = \"/data/out-b\"\n",
            &[],
        )
        .unwrap_err();
        assert!(err.to_string().contains("share the inbox"));
    }

    #[test]
    fn test_disabled_auto_ingest_is_left_out() {
        let config = assert_ok!(load(
            "[areas.auto_ingest]\ninbox = \"/a/in\"\noutbox = \"/a/out\"\nenabled = false\n",
            &[],
        ));
        assert!(config.area_configs().is_empty());
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let result = DaemonConfig::load_from(
            Path::new("/nonexistent/ingestflow.toml"),
            true,
            Some(HashMap::new()),
        );
        assert!(result.is_err());
    }
}
