use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::models::TaggerOptions;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub engine: EngineSettings,
    /// Default options per tagger name, e.g. `[taggers.Political]`.
    #[serde(default)]
    pub taggers: BTreeMap<String, TaggerOptions>,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub dbname: String,
    pub user: String,
    #[serde(default)]
    pub password: String,
    /// TCP host. Absent means a local Unix-socket connection.
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default = "default_socket_dir")]
    pub socket_dir: PathBuf,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

fn default_socket_dir() -> PathBuf {
    PathBuf::from("/var/run/postgresql")
}
fn default_max_connections() -> u32 {
    5
}
fn default_connect_timeout_secs() -> u64 {
    10
}

#[derive(Debug, Deserialize, Clone)]
pub struct EngineSettings {
    #[serde(default = "default_area_limit")]
    pub area_limit: f64,
    #[serde(default)]
    pub provider_timeout_secs: Option<u64>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            area_limit: DEFAULT_AREA_LIMIT,
            provider_timeout_secs: None,
        }
    }
}

/// Footprint area (km²) above which taggers skip fine-grained lookups.
pub const DEFAULT_AREA_LIMIT: f64 = 9.0;

fn default_area_limit() -> f64 {
    DEFAULT_AREA_LIMIT
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct CacheConfig {
    /// Cache directory. Absent disables caching.
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7331".to_string()
}

/// Immutable engine configuration shared by every tagger of a request.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub area_limit: f64,
    /// Per-tagger deadline; an expired tagger contributes nothing.
    pub provider_timeout: Option<Duration>,
    /// Default options per tagger name, overlaid by request options.
    pub tagger_defaults: BTreeMap<String, TaggerOptions>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            area_limit: DEFAULT_AREA_LIMIT,
            provider_timeout: None,
            tagger_defaults: BTreeMap::new(),
        }
    }
}

impl EngineConfig {
    pub fn with_area_limit(mut self, area_limit: f64) -> Self {
        self.area_limit = area_limit;
        self
    }

    pub fn with_provider_timeout(mut self, timeout: Duration) -> Self {
        self.provider_timeout = Some(timeout);
        self
    }

    pub fn with_tagger_defaults(mut self, name: impl Into<String>, options: TaggerOptions) -> Self {
        self.tagger_defaults.insert(name.into(), options);
        self
    }

    /// Effective options for a tagger: configured defaults, then request
    /// options on top (shallow, request keys win).
    ///
    /// Defaults are looked up by exact name first, then case-insensitively.
    pub fn options_for(&self, name: &str, request: &TaggerOptions) -> TaggerOptions {
        let defaults = self.tagger_defaults.get(name).or_else(|| {
            self.tagger_defaults
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v)
        });

        let mut options = defaults.cloned().unwrap_or_default();
        for (key, value) in request {
            options.insert(key.clone(), value.clone());
        }
        options
    }
}

impl From<&Config> for EngineConfig {
    fn from(config: &Config) -> Self {
        Self {
            area_limit: config.engine.area_limit,
            provider_timeout: config.engine.provider_timeout_secs.map(Duration::from_secs),
            tagger_defaults: config.taggers.clone(),
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_config(&content)
}

pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;

    // Validate database
    if config.database.dbname.trim().is_empty() {
        anyhow::bail!("database.dbname must not be empty");
    }
    if config.database.user.trim().is_empty() {
        anyhow::bail!("database.user must not be empty");
    }
    if config.database.max_connections == 0 {
        anyhow::bail!("database.max_connections must be >= 1");
    }

    // Validate engine
    if !config.engine.area_limit.is_finite() || config.engine.area_limit <= 0.0 {
        anyhow::bail!("engine.area_limit must be a positive number");
    }
    if config.engine.provider_timeout_secs == Some(0) {
        anyhow::bail!("engine.provider_timeout_secs must be > 0 when set");
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const MINIMAL: &str = r#"
[database]
dbname = "geotagger"
user = "reader"
"#;

    #[test]
    fn test_minimal_config_defaults() {
        let cfg = parse_config(MINIMAL).unwrap();
        assert_eq!(cfg.engine.area_limit, DEFAULT_AREA_LIMIT);
        assert!(cfg.engine.provider_timeout_secs.is_none());
        assert!(cfg.database.host.is_none());
        assert_eq!(cfg.database.max_connections, 5);
        assert!(cfg.cache.dir.is_none());
        assert_eq!(cfg.server.bind, "127.0.0.1:7331");
    }

    #[test]
    fn test_full_config() {
        let cfg = parse_config(
            r#"
[database]
dbname = "geotagger"
user = "reader"
password = "pw"
host = "db.internal"
port = 6432

[engine]
area_limit = 250.0
provider_timeout_secs = 15

[taggers.Political]
toponyms = false

[cache]
dir = "/tmp/geotag-cache"

[server]
bind = "0.0.0.0:8080"
"#,
        )
        .unwrap();

        assert_eq!(cfg.database.port, Some(6432));
        let engine = EngineConfig::from(&cfg);
        assert_eq!(engine.area_limit, 250.0);
        assert_eq!(engine.provider_timeout, Some(Duration::from_secs(15)));
        assert_eq!(engine.tagger_defaults["Political"]["toponyms"], json!(false));
    }

    #[test]
    fn test_rejects_bad_values() {
        let bad_area = format!("{}\n[engine]\narea_limit = -1.0\n", MINIMAL);
        assert!(parse_config(&bad_area).is_err());

        let bad_timeout = format!("{}\n[engine]\nprovider_timeout_secs = 0\n", MINIMAL);
        assert!(parse_config(&bad_timeout).is_err());

        assert!(parse_config("[database]\ndbname = \"\"\nuser = \"u\"\n").is_err());
        assert!(parse_config("[engine]\narea_limit = 3.0\n").is_err());
    }

    #[test]
    fn test_request_options_override_defaults() {
        let defaults = json!({"toponyms": true, "limit": 10}).as_object().cloned().unwrap();
        let engine = EngineConfig::default().with_tagger_defaults("Political", defaults);

        let request = json!({"limit": 3}).as_object().cloned().unwrap();
        let merged = engine.options_for("political", &request);
        assert_eq!(merged["toponyms"], json!(true));
        assert_eq!(merged["limit"], json!(3));

        assert!(engine.options_for("Geology", &TaggerOptions::new()).is_empty());
    }

    #[test]
    fn test_load_config_missing_file() {
        let err = load_config(Path::new("/nonexistent/geotag.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
