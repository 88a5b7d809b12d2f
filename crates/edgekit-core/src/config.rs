use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(String),

    #[error("Failed to read config: {0}")]
    ReadError(String),

    #[error("Failed to parse config: {0}")]
    ParseError(String),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Main configuration for edgekit
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct EdgeKitConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub http: HttpConfig,

    #[serde(default)]
    pub mqtt: MqttConfig,

    #[serde(default)]
    pub tedge: TedgeConfig,

    #[serde(default)]
    pub mongo: MongoConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Compact,
    Json,
    /// `KEY=value` lines readable by journald
    Journal,
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "compact" => Ok(LogFormat::Compact),
            "json" => Ok(LogFormat::Json),
            "journal" => Ok(LogFormat::Journal),
            other => Err(ConfigError::ValidationError(format!(
                "Invalid log format: {}. Must be one of: pretty, compact, json, journal",
                other
            ))),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogFormat::Pretty => "pretty",
            LogFormat::Compact => "compact",
            LogFormat::Json => "json",
            LogFormat::Journal => "journal",
        };
        f.write_str(s)
    }
}

/// HTTP client configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HttpConfig {
    /// Whole-request timeout in seconds
    #[serde(default = "default_http_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_http_timeout_secs(),
        }
    }
}

/// MQTT client configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MqttConfig {
    /// Broker address: "tcp://host:port", "mqtt://host:port" or "host:port"
    #[serde(default = "default_broker_url")]
    pub broker_url: String,

    #[serde(default = "default_client_id")]
    pub client_id: String,

    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_keep_alive_secs")]
    pub keep_alive_secs: u64,

    #[serde(default = "default_true")]
    pub clean_session: bool,

    /// Capacity of the request channel between client handle and event loop
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// Grace period for the event loop to flush DISCONNECT
    #[serde(default = "default_disconnect_timeout_ms")]
    pub disconnect_timeout_ms: u64,

    /// How long `subscribe` and QoS 1/2 `publish` wait for the broker's ack
    #[serde(default = "default_ack_timeout_secs")]
    pub ack_timeout_secs: u64,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            broker_url: default_broker_url(),
            client_id: default_client_id(),
            connect_timeout_secs: default_connect_timeout_secs(),
            keep_alive_secs: default_keep_alive_secs(),
            clean_session: true,
            channel_capacity: default_channel_capacity(),
            disconnect_timeout_ms: default_disconnect_timeout_ms(),
            ack_timeout_secs: default_ack_timeout_secs(),
        }
    }
}

/// thin-edge.io publisher configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TedgeConfig {
    /// Local thin-edge broker
    #[serde(default = "default_broker_url")]
    pub broker_url: String,

    #[serde(default = "default_device_id")]
    pub device_id: String,

    #[serde(default = "default_client_id_prefix")]
    pub client_id_prefix: String,
}

impl Default for TedgeConfig {
    fn default() -> Self {
        Self {
            broker_url: default_broker_url(),
            device_id: default_device_id(),
            client_id_prefix: default_client_id_prefix(),
        }
    }
}

impl TedgeConfig {
    pub fn client_id(&self) -> String {
        format!("{}{}", self.client_id_prefix, self.device_id)
    }

    /// MQTT settings used to reach the local thin-edge broker
    pub fn mqtt(&self) -> MqttConfig {
        MqttConfig {
            broker_url: self.broker_url.clone(),
            client_id: self.client_id(),
            clean_session: true,
            ..MqttConfig::default()
        }
    }
}

/// MongoDB document store configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MongoConfig {
    #[serde(default = "default_mongo_uri")]
    pub uri: String,

    #[serde(default = "default_mongo_database")]
    pub database: String,

    #[serde(default = "default_mongo_collection")]
    pub collection: String,

    #[serde(default = "default_mongo_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Insert, update, delete and disconnect
    #[serde(default = "default_mongo_write_timeout_secs")]
    pub write_timeout_secs: u64,

    /// Find, including draining the cursor
    #[serde(default = "default_mongo_query_timeout_secs")]
    pub query_timeout_secs: u64,
}

impl Default for MongoConfig {
    fn default() -> Self {
        Self {
            uri: default_mongo_uri(),
            database: default_mongo_database(),
            collection: default_mongo_collection(),
            connect_timeout_secs: default_mongo_connect_timeout_secs(),
            write_timeout_secs: default_mongo_write_timeout_secs(),
            query_timeout_secs: default_mongo_query_timeout_secs(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
fn default_http_timeout_secs() -> u64 {
    10
}
fn default_broker_url() -> String {
    "tcp://localhost:1883".to_string()
}
fn default_client_id() -> String {
    "edgekit".to_string()
}
fn default_connect_timeout_secs() -> u64 {
    5
}
fn default_keep_alive_secs() -> u64 {
    30
}
fn default_true() -> bool {
    true
}
fn default_channel_capacity() -> usize {
    64
}
fn default_disconnect_timeout_ms() -> u64 {
    250
}
fn default_ack_timeout_secs() -> u64 {
    10
}
fn default_device_id() -> String {
    "main".to_string()
}
fn default_client_id_prefix() -> String {
    "tedge-util-".to_string()
}
fn default_mongo_uri() -> String {
    "mongodb://localhost:27017".to_string()
}
fn default_mongo_database() -> String {
    "edgekit".to_string()
}
fn default_mongo_collection() -> String {
    "documents".to_string()
}
fn default_mongo_connect_timeout_secs() -> u64 {
    10
}
fn default_mongo_write_timeout_secs() -> u64 {
    5
}
fn default_mongo_query_timeout_secs() -> u64 {
    10
}

/// Configuration manager
pub struct ConfigManager {
    config: EdgeKitConfig,
    config_path: Option<PathBuf>,
}

impl ConfigManager {
    /// Load configuration with the following precedence:
    /// 1. Environment variables (.env file)
    /// 2. Config file (.edgekit.toml)
    /// 3. Defaults
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_dotenv();

        let (config, config_path) = Self::load_config_file()?;
        let config = Self::apply_env_overrides(config)?;
        Self::validate_config(&config)?;

        match config_path {
            Some(ref path) => info!("Loaded edgekit configuration from {}", path.display()),
            None => info!("Loaded edgekit configuration from defaults"),
        }

        Ok(Self {
            config,
            config_path,
        })
    }

    /// Load a specific TOML file, then apply environment overrides.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        let config = Self::read_toml_file(path)?;
        let config = Self::apply_env_overrides(config)?;
        Self::validate_config(&config)?;

        Ok(Self {
            config,
            config_path: Some(path.to_path_buf()),
        })
    }

    fn load_dotenv() {
        if Path::new(".env").exists() {
            if let Err(e) = dotenv::from_filename(".env") {
                warn!("Failed to load .env file: {}", e);
            } else {
                debug!("Loaded .env file from current directory");
            }
            return;
        }

        if let Some(home) = dirs::home_dir() {
            let home_env = home.join(".edgekit.env");
            if home_env.exists() {
                if let Err(e) = dotenv::from_path(&home_env) {
                    warn!("Failed to load .edgekit.env: {}", e);
                } else {
                    debug!("Loaded .edgekit.env from home directory");
                }
            }
        }
    }

    /// Search order:
    /// 1. ./.edgekit.toml
    /// 2. ~/.edgekit/config.toml
    fn load_config_file() -> Result<(EdgeKitConfig, Option<PathBuf>), ConfigError> {
        let local_config = Path::new(".edgekit.toml");
        if local_config.exists() {
            let config = Self::read_toml_file(local_config)?;
            return Ok((config, Some(local_config.to_path_buf())));
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".edgekit").join("config.toml");
            if user_config.exists() {
                let config = Self::read_toml_file(&user_config)?;
                return Ok((config, Some(user_config)));
            }
        }

        debug!("No config file found, using defaults");
        Ok((EdgeKitConfig::default(), None))
    }

    fn read_toml_file(path: &Path) -> Result<EdgeKitConfig, ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError(e.to_string()))?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    fn apply_env_overrides(mut config: EdgeKitConfig) -> Result<EdgeKitConfig, ConfigError> {
        // RUST_LOG is left to the EnvFilter, it may hold per-target directives.
        if let Ok(level) = std::env::var("EDGEKIT_LOG_LEVEL") {
            config.logging.level = level;
        }
        if let Ok(format) = std::env::var("EDGEKIT_LOG_FORMAT") {
            config.logging.format = format.parse()?;
        }
        if let Ok(timeout) = std::env::var("EDGEKIT_HTTP_TIMEOUT_SECS") {
            config.http.timeout_secs = timeout.parse().map_err(|_| {
                ConfigError::ValidationError(format!(
                    "EDGEKIT_HTTP_TIMEOUT_SECS is not a number: {}",
                    timeout
                ))
            })?;
        }
        if let Ok(url) = std::env::var("EDGEKIT_MQTT_BROKER_URL") {
            config.mqtt.broker_url = url;
        }
        if let Ok(id) = std::env::var("EDGEKIT_MQTT_CLIENT_ID") {
            config.mqtt.client_id = id;
        }
        if let Ok(device) = std::env::var("EDGEKIT_TEDGE_DEVICE_ID") {
            config.tedge.device_id = device;
        }
        if let Ok(url) = std::env::var("EDGEKIT_TEDGE_BROKER_URL") {
            config.tedge.broker_url = url;
        }
        if let Ok(uri) = std::env::var("EDGEKIT_MONGO_URI") {
            config.mongo.uri = uri;
        }
        if let Ok(database) = std::env::var("EDGEKIT_MONGO_DATABASE") {
            config.mongo.database = database;
        }
        if let Ok(collection) = std::env::var("EDGEKIT_MONGO_COLLECTION") {
            config.mongo.collection = collection;
        }

        Ok(config)
    }

    fn validate_config(config: &EdgeKitConfig) -> Result<(), ConfigError> {
        match config.logging.level.to_ascii_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => {
                return Err(ConfigError::ValidationError(format!(
                    "Invalid log level: {}. Must be one of: trace, debug, info, warn, error",
                    other
                )))
            }
        }

        if config.http.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "http.timeout_secs must be greater than zero".to_string(),
            ));
        }
        if config.mqtt.connect_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "mqtt.connect_timeout_secs must be greater than zero".to_string(),
            ));
        }
        if config.mqtt.client_id.is_empty() {
            return Err(ConfigError::ValidationError(
                "mqtt.client_id must not be empty".to_string(),
            ));
        }
        if config.mqtt.ack_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "mqtt.ack_timeout_secs must be greater than zero".to_string(),
            ));
        }
        if config.tedge.device_id.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "tedge.device_id must not be empty".to_string(),
            ));
        }
        if config.mongo.database.is_empty() || config.mongo.collection.is_empty() {
            return Err(ConfigError::ValidationError(
                "mongo.database and mongo.collection must not be empty".to_string(),
            ));
        }
        let mongo = &config.mongo;
        if mongo.connect_timeout_secs == 0
            || mongo.write_timeout_secs == 0
            || mongo.query_timeout_secs == 0
        {
            return Err(ConfigError::ValidationError(
                "mongo timeouts must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    pub fn config(&self) -> &EdgeKitConfig {
        &self.config
    }

    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    /// Write the default configuration as TOML
    pub fn create_default_config(path: &Path) -> Result<(), ConfigError> {
        let config = EdgeKitConfig::default();
        let toml_str =
            toml::to_string_pretty(&config).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::ReadError(e.to_string()))?;
        }

        std::fs::write(path, toml_str).map_err(|e| ConfigError::ReadError(e.to_string()))?;

        Ok(())
    }
}
