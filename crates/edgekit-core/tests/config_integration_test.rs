use edgekit_core::{ConfigError, ConfigManager, EdgeKitConfig, LogFormat};
use serial_test::serial;
use std::fs;
use tempfile::TempDir;

const OVERRIDES: &[&str] = &[
    "EDGEKIT_LOG_LEVEL",
    "EDGEKIT_LOG_FORMAT",
    "EDGEKIT_HTTP_TIMEOUT_SECS",
    "EDGEKIT_MQTT_BROKER_URL",
    "EDGEKIT_MQTT_CLIENT_ID",
    "EDGEKIT_TEDGE_DEVICE_ID",
    "EDGEKIT_TEDGE_BROKER_URL",
    "EDGEKIT_MONGO_URI",
    "EDGEKIT_MONGO_DATABASE",
    "EDGEKIT_MONGO_COLLECTION",
];

fn clear_overrides() {
    for key in OVERRIDES {
        std::env::remove_var(key);
    }
}

#[test]
#[serial]
fn test_default_config_file_round_trip() {
    clear_overrides();
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("nested").join("config.toml");

    ConfigManager::create_default_config(&config_path).unwrap();
    assert!(config_path.exists());

    let manager = ConfigManager::from_file(&config_path).unwrap();
    assert_eq!(manager.config(), &EdgeKitConfig::default());
    assert_eq!(manager.config_path(), Some(config_path.as_path()));
}

#[test]
#[serial]
fn test_file_values_and_env_overrides() {
    clear_overrides();
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("edgekit.toml");
    fs::write(
        &config_path,
        r#"
[logging]
level = "debug"
format = "compact"

[mqtt]
broker_url = "tcp://broker.local:1884"
client_id = "from-file"

[tedge]
device_id = "file-device"
"#,
    )
    .unwrap();

    let manager = ConfigManager::from_file(&config_path).unwrap();
    let config = manager.config();
    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.logging.format, LogFormat::Compact);
    assert_eq!(config.mqtt.broker_url, "tcp://broker.local:1884");
    assert_eq!(config.tedge.device_id, "file-device");
    assert_eq!(config.http.timeout_secs, 10);

    std::env::set_var("EDGEKIT_LOG_FORMAT", "journal");
    std::env::set_var("EDGEKIT_HTTP_TIMEOUT_SECS", "3");
    std::env::set_var("EDGEKIT_TEDGE_DEVICE_ID", "env-device");
    std::env::set_var("EDGEKIT_MONGO_URI", "mongodb://env-db:27017");
    std::env::set_var("EDGEKIT_MONGO_COLLECTION", "events");
    let manager = ConfigManager::from_file(&config_path).unwrap();
    clear_overrides();

    let config = manager.config();
    assert_eq!(config.logging.format, LogFormat::Journal);
    assert_eq!(config.http.timeout_secs, 3);
    assert_eq!(config.tedge.device_id, "env-device");
    assert_eq!(config.mqtt.client_id, "from-file");
    assert_eq!(config.mongo.uri, "mongodb://env-db:27017");
    assert_eq!(config.mongo.database, "edgekit");
    assert_eq!(config.mongo.collection, "events");
}

#[test]
#[serial]
fn test_invalid_env_override_is_rejected() {
    clear_overrides();
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("edgekit.toml");
    ConfigManager::create_default_config(&config_path).unwrap();

    std::env::set_var("EDGEKIT_HTTP_TIMEOUT_SECS", "soon");
    let result = ConfigManager::from_file(&config_path);
    clear_overrides();
    assert!(matches!(result, Err(ConfigError::ValidationError(_))));
}

#[test]
#[serial]
fn test_missing_and_malformed_files() {
    clear_overrides();
    let temp_dir = TempDir::new().unwrap();

    let missing = temp_dir.path().join("missing.toml");
    assert!(matches!(
        ConfigManager::from_file(&missing),
        Err(ConfigError::NotFound(_))
    ));

    let broken = temp_dir.path().join("broken.toml");
    fs::write(&broken, "[logging\nlevel = ").unwrap();
    assert!(matches!(
        ConfigManager::from_file(&broken),
        Err(ConfigError::ParseError(_))
    ));

    let invalid = temp_dir.path().join("invalid.toml");
    fs::write(&invalid, "[logging]\nlevel = \"verbose\"\n").unwrap();
    assert!(matches!(
        ConfigManager::from_file(&invalid),
        Err(ConfigError::ValidationError(_))
    ));
}
