pub mod codec;
pub mod config;
pub mod error;
pub mod fs;
pub mod logging;
pub mod shell;

pub use codec::JsonMap;
pub use config::{
    ConfigError, ConfigManager, EdgeKitConfig, HttpConfig, LogFormat, LoggingConfig, MongoConfig,
    MqttConfig, TedgeConfig,
};
pub use error::*;
pub use logging::{JournalFormat, LogLevel, Logger};
pub use shell::CommandOutput;
