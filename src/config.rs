use crate::error::{AnalystError, Result};
use serde::Deserialize;
use std::fs;
use tracing::warn;

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    pub data: DataConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Directory the three feed files are read from.
    pub dir: String,
    pub enrollment_file: String,
    pub biometric_file: String,
    pub demographic_file: String,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            dir: ".".to_string(),
            enrollment_file: "Enrollment_Data.csv".to_string(),
            biometric_file: "Biometric_Data.csv".to_string(),
            demographic_file: "Demographic_Data.csv".to_string(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 8000 }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data: DataConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = "config.toml";
        let config_content = fs::read_to_string(config_path).map_err(|e| {
            AnalystError::Config(format!(
                "Failed to read config file '{}': {}",
                config_path, e
            ))
        })?;

        let config: Config = toml::from_str(&config_content)?;
        Ok(config)
    }

    /// Loads `config.toml`, falling back to defaults when it is absent or invalid.
    /// The platform must come up even with no configuration on disk.
    pub fn load_or_default() -> Self {
        match Self::load() {
            Ok(config) => config,
            Err(e) => {
                warn!("Using default configuration: {}", e);
                Config::default()
            }
        }
    }

    /// Effective server port: the PORT environment variable wins over the file,
    /// for cloud deployments that inject it.
    pub fn effective_port(&self) -> u16 {
        std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(self.server.port)
    }
}
