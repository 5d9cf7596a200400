use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use schemars::{schema_for, JsonSchema};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use thiserror::Error;

use super::logging::LoggingConfig;
use super::spotify::SpotifyConfig;

/// Prefix for environment overrides, nested with `__`
/// (e.g. `NOWPLAYING_SPOTIFY__CLIENT_ID`).
pub const ENV_PREFIX: &str = "NOWPLAYING_";

/// A top-level enum for versioned configurations.
#[derive(Deserialize, Serialize, JsonSchema)]
#[serde(tag = "version")]
pub enum Config {
    #[serde(rename = "1.0.0")]
    ConfigV1(ConfigV1),
}

/// Main config for v1.0.0.
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
pub struct ConfigV1 {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default)]
    pub logging: LoggingConfig,
    pub spotify: SpotifyConfig,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0}")]
    Load(#[from] figment::Error),
    #[error("`{0}` must not be empty")]
    Empty(&'static str),
    #[error("`{0}` must be greater than zero")]
    NotPositive(&'static str),
    #[error("`{field}` is not a valid URL: {reason}")]
    InvalidUrl { field: &'static str, reason: String },
    #[error("`bind_address` '{0}' is not a socket address")]
    InvalidBindAddress(String),
    #[error("invalid logging.level '{0}'. Valid values: trace, debug, info, warn, error")]
    InvalidLogLevel(String),
}

impl ConfigV1 {
    /// Checks every field that would otherwise fail at request time.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.bind_address
            .parse::<SocketAddr>()
            .map_err(|_| ConfigError::InvalidBindAddress(self.bind_address.clone()))?;
        self.logging.level_filter()?;
        self.spotify.validate()
    }
}

/// The layered configuration sources, later ones overriding earlier ones:
/// defaults, `./config.yaml`, `NOWPLAYING_*`, then the conventional
/// `SPOTIFY_*` variables mapped onto the `spotify` section.
pub fn figment() -> Figment {
    Figment::new()
        .merge(Serialized::default("version", "1.0.0"))
        .merge(Yaml::file("./config.yaml"))
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
        .merge(Env::prefixed("SPOTIFY_").map(|key| format!("spotify.{}", key).into()))
}

/// Extracts and validates a config from the given sources.
pub fn load_config_from(figment: Figment) -> Result<ConfigV1, ConfigError> {
    let Config::ConfigV1(config) = figment.extract::<Config>()?;
    config.validate()?;
    Ok(config)
}

/// Load config from the default sources, exiting the process when it is unusable.
pub fn load_config() -> ConfigV1 {
    match load_config_from(figment()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {}", e);
            std::process::exit(1);
        }
    }
}

/// Print the JSON schema for the configuration to stdout.
pub fn print_schema() {
    let schema = schema_for!(Config);
    match serde_json::to_string_pretty(&schema) {
        Ok(rendered) => println!("{}", rendered),
        Err(e) => eprintln!("Error rendering configuration schema: {}", e),
    }
}

fn default_bind_address() -> String {
    "0.0.0.0:3000".to_string()
}
