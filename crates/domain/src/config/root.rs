use serde::{Deserialize, Serialize};

use super::env::apply_env_overrides;
use super::errors::ConfigError;
use super::logging::{LogFormat, LoggingConfig};
use super::proxy::ProxyConfig;
use super::resolver::ResolverConfig;

const CONFIG_SEARCH_PATHS: [&str; 2] = ["config.toml", "/etc/tsdnsproxy/config.toml"];

/// Main configuration structure for tsdns-proxy
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    /// Listener, upstreams and interception zones
    #[serde(default)]
    pub proxy: ProxyConfig,

    /// Overlay resolver backend
    #[serde(default)]
    pub resolver: ResolverConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from file, environment and CLI overrides
    ///
    /// File priority order:
    /// 1. Explicitly provided path
    /// 2. config.toml in current directory
    /// 3. /etc/tsdnsproxy/config.toml
    /// 4. Defaults only
    ///
    /// `TSDNSPROXY_*` variables are applied on top of the file, then CLI flags.
    pub fn load(path: Option<&str>, cli_overrides: CliOverrides) -> Result<Self, ConfigError> {
        let path = path.or_else(|| Self::get_config_path());
        let raw = match path {
            Some(path) => Self::read_table(path)?,
            None => toml::Table::new(),
        };
        let mut config = Self::from_table(raw, std::env::vars())?;
        config.apply_cli_overrides(cli_overrides);
        Ok(config)
    }

    /// Build a configuration from a raw table plus environment variables.
    pub fn from_table<I, K, V>(mut raw: toml::Table, env: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        apply_env_overrides(&mut raw, env)?;
        toml::Value::Table(raw)
            .try_into()
            .map_err(|e: toml::de::Error| ConfigError::Parse(e.to_string()))
    }

    fn read_table(path: &str) -> Result<toml::Table, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::FileRead(path.to_string(), e.to_string()))?;
        toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Apply command-line overrides to configuration
    fn apply_cli_overrides(&mut self, overrides: CliOverrides) {
        if let Some(listen) = overrides.listen_addr {
            self.proxy.listen_addr = listen;
        }
        if let Some(level) = overrides.log_level {
            self.logging.level = level;
        }
        if overrides.debug {
            self.logging.format = LogFormat::Pretty;
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.proxy.validate()?;
        self.resolver.validate()?;
        Ok(())
    }

    /// Get the path to the configuration file being used
    pub fn get_config_path() -> Option<&'static str> {
        CONFIG_SEARCH_PATHS
            .into_iter()
            .find(|p| std::path::Path::new(p).exists())
    }
}

/// Command-line overrides for configuration
#[derive(Debug, Default)]
pub struct CliOverrides {
    pub listen_addr: Option<String>,
    pub log_level: Option<String>,
    pub debug: bool,
}
