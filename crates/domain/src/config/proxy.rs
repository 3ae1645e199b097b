use serde::{Deserialize, Deserializer, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

use super::errors::ConfigError;
use crate::upstream::{parse_listen_addr, UpstreamAddr};

/// Per-operation exchange timeout applied when a value is left at zero.
pub const DEFAULT_EXCHANGE_TIMEOUT: Duration = Duration::from_secs(2);

/// DNS listener and upstream forwarding configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProxyConfig {
    /// Address both UDP and TCP listeners bind (`host:port` or `:port`)
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Upstream resolvers, tried in order. Each entry is an IP address with an
    /// optional port (`1.1.1.1`, `1.1.1.1:53`, `[2606:4700::1111]:53`);
    /// hostnames such as `dns.google:53` are rejected.
    #[serde(default, deserialize_with = "string_or_list")]
    pub upstreams: Vec<String>,

    #[serde(default = "default_exchange_timeout_seconds")]
    pub upstream_dial_timeout_seconds: u64,

    #[serde(default = "default_exchange_timeout_seconds")]
    pub upstream_read_timeout_seconds: u64,

    #[serde(default = "default_exchange_timeout_seconds")]
    pub upstream_write_timeout_seconds: u64,

    /// Deadline shared by every upstream attempt of one query
    #[serde(default = "default_total_timeout_seconds")]
    pub upstream_total_timeout_seconds: u64,

    /// Zones whose address answers are rewritten to overlay addresses
    #[serde(default, deserialize_with = "string_or_list")]
    pub proxy_zones: Vec<String>,

    /// TTL of rewritten answers
    #[serde(default = "default_answer_ttl")]
    pub answer_ttl: u32,

    /// Idle time after which a client TCP connection is closed
    #[serde(default = "default_tcp_idle_timeout_seconds")]
    pub tcp_idle_timeout_seconds: u64,
}

fn default_listen_addr() -> String {
    "0.0.0.0:53".to_string()
}

fn default_exchange_timeout_seconds() -> u64 {
    DEFAULT_EXCHANGE_TIMEOUT.as_secs()
}

fn default_total_timeout_seconds() -> u64 {
    5
}

fn default_answer_ttl() -> u32 {
    300
}

fn default_tcp_idle_timeout_seconds() -> u64 {
    10
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            upstreams: Vec::new(),
            upstream_dial_timeout_seconds: default_exchange_timeout_seconds(),
            upstream_read_timeout_seconds: default_exchange_timeout_seconds(),
            upstream_write_timeout_seconds: default_exchange_timeout_seconds(),
            upstream_total_timeout_seconds: default_total_timeout_seconds(),
            proxy_zones: Vec::new(),
            answer_ttl: default_answer_ttl(),
            tcp_idle_timeout_seconds: default_tcp_idle_timeout_seconds(),
        }
    }
}

impl ProxyConfig {
    pub fn listen_socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        parse_listen_addr(&self.listen_addr).map_err(|_| {
            ConfigError::Validation(format!("Invalid listen_addr '{}'", self.listen_addr))
        })
    }

    pub fn upstream_addrs(&self) -> Result<Vec<UpstreamAddr>, ConfigError> {
        self.upstreams
            .iter()
            .map(|raw| {
                raw.parse::<UpstreamAddr>().map_err(|_| {
                    ConfigError::Validation(format!("Invalid upstream address '{}'", raw))
                })
            })
            .collect()
    }

    pub fn dial_timeout(&self) -> Duration {
        exchange_timeout(self.upstream_dial_timeout_seconds)
    }

    pub fn read_timeout(&self) -> Duration {
        exchange_timeout(self.upstream_read_timeout_seconds)
    }

    pub fn write_timeout(&self) -> Duration {
        exchange_timeout(self.upstream_write_timeout_seconds)
    }

    pub fn total_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_total_timeout_seconds)
    }

    pub fn tcp_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.tcp_idle_timeout_seconds.max(1))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.listen_socket_addr()?;

        if self.upstreams.is_empty() {
            return Err(ConfigError::Validation(
                "No upstream servers configured".to_string(),
            ));
        }
        self.upstream_addrs()?;

        if self.upstream_total_timeout_seconds == 0 {
            return Err(ConfigError::Validation(
                "upstream_total_timeout_seconds must be greater than 0".to_string(),
            ));
        }

        if let Some(zone) = self.proxy_zones.iter().find(|z| z.trim().is_empty()) {
            return Err(ConfigError::Validation(format!(
                "Empty proxy zone pattern '{}'",
                zone
            )));
        }

        Ok(())
    }
}

fn exchange_timeout(secs: u64) -> Duration {
    if secs == 0 {
        DEFAULT_EXCHANGE_TIMEOUT
    } else {
        Duration::from_secs(secs)
    }
}

/// Accepts a list or a single comma-separated string.
fn string_or_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(joined) => joined
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        OneOrMany::Many(list) => list,
    })
}
