use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::IpAddr;
use std::time::Duration;

use super::errors::ConfigError;
use crate::ip_family::parse_ips;

/// Overlay resolver configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ResolverConfig {
    /// How long to wait for the resolver to become ready (0 = no limit)
    #[serde(default)]
    pub start_timeout_seconds: u64,

    #[serde(default)]
    pub kubernetes: Option<KubernetesConfig>,

    #[serde(default, rename = "static")]
    pub static_mappings: Option<StaticResolverConfig>,
}

/// Watch-based resolver over Kubernetes Services and operator Secrets
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct KubernetesConfig {
    /// Full relist interval for the watches (0 = never)
    #[serde(default)]
    pub informer_resync_period_seconds: u64,

    /// Namespace holding the operator's device Secrets (empty = all namespaces)
    #[serde(default)]
    pub tailscale_operator_namespace: String,
}

impl KubernetesConfig {
    pub fn resync_period(&self) -> Option<Duration> {
        (self.informer_resync_period_seconds > 0)
            .then(|| Duration::from_secs(self.informer_resync_period_seconds))
    }

    pub fn operator_namespace(&self) -> Option<&str> {
        let ns = self.tailscale_operator_namespace.trim();
        (!ns.is_empty()).then_some(ns)
    }
}

/// Fixed external → overlay address mappings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StaticResolverConfig {
    #[serde(default)]
    pub mappings: BTreeMap<String, Vec<String>>,
}

impl StaticResolverConfig {
    pub fn parsed_mappings(&self) -> Result<Vec<(IpAddr, Vec<IpAddr>)>, ConfigError> {
        self.mappings
            .iter()
            .map(|(external, overlay)| {
                let external = external
                    .trim()
                    .parse::<IpAddr>()
                    .map(|ip| ip.to_canonical())
                    .map_err(|_| {
                        ConfigError::Validation(format!(
                            "Invalid static mapping key '{}'",
                            external
                        ))
                    })?;
                let overlay = parse_ips(overlay).map_err(|e| {
                    ConfigError::Validation(format!(
                        "Invalid static mapping for {}: {}",
                        external, e
                    ))
                })?;
                Ok((external, overlay))
            })
            .collect()
    }
}

/// The resolver backend selected by configuration.
#[derive(Debug, Clone, Copy)]
pub enum ResolverBackend<'a> {
    Kubernetes(&'a KubernetesConfig),
    Static(&'a StaticResolverConfig),
}

impl ResolverConfig {
    pub fn start_timeout(&self) -> Duration {
        Duration::from_secs(self.start_timeout_seconds)
    }

    /// Kubernetes takes precedence when both backends are configured.
    pub fn backend(&self) -> Result<ResolverBackend<'_>, ConfigError> {
        if let Some(kubernetes) = &self.kubernetes {
            return Ok(ResolverBackend::Kubernetes(kubernetes));
        }
        if let Some(mappings) = &self.static_mappings {
            return Ok(ResolverBackend::Static(mappings));
        }
        Err(ConfigError::Validation(
            "No resolvers specified in resolver config".to_string(),
        ))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let ResolverBackend::Static(mappings) = self.backend()? {
            mappings.parsed_mappings()?;
        }
        Ok(())
    }
}
