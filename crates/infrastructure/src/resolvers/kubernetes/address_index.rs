use super::store::{object_key, IndexedStore};
use k8s_openapi::api::core::v1::{Secret, Service};
use kube::ResourceExt;
use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tsdns_proxy_domain::{parse_ips, DomainError};

pub const PARENT_RESOURCE_LABEL: &str = "tailscale.com/parent-resource";
pub const PARENT_RESOURCE_NS_LABEL: &str = "tailscale.com/parent-resource-ns";
pub const PARENT_RESOURCE_TYPE_LABEL: &str = "tailscale.com/parent-resource-type";
pub const PARENT_RESOURCE_TYPE_SERVICE: &str = "svc";
pub const DEVICE_IPS_KEY: &str = "device_ips";

pub const SERVICES_STORE: &str = "services";
pub const SECRETS_STORE: &str = "secrets";

/// Join key between a Service and the device Secrets created for it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServiceKey {
    pub namespace: String,
    pub name: String,
}

impl ServiceKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    pub fn of(service: &Service) -> Self {
        Self::new(service.namespace().unwrap_or_default(), service.name_any())
    }
}

impl fmt::Display for ServiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// External address → Services exposing it → device Secrets → overlay addresses.
pub struct AddressIndex {
    services: Arc<IndexedStore<Service, IpAddr>>,
    secrets: Arc<IndexedStore<Secret, ServiceKey>>,
}

impl Default for AddressIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl AddressIndex {
    pub fn new() -> Self {
        Self {
            services: Arc::new(IndexedStore::new(SERVICES_STORE, service_external_ips)),
            secrets: Arc::new(IndexedStore::new(SECRETS_STORE, secret_parent_service)),
        }
    }

    pub fn services(&self) -> &Arc<IndexedStore<Service, IpAddr>> {
        &self.services
    }

    pub fn secrets(&self) -> &Arc<IndexedStore<Secret, ServiceKey>> {
        &self.secrets
    }

    /// Overlay addresses of the first Secret with a non-empty device list
    /// among the Services exposing `external`.
    pub fn lookup(&self, external: IpAddr) -> Result<Vec<IpAddr>, DomainError> {
        for service in self.services.by_index(&external.to_canonical())? {
            let service_key = ServiceKey::of(&service);
            for secret in self.secrets.by_index(&service_key)? {
                match device_ips(&secret)? {
                    Some(ips) if !ips.is_empty() => {
                        return parse_ips(&ips).map_err(|e| DomainError::MalformedOverlayData {
                            object: object_key(secret.as_ref()),
                            message: e.to_string(),
                        });
                    }
                    _ => continue,
                }
            }
        }
        Ok(Vec::new())
    }

    /// Waits for both stores; on cancellation names the ones still unsynced.
    pub async fn wait_synced(&self, cancel: &CancellationToken) -> Result<(), DomainError> {
        tokio::select! {
            _ = async { tokio::join!(self.services.wait_synced(), self.secrets.wait_synced()) } => Ok(()),
            _ = cancel.cancelled() => {
                let unsynced: Vec<String> = [
                    (self.services.name(), self.services.is_synced()),
                    (self.secrets.name(), self.secrets.is_synced()),
                ]
                .into_iter()
                .filter(|(_, synced)| !synced)
                .map(|(name, _)| name.to_string())
                .collect();

                if unsynced.is_empty() {
                    Ok(())
                } else {
                    Err(DomainError::IndexSyncFailed(unsynced))
                }
            }
        }
    }
}

/// Load balancer ingress IPs; unparsable entries are skipped.
pub fn service_external_ips(service: &Service) -> Vec<IpAddr> {
    service
        .status
        .as_ref()
        .and_then(|status| status.load_balancer.as_ref())
        .and_then(|lb| lb.ingress.as_ref())
        .into_iter()
        .flatten()
        .filter_map(|ingress| ingress.ip.as_deref())
        .filter_map(|ip| ip.trim().parse::<IpAddr>().ok())
        .map(|ip| ip.to_canonical())
        .collect()
}

/// The Service a device Secret was created for, if it carries the parent labels.
pub fn secret_parent_service(secret: &Secret) -> Vec<ServiceKey> {
    let labels = secret.labels();
    if labels.get(PARENT_RESOURCE_TYPE_LABEL).map(String::as_str)
        != Some(PARENT_RESOURCE_TYPE_SERVICE)
    {
        return Vec::new();
    }
    match (
        labels.get(PARENT_RESOURCE_NS_LABEL),
        labels.get(PARENT_RESOURCE_LABEL),
    ) {
        (Some(namespace), Some(name)) if !name.is_empty() => {
            vec![ServiceKey::new(namespace.as_str(), name.as_str())]
        }
        _ => Vec::new(),
    }
}

/// The `device_ips` JSON list, `None` when the key is absent.
fn device_ips(secret: &Secret) -> Result<Option<Vec<String>>, DomainError> {
    let Some(raw) = secret
        .data
        .as_ref()
        .and_then(|data| data.get(DEVICE_IPS_KEY))
    else {
        return Ok(None);
    };

    serde_json::from_slice::<Vec<String>>(&raw.0)
        .map(Some)
        .map_err(|e| DomainError::MalformedOverlayData {
            object: object_key(secret),
            message: format!("{} is not a JSON string array: {}", DEVICE_IPS_KEY, e),
        })
}
