use async_trait::async_trait;
use rustc_hash::FxHashMap;
use std::net::IpAddr;
use tsdns_proxy_application::ports::OverlayResolver;
use tsdns_proxy_domain::config::StaticResolverConfig;
use tsdns_proxy_domain::DomainError;

/// Fixed mappings from configuration. Ready immediately.
pub struct StaticResolver {
    mappings: FxHashMap<IpAddr, Vec<IpAddr>>,
}

impl StaticResolver {
    pub fn new<I>(mappings: I) -> Self
    where
        I: IntoIterator<Item = (IpAddr, Vec<IpAddr>)>,
    {
        Self {
            mappings: mappings
                .into_iter()
                .map(|(external, overlay)| (external.to_canonical(), overlay))
                .collect(),
        }
    }

    pub fn from_config(config: &StaticResolverConfig) -> Result<Self, DomainError> {
        let mappings = config
            .parsed_mappings()
            .map_err(|e| DomainError::ResolverStartup(e.to_string()))?;
        Ok(Self::new(mappings))
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }
}

#[async_trait]
impl OverlayResolver for StaticResolver {
    async fn resolve(&self, external: IpAddr) -> Result<Vec<IpAddr>, DomainError> {
        Ok(self
            .mappings
            .get(&external.to_canonical())
            .cloned()
            .unwrap_or_default())
    }

    fn name(&self) -> &'static str {
        "static"
    }
}
