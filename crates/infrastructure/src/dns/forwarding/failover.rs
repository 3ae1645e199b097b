use super::response::parse_upstream_response;
use crate::dns::transport::{create_transport, DnsTransport, ExchangeTimeouts};
use async_trait::async_trait;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tsdns_proxy_application::ports::{InboundQuery, UpstreamForwarder, UpstreamResponse};
use tsdns_proxy_domain::config::ProxyConfig;
use tsdns_proxy_domain::{DomainError, TransportProtocol};

/// Tries upstreams strictly in order under one shared deadline.
///
/// An upstream that runs out of its own exchange budget is skipped; any other
/// failure ends the attempt. Queries go out over the transport they came in on.
pub struct FailoverForwarder {
    udp: Vec<Box<dyn DnsTransport>>,
    tcp: Vec<Box<dyn DnsTransport>>,
    timeouts: ExchangeTimeouts,
    total_timeout: Duration,
}

impl FailoverForwarder {
    pub fn new(
        udp: Vec<Box<dyn DnsTransport>>,
        tcp: Vec<Box<dyn DnsTransport>>,
        timeouts: ExchangeTimeouts,
        total_timeout: Duration,
    ) -> Self {
        Self {
            udp,
            tcp,
            timeouts,
            total_timeout,
        }
    }

    pub fn from_config(config: &ProxyConfig) -> Result<Self, DomainError> {
        let upstreams = config
            .upstream_addrs()
            .map_err(|e| DomainError::InvalidUpstream(e.to_string()))?;

        let udp = upstreams
            .iter()
            .map(|u| create_transport(TransportProtocol::Udp, *u))
            .collect();
        let tcp = upstreams
            .iter()
            .map(|u| create_transport(TransportProtocol::Tcp, *u))
            .collect();
        let timeouts = ExchangeTimeouts {
            dial: config.dial_timeout(),
            write: config.write_timeout(),
            read: config.read_timeout(),
        };

        Ok(Self::new(udp, tcp, timeouts, config.total_timeout()))
    }

    fn transports(&self, protocol: TransportProtocol) -> &[Box<dyn DnsTransport>] {
        match protocol {
            TransportProtocol::Udp => &self.udp,
            TransportProtocol::Tcp => &self.tcp,
        }
    }

    pub async fn exchange(
        &self,
        protocol: TransportProtocol,
        query_bytes: &[u8],
        query_id: u16,
        cancel: &CancellationToken,
    ) -> Result<UpstreamResponse, DomainError> {
        let transports = self.transports(protocol);
        if transports.is_empty() {
            return Err(DomainError::NoUpstreams(protocol.as_str()));
        }

        let deadline = Instant::now() + self.total_timeout;
        for (position, transport) in transports.iter().enumerate() {
            if Instant::now() >= deadline {
                return Err(DomainError::UpstreamTotalTimeout);
            }

            let attempt = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(DomainError::Cancelled),
                attempt = tokio::time::timeout_at(
                    deadline,
                    transport.send(query_bytes, self.timeouts),
                ) => attempt,
            };

            let response = match attempt {
                Ok(Ok(response)) => response,
                Ok(Err(e)) if e.is_transport_timeout() => {
                    debug!(
                        server = %transport.server(),
                        protocol = transport.protocol_name(),
                        position,
                        error = %e,
                        "Upstream timed out, trying next"
                    );
                    continue;
                }
                Ok(Err(e)) => return Err(e),
                Err(_) => {
                    debug!(
                        server = %transport.server(),
                        position,
                        total_timeout_ms = self.total_timeout.as_millis() as u64,
                        "Total upstream timeout exceeded"
                    );
                    return Err(DomainError::UpstreamTotalTimeout);
                }
            };

            let message = parse_upstream_response(query_id, &response.bytes, response.server)?;
            debug!(server = %response.server, position, "Upstream responded");
            return Ok(UpstreamResponse {
                message,
                server: response.server,
            });
        }

        Err(DomainError::AllUpstreamsTimedOut)
    }
}

#[async_trait]
impl UpstreamForwarder for FailoverForwarder {
    async fn forward(
        &self,
        query: &InboundQuery,
        cancel: &CancellationToken,
    ) -> Result<UpstreamResponse, DomainError> {
        self.exchange(query.protocol, &query.bytes, query.id(), cancel)
            .await
    }
}
