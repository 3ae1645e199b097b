pub mod tcp;
pub mod udp;

use async_trait::async_trait;
use bytes::Bytes;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use tsdns_proxy_domain::{DomainError, TransportProtocol, UpstreamAddr};

/// Result of a raw DNS transport operation
#[derive(Debug)]
pub struct TransportResponse {
    /// Raw DNS response bytes (wire format)
    pub bytes: Bytes,
    pub server: SocketAddr,
}

/// Budgets for the individual steps of one exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExchangeTimeouts {
    pub dial: Duration,
    pub write: Duration,
    pub read: Duration,
}

impl ExchangeTimeouts {
    pub fn uniform(timeout: Duration) -> Self {
        Self {
            dial: timeout,
            write: timeout,
            read: timeout,
        }
    }
}

/// Trait for sending raw DNS messages over the wire
#[async_trait]
pub trait DnsTransport: Send + Sync {
    async fn send(
        &self,
        message_bytes: &[u8],
        timeouts: ExchangeTimeouts,
    ) -> Result<TransportResponse, DomainError>;

    fn server(&self) -> SocketAddr;

    fn protocol_name(&self) -> &'static str;
}

/// Create the transport for `protocol` toward `upstream`.
pub fn create_transport(protocol: TransportProtocol, upstream: UpstreamAddr) -> Box<dyn DnsTransport> {
    match protocol {
        TransportProtocol::Udp => Box::new(udp::UdpTransport::new(upstream.socket_addr())),
        TransportProtocol::Tcp => Box::new(tcp::TcpTransport::new(upstream.socket_addr())),
    }
}

pub(crate) fn timeout_error(server: SocketAddr, operation: &'static str) -> DomainError {
    DomainError::TransportTimeout {
        server: server.to_string(),
        operation,
    }
}

pub(crate) fn io_error(server: SocketAddr, operation: &'static str, e: io::Error) -> DomainError {
    match e.kind() {
        io::ErrorKind::ConnectionRefused => DomainError::TransportConnectionRefused {
            server: server.to_string(),
        },
        io::ErrorKind::TimedOut => timeout_error(server, operation),
        _ => DomainError::TransportIo {
            server: server.to_string(),
            message: format!("{} failed: {}", operation, e),
        },
    }
}
