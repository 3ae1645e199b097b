use async_trait::async_trait;
use bytes::Bytes;
use hickory_proto::op::{Message, Query};
use std::net::SocketAddr;
use tokio_util::sync::CancellationToken;
use tsdns_proxy_domain::{DomainError, TransportProtocol};

/// A decoded client query together with its original wire bytes.
#[derive(Debug, Clone)]
pub struct InboundQuery {
    pub bytes: Bytes,
    pub message: Message,
    pub protocol: TransportProtocol,
    pub client: SocketAddr,
}

impl InboundQuery {
    pub fn new(
        bytes: Bytes,
        message: Message,
        protocol: TransportProtocol,
        client: SocketAddr,
    ) -> Self {
        Self {
            bytes,
            message,
            protocol,
            client,
        }
    }

    pub fn id(&self) -> u16 {
        self.message.id()
    }

    pub fn first_question(&self) -> Option<&Query> {
        self.message.queries().first()
    }
}

/// First successful upstream response and the server that produced it.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub message: Message,
    pub server: SocketAddr,
}

#[async_trait]
pub trait UpstreamForwarder: Send + Sync {
    /// Sends the query to the configured upstreams over the query's own transport.
    async fn forward(
        &self,
        query: &InboundQuery,
        cancel: &CancellationToken,
    ) -> Result<UpstreamResponse, DomainError>;
}
