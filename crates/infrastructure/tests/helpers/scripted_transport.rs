use super::builders::{answer_for, ip};
use async_trait::async_trait;
use bytes::Bytes;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tsdns_proxy_domain::DomainError;
use tsdns_proxy_infrastructure::dns::transport::{DnsTransport, ExchangeTimeouts, TransportResponse};

/// What a scripted upstream does with every exchange.
#[derive(Clone, Debug)]
pub enum Script {
    Respond { after: Duration },
    TimeOut { after: Duration },
    Refuse,
    WrongId,
}

/// In-memory transport driven by a [`Script`], for deterministic failover tests.
#[derive(Clone)]
pub struct ScriptedTransport {
    server: SocketAddr,
    script: Script,
    calls: Arc<AtomicUsize>,
}

impl ScriptedTransport {
    pub fn new(server: &str, script: Script) -> Self {
        Self {
            server: server.parse().unwrap(),
            script,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn boxed(&self) -> Box<dyn DnsTransport> {
        Box::new(self.clone())
    }
}

#[async_trait]
impl DnsTransport for ScriptedTransport {
    async fn send(
        &self,
        message_bytes: &[u8],
        _timeouts: ExchangeTimeouts,
    ) -> Result<TransportResponse, DomainError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.script {
            Script::Respond { after } => {
                tokio::time::sleep(*after).await;
                Ok(TransportResponse {
                    bytes: Bytes::from(answer_for(message_bytes, &[ip("198.51.100.1")])),
                    server: self.server,
                })
            }
            Script::TimeOut { after } => {
                tokio::time::sleep(*after).await;
                Err(DomainError::TransportTimeout {
                    server: self.server.to_string(),
                    operation: "read",
                })
            }
            Script::Refuse => Err(DomainError::TransportConnectionRefused {
                server: self.server.to_string(),
            }),
            Script::WrongId => {
                let mut bytes = answer_for(message_bytes, &[ip("198.51.100.1")]);
                bytes[1] = bytes[1].wrapping_add(1);
                Ok(TransportResponse {
                    bytes: Bytes::from(bytes),
                    server: self.server,
                })
            }
        }
    }

    fn server(&self) -> SocketAddr {
        self.server
    }

    fn protocol_name(&self) -> &'static str {
        "SCRIPTED"
    }
}
