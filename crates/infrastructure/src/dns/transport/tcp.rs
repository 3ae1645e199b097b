use super::{io_error, timeout_error, DnsTransport, ExchangeTimeouts, TransportResponse};
use async_trait::async_trait;
use bytes::Bytes;
use std::io;
use std::net::SocketAddr;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::debug;
use tsdns_proxy_domain::DomainError;

const MAX_TCP_MESSAGE_SIZE: usize = 65535;

/// DNS over TCP, one connection per exchange.
pub struct TcpTransport {
    server_addr: SocketAddr,
}

impl TcpTransport {
    pub fn new(server_addr: SocketAddr) -> Self {
        Self { server_addr }
    }

    async fn connect(&self, timeouts: ExchangeTimeouts) -> Result<TcpStream, DomainError> {
        let stream = tokio::time::timeout(timeouts.dial, TcpStream::connect(self.server_addr))
            .await
            .map_err(|_| timeout_error(self.server_addr, "dial"))?
            .map_err(|e| io_error(self.server_addr, "dial", e))?;

        stream
            .set_nodelay(true)
            .map_err(|e| io_error(self.server_addr, "dial", e))?;
        Ok(stream)
    }
}

#[async_trait]
impl DnsTransport for TcpTransport {
    async fn send(
        &self,
        message_bytes: &[u8],
        timeouts: ExchangeTimeouts,
    ) -> Result<TransportResponse, DomainError> {
        let mut stream = self.connect(timeouts).await?;

        tokio::time::timeout(timeouts.write, send_with_length_prefix(&mut stream, message_bytes))
            .await
            .map_err(|_| timeout_error(self.server_addr, "write"))?
            .map_err(|e| io_error(self.server_addr, "write", e))?;

        debug!(
            server = %self.server_addr,
            message_len = message_bytes.len(),
            "TCP query sent"
        );

        let response = tokio::time::timeout(timeouts.read, read_with_length_prefix(&mut stream))
            .await
            .map_err(|_| timeout_error(self.server_addr, "read"))?
            .map_err(|e| io_error(self.server_addr, "read", e))?;

        debug!(
            server = %self.server_addr,
            response_len = response.len(),
            "TCP response received"
        );

        Ok(TransportResponse {
            bytes: Bytes::from(response),
            server: self.server_addr,
        })
    }

    fn server(&self) -> SocketAddr {
        self.server_addr
    }

    fn protocol_name(&self) -> &'static str {
        "TCP"
    }
}

/// Writes one DNS message with its two-byte length prefix.
async fn send_with_length_prefix<S>(stream: &mut S, message_bytes: &[u8]) -> io::Result<()>
where
    S: AsyncWriteExt + Unpin,
{
    let length = u16::try_from(message_bytes.len()).map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("DNS message too large: {} bytes", message_bytes.len()),
        )
    })?;

    stream.write_all(&length.to_be_bytes()).await?;
    stream.write_all(message_bytes).await?;
    stream.flush().await
}

/// Reads one length-prefixed DNS message.
async fn read_with_length_prefix<S>(stream: &mut S) -> io::Result<Vec<u8>>
where
    S: AsyncReadExt + Unpin,
{
    let mut len_buf = [0u8; 2];
    stream.read_exact(&mut len_buf).await?;

    let message_len = u16::from_be_bytes(len_buf) as usize;
    if message_len == 0 || message_len > MAX_TCP_MESSAGE_SIZE {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("Invalid DNS message length: {}", message_len),
        ));
    }

    let mut message = vec![0u8; message_len];
    stream.read_exact(&mut message).await?;
    Ok(message)
}
