use hickory_proto::op::{Message, MessageType};
use std::net::SocketAddr;
use tsdns_proxy_domain::DomainError;

/// Decodes an upstream reply and checks it answers the query with `query_id`.
pub fn parse_upstream_response(
    query_id: u16,
    bytes: &[u8],
    server: SocketAddr,
) -> Result<Message, DomainError> {
    let message = Message::from_vec(bytes).map_err(|e| {
        DomainError::InvalidDnsResponse(format!("undecodable response from {}: {}", server, e))
    })?;

    if message.message_type() != MessageType::Response {
        return Err(DomainError::InvalidDnsResponse(format!(
            "{} sent a query instead of a response",
            server
        )));
    }

    if message.id() != query_id {
        return Err(DomainError::InvalidDnsResponse(format!(
            "response id mismatch from {}: expected {}, got {}",
            server,
            query_id,
            message.id()
        )));
    }

    Ok(message)
}
