//! Response construction shared by the query use cases and the server.

use hickory_proto::op::{Message, MessageType, ResponseCode};
use tracing::{debug, warn};
use tsdns_proxy_domain::DomainError;

use crate::ports::InboundQuery;

/// An empty NOERROR reply echoing the request's id, opcode, flags and questions.
pub fn reply_to(request: &Message) -> Message {
    let mut reply = Message::new();
    reply
        .set_id(request.id())
        .set_message_type(MessageType::Response)
        .set_op_code(request.op_code())
        .set_recursion_desired(request.recursion_desired())
        .set_checking_disabled(request.checking_disabled())
        .set_response_code(ResponseCode::NoError);
    reply.add_queries(request.queries().iter().cloned());
    reply
}

pub fn error_reply(request: &Message, code: ResponseCode) -> Message {
    let mut reply = reply_to(request);
    reply.set_response_code(code);
    reply
}

/// SERVFAIL for a query whose upstream resolution failed.
///
/// Running out of time and shutdown are expected under load and logged at
/// debug; anything else is a warning.
pub fn upstream_failure(query: &InboundQuery, error: &DomainError) -> Message {
    if error.is_upstream_exhaustion() || matches!(error, DomainError::Cancelled) {
        debug!(
            client = %query.client,
            id = query.id(),
            error = %error,
            "Upstream resolution gave up"
        );
    } else {
        warn!(
            client = %query.client,
            id = query.id(),
            protocol = %query.protocol,
            error = %error,
            "Failed to forward query upstream"
        );
    }
    error_reply(&query.message, ResponseCode::ServFail)
}
