use bytes::Bytes;
use hickory_proto::op::{Message, MessageType, ResponseCode};
use hickory_proto::serialize::binary::BinEncodable;
use hickory_proto::xfer::Protocol;
use hickory_server::authority::MessageResponseBuilder;
use hickory_server::server::{Request, RequestHandler, ResponseHandler, ResponseInfo};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};
use tsdns_proxy_application::ports::{InboundQuery, OverlayResolver, UpstreamForwarder};
use tsdns_proxy_application::use_cases::dns::reply::error_reply;
use tsdns_proxy_application::use_cases::{ForwardQueryUseCase, InterceptQueryUseCase};
use tsdns_proxy_domain::{Config, DomainError, Route, TransportProtocol, ZoneRouter};

use crate::dns::forwarding::FailoverForwarder;

/// Routes each request by zone and runs the matching use case.
pub struct DnsServerHandler {
    router: ZoneRouter,
    intercept: Arc<InterceptQueryUseCase>,
    forward: Arc<ForwardQueryUseCase>,
    in_flight: CancellationToken,
}

impl DnsServerHandler {
    pub fn new(
        router: ZoneRouter,
        intercept: Arc<InterceptQueryUseCase>,
        forward: Arc<ForwardQueryUseCase>,
    ) -> Self {
        Self {
            router,
            intercept,
            forward,
            in_flight: CancellationToken::new(),
        }
    }

    /// Wires the failover forwarder, both use cases and the zone router
    /// around `resolver`.
    pub fn from_config(
        config: &Config,
        resolver: Arc<dyn OverlayResolver>,
    ) -> Result<Self, DomainError> {
        let forwarder: Arc<dyn UpstreamForwarder> =
            Arc::new(FailoverForwarder::from_config(&config.proxy)?);

        let intercept = Arc::new(
            InterceptQueryUseCase::new(Arc::clone(&forwarder), resolver)
                .with_answer_ttl(config.proxy.answer_ttl),
        );
        let forward = Arc::new(ForwardQueryUseCase::new(forwarder));
        let router = ZoneRouter::new(&config.proxy.proxy_zones);

        Ok(Self::new(router, intercept, forward))
    }

    /// Token that aborts every query still being resolved.
    pub fn in_flight(&self) -> CancellationToken {
        self.in_flight.clone()
    }

    /// The reply for `query`: REFUSED without a question, otherwise whatever
    /// the routed use case produced.
    pub async fn resolve(&self, query: &InboundQuery) -> Message {
        let Some(question) = query.first_question() else {
            debug!(client = %query.client, id = query.id(), "Query without questions");
            return error_reply(&query.message, ResponseCode::Refused);
        };

        match self.router.route(&question.name().to_ascii()) {
            Route::Intercept => self.intercept.execute(query, &self.in_flight).await,
            Route::Forward => self.forward.execute(query, &self.in_flight).await,
        }
    }
}

#[async_trait::async_trait]
impl RequestHandler for DnsServerHandler {
    async fn handle_request<R: ResponseHandler>(
        &self,
        request: &Request,
        mut response_handle: R,
    ) -> ResponseInfo {
        if request.header().message_type() != MessageType::Query {
            debug!(client = %request.src(), id = request.header().id(), "Ignoring non-query message");
            return ResponseInfo::from(*request.header());
        }

        let query = match inbound_query(request) {
            Ok(query) => query,
            Err(e) => {
                error!(client = %request.src(), error = %e, "Failed to re-encode request");
                return send_error_response(request, &mut response_handle, ResponseCode::ServFail)
                    .await;
            }
        };

        let reply = self.resolve(&query).await;
        send_reply(request, &mut response_handle, &reply).await
    }
}

/// Rebuilds the wire query that gets sent upstream.
fn inbound_query(request: &Request) -> Result<InboundQuery, DomainError> {
    let mut message = Message::new();
    message.set_header(*request.header());
    message.add_queries(request.queries().iter().map(|q| q.original().clone()));
    message.add_additionals(request.additionals().iter().cloned());
    if let Some(edns) = request.edns() {
        message.set_edns(edns.clone());
    }

    let bytes = message
        .to_vec()
        .map(Bytes::from)
        .map_err(|e| DomainError::MessageEncoding(e.to_string()))?;
    Ok(InboundQuery::new(
        bytes,
        message,
        transport_protocol(request.protocol()),
        request.src(),
    ))
}

fn transport_protocol(protocol: Protocol) -> TransportProtocol {
    match protocol {
        Protocol::Udp => TransportProtocol::Udp,
        _ => TransportProtocol::Tcp,
    }
}

async fn send_reply<R: ResponseHandler>(
    request: &Request,
    response_handle: &mut R,
    reply: &Message,
) -> ResponseInfo {
    let mut builder = MessageResponseBuilder::from_message_request(request);
    if let Some(edns) = reply.extensions() {
        builder.edns(edns.clone());
    }
    let response = builder.build(
        *reply.header(),
        reply.answers(),
        reply.name_servers(),
        &[],
        reply.additionals(),
    );

    match response_handle.send_response(response).await {
        Ok(info) => info,
        Err(e) => {
            debug!(client = %request.src(), error = %e, "Failed to send response");
            ResponseInfo::from(*request.header())
        }
    }
}

async fn send_error_response<R: ResponseHandler>(
    request: &Request,
    response_handle: &mut R,
    code: ResponseCode,
) -> ResponseInfo {
    let response =
        MessageResponseBuilder::from_message_request(request).error_msg(request.header(), code);

    match response_handle.send_response(response).await {
        Ok(info) => info,
        Err(e) => {
            error!(error = %e, "Failed to send error response");
            ResponseInfo::from(*request.header())
        }
    }
}
