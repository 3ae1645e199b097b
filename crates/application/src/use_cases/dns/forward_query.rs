use hickory_proto::op::Message;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::reply::upstream_failure;
use crate::ports::{InboundQuery, UpstreamForwarder};

/// Plain-forward path: the upstream answer as received, or SERVFAIL.
pub struct ForwardQueryUseCase {
    forwarder: Arc<dyn UpstreamForwarder>,
}

impl ForwardQueryUseCase {
    pub fn new(forwarder: Arc<dyn UpstreamForwarder>) -> Self {
        Self { forwarder }
    }

    pub async fn execute(
        &self,
        query: &InboundQuery,
        cancel: &CancellationToken,
    ) -> Message {
        match self.forwarder.forward(query, cancel).await {
            Ok(upstream) => upstream.message,
            Err(e) => upstream_failure(query, &e),
        }
    }
}
