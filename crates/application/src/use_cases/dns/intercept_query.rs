use hickory_proto::op::{Message, Query};
use hickory_proto::rr::rdata::{A, AAAA};
use hickory_proto::rr::{RData, Record, RecordType};
use smallvec::SmallVec;
use std::net::IpAddr;
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};
use tsdns_proxy_domain::IpFamily;

use super::reply::{reply_to, upstream_failure};
use crate::errors::InterceptError;
use crate::ports::{InboundQuery, OverlayResolver, UpstreamForwarder};

pub const DEFAULT_ANSWER_TTL: u32 = 300;

/// Forwards a query upstream, then tries to replace its address answers with
/// the overlay addresses of the same hosts.
///
/// Any reason not to rewrite falls back to the upstream response as received.
pub struct InterceptQueryUseCase {
    forwarder: Arc<dyn UpstreamForwarder>,
    resolver: Arc<dyn OverlayResolver>,
    answer_ttl: u32,
}

impl InterceptQueryUseCase {
    pub fn new(forwarder: Arc<dyn UpstreamForwarder>, resolver: Arc<dyn OverlayResolver>) -> Self {
        Self {
            forwarder,
            resolver,
            answer_ttl: DEFAULT_ANSWER_TTL,
        }
    }

    pub fn with_answer_ttl(mut self, ttl: u32) -> Self {
        self.answer_ttl = ttl;
        self
    }

    pub async fn execute(
        &self,
        query: &InboundQuery,
        cancel: &CancellationToken,
    ) -> Message {
        let upstream = match self.forwarder.forward(query, cancel).await {
            Ok(upstream) => upstream,
            Err(e) => return upstream_failure(query, &e),
        };

        match self.rewrite(&query.message, &upstream.message, cancel).await {
            Ok(rewritten) => rewritten,
            Err(e) if e.is_routine() => {
                debug!(
                    client = %query.client,
                    id = query.id(),
                    question = ?query.first_question().map(Query::to_string),
                    upstream = %upstream.server,
                    answers = upstream.message.answers().len(),
                    reason = %e,
                    "Response not intercepted"
                );
                upstream.message
            }
            Err(e) => {
                error!(
                    client = %query.client,
                    id = query.id(),
                    question = ?query.first_question().map(Query::to_string),
                    upstream = %upstream.server,
                    answers = upstream.message.answers().len(),
                    error = %e,
                    "Interception failed, returning upstream response"
                );
                upstream.message
            }
        }
    }

    /// Builds the rewritten reply, or explains why there is none.
    pub async fn rewrite(
        &self,
        request: &Message,
        upstream: &Message,
        cancel: &CancellationToken,
    ) -> Result<Message, InterceptError> {
        let (question, family) =
            interceptable_question(request).ok_or(InterceptError::NotInterceptableQuestion)?;

        let overlay = self.resolve_answers(upstream.answers(), cancel).await?;

        let overlay = family.retain(overlay);
        if overlay.is_empty() {
            return Err(InterceptError::NoOverlayAddressesAfterFiltering);
        }

        let mut reply = reply_to(request);
        reply.set_recursion_available(upstream.recursion_available());
        for ip in overlay {
            let rdata = match ip {
                IpAddr::V4(v4) => RData::A(A(v4)),
                IpAddr::V6(v6) => RData::AAAA(AAAA(v6)),
            };
            reply.add_answer(Record::from_rdata(
                question.name().clone(),
                self.answer_ttl,
                rdata,
            ));
        }
        Ok(reply)
    }

    /// One task per answer; the first failure cancels the rest, and every task
    /// is drained before returning.
    async fn resolve_answers(
        &self,
        answers: &[Record],
        cancel: &CancellationToken,
    ) -> Result<SmallVec<[IpAddr; 4]>, InterceptError> {
        let scope = cancel.child_token();
        let mut units = JoinSet::new();
        for answer in answers {
            units.spawn(resolve_answer(
                Arc::clone(&self.resolver),
                answer.clone(),
                scope.clone(),
            ));
        }

        let mut overlay = SmallVec::new();
        let mut failure: Option<InterceptError> = None;
        while let Some(joined) = units.join_next().await {
            let outcome = joined.unwrap_or_else(|e| Err(InterceptError::UnitFailed(e.to_string())));
            match outcome {
                Ok(ips) => overlay.extend(ips),
                Err(e) if failure.is_none() => {
                    scope.cancel();
                    failure = Some(e);
                }
                Err(_) => {}
            }
        }

        match failure {
            Some(e) => Err(e),
            None => Ok(overlay),
        }
    }
}

/// The single A or AAAA question of `request`, with its address family.
fn interceptable_question(request: &Message) -> Option<(&Query, IpFamily)> {
    match request.queries() {
        [question] => match question.query_type() {
            RecordType::A => Some((question, IpFamily::V4)),
            RecordType::AAAA => Some((question, IpFamily::V6)),
            _ => None,
        },
        _ => None,
    }
}

async fn resolve_answer(
    resolver: Arc<dyn OverlayResolver>,
    answer: Record,
    cancel: CancellationToken,
) -> Result<Vec<IpAddr>, InterceptError> {
    let (external, family) = match answer.data() {
        RData::A(a) => (IpAddr::V4(a.0), IpFamily::V4),
        RData::AAAA(aaaa) => (IpAddr::V6(aaaa.0), IpFamily::V6),
        _ => {
            return Err(InterceptError::AnswerNotAddressRecord(
                answer.record_type().to_string(),
            ))
        }
    };

    let resolved = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(InterceptError::Cancelled),
        resolved = resolver.resolve(external) => resolved.map_err(InterceptError::Resolver)?,
    };

    let overlay = family.retain(resolved);
    if overlay.is_empty() {
        return Err(InterceptError::NoOverlayAddresses(external));
    }
    Ok(overlay)
}
