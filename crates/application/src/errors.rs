use std::net::IpAddr;
use thiserror::Error;
use tsdns_proxy_domain::DomainError;

/// Why a response was not rewritten.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InterceptError {
    #[error("query does not have exactly one A/AAAA question")]
    NotInterceptableQuestion,

    #[error("answer is not an address record ({0})")]
    AnswerNotAddressRecord(String),

    #[error("no overlay addresses for {0}")]
    NoOverlayAddresses(IpAddr),

    #[error("no overlay addresses left after filtering by question family")]
    NoOverlayAddressesAfterFiltering,

    #[error("resolver failed: {0}")]
    Resolver(DomainError),

    #[error("resolution unit failed: {0}")]
    UnitFailed(String),

    #[error("interception cancelled")]
    Cancelled,
}

impl InterceptError {
    /// Ordinary ineligibility, as opposed to a resolver fault.
    pub fn is_routine(&self) -> bool {
        !matches!(
            self,
            InterceptError::Resolver(_) | InterceptError::UnitFailed(_)
        )
    }
}
