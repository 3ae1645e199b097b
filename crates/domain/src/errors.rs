use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Invalid IP address: {0}")]
    InvalidIpAddress(String),

    #[error("Invalid upstream address: {0}")]
    InvalidUpstream(String),

    #[error("Invalid DNS response: {0}")]
    InvalidDnsResponse(String),

    #[error("Failed to encode DNS message: {0}")]
    MessageEncoding(String),

    #[error("Transport timeout ({operation}) talking to {server}")]
    TransportTimeout {
        server: String,
        operation: &'static str,
    },

    #[error("Connection refused by {server}")]
    TransportConnectionRefused { server: String },

    #[error("Transport I/O error with {server}: {message}")]
    TransportIo { server: String, message: String },

    #[error("Total upstream timeout exceeded")]
    UpstreamTotalTimeout,

    #[error("All upstreams timed out (without exceeding total timeout)")]
    AllUpstreamsTimedOut,

    #[error("No upstream servers configured for {0}")]
    NoUpstreams(&'static str),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Malformed overlay data in {object}: {message}")]
    MalformedOverlayData { object: String, message: String },

    #[error("Address index unavailable: {0}")]
    IndexUnavailable(&'static str),

    #[error("Failed to sync watch caches: {}", .0.join(", "))]
    IndexSyncFailed(Vec<String>),

    #[error("Resolver startup failed: {0}")]
    ResolverStartup(String),

    #[error("I/O error: {0}")]
    IoError(String),
}

impl DomainError {
    /// True for a single exchange that ran out of its own dial/read/write budget.
    pub fn is_transport_timeout(&self) -> bool {
        matches!(self, DomainError::TransportTimeout { .. })
    }

    /// True when the forwarder gave up because time ran out, either overall or
    /// on every upstream.
    pub fn is_upstream_exhaustion(&self) -> bool {
        matches!(
            self,
            DomainError::UpstreamTotalTimeout | DomainError::AllUpstreamsTimedOut
        )
    }
}
