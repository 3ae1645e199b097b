pub mod failover;
pub mod response;

pub use failover::FailoverForwarder;
pub use response::parse_upstream_response;
