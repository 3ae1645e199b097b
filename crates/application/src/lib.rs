//! tsdns-proxy application layer: ports and query-handling use cases
pub mod errors;
pub mod ports;
pub mod use_cases;

pub use errors::InterceptError;
