//! tsdns-proxy domain layer
pub mod config;
pub mod errors;
pub mod ip_family;
pub mod upstream;
pub mod zone;

pub use config::{CliOverrides, Config, ConfigError};
pub use errors::DomainError;
pub use ip_family::{parse_ips, IpFamily};
pub use upstream::{TransportProtocol, UpstreamAddr};
pub use zone::{Route, ZonePattern, ZoneRouter};
