//! Configuration module for tsdns-proxy
//!
//! - `root`: Main configuration, loading and CLI overrides
//! - `env`: `TSDNSPROXY_` environment overrides
//! - `proxy`: Listener, upstreams, timeouts and proxy zones
//! - `resolver`: Overlay resolver backends
//! - `logging`: Logging settings
//! - `errors`: Configuration errors

pub mod env;
pub mod errors;
pub mod logging;
pub mod proxy;
pub mod resolver;
pub mod root;

pub use errors::ConfigError;
pub use logging::{LogFormat, LoggingConfig};
pub use proxy::ProxyConfig;
pub use resolver::{KubernetesConfig, ResolverBackend, ResolverConfig, StaticResolverConfig};
pub use root::{CliOverrides, Config};
