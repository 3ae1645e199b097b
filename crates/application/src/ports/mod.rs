pub mod overlay_resolver;
pub mod upstream_forwarder;

pub use overlay_resolver::{start_with_timeout, OverlayResolver, Startable};
pub use upstream_forwarder::{InboundQuery, UpstreamForwarder, UpstreamResponse};
