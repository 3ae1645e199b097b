pub mod forwarding;
pub mod server;
pub mod transport;

pub use forwarding::FailoverForwarder;
pub use server::{DnsServer, DnsServerHandler};
