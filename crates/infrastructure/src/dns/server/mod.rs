pub mod handler;
pub mod listener;

pub use handler::DnsServerHandler;
pub use listener::DnsServer;
