//! tsdns-proxy infrastructure: wire transports, upstream failover, the DNS
//! listeners and the overlay resolvers.
pub mod dns;
pub mod resolvers;
