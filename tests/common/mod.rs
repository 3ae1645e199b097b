#![allow(dead_code)]

pub mod stub_upstream;

pub use proxy::{answer_ips, ProxyHarness, TestClient};
pub use stub_upstream::StubUpstream;

use std::net::IpAddr;

pub fn ip(raw: &str) -> IpAddr {
    raw.parse().unwrap()
}
