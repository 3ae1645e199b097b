#[path = "../common/mod.rs"]
mod common;

use common::{answer_ips, ip, ProxyHarness, StubUpstream};
use hickory_proto::op::ResponseCode;
use hickory_proto::rr::RecordType;
use std::time::Instant;

// ============================================================================
// Failover Tests
// ============================================================================

fn config(upstreams: &[&StubUpstream], timeouts: &str) -> String {
    let upstreams = upstreams
        .iter()
        .map(|u| format!("\"{}\"", u.addr()))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        r#"
[proxy]
upstreams = [{upstreams}]
proxy_zones = ["svc.example.com"]
{timeouts}

[resolver.static.mappings]
"203.0.113.10" = ["100.64.0.5"]
"#,
    )
}

#[tokio::test]
async fn test_silent_primary_fails_over_to_secondary() {
    let primary = StubUpstream::silent().await;
    let secondary = StubUpstream::answering(&[("web.svc.example.com.", &["203.0.113.10"])]).await;
    let proxy = ProxyHarness::from_toml(&config(
        &[&primary, &secondary],
        "upstream_read_timeout_seconds = 1\nupstream_total_timeout_seconds = 5",
    ))
    .await;

    let reply = proxy.client().udp("web.svc.example.com.", RecordType::A).await;

    assert_eq!(answer_ips(&reply), vec![ip("100.64.0.5")]);
    assert_eq!(primary.queries(), 1);
    assert_eq!(secondary.queries(), 1);

    proxy.shutdown().await;
}

#[tokio::test]
async fn test_secondary_not_tried_once_first_answers() {
    let primary = StubUpstream::answering(&[("www.example.org.", &["203.0.113.20"])]).await;
    let secondary = StubUpstream::answering(&[("www.example.org.", &["203.0.113.21"])]).await;
    let proxy = ProxyHarness::from_toml(&config(&[&primary, &secondary], "")).await;

    let reply = proxy.client().tcp("www.example.org.", RecordType::A).await;

    assert_eq!(answer_ips(&reply), vec![ip("203.0.113.20")]);
    assert_eq!(secondary.queries(), 0);

    proxy.shutdown().await;
}

#[tokio::test]
async fn test_all_upstreams_silent_yields_servfail() {
    let first = StubUpstream::silent().await;
    let second = StubUpstream::silent().await;
    let proxy = ProxyHarness::from_toml(&config(
        &[&first, &second],
        "upstream_read_timeout_seconds = 1\nupstream_total_timeout_seconds = 5",
    ))
    .await;

    let reply = proxy.client().udp("www.example.org.", RecordType::A).await;

    assert_eq!(reply.response_code(), ResponseCode::ServFail);
    assert_eq!(first.queries(), 1);
    assert_eq!(second.queries(), 1);

    proxy.shutdown().await;
}

#[tokio::test]
async fn test_total_timeout_caps_failover() {
    let first = StubUpstream::silent().await;
    let second = StubUpstream::answering(&[("www.example.org.", &["203.0.113.20"])]).await;
    let proxy = ProxyHarness::from_toml(&config(
        &[&first, &second],
        "upstream_read_timeout_seconds = 3\nupstream_total_timeout_seconds = 1",
    ))
    .await;

    let started = Instant::now();
    let reply = proxy.client().udp("www.example.org.", RecordType::A).await;

    assert_eq!(reply.response_code(), ResponseCode::ServFail);
    assert!(started.elapsed().as_secs_f64() < 2.5);
    assert_eq!(second.queries(), 0);

    proxy.shutdown().await;
}

#[tokio::test]
async fn test_servfail_in_proxy_zone_when_upstreams_fail() {
    let only = StubUpstream::silent().await;
    let proxy = ProxyHarness::from_toml(&config(
        &[&only],
        "upstream_read_timeout_seconds = 1\nupstream_total_timeout_seconds = 2",
    ))
    .await;

    let reply = proxy.client().udp("web.svc.example.com.", RecordType::A).await;

    assert_eq!(reply.response_code(), ResponseCode::ServFail);

    proxy.shutdown().await;
}
