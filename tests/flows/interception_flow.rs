#[path = "../common/mod.rs"]
mod common;

use common::{answer_ips, ip, ProxyHarness, StubUpstream};
use hickory_proto::op::ResponseCode;
use hickory_proto::rr::RecordType;

// ============================================================================
// Interception Flow
// ============================================================================

async fn upstream() -> StubUpstream {
    StubUpstream::answering(&[
        ("web.svc.example.com.", &["203.0.113.10", "2001:db8::10"]),
        ("multi.svc.example.com.", &["203.0.113.10", "203.0.113.11"]),
        ("external.svc.example.com.", &["198.51.100.7"]),
        ("www.example.org.", &["203.0.113.10"]),
    ])
    .await
}

fn config(upstream: &StubUpstream, extra: &str) -> String {
    format!(
        r#"
[proxy]
upstreams = ["{upstream}"]
proxy_zones = ["svc.example.com"]
{extra}

[resolver.static.mappings]
"203.0.113.10" = ["100.64.0.5", "fd7a:115c:a1e0::5"]
"203.0.113.11" = ["100.64.0.6"]
"2001:db8::10" = ["fd7a:115c:a1e0::5"]
"#,
        upstream = upstream.addr(),
        extra = extra,
    )
}

#[tokio::test]
async fn test_a_answer_in_proxy_zone_is_rewritten() {
    let upstream = upstream().await;
    let proxy = ProxyHarness::from_toml(&config(&upstream, "")).await;

    let reply = proxy.client().udp("web.svc.example.com.", RecordType::A).await;

    assert_eq!(reply.response_code(), ResponseCode::NoError);
    assert_eq!(answer_ips(&reply), vec![ip("100.64.0.5")]);
    assert!(reply.answers().iter().all(|record| record.ttl() == 300));
    assert!(reply.recursion_available());

    proxy.shutdown().await;
}

#[tokio::test]
async fn test_aaaa_answer_is_rewritten_over_tcp() {
    let upstream = upstream().await;
    let proxy = ProxyHarness::from_toml(&config(&upstream, "")).await;

    let reply = proxy.client().tcp("web.svc.example.com.", RecordType::AAAA).await;

    assert_eq!(answer_ips(&reply), vec![ip("fd7a:115c:a1e0::5")]);

    proxy.shutdown().await;
}

#[tokio::test]
async fn test_overlay_addresses_from_every_answer_are_merged() {
    let upstream = upstream().await;
    let proxy = ProxyHarness::from_toml(&config(&upstream, "answer_ttl = 30")).await;

    let reply = proxy.client().udp("multi.svc.example.com.", RecordType::A).await;

    assert_eq!(answer_ips(&reply), vec![ip("100.64.0.5"), ip("100.64.0.6")]);
    assert!(reply.answers().iter().all(|record| record.ttl() == 30));

    proxy.shutdown().await;
}

#[tokio::test]
async fn test_unmapped_answer_is_returned_unchanged() {
    let upstream = upstream().await;
    let proxy = ProxyHarness::from_toml(&config(&upstream, "")).await;

    let reply = proxy.client().udp("external.svc.example.com.", RecordType::A).await;

    assert_eq!(answer_ips(&reply), vec![ip("198.51.100.7")]);
    assert_eq!(reply.answers()[0].ttl(), 60);

    proxy.shutdown().await;
}

#[tokio::test]
async fn test_name_outside_proxy_zones_is_forwarded() {
    let upstream = upstream().await;
    let proxy = ProxyHarness::from_toml(&config(&upstream, "")).await;

    let reply = proxy.client().udp("www.example.org.", RecordType::A).await;

    assert_eq!(answer_ips(&reply), vec![ip("203.0.113.10")]);
    assert_eq!(reply.answers()[0].ttl(), 60);

    proxy.shutdown().await;
}

#[tokio::test]
async fn test_nxdomain_in_proxy_zone_passes_through() {
    let upstream = upstream().await;
    let proxy = ProxyHarness::from_toml(&config(&upstream, "")).await;

    let reply = proxy.client().udp("missing.svc.example.com.", RecordType::A).await;

    assert_eq!(reply.response_code(), ResponseCode::NXDomain);
    assert!(reply.answers().is_empty());

    proxy.shutdown().await;
}

#[tokio::test]
async fn test_environment_overrides_answer_ttl() {
    let upstream = upstream().await;
    let env = vec![(
        "TSDNSPROXY_PROXY__ANSWER_TTL".to_string(),
        "45".to_string(),
    )];
    let proxy = ProxyHarness::from_toml_with_env(&config(&upstream, ""), env).await;

    let reply = proxy.client().udp("web.svc.example.com.", RecordType::A).await;

    assert_eq!(reply.answers()[0].ttl(), 45);

    proxy.shutdown().await;
}
