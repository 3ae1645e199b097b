use hickory_proto::op::{Message, MessageType, OpCode, Query};
use hickory_proto::rr::rdata::{A, AAAA};
use hickory_proto::rr::{Name, RData, Record, RecordType};
use k8s_openapi::api::core::v1::{
    LoadBalancerIngress, LoadBalancerStatus, Secret, Service, ServiceStatus,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::ByteString;
use std::collections::BTreeMap;
use std::net::IpAddr;
use std::str::FromStr;

// ============================================================================
// DNS messages
// ============================================================================

pub fn query_bytes(id: u16, domain: &str, record_type: RecordType) -> Vec<u8> {
    let mut message = Message::new();
    message
        .set_id(id)
        .set_message_type(MessageType::Query)
        .set_op_code(OpCode::Query)
        .set_recursion_desired(true);
    message.add_query(Query::query(Name::from_str(domain).unwrap(), record_type));
    message.to_vec().unwrap()
}

/// Response to `query` answering its first question with `ips`.
pub fn answer_for(query: &[u8], ips: &[IpAddr]) -> Vec<u8> {
    let query = Message::from_vec(query).unwrap();
    let mut response = Message::new();
    response
        .set_id(query.id())
        .set_message_type(MessageType::Response)
        .set_op_code(OpCode::Query)
        .set_recursion_desired(query.recursion_desired())
        .set_recursion_available(true);
    response.add_queries(query.queries().iter().cloned());
    if let Some(question) = query.queries().first() {
        for ip in ips {
            let rdata = match ip {
                IpAddr::V4(v4) => RData::A(A(*v4)),
                IpAddr::V6(v6) => RData::AAAA(AAAA(*v6)),
            };
            response.add_answer(Record::from_rdata(question.name().clone(), 60, rdata));
        }
    }
    response.to_vec().unwrap()
}

pub fn ip(raw: &str) -> IpAddr {
    raw.parse().unwrap()
}

// ============================================================================
// Kubernetes objects
// ============================================================================

pub fn service(namespace: &str, name: &str, ingress_ips: &[&str]) -> Service {
    Service {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        status: Some(ServiceStatus {
            load_balancer: Some(LoadBalancerStatus {
                ingress: Some(
                    ingress_ips
                        .iter()
                        .map(|ip| LoadBalancerIngress {
                            ip: Some(ip.to_string()),
                            ..Default::default()
                        })
                        .collect(),
                ),
            }),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// An operator device Secret for `parent_ns/parent`, optionally carrying `device_ips`.
pub fn device_secret(name: &str, parent_ns: &str, parent: &str, device_ips: Option<&str>) -> Secret {
    let labels = BTreeMap::from([
        ("tailscale.com/parent-resource".to_string(), parent.to_string()),
        ("tailscale.com/parent-resource-ns".to_string(), parent_ns.to_string()),
        ("tailscale.com/parent-resource-type".to_string(), "svc".to_string()),
    ]);
    Secret {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some("tailscale".to_string()),
            labels: Some(labels),
            ..Default::default()
        },
        data: device_ips.map(|raw| {
            BTreeMap::from([(
                "device_ips".to_string(),
                ByteString(raw.as_bytes().to_vec()),
            )])
        }),
        ..Default::default()
    }
}
