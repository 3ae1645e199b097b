use bytes::Bytes;
use hickory_proto::op::{Message, MessageType, OpCode, Query};
use hickory_proto::rr::rdata::{A, AAAA, CNAME};
use hickory_proto::rr::{Name, RData, Record, RecordType};
use hickory_proto::serialize::binary::BinEncodable;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use tsdns_proxy_application::ports::InboundQuery;
use tsdns_proxy_domain::TransportProtocol;

pub fn name(raw: &str) -> Name {
    Name::from_str(raw).unwrap()
}

pub fn request(id: u16, domain: &str, record_type: RecordType) -> Message {
    let mut message = Message::new();
    message
        .set_id(id)
        .set_message_type(MessageType::Query)
        .set_op_code(OpCode::Query)
        .set_recursion_desired(true);
    message.add_query(Query::query(name(domain), record_type));
    message
}

pub fn inbound(message: &Message) -> InboundQuery {
    let client: SocketAddr = "192.0.2.10:40000".parse().unwrap();
    InboundQuery::new(
        Bytes::from(message.to_vec().unwrap()),
        message.clone(),
        TransportProtocol::Udp,
        client,
    )
}

/// Upstream-style response to `request` carrying `answers`.
pub fn response(request: &Message, answers: Vec<Record>) -> Message {
    let mut message = Message::new();
    message
        .set_id(request.id())
        .set_message_type(MessageType::Response)
        .set_op_code(OpCode::Query)
        .set_recursion_desired(true)
        .set_recursion_available(true);
    message.add_queries(request.queries().iter().cloned());
    message.add_answers(answers);
    message
}

pub fn a_record(domain: &str, ip: &str, ttl: u32) -> Record {
    Record::from_rdata(name(domain), ttl, RData::A(A(ip.parse().unwrap())))
}

pub fn aaaa_record(domain: &str, ip: &str, ttl: u32) -> Record {
    Record::from_rdata(name(domain), ttl, RData::AAAA(AAAA(ip.parse().unwrap())))
}

pub fn cname_record(domain: &str, target: &str) -> Record {
    Record::from_rdata(name(domain), 60, RData::CNAME(CNAME(name(target))))
}

pub fn answer_ips(message: &Message) -> Vec<IpAddr> {
    message
        .answers()
        .iter()
        .filter_map(|r| match r.data() {
            RData::A(a) => Some(IpAddr::V4(a.0)),
            RData::AAAA(aaaa) => Some(IpAddr::V6(aaaa.0)),
            _ => None,
        })
        .collect()
}

pub fn ip(raw: &str) -> IpAddr {
    raw.parse().unwrap()
}
