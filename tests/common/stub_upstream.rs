use hickory_proto::op::{Message, MessageType, ResponseCode};
use hickory_proto::rr::rdata::{A, AAAA};
use hickory_proto::rr::{RData, Record, RecordType};
use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, UdpSocket};
use tokio::sync::oneshot;

#[derive(Default)]
struct Zone {
    answers: HashMap<String, Vec<IpAddr>>,
    silent: bool,
}

impl Zone {
    fn respond(&self, query: &[u8]) -> Option<Vec<u8>> {
        if self.silent {
            return None;
        }
        let query = Message::from_vec(query).ok()?;
        let question = query.queries().first()?.clone();

        let mut response = Message::new();
        response
            .set_id(query.id())
            .set_message_type(MessageType::Response)
            .set_op_code(query.op_code())
            .set_recursion_desired(query.recursion_desired())
            .set_recursion_available(true);
        response.add_query(question.clone());

        match self.answers.get(&question.name().to_ascii().to_lowercase()) {
            Some(ips) => {
                for ip in ips {
                    let rdata = match (ip, question.query_type()) {
                        (IpAddr::V4(v4), RecordType::A) => RData::A(A(*v4)),
                        (IpAddr::V6(v6), RecordType::AAAA) => RData::AAAA(AAAA(*v6)),
                        _ => continue,
                    };
                    response.add_answer(Record::from_rdata(question.name().clone(), 60, rdata));
                }
            }
            None => {
                response.set_response_code(ResponseCode::NXDomain);
            }
        }
        response.to_vec().ok()
    }
}

/// Authoritative-looking upstream serving fixed answers on UDP and TCP at one port.
pub struct StubUpstream {
    addr: SocketAddr,
    queries: Arc<AtomicUsize>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl StubUpstream {
    /// Answers `name` (FQDN) with `ips`; unknown names get NXDOMAIN.
    pub async fn answering(records: &[(&str, &[&str])]) -> Self {
        let zone = Zone {
            answers: records
                .iter()
                .map(|(name, ips)| {
                    (
                        name.to_lowercase(),
                        ips.iter().map(|ip| ip.parse().unwrap()).collect(),
                    )
                })
                .collect(),
            silent: false,
        };
        Self::start(zone).await
    }

    /// Accepts queries and never replies.
    pub async fn silent() -> Self {
        Self::start(Zone {
            silent: true,
            ..Default::default()
        })
        .await
    }

    async fn start(zone: Zone) -> Self {
        let udp = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = udp.local_addr().unwrap();
        let tcp = TcpListener::bind(addr).await.unwrap();
        let zone = Arc::new(zone);
        let queries = Arc::new(AtomicUsize::new(0));
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

        let counter = Arc::clone(&queries);
        tokio::spawn(async move {
            let mut buf = vec![0u8; 4096];
            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    received = udp.recv_from(&mut buf) => {
                        let Ok((len, peer)) = received else { continue };
                        counter.fetch_add(1, Ordering::SeqCst);
                        if let Some(reply) = zone.respond(&buf[..len]) {
                            let _ = udp.send_to(&reply, peer).await;
                        }
                    }
                    accepted = tcp.accept() => {
                        let Ok((mut stream, _)) = accepted else { continue };
                        let zone = Arc::clone(&zone);
                        let counter = Arc::clone(&counter);
                        tokio::spawn(async move {
                            loop {
                                let mut len_buf = [0u8; 2];
                                if stream.read_exact(&mut len_buf).await.is_err() {
                                    return;
                                }
                                let mut query = vec![0u8; u16::from_be_bytes(len_buf) as usize];
                                if stream.read_exact(&mut query).await.is_err() {
                                    return;
                                }
                                counter.fetch_add(1, Ordering::SeqCst);
                                let Some(reply) = zone.respond(&query) else {
                                    continue;
                                };
                                let _ = stream.write_all(&(reply.len() as u16).to_be_bytes()).await;
                                let _ = stream.write_all(&reply).await;
                            }
                        });
                    }
                }
            }
        });

        Self {
            addr,
            queries,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

impl Drop for StubUpstream {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
