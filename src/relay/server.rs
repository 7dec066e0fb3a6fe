// Passive DNS Relay Server
//
// UDP and TCP listeners that forward client queries to an upstream resolver,
// relay the reply unmodified and push names from informative replies into a
// bounded notification buffer.

use super::inspector::informative_name;
use super::upstream::{MAX_UDP_SIZE, Upstream};
use crate::dns::record::type_name;
use hickory_proto::op::{Message, MessageType, ResponseCode};
use hickory_proto::rr::RecordType;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream, UdpSocket};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Query handling shared by both transports
pub struct RelayHandler {
    upstream: Arc<dyn Upstream>,
    notify: mpsc::Sender<String>,
}

impl RelayHandler {
    pub fn new(upstream: Arc<dyn Upstream>, notify: mpsc::Sender<String>) -> Self {
        Self { upstream, notify }
    }

    /// Answer one raw query. Unparseable input and responses get no reply.
    pub async fn handle_query(&self, request: &[u8], client: SocketAddr) -> Option<Vec<u8>> {
        let start = Instant::now();

        let query = match Message::from_vec(request) {
            Ok(query) => query,
            Err(e) => {
                debug!("{} -> unparseable query: {}", client, e);
                return None;
            }
        };

        if query.message_type() != MessageType::Query {
            return None;
        }

        if query
            .queries()
            .iter()
            .any(|q| q.query_type() == RecordType::ANY)
        {
            debug!("{} -> refusing ANY query", client);
            return error_reply(&query, ResponseCode::NotImp);
        }

        let reply_bytes = match self.upstream.exchange(request).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("{} -> upstream exchange failed: {}", client, e);
                return error_reply(&query, ResponseCode::ServFail);
            }
        };

        match Message::from_vec(&reply_bytes) {
            Ok(reply) => {
                self.log_summary(client, &query, &reply, start);
                if let Some(name) = informative_name(&reply) {
                    // A full buffer drops the name
                    let _ = self.notify.try_send(name);
                }
            }
            Err(e) => debug!("{} -> unparseable upstream reply: {}", client, e),
        }

        Some(reply_bytes)
    }

    fn log_summary(&self, client: SocketAddr, query: &Message, reply: &Message, start: Instant) {
        let Some(question) = query.queries().first() else {
            return;
        };

        info!(
            "{} -> {} {} {} {} {:?}",
            client,
            question.name(),
            question.query_class(),
            type_name(question.query_type()),
            reply.response_code(),
            start.elapsed()
        );
    }
}

/// Reply carrying the client's questions and `code`
fn error_reply(query: &Message, code: ResponseCode) -> Option<Vec<u8>> {
    let mut reply = Message::error_msg(query.id(), query.op_code(), code);
    reply
        .set_recursion_desired(query.recursion_desired())
        .add_queries(query.queries().to_vec());

    match reply.to_vec() {
        Ok(bytes) => Some(bytes),
        Err(e) => {
            error!("Failed to encode {} reply: {}", code, e);
            None
        }
    }
}

/// Serve UDP datagrams until cancelled
pub async fn serve_udp(socket: UdpSocket, handler: Arc<RelayHandler>, cancel: CancellationToken) {
    let socket = Arc::new(socket);
    let mut buf = [0u8; MAX_UDP_SIZE];

    loop {
        let received = tokio::select! {
            _ = cancel.cancelled() => break,
            received = socket.recv_from(&mut buf) => received,
        };

        match received {
            Ok((len, src)) => {
                let data = buf[..len].to_vec();
                let handler = Arc::clone(&handler);
                let socket = Arc::clone(&socket);

                tokio::spawn(async move {
                    if let Some(reply) = handler.handle_query(&data, src).await
                        && let Err(e) = socket.send_to(&reply, src).await
                    {
                        warn!("Failed to send UDP reply to {}: {}", src, e);
                    }
                });
            }
            Err(e) => error!("UDP recv error: {}", e),
        }
    }

    debug!("UDP listener stopped");
}

/// Serve TCP connections until cancelled
pub async fn serve_tcp(
    listener: TcpListener,
    handler: Arc<RelayHandler>,
    cancel: CancellationToken,
) {
    loop {
        let accepted = tokio::select! {
            _ = cancel.cancelled() => break,
            accepted = listener.accept() => accepted,
        };

        match accepted {
            Ok((stream, src)) => {
                let handler = Arc::clone(&handler);
                let cancel = cancel.clone();

                tokio::spawn(async move {
                    tokio::select! {
                        _ = cancel.cancelled() => {}
                        result = handle_tcp_connection(stream, src, &handler) => {
                            if let Err(e) = result {
                                debug!("TCP connection error from {}: {}", src, e);
                            }
                        }
                    }
                });
            }
            Err(e) => error!("TCP accept error: {}", e),
        }
    }

    debug!("TCP listener stopped");
}

/// Queries on one connection, each with a 2-byte length prefix
async fn handle_tcp_connection(
    mut stream: TcpStream,
    src: SocketAddr,
    handler: &RelayHandler,
) -> std::io::Result<()> {
    loop {
        let mut len_buf = [0u8; 2];
        match stream.read_exact(&mut len_buf).await {
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(()),
            Err(e) => return Err(e),
        }

        let len = u16::from_be_bytes(len_buf) as usize;
        let mut data = vec![0u8; len];
        stream.read_exact(&mut data).await?;

        let Some(reply) = handler.handle_query(&data, src).await else {
            return Ok(());
        };

        let Ok(reply_len) = u16::try_from(reply.len()) else {
            warn!("{} -> reply too large for TCP framing", src);
            return Ok(());
        };
        stream.write_all(&reply_len.to_be_bytes()).await?;
        stream.write_all(&reply).await?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hickory_proto::op::{OpCode, Query};
    use hickory_proto::rr::Name;
    use std::str::FromStr;

    #[test]
    fn test_error_reply_copies_questions() {
        let mut query = Message::new();
        query
            .set_id(4321)
            .set_op_code(OpCode::Query)
            .set_recursion_desired(true)
            .add_query(Query::query(
                Name::from_str("example.com.").unwrap(),
                RecordType::ANY,
            ));

        let bytes = error_reply(&query, ResponseCode::NotImp).unwrap();
        let reply = Message::from_vec(&bytes).unwrap();

        assert_eq!(reply.id(), 4321);
        assert_eq!(reply.message_type(), MessageType::Response);
        assert_eq!(reply.response_code(), ResponseCode::NotImp);
        assert_eq!(reply.queries(), query.queries());
        assert!(reply.recursion_desired());
    }
}
