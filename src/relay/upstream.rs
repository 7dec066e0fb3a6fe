// Upstream Exchange
//
// Forwards a raw DNS message to one of the configured resolvers and returns
// the raw reply.

use crate::error::ColumbusError;
use async_trait::async_trait;
use rand::seq::SliceRandom;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;
use tokio::net::UdpSocket;

/// Largest UDP payload accepted from an upstream
pub const MAX_UDP_SIZE: usize = 4096;

#[async_trait]
pub trait Upstream: Send + Sync {
    /// Send `request` and return the reply bytes unmodified
    async fn exchange(&self, request: &[u8]) -> crate::Result<Vec<u8>>;
}

/// Plain UDP forwarding to a random configured resolver
pub struct UdpUpstream {
    servers: Vec<SocketAddr>,
    timeout: Duration,
}

impl UdpUpstream {
    pub fn new(servers: Vec<SocketAddr>, timeout: Duration) -> crate::Result<Self> {
        if servers.is_empty() {
            return Err(ColumbusError::ConfigError {
                message: "No upstream resolvers configured".to_string(),
            });
        }
        Ok(Self { servers, timeout })
    }

    fn pick(&self) -> SocketAddr {
        // servers is never empty
        *self
            .servers
            .choose(&mut rand::thread_rng())
            .unwrap_or(&self.servers[0])
    }

    async fn exchange_with(&self, server: SocketAddr, request: &[u8]) -> crate::Result<Vec<u8>> {
        let bind: SocketAddr = if server.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };

        let socket = UdpSocket::bind(bind).await?;
        socket.connect(server).await?;
        socket.send(request).await?;

        let mut buf = vec![0u8; MAX_UDP_SIZE];
        loop {
            let len = socket.recv(&mut buf).await?;
            // Ignore stray datagrams with a different message id
            if len >= 2 && request.len() >= 2 && buf[..2] == request[..2] {
                buf.truncate(len);
                return Ok(buf);
            }
        }
    }
}

#[async_trait]
impl Upstream for UdpUpstream {
    async fn exchange(&self, request: &[u8]) -> crate::Result<Vec<u8>> {
        let server = self.pick();
        tokio::time::timeout(self.timeout, self.exchange_with(server, request))
            .await
            .map_err(|_| ColumbusError::Other(format!("Upstream {} timed out", server)))?
    }
}
