// Passive DNS Relay Module
//
// Forwards client DNS traffic and learns names from informative replies.

pub mod inspector;
pub mod server;
pub mod upstream;

pub use inspector::informative_name;
pub use server::RelayHandler;
pub use upstream::{UdpUpstream, Upstream};

use crate::error::ColumbusError;
use crate::scheduler::{JobSender, UpdateJob};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, UdpSocket};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Relay settings
#[derive(Debug, Clone)]
pub struct RelaySettings {
    pub listen_address: SocketAddr,
    /// Capacity of the notification buffer
    pub buffer_size: usize,
    /// Tasks moving notified names into the update queue
    pub workers: usize,
    pub upstream_timeout: Duration,
    /// Sleep step while the update queue is at its soft limit
    pub queue_backoff: Duration,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            listen_address: SocketAddr::from(([0, 0, 0, 0], 1053)),
            buffer_size: 1000,
            workers: 4,
            upstream_timeout: Duration::from_secs(5),
            queue_backoff: Duration::from_secs(60),
        }
    }
}

/// Running relay
pub struct PassiveDnsRelay {
    udp_addr: SocketAddr,
    tcp_addr: SocketAddr,
    cancel: CancellationToken,
    handles: Vec<JoinHandle<()>>,
}

impl PassiveDnsRelay {
    /// Bind both listeners and start serving under a child of `parent`
    pub async fn start(
        settings: &RelaySettings,
        upstream: Arc<dyn Upstream>,
        jobs: JobSender,
        parent: &CancellationToken,
    ) -> crate::Result<Self> {
        let bind_error = |e: std::io::Error| ColumbusError::ConfigError {
            message: format!("Failed to bind relay on {}: {}", settings.listen_address, e),
        };

        let socket = UdpSocket::bind(settings.listen_address)
            .await
            .map_err(bind_error)?;
        let udp_addr = socket.local_addr()?;

        // Same port for TCP, also when an ephemeral port was requested
        let listener = TcpListener::bind(SocketAddr::new(settings.listen_address.ip(), udp_addr.port()))
            .await
            .map_err(bind_error)?;
        let tcp_addr = listener.local_addr()?;

        let (tx, rx) = mpsc::channel(settings.buffer_size.max(1));
        let handler = Arc::new(RelayHandler::new(upstream, tx));
        let cancel = parent.child_token();
        let mut handles = Vec::new();

        handles.push(tokio::spawn(server::serve_udp(
            socket,
            Arc::clone(&handler),
            cancel.clone(),
        )));
        handles.push(tokio::spawn(server::serve_tcp(
            listener,
            handler,
            cancel.clone(),
        )));

        let rx = Arc::new(Mutex::new(rx));
        for id in 0..settings.workers.max(1) {
            handles.push(tokio::spawn(insert_worker(
                id,
                Arc::clone(&rx),
                jobs.clone(),
                settings.queue_backoff,
                cancel.clone(),
            )));
        }

        info!(
            "Passive DNS relay listening on {} (udp) and {} (tcp)",
            udp_addr, tcp_addr
        );

        Ok(Self {
            udp_addr,
            tcp_addr,
            cancel,
            handles,
        })
    }

    pub fn udp_addr(&self) -> SocketAddr {
        self.udp_addr
    }

    pub fn tcp_addr(&self) -> SocketAddr {
        self.tcp_addr
    }

    /// Stop listeners and insert workers
    pub async fn shutdown(self) {
        self.cancel.cancel();
        for handle in self.handles {
            if let Err(e) = handle.await {
                error!("Relay task failed: {}", e);
            }
        }
        info!("Passive DNS relay stopped");
    }
}

/// Drain notified names into the update queue, holding back at its soft
/// limit. Names arriving meanwhile pile up in the notification buffer and
/// are dropped once it is full.
async fn insert_worker(
    id: usize,
    rx: Arc<Mutex<mpsc::Receiver<String>>>,
    jobs: JobSender,
    backoff: Duration,
    cancel: CancellationToken,
) {
    loop {
        let name = tokio::select! {
            _ = cancel.cancelled() => break,
            name = async { rx.lock().await.recv().await } => name,
        };

        let Some(name) = name else {
            break;
        };

        if !jobs.wait_below_soft_limit(backoff, &cancel).await {
            break;
        }

        let sent = tokio::select! {
            _ = cancel.cancelled() => break,
            sent = jobs.enqueue(UpdateJob::insert_new(name.clone())) => sent,
        };
        if let Err(e) = sent {
            error!("Relay worker {} failed to queue {}: {}", id, name, e);
            break;
        }
        debug!("Relay worker {} queued {}", id, name);
    }
}
