//! Datagram input: one UDP payload is one command line

use color_eyre::{eyre::WrapErr, Result};
use std::net::SocketAddr;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::{IncomingLine, LineOrigin};

pub struct UdpListener {
    socket: UdpSocket,
    buffer_size: usize,
}

impl UdpListener {
    pub async fn bind(address: SocketAddr, buffer_size: usize) -> Result<Self> {
        let socket = UdpSocket::bind(address)
            .await
            .wrap_err_with(|| format!("Failed to bind UDP listener on {}", address))?;
        info!("Listening for commands on udp://{}", socket.local_addr()?);
        Ok(Self {
            socket,
            buffer_size,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Forwards every received datagram until shutdown or until the session is gone
    pub fn spawn(
        self,
        lines: mpsc::Sender<IncomingLine>,
        shutdown: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            self.run(lines, shutdown).await;
            info!("UDP listener stopped");
        })
    }

    async fn run(self, lines: mpsc::Sender<IncomingLine>, shutdown: CancellationToken) {
        let mut buf = vec![0u8; self.buffer_size];
        loop {
            let received = tokio::select! {
                _ = shutdown.cancelled() => break,
                received = self.socket.recv_from(&mut buf) => received,
            };

            let (len, peer) = match received {
                Ok(received) => received,
                Err(e) => {
                    // ICMP errors from earlier sends surface here; keep listening
                    error!("Failed to receive datagram: {}", e);
                    continue;
                }
            };

            let text = match std::str::from_utf8(&buf[..len]) {
                Ok(text) => text,
                Err(e) => {
                    warn!("Dropping {} byte datagram from {}: {}", len, peer, e);
                    continue;
                }
            };

            debug!("Datagram from {}: {:?}", peer, text);
            if lines
                .send(IncomingLine::new(LineOrigin::Datagram(peer), text))
                .await
                .is_err()
            {
                debug!("Session is gone, stopping listener");
                break;
            }
        }
    }
}
