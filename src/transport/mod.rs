//! Downstream link to the connected host
//!
//! The controller task hands every serialized input report to a [`HostLink`].
//! A link that has lost its peer reports [`TransportError::NotConnected`],
//! which ends the session normally.

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use tokio::net::UdpSocket;
use tracing::{debug, info};

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Host is not connected")]
    NotConnected,

    #[error("Transport I/O error: {0}")]
    Io(#[from] io::Error),
}

impl TransportError {
    /// Classifies an I/O failure, treating peer loss as disconnection
    pub fn from_io(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::NotConnected
            | io::ErrorKind::BrokenPipe => TransportError::NotConnected,
            _ => TransportError::Io(err),
        }
    }
}

/// Destination of serialized input reports
///
/// A link is owned by the controller task and awaited from inside it, one
/// report at a time. Sending must therefore be asynchronous; a link never
/// blocks the runtime thread while the host catches up.
///
/// Errors are classified by the link itself. Returning
/// [`TransportError::NotConnected`] means the host is gone for good and the
/// session ends; any other error only fails the directive that caused the send.
pub trait HostLink: Send + 'static {
    /// Hands one complete report to the host
    fn send_report(
        &mut self,
        report: &[u8],
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Short human-readable name of the destination, used in logs
    fn describe(&self) -> String;
}

/// Sends reports as datagrams to a fixed host
///
/// The socket is connected to the target, so an ICMP "port unreachable"
/// from a vanished host surfaces on the next send as
/// [`TransportError::NotConnected`].
pub struct UdpHostLink {
    socket: UdpSocket,
    target: SocketAddr,
}

impl UdpHostLink {
    pub async fn connect(target: SocketAddr) -> Result<Self, TransportError> {
        let local: SocketAddr = if target.is_ipv4() {
            SocketAddr::from(([0, 0, 0, 0], 0))
        } else {
            SocketAddr::from(([0u16; 8], 0))
        };
        let socket = UdpSocket::bind(local).await?;
        socket.connect(target).await.map_err(TransportError::from_io)?;
        info!("Host link connected to {}", target);
        Ok(Self { socket, target })
    }
}

impl HostLink for UdpHostLink {
    async fn send_report(&mut self, report: &[u8]) -> Result<(), TransportError> {
        self.socket
            .send(report)
            .await
            .map(|_| ())
            .map_err(TransportError::from_io)
    }

    fn describe(&self) -> String {
        format!("udp://{}", self.target)
    }
}

/// Only logs reports; used when no host target is configured
#[derive(Default)]
pub struct LogLink {
    sent: u64,
}

impl HostLink for LogLink {
    async fn send_report(&mut self, report: &[u8]) -> Result<(), TransportError> {
        self.sent += 1;
        debug!("Report #{}: {:02x?}", self.sent, report);
        Ok(())
    }

    fn describe(&self) -> String {
        "log only".to_string()
    }
}
