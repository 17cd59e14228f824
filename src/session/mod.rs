//! Session subsystem: input sources and the loop that feeds the interpreter
//!
//! ```text
//! UdpListener ──┐
//!               ├─[IncomingLine]→ Session ─► Interpreter ─► ControllerHandle
//! Console ──────┘  (mpsc)
//! ```
//!
//! Both sources share one channel, so lines are processed strictly one at a
//! time no matter where they come from.

pub mod console;
pub mod listener;
pub mod session_loop;

use chrono::{DateTime, Local};
use std::fmt;
use std::net::SocketAddr;

pub use listener::UdpListener;
pub use session_loop::{run_session, run_until_interrupted, Session};

/// Where a line came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineOrigin {
    Datagram(SocketAddr),
    Console,
}

impl fmt::Display for LineOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LineOrigin::Datagram(peer) => write!(f, "udp {}", peer),
            LineOrigin::Console => write!(f, "console"),
        }
    }
}

/// One complete command line waiting to be processed
#[derive(Debug, Clone)]
pub struct IncomingLine {
    pub origin: LineOrigin,
    pub text: String,
    pub received_at: DateTime<Local>,
}

impl IncomingLine {
    pub fn new(origin: LineOrigin, text: impl Into<String>) -> Self {
        Self {
            origin,
            text: text.into(),
            received_at: Local::now(),
        }
    }
}
