//! Controller subsystem: the emulated gamepad and its single writer
//!
//! ```text
//! Session ─[ControllerAction]→ ControllerHandle task ─► ControllerState ─[report]→ HostLink
//!           (mpsc + oneshot)
//! ```
//!
//! 1. [`buttons`] - button names per controller kind and their report bits
//! 2. [`stick`] - 12-bit analog sticks with calibrated presets
//! 3. [`state`] - the full model and report serialization
//! 4. [`controller_handle`] - the task that owns the state and serializes all mutations

pub mod buttons;
pub mod controller_handle;
pub mod state;
pub mod stick;

use crate::transport::TransportError;

pub use buttons::{ButtonState, ControllerKind};
pub use controller_handle::{ControllerHandle, ControllerSettings};
pub use state::{ControllerSnapshot, ControllerState};
pub use stick::{
    StickCalibration, StickCommand, StickError, StickMotion, StickPosition, StickSide, StickState,
};

#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    #[error("Button \"{0}\" is not available on this controller")]
    UnknownButton(String),

    #[error(transparent)]
    Stick(#[from] StickError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Channel error: {0}")]
    ChannelError(String),

    #[error("Initialization error: {0}")]
    InitializationError(String),
}

impl ControllerError {
    /// True when the host link is gone and the session should end
    pub fn is_disconnect(&self) -> bool {
        matches!(self, ControllerError::Transport(TransportError::NotConnected))
    }
}
