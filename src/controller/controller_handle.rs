//! Controller Handle - single writer for the emulated controller
//!
//! The [`ControllerState`] lives inside one tokio task. Every entry point
//! (datagram listener, stdin console) submits [`ControllerAction`]s through a
//! cloned [`ControllerHandle`] and waits for the reply on a oneshot channel.
//! Requests are handled strictly one after another, so a tap from one command
//! line can never interleave with a mutation from another.

use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use super::buttons::ControllerKind;
use super::state::{ControllerSnapshot, ControllerState};
use super::stick::{StickCommand, StickPosition};
use super::ControllerError;
use crate::command::ControllerPort;
use crate::transport::HostLink;

/// Timing and queueing settings of the controller task
///
/// Built from the `[controller]` config section by
/// [`crate::config::ControllerConfig::settings`]; tests pass their own to get
/// zero-length taps.
///
/// # Behaviour Impact
///
/// - `tap_duration`: the host samples reports on its own schedule, so taps
///   shorter than one host poll may go unnoticed
/// - `queue_capacity`: senders wait once the queue is full, which throttles a
///   flooding client instead of dropping its commands
///
/// # Examples
///
/// ```rust,ignore
/// use remotepad::controller::ControllerSettings;
///
/// // Menu navigation, where the host only needs a short pulse
/// let quick = ControllerSettings {
///     tap_duration: Duration::from_millis(50),
///     ..ControllerSettings::default()
/// };
/// ```
#[derive(Clone, Debug)]
pub struct ControllerSettings {
    /// How long a tap keeps its buttons pressed before releasing them
    ///
    /// The controller task sleeps this long between the press report and the
    /// release report. Nothing else is processed meanwhile, so long taps delay
    /// every following command line.
    pub tap_duration: Duration,

    /// Capacity of the request queue between handles and the task
    ///
    /// Only one session submits requests at a time, so a small queue is enough.
    pub queue_capacity: usize,
}

impl Default for ControllerSettings {
    /// Settings matching the stock button press duration
    fn default() -> Self {
        Self {
            tap_duration: Duration::from_millis(100), // one host poll with margin
            queue_capacity: 32,
        }
    }
}

type Reply<T> = oneshot::Sender<Result<T, ControllerError>>;

/// Requests understood by the controller task
#[derive(Debug)]
pub enum ControllerAction {
    Push {
        buttons: Vec<String>,
        response_tx: Reply<()>,
    },
    Hold {
        buttons: Vec<String>,
        response_tx: Reply<()>,
    },
    Release {
        buttons: Vec<String>,
        response_tx: Reply<()>,
    },
    Stick {
        command: StickCommand,
        response_tx: Reply<StickPosition>,
    },
    Flush {
        response_tx: Reply<()>,
    },
    Snapshot {
        response_tx: oneshot::Sender<ControllerSnapshot>,
    },
}

macro_rules! reply {
    ($result:expr, $response_tx:expr) => {
        if $response_tx.send($result).is_err() {
            warn!("Controller request was dropped before its reply arrived");
        }
    };
}

/// Cloneable gateway to the controller task
///
/// Every method sends one [`ControllerAction`] and waits for the task's reply,
/// so callers observe each request fully applied (including its reports) before
/// the method returns. The handle itself holds no controller state; the
/// controller kind is cached only to answer
/// [`ControllerPort::available_buttons`] without a round trip.
///
/// # Errors
///
/// Besides the request's own failure, every method returns
/// [`ControllerError::ChannelError`] once the task has stopped. A
/// [`ControllerError::Transport`] with `NotConnected` means the host is gone;
/// see [`ControllerError::is_disconnect`].
#[derive(Clone, Debug)]
pub struct ControllerHandle {
    kind: ControllerKind,
    tx: mpsc::Sender<ControllerAction>,
}

impl ControllerHandle {
    /// Moves the state into its own task and returns the handle to it
    ///
    /// The task ends once every handle has been dropped.
    pub fn spawn<L: HostLink>(
        state: ControllerState<L>,
        settings: Option<ControllerSettings>,
    ) -> Self {
        let settings = settings.unwrap_or_default();
        let kind = state.kind();
        info!(
            "Spawning controller task for {} with settings: {:?}",
            kind, settings
        );

        let (tx, rx) = mpsc::channel(settings.queue_capacity);
        tokio::spawn(run_controller_task(state, rx, settings));

        Self { kind, tx }
    }

    pub fn kind(&self) -> ControllerKind {
        self.kind
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(Reply<T>) -> ControllerAction,
    ) -> Result<T, ControllerError> {
        let (response_tx, response_rx) = oneshot::channel();
        self.tx
            .send(build(response_tx))
            .await
            .map_err(|_| ControllerError::ChannelError("controller task has stopped".to_string()))?;
        response_rx.await.map_err(|_| {
            ControllerError::ChannelError("controller task dropped the request".to_string())
        })?
    }

    pub async fn push(&self, buttons: Vec<String>) -> Result<(), ControllerError> {
        self.request(|response_tx| ControllerAction::Push {
            buttons,
            response_tx,
        })
        .await
    }

    pub async fn hold(&self, buttons: Vec<String>) -> Result<(), ControllerError> {
        self.request(|response_tx| ControllerAction::Hold {
            buttons,
            response_tx,
        })
        .await
    }

    pub async fn release(&self, buttons: Vec<String>) -> Result<(), ControllerError> {
        self.request(|response_tx| ControllerAction::Release {
            buttons,
            response_tx,
        })
        .await
    }

    pub async fn stick(&self, command: StickCommand) -> Result<StickPosition, ControllerError> {
        self.request(|response_tx| ControllerAction::Stick {
            command,
            response_tx,
        })
        .await
    }

    pub async fn flush(&self) -> Result<(), ControllerError> {
        self.request(|response_tx| ControllerAction::Flush { response_tx })
            .await
    }

    pub async fn snapshot(&self) -> Result<ControllerSnapshot, ControllerError> {
        let (response_tx, response_rx) = oneshot::channel();
        self.tx
            .send(ControllerAction::Snapshot { response_tx })
            .await
            .map_err(|_| ControllerError::ChannelError("controller task has stopped".to_string()))?;
        response_rx
            .await
            .map_err(|_| ControllerError::ChannelError("controller task dropped the request".to_string()))
    }
}

impl ControllerPort for ControllerHandle {
    fn available_buttons(&self) -> &[&str] {
        self.kind.available_buttons()
    }

    async fn push_buttons(&self, buttons: &[String]) -> Result<(), ControllerError> {
        self.push(buttons.to_vec()).await
    }

    async fn hold_buttons(&self, buttons: &[String]) -> Result<(), ControllerError> {
        self.hold(buttons.to_vec()).await
    }

    async fn release_buttons(&self, buttons: &[String]) -> Result<(), ControllerError> {
        self.release(buttons.to_vec()).await
    }

    async fn apply_stick(&self, command: StickCommand) -> Result<StickPosition, ControllerError> {
        self.stick(command).await
    }

    async fn flush(&self) -> Result<(), ControllerError> {
        ControllerHandle::flush(self).await
    }
}

async fn tap<L: HostLink>(
    state: &mut ControllerState<L>,
    buttons: &[String],
    duration: Duration,
) -> Result<(), ControllerError> {
    state.press(buttons)?;
    if let Err(e) = state.send().await {
        // never leave buttons stuck in the model
        state.release(buttons)?;
        return Err(e.into());
    }
    tokio::time::sleep(duration).await;
    state.release(buttons)?;
    state.send().await?;
    Ok(())
}

async fn hold<L: HostLink>(
    state: &mut ControllerState<L>,
    buttons: &[String],
) -> Result<(), ControllerError> {
    state.press(buttons)?;
    state.send().await?;
    Ok(())
}

async fn release<L: HostLink>(
    state: &mut ControllerState<L>,
    buttons: &[String],
) -> Result<(), ControllerError> {
    state.release(buttons)?;
    state.send().await?;
    Ok(())
}

async fn run_controller_task<L: HostLink>(
    mut state: ControllerState<L>,
    mut rx: mpsc::Receiver<ControllerAction>,
    settings: ControllerSettings,
) {
    info!("Controller task started");
    while let Some(action) = rx.recv().await {
        debug!("Controller request: {:?}", action);
        match action {
            ControllerAction::Push {
                buttons,
                response_tx,
            } => {
                reply!(tap(&mut state, &buttons, settings.tap_duration).await, response_tx);
            }
            ControllerAction::Hold {
                buttons,
                response_tx,
            } => {
                reply!(hold(&mut state, &buttons).await, response_tx);
            }
            ControllerAction::Release {
                buttons,
                response_tx,
            } => {
                reply!(release(&mut state, &buttons).await, response_tx);
            }
            ControllerAction::Stick {
                command,
                response_tx,
            } => {
                reply!(state.apply_stick(command).map_err(Into::into), response_tx);
            }
            ControllerAction::Flush { response_tx } => {
                reply!(state.send().await.map_err(Into::into), response_tx);
            }
            ControllerAction::Snapshot { response_tx } => {
                if response_tx.send(state.snapshot()).is_err() {
                    error!("Snapshot requester went away");
                }
            }
        }
    }
    info!("Controller task finished, all handles dropped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::stick::{StickCalibration, StickMotion, StickSide};
    use crate::transport::testing::{DisconnectedLink, RecordingLink};

    fn spawn_with<L: HostLink>(link: L) -> ControllerHandle {
        let state = ControllerState::new(
            ControllerKind::ProController,
            StickCalibration::default(),
            StickCalibration::default(),
            link,
        );
        ControllerHandle::spawn(
            state,
            Some(ControllerSettings {
                tap_duration: Duration::ZERO,
                queue_capacity: 4,
            }),
        )
    }

    #[tokio::test]
    async fn tap_presses_then_releases() {
        let link = RecordingLink::default();
        let handle = spawn_with(link.clone());

        handle.push(vec!["a".into(), "b".into()]).await.unwrap();

        let reports = link.reports();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0][3], 0b0000_1100);
        assert_eq!(reports[1][3], 0);
        assert!(handle.snapshot().await.unwrap().pressed.is_empty());
    }

    #[tokio::test]
    async fn hold_and_release_send_one_report_each() {
        let link = RecordingLink::default();
        let handle = spawn_with(link.clone());

        handle.hold(vec!["zl".into()]).await.unwrap();
        assert_eq!(handle.snapshot().await.unwrap().pressed, vec!["zl"]);
        handle.release(vec!["zl".into()]).await.unwrap();

        let reports = link.reports();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0][5], 0b1000_0000);
        assert_eq!(reports[1][5], 0);
    }

    #[tokio::test]
    async fn stick_updates_do_not_send() {
        let link = RecordingLink::default();
        let handle = spawn_with(link.clone());

        let position = handle
            .stick(StickCommand {
                side: StickSide::Left,
                motion: StickMotion::Up,
            })
            .await
            .unwrap();
        assert_eq!(position, StickPosition { horizontal: 0x800, vertical: 0xE00 });
        assert!(link.reports().is_empty());

        let err = handle
            .stick(StickCommand {
                side: StickSide::Left,
                motion: StickMotion::Vertical(5000),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ControllerError::Stick(_)));
    }

    #[tokio::test]
    async fn disconnect_surfaces_and_tap_does_not_stick() {
        let handle = spawn_with(DisconnectedLink);

        assert!(handle.flush().await.unwrap_err().is_disconnect());
        assert!(handle.push(vec!["a".into()]).await.unwrap_err().is_disconnect());
        assert!(handle.snapshot().await.unwrap().pressed.is_empty());
    }

    #[tokio::test]
    async fn unknown_button_is_rejected() {
        let link = RecordingLink::default();
        let handle = spawn_with(link.clone());

        let err = handle.hold(vec!["sr".into()]).await.unwrap_err();
        assert!(matches!(err, ControllerError::UnknownButton(name) if name == "sr"));
        assert!(link.reports().is_empty());
    }
}
