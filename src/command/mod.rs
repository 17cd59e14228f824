//! Command interpreter for the text control protocol
//!
//! A received line flows one way through this module:
//!
//! ```text
//! raw text ─► grammar::parse_line ─► grammar::classify ─┬─► ActionAggregator ─► one button action
//!                                                       ├─► SubCommandRegistry ─► immediate requests
//!                                                       └─► exit / help / notices
//! ```
//!
//! Per-directive failures become [`Notice`]s and never abort the rest of the
//! line. Only `exit` and a lost host link end the session.

pub mod aggregator;
pub mod error;
pub mod grammar;
pub mod registry;
pub mod stick;

use std::fmt;
use tracing::{debug, info, warn};

use crate::controller::{ControllerError, StickCommand, StickPosition};

pub use aggregator::{ActionAggregator, ActionKind, ButtonAction, ControlFlags};
pub use error::{CommandError, RegistryError};
pub use grammar::{Directive, DirectiveKind};
pub use registry::{ControllerRequest, SubCommandRegistry};

/// What the interpreter needs from the controller
#[allow(async_fn_in_trait)]
pub trait ControllerPort {
    /// Button names valid for the controller right now
    fn available_buttons(&self) -> &[&str];

    /// Press and release
    async fn push_buttons(&self, buttons: &[String]) -> Result<(), ControllerError>;

    async fn hold_buttons(&self, buttons: &[String]) -> Result<(), ControllerError>;

    async fn release_buttons(&self, buttons: &[String]) -> Result<(), ControllerError>;

    async fn apply_stick(&self, command: StickCommand) -> Result<StickPosition, ControllerError>;

    /// Sends the current state to the host
    async fn flush(&self) -> Result<(), ControllerError>;
}

/// Why a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    ExitRequested,
    HostDisconnected,
    /// Every input source has gone away
    InputClosed,
    /// The process received an interrupt signal
    Interrupted,
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Termination::ExitRequested => write!(f, "exit requested"),
            Termination::HostDisconnected => write!(f, "connection was lost"),
            Termination::InputClosed => write!(f, "all inputs closed"),
            Termination::Interrupted => write!(f, "interrupted"),
        }
    }
}

/// Operator-facing message produced while running a line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Unrecognized(String),
    Failed { directive: String, error: String },
    Info(String),
    Help(String),
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::Unrecognized(name) => {
                write!(f, "command {} not found, call help for help.", name)
            }
            Notice::Failed { directive, error } => write!(f, "{}: {}", directive, error),
            Notice::Info(text) | Notice::Help(text) => write!(f, "{}", text),
        }
    }
}

/// Result of running one command line
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LineOutcome {
    pub directives: usize,
    pub action: Option<ButtonAction>,
    pub flushed: bool,
    pub notices: Vec<Notice>,
    pub termination: Option<Termination>,
}

impl LineOutcome {
    fn fail(&mut self, directive: &str, error: impl fmt::Display) {
        warn!("{} failed: {}", directive, error);
        self.notices.push(Notice::Failed {
            directive: directive.to_string(),
            error: error.to_string(),
        });
    }
}

#[derive(Debug)]
pub struct Interpreter {
    registry: SubCommandRegistry,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new(SubCommandRegistry::with_defaults())
    }
}

impl Interpreter {
    pub fn new(registry: SubCommandRegistry) -> Self {
        Self { registry }
    }

    /// Runs one received line against the controller
    pub async fn execute<P: ControllerPort>(&self, line: &str, port: &P) -> LineOutcome {
        let directives = grammar::parse_line(line);
        let available = port.available_buttons();
        let mut outcome = LineOutcome {
            directives: directives.len(),
            ..LineOutcome::default()
        };
        let mut aggregator = ActionAggregator::default();

        for directive in &directives {
            let kind = grammar::classify(directive.name, available, |name| {
                self.registry.contains(name)
            });
            match kind {
                DirectiveKind::Exit => {
                    debug!("Exit requested, skipping the rest of the line");
                    outcome.termination = Some(Termination::ExitRequested);
                    return outcome;
                }
                DirectiveKind::HoldDown => aggregator.set_hold_down(),
                DirectiveKind::Release => aggregator.set_release(),
                DirectiveKind::Button => aggregator.add_button(directive.name),
                DirectiveKind::Help => {
                    outcome
                        .notices
                        .push(Notice::Help(self.registry.help_text(available)));
                }
                DirectiveKind::SubCommand => {
                    if let Some(termination) =
                        self.dispatch(directive, port, &mut outcome).await
                    {
                        outcome.termination = Some(termination);
                        return outcome;
                    }
                }
                DirectiveKind::Reserved => {
                    debug!("Ignoring reserved control token \"{}\"", directive.name);
                }
                DirectiveKind::Unknown => {
                    warn!("command {} not found", directive.name);
                    outcome
                        .notices
                        .push(Notice::Unrecognized(directive.name.to_string()));
                }
            }
        }

        match aggregator.finish() {
            Some(action) => {
                debug!("Issuing {} for {:?}", action.kind, action.buttons);
                if let Err(e) = perform(&action, port).await {
                    if e.is_disconnect() {
                        info!("Connection was lost.");
                        outcome.termination = Some(Termination::HostDisconnected);
                    } else {
                        outcome.fail(&action.kind.to_string(), e);
                    }
                }
                outcome.action = Some(action);
            }
            None => match port.flush().await {
                Ok(()) => outcome.flushed = true,
                Err(e) if e.is_disconnect() => {
                    info!("Connection was lost.");
                    outcome.termination = Some(Termination::HostDisconnected);
                }
                Err(e) => outcome.fail("flush", e),
            },
        }

        outcome
    }

    // Runs a sub-command's requests right away; returns a termination on disconnect
    async fn dispatch<P: ControllerPort>(
        &self,
        directive: &Directive<'_>,
        port: &P,
        outcome: &mut LineOutcome,
    ) -> Option<Termination> {
        let Some(command) = self.registry.get(directive.name) else {
            return None;
        };

        let requests = match command.resolve(&directive.args) {
            Ok(requests) => requests,
            Err(e) => {
                outcome.fail(directive.name, e);
                return None;
            }
        };

        for request in requests {
            match execute_request(&request, port).await {
                Ok(Some(message)) => {
                    info!("{}", message);
                    outcome.notices.push(Notice::Info(message));
                }
                Ok(None) => {}
                Err(e) if e.is_disconnect() => {
                    info!("Connection was lost.");
                    return Some(Termination::HostDisconnected);
                }
                Err(e) => {
                    // remaining requests of this directive are skipped
                    outcome.fail(directive.name, e);
                    return None;
                }
            }
        }
        None
    }
}

async fn perform<P: ControllerPort>(action: &ButtonAction, port: &P) -> Result<(), ControllerError> {
    match action.kind {
        ActionKind::HoldDown => port.hold_buttons(&action.buttons).await,
        ActionKind::Release => port.release_buttons(&action.buttons).await,
        ActionKind::Tap => port.push_buttons(&action.buttons).await,
    }
}

async fn execute_request<P: ControllerPort>(
    request: &ControllerRequest,
    port: &P,
) -> Result<Option<String>, ControllerError> {
    match request {
        ControllerRequest::Stick(command) => {
            let position = port.apply_stick(*command).await?;
            Ok(Some(format!("{} was set to {}.", command.side, position)))
        }
        ControllerRequest::Buttons(action) => perform(action, port).await.map(|_| None),
        ControllerRequest::Flush => port.flush().await.map(|_| None),
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::controller::{StickCalibration, StickSide, StickState};
    use crate::transport::TransportError;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub(crate) enum PortCall {
        Push(Vec<String>),
        Hold(Vec<String>),
        Release(Vec<String>),
        Stick(StickCommand),
        Flush,
    }

    /// Controller double that records every call
    pub(crate) struct RecordingPort {
        buttons: Vec<&'static str>,
        calls: Mutex<Vec<PortCall>>,
        sticks: Mutex<[StickState; 2]>,
        pub(crate) disconnected: bool,
    }

    impl RecordingPort {
        pub(crate) fn new(buttons: &[&'static str]) -> Self {
            Self {
                buttons: buttons.to_vec(),
                calls: Mutex::new(Vec::new()),
                sticks: Mutex::new([
                    StickState::new(StickCalibration::default()),
                    StickState::new(StickCalibration::default()),
                ]),
                disconnected: false,
            }
        }

        pub(crate) fn calls(&self) -> Vec<PortCall> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: PortCall) -> Result<(), ControllerError> {
            self.calls.lock().unwrap().push(call);
            if self.disconnected {
                Err(TransportError::NotConnected.into())
            } else {
                Ok(())
            }
        }
    }

    impl ControllerPort for RecordingPort {
        fn available_buttons(&self) -> &[&str] {
            &self.buttons
        }

        async fn push_buttons(&self, buttons: &[String]) -> Result<(), ControllerError> {
            self.record(PortCall::Push(buttons.to_vec()))
        }

        async fn hold_buttons(&self, buttons: &[String]) -> Result<(), ControllerError> {
            self.record(PortCall::Hold(buttons.to_vec()))
        }

        async fn release_buttons(&self, buttons: &[String]) -> Result<(), ControllerError> {
            self.record(PortCall::Release(buttons.to_vec()))
        }

        async fn apply_stick(
            &self,
            command: StickCommand,
        ) -> Result<StickPosition, ControllerError> {
            self.calls.lock().unwrap().push(PortCall::Stick(command));
            let mut sticks = self.sticks.lock().unwrap();
            let index = match command.side {
                StickSide::Left => 0,
                StickSide::Right => 1,
            };
            Ok(sticks[index].apply(command.motion)?)
        }

        async fn flush(&self) -> Result<(), ControllerError> {
            self.record(PortCall::Flush)
        }
    }
}
