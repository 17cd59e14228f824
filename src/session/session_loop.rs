use statum::{machine, state};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{IncomingLine, LineOrigin};
use crate::command::{Interpreter, LineOutcome, Notice, Termination};
use crate::controller::ControllerHandle;

// Session states using statum's state macro
#[state]
#[derive(Debug, Clone)]
pub enum SessionState {
    Listening,
    Processing(IncomingLine),
    Terminated(Termination),
}

/// Typestate session driving command lines into the interpreter
///
/// A session is created in `Listening`, moves to `Processing` for every line
/// it receives and back, and ends in `Terminated` with the reason attached.
/// Lines are handled strictly one at a time, in arrival order, whatever input
/// source they came from.
///
/// Terminating cancels the shared [`CancellationToken`], which stops the UDP
/// listener and the console. The controller task keeps running until its last
/// handle is dropped.
#[machine]
#[derive(Debug)]
pub struct Session<S: SessionState> {
    // Lines from every input source
    lines: mpsc::Receiver<IncomingLine>,

    interpreter: Arc<Interpreter>,

    // Single writer for the controller
    controller: ControllerHandle,

    // Cancelled once the session terminates so input tasks stop
    shutdown: CancellationToken,

    lines_processed: u64,
}

pub enum Received {
    Line(Session<Processing>),
    Closed(Session<Terminated>),
}

pub enum Processed {
    Continue(Session<Listening>),
    Terminated(Session<Terminated>),
}

impl Session<Listening> {
    pub fn create(
        lines: mpsc::Receiver<IncomingLine>,
        interpreter: Arc<Interpreter>,
        controller: ControllerHandle,
        shutdown: CancellationToken,
    ) -> Self {
        info!("Creating session for {} controller", controller.kind());
        Self::new(lines, interpreter, controller, shutdown, 0)
    }

    // Wait for the next line from any source
    pub async fn receive(mut self) -> Received {
        match self.lines.recv().await {
            Some(line) => {
                debug!("Received {:?} from {}", line.text, line.origin);
                Received::Line(self.transition_with(line))
            }
            None => {
                info!("All input sources closed");
                Received::Closed(self.transition_with(Termination::InputClosed))
            }
        }
    }
}

impl Session<Processing> {
    // Run the line through the interpreter, then listen again or terminate
    pub async fn process(mut self) -> Processed {
        let Some(line) = self.get_state_data().cloned() else {
            warn!("No line found in state data, this should not happen");
            return Processed::Continue(self.transition());
        };

        let outcome = self.interpreter.execute(&line.text, &self.controller).await;
        self.lines_processed += 1;
        report(&line, &outcome);

        match outcome.termination {
            Some(termination) => {
                debug!("Transitioning to Terminated state: {}", termination);
                Processed::Terminated(self.transition_with(termination))
            }
            None => Processed::Continue(self.transition()),
        }
    }
}

impl Session<Terminated> {
    pub fn termination(&self) -> Termination {
        self.get_state_data()
            .copied()
            .unwrap_or(Termination::InputClosed)
    }

    /// Stops the input tasks and returns why the session ended
    pub fn finish(self) -> Termination {
        self.shutdown.cancel();
        let termination = self.termination();
        info!(
            "Session terminated ({}) after {} lines",
            termination, self.lines_processed
        );
        termination
    }
}

// Console lines get their notices echoed; everything is logged
fn report(line: &IncomingLine, outcome: &LineOutcome) {
    let elapsed = chrono::Local::now() - line.received_at;
    debug!(
        "Processed {} directives from {} in {} ms (action: {:?}, flushed: {})",
        outcome.directives,
        line.origin,
        elapsed.num_milliseconds(),
        outcome.action,
        outcome.flushed
    );

    for notice in &outcome.notices {
        if let Notice::Help(text) = notice {
            if line.origin != LineOrigin::Console {
                info!("Help requested by {}:\n{}", line.origin, text);
            }
        }
        if line.origin == LineOrigin::Console {
            println!("{}", notice);
        }
    }
}

/// Drives the session until exit, disconnection or the end of all input
pub async fn run_session(mut session: Session<Listening>) -> Termination {
    info!("Entering session loop");
    loop {
        match session.receive().await {
            Received::Line(processing) => match processing.process().await {
                Processed::Continue(listening) => session = listening,
                Processed::Terminated(terminated) => return terminated.finish(),
            },
            Received::Closed(terminated) => return terminated.finish(),
        }
    }
}

/// Like [`run_session`], but gives up as soon as `interrupt` completes
///
/// The input tasks are stopped either way.
pub async fn run_until_interrupted<F>(session: Session<Listening>, interrupt: F) -> Termination
where
    F: Future<Output = ()>,
{
    let shutdown = session.shutdown.clone();
    tokio::select! {
        termination = run_session(session) => termination,
        _ = interrupt => {
            info!("Interrupted, stopping session");
            shutdown.cancel();
            Termination::Interrupted
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::{
        ControllerKind, ControllerSettings, ControllerState, StickCalibration,
    };
    use crate::transport::testing::{DisconnectedLink, RecordingLink};
    use crate::transport::HostLink;
    use std::time::Duration;

    fn controller<L: HostLink>(link: L) -> ControllerHandle {
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
                queue_capacity: 8,
            }),
        )
    }

    async fn run_lines<L: HostLink>(
        link: L,
        lines: &[&str],
    ) -> (Termination, ControllerHandle, CancellationToken) {
        let (tx, rx) = mpsc::channel(16);
        for text in lines {
            tx.send(IncomingLine::new(LineOrigin::Console, *text))
                .await
                .unwrap();
        }
        drop(tx);

        let handle = controller(link);
        let shutdown = CancellationToken::new();
        let session = Session::<Listening>::create(
            rx,
            Arc::new(Interpreter::default()),
            handle.clone(),
            shutdown.clone(),
        );
        (run_session(session).await, handle, shutdown)
    }

    #[tokio::test]
    async fn exit_terminates_and_skips_later_lines() {
        let link = RecordingLink::default();
        let (termination, handle, shutdown) = run_lines(
            link.clone(),
            &["a", "", "stick r h 300", "exit", "b"],
        )
        .await;

        assert_eq!(termination, Termination::ExitRequested);
        assert!(shutdown.is_cancelled());

        // tap sends two reports, each flush one
        let reports = link.reports();
        assert_eq!(reports.len(), 4);
        assert_eq!(reports[0][3], 0b0000_1000);
        assert_eq!(&reports[3][9..12], &[0x2C, 0x01, 0x80]);

        let snapshot = handle.snapshot().await.unwrap();
        assert!(snapshot.pressed.is_empty());
        assert_eq!(snapshot.right_stick.horizontal, 300);
    }

    #[tokio::test]
    async fn closed_input_terminates() {
        let link = RecordingLink::default();
        let (termination, _, _) = run_lines(link.clone(), &["a|_d"]).await;

        assert_eq!(termination, Termination::InputClosed);
        assert_eq!(link.reports().len(), 1);
    }

    #[tokio::test]
    async fn host_disconnect_terminates() {
        let (termination, _, shutdown) =
            run_lines(DisconnectedLink, &["", "a"]).await;

        assert_eq!(termination, Termination::HostDisconnected);
        assert!(shutdown.is_cancelled());
    }

    #[tokio::test]
    async fn errors_do_not_end_the_session() {
        let link = RecordingLink::default();
        let (termination, handle, _) = run_lines(
            link.clone(),
            &["stick x up", "nope", "stick l h abc", "zl|_d"],
        )
        .await;

        assert_eq!(termination, Termination::InputClosed);
        // three flushes and one hold
        assert_eq!(link.reports().len(), 4);
        assert_eq!(handle.snapshot().await.unwrap().pressed, vec!["zl"]);
    }

    #[tokio::test]
    async fn interrupt_stops_an_idle_session() {
        // sender stays alive so only the interrupt can end the session
        let (tx, rx) = mpsc::channel(4);
        let shutdown = CancellationToken::new();
        let session = Session::<Listening>::create(
            rx,
            Arc::new(Interpreter::default()),
            controller(RecordingLink::default()),
            shutdown.clone(),
        );

        let termination = run_until_interrupted(session, async {}).await;

        assert_eq!(termination, Termination::Interrupted);
        assert_eq!(termination.to_string(), "interrupted");
        assert!(shutdown.is_cancelled());
        drop(tx);
    }
}
