use crate::transport::{HostLink, TransportError};
use tracing::{debug, trace};

use super::buttons::{ButtonState, ControllerKind};
use super::stick::{StickCalibration, StickCommand, StickError, StickPosition, StickSide, StickState};
use super::ControllerError;

/// Report id of the standard full input report
pub const STANDARD_REPORT_ID: u8 = 0x30;

/// Battery full, connection info "Pro controller / USB powered"
const CONNECTION_INFO: u8 = 0x90;

pub const REPORT_LEN: usize = 13;

/// Read-only copy of the controller state
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ControllerSnapshot {
    pub kind: ControllerKind,
    pub pressed: Vec<&'static str>,
    pub left_stick: StickPosition,
    pub right_stick: StickPosition,
    pub reports_sent: u64,
}

/// Complete controller model plus the link its reports go out on
///
/// Only the controller task owns this; everything else goes through
/// [`super::controller_handle::ControllerHandle`].
pub struct ControllerState<L: HostLink> {
    buttons: ButtonState,
    left_stick: StickState,
    right_stick: StickState,
    link: L,
    timer: u8,
    reports_sent: u64,
}

impl<L: HostLink> ControllerState<L> {
    pub fn new(
        kind: ControllerKind,
        left_calibration: StickCalibration,
        right_calibration: StickCalibration,
        link: L,
    ) -> Self {
        debug!(
            "Creating {} state, reports go to {}",
            kind,
            link.describe()
        );
        Self {
            buttons: ButtonState::new(kind),
            left_stick: StickState::new(left_calibration),
            right_stick: StickState::new(right_calibration),
            link,
            timer: 0,
            reports_sent: 0,
        }
    }

    pub fn kind(&self) -> ControllerKind {
        self.buttons.kind()
    }

    pub fn press<S: AsRef<str>>(&mut self, names: &[S]) -> Result<(), ControllerError> {
        self.buttons.set_buttons(names, true)
    }

    pub fn release<S: AsRef<str>>(&mut self, names: &[S]) -> Result<(), ControllerError> {
        self.buttons.set_buttons(names, false)
    }

    pub fn stick_mut(&mut self, side: StickSide) -> &mut StickState {
        match side {
            StickSide::Left => &mut self.left_stick,
            StickSide::Right => &mut self.right_stick,
        }
    }

    pub fn apply_stick(&mut self, command: StickCommand) -> Result<StickPosition, StickError> {
        self.stick_mut(command.side).apply(command.motion)
    }

    /// Serializes the current state into a standard input report
    pub fn report(&self) -> [u8; REPORT_LEN] {
        let mut report = [0u8; REPORT_LEN];
        report[0] = STANDARD_REPORT_ID;
        report[1] = self.timer;
        report[2] = CONNECTION_INFO;
        report[3..6].copy_from_slice(&self.buttons.to_bytes());
        report[6..9].copy_from_slice(&self.left_stick.to_bytes());
        report[9..12].copy_from_slice(&self.right_stick.to_bytes());
        // vibrator input report stays zero
        report
    }

    /// Sends the current snapshot to the host
    pub async fn send(&mut self) -> Result<(), TransportError> {
        let report = self.report();
        trace!("Sending report {:02x?}", report);
        self.link.send_report(&report).await?;
        self.timer = self.timer.wrapping_add(1);
        self.reports_sent += 1;
        Ok(())
    }

    pub fn snapshot(&self) -> ControllerSnapshot {
        ControllerSnapshot {
            kind: self.kind(),
            pressed: self.buttons.pressed(),
            left_stick: self.left_stick.position(),
            right_stick: self.right_stick.position(),
            reports_sent: self.reports_sent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::stick::StickMotion;
    use crate::transport::testing::{DisconnectedLink, RecordingLink};

    fn state_with<L: HostLink>(link: L) -> ControllerState<L> {
        ControllerState::new(
            ControllerKind::ProController,
            StickCalibration::default(),
            StickCalibration::default(),
            link,
        )
    }

    #[tokio::test]
    async fn report_layout() {
        let link = RecordingLink::default();
        let mut state = state_with(link.clone());
        state.press(&["a", "l"]).unwrap();
        state
            .apply_stick(StickCommand {
                side: StickSide::Right,
                motion: StickMotion::Horizontal(300),
            })
            .unwrap();

        state.send().await.unwrap();
        state.send().await.unwrap();

        let reports = link.reports();
        assert_eq!(reports.len(), 2);
        assert_eq!(
            reports[0],
            vec![0x30, 0, 0x90, 0x08, 0x00, 0x40, 0x00, 0x08, 0x80, 0x2C, 0x01, 0x80, 0x00]
        );
        // timer advances per report
        assert_eq!(reports[1][1], 1);
        assert_eq!(state.snapshot().reports_sent, 2);
    }

    #[tokio::test]
    async fn failed_send_is_not_counted() {
        let mut state = state_with(DisconnectedLink);
        assert!(matches!(state.send().await, Err(TransportError::NotConnected)));
        assert_eq!(state.snapshot().reports_sent, 0);
        assert_eq!(state.report()[1], 0);
    }

    #[test]
    fn snapshot_lists_pressed_buttons() {
        let mut state = state_with(RecordingLink::default());
        state.press(&["zr", "home"]).unwrap();
        state.release(&["home"]).unwrap();
        let snapshot = state.snapshot();
        assert_eq!(snapshot.pressed, vec!["zr"]);
        assert_eq!(snapshot.left_stick, StickPosition { horizontal: 0x800, vertical: 0x800 });
    }
}
