//! Merges the button directives of one command line into a single action

use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    /// Press and release
    Tap,
    HoldDown,
    Release,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionKind::Tap => write!(f, "tap"),
            ActionKind::HoldDown => write!(f, "hold-down"),
            ActionKind::Release => write!(f, "release"),
        }
    }
}

/// One atomic button update covering every button of a line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ButtonAction {
    pub kind: ActionKind,
    pub buttons: Vec<String>,
}

/// `_d` / `_u` seen anywhere in the line
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControlFlags {
    pub hold_down: bool,
    pub release: bool,
}

impl ControlFlags {
    /// Hold-down wins over release, release over tap
    pub fn action_kind(&self) -> ActionKind {
        if self.hold_down {
            ActionKind::HoldDown
        } else if self.release {
            ActionKind::Release
        } else {
            ActionKind::Tap
        }
    }
}

/// Collects buttons and flags while a line is walked
#[derive(Debug, Default)]
pub struct ActionAggregator {
    flags: ControlFlags,
    buttons: BTreeSet<String>,
}

impl ActionAggregator {
    pub fn set_hold_down(&mut self) {
        self.flags.hold_down = true;
    }

    pub fn set_release(&mut self) {
        self.flags.release = true;
    }

    pub fn add_button(&mut self, name: &str) {
        self.buttons.insert(name.to_string());
    }

    pub fn flags(&self) -> ControlFlags {
        self.flags
    }

    /// The line's button action, or `None` when no button was named
    pub fn finish(self) -> Option<ButtonAction> {
        if self.buttons.is_empty() {
            return None;
        }
        Some(ButtonAction {
            kind: self.flags.action_kind(),
            buttons: self.buttons.into_iter().collect(),
        })
    }
}
