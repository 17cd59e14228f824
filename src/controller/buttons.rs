//! Button model of the emulated controller
//!
//! Buttons are kept as three bitfield bytes in the order the input report
//! expects them: right, shared, left.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::ControllerError;

/// Which physical controller is being emulated
///
/// The kind decides which button names a command line may use.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControllerKind {
    #[default]
    ProController,
    JoyconL,
    JoyconR,
}

impl fmt::Display for ControllerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControllerKind::ProController => write!(f, "pro_controller"),
            ControllerKind::JoyconL => write!(f, "joycon_l"),
            ControllerKind::JoyconR => write!(f, "joycon_r"),
        }
    }
}

impl std::str::FromStr for ControllerKind {
    type Err = ControllerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pro_controller" | "pro" => Ok(ControllerKind::ProController),
            "joycon_l" | "left" => Ok(ControllerKind::JoyconL),
            "joycon_r" | "right" => Ok(ControllerKind::JoyconR),
            other => Err(ControllerError::InitializationError(format!(
                "unknown controller kind \"{}\"",
                other
            ))),
        }
    }
}

const PRO_CONTROLLER_BUTTONS: &[&str] = &[
    "y", "x", "b", "a", "r", "zr", "minus", "plus", "r_stick", "l_stick", "home", "capture",
    "down", "up", "right", "left", "l", "zl",
];

const JOYCON_R_BUTTONS: &[&str] = &[
    "y", "x", "b", "a", "sr", "sl", "r", "zr", "plus", "r_stick", "home",
];

const JOYCON_L_BUTTONS: &[&str] = &[
    "minus", "l_stick", "capture", "down", "up", "right", "left", "sr", "sl", "l", "zl",
];

impl ControllerKind {
    /// Button names a command line may reference for this kind
    pub fn available_buttons(&self) -> &'static [&'static str] {
        match self {
            ControllerKind::ProController => PRO_CONTROLLER_BUTTONS,
            ControllerKind::JoyconR => JOYCON_R_BUTTONS,
            ControllerKind::JoyconL => JOYCON_L_BUTTONS,
        }
    }

    pub fn has_button(&self, name: &str) -> bool {
        self.available_buttons().contains(&name)
    }
}

// Byte index inside the three button bytes
const RIGHT: usize = 0;
const SHARED: usize = 1;
const LEFT: usize = 2;

/// Pressed/released state of every button, packed for the input report
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ButtonState {
    kind: ControllerKind,
    bytes: [u8; 3],
}

impl ButtonState {
    pub fn new(kind: ControllerKind) -> Self {
        Self {
            kind,
            bytes: [0; 3],
        }
    }

    pub fn kind(&self) -> ControllerKind {
        self.kind
    }

    fn locate(&self, name: &str) -> Option<(usize, u8)> {
        if !self.kind.has_button(name) {
            return None;
        }

        let location = match name {
            "y" => (RIGHT, 0),
            "x" => (RIGHT, 1),
            "b" => (RIGHT, 2),
            "a" => (RIGHT, 3),
            "r" => (RIGHT, 6),
            "zr" => (RIGHT, 7),
            "minus" => (SHARED, 0),
            "plus" => (SHARED, 1),
            "r_stick" => (SHARED, 2),
            "l_stick" => (SHARED, 3),
            "home" => (SHARED, 4),
            "capture" => (SHARED, 5),
            "down" => (LEFT, 0),
            "up" => (LEFT, 1),
            "right" => (LEFT, 2),
            "left" => (LEFT, 3),
            "l" => (LEFT, 6),
            "zl" => (LEFT, 7),
            // sr/sl sit on the side of the joycon they belong to
            "sr" | "sl" => {
                let byte = if self.kind == ControllerKind::JoyconR {
                    RIGHT
                } else {
                    LEFT
                };
                (byte, if name == "sr" { 4 } else { 5 })
            }
            _ => return None,
        };

        Some(location)
    }

    /// Sets every named button to `pressed`
    ///
    /// All names are validated first, so an unknown name leaves the state untouched.
    pub fn set_buttons<S: AsRef<str>>(
        &mut self,
        names: &[S],
        pressed: bool,
    ) -> Result<(), ControllerError> {
        let mut locations = Vec::with_capacity(names.len());
        for name in names {
            let name = name.as_ref();
            let location = self
                .locate(name)
                .ok_or_else(|| ControllerError::UnknownButton(name.to_string()))?;
            locations.push(location);
        }

        for (byte, bit) in locations {
            if pressed {
                self.bytes[byte] |= 1 << bit;
            } else {
                self.bytes[byte] &= !(1 << bit);
            }
        }
        Ok(())
    }

    pub fn is_pressed(&self, name: &str) -> bool {
        match self.locate(name) {
            Some((byte, bit)) => self.bytes[byte] & (1 << bit) != 0,
            None => false,
        }
    }

    /// Names of all currently pressed buttons
    pub fn pressed(&self) -> Vec<&'static str> {
        self.kind
            .available_buttons()
            .iter()
            .copied()
            .filter(|name| self.is_pressed(name))
            .collect()
    }

    pub fn to_bytes(&self) -> [u8; 3] {
        self.bytes
    }
}
