//! Analog stick model
//!
//! Each stick holds two 12-bit axes. Directional presets are derived from a
//! per-stick calibration table.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Exclusive upper bound of a stick axis
pub const AXIS_LIMIT: u16 = 0x1000;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StickError {
    #[error("Stick values must be in [0, {limit}), got {value}")]
    OutOfRange { value: i64, limit: u16 },

    #[error("Calibration {field} must be below {limit}, got {value}")]
    InvalidCalibration {
        field: &'static str,
        value: u16,
        limit: u16,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StickSide {
    Left,
    Right,
}

impl fmt::Display for StickSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StickSide::Left => write!(f, "left stick"),
            StickSide::Right => write!(f, "right stick"),
        }
    }
}

/// What to do with a stick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StickMotion {
    Center,
    Up,
    Down,
    Left,
    Right,
    Horizontal(i64),
    Vertical(i64),
}

/// Fully resolved stick directive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StickCommand {
    pub side: StickSide,
    pub motion: StickMotion,
}

/// Axis pair after a stick update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StickPosition {
    pub horizontal: u16,
    pub vertical: u16,
}

impl fmt::Display for StickPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.horizontal, self.vertical)
    }
}

/// Center and extents used by the directional presets
#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct StickCalibration {
    pub h_center: u16,
    pub v_center: u16,
    pub h_max_above: u16,
    pub h_max_below: u16,
    pub v_max_above: u16,
    pub v_max_below: u16,
}

impl StickCalibration {
    /// Rejects centers outside the axis range
    ///
    /// Extents are not checked; presets saturate at the range bounds.
    pub fn validate(&self) -> Result<(), StickError> {
        for (field, value) in [("h_center", self.h_center), ("v_center", self.v_center)] {
            if value >= AXIS_LIMIT {
                return Err(StickError::InvalidCalibration {
                    field,
                    value,
                    limit: AXIS_LIMIT,
                });
            }
        }
        Ok(())
    }

    fn clamped(self) -> Self {
        Self {
            h_center: self.h_center.min(AXIS_LIMIT - 1),
            v_center: self.v_center.min(AXIS_LIMIT - 1),
            ..self
        }
    }
}

impl Default for StickCalibration {
    fn default() -> Self {
        Self {
            h_center: 0x800,
            v_center: 0x800,
            h_max_above: 0x600,
            h_max_below: 0x600,
            v_max_above: 0x600,
            v_max_below: 0x600,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StickState {
    horizontal: u16,
    vertical: u16,
    calibration: StickCalibration,
}

impl StickState {
    /// Creates a centered stick
    ///
    /// Centers beyond the axis range are clamped to its last value, so the
    /// packed report can never carry a 13th bit.
    pub fn new(calibration: StickCalibration) -> Self {
        let calibration = calibration.clamped();
        Self {
            horizontal: calibration.h_center,
            vertical: calibration.v_center,
            calibration,
        }
    }

    fn checked(value: i64) -> Result<u16, StickError> {
        if (0..i64::from(AXIS_LIMIT)).contains(&value) {
            Ok(value as u16)
        } else {
            Err(StickError::OutOfRange {
                value,
                limit: AXIS_LIMIT,
            })
        }
    }

    // centers are already in range here; offsets may still overshoot
    fn preset(center: u16, offset: u16, above: bool) -> u16 {
        if above {
            center.saturating_add(offset).min(AXIS_LIMIT - 1)
        } else {
            center.saturating_sub(offset)
        }
    }

    pub fn set_horizontal(&mut self, value: i64) -> Result<(), StickError> {
        self.horizontal = Self::checked(value)?;
        Ok(())
    }

    pub fn set_vertical(&mut self, value: i64) -> Result<(), StickError> {
        self.vertical = Self::checked(value)?;
        Ok(())
    }

    pub fn horizontal(&self) -> u16 {
        self.horizontal
    }

    pub fn vertical(&self) -> u16 {
        self.vertical
    }

    pub fn set_center(&mut self) {
        self.horizontal = self.calibration.h_center;
        self.vertical = self.calibration.v_center;
    }

    pub fn set_up(&mut self) {
        let c = self.calibration;
        self.horizontal = c.h_center;
        self.vertical = Self::preset(c.v_center, c.v_max_above, true);
    }

    pub fn set_down(&mut self) {
        let c = self.calibration;
        self.horizontal = c.h_center;
        self.vertical = Self::preset(c.v_center, c.v_max_below, false);
    }

    pub fn set_left(&mut self) {
        let c = self.calibration;
        self.horizontal = Self::preset(c.h_center, c.h_max_below, false);
        self.vertical = c.v_center;
    }

    pub fn set_right(&mut self) {
        let c = self.calibration;
        self.horizontal = Self::preset(c.h_center, c.h_max_above, true);
        self.vertical = c.v_center;
    }

    /// Applies a motion and returns the resulting axis pair
    pub fn apply(&mut self, motion: StickMotion) -> Result<StickPosition, StickError> {
        match motion {
            StickMotion::Center => self.set_center(),
            StickMotion::Up => self.set_up(),
            StickMotion::Down => self.set_down(),
            StickMotion::Left => self.set_left(),
            StickMotion::Right => self.set_right(),
            StickMotion::Horizontal(value) => self.set_horizontal(value)?,
            StickMotion::Vertical(value) => self.set_vertical(value)?,
        }
        Ok(self.position())
    }

    pub fn position(&self) -> StickPosition {
        StickPosition {
            horizontal: self.horizontal,
            vertical: self.vertical,
        }
    }

    /// Packs both 12-bit axes into three report bytes
    pub fn to_bytes(&self) -> [u8; 3] {
        let h = self.horizontal;
        let v = self.vertical;
        [
            (h & 0xff) as u8,
            ((h >> 8) | ((v & 0xf) << 4)) as u8,
            (v >> 4) as u8,
        ]
    }
}
