//! `stick <side> <direction> [value]`
//!
//! Resolves the stick mini-language into a [`StickCommand`] without touching
//! the controller. A directive that fails here never reaches the stick model.

use crate::controller::{StickCommand, StickMotion, StickSide};

use super::error::CommandError;

pub const DESCRIPTION: &str = "stick <side> <direction> [value] - set stick positions.
    side: 'l', 'left' for the left stick; 'r', 'right' for the right stick
    direction: 'center', 'up', 'down', 'left', 'right';
               'h', 'horizontal' or 'v', 'vertical' to set the axis to \"value\"
    value: horizontal or vertical axis value";

pub fn parse_side(side: &str) -> Result<StickSide, CommandError> {
    match side {
        "l" | "left" => Ok(StickSide::Left),
        "r" | "right" => Ok(StickSide::Right),
        other => Err(CommandError::InvalidSide(other.to_string())),
    }
}

fn parse_value(value: Option<&str>) -> Result<i64, CommandError> {
    let value = value.ok_or(CommandError::MissingValue)?;
    value
        .parse()
        .map_err(|_| CommandError::InvalidValue(value.to_string()))
}

/// Maps a direction and optional value to a motion
///
/// The value is only looked at for the axis directions.
pub fn parse_motion(direction: &str, value: Option<&str>) -> Result<StickMotion, CommandError> {
    match direction {
        "center" => Ok(StickMotion::Center),
        "up" => Ok(StickMotion::Up),
        "down" => Ok(StickMotion::Down),
        "left" => Ok(StickMotion::Left),
        "right" => Ok(StickMotion::Right),
        "h" | "horizontal" => Ok(StickMotion::Horizontal(parse_value(value)?)),
        "v" | "vertical" => Ok(StickMotion::Vertical(parse_value(value)?)),
        other => Err(CommandError::InvalidDirection(other.to_string())),
    }
}

/// Resolves the arguments following `stick`
pub fn resolve(args: &[&str]) -> Result<StickCommand, CommandError> {
    let side = args.first().ok_or(CommandError::MissingArgument("side"))?;
    let side = parse_side(side)?;
    let direction = args
        .get(1)
        .ok_or(CommandError::MissingArgument("direction"))?;
    let motion = parse_motion(direction, args.get(2).copied())?;
    Ok(StickCommand { side, motion })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_ignore_value() {
        let command = resolve(&["l", "center"]).unwrap();
        assert_eq!(command, StickCommand { side: StickSide::Left, motion: StickMotion::Center });

        let command = resolve(&["right", "up", "not-a-number"]).unwrap();
        assert_eq!(command, StickCommand { side: StickSide::Right, motion: StickMotion::Up });
    }

    #[test]
    fn axis_values() {
        assert_eq!(
            resolve(&["r", "h", "300"]).unwrap().motion,
            StickMotion::Horizontal(300)
        );
        assert_eq!(
            resolve(&["left", "vertical", "-5"]).unwrap().motion,
            StickMotion::Vertical(-5)
        );
    }

    #[test]
    fn malformed_arguments() {
        assert!(matches!(
            resolve(&["r", "h", "abc"]),
            Err(CommandError::InvalidValue(v)) if v == "abc"
        ));
        assert!(matches!(resolve(&["r", "v"]), Err(CommandError::MissingValue)));
        assert!(matches!(
            resolve(&["x", "up"]),
            Err(CommandError::InvalidSide(s)) if s == "x"
        ));
        assert!(matches!(
            resolve(&["l", "sideways"]),
            Err(CommandError::InvalidDirection(d)) if d == "sideways"
        ));
        assert!(matches!(resolve(&[]), Err(CommandError::MissingArgument("side"))));
        assert!(matches!(
            resolve(&["l"]),
            Err(CommandError::MissingArgument("direction"))
        ));
    }

    #[test]
    fn side_is_checked_before_direction() {
        assert!(matches!(
            resolve(&["x", "sideways"]),
            Err(CommandError::InvalidSide(_))
        ));
    }
}
