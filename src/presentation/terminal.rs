//! Operator terminal
//!
//! Single-character commands select which field the receiver prints, and
//! mirrored state is rendered in the serial-plotter line format
//! (`AccX:1.00,AccY:2.00,AccZ:3.00`).

use crate::domain::mirror::Mirror;
use crate::domain::models::Vector3;
use serde::{Deserialize, Serialize};

/// Operator commands read from the terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorCommand {
    ToggleAcceleration,
    ToggleGyroscope,
    ToggleMagnetometer,
}

impl OperatorCommand {
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'a' => Some(Self::ToggleAcceleration),
            'g' => Some(Self::ToggleGyroscope),
            'm' => Some(Self::ToggleMagnetometer),
            _ => None,
        }
    }
}

/// Which field gets printed
///
/// The first enabled flag wins, in the order acceleration, gyroscope,
/// magnetometer. With none enabled the button state is printed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrintMode {
    #[serde(default)]
    pub acceleration: bool,
    #[serde(default)]
    pub gyroscope: bool,
    #[serde(default)]
    pub magnetometer: bool,
}

impl PrintMode {
    pub fn apply(&mut self, command: OperatorCommand) {
        match command {
            OperatorCommand::ToggleAcceleration => self.acceleration = !self.acceleration,
            OperatorCommand::ToggleGyroscope => self.gyroscope = !self.gyroscope,
            OperatorCommand::ToggleMagnetometer => self.magnetometer = !self.magnetometer,
        }
    }

    /// Render one line of mirrored state
    pub fn render(&self, mirror: &Mirror) -> String {
        if self.acceleration {
            render_vector("Acc", mirror.acceleration)
        } else if self.gyroscope {
            render_vector("Gyr", mirror.angular_rate)
        } else if self.magnetometer {
            render_vector("Mag", mirror.magnetic_field)
        } else {
            format!("Button state:{}", u8::from(mirror.button_pressed))
        }
    }
}

fn render_vector(prefix: &str, v: Vector3) -> String {
    format!(
        "{prefix}X:{:.2},{prefix}Y:{:.2},{prefix}Z:{:.2}",
        v.x, v.y, v.z
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mirror() -> Mirror {
        Mirror {
            acceleration: Vector3::new(1.0, 2.0, 3.0),
            angular_rate: Vector3::new(-0.5, 0.25, 10.0),
            magnetic_field: Vector3::new(12.5, 0.0, -40.0),
            button_pressed: true,
        }
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(
            OperatorCommand::from_char('a'),
            Some(OperatorCommand::ToggleAcceleration)
        );
        assert_eq!(
            OperatorCommand::from_char('m'),
            Some(OperatorCommand::ToggleMagnetometer)
        );
        assert_eq!(OperatorCommand::from_char('x'), None);
        assert_eq!(OperatorCommand::from_char('A'), None);
    }

    #[test]
    fn test_default_prints_button() {
        assert_eq!(PrintMode::default().render(&mirror()), "Button state:1");
        assert_eq!(
            PrintMode::default().render(&Mirror::default()),
            "Button state:0"
        );
    }

    #[test]
    fn test_priority_order() {
        let mut mode = PrintMode::default();
        mode.apply(OperatorCommand::ToggleMagnetometer);
        assert_eq!(mode.render(&mirror()), "MagX:12.50,MagY:0.00,MagZ:-40.00");

        mode.apply(OperatorCommand::ToggleGyroscope);
        assert_eq!(mode.render(&mirror()), "GyrX:-0.50,GyrY:0.25,GyrZ:10.00");

        mode.apply(OperatorCommand::ToggleAcceleration);
        assert_eq!(mode.render(&mirror()), "AccX:1.00,AccY:2.00,AccZ:3.00");
    }

    #[test]
    fn test_toggle_twice_restores() {
        let mut mode = PrintMode::default();
        mode.apply(OperatorCommand::ToggleAcceleration);
        mode.apply(OperatorCommand::ToggleAcceleration);
        assert_eq!(mode, PrintMode::default());
    }
}
