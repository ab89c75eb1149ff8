//! Receiver-side mirror of the controller's fields
//!
//! The mirror holds the last notified value of each field. It is a cache:
//! values go stale silently when notifications stop arriving.

use crate::domain::models::{FieldValue, Vector3};
use crate::domain::registry::FieldKey;
use tracing::warn;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Mirror {
    pub acceleration: Vector3,
    pub angular_rate: Vector3,
    pub magnetic_field: Vector3,
    pub button_pressed: bool,
}

impl Mirror {
    /// Store a decoded value. Returns false if the value type does not
    /// match the field.
    pub fn apply(&mut self, key: FieldKey, value: FieldValue) -> bool {
        match (key, value) {
            (FieldKey::Acceleration, FieldValue::Vector3(v)) => self.acceleration = v,
            (FieldKey::AngularRate, FieldValue::Vector3(v)) => self.angular_rate = v,
            (FieldKey::MagneticField, FieldValue::Vector3(v)) => self.magnetic_field = v,
            (FieldKey::Button, FieldValue::Bool(b)) => self.button_pressed = b,
            (key, value) => {
                warn!("Ignoring {:?} value for field {:?}", value.kind(), key);
                return false;
            }
        }
        true
    }

    pub fn get(&self, key: FieldKey) -> FieldValue {
        match key {
            FieldKey::Acceleration => FieldValue::Vector3(self.acceleration),
            FieldKey::AngularRate => FieldValue::Vector3(self.angular_rate),
            FieldKey::MagneticField => FieldValue::Vector3(self.magnetic_field),
            FieldKey::Button => FieldValue::Bool(self.button_pressed),
        }
    }
}
