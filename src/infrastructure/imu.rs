//! IMU driver seam
//!
//! The controller reads its sensors through [`ImuDriver`] and its push
//! button through [`ButtonInput`]. [`SimulatedImu`] and [`SimulatedButton`]
//! stand in for the LSM9DS1 and the physical switch when no hardware is
//! attached.

use crate::domain::models::Vector3;
use crate::domain::registry::FieldKey;
use crate::domain::settings::SimulationSettings;
use crate::error::ImuError;
use std::time::{Duration, Instant};

/// Sensor axis groups exposed by the driver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AxisGroup {
    /// Accelerometer, in g
    Acceleration,
    /// Gyroscope, in degrees per second
    Gyroscope,
    /// Magnetometer, in microtesla
    MagneticField,
}

impl AxisGroup {
    pub const ALL: [AxisGroup; 3] = [
        AxisGroup::Acceleration,
        AxisGroup::Gyroscope,
        AxisGroup::MagneticField,
    ];

    /// Field this group is published as
    pub fn field(self) -> FieldKey {
        match self {
            Self::Acceleration => FieldKey::Acceleration,
            Self::Gyroscope => FieldKey::AngularRate,
            Self::MagneticField => FieldKey::MagneticField,
        }
    }
}

/// Nine-axis IMU driver
pub trait ImuDriver {
    /// One-time start. May block until the sensor answers.
    fn begin(&mut self) -> Result<(), ImuError>;

    /// True when a sample newer than the last read is ready
    fn available(&mut self, group: AxisGroup) -> bool;

    /// Read the latest three-axis sample
    fn read(&mut self, group: AxisGroup) -> Result<Vector3, ImuError>;

    /// Output data rate in Hz
    fn sample_rate(&self, group: AxisGroup) -> f32;
}

/// Momentary push button
pub trait ButtonInput {
    fn is_pressed(&mut self) -> bool;
}

#[derive(Debug)]
struct GroupClock {
    period: Duration,
    next_due: Instant,
}

/// Synthetic nine-axis sensor producing a slow wobble around level
#[derive(Debug)]
pub struct SimulatedImu {
    rates: [f32; 3],
    clocks: Option<[GroupClock; 3]>,
    started_at: Instant,
}

impl SimulatedImu {
    pub fn new(settings: &SimulationSettings) -> Self {
        Self {
            rates: [
                settings.acceleration_rate_hz,
                settings.gyroscope_rate_hz,
                settings.magnetometer_rate_hz,
            ],
            clocks: None,
            started_at: Instant::now(),
        }
    }

    fn index(group: AxisGroup) -> usize {
        match group {
            AxisGroup::Acceleration => 0,
            AxisGroup::Gyroscope => 1,
            AxisGroup::MagneticField => 2,
        }
    }

    fn sample_at(group: AxisGroup, t: f32) -> Vector3 {
        let (s, c) = (t.sin(), t.cos());
        match group {
            AxisGroup::Acceleration => Vector3::new(0.1 * s, 0.1 * c, 1.0),
            AxisGroup::Gyroscope => Vector3::new(30.0 * c, -20.0 * s, 10.0 * (2.0 * t).sin()),
            AxisGroup::MagneticField => Vector3::new(25.0 * c, 25.0 * s, -40.0),
        }
    }
}

impl ImuDriver for SimulatedImu {
    fn begin(&mut self) -> Result<(), ImuError> {
        let mut periods = [Duration::ZERO; 3];
        for (period, rate) in periods.iter_mut().zip(self.rates) {
            if !(rate.is_finite() && rate > 0.0) {
                return Err(ImuError::BeginFailed(format!("invalid sample rate {rate} Hz")));
            }
            *period = Duration::try_from_secs_f32(1.0 / rate).map_err(|e| {
                ImuError::BeginFailed(format!("sample rate {rate} Hz out of range: {e}"))
            })?;
        }
        let now = Instant::now();
        self.started_at = now;
        self.clocks = Some(periods.map(|period| GroupClock {
            period,
            next_due: now,
        }));
        Ok(())
    }

    fn available(&mut self, group: AxisGroup) -> bool {
        self.clocks
            .as_ref()
            .map(|clocks| Instant::now() >= clocks[Self::index(group)].next_due)
            .unwrap_or(false)
    }

    fn read(&mut self, group: AxisGroup) -> Result<Vector3, ImuError> {
        let clocks = self
            .clocks
            .as_mut()
            .ok_or_else(|| ImuError::ReadFailed("not started".into()))?;
        let clock = &mut clocks[Self::index(group)];
        let now = Instant::now();
        clock.next_due = (clock.next_due + clock.period).max(now);
        let t = now.duration_since(self.started_at).as_secs_f32();
        Ok(Self::sample_at(group, t))
    }

    fn sample_rate(&self, group: AxisGroup) -> f32 {
        self.rates[Self::index(group)]
    }
}

/// Button that toggles on a fixed period; a zero period never presses
#[derive(Debug)]
pub struct SimulatedButton {
    period: Duration,
    started_at: Instant,
}

impl SimulatedButton {
    pub fn new(settings: &SimulationSettings) -> Self {
        Self {
            period: Duration::from_millis(settings.button_period_ms),
            started_at: Instant::now(),
        }
    }
}

impl ButtonInput for SimulatedButton {
    fn is_pressed(&mut self) -> bool {
        if self.period.is_zero() {
            return false;
        }
        let elapsed = self.started_at.elapsed().as_millis();
        (elapsed / self.period.as_millis()) % 2 == 1
    }
}

#[cfg(test)]
pub mod scripted {
    //! Deterministic driver fixtures

    use super::*;
    use std::collections::VecDeque;

    /// IMU that yields queued samples; a group is available while its queue
    /// is non-empty
    #[derive(Debug, Default)]
    pub struct ScriptedImu {
        pub fail_begin: bool,
        queues: [VecDeque<Vector3>; 3],
        read_counts: [usize; 3],
    }

    impl ScriptedImu {
        pub fn push(&mut self, group: AxisGroup, sample: Vector3) {
            self.queues[SimulatedImu::index(group)].push_back(sample);
        }

        pub fn reads(&self, group: AxisGroup) -> usize {
            self.read_counts[SimulatedImu::index(group)]
        }
    }

    impl ImuDriver for ScriptedImu {
        fn begin(&mut self) -> Result<(), ImuError> {
            if self.fail_begin {
                return Err(ImuError::BeginFailed("no response on I2C".into()));
            }
            Ok(())
        }

        fn available(&mut self, group: AxisGroup) -> bool {
            !self.queues[SimulatedImu::index(group)].is_empty()
        }

        fn read(&mut self, group: AxisGroup) -> Result<Vector3, ImuError> {
            let index = SimulatedImu::index(group);
            self.read_counts[index] += 1;
            self.queues[index]
                .pop_front()
                .ok_or_else(|| ImuError::ReadFailed("no sample".into()))
        }

        fn sample_rate(&self, group: AxisGroup) -> f32 {
            match group {
                AxisGroup::MagneticField => 20.0,
                _ => 119.0,
            }
        }
    }

    #[derive(Debug, Default)]
    pub struct ScriptedButton {
        pub pressed: bool,
    }

    impl ButtonInput for ScriptedButton {
        fn is_pressed(&mut self) -> bool {
            self.pressed
        }
    }
}
