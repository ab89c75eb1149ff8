//! Sensor Source (controller role)
//!
//! Bridges the IMU driver to the link. After [`SensorSource::start`] the
//! role is ticked cooperatively: each tick either notices a central
//! connecting or leaving, or runs one publish pass in which every field is
//! checked and published on its own. Fields never share a transaction, so a
//! receiver can see acceleration and angular rate sampled at slightly
//! different instants.

use crate::domain::models::{BdAddr, FieldValue, SourcePhase};
use crate::domain::registry::{FieldKey, ServiceSpec};
use crate::error::Result;
use crate::infrastructure::bluetooth::link::PeripheralLink;
use crate::infrastructure::bluetooth::protocol;
use crate::infrastructure::bluetooth::service::ControllerService;
use crate::infrastructure::imu::{AxisGroup, ButtonInput, ImuDriver};
use tracing::{debug, error, info, trace, warn};

pub struct SensorSource<P, I, B> {
    link: P,
    imu: I,
    button: B,
    service: ControllerService,
    phase: SourcePhase,
    central: Option<BdAddr>,
    /// Button state last delivered to a subscribed central; `None` forces
    /// the next pass to send the current state
    last_button: Option<bool>,
    published: [u64; 4],
}

impl<P: PeripheralLink, I: ImuDriver, B: ButtonInput> SensorSource<P, I, B> {
    pub fn new(link: P, imu: I, button: B, spec: ServiceSpec) -> Self {
        Self {
            link,
            imu,
            button,
            service: ControllerService::new(spec),
            phase: SourcePhase::Idle,
            central: None,
            last_button: None,
            published: [0; 4],
        }
    }

    /// Bring up the radio and the IMU. Any failure halts the role.
    pub fn start(&mut self) -> Result<()> {
        if let Err(e) = self.try_start() {
            error!("Controller halted: {}", e);
            self.phase = SourcePhase::Halted;
            return Err(e);
        }
        self.phase = SourcePhase::Waiting;
        Ok(())
    }

    fn try_start(&mut self) -> Result<()> {
        self.service.start(&mut self.link)?;
        info!("***BLE initialization complete***");

        self.imu.begin()?;
        info!("***IMU module started***");
        info!(
            "Accelerometer sample rate = {}Hz",
            self.imu.sample_rate(AxisGroup::Acceleration)
        );
        info!(
            "Gyroscope sample rate = {}Hz",
            self.imu.sample_rate(AxisGroup::Gyroscope)
        );
        info!(
            "Magnetometer sample rate = {}Hz",
            self.imu.sample_rate(AxisGroup::MagneticField)
        );
        info!("***IMU initialization complete***");
        Ok(())
    }

    /// Run one step of the controller loop
    pub fn tick(&mut self) -> SourcePhase {
        match self.phase {
            SourcePhase::Idle | SourcePhase::Halted => {}
            SourcePhase::Waiting => {
                if let Some(address) = self.link.central() {
                    info!("Connected to central device");
                    info!("MAC address: {}", address);
                    self.central = Some(address);
                    self.last_button = None;
                    self.phase = SourcePhase::Publishing;
                }
            }
            SourcePhase::Publishing => {
                if self.link.central().is_none() {
                    if let Some(address) = self.central.take() {
                        info!("Disconnected from central device {}", address);
                    }
                    self.last_button = None;
                    self.phase = SourcePhase::Waiting;
                } else {
                    self.publish_pass();
                }
            }
        }
        self.phase
    }

    fn publish_pass(&mut self) {
        for group in AxisGroup::ALL {
            if !self.imu.available(group) {
                continue;
            }
            match self.imu.read(group) {
                Ok(sample) => {
                    self.publish(group.field(), FieldValue::Vector3(sample));
                }
                Err(e) => warn!("Reading {:?} failed: {}", group, e),
            }
        }

        // Writes before the subscription are never delivered
        let pressed = self.button.is_pressed();
        if !self.link.subscribed(FieldKey::Button.uuid()) {
            self.last_button = None;
            return;
        }
        if self.last_button != Some(pressed)
            && self.publish(FieldKey::Button, FieldValue::Bool(pressed))
        {
            self.last_button = Some(pressed);
        }
    }

    fn publish(&mut self, key: FieldKey, value: FieldValue) -> bool {
        let spec = key.spec();
        let bytes = protocol::encode(&value);
        match self.link.write_value(key.uuid(), &bytes) {
            Ok(()) => {
                trace!("Writing {}: {:?} {}", spec.label, value, spec.unit);
                self.published[key.index()] += 1;
                true
            }
            // At most once: the next sample supersedes a lost one
            Err(e) => {
                debug!("Notification for {} dropped: {}", spec.label, e);
                false
            }
        }
    }

    pub fn phase(&self) -> SourcePhase {
        self.phase
    }

    /// Number of values handed to the link for a field
    pub fn published(&self, key: FieldKey) -> u64 {
        self.published[key.index()]
    }

    pub fn imu_mut(&mut self) -> &mut I {
        &mut self.imu
    }

    pub fn button_mut(&mut self) -> &mut B {
        &mut self.button
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::Vector3;
    use crate::domain::registry::{ACCELERATION_UUID, BUTTON_UUID, MAGNETIC_FIELD_UUID};
    use crate::error::Error;
    use crate::infrastructure::bluetooth::link::CentralLink;
    use crate::infrastructure::bluetooth::radio::{SimPeripheral, SimRadio};
    use crate::infrastructure::imu::scripted::{ScriptedButton, ScriptedImu};

    const ADDR: BdAddr = BdAddr([0xc0, 0, 0, 0, 0, 2]);

    type TestSource = SensorSource<SimPeripheral, ScriptedImu, ScriptedButton>;

    fn source(radio: &SimRadio) -> TestSource {
        SensorSource::new(
            radio.peripheral(ADDR),
            ScriptedImu::default(),
            ScriptedButton::default(),
            ServiceSpec::default(),
        )
    }

    /// Connect the radio's central and subscribe to every field
    fn attach_central(radio: &SimRadio) -> impl CentralLink {
        let mut central = radio.central();
        central.begin().unwrap();
        central.connect(ADDR).unwrap();
        central.discover_attributes().unwrap();
        for key in FieldKey::ALL {
            central.subscribe(key.uuid()).unwrap();
        }
        central
    }

    #[test]
    fn test_waits_for_central() {
        let radio = SimRadio::new();
        let mut source = source(&radio);
        source.start().unwrap();
        assert_eq!(source.tick(), SourcePhase::Waiting);
        assert_eq!(source.tick(), SourcePhase::Waiting);

        let _central = attach_central(&radio);
        assert_eq!(source.tick(), SourcePhase::Publishing);
    }

    #[test]
    fn test_fields_publish_independently() {
        let radio = SimRadio::new();
        let mut source = source(&radio);
        source.start().unwrap();
        let mut central = attach_central(&radio);
        source.tick();

        // only the magnetometer has a sample
        source
            .imu_mut()
            .push(AxisGroup::MagneticField, Vector3::new(1.0, 2.0, 3.0));
        source.tick();
        assert_eq!(source.published(FieldKey::MagneticField), 1);
        assert_eq!(source.published(FieldKey::Acceleration), 0);
        assert_eq!(source.published(FieldKey::AngularRate), 0);
        assert_eq!(source.imu_mut().reads(AxisGroup::Acceleration), 0);
        assert!(central.take_update(MAGNETIC_FIELD_UUID).is_some());
        assert!(central.take_update(ACCELERATION_UUID).is_none());

        // acceleration twice, gyroscope once, across two passes
        source.imu_mut().push(AxisGroup::Acceleration, Vector3::new(0.0, 0.0, 1.0));
        source.imu_mut().push(AxisGroup::Acceleration, Vector3::new(0.0, 0.0, 2.0));
        source.imu_mut().push(AxisGroup::Gyroscope, Vector3::new(5.0, 0.0, 0.0));
        source.tick();
        source.tick();
        assert_eq!(source.published(FieldKey::Acceleration), 2);
        assert_eq!(source.published(FieldKey::AngularRate), 1);
        assert_eq!(source.published(FieldKey::MagneticField), 1);

        // single-slot notification: the latest sample wins
        let bytes = central.take_update(ACCELERATION_UUID).unwrap();
        assert_eq!(
            protocol::decode_vector(&bytes).unwrap(),
            Vector3::new(0.0, 0.0, 2.0)
        );
    }

    #[test]
    fn test_button_sent_on_connect_then_on_change() {
        let radio = SimRadio::new();
        let mut source = source(&radio);
        source.start().unwrap();
        let mut central = attach_central(&radio);
        source.tick();

        // current state goes out once the central is listening
        source.tick();
        source.tick();
        assert_eq!(source.published(FieldKey::Button), 1);
        assert_eq!(central.take_update(BUTTON_UUID), Some(vec![0]));

        source.button_mut().pressed = true;
        source.tick();
        source.tick();
        assert_eq!(source.published(FieldKey::Button), 2);
        assert_eq!(central.take_update(BUTTON_UUID), Some(vec![1]));

        source.button_mut().pressed = false;
        source.tick();
        assert_eq!(source.published(FieldKey::Button), 3);
        assert_eq!(central.take_update(BUTTON_UUID), Some(vec![0]));
    }

    #[test]
    fn test_button_waits_for_subscription() {
        let radio = SimRadio::new();
        let mut source = source(&radio);
        source.start().unwrap();
        source.button_mut().pressed = true;

        let mut central = radio.central();
        central.begin().unwrap();
        central.connect(ADDR).unwrap();
        central.discover_attributes().unwrap();
        assert_eq!(source.tick(), SourcePhase::Publishing);
        source.tick();
        source.tick();
        assert_eq!(source.published(FieldKey::Button), 0);

        central.subscribe(BUTTON_UUID).unwrap();
        source.tick();
        assert_eq!(source.published(FieldKey::Button), 1);
        assert_eq!(central.take_update(BUTTON_UUID), Some(vec![1]));
    }

    #[test]
    fn test_held_button_resent_after_reconnect() {
        let radio = SimRadio::new();
        let mut source = source(&radio);
        source.start().unwrap();
        source.button_mut().pressed = true;
        let _central = attach_central(&radio);
        source.tick();
        source.tick();
        assert_eq!(source.published(FieldKey::Button), 1);

        radio.drop_link();
        assert_eq!(source.tick(), SourcePhase::Waiting);

        let mut central = attach_central(&radio);
        assert_eq!(source.tick(), SourcePhase::Publishing);
        source.tick();
        assert_eq!(source.published(FieldKey::Button), 2);
        assert_eq!(central.take_update(BUTTON_UUID), Some(vec![1]));
    }

    #[test]
    fn test_disconnect_returns_to_waiting() {
        let radio = SimRadio::new();
        let mut source = source(&radio);
        source.start().unwrap();
        let _central = attach_central(&radio);
        assert_eq!(source.tick(), SourcePhase::Publishing);

        radio.drop_link();
        assert_eq!(source.tick(), SourcePhase::Waiting);

        // samples taken while nobody listens are not published
        source.imu_mut().push(AxisGroup::Acceleration, Vector3::new(1.0, 1.0, 1.0));
        source.tick();
        assert_eq!(source.published(FieldKey::Acceleration), 0);

        let _central = attach_central(&radio);
        assert_eq!(source.tick(), SourcePhase::Publishing);
        source.tick();
        assert_eq!(source.published(FieldKey::Acceleration), 1);
    }

    #[test]
    fn test_stack_failure_halts() {
        let radio = SimRadio::new();
        radio.fail_peripheral_stack(ADDR);
        let mut source = source(&radio);
        assert!(matches!(source.start(), Err(Error::Link(_))));
        assert_eq!(source.tick(), SourcePhase::Halted);
    }

    #[test]
    fn test_imu_failure_halts() {
        let radio = SimRadio::new();
        let mut source = source(&radio);
        source.imu_mut().fail_begin = true;
        assert!(matches!(source.start(), Err(Error::Imu(_))));
        assert_eq!(source.phase(), SourcePhase::Halted);

        let _central = attach_central(&radio);
        assert_eq!(source.tick(), SourcePhase::Halted);
    }
}
