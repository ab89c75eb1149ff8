//! Controller GATT Service
//!
//! Builds the advertised service from the field registry and brings the
//! peripheral stack up in the required order: start the stack, register the
//! service, write a default value to every field, then advertise.

use crate::domain::models::{CharacteristicDef, CharacteristicProperties, FieldValue, ServiceDef};
use crate::domain::registry::{ServiceSpec, FIELDS};
use crate::error::LinkError;
use crate::infrastructure::bluetooth::link::PeripheralLink;
use crate::infrastructure::bluetooth::protocol;
use tracing::info;

/// The controller's service, built from the registry
#[derive(Debug, Clone)]
pub struct ControllerService {
    spec: ServiceSpec,
}

impl ControllerService {
    pub fn new(spec: ServiceSpec) -> Self {
        Self { spec }
    }

    /// Service definition with one notify characteristic per field
    pub fn definition(&self) -> ServiceDef {
        let characteristics = FIELDS
            .iter()
            .map(|field| CharacteristicDef {
                uuid: field.uuid,
                properties: CharacteristicProperties::NOTIFY,
                value_len: field.kind.wire_len(),
                initial_value: protocol::encode(&FieldValue::default_for(field.kind)),
            })
            .collect();

        ServiceDef {
            uuid: self.spec.service_uuid,
            characteristics,
        }
    }

    /// Start the stack, register the service and begin advertising
    pub fn start<P: PeripheralLink>(&self, link: &mut P) -> Result<(), LinkError> {
        link.begin()?;
        info!("***Started BLE module***");

        link.set_local_name(&self.spec.local_name);
        link.set_advertised_service(self.spec.service_uuid);
        info!(
            "Set advertised local name {:?} and service UUID {}",
            self.spec.local_name, self.spec.service_uuid
        );

        let definition = self.definition();
        let initial: Vec<_> = definition
            .characteristics
            .iter()
            .map(|c| (c.uuid, c.initial_value.clone()))
            .collect();
        link.add_service(definition)?;
        info!("Added service with {} characteristics", initial.len());

        for (uuid, value) in &initial {
            link.write_value(*uuid, value)?;
        }
        info!("Wrote initial characteristic values");

        link.advertise()?;
        info!("Started BLE advertising");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::BdAddr;
    use crate::domain::registry::{FieldKey, ACCELERATION_UUID, BUTTON_UUID};
    use crate::infrastructure::bluetooth::link::CentralLink;
    use crate::infrastructure::bluetooth::radio::SimRadio;

    const ADDR: BdAddr = BdAddr([0xaa, 0, 0, 0, 0, 1]);

    #[test]
    fn test_definition_follows_registry() {
        let service = ControllerService::new(ServiceSpec::default());
        let def = service.definition();
        assert_eq!(def.characteristics.len(), FieldKey::ALL.len());
        for (c, key) in def.characteristics.iter().zip(FieldKey::ALL) {
            assert_eq!(c.uuid, key.uuid());
            assert!(c.properties.can_subscribe());
            assert_eq!(c.initial_value.len(), key.kind().wire_len());
            assert!(c.initial_value.iter().all(|b| *b == 0));
        }
    }

    #[test]
    fn test_start_advertises_with_defaults_written() {
        let radio = SimRadio::new();
        let mut link = radio.peripheral(ADDR);
        let spec = ServiceSpec::new("CTRL", uuid::Uuid::from_u128(0x5));
        ControllerService::new(spec.clone()).start(&mut link).unwrap();

        assert_eq!(radio.stored_value(ADDR, ACCELERATION_UUID), Some(vec![0; 12]));
        assert_eq!(radio.stored_value(ADDR, BUTTON_UUID), Some(vec![0]));

        let mut central = radio.central();
        central.begin().unwrap();
        central.scan_for_uuid(spec.service_uuid).unwrap();
        let adv = central.available().unwrap();
        assert_eq!(adv.local_name, "CTRL");
        assert_eq!(adv.address, ADDR);
    }

    #[test]
    fn test_stack_failure_is_reported() {
        let radio = SimRadio::new();
        radio.fail_peripheral_stack(ADDR);
        let mut link = radio.peripheral(ADDR);
        let result = ControllerService::new(ServiceSpec::default()).start(&mut link);
        assert!(matches!(result, Err(LinkError::StackUnavailable(_))));
    }
}
