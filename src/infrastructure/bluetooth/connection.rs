//! BLE Connection Module
//!
//! Connect, attribute discovery, and per-field validation of a candidate
//! controller. Each step reports failure to the caller, which abandons the
//! candidate; nothing here retries.

use crate::domain::models::Advertisement;
use crate::domain::registry::FieldKey;
use crate::error::LinkError;
use crate::infrastructure::bluetooth::link::CentralLink;
use tracing::{info, warn};

/// Why a required field could not be used
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FieldRejection {
    #[error("Peripheral doesn't have {0:?} characteristic")]
    Missing(FieldKey),

    #[error("Peripheral does not have subscribable {0:?} characteristic")]
    NotSubscribable(FieldKey),

    #[error("Did not successfully subscribe to {0:?} characteristic: {1}")]
    SubscribeFailed(FieldKey, LinkError),
}

/// Connection steps against the central link
pub struct BleConnection;

impl BleConnection {
    /// Connect to a vetted candidate
    pub fn connect<C: CentralLink>(
        link: &mut C,
        candidate: &Advertisement,
    ) -> Result<(), LinkError> {
        info!("Connecting to peripheral device {}", candidate.address);
        match link.connect(candidate.address) {
            Ok(()) => {
                info!("Connected to peripheral device");
                Ok(())
            }
            Err(e) => {
                warn!("Failed to connect to peripheral device: {}", e);
                Err(e)
            }
        }
    }

    /// Discover the peer's attributes
    pub fn discover<C: CentralLink>(link: &mut C) -> Result<(), LinkError> {
        info!("Discovering peripheral device attributes");
        match link.discover_attributes() {
            Ok(()) => {
                info!("Peripheral device attributes discovered");
                Ok(())
            }
            Err(e) => {
                warn!("Failed to discover peripheral device attributes: {}", e);
                Err(e)
            }
        }
    }

    /// Check one field exists and accepts a subscription, then subscribe
    pub fn validate_and_subscribe<C: CentralLink>(
        link: &mut C,
        key: FieldKey,
    ) -> Result<(), FieldRejection> {
        let label = key.spec().label;
        let Some(properties) = link.characteristic(key.uuid()) else {
            warn!("Peripheral doesn't have {} characteristic!", label);
            return Err(FieldRejection::Missing(key));
        };
        if !properties.can_subscribe() {
            warn!("Peripheral does not have subscribeable {} characteristic!", label);
            return Err(FieldRejection::NotSubscribable(key));
        }
        if let Err(e) = link.subscribe(key.uuid()) {
            warn!("Did not successfully subscribe to {} characteristic!", label);
            return Err(FieldRejection::SubscribeFailed(key, e));
        }
        info!("Subscribed to {} characteristic", label);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{BdAddr, CharacteristicDef, CharacteristicProperties, ServiceDef};
    use crate::domain::registry::{ANGULAR_RATE_UUID, SERVICE_UUID};
    use crate::infrastructure::bluetooth::radio::{PeripheralFixture, SimRadio};

    const ADDR: BdAddr = BdAddr([7, 7, 7, 7, 7, 7]);

    fn connected(properties: CharacteristicProperties) -> (SimRadio, impl CentralLink) {
        let radio = SimRadio::new();
        radio.add_fixture(PeripheralFixture {
            address: ADDR,
            local_name: "CTRL".into(),
            service: ServiceDef {
                uuid: SERVICE_UUID,
                characteristics: vec![CharacteristicDef {
                    uuid: ANGULAR_RATE_UUID,
                    properties,
                    value_len: 12,
                    initial_value: vec![0; 12],
                }],
            },
        });
        let mut central = radio.central();
        central.begin().unwrap();
        central.scan_for_uuid(SERVICE_UUID).unwrap();
        let adv = central.available().unwrap();
        BleConnection::connect(&mut central, &adv).unwrap();
        BleConnection::discover(&mut central).unwrap();
        (radio, central)
    }

    #[test]
    fn test_missing_field() {
        let (_radio, mut central) = connected(CharacteristicProperties::NOTIFY);
        assert_eq!(
            BleConnection::validate_and_subscribe(&mut central, FieldKey::Acceleration),
            Err(FieldRejection::Missing(FieldKey::Acceleration))
        );
    }

    #[test]
    fn test_read_only_field_is_rejected() {
        let (radio, mut central) = connected(CharacteristicProperties::READ_ONLY);
        assert_eq!(
            BleConnection::validate_and_subscribe(&mut central, FieldKey::AngularRate),
            Err(FieldRejection::NotSubscribable(FieldKey::AngularRate))
        );
        assert!(radio.subscriptions().is_empty());
    }

    #[test]
    fn test_refused_subscription() {
        let (radio, mut central) = connected(CharacteristicProperties::NOTIFY);
        radio.refuse_subscribe(ADDR, ANGULAR_RATE_UUID);
        assert!(matches!(
            BleConnection::validate_and_subscribe(&mut central, FieldKey::AngularRate),
            Err(FieldRejection::SubscribeFailed(FieldKey::AngularRate, _))
        ));
    }

    #[test]
    fn test_subscribe_success() {
        let (radio, mut central) = connected(CharacteristicProperties::NOTIFY);
        BleConnection::validate_and_subscribe(&mut central, FieldKey::AngularRate).unwrap();
        assert!(radio.subscriptions().contains(&ANGULAR_RATE_UUID));
    }
}
