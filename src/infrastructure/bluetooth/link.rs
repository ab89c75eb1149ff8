//! Link layer seam
//!
//! Both roles talk to the radio through these traits. Every method except
//! `begin` must return promptly: the roles poll them from a cooperative tick.

use crate::domain::models::{Advertisement, BdAddr, CharacteristicProperties, ServiceDef};
use crate::error::LinkError;
use uuid::Uuid;

/// Peripheral (controller) side of the link
pub trait PeripheralLink {
    /// Start the radio stack. May block until the stack responds.
    fn begin(&mut self) -> Result<(), LinkError>;

    fn set_local_name(&mut self, name: &str);

    fn set_advertised_service(&mut self, service_uuid: Uuid);

    /// Register a service and its characteristics
    fn add_service(&mut self, service: ServiceDef) -> Result<(), LinkError>;

    /// Store a characteristic value and notify a subscribed central
    fn write_value(&mut self, uuid: Uuid, value: &[u8]) -> Result<(), LinkError>;

    fn advertise(&mut self) -> Result<(), LinkError>;

    /// Address of the connected central, if any
    fn central(&mut self) -> Option<BdAddr>;

    /// True while the connected central is subscribed to a characteristic
    fn subscribed(&mut self, uuid: Uuid) -> bool;
}

/// Central (receiver) side of the link
pub trait CentralLink {
    /// Start the radio stack. May block until the stack responds.
    fn begin(&mut self) -> Result<(), LinkError>;

    /// Start scanning for advertisers of a service
    fn scan_for_uuid(&mut self, service_uuid: Uuid) -> Result<(), LinkError>;

    /// Next advertisement seen by the scan, if any
    fn available(&mut self) -> Option<Advertisement>;

    fn stop_scan(&mut self);

    fn connect(&mut self, address: BdAddr) -> Result<(), LinkError>;

    fn discover_attributes(&mut self) -> Result<(), LinkError>;

    /// Properties of a discovered characteristic, `None` if the peer lacks it
    fn characteristic(&self, uuid: Uuid) -> Option<CharacteristicProperties>;

    fn subscribe(&mut self, uuid: Uuid) -> Result<(), LinkError>;

    /// Take the value delivered since the last call, if any
    fn take_update(&mut self, uuid: Uuid) -> Option<Vec<u8>>;

    fn connected(&self) -> bool;

    fn disconnect(&mut self);
}
