//! Simulated Radio
//!
//! In-process stand-in for the BLE stack so the controller and receiver can
//! run end to end without hardware. Endpoints share one air state:
//!
//! ```text
//! ┌──────────────┐   advertise / notify   ┌──────────────┐
//! │ SimPeripheral│ ─────────────────────► │  SimCentral  │
//! │ (controller) │ ◄───────────────────── │  (receiver)  │
//! └──────────────┘   connect / subscribe  └──────────────┘
//!          ▲                                     ▲
//!          └──────────── SimRadio (air) ─────────┘
//! ```
//!
//! Notifications are single-slot per characteristic: a value not yet taken
//! by the central is overwritten by the next one. Nothing is acknowledged.
//!
//! The radio also builds fixture advertisers and injects faults for tests.

use crate::domain::models::{Advertisement, BdAddr, CharacteristicProperties, ServiceDef};
use crate::error::LinkError;
use crate::infrastructure::bluetooth::link::{CentralLink, PeripheralLink};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, trace};
use uuid::Uuid;

const CENTRAL_ADDRESS: BdAddr = BdAddr([0xd4, 0x3a, 0x2c, 0x10, 0x00, 0x01]);

#[derive(Debug, Default)]
struct PeripheralState {
    address: BdAddr,
    started: bool,
    fail_begin: bool,
    local_name: String,
    advertised_service: Option<Uuid>,
    advertising: bool,
    services: Vec<ServiceDef>,
    values: HashMap<Uuid, Vec<u8>>,
    central: Option<BdAddr>,
    refuse_connect: bool,
    fail_discovery: bool,
    refuse_subscribe: HashSet<Uuid>,
    connect_attempts: u32,
}

impl PeripheralState {
    fn new(address: BdAddr) -> Self {
        Self {
            address,
            ..Default::default()
        }
    }

    fn visible(&self) -> bool {
        self.started && self.advertising && self.central.is_none()
    }

    fn find_characteristic(&self, uuid: Uuid) -> Option<(CharacteristicProperties, usize)> {
        self.services
            .iter()
            .flat_map(|s| s.characteristics.iter())
            .find(|c| c.uuid == uuid)
            .map(|c| (c.properties, c.value_len))
    }
}

#[derive(Debug)]
struct LinkState {
    peer: BdAddr,
    discovered: bool,
    subscriptions: HashSet<Uuid>,
    pending: HashMap<Uuid, Vec<u8>>,
}

#[derive(Debug, Default)]
struct CentralState {
    started: bool,
    fail_begin: bool,
    scan_filter: Option<Uuid>,
    scan_cursor: usize,
    link: Option<LinkState>,
}

#[derive(Debug, Default)]
struct AirState {
    peripherals: Vec<PeripheralState>,
    central: CentralState,
}

impl AirState {
    fn peripheral(&self, address: BdAddr) -> Option<&PeripheralState> {
        self.peripherals.iter().find(|p| p.address == address)
    }

    fn peripheral_mut(&mut self, address: BdAddr) -> Option<&mut PeripheralState> {
        self.peripherals.iter_mut().find(|p| p.address == address)
    }

    fn peripheral_entry(&mut self, address: BdAddr) -> &mut PeripheralState {
        if let Some(index) = self.peripherals.iter().position(|p| p.address == address) {
            &mut self.peripherals[index]
        } else {
            self.peripherals.push(PeripheralState::new(address));
            let last = self.peripherals.len() - 1;
            &mut self.peripherals[last]
        }
    }

    /// Tear down the current link on both sides
    fn drop_link(&mut self) -> Option<BdAddr> {
        let link = self.central.link.take()?;
        if let Some(peripheral) = self.peripheral_mut(link.peer) {
            peripheral.central = None;
        }
        Some(link.peer)
    }
}

/// Fixed advertiser used by tests to stand in for a controller or a stranger
#[derive(Debug, Clone)]
pub struct PeripheralFixture {
    pub address: BdAddr,
    pub local_name: String,
    pub service: ServiceDef,
}

/// Shared air state; hands out peripheral and central endpoints
#[derive(Debug, Clone, Default)]
pub struct SimRadio {
    air: Arc<Mutex<AirState>>,
}

impl SimRadio {
    pub fn new() -> Self {
        Self::default()
    }

    fn air(&self) -> MutexGuard<'_, AirState> {
        self.air.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Peripheral endpoint with the given address
    pub fn peripheral(&self, address: BdAddr) -> SimPeripheral {
        self.air().peripheral_entry(address);
        SimPeripheral {
            radio: self.clone(),
            address,
        }
    }

    /// The central endpoint
    pub fn central(&self) -> SimCentral {
        SimCentral {
            radio: self.clone(),
        }
    }

    /// Register a fixture that is already started and advertising
    pub fn add_fixture(&self, fixture: PeripheralFixture) {
        let mut air = self.air();
        let peripheral = air.peripheral_entry(fixture.address);
        peripheral.started = true;
        peripheral.local_name = fixture.local_name;
        peripheral.advertised_service = Some(fixture.service.uuid);
        for c in &fixture.service.characteristics {
            peripheral.values.insert(c.uuid, c.initial_value.clone());
        }
        peripheral.services = vec![fixture.service];
        peripheral.advertising = true;
    }

    /// Remove a peripheral from the air, dropping its link if any
    pub fn remove_peripheral(&self, address: BdAddr) {
        let mut air = self.air();
        if air.central.link.as_ref().map(|l| l.peer) == Some(address) {
            air.drop_link();
        }
        air.peripherals.retain(|p| p.address != address);
    }

    /// Simulate link loss
    pub fn drop_link(&self) {
        if let Some(peer) = self.air().drop_link() {
            debug!("Simulated link loss with {}", peer);
        }
    }

    pub fn fail_peripheral_stack(&self, address: BdAddr) {
        self.air().peripheral_entry(address).fail_begin = true;
    }

    pub fn fail_central_stack(&self) {
        self.air().central.fail_begin = true;
    }

    pub fn refuse_connections(&self, address: BdAddr, refuse: bool) {
        self.air().peripheral_entry(address).refuse_connect = refuse;
    }

    pub fn fail_discovery(&self, address: BdAddr, fail: bool) {
        self.air().peripheral_entry(address).fail_discovery = fail;
    }

    pub fn refuse_subscribe(&self, address: BdAddr, uuid: Uuid) {
        self.air().peripheral_entry(address).refuse_subscribe.insert(uuid);
    }

    /// Number of connect attempts made against a peripheral
    pub fn connect_attempts(&self, address: BdAddr) -> u32 {
        self.air()
            .peripheral(address)
            .map(|p| p.connect_attempts)
            .unwrap_or(0)
    }

    /// Characteristic UUIDs the central is currently subscribed to
    pub fn subscriptions(&self) -> HashSet<Uuid> {
        self.air()
            .central
            .link
            .as_ref()
            .map(|l| l.subscriptions.clone())
            .unwrap_or_default()
    }

    /// Push a raw notification from a peripheral, bypassing its declared layout
    pub fn inject_notification(&self, address: BdAddr, uuid: Uuid, value: &[u8]) {
        let mut air = self.air();
        if let Some(link) = air.central.link.as_mut() {
            if link.peer == address && link.subscriptions.contains(&uuid) {
                link.pending.insert(uuid, value.to_vec());
            }
        }
    }

    /// Current stored value of a peripheral characteristic
    pub fn stored_value(&self, address: BdAddr, uuid: Uuid) -> Option<Vec<u8>> {
        self.air()
            .peripheral(address)
            .and_then(|p| p.values.get(&uuid).cloned())
    }
}

/// Peripheral endpoint of the simulated radio
#[derive(Debug, Clone)]
pub struct SimPeripheral {
    radio: SimRadio,
    address: BdAddr,
}

impl SimPeripheral {
    fn with_state<T>(&self, f: impl FnOnce(&mut PeripheralState) -> T) -> T {
        let mut air = self.radio.air();
        f(air.peripheral_entry(self.address))
    }
}

impl PeripheralLink for SimPeripheral {
    fn begin(&mut self) -> Result<(), LinkError> {
        self.with_state(|p| {
            if p.fail_begin {
                return Err(LinkError::StackUnavailable("radio not responding".into()));
            }
            p.started = true;
            Ok(())
        })
    }

    fn set_local_name(&mut self, name: &str) {
        self.with_state(|p| p.local_name = name.to_string());
    }

    fn set_advertised_service(&mut self, service_uuid: Uuid) {
        self.with_state(|p| p.advertised_service = Some(service_uuid));
    }

    fn add_service(&mut self, service: ServiceDef) -> Result<(), LinkError> {
        self.with_state(|p| {
            if !p.started {
                return Err(LinkError::NotStarted);
            }
            for c in &service.characteristics {
                p.values.insert(c.uuid, c.initial_value.clone());
            }
            p.services.push(service);
            Ok(())
        })
    }

    fn write_value(&mut self, uuid: Uuid, value: &[u8]) -> Result<(), LinkError> {
        let mut air = self.radio.air();
        let peripheral = air
            .peripheral_mut(self.address)
            .ok_or(LinkError::NotStarted)?;
        if !peripheral.started {
            return Err(LinkError::NotStarted);
        }
        let (properties, capacity) = peripheral
            .find_characteristic(uuid)
            .ok_or(LinkError::UnknownCharacteristic(uuid))?;
        if value.len() > capacity {
            return Err(LinkError::ValueTooLong {
                uuid,
                len: value.len(),
                capacity,
            });
        }
        peripheral.values.insert(uuid, value.to_vec());

        if !properties.notify {
            return Ok(());
        }
        let address = self.address;
        if let Some(link) = air.central.link.as_mut() {
            if link.peer == address && link.subscriptions.contains(&uuid) {
                trace!("Notify {} ({} bytes)", uuid, value.len());
                link.pending.insert(uuid, value.to_vec());
            }
        }
        Ok(())
    }

    fn advertise(&mut self) -> Result<(), LinkError> {
        self.with_state(|p| {
            if !p.started {
                return Err(LinkError::NotStarted);
            }
            p.advertising = true;
            Ok(())
        })
    }

    fn central(&mut self) -> Option<BdAddr> {
        self.with_state(|p| p.central)
    }

    fn subscribed(&mut self, uuid: Uuid) -> bool {
        let address = self.address;
        self.radio
            .air()
            .central
            .link
            .as_ref()
            .is_some_and(|l| l.peer == address && l.subscriptions.contains(&uuid))
    }
}

/// Central endpoint of the simulated radio
#[derive(Debug, Clone)]
pub struct SimCentral {
    radio: SimRadio,
}

impl CentralLink for SimCentral {
    fn begin(&mut self) -> Result<(), LinkError> {
        let mut air = self.radio.air();
        if air.central.fail_begin {
            return Err(LinkError::StackUnavailable("radio not responding".into()));
        }
        air.central.started = true;
        Ok(())
    }

    fn scan_for_uuid(&mut self, service_uuid: Uuid) -> Result<(), LinkError> {
        let mut air = self.radio.air();
        if !air.central.started {
            return Err(LinkError::NotStarted);
        }
        air.central.scan_filter = Some(service_uuid);
        air.central.scan_cursor = 0;
        Ok(())
    }

    fn available(&mut self) -> Option<Advertisement> {
        let mut air = self.radio.air();
        let filter = air.central.scan_filter?;
        let count = air.peripherals.len();
        let start = air.central.scan_cursor;
        for offset in 0..count {
            let index = (start + offset) % count;
            let p = &air.peripherals[index];
            if p.visible() && p.advertised_service == Some(filter) {
                let advertisement = Advertisement {
                    address: p.address,
                    local_name: p.local_name.clone(),
                    service_uuid: p.advertised_service,
                };
                air.central.scan_cursor = index + 1;
                return Some(advertisement);
            }
        }
        None
    }

    fn stop_scan(&mut self) {
        self.radio.air().central.scan_filter = None;
    }

    fn connect(&mut self, address: BdAddr) -> Result<(), LinkError> {
        let mut air = self.radio.air();
        if !air.central.started {
            return Err(LinkError::NotStarted);
        }
        if air.central.link.is_some() {
            return Err(LinkError::ConnectFailed(format!(
                "{address}: central already connected"
            )));
        }
        let peripheral = air
            .peripheral_mut(address)
            .ok_or_else(|| LinkError::ConnectFailed(address.to_string()))?;
        peripheral.connect_attempts += 1;
        if !peripheral.visible() || peripheral.refuse_connect {
            return Err(LinkError::ConnectFailed(address.to_string()));
        }
        peripheral.central = Some(CENTRAL_ADDRESS);
        air.central.link = Some(LinkState {
            peer: address,
            discovered: false,
            subscriptions: HashSet::new(),
            pending: HashMap::new(),
        });
        Ok(())
    }

    fn discover_attributes(&mut self) -> Result<(), LinkError> {
        let mut air = self.radio.air();
        let peer = air
            .central
            .link
            .as_ref()
            .map(|l| l.peer)
            .ok_or(LinkError::NotConnected)?;
        let fail = air.peripheral(peer).map(|p| p.fail_discovery).unwrap_or(true);
        if fail {
            return Err(LinkError::DiscoveryFailed);
        }
        if let Some(link) = air.central.link.as_mut() {
            link.discovered = true;
        }
        Ok(())
    }

    fn characteristic(&self, uuid: Uuid) -> Option<CharacteristicProperties> {
        let air = self.radio.air();
        let link = air.central.link.as_ref().filter(|l| l.discovered)?;
        air.peripheral(link.peer)?
            .find_characteristic(uuid)
            .map(|(properties, _)| properties)
    }

    fn subscribe(&mut self, uuid: Uuid) -> Result<(), LinkError> {
        let mut air = self.radio.air();
        let peer = air
            .central
            .link
            .as_ref()
            .map(|l| l.peer)
            .ok_or(LinkError::NotConnected)?;
        let peripheral = air.peripheral(peer).ok_or(LinkError::NotConnected)?;
        let (properties, _) = peripheral
            .find_characteristic(uuid)
            .ok_or(LinkError::UnknownCharacteristic(uuid))?;
        if !properties.notify || peripheral.refuse_subscribe.contains(&uuid) {
            return Err(LinkError::SubscribeRefused(uuid));
        }
        if let Some(link) = air.central.link.as_mut() {
            link.subscriptions.insert(uuid);
        }
        Ok(())
    }

    fn take_update(&mut self, uuid: Uuid) -> Option<Vec<u8>> {
        self.radio
            .air()
            .central
            .link
            .as_mut()
            .and_then(|l| l.pending.remove(&uuid))
    }

    fn connected(&self) -> bool {
        self.radio.air().central.link.is_some()
    }

    fn disconnect(&mut self) {
        self.radio.air().drop_link();
    }
}
