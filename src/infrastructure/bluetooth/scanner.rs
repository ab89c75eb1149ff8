//! BLE Scanner Module
//!
//! Discovery of the expected controller: scan for its service UUID and
//! vet each advertiser before anything connects to it.

use crate::domain::models::{Advertisement, BdAddr};
use crate::domain::registry::ServiceSpec;
use crate::error::LinkError;
use crate::infrastructure::bluetooth::link::CentralLink;
use std::collections::HashSet;
use tracing::{debug, info, trace, warn};

/// Scanner for the controller advertised under `expected`
#[derive(Debug, Clone)]
pub struct BleScanner {
    expected: ServiceSpec,
    /// Advertisers already reported since the scan started
    reported: HashSet<BdAddr>,
}

impl BleScanner {
    pub fn new(expected: ServiceSpec) -> Self {
        Self {
            expected,
            reported: HashSet::new(),
        }
    }

    /// Start (or restart) scanning for the expected service
    pub fn start<C: CentralLink>(&mut self, link: &mut C) -> Result<(), LinkError> {
        link.scan_for_uuid(self.expected.service_uuid)?;
        self.reported.clear();
        info!("Started scanning for uuid {}", self.expected.service_uuid);
        Ok(())
    }

    /// Next candidate advertiser, if any. Nothing found is the idle state.
    /// The full report is logged once per advertiser and scan.
    pub fn poll<C: CentralLink>(&mut self, link: &mut C) -> Option<Advertisement> {
        trace!("Discovering peripheral device");
        let candidate = link.available()?;
        if !self.reported.insert(candidate.address) {
            debug!(
                "Peripheral device {} ({:?}) seen again",
                candidate.address, candidate.local_name
            );
            return Some(candidate);
        }
        info!("***Peripheral device discovered***");
        info!("MAC address: {}", candidate.address);
        info!("Device name: {}", candidate.local_name);
        match candidate.service_uuid {
            Some(uuid) => info!("Advertised service UUID: {}", uuid),
            None => info!("Advertised service UUID: none"),
        }
        Some(candidate)
    }

    /// True if the advertiser is exactly the expected controller
    pub fn matches(&self, candidate: &Advertisement) -> bool {
        if candidate.service_uuid != Some(self.expected.service_uuid) {
            warn!(
                "Incorrect service UUID {:?} from {}",
                candidate.service_uuid, candidate.address
            );
            return false;
        }
        if candidate.local_name != self.expected.local_name {
            warn!(
                "Incorrect local name {:?} (expected {:?})",
                candidate.local_name, self.expected.local_name
            );
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::ServiceDef;
    use crate::infrastructure::bluetooth::radio::{PeripheralFixture, SimRadio};
    use uuid::Uuid;

    const SERVICE: Uuid = Uuid::from_u128(0x5);

    fn advert(name: &str, service: Option<Uuid>) -> Advertisement {
        Advertisement {
            address: BdAddr([9, 9, 9, 9, 9, 9]),
            local_name: name.to_string(),
            service_uuid: service,
        }
    }

    #[test]
    fn test_name_must_match_exactly() {
        let scanner = BleScanner::new(ServiceSpec::new("CTRL", SERVICE));
        assert!(scanner.matches(&advert("CTRL", Some(SERVICE))));
        assert!(!scanner.matches(&advert("OTHER", Some(SERVICE))));
        assert!(!scanner.matches(&advert("ctrl", Some(SERVICE))));
        assert!(!scanner.matches(&advert("CTRL ", Some(SERVICE))));
        assert!(!scanner.matches(&advert("", Some(SERVICE))));
    }

    #[test]
    fn test_report_once_per_scan() {
        let radio = SimRadio::new();
        radio.add_fixture(PeripheralFixture {
            address: BdAddr([9, 9, 9, 9, 9, 9]),
            local_name: "OTHER".into(),
            service: ServiceDef {
                uuid: SERVICE,
                characteristics: Vec::new(),
            },
        });
        let mut central = radio.central();
        central.begin().unwrap();
        let mut scanner = BleScanner::new(ServiceSpec::new("CTRL", SERVICE));
        scanner.start(&mut central).unwrap();

        assert!(scanner.poll(&mut central).is_some());
        assert!(scanner.poll(&mut central).is_some());
        assert_eq!(scanner.reported.len(), 1);

        scanner.start(&mut central).unwrap();
        assert!(scanner.reported.is_empty());
    }

    #[test]
    fn test_service_must_match() {
        let scanner = BleScanner::new(ServiceSpec::new("CTRL", SERVICE));
        assert!(!scanner.matches(&advert("CTRL", Some(Uuid::from_u128(0x6)))));
        assert!(!scanner.matches(&advert("CTRL", None)));
    }
}
