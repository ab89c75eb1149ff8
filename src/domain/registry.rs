//! Field Registry
//!
//! The single definition of which fields the controller publishes, their
//! identifiers and their wire layout. Both the controller and the receiver are
//! built against this module, so they agree on the layout without negotiating
//! it over the link.
//!
//! ```text
//! Service 12307e98-a67e-45e2-b8f0-1445fa6e2cd8  "VRHANDHELDCONTROLLER"
//!   ├── acceleration    cf89ef50-...  12 bytes  [f32 LE; 3]  g
//!   ├── angular rate    1552ab31-...  12 bytes  [f32 LE; 3]  deg/s
//!   ├── magnetic field  55584dd1-...  12 bytes  [f32 LE; 3]  uT
//!   └── button          017fa2e8-...   1 byte   0 / nonzero
//! ```

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Local name advertised by the controller
pub const LOCAL_NAME: &str = "VRHANDHELDCONTROLLER";

/// Advertised service UUID
pub const SERVICE_UUID: Uuid = Uuid::from_u128(0x12307e98_a67e_45e2_b8f0_1445fa6e2cd8);

/// Acceleration characteristic UUID
pub const ACCELERATION_UUID: Uuid = Uuid::from_u128(0xcf89ef50_4bdb_423a_a822_88aaf7f96c5a);

/// Angular rate (gyroscope) characteristic UUID
pub const ANGULAR_RATE_UUID: Uuid = Uuid::from_u128(0x1552ab31_afbb_418c_bd23_1f4527751390);

/// Magnetic field characteristic UUID
pub const MAGNETIC_FIELD_UUID: Uuid = Uuid::from_u128(0x55584dd1_b773_44aa_a38d_ed6d9c94a851);

/// Button characteristic UUID
pub const BUTTON_UUID: Uuid = Uuid::from_u128(0x017fa2e8_b256_47bf_953b_a494b75fb9bf);

/// Size of one encoded float
pub const FLOAT_LEN: usize = 4;

/// Size of an encoded three-axis vector
pub const VECTOR_LEN: usize = FLOAT_LEN * 3;

/// Size of an encoded boolean
pub const BOOL_LEN: usize = 1;

/// Semantic type of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// Three little-endian f32 values in X, Y, Z order
    Vector3,
    /// One byte, zero is false
    Bool,
}

impl FieldKind {
    /// Encoded width in bytes
    pub const fn wire_len(self) -> usize {
        match self {
            Self::Vector3 => VECTOR_LEN,
            Self::Bool => BOOL_LEN,
        }
    }
}

/// The fields published by the controller, in registry order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKey {
    Acceleration,
    AngularRate,
    MagneticField,
    Button,
}

impl FieldKey {
    /// Every field in registry order
    pub const ALL: [FieldKey; 4] = [
        FieldKey::Acceleration,
        FieldKey::AngularRate,
        FieldKey::MagneticField,
        FieldKey::Button,
    ];

    /// Position in the registry
    pub const fn index(self) -> usize {
        match self {
            Self::Acceleration => 0,
            Self::AngularRate => 1,
            Self::MagneticField => 2,
            Self::Button => 3,
        }
    }

    /// Registry entry for this field
    pub fn spec(self) -> &'static FieldSpec {
        &FIELDS[self.index()]
    }

    pub fn uuid(self) -> Uuid {
        self.spec().uuid
    }

    pub fn kind(self) -> FieldKind {
        self.spec().kind
    }

    /// Look up a field by its characteristic UUID
    pub fn from_uuid(uuid: Uuid) -> Option<FieldKey> {
        FIELDS.iter().find(|f| f.uuid == uuid).map(|f| f.key)
    }
}

/// One registry entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub key: FieldKey,
    pub uuid: Uuid,
    pub kind: FieldKind,
    /// Human readable name used in log lines
    pub label: &'static str,
    /// Physical unit of each component
    pub unit: &'static str,
}

/// Field registry, in the order fields are published and validated
pub const FIELDS: [FieldSpec; 4] = [
    FieldSpec {
        key: FieldKey::Acceleration,
        uuid: ACCELERATION_UUID,
        kind: FieldKind::Vector3,
        label: "Acc",
        unit: "g",
    },
    FieldSpec {
        key: FieldKey::AngularRate,
        uuid: ANGULAR_RATE_UUID,
        kind: FieldKind::Vector3,
        label: "Gyr",
        unit: "deg/s",
    },
    FieldSpec {
        key: FieldKey::MagneticField,
        uuid: MAGNETIC_FIELD_UUID,
        kind: FieldKind::Vector3,
        label: "Mag",
        unit: "uT",
    },
    FieldSpec {
        key: FieldKey::Button,
        uuid: BUTTON_UUID,
        kind: FieldKind::Bool,
        label: "Button Pressed",
        unit: "",
    },
];

/// Advertised identity of a controller: local name plus service UUID
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceSpec {
    pub local_name: String,
    pub service_uuid: Uuid,
}

impl ServiceSpec {
    pub fn new(local_name: impl Into<String>, service_uuid: Uuid) -> Self {
        Self {
            local_name: local_name.into(),
            service_uuid,
        }
    }
}

impl Default for ServiceSpec {
    fn default() -> Self {
        Self::new(LOCAL_NAME, SERVICE_UUID)
    }
}
