use crate::domain::registry::{FieldKey, FieldKind};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Three-axis sample in X, Y, Z order
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vector3 {
    pub const ZERO: Vector3 = Vector3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

impl From<[f32; 3]> for Vector3 {
    fn from([x, y, z]: [f32; 3]) -> Self {
        Self { x, y, z }
    }
}

/// Typed value of one field
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    Vector3(Vector3),
    Bool(bool),
}

impl FieldValue {
    /// Zero/default value for a field kind
    pub fn default_for(kind: FieldKind) -> Self {
        match kind {
            FieldKind::Vector3 => Self::Vector3(Vector3::ZERO),
            FieldKind::Bool => Self::Bool(false),
        }
    }

    pub fn kind(&self) -> FieldKind {
        match self {
            Self::Vector3(_) => FieldKind::Vector3,
            Self::Bool(_) => FieldKind::Bool,
        }
    }
}

/// Bluetooth device address, printed as colon-separated hex
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BdAddr(pub [u8; 6]);

impl fmt::Display for BdAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}

/// Advertisement observed while scanning
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Advertisement {
    pub address: BdAddr,
    pub local_name: String,
    pub service_uuid: Option<Uuid>,
}

/// Properties of a discovered characteristic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharacteristicProperties {
    pub notify: bool,
}

impl CharacteristicProperties {
    pub const NOTIFY: CharacteristicProperties = CharacteristicProperties { notify: true };

    pub const READ_ONLY: CharacteristicProperties = CharacteristicProperties { notify: false };

    pub fn can_subscribe(&self) -> bool {
        self.notify
    }
}

/// Characteristic as registered on the peripheral side
#[derive(Debug, Clone, PartialEq)]
pub struct CharacteristicDef {
    pub uuid: Uuid,
    pub properties: CharacteristicProperties,
    /// Fixed value width in bytes
    pub value_len: usize,
    pub initial_value: Vec<u8>,
}

/// Service as registered on the peripheral side
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceDef {
    pub uuid: Uuid,
    pub characteristics: Vec<CharacteristicDef>,
}

/// Phases of the controller role
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourcePhase {
    /// Not yet initialised
    Idle,
    /// Advertising, waiting for a central
    Waiting,
    /// Central connected, publishing samples
    Publishing,
    /// Fatal initialisation failure
    Halted,
}

/// Phases of the receiver connection state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkPhase {
    /// Not yet initialised
    Idle,
    Scanning,
    Discovered,
    NameChecked,
    Connected,
    AttributesDiscovered,
    /// Validating and subscribing fields in registry order
    Subscribing,
    Streaming,
    /// Fatal initialisation failure
    Halted,
}

impl fmt::Display for SinkPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "IDLE",
            Self::Scanning => "SCANNING",
            Self::Discovered => "DISCOVERED",
            Self::NameChecked => "NAME_CHECKED",
            Self::Connected => "CONNECTED",
            Self::AttributesDiscovered => "ATTRS_DISCOVERED",
            Self::Subscribing => "SUBSCRIBING",
            Self::Streaming => "STREAMING",
            Self::Halted => "HALTED",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageSeverity {
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub message: String,
    pub severity: MessageSeverity,
}

/// Events emitted by the receiver for its operator-facing consumer
#[derive(Debug, Clone, PartialEq)]
pub enum SinkEvent {
    PhaseChanged(SinkPhase),
    /// A field value was copied into the mirror
    FieldUpdated(FieldKey, FieldValue),
    /// Rendered line for the operator terminal
    Telemetry(String),
    Disconnected,
    LogMessage(StatusMessage),
}
