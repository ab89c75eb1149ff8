//! Error types shared by both roles

use uuid::Uuid;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Errors reported by a link endpoint (radio stack or GATT operation)
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LinkError {
    /// The radio stack could not be started
    #[error("Wireless stack failed to start: {0}")]
    StackUnavailable(String),

    /// Operation requires a started stack
    #[error("Wireless stack not started")]
    NotStarted,

    /// No peer is connected
    #[error("Not connected")]
    NotConnected,

    /// Connect attempt was refused or timed out
    #[error("Failed to connect to {0}")]
    ConnectFailed(String),

    /// Attribute discovery on the peer failed
    #[error("Attribute discovery failed")]
    DiscoveryFailed,

    /// Characteristic is not part of any registered service
    #[error("Unknown characteristic {0}")]
    UnknownCharacteristic(Uuid),

    /// Peer refused the subscription
    #[error("Subscription to {0} refused")]
    SubscribeRefused(Uuid),

    /// Written value does not fit the characteristic
    #[error("Value of {len} bytes does not fit characteristic {uuid} ({capacity} bytes)")]
    ValueTooLong {
        /// Characteristic identifier
        uuid: Uuid,
        /// Length of the rejected value
        len: usize,
        /// Declared characteristic size
        capacity: usize,
    },
}

/// Errors reported by the IMU driver
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ImuError {
    #[error("IMU failed to start: {0}")]
    BeginFailed(String),

    #[error("IMU read failed: {0}")]
    ReadFailed(String),
}

/// Wire layout errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("Invalid value length: expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}

/// Crate-level error
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Link(#[from] LinkError),

    #[error(transparent)]
    Imu(#[from] ImuError),

    #[error(transparent)]
    Decode(#[from] DecodeError),
}
