//! Bluetooth Module
//!
//! The link between the controller (peripheral) and the receiver (central).
//!
//! ## Architecture
//!
//! ```text
//!   controller                                   receiver
//! ┌──────────────────┐                     ┌──────────────────┐
//! │ ControllerService│                     │ BleScanner       │
//! │ (service setup)  │                     │ BleConnection    │
//! └────────┬─────────┘                     └────────┬─────────┘
//!          │ PeripheralLink                         │ CentralLink
//!          └──────────────► radio ◄─────────────────┘
//!                     (SimRadio in-process)
//! ```
//!
//! ## Modules
//!
//! - [`link`] - Traits both roles use to reach the radio
//! - [`protocol`] - Field wire format
//! - [`service`] - Controller service registration and advertising
//! - [`scanner`] - Discovery and vetting of the expected controller
//! - [`connection`] - Connect, attribute discovery, field subscription
//! - [`radio`] - In-process radio used without hardware and in tests

pub mod connection;
pub mod link;
pub mod protocol;
pub mod radio;
pub mod scanner;
pub mod service;

pub use link::{CentralLink, PeripheralLink};
pub use radio::SimRadio;
