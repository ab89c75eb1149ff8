//! The two roles, each advanced by its own cooperative tick
//!
//! - [`source`] - controller: samples the IMU and publishes fields
//! - [`sink`] - receiver: discovers, validates, subscribes, mirrors

pub mod sink;
pub mod source;

pub use sink::SensorSink;
pub use source::SensorSource;
