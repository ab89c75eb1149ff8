pub mod bluetooth;
pub mod imu;
pub mod logging;
