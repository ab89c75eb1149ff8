use crate::domain::registry::{self, ServiceSpec};
use crate::presentation::terminal::PrintMode;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogSettings {
    #[serde(default = "default_level")]
    pub level: String, // "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_false")]
    pub file_logging_enabled: bool,
    #[serde(default = "default_true")]
    pub console_logging_enabled: bool,
    #[serde(default = "default_log_dir")]
    pub log_dir: String,
    #[serde(default = "default_prefix")]
    pub file_name_prefix: String,
    #[serde(default = "default_false")]
    pub show_file_line: bool,
    #[serde(default = "default_false")]
    pub show_thread_ids: bool,
    #[serde(default = "default_true")]
    pub show_target: bool,
    #[serde(default = "default_true")]
    pub ansi_colors: bool,
    #[serde(default = "default_rotation")]
    pub rotation: String, // "daily", "hourly", "minutely", "never"
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: default_level(),
            file_logging_enabled: default_false(),
            console_logging_enabled: default_true(),
            log_dir: default_log_dir(),
            file_name_prefix: default_prefix(),
            show_file_line: default_false(),
            show_thread_ids: default_false(),
            show_target: default_true(),
            ansi_colors: default_true(),
            rotation: default_rotation(),
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}
fn default_true() -> bool {
    true
}
fn default_false() -> bool {
    false
}
fn default_log_dir() -> String {
    "logs".to_string()
}
fn default_prefix() -> String {
    "vr_handheld_link".to_string()
}
fn default_rotation() -> String {
    "daily".to_string()
}

/// Advertised identity shared by both roles
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkSettings {
    #[serde(default = "default_local_name")]
    pub local_name: String,
    #[serde(default = "default_service_uuid")]
    pub service_uuid: Uuid,
}

impl LinkSettings {
    pub fn service_spec(&self) -> ServiceSpec {
        ServiceSpec::new(self.local_name.clone(), self.service_uuid)
    }
}

impl Default for LinkSettings {
    fn default() -> Self {
        Self {
            local_name: default_local_name(),
            service_uuid: default_service_uuid(),
        }
    }
}

fn default_local_name() -> String {
    registry::LOCAL_NAME.to_string()
}
fn default_service_uuid() -> Uuid {
    registry::SERVICE_UUID
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkSettings {
    /// Pause between streaming iterations, keeps the operator terminal
    /// within its throughput budget
    #[serde(default = "default_poll_delay_ms")]
    pub poll_delay_ms: u64,
    #[serde(default)]
    pub print_mode: PrintMode,
}

impl Default for SinkSettings {
    fn default() -> Self {
        Self {
            poll_delay_ms: default_poll_delay_ms(),
            print_mode: PrintMode::default(),
        }
    }
}

fn default_poll_delay_ms() -> u64 {
    3
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceSettings {
    /// Delay before initialisation so an operator can attach a monitor
    #[serde(default)]
    pub startup_delay_ms: u64,
}

/// Parameters of the in-process radio and IMU used when no hardware is present
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationSettings {
    #[serde(default = "default_imu_rate_hz")]
    pub acceleration_rate_hz: f32,
    #[serde(default = "default_imu_rate_hz")]
    pub gyroscope_rate_hz: f32,
    #[serde(default = "default_mag_rate_hz")]
    pub magnetometer_rate_hz: f32,
    #[serde(default = "default_button_period_ms")]
    pub button_period_ms: u64,
    #[serde(default = "default_controller_address")]
    pub controller_address: [u8; 6],
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            acceleration_rate_hz: default_imu_rate_hz(),
            gyroscope_rate_hz: default_imu_rate_hz(),
            magnetometer_rate_hz: default_mag_rate_hz(),
            button_period_ms: default_button_period_ms(),
            controller_address: default_controller_address(),
        }
    }
}

// LSM9DS1 defaults
fn default_imu_rate_hz() -> f32 {
    119.0
}
fn default_mag_rate_hz() -> f32 {
    20.0
}
fn default_button_period_ms() -> u64 {
    2000
}
fn default_controller_address() -> [u8; 6] {
    [0xc0, 0x98, 0xe5, 0x49, 0x00, 0x01]
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    // Logging Settings
    #[serde(default)]
    pub log_settings: LogSettings,

    #[serde(default)]
    pub link: LinkSettings,

    #[serde(default)]
    pub sink: SinkSettings,

    #[serde(default)]
    pub source: SourceSettings,

    #[serde(default)]
    pub simulation: SimulationSettings,
}

pub struct SettingsService {
    settings: Settings,
    settings_path: PathBuf,
}

impl SettingsService {
    pub fn new() -> anyhow::Result<Self> {
        let settings_path = Self::get_settings_path()?;
        Ok(Self::from_path(settings_path))
    }

    /// Load from an explicit path, falling back to defaults
    pub fn from_path(settings_path: PathBuf) -> Self {
        let settings = Self::load_from_file(&settings_path).unwrap_or_default();
        Self {
            settings,
            settings_path,
        }
    }

    fn get_settings_path() -> anyhow::Result<PathBuf> {
        let mut path = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        path.push("VrHandheldLink");
        fs::create_dir_all(&path)?;
        path.push("settings.json");
        Ok(path)
    }

    fn load_from_file(path: &Path) -> anyhow::Result<Settings> {
        let contents = fs::read_to_string(path)?;
        let settings = serde_json::from_str(&contents)?;
        Ok(settings)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(&self.settings)?;
        fs::write(&self.settings_path, json)?;
        Ok(())
    }

    pub fn get(&self) -> &Settings {
        &self.settings
    }

    pub fn get_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }
}
