//! Configuration system for the vitals monitor
//!
//! Configuration is loaded once at startup from a TOML file. Secrets (network
//! password, broker and SMTP credentials) are never stored in the file; the
//! file names the environment variable that holds them and they are resolved
//! at runtime.

use crate::alerts::BoundaryMode;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Main monitor configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MonitorConfig {
    #[serde(default)]
    pub device: DeviceSection,
    #[serde(default)]
    pub network: NetworkSection,
    pub mqtt: MqttSection,
    #[serde(default)]
    pub topics: TopicsSection,
    pub email: EmailSection,
    pub sensors: SensorsSection,
    #[serde(default)]
    pub thresholds: ThresholdsSection,
    #[serde(default)]
    pub schedule: ScheduleSection,
}

/// Device identity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeviceSection {
    /// Device identifier (must match [a-zA-Z0-9._-]+), used in the MQTT client id
    #[serde(default = "default_device_id")]
    pub id: String,
}

impl Default for DeviceSection {
    fn default() -> Self {
        Self {
            id: default_device_id(),
        }
    }
}

fn default_device_id() -> String {
    "vitals-monitor".to_string()
}

/// Network link section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NetworkSection {
    /// Network interface carrying the uplink
    #[serde(default = "default_interface")]
    pub interface: String,
    /// Wireless network to join when the link is down (None = link managed by the OS)
    pub ssid: Option<String>,
    /// Environment variable containing the wireless passphrase
    pub password_env: Option<String>,
    /// Delay between link checks while connecting (default: 500)
    #[serde(default = "default_network_retry_ms")]
    pub retry_interval_ms: u64,
    /// Attempts before giving up for this cycle (`0` in the file = wait forever)
    #[serde(
        default = "default_network_max_attempts",
        deserialize_with = "attempt_limit::deserialize",
        serialize_with = "attempt_limit::serialize"
    )]
    pub max_attempts: Option<u32>,
}

impl Default for NetworkSection {
    fn default() -> Self {
        Self {
            interface: default_interface(),
            ssid: None,
            password_env: None,
            retry_interval_ms: default_network_retry_ms(),
            max_attempts: default_network_max_attempts(),
        }
    }
}

fn default_interface() -> String {
    "wlan0".to_string()
}

fn default_network_retry_ms() -> u64 {
    500
}

fn default_network_max_attempts() -> Option<u32> {
    Some(120)
}

/// MQTT section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MqttSection {
    /// MQTT broker URL with protocol and port
    pub broker_url: String,
    /// Environment variable containing username
    pub username_env: Option<String>,
    /// Environment variable containing password
    pub password_env: Option<String>,
    /// Keep-alive interval in seconds (default: 60)
    #[serde(default = "default_keep_alive")]
    pub keep_alive_secs: u64,
    /// Delay between broker connection attempts (default: 1000)
    #[serde(default = "default_broker_retry_ms")]
    pub retry_interval_ms: u64,
    /// Attempts before giving up for this cycle (`0` in the file = wait forever)
    #[serde(
        default = "default_broker_max_attempts",
        deserialize_with = "attempt_limit::deserialize",
        serialize_with = "attempt_limit::serialize"
    )]
    pub max_attempts: Option<u32>,
    /// How long a single attempt waits for ConnAck (default: 5000)
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

/// `max_attempts` on disk: a count, with 0 meaning unlimited
mod attempt_limit {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u32>, D::Error> {
        let attempts = u32::deserialize(deserializer)?;
        Ok((attempts > 0).then_some(attempts))
    }

    pub fn serialize<S: Serializer>(limit: &Option<u32>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u32(limit.unwrap_or(0))
    }
}

fn default_keep_alive() -> u64 {
    60
}

fn default_broker_retry_ms() -> u64 {
    1000
}

fn default_broker_max_attempts() -> Option<u32> {
    Some(30)
}

fn default_connect_timeout_ms() -> u64 {
    5000
}

/// One topic per sensor kind
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TopicsSection {
    #[serde(default = "default_weight_topic")]
    pub weight: String,
    #[serde(default = "default_pulse_topic")]
    pub pulse: String,
    #[serde(default = "default_temperature_topic")]
    pub temperature: String,
}

impl Default for TopicsSection {
    fn default() -> Self {
        Self {
            weight: default_weight_topic(),
            pulse: default_pulse_topic(),
            temperature: default_temperature_topic(),
        }
    }
}

fn default_weight_topic() -> String {
    "device/weight".to_string()
}

fn default_pulse_topic() -> String {
    "device/pulse".to_string()
}

fn default_temperature_topic() -> String {
    "device/temperature".to_string()
}

/// SMTP alert delivery section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmailSection {
    /// SMTP server hostname
    pub smtp_host: String,
    /// SMTP server port (default: 465 with implicit TLS, 587 otherwise)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub smtp_port: Option<u16>,
    /// Use TLS from the first byte (port 465 style) instead of STARTTLS
    #[serde(default)]
    pub implicit_tls: bool,
    /// Sender address
    pub from: String,
    /// Alert recipient address
    pub recipient: String,
    /// Environment variable containing the SMTP username
    pub username_env: Option<String>,
    /// Environment variable containing the SMTP password
    pub password_env: Option<String>,
}

impl EmailSection {
    /// Configured port, or the standard one for the TLS mode
    pub fn port(&self) -> u16 {
        match (self.smtp_port, self.implicit_tls) {
            (Some(port), _) => port,
            (None, true) => 465,
            (None, false) => 587,
        }
    }
}

/// Sensor wiring and calibration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SensorsSection {
    /// Raw reading file of the load-cell channel
    pub load_cell_channel: PathBuf,
    /// Tare offset as printed by the calibration tool (32-bit register value)
    pub calibration_offset: i64,
    /// Raw counts per gram
    pub calibration_scale: f64,
    /// Samples averaged per mass reading (default: 20)
    #[serde(default = "default_mass_samples")]
    pub mass_samples: u32,
    /// Raw reading file of the pulse sensor ADC channel
    pub pulse_channel: PathBuf,
    /// Brightness file of the heartbeat LED (optional)
    pub pulse_indicator_led: Option<PathBuf>,
    /// Signal level above which the heartbeat LED is lit (default: 550)
    #[serde(default = "default_heartbeat_threshold")]
    pub heartbeat_threshold: f64,
    /// Raw reading file of the temperature sensor ADC channel
    pub temperature_channel: PathBuf,
    /// ADC reference voltage in volts (default: 5.0)
    #[serde(default = "default_reference_voltage")]
    pub reference_voltage: f64,
    /// Number of ADC codes (default: 1024)
    #[serde(default = "default_adc_resolution")]
    pub adc_resolution: u32,
    /// Linear sensor scale in degrees Celsius per volt (default: 100.0)
    #[serde(default = "default_degrees_per_volt")]
    pub degrees_per_volt: f64,
}

fn default_mass_samples() -> u32 {
    20
}

fn default_heartbeat_threshold() -> f64 {
    550.0
}

fn default_reference_voltage() -> f64 {
    5.0
}

fn default_adc_resolution() -> u32 {
    1024
}

fn default_degrees_per_volt() -> f64 {
    100.0
}

/// Alert threshold bounds
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ThresholdsSection {
    #[serde(default)]
    pub mode: BoundaryMode,
    #[serde(default = "default_pulse_lower")]
    pub pulse_lower: f64,
    #[serde(default = "default_pulse_upper")]
    pub pulse_upper: f64,
    #[serde(default = "default_temperature_lower")]
    pub temperature_lower: f64,
    #[serde(default = "default_temperature_upper")]
    pub temperature_upper: f64,
}

impl Default for ThresholdsSection {
    fn default() -> Self {
        Self {
            mode: BoundaryMode::default(),
            pulse_lower: default_pulse_lower(),
            pulse_upper: default_pulse_upper(),
            temperature_lower: default_temperature_lower(),
            temperature_upper: default_temperature_upper(),
        }
    }
}

fn default_pulse_lower() -> f64 {
    60.0
}

fn default_pulse_upper() -> f64 {
    100.0
}

fn default_temperature_lower() -> f64 {
    36.1
}

fn default_temperature_upper() -> f64 {
    37.2
}

/// Cycle cadence
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScheduleSection {
    /// Idle time between cycles (default: 5000)
    #[serde(default = "default_cycle_interval_ms")]
    pub cycle_interval_ms: u64,
}

impl Default for ScheduleSection {
    fn default() -> Self {
        Self {
            cycle_interval_ms: default_cycle_interval_ms(),
        }
    }
}

fn default_cycle_interval_ms() -> u64 {
    5000
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),
    #[error("Invalid device ID format: {0}")]
    InvalidDeviceId(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl MonitorConfig {
    /// Load configuration from TOML file and validate it
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: MonitorConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges that serde cannot express
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_device_id(&self.device.id)?;

        url::Url::parse(&self.mqtt.broker_url).map_err(|_| {
            ConfigError::InvalidConfig(format!("broker_url '{}' is not a URL", self.mqtt.broker_url))
        })?;

        let sensors = &self.sensors;
        if sensors.calibration_scale == 0.0 || !sensors.calibration_scale.is_finite() {
            return Err(ConfigError::InvalidConfig(
                "calibration_scale must be a finite, non-zero number".to_string(),
            ));
        }
        if sensors.mass_samples == 0 {
            return Err(ConfigError::InvalidConfig(
                "mass_samples must be at least 1".to_string(),
            ));
        }
        if sensors.adc_resolution == 0 {
            return Err(ConfigError::InvalidConfig(
                "adc_resolution must be greater than 0".to_string(),
            ));
        }

        let t = &self.thresholds;
        if t.pulse_lower > t.pulse_upper {
            return Err(ConfigError::InvalidConfig(format!(
                "pulse_lower ({}) exceeds pulse_upper ({})",
                t.pulse_lower, t.pulse_upper
            )));
        }
        if t.temperature_lower > t.temperature_upper {
            return Err(ConfigError::InvalidConfig(format!(
                "temperature_lower ({}) exceeds temperature_upper ({})",
                t.temperature_lower, t.temperature_upper
            )));
        }

        if self.network.retry_interval_ms == 0 || self.mqtt.retry_interval_ms == 0 {
            return Err(ConfigError::InvalidConfig(
                "retry_interval_ms must be greater than 0".to_string(),
            ));
        }
        if self.network.max_attempts == Some(0) || self.mqtt.max_attempts == Some(0) {
            return Err(ConfigError::InvalidConfig(
                "max_attempts must be greater than 0 (None for unlimited)".to_string(),
            ));
        }

        let email = &self.email;
        if email.username_env.is_some() != email.password_env.is_some() {
            return Err(ConfigError::InvalidConfig(
                "email.username_env and email.password_env must be set together".to_string(),
            ));
        }
        if email.implicit_tls && email.port() == 587 {
            return Err(ConfigError::InvalidConfig(
                "implicit_tls cannot be used on port 587 (STARTTLS)".to_string(),
            ));
        }

        Ok(())
    }

    /// Helper method to get environment variable with consistent error handling
    fn get_env_var_optional(env_var_name: Option<&String>) -> Option<String> {
        env_var_name.and_then(|name| std::env::var(name).ok())
    }

    /// Helper method to get environment variable with error propagation
    fn get_env_var_required(env_var_name: &str) -> Result<String, ConfigError> {
        std::env::var(env_var_name)
            .map_err(|_| ConfigError::EnvVarNotFound(env_var_name.to_string()))
    }

    /// Get the wireless passphrase from its environment variable
    pub fn get_network_password(&self) -> Option<String> {
        Self::get_env_var_optional(self.network.password_env.as_ref())
    }

    /// Get SMTP credentials; a named but unset variable is an error
    pub fn get_smtp_credentials(&self) -> Result<Option<(String, String)>, ConfigError> {
        match (&self.email.username_env, &self.email.password_env) {
            (Some(user_env), Some(pass_env)) => Ok(Some((
                Self::get_env_var_required(user_env)?,
                Self::get_env_var_required(pass_env)?,
            ))),
            (None, None) => Ok(None),
            _ => Err(ConfigError::InvalidConfig(
                "email.username_env and email.password_env must be set together".to_string(),
            )),
        }
    }

    /// Create a test configuration for unit testing
    #[cfg(test)]
    pub fn test_config() -> Self {
        let toml_content = r#"
[device]
id = "test-device"

[mqtt]
broker_url = "mqtt://localhost:1883"

[email]
smtp_host = "localhost"
from = "monitor@example.com"
recipient = "ward@example.com"

[sensors]
load_cell_channel = "/tmp/load_cell_raw"
calibration_offset = 4294798238
calibration_scale = 593.024292
pulse_channel = "/tmp/pulse_raw"
temperature_channel = "/tmp/temperature_raw"
"#;
        toml::from_str(toml_content).expect("Test config should parse")
    }
}

/// Validate device ID format
fn validate_device_id(device_id: &str) -> Result<(), ConfigError> {
    let valid_chars = device_id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-');

    if device_id.is_empty() || !valid_chars {
        return Err(ConfigError::InvalidDeviceId(format!(
            "Device ID '{device_id}' must match pattern [a-zA-Z0-9._-]+"
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_device() {
        let config = MonitorConfig::test_config();
        assert!(config.validate().is_ok());

        assert_eq!(config.network.retry_interval_ms, 500);
        assert_eq!(config.mqtt.retry_interval_ms, 1000);
        assert_eq!(config.schedule.cycle_interval_ms, 5000);
        assert_eq!(config.sensors.mass_samples, 20);
        assert_eq!(config.sensors.adc_resolution, 1024);
        assert_eq!(config.sensors.reference_voltage, 5.0);
        assert_eq!(config.sensors.heartbeat_threshold, 550.0);
        assert_eq!(config.thresholds.pulse_lower, 60.0);
        assert_eq!(config.thresholds.pulse_upper, 100.0);
        assert_eq!(config.thresholds.temperature_lower, 36.1);
        assert_eq!(config.thresholds.temperature_upper, 37.2);
        assert_eq!(config.thresholds.mode, BoundaryMode::OutsideRange);
        assert_eq!(config.topics.weight, "device/weight");
        assert_eq!(config.topics.pulse, "device/pulse");
        assert_eq!(config.topics.temperature, "device/temperature");
        assert_eq!(config.email.smtp_port, None);
        assert_eq!(config.email.port(), 587);
    }

    #[test]
    fn test_smtp_port_follows_tls_mode() {
        let mut config = MonitorConfig::test_config();
        config.email.implicit_tls = true;
        assert_eq!(config.email.port(), 465);
        assert!(config.validate().is_ok());

        config.email.smtp_port = Some(2465);
        assert_eq!(config.email.port(), 2465);

        config.email.smtp_port = Some(587);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_smtp_credentials_need_both_variables() {
        let mut config = MonitorConfig::test_config();
        config.email.username_env = Some("VITALS_TEST_LONE_SMTP_USER".to_string());
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("username_env"));
        assert!(matches!(
            config.get_smtp_credentials(),
            Err(ConfigError::InvalidConfig(_))
        ));

        config.email.username_env = None;
        config.email.password_env = Some("VITALS_TEST_LONE_SMTP_PASS".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_device_id() {
        let result = validate_device_id("invalid@device");
        assert!(result.is_err());

        let result = validate_device_id("valid-device_123.test");
        assert!(result.is_ok());
    }

    #[test]
    fn test_zero_scale_rejected() {
        let mut config = MonitorConfig::test_config();
        config.sensors.calibration_scale = 0.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_inverted_bounds_rejected() {
        let mut config = MonitorConfig::test_config();
        config.thresholds.temperature_lower = 38.0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("temperature_lower"));
    }

    #[test]
    fn test_zero_max_attempts_rejected() {
        let mut config = MonitorConfig::test_config();
        config.mqtt.max_attempts = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_legacy_mode_parses() {
        let mut config = MonitorConfig::test_config();
        let rendered = toml::to_string(&config).unwrap();
        assert!(rendered.contains("outside_range"));

        config.thresholds = toml::from_str("mode = \"legacy_disjunction\"").unwrap();
        assert_eq!(config.thresholds.mode, BoundaryMode::LegacyDisjunction);
        assert_eq!(config.thresholds.pulse_upper, 100.0);
    }

    #[test]
    fn test_smtp_credentials_absent_when_not_configured() {
        let config = MonitorConfig::test_config();
        assert_eq!(config.get_smtp_credentials().unwrap(), None);
    }

    #[test]
    fn test_smtp_credentials_missing_env_is_error() {
        let mut config = MonitorConfig::test_config();
        config.email.username_env = Some("VITALS_TEST_UNSET_SMTP_USER".to_string());
        config.email.password_env = Some("VITALS_TEST_UNSET_SMTP_PASS".to_string());
        assert!(matches!(
            config.get_smtp_credentials(),
            Err(ConfigError::EnvVarNotFound(_))
        ));
    }
}
