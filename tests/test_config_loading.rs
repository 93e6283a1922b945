//! Configuration loading and validation tests
//!
//! Tests focus on BEHAVIOR of configuration loading, validation, and error handling.

use std::io::Write;
use tempfile::NamedTempFile;
use vitals_monitor::alerts::BoundaryMode;
use vitals_monitor::config::{ConfigError, MonitorConfig};

const MINIMAL: &str = r#"
[mqtt]
broker_url = "mqtt://broker.local:1883"

[email]
smtp_host = "smtp.example.com"
from = "monitor@example.com"
recipient = "ward@example.com"

[sensors]
load_cell_channel = "/sys/bus/iio/devices/iio:device0/in_voltage0_raw"
calibration_offset = 4294798238
calibration_scale = 593.024292
pulse_channel = "/sys/bus/iio/devices/iio:device1/in_voltage0_raw"
temperature_channel = "/sys/bus/iio/devices/iio:device1/in_voltage1_raw"
"#;

fn write_config(content: &str) -> NamedTempFile {
    let mut temp_file = NamedTempFile::new().unwrap();
    writeln!(temp_file, "{content}").unwrap();
    temp_file
}

#[test]
fn test_minimal_config_applies_defaults() {
    let temp_file = write_config(MINIMAL);

    let config = MonitorConfig::load_from_file(temp_file.path()).unwrap();

    assert_eq!(config.device.id, "vitals-monitor");
    assert_eq!(config.network.interface, "wlan0");
    assert_eq!(config.network.retry_interval_ms, 500);
    assert_eq!(config.network.max_attempts, Some(120));
    assert_eq!(config.mqtt.retry_interval_ms, 1000);
    assert_eq!(config.mqtt.max_attempts, Some(30));
    assert_eq!(config.topics.weight, "device/weight");
    assert_eq!(config.topics.pulse, "device/pulse");
    assert_eq!(config.topics.temperature, "device/temperature");
    assert_eq!(config.email.smtp_port, None);
    assert_eq!(config.email.port(), 587);
    assert_eq!(config.sensors.mass_samples, 20);
    assert_eq!(config.thresholds.mode, BoundaryMode::OutsideRange);
    assert_eq!(config.thresholds.pulse_lower, 60.0);
    assert_eq!(config.thresholds.pulse_upper, 100.0);
    assert_eq!(config.thresholds.temperature_lower, 36.1);
    assert_eq!(config.thresholds.temperature_upper, 37.2);
    assert_eq!(config.schedule.cycle_interval_ms, 5000);
}

#[test]
fn test_full_config_overrides_defaults() {
    let content = format!(
        r#"{MINIMAL}
[device]
id = "crib-07"

[network]
interface = "wlp2s0"
ssid = "ward-iot"
password_env = "WARD_WIFI_PASS"
max_attempts = 10

[topics]
weight = "crib-07/weight"

[thresholds]
mode = "legacy_disjunction"
pulse_upper = 160

[schedule]
cycle_interval_ms = 1000
"#
    );
    let temp_file = write_config(&content);

    let config = MonitorConfig::load_from_file(temp_file.path()).unwrap();

    assert_eq!(config.device.id, "crib-07");
    assert_eq!(config.network.interface, "wlp2s0");
    assert_eq!(config.network.ssid.as_deref(), Some("ward-iot"));
    assert_eq!(config.network.max_attempts, Some(10));
    assert_eq!(config.topics.weight, "crib-07/weight");
    assert_eq!(config.topics.pulse, "device/pulse");
    assert_eq!(config.thresholds.mode, BoundaryMode::LegacyDisjunction);
    assert_eq!(config.thresholds.pulse_upper, 160.0);
    assert_eq!(config.schedule.cycle_interval_ms, 1000);
}

#[test]
fn test_missing_file_is_read_error() {
    let result = MonitorConfig::load_from_file(std::path::Path::new("/nonexistent/monitor.toml"));
    assert!(matches!(result, Err(ConfigError::FileRead(_))));
}

#[test]
fn test_malformed_toml_is_parse_error() {
    let temp_file = write_config("[mqtt\nbroker_url = ");
    let result = MonitorConfig::load_from_file(temp_file.path());
    assert!(matches!(result, Err(ConfigError::TomlParse(_))));
}

#[test]
fn test_missing_required_section_is_parse_error() {
    let result = MonitorConfig::from_toml_str("[device]\nid = \"crib-07\"\n");
    assert!(matches!(result, Err(ConfigError::TomlParse(_))));
}

#[test]
fn test_invalid_device_id_rejected() {
    let content = format!("{MINIMAL}\n[device]\nid = \"crib 07/bad\"\n");
    let result = MonitorConfig::from_toml_str(&content);
    assert!(matches!(result, Err(ConfigError::InvalidDeviceId(_))));
}

#[test]
fn test_zero_scale_rejected() {
    let content = MINIMAL.replace("593.024292", "0.0");
    let result = MonitorConfig::from_toml_str(&content);
    assert!(matches!(result, Err(ConfigError::InvalidConfig(_))));
}

#[test]
fn test_inverted_thresholds_rejected() {
    let content = format!("{MINIMAL}\n[thresholds]\npulse_lower = 120\npulse_upper = 60\n");
    let err = MonitorConfig::from_toml_str(&content).unwrap_err();
    assert!(err.to_string().contains("pulse_lower"));
}

#[test]
fn test_zero_max_attempts_means_unlimited() {
    let content = format!("{MINIMAL}\n[network]\nmax_attempts = 0\n");
    let config = MonitorConfig::from_toml_str(&content).unwrap();
    assert_eq!(config.network.max_attempts, None);
    assert_eq!(config.mqtt.max_attempts, Some(30));

    let rendered = toml::to_string_pretty(&config).unwrap();
    let reparsed = MonitorConfig::from_toml_str(&rendered).unwrap();
    assert_eq!(reparsed.network.max_attempts, None);
}

#[test]
fn test_unknown_boundary_mode_rejected() {
    let content = format!("{MINIMAL}\n[thresholds]\nmode = \"sometimes\"\n");
    let result = MonitorConfig::from_toml_str(&content);
    assert!(matches!(result, Err(ConfigError::TomlParse(_))));
}

#[test]
fn test_smtp_credentials_require_both_variables_set() {
    let content = MINIMAL.replace(
        "recipient = \"ward@example.com\"",
        "recipient = \"ward@example.com\"\nusername_env = \"VITALS_TEST_SMTP_USER_UNSET\"\npassword_env = \"VITALS_TEST_SMTP_PASS_UNSET\"",
    );
    let config = MonitorConfig::from_toml_str(&content).unwrap();

    assert!(matches!(
        config.get_smtp_credentials(),
        Err(ConfigError::EnvVarNotFound(_))
    ));
}

#[test]
fn test_lone_smtp_username_rejected() {
    std::env::set_var("VITALS_TEST_LONE_SMTP_USER", "monitor");
    let content = MINIMAL.replace(
        "recipient = \"ward@example.com\"",
        "recipient = \"ward@example.com\"\nusername_env = \"VITALS_TEST_LONE_SMTP_USER\"",
    );

    let err = MonitorConfig::from_toml_str(&content).unwrap_err();

    assert!(matches!(err, ConfigError::InvalidConfig(_)));
    assert!(err.to_string().contains("password_env"));
}

#[test]
fn test_implicit_tls_defaults_to_port_465() {
    let content = MINIMAL.replace(
        "from = \"monitor@example.com\"",
        "from = \"monitor@example.com\"\nimplicit_tls = true",
    );
    let config = MonitorConfig::from_toml_str(&content).unwrap();
    assert_eq!(config.email.port(), 465);

    let explicit = content.replace("implicit_tls = true", "implicit_tls = true\nsmtp_port = 587");
    assert!(matches!(
        MonitorConfig::from_toml_str(&explicit),
        Err(ConfigError::InvalidConfig(_))
    ));
}

#[test]
fn test_config_round_trips_through_toml() {
    let config = MonitorConfig::from_toml_str(MINIMAL).unwrap();
    let rendered = toml::to_string_pretty(&config).unwrap();
    let reparsed = MonitorConfig::from_toml_str(&rendered).unwrap();
    assert_eq!(config, reparsed);
}
