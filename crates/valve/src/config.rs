//! TOML config file loading and validation for the valve node.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs;

// ---------------------------------------------------------------------------
// Config file structures
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(crate) struct Config {
    pub(crate) device: DeviceConfig,
    pub(crate) mqtt: MqttConfig,
    #[serde(default)]
    pub(crate) control: ControlConfig,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DeviceConfig {
    /// Irrigation section this valve serves; also addresses the MQTT topics.
    pub(crate) section_device_id: i64,
    pub(crate) valve_gpio_pin: i64,
    #[serde(default = "default_active_low")]
    pub(crate) relay_active_low: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MqttConfig {
    pub(crate) host: String,
    #[serde(default = "default_mqtt_port")]
    pub(crate) port: u16,
    #[serde(default)]
    pub(crate) username: String,
    #[serde(default)]
    pub(crate) password: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ControlConfig {
    /// Manual-off deadline check cadence.  Must stay well under the
    /// shortest manual-off duration an operator can configure (minutes),
    /// so anything over 30 s is rejected.
    #[serde(default = "default_tick_interval")]
    pub(crate) tick_interval_sec: u64,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            tick_interval_sec: default_tick_interval(),
        }
    }
}

fn default_active_low() -> bool {
    true
}

fn default_mqtt_port() -> u16 {
    1883
}

fn default_tick_interval() -> u64 {
    5
}

// ---------------------------------------------------------------------------
// GPIO whitelist
// ---------------------------------------------------------------------------

/// BCM GPIO pins available on the Raspberry Pi 40-pin header for general
/// use. GPIO 0-1 are reserved for the ID EEPROM and must never be used.
/// GPIO 28+ are not exposed on the standard header.
const VALID_GPIO_PINS: &[i64] = &[
    2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 21, 22, 23, 24, 25, 26, 27,
];

/// Longest tolerable tick interval; keeps the cooperative deadline check
/// finer than one-minute manual timers.
const MAX_TICK_INTERVAL_SEC: u64 = 30;

// ---------------------------------------------------------------------------
// Loading & validation
// ---------------------------------------------------------------------------

pub(crate) fn load(path: &str) -> Result<Config> {
    let raw = fs::read_to_string(path).with_context(|| format!("reading config file '{path}'"))?;
    let cfg: Config =
        toml::from_str(&raw).with_context(|| format!("parsing config file '{path}'"))?;
    cfg.validate()?;
    Ok(cfg)
}

impl Config {
    /// Validate all config entries. Returns `Ok(())` or an error describing
    /// every violation found (not just the first one).
    pub(crate) fn validate(&self) -> Result<()> {
        let mut errors: Vec<String> = Vec::new();

        if self.device.section_device_id <= 0 {
            errors.push(format!(
                "device: section_device_id must be positive, got {}",
                self.device.section_device_id
            ));
        }

        if !VALID_GPIO_PINS.contains(&self.device.valve_gpio_pin) {
            errors.push(format!(
                "device: valve_gpio_pin {} is not a valid BCM GPIO pin (allowed: 2-27)",
                self.device.valve_gpio_pin
            ));
        }

        if self.mqtt.host.trim().is_empty() {
            errors.push("mqtt: host is empty".to_string());
        }

        if self.control.tick_interval_sec == 0 {
            errors.push("control: tick_interval_sec must be positive".to_string());
        } else if self.control.tick_interval_sec > MAX_TICK_INTERVAL_SEC {
            errors.push(format!(
                "control: tick_interval_sec {} exceeds maximum {MAX_TICK_INTERVAL_SEC} \
                 (manual-off deadlines are checked cooperatively and need sub-minute resolution)",
                self.control.tick_interval_sec
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            bail!(
                "config validation failed ({} error{}):\n  - {}",
                errors.len(),
                if errors.len() == 1 { "" } else { "s" },
                errors.join("\n  - ")
            );
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================
