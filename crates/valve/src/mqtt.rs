//! MQTT payload typing and topic helpers.  All decode failures live here;
//! the controller only ever sees a fully-typed [`CommandEvent`].

use serde::{Deserialize, Serialize};

use crate::controller::{CommandEvent, Mode, StatusReport};

// ---------------------------------------------------------------------------
// Wire schemas
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(crate) struct CommandMsg {
    pub(crate) valve_mode: String,
    pub(crate) valve_status: String,
    pub(crate) auto_on_threshold: i32,
    pub(crate) auto_off_threshold: i32,
    pub(crate) avg_section_moisture: i32,
    pub(crate) manual_off_timer: i64,
}

#[derive(Debug, Serialize)]
pub(crate) struct StatusMsg {
    pub(crate) section_device_id: i64,
    pub(crate) mode: &'static str,
    pub(crate) status: &'static str,
}

impl StatusMsg {
    pub(crate) fn from_report(section_device_id: i64, report: &StatusReport) -> Self {
        Self {
            section_device_id,
            mode: report.mode.as_str(),
            status: if report.on { "on" } else { "off" },
        }
    }
}

// ---------------------------------------------------------------------------
// Topics
// ---------------------------------------------------------------------------

/// Control messages addressed to this device.
pub(crate) fn command_topic(section_device_id: i64) -> String {
    format!("/farm/valve/{section_device_id}")
}

/// Status reports published by this device.
pub(crate) fn status_topic(section_device_id: i64) -> String {
    format!("/farm/valve/post/{section_device_id}")
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Parse "auto"/"manual" (case-insensitive, trims whitespace).
fn parse_mode(s: &str) -> Result<Mode, String> {
    match s.trim().to_ascii_lowercase().as_str() {
        "auto" => Ok(Mode::Auto),
        "manual" => Ok(Mode::Manual),
        other => Err(format!("unknown valve_mode '{other}'")),
    }
}

/// Parse "on"/"off" (case-insensitive, trims whitespace).
fn parse_status(s: &str) -> Result<bool, String> {
    match s.trim().to_ascii_lowercase().as_str() {
        "on" => Ok(true),
        "off" => Ok(false),
        other => Err(format!("unknown valve_status '{other}'")),
    }
}

/// Decode a raw command payload into a typed event.  Any failure is owned
/// by this transport layer and never reaches the controller.
pub(crate) fn decode_command(payload: &[u8]) -> Result<CommandEvent, String> {
    let msg: CommandMsg =
        serde_json::from_slice(payload).map_err(|e| format!("bad command json: {e}"))?;

    Ok(CommandEvent {
        mode: parse_mode(&msg.valve_mode)?,
        on: parse_status(&msg.valve_status)?,
        auto_on_threshold: msg.auto_on_threshold,
        auto_off_threshold: msg.auto_off_threshold,
        moisture: msg.avg_section_moisture,
        manual_off_min: msg.manual_off_timer,
    })
}

// ===========================================================================
// Tests
// ===========================================================================
