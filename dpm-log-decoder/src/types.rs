//! Core types for the DPM blackbox decoder library
//!
//! This module defines the fundamental types the decoder emits when processing
//! a blackbox dump. The decoder is stateless: it turns a raw buffer plus a rule
//! table into fault records and reboot-cause categories, nothing more.

use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Result type for decoder operations
pub type Result<T> = std::result::Result<T, DecoderError>;

/// Errors that can occur while reading or decoding a blackbox
///
/// Malformed records and unmatched signal samples are never errors: the parser
/// drops truncated data and the resolver returns empty causes.
#[derive(Debug, thiserror::Error)]
pub enum DecoderError {
    #[error("Failed to access device {device}: {source}")]
    DeviceAccess {
        device: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid hex value for '{field}': {value:?}")]
    InvalidHex { field: String, value: String },

    #[error("History store error: {0}")]
    History(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Categorised reboot cause
///
/// Display strings match the chassis base constants that platform reporting
/// tools compare against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RebootCause {
    PowerLoss,
    ThermalOverloadCpu,
    ThermalOverloadAsic,
    ThermalOverloadOther,
    InsufficientFanSpeed,
    Watchdog,
    HardwareOther,
    HardwareBios,
    HardwareCpu,
    HardwareButton,
    HardwareResetFromAsic,
    NonHardware,
    /// Sentinel for cause strings that name no known category
    Invalid,
}

impl RebootCause {
    /// Look up a single `REBOOT_CAUSE_*` name
    fn from_name(name: &str) -> Self {
        match name {
            "REBOOT_CAUSE_POWER_LOSS" => RebootCause::PowerLoss,
            "REBOOT_CAUSE_THERMAL_OVERLOAD_CPU" => RebootCause::ThermalOverloadCpu,
            "REBOOT_CAUSE_THERMAL_OVERLOAD_ASIC" => RebootCause::ThermalOverloadAsic,
            "REBOOT_CAUSE_THERMAL_OVERLOAD_OTHER" => RebootCause::ThermalOverloadOther,
            "REBOOT_CAUSE_INSUFFICIENT_FAN_SPEED" => RebootCause::InsufficientFanSpeed,
            "REBOOT_CAUSE_WATCHDOG" => RebootCause::Watchdog,
            "REBOOT_CAUSE_HARDWARE_OTHER" => RebootCause::HardwareOther,
            "REBOOT_CAUSE_HARDWARE_BIOS" => RebootCause::HardwareBios,
            "REBOOT_CAUSE_HARDWARE_CPU" => RebootCause::HardwareCpu,
            "REBOOT_CAUSE_HARDWARE_BUTTON" => RebootCause::HardwareButton,
            "REBOOT_CAUSE_HARDWARE_RESET_FROM_ASIC" => RebootCause::HardwareResetFromAsic,
            "REBOOT_CAUSE_NON_HARDWARE" => RebootCause::NonHardware,
            _ => RebootCause::Invalid,
        }
    }

    /// Categorise a comma-separated cause string by its first entry
    ///
    /// Only the first listed cause is considered (after trimming whitespace);
    /// callers that need every cause keep the original string.
    pub fn from_cause_str(causes: &str) -> Self {
        let first = causes.split(',').next().unwrap_or_default();
        Self::from_name(first.trim())
    }

    /// Check whether this is a real category rather than the sentinel
    pub fn is_valid(&self) -> bool {
        *self != RebootCause::Invalid
    }

    /// Chassis-level description string
    pub fn as_str(&self) -> &'static str {
        match self {
            RebootCause::PowerLoss => "Power Loss",
            RebootCause::ThermalOverloadCpu => "Thermal Overload: CPU",
            RebootCause::ThermalOverloadAsic => "Thermal Overload: ASIC",
            RebootCause::ThermalOverloadOther => "Thermal Overload: Other",
            RebootCause::InsufficientFanSpeed => "Insufficient Fan Speed",
            RebootCause::Watchdog => "Watchdog",
            RebootCause::HardwareOther => "Hardware - Other",
            RebootCause::HardwareBios => "BIOS",
            RebootCause::HardwareCpu => "CPU",
            RebootCause::HardwareButton => "Push button",
            RebootCause::HardwareResetFromAsic => "Reset from ASIC",
            RebootCause::NonHardware => "Non-Hardware",
            RebootCause::Invalid => "Invalid",
        }
    }
}

impl fmt::Display for RebootCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Categorise a comma-separated cause string by its first entry
pub fn reboot_cause_str_to_type(causes: &str) -> RebootCause {
    RebootCause::from_cause_str(causes)
}

/// Pick one category from several cause strings
///
/// Returns the category of the first string that maps to a real cause, or
/// [`RebootCause::Invalid`] when none does.
pub fn reboot_cause_type<S: AsRef<str>>(causes: &[S]) -> RebootCause {
    causes
        .iter()
        .map(|c| RebootCause::from_cause_str(c.as_ref()))
        .find(RebootCause::is_valid)
        .unwrap_or(RebootCause::Invalid)
}

/// The four per-column fields produced by the fault-cause resolver
///
/// Each field is a comma-joined list in rule-table order, so the k-th entry
/// of `hw_cause` belongs to the same rule as the k-th entry of `reboot_cause`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedCause {
    pub hw_cause: String,
    pub hw_desc: String,
    pub summary: String,
    pub reboot_cause: String,
}

impl ResolvedCause {
    /// True when no rule matched
    pub fn is_empty(&self) -> bool {
        self.hw_cause.is_empty()
            && self.hw_desc.is_empty()
            && self.summary.is_empty()
            && self.reboot_cause.is_empty()
    }

    /// True when any listed cause categorises as a power loss
    pub fn is_power_loss(&self) -> bool {
        self.reboot_cause
            .split(',')
            .any(|c| RebootCause::from_cause_str(c) == RebootCause::PowerLoss)
    }
}

/// A decoded fault record with rendered fields and resolved causes
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FaultRecord {
    /// Record UID rendered as `0x%04x`
    pub uid: String,
    /// Name of the DPM the record was read from
    pub dpm_name: String,
    #[serde(serialize_with = "serialize_yes_no")]
    pub power_loss: bool,
    /// Elapsed time since power-on, rendered
    pub timestamp: String,
    pub powerup_counter: u16,
    pub action_index: u8,
    pub rule_index: u8,
    /// Channel class tag → rendered channel names
    pub channels: BTreeMap<String, String>,
    #[serde(flatten)]
    pub cause: ResolvedCause,
    /// Undecoded record bytes
    #[serde(skip)]
    pub raw: Vec<u8>,
}

/// A categorised reboot cause with free-text detail
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReasonRecord {
    pub cause: RebootCause,
    pub description: String,
}

pub(crate) fn serialize_yes_no<S: Serializer>(
    value: &bool,
    s: S,
) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_str(if *value { "Yes" } else { "No" })
}
