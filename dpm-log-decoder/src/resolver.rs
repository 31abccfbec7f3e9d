//! Fault-cause resolution
//!
//! Matches a sampled `(pdio, gpio)` pair against an ordered rule table. A rule
//! matches when both masked comparisons hold; every matching rule contributes
//! all four of its description fields.

use crate::types::ResolvedCause;

/// One masked-equality rule from the plugin's `dpm_signal_to_fault_cause` table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaultCauseRule {
    pub pdio_mask: u32,
    pub pdio_value: u32,
    pub gpio_mask: u32,
    pub gpio_value: u32,
    pub hw_cause: String,
    pub hw_desc: String,
    pub summary: String,
    pub reboot_cause: String,
}

impl FaultCauseRule {
    /// Masked equality on both signal classes
    pub fn matches(&self, pdio: u32, gpio: u32) -> bool {
        (pdio & self.pdio_mask) == self.pdio_value && (gpio & self.gpio_mask) == self.gpio_value
    }
}

/// Ordered, immutable rule table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FaultCauseTable {
    rules: Vec<FaultCauseRule>,
}

impl FaultCauseTable {
    pub fn new(rules: Vec<FaultCauseRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[FaultCauseRule] {
        &self.rules
    }

    /// Resolve a sample against this table
    pub fn resolve(&self, pdio: u32, gpio: u32) -> ResolvedCause {
        decode_power_fault_cause(&self.rules, pdio, gpio)
    }
}

/// Resolve a sample against `rules`
///
/// Fields are joined per column with `","` in table order. Identical text from
/// two different rules is kept twice so positions stay aligned across fields.
/// No match gives four empty strings.
pub fn decode_power_fault_cause(rules: &[FaultCauseRule], pdio: u32, gpio: u32) -> ResolvedCause {
    let matched: Vec<&FaultCauseRule> = rules.iter().filter(|r| r.matches(pdio, gpio)).collect();

    let join = |field: fn(&FaultCauseRule) -> &str| {
        matched.iter().map(|r| field(r)).collect::<Vec<_>>().join(",")
    };

    ResolvedCause {
        hw_cause: join(|r| r.hw_cause.as_str()),
        hw_desc: join(|r| r.hw_desc.as_str()),
        summary: join(|r| r.summary.as_str()),
        reboot_cause: join(|r| r.reboot_cause.as_str()),
    }
}
