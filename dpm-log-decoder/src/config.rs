//! Platform configuration for DPM decoding
//!
//! DPM definitions live in the PDDF plugin document under `DPM.<name>`. This
//! module reads them through a small key-path store interface, validates the
//! fault-cause table once at load time, and hands back an immutable
//! [`Adm1266PlatformSpec`].

use crate::render::{ChannelNames, TimeRenderer};
use crate::resolver::{FaultCauseRule, FaultCauseTable};
use crate::types::{DecoderError, Result};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Top-level key holding all DPM definitions
pub const DPM_KEY: &str = "DPM";

/// Read-only key/value configuration source
///
/// `lookup` walks a key path through a nested document and returns the value
/// found there, or `None` when any component is missing.
pub trait ConfigStore {
    fn lookup(&self, path: &[&str]) -> Result<Option<Value>>;
}

impl ConfigStore for Value {
    fn lookup(&self, path: &[&str]) -> Result<Option<Value>> {
        let mut node = self;
        for key in path {
            match node.get(*key) {
                Some(next) => node = next,
                None => return Ok(None),
            }
        }
        Ok(Some(node.clone()))
    }
}

/// PDDF plugin JSON document loaded from disk
#[derive(Debug, Clone)]
pub struct PddfPluginFile {
    path: PathBuf,
    data: Value,
}

impl PddfPluginFile {
    /// Read and parse the plugin file
    pub fn open(path: &Path) -> Result<Self> {
        log::info!("Loading PDDF plugin data: {:?}", path);

        let content = fs::read_to_string(path).map_err(|e| {
            DecoderError::Config(format!("Failed to read plugin file {:?}: {}", path, e))
        })?;
        let data = serde_json::from_str(&content)?;

        Ok(Self {
            path: path.to_path_buf(),
            data,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigStore for PddfPluginFile {
    fn lookup(&self, path: &[&str]) -> Result<Option<Value>> {
        self.data.lookup(path)
    }
}

/// Names of every DPM defined in the store, in key order
pub fn dpm_names(store: &dyn ConfigStore) -> Result<Vec<String>> {
    match store.lookup(&[DPM_KEY])? {
        Some(Value::Object(map)) => Ok(map.keys().cloned().collect()),
        Some(_) => Err(DecoderError::Config(format!("'{}' is not an object", DPM_KEY))),
        None => Ok(Vec::new()),
    }
}

/// A mask or value field: either a hex string (`"0x0001"`) or a plain integer
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum HexField {
    Text(String),
    Number(u64),
}

impl HexField {
    fn parse(&self, field: &str) -> Result<u32> {
        let invalid = || DecoderError::InvalidHex {
            field: field.to_string(),
            value: match self {
                HexField::Text(s) => s.clone(),
                HexField::Number(n) => n.to_string(),
            },
        };

        match self {
            HexField::Number(n) => u32::try_from(*n).map_err(|_| invalid()),
            HexField::Text(s) => {
                let s = s.trim();
                let digits = s
                    .strip_prefix("0x")
                    .or_else(|| s.strip_prefix("0X"))
                    .unwrap_or(s);
                u32::from_str_radix(digits, 16).map_err(|_| invalid())
            }
        }
    }
}

/// Rule entry exactly as it appears in the plugin document
#[derive(Debug, Clone, Deserialize)]
struct RuleSpec {
    pdio_mask: HexField,
    pdio_value: HexField,
    gpio_mask: HexField,
    gpio_value: HexField,
    #[serde(default)]
    hw_cause: String,
    #[serde(default)]
    hw_desc: String,
    #[serde(default)]
    summary: String,
    #[serde(default)]
    reboot_cause: String,
}

impl RuleSpec {
    fn validate(self, index: usize) -> Result<FaultCauseRule> {
        let field = |name: &str| format!("dpm_signal_to_fault_cause[{}].{}", index, name);
        Ok(FaultCauseRule {
            pdio_mask: self.pdio_mask.parse(&field("pdio_mask"))?,
            pdio_value: self.pdio_value.parse(&field("pdio_value"))?,
            gpio_mask: self.gpio_mask.parse(&field("gpio_mask"))?,
            gpio_value: self.gpio_value.parse(&field("gpio_value"))?,
            hw_cause: self.hw_cause,
            hw_desc: self.hw_desc,
            summary: self.summary,
            reboot_cause: self.reboot_cause,
        })
    }
}

/// Per-DPM section of the plugin document
#[derive(Debug, Clone, Default, Deserialize)]
struct DpmSection {
    #[serde(default)]
    nvmem_path: Option<PathBuf>,
    #[serde(default)]
    dpm_signal_to_fault_cause: Vec<RuleSpec>,
    #[serde(default)]
    vpx_to_rail_desc: BTreeMap<String, String>,
    #[serde(default)]
    vhx_to_rail_desc: BTreeMap<String, String>,
    #[serde(default)]
    time_units: BTreeMap<String, u64>,
}

/// Validated, immutable description of one ADM1266
#[derive(Debug, Clone)]
pub struct Adm1266PlatformSpec {
    name: String,
    nvmem_path: Option<PathBuf>,
    rules: FaultCauseTable,
    channels: ChannelNames,
    time: TimeRenderer,
}

impl Adm1266PlatformSpec {
    /// Load the DPM called `name` from `DPM.<name>` in the store
    pub fn from_store(name: &str, store: &dyn ConfigStore) -> Result<Self> {
        let value = store.lookup(&[DPM_KEY, name])?.ok_or_else(|| {
            DecoderError::Config(format!("DPM '{}' not found in plugin data", name))
        })?;
        Self::from_value(name, value)
    }

    /// Build a spec from an already-extracted DPM section
    pub fn from_value(name: &str, value: Value) -> Result<Self> {
        let section: DpmSection = serde_json::from_value(value)
            .map_err(|e| DecoderError::Config(format!("DPM '{}': {}", name, e)))?;

        let rules = section
            .dpm_signal_to_fault_cause
            .into_iter()
            .enumerate()
            .map(|(i, rule)| rule.validate(i))
            .collect::<Result<Vec<_>>>()?;

        if rules.is_empty() {
            log::warn!("DPM '{}' has no fault-cause rules; causes will be empty", name);
        }

        let vp_rails = parse_rail_table(name, "vpx_to_rail_desc", section.vpx_to_rail_desc)?;
        let vh_rails = parse_rail_table(name, "vhx_to_rail_desc", section.vhx_to_rail_desc)?;

        let mut time = TimeRenderer::default();
        for (field, ticks) in section.time_units {
            time = time.with_unit(field, ticks);
        }

        log::debug!("Loaded DPM '{}' with {} fault-cause rules", name, rules.len());

        Ok(Self {
            name: name.to_string(),
            nvmem_path: section.nvmem_path,
            rules: FaultCauseTable::new(rules),
            channels: ChannelNames::new(vp_rails, vh_rails),
            time,
        })
    }

    /// Spec with no rules or rail names, backed by `nvmem_path`
    pub fn bare(name: impl Into<String>, nvmem_path: Option<PathBuf>) -> Self {
        Self {
            name: name.into(),
            nvmem_path,
            rules: FaultCauseTable::default(),
            channels: ChannelNames::default(),
            time: TimeRenderer::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn nvmem_path(&self) -> Option<&Path> {
        self.nvmem_path.as_deref()
    }

    pub fn rules(&self) -> &FaultCauseTable {
        &self.rules
    }

    pub fn channels(&self) -> &ChannelNames {
        &self.channels
    }

    pub fn time(&self) -> &TimeRenderer {
        &self.time
    }
}

fn parse_rail_table(
    dpm: &str,
    key: &str,
    table: BTreeMap<String, String>,
) -> Result<BTreeMap<u8, String>> {
    table
        .into_iter()
        .map(|(channel, rail)| {
            let channel = channel.trim().parse::<u8>().map_err(|_| {
                DecoderError::Config(format!(
                    "DPM '{}': {} key {:?} is not a channel number",
                    dpm, key, channel
                ))
            })?;
            Ok((channel, rail))
        })
        .collect()
}
