//! Main decoder API
//!
//! [`Adm1266`] is the entry point for one power manager: it reads the raw
//! blackbox through a [`BlackboxDevice`], splits it into records, resolves
//! causes against the DPM's rule table, and renders the display fields.

use crate::blackbox::{parse_blackbox, BlackboxRecords, RawFaultRecord, RECORD_SIZE};
use crate::config::{dpm_names, Adm1266PlatformSpec, ConfigStore};
use crate::device::{BlackboxDevice, NvmemDevice};
use crate::history::DpmFault;
use crate::render::ChannelClass;
use crate::types::{
    reboot_cause_type, DecoderError, FaultRecord, ReasonRecord, RebootCause, Result,
};
use std::collections::BTreeMap;

/// One ADM1266 and its blackbox store
pub struct Adm1266 {
    spec: Adm1266PlatformSpec,
    device: Box<dyn BlackboxDevice>,
    stride: usize,
}

impl Adm1266 {
    /// Create a decoder reading from `device`
    pub fn new(spec: Adm1266PlatformSpec, device: Box<dyn BlackboxDevice>) -> Self {
        Self {
            spec,
            device,
            stride: RECORD_SIZE,
        }
    }

    /// Create a decoder reading the platform's `nvmem_path`
    pub fn from_spec(spec: Adm1266PlatformSpec) -> Result<Self> {
        let path = spec.nvmem_path().ok_or_else(|| {
            DecoderError::Config(format!("DPM '{}' has no nvmem_path", spec.name()))
        })?;
        let device = NvmemDevice::new(path);
        Ok(Self::new(spec, Box::new(device)))
    }

    /// Builder method: override the record stride
    pub fn with_stride(mut self, stride: usize) -> Self {
        self.stride = stride;
        self
    }

    pub fn name(&self) -> &str {
        self.spec.name()
    }

    pub fn spec(&self) -> &Adm1266PlatformSpec {
        &self.spec
    }

    /// Raw blackbox contents
    pub fn read_blackbox(&self) -> Result<Vec<u8>> {
        self.device.read_blackbox()
    }

    /// Split a buffer into undecorated records
    pub fn parse_blackbox<'a>(&self, data: &'a [u8]) -> BlackboxRecords<'a> {
        parse_blackbox(data, self.stride)
    }

    /// Resolve causes and render display fields for one record
    pub fn decode_record(&self, raw: RawFaultRecord) -> FaultRecord {
        let cause = self
            .spec
            .rules()
            .resolve(raw.pdio_in as u32, raw.gpio_in as u32);

        let channels: BTreeMap<String, String> = ChannelClass::ALL
            .iter()
            .map(|class| {
                let bits = raw.channel_bits(class.tag()).unwrap_or_default();
                (class.tag().to_string(), self.spec.channels().render(*class, bits))
            })
            .collect();

        log::debug!(
            "{}: record uid=0x{:04x} pdio_in=0x{:04x} gpio_in=0x{:04x} cause={:?}",
            self.name(),
            raw.uid,
            raw.pdio_in,
            raw.gpio_in,
            cause.hw_cause
        );

        FaultRecord {
            uid: format!("0x{:04x}", raw.uid),
            dpm_name: self.name().to_string(),
            power_loss: cause.is_power_loss(),
            timestamp: self.spec.time().time_since("timestamp", &raw.timestamp),
            powerup_counter: raw.powerup_counter,
            action_index: raw.action_index,
            rule_index: raw.rule_index,
            channels,
            cause,
            raw: raw.raw,
        }
    }

    /// Read and decode every record in the blackbox
    pub fn get_blackbox_records(&self) -> Result<Vec<FaultRecord>> {
        Ok(self.decoded()?.into_iter().map(|(_, rec)| rec).collect())
    }

    /// Every record in history form
    pub fn get_all_faults(&self) -> Result<Vec<DpmFault>> {
        let records = self.get_blackbox_records()?;
        Ok(records.iter().map(DpmFault::from_record).collect())
    }

    /// Erase the blackbox
    pub fn clear_blackbox(&mut self) -> Result<()> {
        log::info!("Clearing blackbox of DPM '{}'", self.name());
        self.device.clear_blackbox()
    }

    /// Reboot cause from the newest record that resolved to a cause
    ///
    /// The blackbox is circular, so storage order is not chronological; see
    /// [`uid_follows`]. `None` when no record has a cause.
    pub fn get_reboot_cause(&self) -> Result<Option<ReasonRecord>> {
        let latest = latest_caused(self.decoded()?).map(|rec| ReasonRecord {
            cause: RebootCause::from_cause_str(&rec.cause.reboot_cause),
            description: rec.cause.summary,
        });
        Ok(latest)
    }

    fn decoded(&self) -> Result<Vec<(u16, FaultRecord)>> {
        let data = self.read_blackbox()?;
        log::info!(
            "DPM '{}': read {} bytes from {}",
            self.name(),
            data.len(),
            self.device.describe()
        );
        Ok(self
            .parse_blackbox(&data)
            .map(|raw| (raw.uid, self.decode_record(raw)))
            .collect())
    }
}

/// True when record UID `a` was written after `b`
///
/// UIDs are a wrapping 16-bit sequence: `a` follows `b` when the forward
/// distance from `b` to `a` is non-zero and under half the range, so `0x0001`
/// follows `0xFFFE`.
pub fn uid_follows(a: u16, b: u16) -> bool {
    let gap = a.wrapping_sub(b);
    gap != 0 && gap < 0x8000
}

/// Newest record carrying a reboot cause
fn latest_caused(records: Vec<(u16, FaultRecord)>) -> Option<FaultRecord> {
    records
        .into_iter()
        .filter(|(_, rec)| !rec.cause.reboot_cause.is_empty())
        .reduce(|best, cand| if uid_follows(cand.0, best.0) { cand } else { best })
        .map(|(_, rec)| rec)
}

/// Build a decoder for every DPM in the store
pub fn load_all(store: &dyn ConfigStore) -> Result<Vec<Adm1266>> {
    dpm_names(store)?
        .iter()
        .map(|name| Adm1266PlatformSpec::from_store(name, store).and_then(Adm1266::from_spec))
        .collect()
}

/// Combined reboot cause across several DPMs
///
/// Each DPM contributes its newest cause; the category is the first valid one
/// in DPM order and the description lists every contributor.
pub fn reboot_cause_from(dpms: &[Adm1266]) -> Result<Option<ReasonRecord>> {
    let mut causes = Vec::new();
    let mut details = Vec::new();

    for dpm in dpms {
        if let Some(rec) = latest_caused(dpm.decoded()?) {
            details.push(format!("{}: {}", dpm.name(), rec.cause.summary));
            causes.push(rec.cause.reboot_cause);
        }
    }

    if causes.is_empty() {
        log::info!("No DPM recorded a hardware reboot cause");
        return Ok(None);
    }

    Ok(Some(ReasonRecord {
        cause: reboot_cause_type(&causes),
        description: details.join("; "),
    }))
}

/// Reboot cause for every DPM defined in the store
pub fn get_reboot_cause(store: &dyn ConfigStore) -> Result<Option<ReasonRecord>> {
    reboot_cause_from(&load_all(store)?)
}
