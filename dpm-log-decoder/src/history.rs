//! Reboot-cause history snapshots
//!
//! Each save writes `reboot-cause-<gen_time>.json` into the history directory
//! and repoints the `previous-reboot-cause.json` symlink at it. Older snapshots
//! beyond the retention limit are removed.

use crate::types::{DecoderError, FaultRecord, Result};
use base64::prelude::*;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::os::unix::fs::symlink;
use std::path::{Path, PathBuf};

/// DPM family recorded in every envelope
pub const DPM_TYPE: &str = "adm1266";
pub const SCHEMA_VERSION: u32 = 1;
/// `gen_time` format, also used in snapshot file names
pub const GEN_TIME_FORMAT: &str = "%Y_%m_%d_%H_%M_%S";
pub const DEFAULT_MAX_ENTRIES: usize = 10;

const FILE_PREFIX: &str = "reboot-cause-";
const FILE_SUFFIX: &str = ".json";
const PREVIOUS_LINK: &str = "previous-reboot-cause.json";
const RAW_PREFIX: &str = "base64:";

/// One fault as persisted in a snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DpmFault {
    pub dpm_name: String,
    pub fault_uid: String,
    /// `"Yes"` or `"No"`
    pub power_loss: String,
    pub timestamp: String,
    /// Resolved summary
    pub dpm_fault: String,
    /// Record bytes, `base64:`-prefixed
    pub raw: String,
}

impl DpmFault {
    pub fn from_record(record: &FaultRecord) -> Self {
        Self {
            dpm_name: record.dpm_name.clone(),
            fault_uid: record.uid.clone(),
            power_loss: if record.power_loss { "Yes" } else { "No" }.to_string(),
            timestamp: record.timestamp.clone(),
            dpm_fault: record.cause.summary.clone(),
            raw: format!("{}{}", RAW_PREFIX, BASE64_STANDARD.encode(&record.raw)),
        }
    }

    /// Decoded record bytes, `None` if `raw` is not valid `base64:` text
    pub fn raw_bytes(&self) -> Option<Vec<u8>> {
        let encoded = self.raw.strip_prefix(RAW_PREFIX)?;
        BASE64_STANDARD.decode(encoded).ok()
    }
}

/// A snapshot file's contents
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEnvelope {
    pub dpm_type: String,
    pub gen_time: String,
    pub schema_version: u32,
    pub records_json: Vec<DpmFault>,
}

impl HistoryEnvelope {
    pub fn new(records: Vec<DpmFault>, gen_time: NaiveDateTime) -> Self {
        Self {
            dpm_type: DPM_TYPE.to_string(),
            gen_time: gen_time.format(GEN_TIME_FORMAT).to_string(),
            schema_version: SCHEMA_VERSION,
            records_json: records,
        }
    }

    /// True when this build knows how to display the records
    pub fn is_supported(&self) -> bool {
        self.dpm_type == DPM_TYPE
    }
}

/// Directory of reboot-cause snapshots
#[derive(Debug, Clone)]
pub struct DpmLogHistory {
    dir: PathBuf,
    max_entries: usize,
}

impl DpmLogHistory {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            max_entries: DEFAULT_MAX_ENTRIES,
        }
    }

    /// Builder method: number of snapshots to retain (at least one)
    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries.max(1);
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Persist `faults` as the newest snapshot and return its path
    pub fn save(&self, faults: Vec<DpmFault>, gen_time: NaiveDateTime) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;

        let envelope = HistoryEnvelope::new(faults, gen_time);
        let file_name = format!("{}{}{}", FILE_PREFIX, envelope.gen_time, FILE_SUFFIX);
        let path = self.dir.join(&file_name);

        let json = serde_json::to_string_pretty(&envelope)?;
        fs::write(&path, json)?;
        log::info!(
            "Saved {} DPM faults to {:?}",
            envelope.records_json.len(),
            path
        );

        // Replace the link by renaming a fresh one over it
        let link = self.dir.join(PREVIOUS_LINK);
        let tmp_link = self.dir.join(format!("{}.tmp", PREVIOUS_LINK));
        match fs::remove_file(&tmp_link) {
            Err(e) if e.kind() != ErrorKind::NotFound => return Err(e.into()),
            _ => {}
        }
        symlink(&file_name, &tmp_link)?;
        fs::rename(&tmp_link, &link)?;

        self.prune(&path)?;
        Ok(path)
    }

    /// Snapshot referenced by the `previous-reboot-cause.json` link
    pub fn current(&self) -> Result<Option<HistoryEnvelope>> {
        let link = self.dir.join(PREVIOUS_LINK);
        match fs::read_to_string(&link) {
            Ok(content) => {
                let envelope = serde_json::from_str(&content).map_err(|e| {
                    DecoderError::History(format!("Failed to parse {:?}: {}", link, e))
                })?;
                Ok(Some(envelope))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Every readable snapshot, oldest first
    ///
    /// Files that fail to parse are skipped with a warning.
    pub fn history(&self) -> Result<Vec<HistoryEnvelope>> {
        let mut envelopes = Vec::new();
        for path in self.snapshot_paths()? {
            let parsed = fs::read_to_string(&path)
                .map_err(DecoderError::from)
                .and_then(|content| Ok(serde_json::from_str::<HistoryEnvelope>(&content)?));
            match parsed {
                Ok(envelope) => envelopes.push(envelope),
                Err(e) => log::warn!("Skipping unreadable snapshot {:?}: {}", path, e),
            }
        }
        Ok(envelopes)
    }

    /// Snapshot files sorted by name, which is chronological
    pub fn snapshot_paths(&self) -> Result<Vec<PathBuf>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.starts_with(FILE_PREFIX) && name.ends_with(FILE_SUFFIX) {
                paths.push(entry.path());
            }
        }
        paths.sort();
        Ok(paths)
    }

    /// Drop the oldest snapshots beyond the limit, never `keep`
    ///
    /// `keep` may sort anywhere when the clock moved backwards since the
    /// previous save.
    fn prune(&self, keep: &Path) -> Result<()> {
        let others: Vec<PathBuf> = self
            .snapshot_paths()?
            .into_iter()
            .filter(|p| p != keep)
            .collect();
        let room = self.max_entries.saturating_sub(1);
        if others.len() <= room {
            return Ok(());
        }
        let excess = others.len() - room;
        for path in &others[..excess] {
            log::debug!("Pruning old snapshot {:?}", path);
            fs::remove_file(path)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, 15)
            .and_then(|d| d.and_hms_opt(h, m, s))
            .unwrap()
    }

    fn fault(name: &str, uid: &str) -> DpmFault {
        DpmFault {
            dpm_name: name.into(),
            fault_uid: uid.into(),
            power_loss: "Yes".into(),
            timestamp: "1.000 seconds after power-on".into(),
            dpm_fault: "PSU input power lost".into(),
            raw: format!("{}{}", RAW_PREFIX, BASE64_STANDARD.encode([0u8; 64])),
        }
    }

    #[test]
    fn test_save_and_read_current() {
        let dir = tempfile::tempdir().unwrap();
        let history = DpmLogHistory::new(dir.path());
        assert!(history.current().unwrap().is_none());

        let path = history
            .save(vec![fault("test-dpm-1", "0x1234")], at(10, 30, 45))
            .unwrap();
        assert!(path.ends_with("reboot-cause-2025_01_15_10_30_45.json"));

        let current = history.current().unwrap().unwrap();
        assert_eq!(current.dpm_type, "adm1266");
        assert_eq!(current.gen_time, "2025_01_15_10_30_45");
        assert_eq!(current.schema_version, 1);
        assert_eq!(current.records_json[0].fault_uid, "0x1234");
        assert_eq!(current.records_json[0].raw_bytes(), Some(vec![0u8; 64]));
    }

    #[test]
    fn test_link_follows_newest_save() {
        let dir = tempfile::tempdir().unwrap();
        let history = DpmLogHistory::new(dir.path());

        history.save(vec![fault("a", "0x1")], at(10, 0, 0)).unwrap();
        history.save(vec![fault("b", "0x2")], at(11, 0, 0)).unwrap();

        let current = history.current().unwrap().unwrap();
        assert_eq!(current.gen_time, "2025_01_15_11_00_00");

        let link = fs::read_link(dir.path().join(PREVIOUS_LINK)).unwrap();
        assert_eq!(link, PathBuf::from("reboot-cause-2025_01_15_11_00_00.json"));
    }

    #[test]
    fn test_history_is_oldest_first_and_pruned() {
        let dir = tempfile::tempdir().unwrap();
        let history = DpmLogHistory::new(dir.path()).with_max_entries(2);

        for h in [9, 10, 11] {
            history.save(vec![fault("dpm", "0x1")], at(h, 0, 0)).unwrap();
        }

        let all = history.history().unwrap();
        let times: Vec<_> = all.iter().map(|e| e.gen_time.as_str()).collect();
        assert_eq!(times, vec!["2025_01_15_10_00_00", "2025_01_15_11_00_00"]);
    }

    #[test]
    fn test_save_with_clock_behind_keeps_new_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let history = DpmLogHistory::new(dir.path()).with_max_entries(2);

        history.save(vec![fault("dpm", "0x1")], at(9, 0, 0)).unwrap();
        history.save(vec![fault("dpm", "0x2")], at(10, 0, 0)).unwrap();

        // RTC not yet synced: the new snapshot sorts before the others
        let early = NaiveDate::from_ymd_opt(2000, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap();
        let path = history.save(vec![fault("dpm", "0x3")], early).unwrap();
        assert!(path.exists());

        let current = history.current().unwrap().unwrap();
        assert_eq!(current.gen_time, "2000_01_01_00_00_00");
        assert_eq!(current.records_json[0].fault_uid, "0x3");

        let times: Vec<_> = history
            .history()
            .unwrap()
            .into_iter()
            .map(|e| e.gen_time)
            .collect();
        assert_eq!(times, vec!["2000_01_01_00_00_00", "2025_01_15_10_00_00"]);
    }

    #[test]
    fn test_single_entry_retention() {
        let dir = tempfile::tempdir().unwrap();
        let history = DpmLogHistory::new(dir.path()).with_max_entries(1);

        history.save(vec![fault("dpm", "0x1")], at(9, 0, 0)).unwrap();
        history.save(vec![fault("dpm", "0x2")], at(8, 0, 0)).unwrap();

        assert_eq!(history.snapshot_paths().unwrap().len(), 1);
        assert_eq!(history.current().unwrap().unwrap().gen_time, "2025_01_15_08_00_00");
    }

    #[test]
    fn test_history_skips_corrupt_files() {
        let dir = tempfile::tempdir().unwrap();
        let history = DpmLogHistory::new(dir.path());
        history.save(vec![], at(8, 0, 0)).unwrap();
        fs::write(dir.path().join("reboot-cause-2025_01_15_09_00_00.json"), "{not json").unwrap();
        fs::write(dir.path().join("unrelated.txt"), "x").unwrap();

        assert_eq!(history.snapshot_paths().unwrap().len(), 2);
        assert_eq!(history.history().unwrap().len(), 1);
    }

    #[test]
    fn test_missing_directory_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let history = DpmLogHistory::new(dir.path().join("nope"));
        assert!(history.current().unwrap().is_none());
        assert!(history.history().unwrap().is_empty());
    }

    #[test]
    fn test_unsupported_type_detected() {
        let mut envelope = HistoryEnvelope::new(vec![], at(0, 0, 0));
        assert!(envelope.is_supported());
        envelope.dpm_type = "unknown_dpm".into();
        assert!(!envelope.is_supported());
    }

    #[test]
    fn test_raw_bytes_rejects_bad_prefix() {
        let mut f = fault("a", "0x1");
        f.raw = "hex:00".into();
        assert!(f.raw_bytes().is_none());
    }
}
