//! DPM Blackbox Decoder Library
//!
//! A stateless, reusable library for decoding the fault "blackbox" of ADM1266
//! Digital Power Managers into structured fault records and reboot causes.
//!
//! # Architecture
//!
//! Data flows one way:
//! - A [`BlackboxDevice`] yields the raw dump (nvmem node, stub file, or memory)
//! - The record parser splits it into fixed-size [`RawFaultRecord`]s
//! - The resolver matches each PDIO/GPIO sample against the DPM's rule table
//! - Renderers turn timestamps and channel bitmasks into display strings
//!
//! The library does NOT:
//! - Discover DPMs on the bus
//! - Decide when to clear a blackbox
//! - Print reports
//!
//! All higher-level functionality is in the application layer (dpm-log-cli).
//!
//! # Example Usage
//!
//! ```no_run
//! use dpm_log_decoder::{Adm1266, Adm1266PlatformSpec, PddfPluginFile};
//! use std::path::Path;
//!
//! let plugin = PddfPluginFile::open(Path::new("pd-plugin.json")).unwrap();
//! let spec = Adm1266PlatformSpec::from_store("dpm-0", &plugin).unwrap();
//! let dpm = Adm1266::from_spec(spec).unwrap();
//!
//! for record in dpm.get_blackbox_records().unwrap() {
//!     println!("{} {}: {}", record.uid, record.timestamp, record.cause.summary);
//! }
//! ```

// Public modules
pub mod blackbox;
pub mod config;
pub mod decoder;
pub mod device;
pub mod history;
pub mod render;
pub mod resolver;
pub mod types;

// Re-export main types for convenience
pub use blackbox::{parse_blackbox, BlackboxRecords, RawFaultRecord, RECORD_SIZE};
pub use config::{dpm_names, Adm1266PlatformSpec, ConfigStore, PddfPluginFile};
pub use decoder::{get_reboot_cause, load_all, reboot_cause_from, uid_follows, Adm1266};
pub use device::{BlackboxDevice, MemoryDevice, NvmemDevice};
pub use history::{DpmFault, DpmLogHistory, HistoryEnvelope};
pub use render::{channel_names, time_since, ChannelClass, ChannelNames, TimeRenderer};
pub use resolver::{decode_power_fault_cause, FaultCauseRule, FaultCauseTable};
pub use types::{
    reboot_cause_str_to_type, reboot_cause_type, DecoderError, FaultRecord, ReasonRecord,
    RebootCause, ResolvedCause, Result,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
