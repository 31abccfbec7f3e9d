//! Blackbox backing stores
//!
//! The decoder reads the raw dump through the [`BlackboxDevice`] trait so the
//! same parsing path works against the kernel nvmem node, a stub file, or an
//! in-memory buffer in tests.

use crate::types::Result;

pub mod memory;
pub mod nvmem;

pub use memory::MemoryDevice;
pub use nvmem::NvmemDevice;

/// Value written to (and read back from) a cleared blackbox
pub const CLEARED_SENTINEL: &[u8] = b"1";

/// Access to a DPM's raw blackbox dump
pub trait BlackboxDevice {
    /// Human-readable identity used in errors and logs
    fn describe(&self) -> String;

    /// Read the full blackbox contents
    fn read_blackbox(&self) -> Result<Vec<u8>>;

    /// Erase the blackbox
    ///
    /// Afterwards the store holds exactly [`CLEARED_SENTINEL`], not an empty
    /// buffer.
    fn clear_blackbox(&mut self) -> Result<()>;
}
