//! File-backed blackbox store
//!
//! The ADM1266 driver exposes the blackbox as an nvmem node. Reading returns
//! every record; writing `1` asks the driver to erase it. Stub files used on
//! emulated platforms behave the same way.

use super::{BlackboxDevice, CLEARED_SENTINEL};
use crate::types::{DecoderError, Result};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Blackbox at a filesystem path
#[derive(Debug, Clone)]
pub struct NvmemDevice {
    path: PathBuf,
}

impl NvmemDevice {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn access_error(&self, source: std::io::Error) -> DecoderError {
        DecoderError::DeviceAccess {
            device: self.describe(),
            source,
        }
    }
}

impl BlackboxDevice for NvmemDevice {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn read_blackbox(&self) -> Result<Vec<u8>> {
        log::debug!("Reading blackbox: {:?}", self.path);
        let data = fs::read(&self.path).map_err(|e| self.access_error(e))?;
        log::debug!("Read {} bytes from {:?}", data.len(), self.path);
        Ok(data)
    }

    fn clear_blackbox(&mut self) -> Result<()> {
        log::info!("Clearing blackbox: {:?}", self.path);
        let mut file = OpenOptions::new()
            .write(true)
            .truncate(true)
            .open(&self.path)
            .map_err(|e| self.access_error(e))?;
        file.write_all(CLEARED_SENTINEL)
            .and_then(|_| file.flush())
            .map_err(|e| self.access_error(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nvmem");
        fs::write(&path, vec![0xAB; 256]).unwrap();

        let mut device = NvmemDevice::new(&path);
        assert_eq!(device.read_blackbox().unwrap().len(), 256);

        device.clear_blackbox().unwrap();
        assert_eq!(device.read_blackbox().unwrap(), b"1");
    }

    #[test]
    fn test_missing_file_is_device_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut device = NvmemDevice::new(dir.path().join("absent"));

        match device.read_blackbox() {
            Err(DecoderError::DeviceAccess { device, .. }) => assert!(device.ends_with("absent")),
            other => panic!("expected DeviceAccess, got {:?}", other),
        }
        // Clearing does not create the node
        assert!(device.clear_blackbox().is_err());
    }
}
