//! In-memory blackbox store

use super::{BlackboxDevice, CLEARED_SENTINEL};
use crate::types::Result;

/// Blackbox held in a byte vector
#[derive(Debug, Clone, Default)]
pub struct MemoryDevice {
    name: String,
    data: Vec<u8>,
}

impl MemoryDevice {
    pub fn new(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }
}

impl BlackboxDevice for MemoryDevice {
    fn describe(&self) -> String {
        format!("memory:{}", self.name)
    }

    fn read_blackbox(&self) -> Result<Vec<u8>> {
        Ok(self.data.clone())
    }

    fn clear_blackbox(&mut self) -> Result<()> {
        self.data = CLEARED_SENTINEL.to_vec();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clear_leaves_sentinel() {
        for len in [0usize, 1, 64, 2048] {
            let mut device = MemoryDevice::new("dpm", vec![0x55; len]);
            assert_eq!(device.read_blackbox().unwrap().len(), len);
            device.clear_blackbox().unwrap();
            assert_eq!(device.read_blackbox().unwrap(), b"1");
        }
    }
}
