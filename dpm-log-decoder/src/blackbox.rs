//! ADM1266 blackbox record parser
//!
//! A blackbox dump is a sequence of fixed-size fault records. Each record is
//! decoded from fixed little-endian offsets:
//!
//! | offset | width | field             |
//! |-------:|------:|-------------------|
//! | 0      | 2     | uid               |
//! | 2      | 1     | empty             |
//! | 3      | 1     | action index      |
//! | 4      | 1     | rule index        |
//! | 5      | 1     | VH over-voltage   |
//! | 6      | 1     | VH under-voltage  |
//! | 7      | 2     | VP over-voltage   |
//! | 9      | 2     | VP under-voltage  |
//! | 11     | 2     | GPIO in           |
//! | 13     | 2     | GPIO out          |
//! | 15     | 2     | PDIO in           |
//! | 17     | 2     | PDIO out          |
//! | 19     | 2     | power-up counter  |
//! | 21     | 8     | timestamp         |
//! | 29     | 2     | current state     |
//! | 31     | 2     | last state        |
//! | 63     | 1     | CRC               |
//!
//! Parsing never fails: a trailing chunk shorter than the stride is dropped.

use byteorder::{ByteOrder, LittleEndian};
use std::slice::ChunksExact;

/// Size of one ADM1266 fault record
pub const RECORD_SIZE: usize = 64;

const UID: usize = 0;
const EMPTY: usize = 2;
const ACTION_INDEX: usize = 3;
const RULE_INDEX: usize = 4;
const VH_OV: usize = 5;
const VH_UV: usize = 6;
const VP_OV: usize = 7;
const VP_UV: usize = 9;
const GPIO_IN: usize = 11;
const GPIO_OUT: usize = 13;
const PDIO_IN: usize = 15;
const PDIO_OUT: usize = 17;
const POWERUP_COUNTER: usize = 19;
const TIMESTAMP: usize = 21;
const TIMESTAMP_LEN: usize = 8;
const CURRENT_STATE: usize = 29;
const LAST_STATE: usize = 31;
const CRC: usize = 63;

/// One fault record, fields as stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFaultRecord {
    pub uid: u16,
    pub empty: u8,
    pub action_index: u8,
    pub rule_index: u8,
    pub vh_ov: u8,
    pub vh_uv: u8,
    pub vp_ov: u16,
    pub vp_uv: u16,
    pub gpio_in: u16,
    pub gpio_out: u16,
    pub pdio_in: u16,
    pub pdio_out: u16,
    pub powerup_counter: u16,
    /// Raw little-endian tick count
    pub timestamp: [u8; TIMESTAMP_LEN],
    pub current_state: u16,
    pub last_state: u16,
    pub crc: u8,
    /// The whole stride-sized chunk this record was decoded from
    pub raw: Vec<u8>,
}

impl RawFaultRecord {
    /// Decode one record from a chunk of at least [`RECORD_SIZE`] bytes
    fn decode(chunk: &[u8]) -> Self {
        let u16_at = |off: usize| LittleEndian::read_u16(&chunk[off..off + 2]);

        let mut timestamp = [0u8; TIMESTAMP_LEN];
        timestamp.copy_from_slice(&chunk[TIMESTAMP..TIMESTAMP + TIMESTAMP_LEN]);

        Self {
            uid: u16_at(UID),
            empty: chunk[EMPTY],
            action_index: chunk[ACTION_INDEX],
            rule_index: chunk[RULE_INDEX],
            vh_ov: chunk[VH_OV],
            vh_uv: chunk[VH_UV],
            vp_ov: u16_at(VP_OV),
            vp_uv: u16_at(VP_UV),
            gpio_in: u16_at(GPIO_IN),
            gpio_out: u16_at(GPIO_OUT),
            pdio_in: u16_at(PDIO_IN),
            pdio_out: u16_at(PDIO_OUT),
            powerup_counter: u16_at(POWERUP_COUNTER),
            timestamp,
            current_state: u16_at(CURRENT_STATE),
            last_state: u16_at(LAST_STATE),
            crc: chunk[CRC],
            raw: chunk.to_vec(),
        }
    }

    /// Tick count since power-on
    pub fn timestamp_ticks(&self) -> u64 {
        LittleEndian::read_u64(&self.timestamp)
    }

    /// Channel bitmask for a field tag such as `"gpio_in"`
    pub fn channel_bits(&self, tag: &str) -> Option<u64> {
        let bits = match tag {
            "vh_ov" => self.vh_ov as u64,
            "vh_uv" => self.vh_uv as u64,
            "vp_ov" => self.vp_ov as u64,
            "vp_uv" => self.vp_uv as u64,
            "gpio_in" => self.gpio_in as u64,
            "gpio_out" => self.gpio_out as u64,
            "pdio_in" => self.pdio_in as u64,
            "pdio_out" => self.pdio_out as u64,
            _ => return None,
        };
        Some(bits)
    }
}

/// Lazy iterator over the records in a blackbox buffer
///
/// Cloning restarts from the clone point; iterating the same buffer twice
/// yields the same records.
#[derive(Debug, Clone)]
pub struct BlackboxRecords<'a> {
    chunks: Option<ChunksExact<'a, u8>>,
}

impl<'a> BlackboxRecords<'a> {
    /// Number of bytes that will not form a record
    pub fn trailing_bytes(&self) -> usize {
        self.chunks.as_ref().map_or(0, |c| c.remainder().len())
    }
}

impl<'a> Iterator for BlackboxRecords<'a> {
    type Item = RawFaultRecord;

    fn next(&mut self) -> Option<Self::Item> {
        let chunk = self.chunks.as_mut()?.next()?;
        Some(RawFaultRecord::decode(chunk))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match &self.chunks {
            Some(c) => c.size_hint(),
            None => (0, Some(0)),
        }
    }
}

impl<'a> ExactSizeIterator for BlackboxRecords<'a> {}

/// Split `data` into `stride`-sized records
///
/// A stride smaller than [`RECORD_SIZE`] cannot hold a record and yields
/// nothing.
pub fn parse_blackbox(data: &[u8], stride: usize) -> BlackboxRecords<'_> {
    if stride < RECORD_SIZE {
        log::warn!("Record stride {} is smaller than a record ({} bytes)", stride, RECORD_SIZE);
        return BlackboxRecords { chunks: None };
    }

    let records = BlackboxRecords {
        chunks: Some(data.chunks_exact(stride)),
    };
    if records.trailing_bytes() > 0 {
        log::debug!(
            "Dropping {} trailing bytes after {} records",
            records.trailing_bytes(),
            records.len()
        );
    }
    records
}
