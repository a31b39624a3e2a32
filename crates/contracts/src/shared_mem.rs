//! Shared memory for direct report channels
//!
//! The region is written by the HAL and read by the harness. Records use the
//! sensors event format: 104 bytes, little-endian.
//!
//! | offset | field          | type       |
//! |--------|----------------|------------|
//! | 0      | size           | i32        |
//! | 4      | report token   | i32        |
//! | 8      | sensor type    | i32        |
//! | 12     | atomic counter | u32        |
//! | 16     | timestamp      | i64        |
//! | 24     | data           | [f32; 16]  |
//! | 88     | reserved       | [u32; 4]   |

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use bytes::{Buf, BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};

use crate::{ContractError, Event, EventPayload, SensorType};

/// Total length of one record
pub const EVENT_RECORD_SIZE: usize = 104;

/// Shared memory kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SharedMemType {
    Ashmem,
    Gralloc,
}

/// Record layout of the region
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SharedMemFormat {
    #[default]
    SensorsEvent,
}

/// Shared byte region
///
/// Cloning shares the underlying memory.
#[derive(Clone)]
pub struct SharedRegion {
    inner: Arc<Mutex<BytesMut>>,
}

impl fmt::Debug for SharedRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedRegion")
            .field("len", &self.len())
            .finish()
    }
}

impl SharedRegion {
    /// Allocate a zeroed region
    pub fn new(size: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(BytesMut::zeroed(size))),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BytesMut> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Set every byte to `byte`
    pub fn fill(&self, byte: u8) {
        self.lock().iter_mut().for_each(|b| *b = byte);
    }

    /// Whether every byte is zero
    pub fn is_zeroed(&self) -> bool {
        self.lock().iter().all(|b| *b == 0)
    }

    /// Copy `data` into the region at `offset`
    pub fn write_at(&self, offset: usize, data: &[u8]) -> Result<(), ContractError> {
        let mut buf = self.lock();
        let size = buf.len();
        let end = offset
            .checked_add(data.len())
            .filter(|end| *end <= size)
            .ok_or(ContractError::SharedMemoryBounds {
                offset,
                len: data.len(),
                size,
            })?;
        buf[offset..end].copy_from_slice(data);
        Ok(())
    }

    /// Copy of the current contents
    pub fn snapshot(&self) -> Bytes {
        Bytes::copy_from_slice(&self.lock())
    }
}

/// Shared memory descriptor passed to `register_direct_channel`
#[derive(Debug, Clone)]
pub struct SharedMemInfo {
    pub mem_type: SharedMemType,
    pub format: SharedMemFormat,
    pub size: usize,
    pub region: SharedRegion,
}

impl SharedMemInfo {
    /// Allocate a region holding `records` event records
    pub fn with_capacity(mem_type: SharedMemType, records: usize) -> Self {
        let size = records * EVENT_RECORD_SIZE;
        Self {
            mem_type,
            format: SharedMemFormat::SensorsEvent,
            size,
            region: SharedRegion::new(size),
        }
    }
}

/// One direct report record
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectReportRecord {
    pub size: i32,
    pub report_token: i32,
    pub sensor_type: i32,
    pub atomic_counter: u32,
    pub timestamp: i64,
    pub data: [f32; 16],
}

impl DirectReportRecord {
    /// Record for a sample
    pub fn new(
        report_token: i32,
        sensor_type: SensorType,
        atomic_counter: u32,
        timestamp: i64,
        data: [f32; 16],
    ) -> Self {
        Self {
            size: EVENT_RECORD_SIZE as i32,
            report_token,
            sensor_type: sensor_type.as_raw(),
            atomic_counter,
            timestamp,
            data,
        }
    }

    /// Serialize into exactly `EVENT_RECORD_SIZE` bytes
    pub fn encode(&self) -> BytesMut {
        let mut buf = BytesMut::with_capacity(EVENT_RECORD_SIZE);
        buf.put_i32_le(self.size);
        buf.put_i32_le(self.report_token);
        buf.put_i32_le(self.sensor_type);
        buf.put_u32_le(self.atomic_counter);
        buf.put_i64_le(self.timestamp);
        for word in self.data {
            buf.put_f32_le(word);
        }
        buf.put_bytes(0, EVENT_RECORD_SIZE - buf.len());
        buf
    }

    /// Deserialize one record; `None` when fewer than `EVENT_RECORD_SIZE` bytes remain
    pub fn decode(mut buf: &[u8]) -> Option<Self> {
        if buf.len() < EVENT_RECORD_SIZE {
            return None;
        }
        let size = buf.get_i32_le();
        let report_token = buf.get_i32_le();
        let sensor_type = buf.get_i32_le();
        let atomic_counter = buf.get_u32_le();
        let timestamp = buf.get_i64_le();
        let mut data = [0f32; 16];
        for word in &mut data {
            *word = buf.get_f32_le();
        }
        Some(Self {
            size,
            report_token,
            sensor_type,
            atomic_counter,
            timestamp,
            data,
        })
    }

    /// Convert to an event; the report token takes the place of the handle
    pub fn to_event(&self) -> Option<Event> {
        Some(Event {
            sensor_handle: self.report_token,
            sensor_type: SensorType::from_raw(self.sensor_type)?,
            timestamp: self.timestamp,
            payload: EventPayload::Data(self.data),
        })
    }
}

/// Parse records written since `last_counter`, starting at byte `offset`
///
/// Parsing stops at the first record whose counter does not advance. A record
/// with an unexpected size invalidates everything parsed so far.
pub fn parse_direct_report_events(
    region: &[u8],
    mut last_counter: i64,
    mut offset: usize,
) -> Result<Vec<Event>, ContractError> {
    let mut events = Vec::new();
    while let Some(record) = region.get(offset..).and_then(DirectReportRecord::decode) {
        if i64::from(record.atomic_counter) <= last_counter {
            break;
        }
        if record.size as usize != EVENT_RECORD_SIZE {
            return Err(ContractError::record_format(
                offset,
                format!("size field {} != {}", record.size, EVENT_RECORD_SIZE),
            ));
        }
        let event = record.to_event().ok_or_else(|| {
            ContractError::record_format(offset, format!("unknown sensor type {}", record.sensor_type))
        })?;
        events.push(event);
        last_counter = i64::from(record.atomic_counter);
        offset += EVENT_RECORD_SIZE;
    }
    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(counter: u32, timestamp: i64) -> DirectReportRecord {
        let mut data = [0f32; 16];
        data[2] = 9.81;
        DirectReportRecord::new(7, SensorType::Accelerometer, counter, timestamp, data)
    }

    #[test]
    fn test_encoded_record_length() {
        assert_eq!(record(1, 10).encode().len(), EVENT_RECORD_SIZE);
    }

    #[test]
    fn test_parse_stops_at_stale_counter() {
        let region = SharedRegion::new(EVENT_RECORD_SIZE * 4);
        region.write_at(0, &record(1, 100).encode()).unwrap();
        region.write_at(EVENT_RECORD_SIZE, &record(2, 200).encode()).unwrap();
        // third slot left zeroed: counter 0 does not advance

        let events = parse_direct_report_events(&region.snapshot(), -1, 0).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].sensor_handle, 7);
        assert_eq!(events[1].timestamp, 200);
        assert_eq!(events[1].vec3(), Some([0.0, 0.0, 9.81]));
    }

    #[test]
    fn test_parse_rejects_bad_size() {
        let region = SharedRegion::new(EVENT_RECORD_SIZE * 2);
        let mut bad = record(1, 100);
        bad.size = 64;
        region.write_at(0, &bad.encode()).unwrap();

        let err = parse_direct_report_events(&region.snapshot(), -1, 0).unwrap_err();
        assert!(err.to_string().contains("size field"));
    }

    #[test]
    fn test_write_out_of_bounds() {
        let region = SharedRegion::new(16);
        assert!(region.write_at(8, &[0u8; 16]).is_err());
    }

    #[test]
    fn test_fill_and_zero_check() {
        let region = SharedRegion::new(32);
        assert!(region.is_zeroed());
        region.fill(0xcc);
        assert!(!region.is_zeroed());
    }
}
