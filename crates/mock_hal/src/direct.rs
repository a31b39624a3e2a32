//! Direct report channels
//!
//! A registered channel owns a shared region. Each sensor configured on the
//! channel gets a writer thread that appends records at the nominal frequency
//! of its rate level. Records from all sensors share one write cursor and one
//! atomic counter, so readers see a single strictly counted stream.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;

use contracts::{
    ContractError, DirectReportRecord, RateLevel, SensorHandle, SensorType, SharedMemType,
    SharedRegion, EVENT_RECORD_SIZE,
};
use tracing::{debug, trace, warn};

use crate::clock::Clock;
use crate::reading;

#[derive(Debug, Default)]
struct WriteCursor {
    offset: usize,
    counter: u32,
}

/// Serialises record writes into one region
#[derive(Debug)]
pub(crate) struct ChannelWriter {
    region: SharedRegion,
    cursor: Mutex<WriteCursor>,
}

impl ChannelWriter {
    pub fn new(region: SharedRegion) -> Self {
        Self {
            region,
            cursor: Mutex::new(WriteCursor::default()),
        }
    }

    /// Append one record, wrapping to the start of the region when full
    pub fn append(
        &self,
        token: i32,
        sensor_type: SensorType,
        timestamp: i64,
        data: [f32; 16],
    ) -> Result<u32, ContractError> {
        let mut cursor = self.cursor.lock().unwrap_or_else(PoisonError::into_inner);
        if cursor.offset + EVENT_RECORD_SIZE > self.region.len() {
            cursor.offset = 0;
        }
        // counter 0 marks an empty slot
        cursor.counter = cursor.counter.wrapping_add(1).max(1);

        let record = DirectReportRecord::new(token, sensor_type, cursor.counter, timestamp, data);
        self.region.write_at(cursor.offset, &record.encode())?;
        cursor.offset += EVENT_RECORD_SIZE;
        Ok(cursor.counter)
    }
}

/// One sensor reporting into a channel
#[derive(Debug)]
pub(crate) struct ActiveReport {
    pub token: i32,
    running: Arc<AtomicBool>,
}

impl ActiveReport {
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

/// Registered channel
#[derive(Debug)]
pub(crate) struct DirectChannel {
    pub mem_type: SharedMemType,
    writer: Arc<ChannelWriter>,
    reports: HashMap<SensorHandle, ActiveReport>,
}

impl DirectChannel {
    pub fn new(mem_type: SharedMemType, region: SharedRegion) -> Self {
        Self {
            mem_type,
            writer: Arc::new(ChannelWriter::new(region)),
            reports: HashMap::new(),
        }
    }

    /// Start (or restart) reporting `handle` at `rate`
    pub fn start(
        &mut self,
        clock: Clock,
        handle: SensorHandle,
        sensor_type: SensorType,
        rate: RateLevel,
        token: i32,
    ) {
        self.stop(handle);

        let running = Arc::new(AtomicBool::new(true));
        let writer = self.writer.clone();
        let flag = running.clone();
        let period_ns = (1e9 / rate.nominal_hz()) as i64;

        thread::spawn(move || {
            let mut rng = rand::rng();
            let mut seq: u64 = 0;
            let mut timestamp = clock.now_ns() + period_ns;

            debug!(handle, token, ?rate, "direct report writer started");

            while flag.load(Ordering::Relaxed) {
                clock.sleep_until(timestamp);
                if !flag.load(Ordering::Relaxed) {
                    break;
                }
                seq += 1;
                let payload = reading::sample(sensor_type, seq, &mut rng);
                match writer.append(token, sensor_type, timestamp, reading::to_data_words(&payload)) {
                    Ok(counter) => trace!(handle, token, counter, timestamp, "direct record written"),
                    Err(e) => {
                        warn!(handle, token, error = %e, "direct report write failed");
                        break;
                    }
                }
                timestamp += period_ns;
            }

            debug!(handle, token, "direct report writer stopped");
        });

        self.reports.insert(handle, ActiveReport { token, running });
    }

    /// Stop reporting `handle`; returns whether it was reporting
    pub fn stop(&mut self, handle: SensorHandle) -> bool {
        self.reports
            .remove(&handle)
            .map(|report| report.stop())
            .is_some()
    }

    pub fn stop_all(&mut self) {
        for (_, report) in self.reports.drain() {
            report.stop();
        }
    }

    pub fn is_reporting(&self, handle: SensorHandle) -> bool {
        self.reports.contains_key(&handle)
    }
}

impl Drop for DirectChannel {
    fn drop(&mut self) {
        self.stop_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::parse_direct_report_events;
    use std::time::Duration;

    #[test]
    fn test_append_wraps_and_skips_zero_counter() {
        let region = SharedRegion::new(EVENT_RECORD_SIZE * 2);
        let writer = ChannelWriter::new(region.clone());

        assert_eq!(writer.append(1, SensorType::Gyroscope, 10, [0.0; 16]).unwrap(), 1);
        assert_eq!(writer.append(1, SensorType::Gyroscope, 20, [0.0; 16]).unwrap(), 2);
        // third record overwrites slot 0
        assert_eq!(writer.append(1, SensorType::Gyroscope, 30, [0.0; 16]).unwrap(), 3);

        let events = parse_direct_report_events(&region.snapshot(), 2, 0).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].timestamp, 30);
    }

    #[test]
    fn test_writer_thread_reports_until_stopped() {
        let region = SharedRegion::new(EVENT_RECORD_SIZE * 256);
        let mut channel = DirectChannel::new(SharedMemType::Ashmem, region.clone());

        channel.start(Clock::new(), 3, SensorType::Accelerometer, RateLevel::Fast, 42);
        assert!(channel.is_reporting(3));
        thread::sleep(Duration::from_millis(100));
        assert!(channel.stop(3));

        let events = parse_direct_report_events(&region.snapshot(), -1, 0).unwrap();
        assert!(!events.is_empty());
        assert!(events.iter().all(|e| e.sensor_handle == 42));
        assert!(events.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
    }
}
