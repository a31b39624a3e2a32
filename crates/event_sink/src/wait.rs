//! Wait coordinator
//!
//! Waits drain the delivery channel until a predicate over the sink state
//! holds or a single deadline for the whole sensor set passes. A timeout is
//! not an error: callers get `false` and assert on the sink afterwards.

use std::time::Duration;

use contracts::SensorInfo;
use tokio::time::{timeout_at, Instant};
use tracing::debug;

use crate::EventSink;

impl EventSink {
    /// Wait until every sensor has at least `required_count` flush acknowledgements
    pub async fn wait_for_flush_events(
        &mut self,
        sensors: &[SensorInfo],
        required_count: u32,
        timeout: Duration,
    ) -> bool {
        self.wait_until("flush", timeout, |sink| {
            sensors
                .iter()
                .all(|s| sink.peek_flush_count(s.handle) >= required_count)
        })
        .await
    }

    /// Wait until every sensor has at least one event
    pub async fn wait_for_events(&mut self, sensors: &[SensorInfo], timeout: Duration) -> bool {
        self.wait_until("events", timeout, |sink| {
            sensors.iter().all(|s| sink.peek_event_count(s.handle) > 0)
        })
        .await
    }

    async fn wait_until<F>(&mut self, kind: &'static str, timeout: Duration, predicate: F) -> bool
    where
        F: Fn(&EventSink) -> bool,
    {
        let started = Instant::now();
        let deadline = started + timeout;

        let satisfied = loop {
            self.pump();
            if predicate(&*self) {
                break true;
            }
            match timeout_at(deadline, self.rx.recv()).await {
                Ok(Ok(event)) => self.on_event(event),
                // every sender dropped: nothing more can arrive
                Ok(Err(_)) => break predicate(&*self),
                Err(_) => break predicate(&*self),
            }
        };

        let waited_ms = started.elapsed().as_secs_f64() * 1000.0;
        observability::record_wait(kind, satisfied, waited_ms);
        debug!(kind, satisfied, waited_ms, "wait finished");
        satisfied
    }
}

#[cfg(test)]
mod tests {
    use crate::channel;
    use contracts::{Event, EventPayload, SensorFlags, SensorInfo, SensorType, Vec3};
    use std::time::Duration;

    fn sensor(handle: i32) -> SensorInfo {
        SensorInfo {
            handle,
            sensor_type: SensorType::Gyroscope,
            type_as_string: "android.sensor.gyroscope".into(),
            name: "gyro".into(),
            vendor: "test".into(),
            version: 1,
            max_range: 1.0,
            resolution: 0.1,
            power: 0.1,
            min_delay_us: 1000,
            max_delay_us: 10_000,
            fifo_reserved_event_count: 0,
            fifo_max_event_count: 0,
            required_permission: String::new(),
            flags: SensorFlags::default(),
        }
    }

    #[tokio::test]
    async fn test_flush_wait_satisfied_by_late_delivery() {
        let (sender, mut sink) = channel();
        let sensors = vec![sensor(1), sensor(2)];

        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(50));
            for handle in [1, 2, 1, 2] {
                sender.send(Event::flush_complete(handle, 0));
            }
        });

        assert!(
            sink.wait_for_flush_events(&sensors, 2, Duration::from_secs(2))
                .await
        );
        assert_eq!(sink.flush_count(1), 2);
    }

    #[tokio::test]
    async fn test_wait_times_out_on_one_silent_sensor() {
        let (sender, mut sink) = channel();
        let sensors = vec![sensor(1), sensor(2)];
        sender.send(Event::flush_complete(1, 0));

        let started = std::time::Instant::now();
        let satisfied = sink
            .wait_for_flush_events(&sensors, 1, Duration::from_millis(100))
            .await;
        assert!(!satisfied);
        assert!(started.elapsed() >= Duration::from_millis(100));
        assert_eq!(sink.flush_count(1), 1);
    }

    #[tokio::test]
    async fn test_event_wait_times_out_on_one_silent_sensor() {
        let (sender, mut sink) = channel();
        let sensors = vec![sensor(1), sensor(2)];
        sender.send(Event {
            sensor_handle: 1,
            sensor_type: SensorType::Gyroscope,
            timestamp: 0,
            payload: EventPayload::Vec3(Vec3::default()),
        });

        let started = std::time::Instant::now();
        let satisfied = sink.wait_for_events(&sensors, Duration::from_millis(100)).await;
        assert!(!satisfied);
        assert!(started.elapsed() >= Duration::from_millis(100));
        assert_eq!(sink.events(1).len(), 1);
        assert!(sink.events(2).is_empty());
        drop(sender);
    }

    #[tokio::test]
    async fn test_wait_ends_when_senders_dropped() {
        let (sender, mut sink) = channel();
        sender.send(Event::flush_complete(1, 0));
        drop(sender);

        let started = std::time::Instant::now();
        let satisfied = sink
            .wait_for_flush_events(&[sensor(1), sensor(2)], 1, Duration::from_secs(5))
            .await;
        assert!(!satisfied);
        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(sink.flush_count(1), 1);
    }

    #[tokio::test]
    async fn test_zero_required_is_immediately_satisfied() {
        let (_sender, mut sink) = channel();
        assert!(
            sink.wait_for_flush_events(&[sensor(5)], 0, Duration::from_millis(10))
                .await
        );
    }

    #[tokio::test]
    async fn test_wait_for_events_empty_set() {
        let (_sender, mut sink) = channel();
        assert!(sink.wait_for_events(&[], Duration::from_millis(10)).await);
    }
}
