use std::thread;
use std::time::{Duration, Instant};

/// Monotonic nanosecond clock anchored at HAL creation
#[derive(Debug, Clone, Copy)]
pub struct Clock {
    base: Instant,
}

impl Clock {
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
        }
    }

    pub fn now_ns(&self) -> i64 {
        i64::try_from(self.base.elapsed().as_nanos()).unwrap_or(i64::MAX)
    }

    /// Block the calling thread until the clock reads `deadline_ns`
    pub fn sleep_until(&self, deadline_ns: i64) {
        let target = self.base + Duration::from_nanos(deadline_ns.max(0) as u64);
        let now = Instant::now();
        if target > now {
            thread::sleep(target - now);
        }
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}
