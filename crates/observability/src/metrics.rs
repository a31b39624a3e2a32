//! Suite metrics
//!
//! Prometheus counters/histograms for case outcomes, delivered events, flush
//! acknowledgements and waits, plus an in-memory aggregator for the run summary.

use std::collections::BTreeMap;

use metrics::{counter, gauge, histogram};

/// Final status of one test case
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CaseStatus {
    Passed,
    Skipped,
    Failed,
}

impl CaseStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Skipped => "skipped",
            Self::Failed => "failed",
        }
    }
}

/// Record a finished test case
pub fn record_case_outcome(case: &str, status: CaseStatus, duration_ms: f64) {
    counter!(
        "sensors_vts_cases_total",
        "case" => case.to_string(),
        "status" => status.as_str()
    )
    .increment(1);

    histogram!("sensors_vts_case_duration_ms", "case" => case.to_string()).record(duration_ms);
}

/// Record a data event reaching the sink
pub fn record_event_received(sensor_type: &str) {
    counter!(
        "sensors_vts_events_received_total",
        "sensor_type" => sensor_type.to_string()
    )
    .increment(1);
}

/// Record a flush-complete acknowledgement
pub fn record_flush_complete() {
    counter!("sensors_vts_flush_complete_total").increment(1);
}

/// Record the outcome of a sink wait
pub fn record_wait(kind: &'static str, satisfied: bool, waited_ms: f64) {
    let result = if satisfied { "satisfied" } else { "timed_out" };
    counter!("sensors_vts_waits_total", "kind" => kind, "result" => result).increment(1);
    histogram!("sensors_vts_wait_ms", "kind" => kind).record(waited_ms);
}

/// Record the mean event interval measured for a sensor
pub fn record_mean_interval_ns(sensor_type: &str, mean_ns: f64) {
    gauge!(
        "sensors_vts_mean_interval_ns",
        "sensor_type" => sensor_type.to_string()
    )
    .set(mean_ns);
}

/// Suite metrics aggregator
///
/// Aggregates case outcomes in memory for the end-of-run summary.
#[derive(Debug, Clone, Default)]
pub struct SuiteMetricsAggregator {
    pub passed: u64,
    pub skipped: u64,
    pub failed: u64,

    /// Case duration statistics (ms)
    pub duration_stats: RunningStats,

    /// Failed case names with their first failure message
    pub failures: BTreeMap<String, String>,
}

impl SuiteMetricsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one finished case
    pub fn update(&mut self, case: &str, status: CaseStatus, duration_ms: f64, message: Option<&str>) {
        match status {
            CaseStatus::Passed => self.passed += 1,
            CaseStatus::Skipped => self.skipped += 1,
            CaseStatus::Failed => {
                self.failed += 1;
                self.failures
                    .insert(case.to_string(), message.unwrap_or_default().to_string());
            }
        }
        self.duration_stats.push(duration_ms);
    }

    pub fn summary(&self) -> SuiteSummary {
        SuiteSummary {
            total: self.passed + self.skipped + self.failed,
            passed: self.passed,
            skipped: self.skipped,
            failed: self.failed,
            duration_ms: StatsSummary::from(&self.duration_stats),
            failures: self.failures.clone(),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Run summary
#[derive(Debug, Clone, Default)]
pub struct SuiteSummary {
    pub total: u64,
    pub passed: u64,
    pub skipped: u64,
    pub failed: u64,
    pub duration_ms: StatsSummary,
    pub failures: BTreeMap<String, String>,
}

impl SuiteSummary {
    /// Passed when nothing failed (skips do not count against the run)
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }
}

impl std::fmt::Display for SuiteSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Sensors VTS Summary ===")?;
        writeln!(f, "Cases: {}", self.total)?;
        writeln!(f, "Passed: {}", self.passed)?;
        writeln!(f, "Skipped: {}", self.skipped)?;
        writeln!(f, "Failed: {}", self.failed)?;
        writeln!(f, "Case duration (ms): {}", self.duration_ms)?;

        if !self.failures.is_empty() {
            writeln!(f, "Failures:")?;
            for (case, message) in &self.failures {
                writeln!(f, "  {}: {}", case, message)?;
            }
        }

        Ok(())
    }
}

/// Statistics summary
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// Online statistics (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Sample variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}

impl FromIterator<f64> for RunningStats {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        let mut stats = Self::default();
        for value in iter {
            stats.push(value);
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_running_stats() {
        let stats: RunningStats = [1.0, 2.0, 3.0, 4.0, 5.0].into_iter().collect();

        assert_eq!(stats.count(), 5);
        assert!((stats.mean() - 3.0).abs() < 1e-10);
        assert!((stats.min() - 1.0).abs() < 1e-10);
        assert!((stats.max() - 5.0).abs() < 1e-10);
        assert!((stats.variance() - 2.5).abs() < 1e-10);
    }

    #[test]
    fn test_aggregator_update() {
        let mut aggregator = SuiteMetricsAggregator::new();
        aggregator.update("flush_sensor", CaseStatus::Passed, 120.0, None);
        aggregator.update("batching", CaseStatus::Skipped, 1.0, Some("no fifo"));
        aggregator.update("streaming", CaseStatus::Failed, 5000.0, Some("no events"));

        let summary = aggregator.summary();
        assert_eq!(summary.total, 3);
        assert_eq!(summary.passed, 1);
        assert_eq!(summary.skipped, 1);
        assert!(!summary.is_success());
        assert_eq!(summary.failures.get("streaming").map(String::as_str), Some("no events"));
        assert!(!summary.failures.contains_key("batching"));
    }

    #[test]
    fn test_summary_display() {
        let mut aggregator = SuiteMetricsAggregator::new();
        aggregator.update("activate", CaseStatus::Passed, 10.0, None);
        aggregator.update("direct_report", CaseStatus::Failed, 1500.0, Some("token mismatch"));

        let output = format!("{}", aggregator.summary());
        assert!(output.contains("Cases: 2"));
        assert!(output.contains("direct_report: token mismatch"));
    }
}
