//! Suite runner
//!
//! Named test cases executed one after another against a single
//! environment. A failing case never stops the run.

use std::fmt;
use std::time::{Duration, Instant};

use contracts::{HarnessConfig, RateLevel, SensorType, SensorsHal, SharedMemType};
use observability::{CaseStatus, SuiteMetricsAggregator, SuiteSummary};
use tracing::{info, warn};

use crate::checker::{EventChecker, NullChecker, Vec3NormChecker};
use crate::environment::Environment;
use crate::error::{HarnessError, Result};
use crate::scenario::{Scenario, Verdict};

/// Streaming rate variants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamRate {
    Slow,
    Normal,
    Fast,
}

impl StreamRate {
    pub fn sampling_period(self) -> Duration {
        match self {
            Self::Slow => Duration::from_millis(200),
            Self::Normal => Duration::from_millis(20),
            Self::Fast => Duration::from_millis(5),
        }
    }
}

/// What a test case exercises
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseKind {
    SensorListValid,
    SetOperationMode,
    InjectSensorEventData,
    Batch,
    Activate,
    FlushSensor,
    FlushOneShotSensor,
    FlushInactiveSensor,
    FlushNonexistentSensor,
    NoStaleEvents,
    CallInitializeTwice,
    Streaming(SensorType, StreamRate),
    SamplingPeriodHotSwitch(SensorType),
    Batching(SensorType),
    DirectReport(SensorType, SharedMemType, RateLevel),
}

/// One named case of the catalog
#[derive(Debug, Clone)]
pub struct TestCase {
    pub name: String,
    pub kind: CaseKind,
}

impl TestCase {
    fn new(name: impl Into<String>, kind: CaseKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    async fn run<H: SensorsHal>(&self, scenario: &Scenario<'_, H>) -> Result<Verdict> {
        let config = scenario.config();
        match self.kind {
            CaseKind::SensorListValid => scenario.sensor_list_valid().await,
            CaseKind::SetOperationMode => scenario.set_operation_mode().await,
            CaseKind::InjectSensorEventData => scenario.inject_sensor_event_data().await,
            CaseKind::Batch => scenario.batch().await,
            CaseKind::Activate => scenario.activate().await,
            CaseKind::FlushSensor => scenario.flush_sensor().await,
            CaseKind::FlushOneShotSensor => scenario.flush_one_shot_sensor().await,
            CaseKind::FlushInactiveSensor => scenario.flush_inactive_sensor().await,
            CaseKind::FlushNonexistentSensor => scenario.flush_nonexistent_sensor().await,
            CaseKind::NoStaleEvents => scenario.no_stale_events().await,
            CaseKind::CallInitializeTwice => scenario.call_initialize_twice().await,
            CaseKind::Streaming(sensor_type, rate) => {
                let duration = Duration::from_millis(config.streaming.duration_ms);
                let checker = checker_for(sensor_type);
                scenario
                    .streaming(sensor_type, rate.sampling_period(), duration, checker.as_ref())
                    .await
            }
            CaseKind::SamplingPeriodHotSwitch(sensor_type) => {
                let first = scenario.sampling_rate_hot_switch(sensor_type, true).await?;
                if first != Verdict::Passed {
                    return Ok(first);
                }
                scenario.sampling_rate_hot_switch(sensor_type, false).await
            }
            CaseKind::Batching(sensor_type) => scenario.batching(sensor_type).await,
            CaseKind::DirectReport(sensor_type, mem_type, rate) => {
                let checker = checker_for(sensor_type);
                scenario
                    .direct_report(sensor_type, mem_type, rate, checker.as_ref())
                    .await
            }
        }
    }
}

/// Payload checker for a sensor type
pub fn checker_for(sensor_type: SensorType) -> Box<dyn EventChecker> {
    match sensor_type {
        SensorType::Accelerometer => Box::new(Vec3NormChecker::gravity()),
        SensorType::Gyroscope => Box::new(Vec3NormChecker::still()),
        _ => Box::new(NullChecker),
    }
}

/// Outcome of one case
#[derive(Debug)]
pub enum CaseOutcome {
    Passed,
    Skipped(String),
    Failed(HarnessError),
}

impl CaseOutcome {
    pub fn status(&self) -> CaseStatus {
        match self {
            Self::Passed => CaseStatus::Passed,
            Self::Skipped(_) => CaseStatus::Skipped,
            Self::Failed(_) => CaseStatus::Failed,
        }
    }
}

impl From<Result<Verdict>> for CaseOutcome {
    fn from(result: Result<Verdict>) -> Self {
        match result {
            Ok(Verdict::Passed) => Self::Passed,
            Ok(Verdict::Skipped(reason)) => Self::Skipped(reason),
            Err(err) => Self::Failed(err),
        }
    }
}

#[derive(Debug)]
pub struct CaseReport {
    pub name: String,
    pub outcome: CaseOutcome,
    pub duration: Duration,
}

impl fmt::Display for CaseReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let millis = self.duration.as_secs_f64() * 1000.0;
        match &self.outcome {
            CaseOutcome::Passed => write!(f, "[ PASSED ] {} ({millis:.0} ms)", self.name),
            CaseOutcome::Skipped(reason) => {
                write!(f, "[ SKIPPED] {} ({millis:.0} ms): {reason}", self.name)
            }
            CaseOutcome::Failed(err) => {
                write!(f, "[ FAILED ] {} ({millis:.0} ms): {err}", self.name)
            }
        }
    }
}

/// Results of a run
#[derive(Debug)]
pub struct SuiteReport {
    pub cases: Vec<CaseReport>,
    pub summary: SuiteSummary,
}

impl SuiteReport {
    /// Aggregate status: passed when no case failed
    pub fn is_success(&self) -> bool {
        self.summary.is_success()
    }

    pub fn outcome(&self, name: &str) -> Option<&CaseOutcome> {
        self.cases.iter().find(|c| c.name == name).map(|c| &c.outcome)
    }
}

/// Ordered case catalog
#[derive(Debug, Clone)]
pub struct Suite {
    cases: Vec<TestCase>,
}

impl Suite {
    /// Every known case
    pub fn catalog() -> Self {
        let mut cases = vec![
            TestCase::new("SensorListValid", CaseKind::SensorListValid),
            TestCase::new("SetOperationMode", CaseKind::SetOperationMode),
            TestCase::new("InjectSensorEventData", CaseKind::InjectSensorEventData),
            TestCase::new("CallInitializeTwice", CaseKind::CallInitializeTwice),
            TestCase::new("Batch", CaseKind::Batch),
            TestCase::new("Activate", CaseKind::Activate),
            TestCase::new("NoStaleEvents", CaseKind::NoStaleEvents),
            TestCase::new("FlushSensor", CaseKind::FlushSensor),
            TestCase::new("FlushOneShotSensor", CaseKind::FlushOneShotSensor),
            TestCase::new("FlushInactiveSensor", CaseKind::FlushInactiveSensor),
            TestCase::new("FlushNonexistentSensor", CaseKind::FlushNonexistentSensor),
        ];

        let motion = [
            ("Accelerometer", SensorType::Accelerometer),
            ("Gyroscope", SensorType::Gyroscope),
            ("Magnetometer", SensorType::MagneticField),
        ];
        for (label, sensor_type) in motion {
            for (suffix, rate) in [
                ("Slow", StreamRate::Slow),
                ("Normal", StreamRate::Normal),
                ("Fast", StreamRate::Fast),
            ] {
                cases.push(TestCase::new(
                    format!("{label}StreamingOperation{suffix}"),
                    CaseKind::Streaming(sensor_type, rate),
                ));
            }
        }
        for (label, sensor_type) in motion {
            cases.push(TestCase::new(
                format!("{label}SamplingPeriodHotSwitchOperation"),
                CaseKind::SamplingPeriodHotSwitch(sensor_type),
            ));
        }
        for (label, sensor_type) in motion {
            cases.push(TestCase::new(
                format!("{label}BatchingOperation"),
                CaseKind::Batching(sensor_type),
            ));
        }
        for (mem_label, mem_type) in [
            ("Ashmem", SharedMemType::Ashmem),
            ("Gralloc", SharedMemType::Gralloc),
        ] {
            for (label, sensor_type) in motion {
                for (suffix, rate) in [
                    ("Normal", RateLevel::Normal),
                    ("Fast", RateLevel::Fast),
                    ("VeryFast", RateLevel::VeryFast),
                ] {
                    cases.push(TestCase::new(
                        format!("{label}{mem_label}DirectReportOperation{suffix}"),
                        CaseKind::DirectReport(sensor_type, mem_type, rate),
                    ));
                }
            }
        }
        Self { cases }
    }

    /// Keep cases whose name contains any of `filters` (empty keeps everything)
    pub fn filtered(mut self, filters: &[String]) -> Self {
        if !filters.is_empty() {
            self.cases
                .retain(|case| filters.iter().any(|f| case.name.contains(f.as_str())));
        }
        self
    }

    pub fn cases(&self) -> &[TestCase] {
        &self.cases
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    /// Set up `env`, run every case in order, tear `env` down
    pub async fn run<H: SensorsHal>(
        &self,
        env: &Environment<H>,
        config: &HarnessConfig,
    ) -> Result<SuiteReport> {
        env.setup().await?;
        let scenario = Scenario::new(env, config);
        let mut aggregator = SuiteMetricsAggregator::new();
        let mut cases = Vec::with_capacity(self.cases.len());

        info!(cases = self.cases.len(), "starting suite");
        for case in &self.cases {
            info!(case = %case.name, "running");
            let started = Instant::now();
            let outcome = CaseOutcome::from(case.run(&scenario).await);
            let duration = started.elapsed();
            let duration_ms = duration.as_secs_f64() * 1000.0;

            let message = match &outcome {
                CaseOutcome::Passed => None,
                CaseOutcome::Skipped(reason) => Some(reason.clone()),
                CaseOutcome::Failed(err) => Some(err.to_string()),
            };
            match &outcome {
                CaseOutcome::Failed(err) => warn!(case = %case.name, error = %err, "case failed"),
                CaseOutcome::Skipped(reason) => info!(case = %case.name, %reason, "case skipped"),
                CaseOutcome::Passed => info!(case = %case.name, duration_ms, "case passed"),
            }

            observability::record_case_outcome(&case.name, outcome.status(), duration_ms);
            aggregator.update(&case.name, outcome.status(), duration_ms, message.as_deref());
            cases.push(CaseReport {
                name: case.name.clone(),
                outcome,
                duration,
            });
        }
        env.teardown();

        let summary = aggregator.summary();
        info!(
            passed = summary.passed,
            skipped = summary.skipped,
            failed = summary.failed,
            "suite finished"
        );
        Ok(SuiteReport { cases, summary })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_names_unique() {
        let suite = Suite::catalog();
        let mut names: Vec<&str> = suite.cases().iter().map(|c| c.name.as_str()).collect();
        let total = names.len();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), total);
        assert!(names.contains(&"AccelerometerStreamingOperationNormal"));
        assert!(names.contains(&"MagnetometerGrallocDirectReportOperationVeryFast"));
    }

    #[test]
    fn test_filter_by_substring() {
        let suite = Suite::catalog().filtered(&["Flush".to_string()]);
        assert_eq!(suite.len(), 4);
        assert!(suite.cases().iter().all(|c| c.name.starts_with("Flush")));

        let all = Suite::catalog().filtered(&[]);
        assert_eq!(all.len(), Suite::catalog().len());

        let none = Suite::catalog().filtered(&["NoSuchCase".to_string()]);
        assert!(none.is_empty());
    }

    #[test]
    fn test_outcome_mapping() {
        assert!(matches!(
            CaseOutcome::from(Ok(Verdict::skipped("none"))),
            CaseOutcome::Skipped(reason) if reason == "none"
        ));
        let failed = CaseOutcome::from(Err(HarnessError::assertion("boom")));
        assert_eq!(failed.status(), CaseStatus::Failed);
    }

    #[test]
    fn test_stream_periods() {
        assert_eq!(StreamRate::Normal.sampling_period(), Duration::from_millis(20));
        assert!(StreamRate::Fast.sampling_period() < StreamRate::Slow.sampling_period());
    }
}
