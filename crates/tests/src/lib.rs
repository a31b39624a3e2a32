//! # Integration Tests
//!
//! End-to-end runs of the conformance suite against the simulated HAL.
//!
//! Covers:
//! - Flush policy and flush counting
//! - Stale event detection and environment rebinding
//! - Streaming, batching and direct report paths
//! - Failure reporting with injected HAL faults, including stale
//!   redelivery and a HAL that ignores rebinding

/// Shortened timings and a small sensor profile
#[cfg(test)]
fn fast_config() -> contracts::HarnessConfig {
    use contracts::{HarnessConfig, ReportMode, SensorType, SimulatedSensorConfig};

    let mut config = HarnessConfig::default();
    config.timeouts.settle_ms = 100;
    config.timeouts.rebind_collection_ms = 300;
    config.streaming.duration_ms = 1000;
    config.hot_switch.min_events = 10;
    config.hot_switch.collection_timeout_ms = 5000;
    config.batching.min_batching_period_ms = 200;
    config.batching.max_batching_period_ms = 1000;
    config.direct_report.nominal_test_time_ms = 500;
    config.direct_report.init_margin_ms = 200;

    let mut accel = SimulatedSensorConfig::motion(SensorType::Accelerometer, 5_000, 50_000);
    accel.fifo_reserved_event_count = 60;
    config.simulated_hal.sensors = vec![
        accel,
        SimulatedSensorConfig::motion(SensorType::Gyroscope, 5_000, 50_000),
        SimulatedSensorConfig::basic(SensorType::Light, ReportMode::OnChange, 0, 1_000_000),
        SimulatedSensorConfig::basic(SensorType::SignificantMotion, ReportMode::OneShot, -1, 0),
        SimulatedSensorConfig::basic(SensorType::StepDetector, ReportMode::Special, 0, 0),
    ];
    config
}

#[cfg(test)]
mod contract_tests {
    use super::fast_config;

    #[test]
    fn test_fast_config_round_trips_through_loader() {
        let config = fast_config();
        let toml = config_loader::ConfigLoader::to_toml(&config).unwrap();
        let loaded = config_loader::ConfigLoader::load_from_str(
            &toml,
            config_loader::ConfigFormat::Toml,
        )
        .unwrap();
        assert_eq!(loaded.simulated_hal.sensors.len(), 5);
        assert_eq!(loaded.batching.min_batching_period_ms, 200);
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::sync::Arc;
    use std::time::Duration;

    use contracts::{HarnessConfig, SensorType, Status};
    use harness::sensor_set::{non_one_shot_sensors, one_shot_sensors};
    use harness::{CaseOutcome, Environment, Scenario, Suite, Vec3NormChecker, Verdict};
    use mock_hal::{MockFaults, MockSensorsHal};

    use super::fast_config;

    fn environment(config: &HarnessConfig) -> (MockSensorsHal, Environment<MockSensorsHal>) {
        let hal = MockSensorsHal::new(&config.simulated_hal);
        let env = Environment::new(Arc::new(hal.clone()));
        (hal, env)
    }

    fn filter(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    fn assert_passed(report: &harness::SuiteReport, name: &str) {
        match report.outcome(name) {
            Some(CaseOutcome::Passed) => {}
            other => panic!("{name}: {other:?}"),
        }
    }

    /// Five flushes on an active continuous sensor yield exactly five acknowledgements
    #[tokio::test]
    async fn test_flush_count_matches_calls() {
        let config = fast_config();
        let (hal, env) = environment(&config);
        env.setup().await.unwrap();
        let scenario = Scenario::new(&env, &config);

        let sensors = non_one_shot_sensors(&env.sensors_list().await.unwrap());
        scenario
            .run_flush_test(&sensors, true, 5, 5, Status::Ok)
            .await
            .unwrap();

        let one_shot = one_shot_sensors(&env.sensors_list().await.unwrap());
        scenario
            .run_single_flush_test(&one_shot, true, 0, Status::BadValue)
            .await
            .unwrap();

        // the guard deactivated everything
        assert_eq!(hal.active_sensor_count(), 0);
    }

    /// A wrong expectation is reported as a count mismatch, not a timeout error
    #[tokio::test]
    async fn test_flush_count_mismatch_fails() {
        let config = fast_config();
        let (hal, env) = environment(&config);
        env.setup().await.unwrap();
        let scenario = Scenario::new(&env, &config);

        let sensors = non_one_shot_sensors(&env.sensors_list().await.unwrap());
        let err = scenario
            .run_flush_test(&sensors[..1], true, 2, 3, Status::Ok)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("acknowledged 2 flushes, expected 3"));
        assert_eq!(hal.active_sensor_count(), 0);
    }

    #[tokio::test]
    async fn test_flush_cases_pass() {
        let config = fast_config();
        let (_hal, env) = environment(&config);
        let suite = Suite::catalog().filtered(&filter(&["Flush"]));

        let report = suite.run(&env, &config).await.unwrap();
        assert!(report.is_success(), "{}", report.summary);
        for name in [
            "FlushSensor",
            "FlushOneShotSensor",
            "FlushInactiveSensor",
            "FlushNonexistentSensor",
        ] {
            assert_passed(&report, name);
        }
    }

    #[tokio::test]
    async fn test_control_surface_cases_pass() {
        let config = fast_config();
        let (hal, env) = environment(&config);
        let suite = Suite::catalog().filtered(&filter(&[
            "SensorListValid",
            "SetOperationMode",
            "InjectSensorEventData",
            "Activate",
        ]));

        let report = suite.run(&env, &config).await.unwrap();
        assert_eq!(report.cases.len(), 4);
        assert!(report.is_success(), "{}", report.summary);
        assert_eq!(hal.active_sensor_count(), 0);
    }

    #[tokio::test]
    async fn test_no_stale_events() {
        let config = fast_config();
        let (_hal, env) = environment(&config);
        env.setup().await.unwrap();

        let verdict = Scenario::new(&env, &config).no_stale_events().await.unwrap();
        assert_eq!(verdict, Verdict::Passed);
    }

    /// After a second initialize only the new environment hears events; the
    /// original resumes once it is set up again
    #[tokio::test]
    async fn test_rebind_isolation() {
        let config = fast_config();
        let (_hal, env) = environment(&config);
        env.setup().await.unwrap();
        let scenario = Scenario::new(&env, &config);

        let verdict = scenario.call_initialize_twice().await.unwrap();
        assert_eq!(verdict, Verdict::Passed);
        assert!(env.is_live());

        // the restored binding still routes flush acknowledgements
        let sensors = non_one_shot_sensors(&env.sensors_list().await.unwrap());
        scenario
            .run_single_flush_test(&sensors, true, 1, Status::Ok)
            .await
            .unwrap();
    }

    /// 20 ms accelerometer streaming reaches half the nominal count with gravity-bounded norms
    #[tokio::test]
    async fn test_accelerometer_streaming() {
        let config = fast_config();
        let (_hal, env) = environment(&config);
        env.setup().await.unwrap();

        let verdict = Scenario::new(&env, &config)
            .streaming(
                SensorType::Accelerometer,
                Duration::from_millis(20),
                Duration::from_millis(config.streaming.duration_ms),
                &Vec3NormChecker::gravity(),
            )
            .await
            .unwrap();
        assert_eq!(verdict, Verdict::Passed);
    }

    #[tokio::test]
    async fn test_streaming_skips_unsupported_rate_and_type() {
        let mut config = fast_config();
        config.streaming.duration_ms = 200;
        let (_hal, env) = environment(&config);
        let suite = Suite::catalog().filtered(&filter(&["MagnetometerStreamingOperationSlow"]));

        let report = suite.run(&env, &config).await.unwrap();
        assert!(matches!(
            report.outcome("MagnetometerStreamingOperationSlow"),
            Some(CaseOutcome::Skipped(_))
        ));
        assert!(report.is_success());
    }

    #[tokio::test]
    async fn test_batching_and_hot_switch() {
        let config = fast_config();
        let (_hal, env) = environment(&config);
        let suite = Suite::catalog().filtered(&filter(&[
            "AccelerometerBatchingOperation",
            "GyroscopeSamplingPeriodHotSwitchOperation",
        ]));

        let report = suite.run(&env, &config).await.unwrap();
        assert_passed(&report, "AccelerometerBatchingOperation");
        assert_passed(&report, "GyroscopeSamplingPeriodHotSwitchOperation");
    }

    #[tokio::test]
    async fn test_direct_report_cases() {
        let config = fast_config();
        let (hal, env) = environment(&config);
        let suite = Suite::catalog().filtered(&filter(&["AccelerometerAshmemDirectReport"]));

        let report = suite.run(&env, &config).await.unwrap();
        assert_eq!(report.cases.len(), 3);
        assert!(report.is_success(), "{}", report.summary);
        assert_eq!(hal.channel_count(), 0);
    }

    /// Faults fail the affected cases without aborting the run
    #[tokio::test]
    async fn test_faults_reported_per_case() {
        let config = fast_config();
        let (hal, env) = environment(&config);
        hal.set_faults(&MockFaults {
            drop_flush_complete: true,
            ..Default::default()
        });
        let suite = Suite::catalog().filtered(&filter(&["FlushSensor", "FlushInactiveSensor"]));

        let report = suite.run(&env, &config).await.unwrap();
        assert!(!report.is_success());
        assert!(matches!(
            report.outcome("FlushSensor"),
            Some(CaseOutcome::Failed(_))
        ));
        // refusing a flush needs no acknowledgement
        assert_passed(&report, "FlushInactiveSensor");
        assert_eq!(report.summary.failed, 1);
        assert_eq!(hal.active_sensor_count(), 0);
    }

    fn failure_message(report: &harness::SuiteReport, name: &str) -> String {
        match report.outcome(name) {
            Some(CaseOutcome::Failed(err)) => err.to_string(),
            other => panic!("{name}: expected failure, got {other:?}"),
        }
    }

    /// A HAL that replays a sample from before deactivation is caught
    #[tokio::test]
    async fn test_stale_redelivery_fails_no_stale_events() {
        let config = fast_config();
        let (hal, env) = environment(&config);
        hal.set_faults(&MockFaults {
            redeliver_last_on_activate: true,
            ..Default::default()
        });
        let suite = Suite::catalog().filtered(&filter(&["NoStaleEvents"]));

        let report = suite.run(&env, &config).await.unwrap();
        assert!(failure_message(&report, "NoStaleEvents").contains("stale event"));
        assert_eq!(hal.active_sensor_count(), 0);
    }

    /// A continuous sensor that stays silent after reactivation fails the case
    #[tokio::test]
    async fn test_silent_reactivation_fails_no_stale_events() {
        let config = fast_config();
        let (hal, env) = environment(&config);
        hal.set_faults(&MockFaults {
            silent_reactivation: true,
            ..Default::default()
        });
        let suite = Suite::catalog().filtered(&filter(&["NoStaleEvents"]));

        let report = suite.run(&env, &config).await.unwrap();
        assert!(failure_message(&report, "NoStaleEvents").contains("after reactivation"));
    }

    /// A HAL that keeps feeding the first client after a second initialize fails isolation
    #[tokio::test]
    async fn test_kept_callback_fails_rebind_isolation() {
        let config = fast_config();
        let (hal, env) = environment(&config);
        hal.set_faults(&MockFaults {
            keep_previous_callback: true,
            ..Default::default()
        });
        let suite = Suite::catalog().filtered(&filter(&["CallInitializeTwice"]));

        let report = suite.run(&env, &config).await.unwrap();
        assert!(failure_message(&report, "CallInitializeTwice")
            .contains("original environment received"));
        assert_eq!(hal.active_sensor_count(), 0);
    }

    /// The shared region is sized for the whole window even when configured smaller
    #[tokio::test]
    async fn test_direct_report_with_small_region() {
        let mut config = fast_config();
        config.direct_report.region_records = 64;
        let (_hal, env) = environment(&config);
        let suite =
            Suite::catalog().filtered(&filter(&["AccelerometerAshmemDirectReportOperationFast"]));

        let report = suite.run(&env, &config).await.unwrap();
        assert_eq!(report.cases.len(), 1);
        assert_passed(&report, "AccelerometerAshmemDirectReportOperationFast");
    }

    #[tokio::test]
    async fn test_unresponsive_hal_fails_setup() {
        let config = fast_config();
        let (hal, env) = environment(&config);
        hal.set_faults(&MockFaults {
            unresponsive: true,
            ..Default::default()
        });

        let err = Suite::catalog().run(&env, &config).await.unwrap_err();
        assert!(err.to_string().contains("no response"));
    }
}
