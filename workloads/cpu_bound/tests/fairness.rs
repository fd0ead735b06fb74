//! Several workload instances competing for the CPU.

use std::{path::PathBuf, time::Duration};

use harness::{TrialConfig, run_trial};
use test_log::test;

// scheduler noise on a shared test machine is larger than what the harness
// binary accepts by default
const TOLERANCE: f64 = 0.5;

#[test]
fn four_instances_get_equal_cpu() {
    let config = TrialConfig {
        program: PathBuf::from(env!("CARGO_BIN_EXE_cpu_bound")),
        instances: 4,
        warmup: Duration::from_millis(200),
        window: Duration::from_millis(1_500),
        grace: Duration::from_secs(2),
        tolerance: TOLERANCE,
    };

    let report = run_trial(&config).unwrap();
    tracing::info!("\n{}", report);

    assert_eq!(report.samples.len(), 4);
    assert!(report.samples.iter().all(|s| s.cpu > Duration::ZERO));
    assert!(report.never_blocked(), "an instance blocked or yielded");
    assert!(
        report.is_fair(TOLERANCE),
        "max deviation {:.1}% exceeds {:.1}%",
        report.max_deviation() * 100.0,
        TOLERANCE * 100.0
    );
}
