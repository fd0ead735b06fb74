use std::{path::PathBuf, thread, time::Duration};

use configuration::{
    DEFAULT_GRACE_MS, DEFAULT_INSTANCES, DEFAULT_TOLERANCE, DEFAULT_WARMUP_MS, DEFAULT_WINDOW_MS,
};

use crate::{
    error::HarnessError,
    fairness::{FairnessReport, InstanceSample},
    instance::Instance,
};

#[derive(Debug, Clone, PartialEq)]
pub struct TrialConfig {
    /// Workload binary to launch.
    pub program: PathBuf,
    pub instances: usize,
    /// Time given to the instances before the first sample.
    pub warmup: Duration,
    /// Wall-clock window CPU time is measured over.
    pub window: Duration,
    /// How long a SIGKILLed instance may take to disappear.
    pub grace: Duration,
    pub tolerance: f64,
}

impl Default for TrialConfig {
    fn default() -> Self {
        TrialConfig {
            program: PathBuf::from("cpu_bound"),
            instances: DEFAULT_INSTANCES,
            warmup: Duration::from_millis(DEFAULT_WARMUP_MS),
            window: Duration::from_millis(DEFAULT_WINDOW_MS),
            grace: Duration::from_millis(DEFAULT_GRACE_MS),
            tolerance: DEFAULT_TOLERANCE,
        }
    }
}

impl TrialConfig {
    pub fn validate(&self) -> Result<(), HarnessError> {
        if self.instances == 0 {
            return Err(HarnessError::Config("at least one instance is required".to_owned()));
        }
        if self.window.is_zero() {
            return Err(HarnessError::Config("measurement window is empty".to_owned()));
        }
        if !(self.tolerance.is_finite() && self.tolerance >= 0.0) {
            return Err(HarnessError::Config(format!(
                "tolerance must be a non-negative number, got {}",
                self.tolerance
            )));
        }
        Ok(())
    }
}

/// Runs one fairness trial.
///
/// Starts `instances` copies of the workload, lets them settle for `warmup`,
/// measures how much CPU each one gets over `window` and then kills all of
/// them. Every instance has to still be running at the end of the window, has
/// to die within `grace` of SIGKILL and must not have written anything.
pub fn run_trial(config: &TrialConfig) -> Result<FairnessReport, HarnessError> {
    config.validate()?;

    tracing::info!(
        "starting {} instances of {:?}",
        config.instances,
        config.program
    );
    let mut instances = (0..config.instances)
        .map(|_| Instance::spawn(&config.program))
        .collect::<Result<Vec<_>, _>>()?;

    thread::sleep(config.warmup);
    let before = sample_all(&mut instances)?;

    tracing::debug!("measuring for {:?}", config.window);
    thread::sleep(config.window);
    let after = sample_all(&mut instances)?;

    let samples = instances
        .iter()
        .zip(before.iter().zip(after.iter()))
        .map(|(instance, (start, end))| InstanceSample {
            pid: instance.pid(),
            cpu: end.cpu.saturating_sub(start.cpu),
            voluntary_switches: end.voluntary_switches.saturating_sub(start.voluntary_switches),
        })
        .collect();

    for instance in instances {
        let termination = instance.kill(config.grace)?;
        if !termination.was_silent() {
            return Err(HarnessError::UnexpectedOutput {
                pid: termination.pid,
                stdout: termination.stdout_bytes,
                stderr: termination.stderr_bytes,
            });
        }
    }

    let report = FairnessReport::new(config.window, samples);
    tracing::info!(
        "max deviation from mean CPU share: {:.1}%",
        report.max_deviation() * 100.0
    );
    if !report.never_blocked() {
        tracing::warn!("some instances gave up the CPU voluntarily during the window");
    }
    Ok(report)
}

struct Snapshot {
    cpu: Duration,
    voluntary_switches: u64,
}

fn sample_all(instances: &mut [Instance]) -> Result<Vec<Snapshot>, HarnessError> {
    instances
        .iter_mut()
        .map(|instance| {
            instance.ensure_running()?;
            let snapshot = Snapshot {
                cpu: instance.cpu_time()?,
                voluntary_switches: instance.voluntary_switches()?,
            };
            tracing::trace!(
                "pid {} cpu {:?} vcsw {}",
                instance.pid(),
                snapshot.cpu,
                snapshot.voluntary_switches
            );
            Ok(snapshot)
        })
        .collect()
}
