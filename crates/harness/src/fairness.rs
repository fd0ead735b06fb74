use std::{
    fmt::{self, Display},
    time::Duration,
};

/// What one instance did during the measurement window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstanceSample {
    pub pid: u32,
    pub cpu: Duration,
    /// Times the instance left the CPU on its own within the window.
    pub voluntary_switches: u64,
}

/// Per-instance CPU allocation over one wall-clock window.
#[derive(Debug, Clone, PartialEq)]
pub struct FairnessReport {
    pub window: Duration,
    pub samples: Vec<InstanceSample>,
}

impl FairnessReport {
    pub fn new(window: Duration, samples: Vec<InstanceSample>) -> Self {
        FairnessReport { window, samples }
    }

    pub fn total_cpu(&self) -> Duration {
        self.samples.iter().map(|s| s.cpu).sum()
    }

    pub fn mean_cpu(&self) -> Duration {
        match self.samples.len() {
            0 => Duration::ZERO,
            n => self.total_cpu() / n as u32,
        }
    }

    /// Fraction of the window the instance spent on a CPU.
    pub fn utilization(&self, sample: &InstanceSample) -> f64 {
        if self.window.is_zero() {
            return 0.0;
        }
        sample.cpu.as_secs_f64() / self.window.as_secs_f64()
    }

    /// Largest `|cpu - mean| / mean` across instances.
    ///
    /// A report where nobody got any CPU has no meaningful share and yields
    /// infinity.
    pub fn max_deviation(&self) -> f64 {
        let mean = self.mean_cpu().as_secs_f64();
        if self.samples.is_empty() {
            return 0.0;
        }
        if mean == 0.0 {
            return f64::INFINITY;
        }
        self.samples
            .iter()
            .map(|s| (s.cpu.as_secs_f64() - mean).abs() / mean)
            .fold(0.0, f64::max)
    }

    /// True when no instance blocked or yielded during the window.
    pub fn never_blocked(&self) -> bool {
        self.samples.iter().all(|s| s.voluntary_switches == 0)
    }

    /// Whether every instance stayed within `tolerance` of the mean share.
    pub fn is_fair(&self, tolerance: f64) -> bool {
        self.max_deviation() <= tolerance
    }
}

impl Display for FairnessReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== CPU Fairness Report ===")?;
        writeln!(
            f,
            "Window: {:.3}s, instances: {}",
            self.window.as_secs_f64(),
            self.samples.len()
        )?;
        writeln!(
            f,
            "  {:>8}  {:>10}  {:>7}  {:>6}",
            "pid", "cpu (s)", "util", "vcsw"
        )?;
        for sample in &self.samples {
            writeln!(
                f,
                "  {:>8}  {:>10.3}  {:>6.1}%  {:>6}",
                sample.pid,
                sample.cpu.as_secs_f64(),
                self.utilization(sample) * 100.0,
                sample.voluntary_switches
            )?;
        }
        writeln!(f, "Total CPU: {:.3}s", self.total_cpu().as_secs_f64())?;
        writeln!(f, "Mean CPU: {:.3}s", self.mean_cpu().as_secs_f64())?;
        write!(f, "Max deviation: {:.1}%", self.max_deviation() * 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    fn report(cpu_ms: &[u64]) -> FairnessReport {
        let samples = cpu_ms
            .iter()
            .enumerate()
            .map(|(i, ms)| InstanceSample {
                pid: 100 + i as u32,
                cpu: Duration::from_millis(*ms),
                voluntary_switches: 0,
            })
            .collect();
        FairnessReport::new(Duration::from_secs(1), samples)
    }

    #[test]
    fn equal_shares() {
        let report = report(&[500, 500, 500, 500]);
        assert_eq!(report.total_cpu(), Duration::from_secs(2));
        assert_eq!(report.mean_cpu(), Duration::from_millis(500));
        assert_eq!(report.max_deviation(), 0.0);
        assert!(report.is_fair(0.0));
        assert_eq!(report.utilization(&report.samples[0]), 0.5);
        assert!(report.never_blocked());
    }

    #[test]
    fn one_sleeping_instance() {
        let mut report = report(&[500, 500]);
        report.samples[1].voluntary_switches = 12;
        assert!(!report.never_blocked());
        assert!(report.to_string().contains("    12"));
    }

    #[test]
    fn one_starved_instance() {
        let report = report(&[1000, 1000, 1000, 200]);
        // mean 800, starved instance is 75% below it
        assert!((report.max_deviation() - 0.75).abs() < 1e-9);
        assert!(!report.is_fair(0.25));
        assert!(report.is_fair(0.8));
    }

    #[test]
    fn no_cpu_at_all() {
        let report = report(&[0, 0]);
        assert!(report.max_deviation().is_infinite());
        assert!(!report.is_fair(10.0));
    }

    #[test]
    fn empty() {
        let report = report(&[]);
        assert_eq!(report.mean_cpu(), Duration::ZERO);
        assert!(report.is_fair(0.0));
    }

    #[test]
    fn display() {
        let rendered = report(&[250, 750]).to_string();
        tracing::debug!("\n{}", rendered);
        assert!(rendered.contains("instances: 2"));
        assert!(rendered.contains("75.0%"));
        assert!(rendered.ends_with("Max deviation: 50.0%"));
    }
}
