//! Fairness harness for CPU-bound workloads.
//!
//! Launches several instances of a workload, measures how much CPU time the
//! host scheduler hands each of them over a fixed wall-clock window and then
//! force-terminates them. Linux only: CPU time and memory come from procfs.

pub mod error;
pub mod fairness;
pub mod instance;
pub mod procfs;
pub mod trial;

pub use error::HarnessError;
pub use fairness::{FairnessReport, InstanceSample};
pub use instance::{Instance, Termination};
pub use trial::{TrialConfig, run_trial};
