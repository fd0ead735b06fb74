#![cfg_attr(not(test), no_std)]

pub mod generator;
pub mod recurrence;

pub use configuration::{BATCH_SIZE, Word};
pub use generator::{Batch, run, run_batch};
pub use recurrence::RecurrenceState;
