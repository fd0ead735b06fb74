#![no_std]

/// Fixed-width word the recurrence runs on. All arithmetic on it wraps
/// modulo 2^32.
pub type Word = u32;

/// Number of inner recurrence steps in one outer iteration.
pub const BATCH_SIZE: u32 = 100_000;

/// Status handed to the host if the workload ever reaches its exit call.
pub const EXIT_STATUS: i32 = 0;

pub const DEFAULT_INSTANCES: usize = 4;
pub const DEFAULT_WARMUP_MS: u64 = 250;
pub const DEFAULT_WINDOW_MS: u64 = 2_000;
pub const DEFAULT_GRACE_MS: u64 = 500;

/// Largest relative deviation from the mean CPU share still counted as fair.
pub const DEFAULT_TOLERANCE: f64 = 0.25;
