//! Per-pid samples taken from `/proc`.

use std::{path::PathBuf, time::Duration};

use ::fb_procfs as procfs;

use crate::error::HarnessError;

fn read_pid_stat(pid: u32) -> Result<procfs::PidStat, HarnessError> {
    procfs::ProcReader::new()
        .read_pid_stat(pid)
        .map_err(|source| HarnessError::Procfs { pid, source })
}

fn missing(pid: u32, field: &str) -> HarnessError {
    HarnessError::ProcParse(format!("pid {pid} stat has no {field}"))
}

/// User plus system CPU time consumed by `pid` so far.
pub fn cpu_time(pid: u32) -> Result<Duration, HarnessError> {
    let stat = read_pid_stat(pid)?;
    let user = stat.user_usecs.ok_or_else(|| missing(pid, "user time"))?;
    let system = stat.system_usecs.ok_or_else(|| missing(pid, "system time"))?;
    Ok(Duration::from_micros(user + system))
}

pub fn resident_bytes(pid: u32) -> Result<u64, HarnessError> {
    read_pid_stat(pid)?
        .rss_bytes
        .ok_or_else(|| missing(pid, "resident set size"))
}

/// Number of times `pid` gave up the CPU on its own (blocked, slept or
/// yielded). Involuntary preemptions are not counted.
pub fn voluntary_switches(pid: u32) -> Result<u64, HarnessError> {
    let path = PathBuf::from(format!("/proc/{pid}/status"));
    let content = std::fs::read_to_string(&path)
        .map_err(|source| HarnessError::ProcRead { path, source })?;
    parse_voluntary_switches(&content)
}

/// `fb_procfs` does not carry the context switch counters, so they are
/// picked out of `/proc/<pid>/status` directly.
fn parse_voluntary_switches(status: &str) -> Result<u64, HarnessError> {
    let line = status
        .lines()
        .find(|l| l.starts_with("voluntary_ctxt_switches:"))
        .ok_or_else(|| {
            HarnessError::ProcParse("status has no voluntary_ctxt_switches line".to_owned())
        })?;
    let raw = line.split_whitespace().nth(1).unwrap_or("");
    raw.parse().map_err(|_| {
        HarnessError::ProcParse(format!("voluntary_ctxt_switches is not a number: {raw:?}"))
    })
}
