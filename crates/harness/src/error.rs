use std::{path::PathBuf, process::ExitStatus, time::Duration};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("failed to spawn workload {path:?}")]
    Spawn {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read {path:?}")]
    ProcRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read procfs for pid {pid}")]
    Procfs {
        pid: u32,
        #[source]
        source: fb_procfs::Error,
    },
    #[error("malformed procfs entry, {0}")]
    ProcParse(String),
    #[error("failed to signal process group {pgid}")]
    Signal {
        pgid: i32,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to wait on pid {pid}")]
    Wait {
        pid: u32,
        #[source]
        source: std::io::Error,
    },
    #[error("workload pid {pid} exited on its own with {status}")]
    ExitedEarly { pid: u32, status: ExitStatus },
    #[error("workload pid {pid} still alive {grace:?} after SIGKILL")]
    TerminationTimeout { pid: u32, grace: Duration },
    #[error("workload pid {pid} wrote {stdout} bytes to stdout and {stderr} bytes to stderr")]
    UnexpectedOutput { pid: u32, stdout: usize, stderr: usize },
    #[error("invalid trial configuration, {0}")]
    Config(String),
}
