use std::{
    io::Read,
    os::unix::process::{CommandExt, ExitStatusExt},
    path::Path,
    process::{Child, Command, ExitStatus, Stdio},
    time::{Duration, Instant},
};

use crate::{error::HarnessError, procfs};

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// One running workload process.
///
/// Each instance is the leader of its own process group, so killing the
/// group takes down the workload and anything it might have forked. If an
/// instance is dropped while still alive it is SIGKILLed and reaped.
#[derive(Debug)]
pub struct Instance {
    child: Child,
    pid: u32,
    reaped: bool,
}

/// How an instance ended after [`Instance::kill`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Termination {
    pub pid: u32,
    pub status: ExitStatus,
    pub stdout_bytes: usize,
    pub stderr_bytes: usize,
}

impl Termination {
    pub fn killed_by_sigkill(&self) -> bool {
        self.status.signal() == Some(libc::SIGKILL)
    }

    pub fn was_silent(&self) -> bool {
        self.stdout_bytes == 0 && self.stderr_bytes == 0
    }
}

impl Instance {
    /// Starts `program` with no arguments, an empty stdin and captured
    /// stdout/stderr.
    pub fn spawn(program: &Path) -> Result<Instance, HarnessError> {
        let child = Command::new(program)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .env_clear()
            .process_group(0)
            .spawn()
            .map_err(|source| HarnessError::Spawn {
                path: program.to_owned(),
                source,
            })?;

        let pid = child.id();
        tracing::debug!("spawned {:?} as pid {}", program, pid);

        Ok(Instance {
            child,
            pid,
            reaped: false,
        })
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Returns the exit status if the process has already ended on its own.
    pub fn exit_status(&mut self) -> Result<Option<ExitStatus>, HarnessError> {
        let pid = self.pid;
        self.child
            .try_wait()
            .map_err(|source| HarnessError::Wait { pid, source })
    }

    pub fn is_running(&mut self) -> Result<bool, HarnessError> {
        Ok(self.exit_status()?.is_none())
    }

    /// Fails with [`HarnessError::ExitedEarly`] if the process is gone.
    pub fn ensure_running(&mut self) -> Result<(), HarnessError> {
        match self.exit_status()? {
            None => Ok(()),
            Some(status) => Err(HarnessError::ExitedEarly {
                pid: self.pid,
                status,
            }),
        }
    }

    pub fn cpu_time(&self) -> Result<Duration, HarnessError> {
        procfs::cpu_time(self.pid)
    }

    pub fn resident_bytes(&self) -> Result<u64, HarnessError> {
        procfs::resident_bytes(self.pid)
    }

    pub fn voluntary_switches(&self) -> Result<u64, HarnessError> {
        procfs::voluntary_switches(self.pid)
    }

    /// Force-terminates the instance and waits up to `grace` for it to die.
    ///
    /// The workload never reacts to anything short of SIGKILL, so no
    /// gentler signal is tried first.
    pub fn kill(mut self, grace: Duration) -> Result<Termination, HarnessError> {
        let pid = self.pid;

        if let Err(err) = signal_group(pid, libc::SIGKILL) {
            // the process might already be gone; reap it and move on
            tracing::warn!("{}", err);
            let _ = self.child.kill();
        }

        let deadline = Instant::now() + grace;
        let status = loop {
            match self.child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) if Instant::now() >= deadline => {
                    tracing::error!("pid {} survived SIGKILL for {:?}", pid, grace);
                    return Err(HarnessError::TerminationTimeout { pid, grace });
                }
                Ok(None) => std::thread::sleep(POLL_INTERVAL),
                Err(source) => return Err(HarnessError::Wait { pid, source }),
            }
        };

        self.reaped = true;

        let stdout_bytes = drain(self.child.stdout.take());
        let stderr_bytes = drain(self.child.stderr.take());

        tracing::debug!("pid {} terminated with {}", pid, status);
        Ok(Termination {
            pid,
            status,
            stdout_bytes,
            stderr_bytes,
        })
    }
}

impl Drop for Instance {
    fn drop(&mut self) {
        if self.reaped {
            return;
        }
        if let Ok(Some(_)) = self.child.try_wait() {
            return;
        }
        let _ = signal_group(self.pid, libc::SIGKILL);
        let _ = self.child.wait();
    }
}

fn signal_group(pid: u32, signal: i32) -> Result<(), HarnessError> {
    let pgid = pid as i32;
    let ret = unsafe { libc::killpg(pgid, signal) };
    if ret == 0 {
        Ok(())
    } else {
        Err(HarnessError::Signal {
            pgid,
            source: std::io::Error::last_os_error(),
        })
    }
}

/// Reads whatever is left in a pipe once its writer is dead.
fn drain<R: Read>(pipe: Option<R>) -> usize {
    let mut buf = Vec::new();
    match pipe {
        Some(mut pipe) => pipe.read_to_end(&mut buf).unwrap_or(buf.len()),
        None => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn spawn_missing_program() {
        let err = Instance::spawn(Path::new("/nonexistent/cpu_bound")).unwrap_err();
        assert!(matches!(err, HarnessError::Spawn { .. }), "{err}");
    }

    #[test]
    fn exited_early_is_reported() {
        let mut instance = Instance::spawn(Path::new("/bin/sleep")).unwrap();
        // sleep without an operand exits immediately with an error
        let status = loop {
            if let Some(status) = instance.exit_status().unwrap() {
                break status;
            }
            std::thread::sleep(POLL_INTERVAL);
        };
        assert!(!status.success());
        assert!(matches!(
            instance.ensure_running(),
            Err(HarnessError::ExitedEarly { .. })
        ));
    }

    #[test]
    fn output_is_counted() {
        let instance = Instance::spawn(Path::new("/bin/echo")).unwrap();
        std::thread::sleep(Duration::from_millis(100));
        let termination = instance.kill(Duration::from_secs(1)).unwrap();
        assert!(termination.stdout_bytes > 0);
        assert!(!termination.was_silent());
    }

    #[test]
    fn kill_reaps_running_process() {
        // yes only stops once its stdout pipe fills up, and never exits
        let mut instance = Instance::spawn(Path::new("/bin/yes")).unwrap();
        let pid = instance.pid();
        assert!(instance.is_running().unwrap());

        let termination = instance.kill(Duration::from_secs(2)).unwrap();
        assert!(termination.killed_by_sigkill(), "{:?}", termination.status);
        assert!(!Path::new(&format!("/proc/{pid}")).exists());
    }

    fn spawn_retrying(program: &Path) -> Instance {
        // a freshly written script can briefly be ETXTBSY while another
        // test thread forks
        for _ in 0..20 {
            match Instance::spawn(program) {
                Err(HarnessError::Spawn { source, .. })
                    if source.raw_os_error() == Some(libc::ETXTBSY) =>
                {
                    std::thread::sleep(POLL_INTERVAL)
                }
                other => return other.unwrap(),
            }
        }
        panic!("{program:?} stayed busy");
    }

    #[test]
    fn sleeping_process_switches_voluntarily() {
        use std::os::unix::fs::PermissionsExt;

        let script = std::env::temp_dir().join(format!("napper-{}", std::process::id()));
        std::fs::write(&script, "#!/bin/sh\nwhile :; do /bin/sleep 0.05; done\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let instance = spawn_retrying(&script);
        std::thread::sleep(Duration::from_millis(100));
        let before = instance.voluntary_switches().unwrap();
        std::thread::sleep(Duration::from_millis(500));
        let after = instance.voluntary_switches().unwrap();

        instance.kill(Duration::from_secs(2)).unwrap();
        std::fs::remove_file(&script).unwrap();
        assert!(after > before, "{before} -> {after}");
    }

    #[test]
    fn drop_kills_running_process() {
        let instance = Instance::spawn(Path::new("/bin/yes")).unwrap();
        let pid = instance.pid();
        drop(instance);
        assert!(!Path::new(&format!("/proc/{pid}")).exists());
    }
}
