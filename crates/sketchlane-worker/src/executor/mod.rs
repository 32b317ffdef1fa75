//! Toolchain invoker.
//!
//! Runs one subprocess under a deadline with a scrubbed environment and
//! captures its stdout and stderr in full. On timeout the whole process
//! group receives SIGTERM, then SIGKILL after the grace period, and the
//! outcome carries [`TIMEOUT_RETURN_CODE`]. Whatever is left in the group
//! when the child exits is killed as well.

pub mod command;

use std::collections::BTreeMap;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use sketchlane_protocol::ops::{ProcessOutcome, TIMEOUT_RETURN_CODE};
use thiserror::Error;
use tracing::{debug, warn};

pub use command::{build_flags, compile_args, upload_args, CompileSpec, ENV_ALLOWLIST, ENV_PREFIX_ALLOWLIST};

/// How often a running child is polled.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Errors from executor operations.
#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("I/O error while waiting for {program}: {source}")]
    Wait {
        program: String,
        #[source]
        source: io::Error,
    },
}

/// Invoker settings.
#[derive(Debug, Clone)]
pub struct InvokerConfig {
    /// Toolchain executable.
    pub toolchain_path: PathBuf,
    /// Time between SIGTERM and SIGKILL.
    pub termination_grace: Duration,
}

impl Default for InvokerConfig {
    fn default() -> Self {
        Self {
            toolchain_path: PathBuf::from("arduino-cli"),
            termination_grace: Duration::from_secs(5),
        }
    }
}

/// One subprocess to run.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub timeout: Duration,
}

impl Invocation {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            cwd: None,
            timeout,
        }
    }

    pub fn in_dir(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    /// Command line as a single string, for logs and timeout messages.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.display().to_string())
            .chain(self.args.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Runs toolchain subprocesses.
#[derive(Debug, Clone)]
pub struct Invoker {
    config: InvokerConfig,
}

impl Invoker {
    pub fn new(config: InvokerConfig) -> Self {
        Self { config }
    }

    pub fn toolchain_path(&self) -> &Path {
        &self.config.toolchain_path
    }

    /// An invocation of the configured toolchain.
    pub fn toolchain(&self, args: Vec<String>, timeout: Duration) -> Invocation {
        Invocation::new(self.config.toolchain_path.clone(), args, timeout)
    }

    /// Run to completion or deadline.
    ///
    /// A non-zero exit is not an error; only a failure to start or wait is.
    pub fn run(&self, invocation: &Invocation) -> Result<ProcessOutcome, ExecutorError> {
        let program = invocation.program.display().to_string();
        debug!(command = %invocation.command_line(), timeout_s = invocation.timeout.as_secs(), "spawning");

        let mut command = Command::new(&invocation.program);
        command
            .args(&invocation.args)
            .env_clear()
            .envs(build_environment(std::env::vars()))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(cwd) = &invocation.cwd {
            command.current_dir(cwd);
        }
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }

        let started = Instant::now();
        let mut child = command.spawn().map_err(|source| ExecutorError::Spawn {
            program: program.clone(),
            source,
        })?;

        let stdout_handle = spawn_reader(child.stdout.take());
        let stderr_handle = spawn_reader(child.stderr.take());

        let deadline = started + invocation.timeout;
        let status = match self.wait_until(&mut child, invocation, deadline, poll_exit) {
            Ok(status) => status,
            Err(source) => {
                join_reader(stdout_handle);
                join_reader(stderr_handle);
                return Err(ExecutorError::Wait { program, source });
            }
        };

        let stdout = join_reader(stdout_handle);
        let mut stderr = join_reader(stderr_handle);
        let duration_ms = started.elapsed().as_millis() as u64;

        let outcome = match status {
            Some(status) => ProcessOutcome {
                return_code: exit_code(status),
                stdout,
                stderr,
                timed_out: false,
                duration_ms,
            },
            None => {
                if !stderr.is_empty() && !stderr.ends_with('\n') {
                    stderr.push('\n');
                }
                stderr.push_str(&format!(
                    "Timeout after {}s while running: {}",
                    invocation.timeout.as_secs(),
                    invocation.command_line()
                ));
                ProcessOutcome {
                    return_code: TIMEOUT_RETURN_CODE,
                    stdout,
                    stderr,
                    timed_out: true,
                    duration_ms,
                }
            }
        };

        debug!(return_code = outcome.return_code, duration_ms, "subprocess finished");
        Ok(outcome)
    }

    /// Poll until the child exits or `deadline` passes.
    ///
    /// `None` means the deadline passed and the group was terminated. A poll
    /// error also terminates the group before it is returned.
    fn wait_until<F>(
        &self,
        child: &mut Child,
        invocation: &Invocation,
        deadline: Instant,
        mut poll: F,
    ) -> io::Result<Option<ExitStatus>>
    where
        F: FnMut(&mut Child) -> io::Result<Option<ExitStatus>>,
    {
        loop {
            match poll(child) {
                Ok(Some(status)) => return Ok(Some(status)),
                Ok(None) => {}
                Err(e) => {
                    warn!(command = %invocation.command_line(), error = %e, "wait failed, terminating");
                    self.terminate(child);
                    return Err(e);
                }
            }
            let now = Instant::now();
            if now >= deadline {
                warn!(command = %invocation.command_line(), timeout_s = invocation.timeout.as_secs(), "deadline reached, terminating");
                self.terminate(child);
                return Ok(None);
            }
            thread::sleep(POLL_INTERVAL.min(deadline - now));
        }
    }

    /// Terminate the child's group gracefully then forcefully.
    fn terminate(&self, child: &mut Child) {
        #[cfg(unix)]
        {
            use nix::sys::signal::Signal;

            signal_group(child, Signal::SIGTERM);
            let start = Instant::now();
            while start.elapsed() < self.config.termination_grace {
                match poll_exit(child) {
                    Ok(Some(_)) => return,
                    Ok(None) => thread::sleep(POLL_INTERVAL),
                    Err(_) => break,
                }
            }
            signal_group(child, Signal::SIGKILL);
        }

        let _ = child.kill();
        let _ = child.wait();
    }
}

/// Check for exit; once the leader is gone, kill the rest of its group.
///
/// On Linux the exit is observed without reaping, so the zombie leader
/// keeps the group id reserved until the group has been killed.
#[cfg(target_os = "linux")]
fn poll_exit(child: &mut Child) -> io::Result<Option<ExitStatus>> {
    use nix::sys::signal::Signal;
    use nix::sys::wait::{waitid, Id, WaitPidFlag, WaitStatus};
    use nix::unistd::Pid;

    let flags = WaitPidFlag::WEXITED | WaitPidFlag::WNOHANG | WaitPidFlag::WNOWAIT;
    match waitid(Id::Pid(Pid::from_raw(child.id() as i32)), flags) {
        Ok(WaitStatus::StillAlive) => Ok(None),
        Ok(_) => {
            signal_group(child, Signal::SIGKILL);
            child.wait().map(Some)
        }
        Err(errno) => Err(io::Error::from(errno)),
    }
}

/// Check for exit; once the leader is gone, kill the rest of its group.
///
/// Without a non-reaping wait the leader is reaped first, which leaves a
/// short window in which its group id could be reused.
#[cfg(all(unix, not(target_os = "linux")))]
fn poll_exit(child: &mut Child) -> io::Result<Option<ExitStatus>> {
    let status = child.try_wait()?;
    if status.is_some() {
        signal_group(child, nix::sys::signal::Signal::SIGKILL);
    }
    Ok(status)
}

#[cfg(not(unix))]
fn poll_exit(child: &mut Child) -> io::Result<Option<ExitStatus>> {
    child.try_wait()
}

#[cfg(unix)]
fn signal_group(child: &Child, signal: nix::sys::signal::Signal) {
    use nix::sys::signal::killpg;
    use nix::unistd::Pid;

    let _ = killpg(Pid::from_raw(child.id() as i32), signal);
}

fn spawn_reader<R: Read + Send + 'static>(source: Option<R>) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buffer = Vec::new();
        if let Some(mut source) = source {
            let _ = source.read_to_end(&mut buffer);
        }
        buffer
    })
}

fn join_reader(handle: JoinHandle<Vec<u8>>) -> String {
    let bytes = handle.join().unwrap_or_default();
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Exit code, or 128 + signal for a signalled child.
fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    1
}

/// Keep allow-listed variables, drop the rest.
pub fn build_environment<I>(vars: I) -> BTreeMap<String, String>
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut kept = BTreeMap::new();
    let mut dropped = Vec::new();
    for (key, value) in vars {
        let allowed = ENV_ALLOWLIST.contains(&key.as_str())
            || ENV_PREFIX_ALLOWLIST.iter().any(|prefix| key.starts_with(prefix));
        if allowed {
            kept.insert(key, value);
        } else {
            dropped.push(key);
        }
    }
    if !dropped.is_empty() {
        debug!(dropped = ?dropped, "environment scrubbed");
    }
    kept
}
