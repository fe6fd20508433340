//! External process execution.
//!
//! Every tool the provisioner touches (git, the package manager, the
//! runtime) is started through [`execute`]. Commands are a program plus an
//! argument vector; nothing is interpolated into a shell string.

use crate::error::{ProvisionError, Result};
use std::collections::HashMap;
use std::fmt;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

/// Poll interval while waiting on a child with a deadline.
const WAIT_POLL: Duration = Duration::from_millis(50);

/// How long output readers may take to drain after a timeout.
const READER_GRACE: Duration = Duration::from_millis(500);

/// A program and its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Program name or path.
    pub program: String,
    /// Arguments, passed verbatim.
    pub args: Vec<String>,
}

impl Invocation {
    /// Start an invocation of `program` with no arguments.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Append one argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", quote(&self.program))?;
        for arg in &self.args {
            write!(f, " {}", quote(arg))?;
        }
        Ok(())
    }
}

fn quote(word: &str) -> String {
    if word.is_empty() || word.contains(char::is_whitespace) {
        format!("\"{}\"", word)
    } else {
        word.to_string()
    }
}

/// Result of executing a command.
#[derive(Debug, Clone)]
pub struct CommandResult {
    /// Exit code (None if killed by signal or timeout).
    pub exit_code: Option<i32>,

    /// Standard output.
    pub stdout: String,

    /// Standard error.
    pub stderr: String,

    /// Execution duration.
    pub duration: Duration,

    /// Whether command succeeded (exit code 0).
    pub success: bool,

    /// Whether the command was killed for exceeding its timeout.
    pub timed_out: bool,
}

impl CommandResult {
    /// Create a success result.
    pub fn success(stdout: String, stderr: String, duration: Duration) -> Self {
        Self {
            exit_code: Some(0),
            stdout,
            stderr,
            duration,
            success: true,
            timed_out: false,
        }
    }

    /// Create a failure result.
    pub fn failure(
        exit_code: Option<i32>,
        stdout: String,
        stderr: String,
        duration: Duration,
    ) -> Self {
        Self {
            exit_code,
            stdout,
            stderr,
            duration,
            success: false,
            timed_out: false,
        }
    }

    fn timeout(stdout: String, stderr: String, duration: Duration) -> Self {
        Self {
            timed_out: true,
            ..Self::failure(None, stdout, stderr, duration)
        }
    }
}

/// Options for command execution.
#[derive(Debug, Clone, Default)]
pub struct CommandOptions {
    /// Working directory.
    pub cwd: Option<PathBuf>,

    /// Environment variables (merged with system env).
    pub env: HashMap<String, String>,

    /// Capture stdout (if false, inherits from parent).
    pub capture_stdout: bool,

    /// Capture stderr (if false, inherits from parent).
    pub capture_stderr: bool,

    /// Inherit stdin so the child can ask the operator questions.
    /// When false the child reads from /dev/null.
    pub interactive: bool,

    /// Timeout in seconds (None = no timeout).
    pub timeout: Option<u64>,
}

impl CommandOptions {
    /// Options that capture both output streams.
    pub fn captured() -> Self {
        Self {
            capture_stdout: true,
            capture_stderr: true,
            ..Default::default()
        }
    }
}

/// Execute a command, killing it if it outlives `options.timeout`.
pub fn execute(invocation: &Invocation, options: &CommandOptions) -> Result<CommandResult> {
    let start = Instant::now();

    let mut cmd = Command::new(&invocation.program);
    cmd.args(&invocation.args);

    if let Some(cwd) = &options.cwd {
        cmd.current_dir(cwd);
    }

    for (key, value) in &options.env {
        cmd.env(key, value);
    }

    cmd.stdin(if options.interactive {
        Stdio::inherit()
    } else {
        Stdio::null()
    });
    cmd.stdout(if options.capture_stdout {
        Stdio::piped()
    } else {
        Stdio::inherit()
    });
    cmd.stderr(if options.capture_stderr {
        Stdio::piped()
    } else {
        Stdio::inherit()
    });

    // A bounded, non-interactive command runs in its own process group so a
    // timeout reaches everything it forked. Interactive commands stay in the
    // foreground group to keep reading from the terminal.
    let own_group = cfg!(unix) && options.timeout.is_some() && !options.interactive;
    #[cfg(unix)]
    if own_group {
        use std::os::unix::process::CommandExt;
        cmd.process_group(0);
    }

    tracing::debug!("Running {}", invocation);

    let mut child = cmd.spawn().map_err(|e| {
        tracing::debug!("Failed to start {}: {}", invocation.program, e);
        ProvisionError::CommandFailed {
            command: invocation.to_string(),
            code: None,
        }
    })?;

    // Drain pipes on their own threads so a chatty child can't fill the
    // pipe buffer and stall while we wait on it.
    let stdout_handle = child.stdout.take().map(spawn_reader);
    let stderr_handle = child.stderr.take().map(spawn_reader);

    let deadline = options.timeout.map(|secs| start + Duration::from_secs(secs));
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break Some(status),
            Ok(None) => {}
            Err(_) => {
                return Err(ProvisionError::CommandFailed {
                    command: invocation.to_string(),
                    code: None,
                })
            }
        }
        match deadline {
            Some(deadline) if Instant::now() >= deadline => {
                stop(&mut child, own_group);
                break None;
            }
            Some(_) => thread::sleep(WAIT_POLL),
            None => {
                break Some(child.wait().map_err(|_| ProvisionError::CommandFailed {
                    command: invocation.to_string(),
                    code: None,
                })?)
            }
        }
    };

    // After a timeout a surviving descendant may still hold the pipes open;
    // its output is abandoned rather than waited for.
    let timed_out = status.is_none();
    let stdout = collect_output(stdout_handle, timed_out);
    let stderr = collect_output(stderr_handle, timed_out);
    let duration = start.elapsed();

    match status {
        None => {
            tracing::warn!(
                "{} exceeded its {}s timeout and was stopped",
                invocation,
                options.timeout.unwrap_or_default()
            );
            Ok(CommandResult::timeout(stdout, stderr, duration))
        }
        Some(status) if status.success() => Ok(CommandResult::success(stdout, stderr, duration)),
        Some(status) => Ok(CommandResult::failure(
            status.code(),
            stdout,
            stderr,
            duration,
        )),
    }
}

/// Kill a timed-out child, and its whole process group when it has one.
fn stop(child: &mut Child, own_group: bool) {
    #[cfg(unix)]
    if own_group {
        if let Ok(pgid) = libc::pid_t::try_from(child.id()) {
            // SAFETY: killpg only sends a signal; the group was created for
            // this child by `process_group(0)`.
            unsafe {
                libc::killpg(pgid, libc::SIGKILL);
            }
        }
    }
    #[cfg(not(unix))]
    let _ = own_group;
    let _ = child.kill();
    let _ = child.wait();
}

/// Output gathered by a reader thread. After a timeout the thread gets a
/// short grace period and is then left behind.
fn collect_output(handle: Option<thread::JoinHandle<String>>, timed_out: bool) -> String {
    let Some(handle) = handle else {
        return String::new();
    };
    if timed_out {
        let grace = Instant::now() + READER_GRACE;
        while !handle.is_finished() && Instant::now() < grace {
            thread::sleep(WAIT_POLL);
        }
        if !handle.is_finished() {
            return String::new();
        }
    }
    handle.join().unwrap_or_default()
}

fn spawn_reader<R: Read + Send + 'static>(stream: R) -> thread::JoinHandle<String> {
    thread::spawn(move || {
        let reader = BufReader::new(stream);
        let mut output = String::new();
        for line in reader.lines().map_while(std::result::Result::ok) {
            output.push_str(&line);
            output.push('\n');
        }
        output
    })
}

/// Execute a command and return success/failure.
pub fn execute_check(invocation: &Invocation, cwd: Option<&Path>) -> bool {
    let options = CommandOptions {
        cwd: cwd.map(|p| p.to_path_buf()),
        ..CommandOptions::captured()
    };

    execute(invocation, &options)
        .map(|r| r.success)
        .unwrap_or(false)
}
