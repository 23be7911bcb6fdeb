use std::io::Read;
use std::process::{Command, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use crate::error::{NotifierError, Result};

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Runs `program` and returns its trimmed stdout. The child is killed once
/// `timeout` elapses so a wedged helper cannot outlive the hook's budget.
pub fn run_command(program: &str, args: &[&str], timeout: Duration) -> Result<String> {
    let label = command_label(program);
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|err| NotifierError::ToolFailed {
            command: label.clone(),
            reason: format!("failed to spawn: {err}"),
        })?;

    // Drain stdout on a separate thread; large outputs (ioreg) would
    // otherwise fill the pipe and stall the child until the deadline.
    let (tx, rx) = mpsc::channel();
    if let Some(mut stdout) = child.stdout.take() {
        thread::spawn(move || {
            let mut output = String::new();
            let _ = stdout.read_to_string(&mut output);
            let _ = tx.send(output);
        });
    }

    let start = Instant::now();
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) => {
                if start.elapsed() >= timeout {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(NotifierError::ToolTimeout {
                        command: label,
                        timeout,
                    });
                }
                thread::sleep(POLL_INTERVAL);
            }
            Err(err) => {
                return Err(NotifierError::ToolFailed {
                    command: label,
                    reason: err.to_string(),
                });
            }
        }
    };

    // A grandchild can keep the pipe open after the child exits; the reader
    // thread is abandoned at the deadline in that case.
    let remaining = timeout.saturating_sub(start.elapsed()).max(POLL_INTERVAL);
    let output = match rx.recv_timeout(remaining) {
        Ok(output) => output,
        Err(RecvTimeoutError::Disconnected) => String::new(),
        Err(RecvTimeoutError::Timeout) => {
            return Err(NotifierError::ToolTimeout {
                command: label,
                timeout,
            });
        }
    };
    if !status.success() {
        return Err(NotifierError::ToolFailed {
            command: label,
            reason: format!("exited with {status}"),
        });
    }
    Ok(output.trim().to_string())
}

pub fn spawn_background(program: &str, args: &[String]) -> Result<()> {
    Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map(|_| ())
        .map_err(|err| NotifierError::ToolFailed {
            command: command_label(program),
            reason: format!("failed to spawn: {err}"),
        })
}

/// Joins `argv` into one POSIX shell command line. Fails only for arguments
/// containing a nul byte, which no shell can carry.
pub fn shell_join<S: AsRef<str>>(argv: &[S]) -> Result<String> {
    shlex::try_join(argv.iter().map(|arg| arg.as_ref()))
        .map_err(|err| NotifierError::InvalidInput(format!("cannot quote command: {err}")))
}

pub fn truncate_chars(input: &str, max_chars: usize) -> String {
    input.chars().take(max_chars).collect()
}

fn command_label(program: &str) -> String {
    program
        .rsplit('/')
        .next()
        .filter(|name| !name.is_empty())
        .unwrap_or(program)
        .to_string()
}
