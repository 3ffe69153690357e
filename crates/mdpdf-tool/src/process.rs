//! Subprocess-backed [`ExternalTool`].

use std::io::Read;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::{CommandTemplate, ExternalTool, Invocation, ToolError, ToolOutput};

/// Interval between `try_wait` polls of a running child.
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Time budget for `--version` probes.
const PROBE_TIMEOUT: Duration = Duration::from_secs(30);

/// Runs a [`CommandTemplate`] as a child process.
///
/// Stdout and stderr are drained on helper threads so a chatty tool cannot
/// block on a full pipe. The child is polled with `try_wait`; on timeout or
/// cancellation it is killed and reaped before returning.
#[derive(Debug, Clone)]
pub struct ProcessTool {
    template: CommandTemplate,
}

impl ProcessTool {
    /// Create a tool from a command template.
    #[must_use]
    pub fn new(template: CommandTemplate) -> Self {
        Self { template }
    }

    /// The command template this tool runs.
    #[must_use]
    pub fn template(&self) -> &CommandTemplate {
        &self.template
    }

    fn spawn(&self, args: &[String], invocation: &Invocation) -> Result<Child, ToolError> {
        let mut command = Command::new(self.template.program());
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &invocation.cwd {
            command.current_dir(dir);
        }

        tracing::debug!(program = self.template.program(), ?args, "spawning tool");

        command.spawn().map_err(|e| ToolError::Spawn {
            program: self.name().to_owned(),
            message: e.to_string(),
        })
    }

    /// Wait for the child, enforcing the timeout and cancellation.
    fn supervise(
        &self,
        child: &mut Child,
        timeout: Duration,
        invocation: &Invocation,
    ) -> Result<ExitStatus, ToolError> {
        let start = Instant::now();
        loop {
            match child.try_wait() {
                Ok(Some(status)) => return Ok(status),
                Ok(None) => {
                    if invocation.cancel.is_cancelled() {
                        tracing::debug!(program = self.name(), "cancelled, terminating");
                        terminate(child);
                        return Err(ToolError::Cancelled {
                            program: self.name().to_owned(),
                        });
                    }
                    if start.elapsed() > timeout {
                        tracing::warn!(
                            program = self.name(),
                            "timed out after {:.2}s, terminating",
                            timeout.as_secs_f64()
                        );
                        terminate(child);
                        return Err(ToolError::Timeout {
                            program: self.name().to_owned(),
                            timeout,
                        });
                    }
                    thread::sleep(POLL_INTERVAL);
                }
                Err(e) => {
                    terminate(child);
                    return Err(ToolError::Io {
                        program: self.name().to_owned(),
                        message: e.to_string(),
                    });
                }
            }
        }
    }

    fn run(&self, args: &[String], invocation: &Invocation) -> Result<ToolOutput, ToolError> {
        if invocation.cancel.is_cancelled() {
            return Err(ToolError::Cancelled {
                program: self.name().to_owned(),
            });
        }

        let start = Instant::now();
        let mut child = self.spawn(args, invocation)?;
        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);

        // On timeout/cancel the reader threads are left detached: a grandchild
        // may still hold the pipes open.
        let status = self.supervise(&mut child, invocation.timeout, invocation)?;

        let stdout = collect(stdout);
        let stderr = collect(stderr);
        let elapsed = start.elapsed();

        if !status.success() {
            return Err(ToolError::Failed {
                program: self.name().to_owned(),
                code: status.code(),
                stderr: stderr.trim().to_owned(),
            });
        }

        tracing::debug!(
            program = self.name(),
            "completed in {:.2}s",
            elapsed.as_secs_f64()
        );

        Ok(ToolOutput {
            stdout,
            stderr,
            elapsed,
        })
    }
}

impl ExternalTool for ProcessTool {
    fn name(&self) -> &str {
        self.template.program()
    }

    fn invoke(&self, invocation: &Invocation) -> Result<ToolOutput, ToolError> {
        let args = self.template.expand(invocation);
        self.run(&args, invocation)
    }

    fn probe(&self) -> Result<String, ToolError> {
        let invocation = Invocation::new("", "", PROBE_TIMEOUT);
        let output = self.run(&["--version".to_owned()], &invocation)?;
        let banner = if output.stdout.trim().is_empty() {
            output.stderr
        } else {
            output.stdout
        };
        Ok(banner.lines().next().unwrap_or_default().trim().to_owned())
    }
}

/// Kill and reap a child, ignoring errors from an already-exited process.
fn terminate(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        buf
    })
}

fn collect(handle: Option<JoinHandle<Vec<u8>>>) -> String {
    handle
        .and_then(|h| h.join().ok())
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .unwrap_or_default()
}
