//! Mock tool implementation for testing.
//!
//! Provides [`MockTool`] for unit testing without spawning processes.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use crate::{ExternalTool, Invocation, ToolError, ToolOutput};

/// Default output: a minimal SVG document.
const EMPTY_SVG: &[u8] = b"<svg xmlns=\"http://www.w3.org/2000/svg\"/>";

/// How a [`MockTool`] responds to an invocation.
#[derive(Debug, Clone)]
enum Behavior {
    /// Write the bytes to `{output}` and succeed.
    Write(Vec<u8>),
    /// Succeed without producing an output file.
    NoOutput,
    /// Exit with a failure and the given stderr.
    Fail(String),
    /// Fail to start `remaining` more times, then write the bytes.
    SpawnFailures { remaining: usize, bytes: Vec<u8> },
}

/// In-memory test double for [`ExternalTool`].
///
/// Counts invocations and records each [`Invocation`]. An optional delay
/// simulates a slow tool; the delay honours the invocation's timeout and
/// cancellation token the same way [`ProcessTool`](crate::ProcessTool) does.
///
/// # Example
///
/// ```ignore
/// use mdpdf_tool::{ExternalTool, MockTool};
///
/// let tool = MockTool::new("mmdc").with_output(b"<svg/>");
/// // ... run code under test ...
/// assert_eq!(tool.invocations(), 1);
/// ```
#[derive(Debug)]
pub struct MockTool {
    name: String,
    behavior: Mutex<Behavior>,
    delay: Duration,
    count: AtomicUsize,
    calls: Mutex<Vec<Invocation>>,
}

impl MockTool {
    /// Create a mock that writes an empty SVG document to `{output}`.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            behavior: Mutex::new(Behavior::Write(EMPTY_SVG.to_vec())),
            delay: Duration::ZERO,
            count: AtomicUsize::new(0),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Write `bytes` to `{output}` on every invocation.
    #[must_use]
    pub fn with_output(self, bytes: &[u8]) -> Self {
        self.set_behavior(Behavior::Write(bytes.to_vec()));
        self
    }

    /// Succeed without writing any output file.
    #[must_use]
    pub fn without_output(self) -> Self {
        self.set_behavior(Behavior::NoOutput);
        self
    }

    /// Fail every invocation with `stderr`.
    #[must_use]
    pub fn failing(self, stderr: impl Into<String>) -> Self {
        self.set_behavior(Behavior::Fail(stderr.into()));
        self
    }

    /// Fail to spawn `times` times before succeeding with `bytes`.
    #[must_use]
    pub fn with_spawn_failures(self, times: usize, bytes: &[u8]) -> Self {
        self.set_behavior(Behavior::SpawnFailures {
            remaining: times,
            bytes: bytes.to_vec(),
        });
        self
    }

    /// Sleep for `delay` before responding.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Number of times [`invoke`](ExternalTool::invoke) was called.
    #[must_use]
    pub fn invocations(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    /// Copies of all invocations received so far.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().unwrap().clone()
    }

    fn set_behavior(&self, behavior: Behavior) {
        *self.behavior.lock().unwrap() = behavior;
    }

    fn wait(&self, invocation: &Invocation) -> Result<(), ToolError> {
        let start = Instant::now();
        while start.elapsed() < self.delay {
            if invocation.cancel.is_cancelled() {
                return Err(ToolError::Cancelled {
                    program: self.name.clone(),
                });
            }
            if start.elapsed() > invocation.timeout {
                return Err(ToolError::Timeout {
                    program: self.name.clone(),
                    timeout: invocation.timeout,
                });
            }
            thread::sleep(Duration::from_millis(5));
        }
        Ok(())
    }

    fn write(&self, invocation: &Invocation, bytes: &[u8]) -> Result<ToolOutput, ToolError> {
        std::fs::write(&invocation.output, bytes).map_err(|e| ToolError::Io {
            program: self.name.clone(),
            message: e.to_string(),
        })?;
        Ok(ToolOutput::default())
    }
}

impl ExternalTool for MockTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn invoke(&self, invocation: &Invocation) -> Result<ToolOutput, ToolError> {
        self.count.fetch_add(1, Ordering::SeqCst);
        self.calls.lock().unwrap().push(invocation.clone());

        if invocation.cancel.is_cancelled() {
            return Err(ToolError::Cancelled {
                program: self.name.clone(),
            });
        }
        self.wait(invocation)?;

        let behavior = {
            let mut guard = self.behavior.lock().unwrap();
            if let Behavior::SpawnFailures { remaining: 0, bytes } = &*guard {
                let bytes = bytes.clone();
                *guard = Behavior::Write(bytes);
            }
            let snapshot = guard.clone();
            if let Behavior::SpawnFailures { remaining, .. } = &mut *guard {
                *remaining -= 1;
            }
            snapshot
        };

        match behavior {
            Behavior::Write(bytes) => self.write(invocation, &bytes),
            Behavior::NoOutput => Ok(ToolOutput::default()),
            Behavior::Fail(stderr) => Err(ToolError::Failed {
                program: self.name.clone(),
                code: Some(1),
                stderr,
            }),
            Behavior::SpawnFailures { .. } => Err(ToolError::Spawn {
                program: self.name.clone(),
                message: "simulated spawn failure".to_owned(),
            }),
        }
    }

    fn probe(&self) -> Result<String, ToolError> {
        Ok(format!("{} (mock)", self.name))
    }
}
