use std::time::Duration;

use pcp_lang::CompileFailure;
use serde::{Serialize, Serializer};

use crate::Fault;

/// The outcome of compiling and running a submission.
///
/// The fields are private so that the invariants hold for every value:
/// - a submission that did not compile has `exception` set and no captured output;
/// - a submission that timed out did compile and has `exception` unset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    #[serde(rename = "elapsedMs", serialize_with = "serialize_millis")]
    elapsed: Duration,
    compiled: bool,
    exception: bool,
    timed_out: bool,
    stdout: Option<String>,
    stderr: Option<String>,
    /// Whether some of the output was dropped because it exceeded the cap.
    truncated: bool,
    #[serde(serialize_with = "serialize_fault")]
    fault: Option<Fault>,
}

impl ExecutionResult {
    /// The source code did not produce a runnable unit.
    pub fn compile_failure(failure: CompileFailure) -> ExecutionResult {
        ExecutionResult {
            elapsed: Duration::ZERO,
            compiled: false,
            exception: true,
            timed_out: false,
            stdout: None,
            stderr: None,
            truncated: false,
            fault: Some(Fault::CompileFailure(failure)),
        }
    }

    /// The entry point returned normally.
    pub fn completed(elapsed: Duration, stdout: String, stderr: String) -> ExecutionResult {
        ExecutionResult {
            elapsed,
            compiled: true,
            exception: false,
            timed_out: false,
            stdout: Some(stdout),
            stderr: Some(stderr),
            truncated: false,
            fault: None,
        }
    }

    /// The execution did not complete in `limit`.
    pub fn timeout(
        elapsed: Duration,
        limit: Duration,
        stdout: String,
        stderr: String,
    ) -> ExecutionResult {
        ExecutionResult {
            elapsed,
            compiled: true,
            exception: false,
            timed_out: true,
            stdout: Some(stdout),
            stderr: Some(stderr),
            truncated: false,
            fault: Some(Fault::TimeoutExceeded(limit)),
        }
    }

    /// The execution ended with `fault`. Compile failures and timeouts are delegated to their own
    /// constructors, keeping the invariants.
    pub fn faulted(
        elapsed: Duration,
        fault: Fault,
        stdout: String,
        stderr: String,
    ) -> ExecutionResult {
        match fault {
            Fault::CompileFailure(failure) => ExecutionResult::compile_failure(failure),
            Fault::TimeoutExceeded(limit) => {
                ExecutionResult::timeout(elapsed, limit, stdout, stderr)
            }
            fault => ExecutionResult {
                elapsed,
                compiled: true,
                exception: true,
                timed_out: false,
                stdout: Some(stdout),
                stderr: Some(stderr),
                truncated: false,
                fault: Some(fault),
            },
        }
    }

    /// Mark the captured output as truncated. Ignored for results without output.
    pub fn with_truncated(mut self, truncated: bool) -> ExecutionResult {
        self.truncated = self.compiled && truncated;
        self
    }

    /// Time from the start of the execution to its completion or cancellation.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Whether the source produced a runnable unit.
    pub fn compiled(&self) -> bool {
        self.compiled
    }

    /// Whether the execution failed: compile failure, runtime fault or termination attempt.
    pub fn exception(&self) -> bool {
        self.exception
    }

    /// Whether the execution was cancelled because it exceeded the time limit.
    pub fn timed_out(&self) -> bool {
        self.timed_out
    }

    /// The captured standard output, absent if the source did not compile.
    pub fn stdout(&self) -> Option<&str> {
        self.stdout.as_deref()
    }

    /// The captured standard error, absent if the source did not compile.
    pub fn stderr(&self) -> Option<&str> {
        self.stderr.as_deref()
    }

    /// Whether some output was dropped.
    pub fn truncated(&self) -> bool {
        self.truncated
    }

    /// Why the execution did not complete normally.
    pub fn fault(&self) -> Option<&Fault> {
        self.fault.as_ref()
    }
}

fn serialize_millis<S: Serializer>(elapsed: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(elapsed.as_millis() as u64)
}

fn serialize_fault<S: Serializer>(fault: &Option<Fault>, serializer: S) -> Result<S::Ok, S::Error> {
    #[derive(Serialize)]
    struct FaultRepr<'a> {
        kind: &'a str,
        message: String,
    }
    fault
        .as_ref()
        .map(|fault| FaultRepr {
            kind: fault.kind(),
            message: fault.to_string(),
        })
        .serialize(serializer)
}
