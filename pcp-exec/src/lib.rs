//! Execution of the submissions of the contestants.
//!
//! Every submission runs in its own child process, started from a fresh private loading namespace
//! that contains only its artifacts. The components of an execution are:
//!
//! - [`IsolatedLoader`](struct.IsolatedLoader.html) materializes a
//!   [`CompiledUnit`](../pcp_lang/struct.CompiledUnit.html) into a new namespace, producing a
//!   [`Runnable`](struct.Runnable.html).
//! - [`StreamGate`](struct.StreamGate.html) grants the ownership of an execution context, by
//!   default to one execution at a time.
//! - [`ExecutionContext`](struct.ExecutionContext.html) connects the fixed input and the private
//!   output buffers to the standard streams of the child, and restores everything afterwards.
//! - [`TimeoutSupervisor`](struct.TimeoutSupervisor.html) runs the child under a wall-clock
//!   deadline.
//! - [`TerminationGuard`](struct.TerminationGuard.html) classifies how the child ended, turning the
//!   attempts to terminate the process into a controlled failure, and kills the process group of
//!   the child when the execution is over.
//!
//! [`Executor`](struct.Executor.html) wires them together, producing an
//! [`ExecutionResult`](struct.ExecutionResult.html).

#![deny(missing_docs)]

#[macro_use]
extern crate log;

mod context;
mod error;
mod gate;
mod guard;
mod loader;
mod reaper;
mod result;
mod supervisor;

pub use context::{ExecutionContext, DEFAULT_MAX_OUTPUT_BYTES};
pub use error::{ExecError, Fault, LoadError};
pub use gate::{StreamGate, StreamPermit};
pub use guard::{ExitKind, TerminationGuard};
pub use loader::{IsolatedLoader, Runnable};
pub use reaper::SIGNAL_EXIT_BASE;
pub use result::ExecutionResult;
pub use supervisor::{Supervised, TimeoutSupervisor, DEFAULT_TIME_LIMIT};

use std::path::PathBuf;
use std::time::Duration;

use pcp_lang::{CompiledUnit, Language};

/// Configuration of an [`Executor`](struct.Executor.html).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutorConfig {
    /// Wall-clock limit of each execution.
    pub time_limit: Duration,
    /// Cap of the captured bytes of each stream.
    pub max_output_bytes: usize,
    /// Number of executions that may own an execution context at the same time.
    pub parallel_executions: usize,
    /// Where to create the loading namespaces, the system temporary directory if `None`.
    pub namespace_root: Option<PathBuf>,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        ExecutorConfig {
            time_limit: DEFAULT_TIME_LIMIT,
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
            parallel_executions: 1,
            namespace_root: None,
        }
    }
}

/// What to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionRequest {
    /// The source code of the submission.
    pub source: String,
    /// The name of the entry point.
    pub entry_point: String,
    /// The language of the source.
    pub language: Language,
    /// The text fed to the standard input.
    pub input: String,
    /// The arguments passed to the entry point.
    pub args: Vec<String>,
}

/// Compiles and runs submissions.
#[derive(Debug)]
pub struct Executor {
    config: ExecutorConfig,
    gate: StreamGate,
    loader: IsolatedLoader,
    supervisor: TimeoutSupervisor,
}

impl Executor {
    /// Make a new executor with the specified configuration.
    pub fn new(config: ExecutorConfig) -> Executor {
        Executor {
            gate: StreamGate::new(config.parallel_executions),
            loader: IsolatedLoader::new(config.namespace_root.clone()),
            supervisor: TimeoutSupervisor::new(config.time_limit),
            config,
        }
    }

    /// The configuration of the executor.
    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// The gate around the execution contexts.
    pub fn gate(&self) -> &StreamGate {
        &self.gate
    }

    /// Compile and run a submission. The faults of the submission are reported in the result, an
    /// error is returned only if the executor itself failed.
    pub fn execute(&self, request: &ExecutionRequest) -> Result<ExecutionResult, ExecError> {
        let unit = match pcp_lang::compile(&request.source, &request.entry_point, request.language)
        {
            Ok(unit) => unit,
            Err(failure) => {
                debug!("{} did not compile: {}", request.entry_point, failure);
                return Ok(ExecutionResult::compile_failure(failure));
            }
        };
        self.execute_compiled(&unit, &request.input, &request.args)
    }

    /// Run an already compiled unit, waiting for a free execution context.
    pub fn execute_compiled(
        &self,
        unit: &CompiledUnit,
        input: &str,
        args: &[String],
    ) -> Result<ExecutionResult, ExecError> {
        let permit = match self.gate.try_acquire() {
            Ok(permit) => permit,
            Err(e) => {
                debug!("{}, waiting for a free slot", e);
                self.gate.acquire()
            }
        };
        self.run(unit, input, args, permit)
    }

    /// Run an already compiled unit, failing with `ResourceContention` if all the execution
    /// contexts are in use.
    pub fn try_execute_compiled(
        &self,
        unit: &CompiledUnit,
        input: &str,
        args: &[String],
    ) -> Result<ExecutionResult, ExecError> {
        let permit = self.gate.try_acquire()?;
        self.run(unit, input, args, permit)
    }

    fn run(
        &self,
        unit: &CompiledUnit,
        input: &str,
        args: &[String],
        permit: StreamPermit,
    ) -> Result<ExecutionResult, ExecError> {
        let runnable = match self.loader.load(unit) {
            Ok(runnable) => runnable,
            Err(LoadError::Unresolved(failure)) => {
                return Ok(ExecutionResult::compile_failure(failure))
            }
            Err(LoadError::Namespace(e)) => return Err(ExecError::Namespace(e)),
        };
        let mut ctx =
            ExecutionContext::new(input, permit).with_output_limit(self.config.max_output_bytes);
        let supervised = self.supervisor.run_with_deadline(&runnable, args, &mut ctx)?;
        ctx.restore();
        let (stdout, stderr) = (ctx.out(), ctx.err());
        let result = match supervised.exit {
            None => ExecutionResult::timeout(
                supervised.elapsed,
                self.supervisor.limit(),
                stdout,
                stderr,
            ),
            Some(ExitKind::Normal) => ExecutionResult::completed(supervised.elapsed, stdout, stderr),
            Some(ExitKind::TerminationAttempt) => {
                warn!(
                    "{} tried to terminate the host process",
                    runnable.entry_point()
                );
                ExecutionResult::faulted(
                    supervised.elapsed,
                    Fault::TerminationAttempt,
                    stdout,
                    stderr,
                )
            }
            Some(ExitKind::Fault(reason)) => ExecutionResult::faulted(
                supervised.elapsed,
                Fault::RuntimeFault(reason),
                stdout,
                stderr,
            ),
        };
        Ok(result.with_truncated(ctx.truncated()))
    }
}
