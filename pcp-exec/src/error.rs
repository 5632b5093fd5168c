use std::path::PathBuf;
use std::time::Duration;

use pcp_lang::CompileFailure;
use thiserror::Error;

/// Internal errors of the executor. They are never caused by the behaviour of a submission: the
/// caller may retry the execution.
#[derive(Debug, Error)]
pub enum ExecError {
    /// All the slots of the stream gate are in use.
    #[error("All the {width} execution slots are in use")]
    ResourceContention {
        /// The width of the gate.
        width: usize,
    },
    /// The loading namespace cannot be prepared.
    #[error("Cannot prepare the loading namespace: {0}")]
    Namespace(#[source] std::io::Error),
    /// The runtime of the submission cannot be started.
    #[error("Failed to spawn {program:?}: {source}")]
    Spawn {
        /// The program that was being started.
        program: PathBuf,
        /// The reason of the failure.
        #[source]
        source: std::io::Error,
    },
    /// A helper thread of the execution cannot be started.
    #[error("Failed to spawn thread {name:?}: {source}")]
    Thread {
        /// Name of the thread.
        name: String,
        /// The reason of the failure.
        #[source]
        source: std::io::Error,
    },
    /// The standard streams of the child process were not piped.
    #[error("The standard streams of the child are not available")]
    StreamUnavailable,
    /// The execution context was already activated or restored.
    #[error("The execution context was already used")]
    ContextReused,
}

/// The reason why an execution did not complete normally. These are outcomes of the submission,
/// recovered by the executor and reported inside the
/// [`ExecutionResult`](struct.ExecutionResult.html).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Fault {
    /// The source code did not produce a runnable unit.
    #[error(transparent)]
    CompileFailure(#[from] CompileFailure),
    /// The code of the submission failed while running.
    #[error("Runtime fault: {0}")]
    RuntimeFault(String),
    /// The execution did not complete in time.
    #[error("Execution exceeded the time limit of {0:?}")]
    TimeoutExceeded(Duration),
    /// The code of the submission tried to terminate its host.
    #[error("The submission tried to terminate the host process")]
    TerminationAttempt,
}

impl Fault {
    /// A short identifier of the kind of fault.
    pub fn kind(&self) -> &'static str {
        match self {
            Fault::CompileFailure(_) => "compile-failure",
            Fault::RuntimeFault(_) => "runtime-fault",
            Fault::TimeoutExceeded(_) => "timeout-exceeded",
            Fault::TerminationAttempt => "termination-attempt",
        }
    }
}

/// Error while loading a compiled unit into a namespace.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The entry point cannot be resolved inside the unit.
    #[error(transparent)]
    Unresolved(#[from] CompileFailure),
    /// The namespace cannot be created or filled.
    #[error("Cannot prepare the loading namespace: {0}")]
    Namespace(#[from] std::io::Error),
}
