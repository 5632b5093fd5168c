use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, RecvTimeoutError};

use crate::{ExecError, ExecutionContext, ExitKind, Runnable, TerminationGuard};

/// The default wall-clock limit of an execution.
pub const DEFAULT_TIME_LIMIT: Duration = Duration::from_secs(60);

/// How long to wait for the waiter thread after killing a child that overran its deadline.
const KILL_GRACE: Duration = Duration::from_secs(1);

/// The outcome of a supervised invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Supervised {
    /// Whether the invocation returned before the deadline.
    pub completed: bool,
    /// Time from the spawn of the child to its completion or cancellation.
    pub elapsed: Duration,
    /// How the child ended, `None` if it was cancelled.
    pub exit: Option<ExitKind>,
}

/// Runs invocations under a wall-clock deadline.
#[derive(Debug, Clone)]
pub struct TimeoutSupervisor {
    limit: Duration,
}

impl Default for TimeoutSupervisor {
    fn default() -> Self {
        TimeoutSupervisor::new(DEFAULT_TIME_LIMIT)
    }
}

impl TimeoutSupervisor {
    /// Make a supervisor with the specified limit.
    pub fn new(limit: Duration) -> TimeoutSupervisor {
        TimeoutSupervisor { limit }
    }

    /// The time limit of the invocations.
    pub fn limit(&self) -> Duration {
        self.limit
    }

    /// Invoke the entry point of `runnable` with `args` on a dedicated waiter thread, blocking
    /// until it returns or the limit elapses.
    ///
    /// On overrun the process group of the child is killed and, if the waiter does not notice it
    /// within a short grace period, the waiter is detached. The faults of the submission are
    /// reported inside the `Supervised` value: only the failures of the executor itself (e.g. the
    /// runtime cannot be spawned) are returned as errors.
    pub fn run_with_deadline(
        &self,
        runnable: &Runnable,
        args: &[String],
        ctx: &mut ExecutionContext,
    ) -> Result<Supervised, ExecError> {
        let start = Instant::now();
        let mut child = runnable.invoke(args, ctx)?;
        let guard = TerminationGuard::arm(&child);

        let (sender, receiver) = bounded(1);
        let name = format!("Waiter of {}", runnable.entry_point());
        thread::Builder::new()
            .name(name.clone())
            .spawn(move || {
                let _ = sender.send(child.wait());
            })
            .map_err(|source| ExecError::Thread { name, source })?;

        let supervised = match receiver.recv_timeout(self.limit) {
            Ok(Ok(status)) => Supervised {
                completed: true,
                elapsed: start.elapsed(),
                exit: Some(TerminationGuard::classify(status)),
            },
            Ok(Err(e)) => Supervised {
                completed: true,
                elapsed: start.elapsed(),
                exit: Some(ExitKind::Fault(format!("Cannot wait the child: {}", e))),
            },
            Err(RecvTimeoutError::Disconnected) => Supervised {
                completed: true,
                elapsed: start.elapsed(),
                exit: Some(ExitKind::Fault("The waiter thread failed".into())),
            },
            Err(RecvTimeoutError::Timeout) => {
                let elapsed = start.elapsed();
                warn!(
                    "{} exceeded the time limit of {:?}, killing it",
                    runnable.entry_point(),
                    self.limit
                );
                guard.kill_group();
                if receiver.recv_timeout(KILL_GRACE).is_err() {
                    warn!("The waiter of {} is stuck, detaching it", runnable.entry_point());
                }
                Supervised {
                    completed: false,
                    elapsed,
                    exit: None,
                }
            }
        };
        guard.disarm();
        debug!(
            "{} finished in {:?}: {:?}",
            runnable.entry_point(),
            supervised.elapsed,
            supervised.exit
        );
        Ok(supervised)
    }
}
