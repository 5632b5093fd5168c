use std::os::unix::process::ExitStatusExt;
use std::process::{Child, ExitStatus};

use nix::errno::Errno;
use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
use pcp_lang::{COMPLETION_EXIT_CODE, TERMINATION_EXIT_CODE};

use crate::reaper::SIGNAL_EXIT_BASE;

/// How the process of a submission ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitKind {
    /// The entry point returned normally.
    Normal,
    /// The submission tried to terminate its process.
    TerminationAttempt,
    /// The submission failed: uncaught exception, non-zero exit code or fatal signal.
    Fault(String),
}

/// Guard over the process group of a running submission.
///
/// While armed, any attempt of the submission to terminate its process is reported as a
/// [`ExitKind::TerminationAttempt`](enum.ExitKind.html) by the launcher harness. When the guard
/// is disarmed, or dropped, the whole process group is killed so that nothing spawned by the
/// submission outlives its execution.
#[derive(Debug)]
pub struct TerminationGuard {
    /// The process group of the submission, equal to the pid of its leader.
    group: Pid,
    armed: bool,
}

impl TerminationGuard {
    /// Arm the guard over a child spawned as the leader of a new process group.
    pub fn arm(child: &Child) -> TerminationGuard {
        let group = Pid::from_raw(child.id() as i32);
        trace!("Termination guard armed over group {}", group);
        TerminationGuard { group, armed: true }
    }

    /// Classify the exit status of the child.
    ///
    /// Only the launcher harness exits with `COMPLETION_EXIT_CODE`. Exiting with `0` means that
    /// the process was ended bypassing the harness (e.g. `Runtime.halt(0)`, `posix._exit(0)`),
    /// which is an attempt to terminate it. A payload killed by a signal is reported by the reaper
    /// as `SIGNAL_EXIT_BASE` plus the signal number.
    pub fn classify(status: ExitStatus) -> ExitKind {
        match status.code() {
            Some(COMPLETION_EXIT_CODE) => ExitKind::Normal,
            Some(0) | Some(TERMINATION_EXIT_CODE) => ExitKind::TerminationAttempt,
            Some(code) if code > SIGNAL_EXIT_BASE => killed_by(code - SIGNAL_EXIT_BASE),
            Some(code) => ExitKind::Fault(format!("Exited with code {}", code)),
            None => match status.signal() {
                Some(sig) => killed_by(sig),
                None => ExitKind::Fault(format!("Unknown exit status: {}", status)),
            },
        }
    }

    /// Kill every process of the group. A group that is already gone is not an error.
    pub fn kill_group(&self) {
        match killpg(self.group, Signal::SIGKILL) {
            Ok(()) | Err(Errno::ESRCH) => {}
            Err(e) => warn!("Cannot kill process group {}: {}", self.group, e),
        }
    }

    /// Disarm the guard, killing what remains of the process group.
    pub fn disarm(mut self) {
        self.kill_group();
        self.armed = false;
        trace!("Termination guard over group {} disarmed", self.group);
    }
}

fn killed_by(sig: i32) -> ExitKind {
    let name = Signal::try_from(sig)
        .map(|s| s.as_str().to_string())
        .unwrap_or_else(|_| "unknown".to_string());
    ExitKind::Fault(format!("Killed by signal {} ({})", sig, name))
}

impl Drop for TerminationGuard {
    fn drop(&mut self) {
        if self.armed {
            self.kill_group();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use speculoos::prelude::*;

    #[test]
    fn test_classify() {
        assert_that!(TerminationGuard::classify(ExitStatus::from_raw(
            COMPLETION_EXIT_CODE << 8
        )))
        .is_equal_to(ExitKind::Normal);
        // a bare exit code 0 did not go through the harness
        assert_that!(TerminationGuard::classify(ExitStatus::from_raw(0)))
            .is_equal_to(ExitKind::TerminationAttempt);
        assert_that!(TerminationGuard::classify(ExitStatus::from_raw(
            TERMINATION_EXIT_CODE << 8
        )))
        .is_equal_to(ExitKind::TerminationAttempt);
        assert_that!(TerminationGuard::classify(ExitStatus::from_raw(1 << 8)))
            .is_equal_to(ExitKind::Fault("Exited with code 1".into()));
        assert_that!(TerminationGuard::classify(ExitStatus::from_raw(9)))
            .is_equal_to(ExitKind::Fault("Killed by signal 9 (SIGKILL)".into()));
        assert_that!(TerminationGuard::classify(ExitStatus::from_raw(
            (SIGNAL_EXIT_BASE + 11) << 8
        )))
        .is_equal_to(ExitKind::Fault("Killed by signal 11 (SIGSEGV)".into()));
    }
}
