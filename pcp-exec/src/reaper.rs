//! Intermediate process between the host and the runtime of a submission.
//!
//! The spawned child forks once more right before `exec`: the grandchild becomes the runtime, the
//! child stays behind as its parent, waits for it and exits with its status. The submission never
//! sees the host as its parent, so killing its parent does not kill the host.

use std::io;
use std::os::fd::RawFd;

use nix::errno::Errno;
use nix::sys::wait::{waitpid, WaitStatus};
use nix::unistd::{close, fork, ForkResult, Pid};

/// A payload killed by signal `n` is reported with exit code `SIGNAL_EXIT_BASE + n`.
pub const SIGNAL_EXIT_BASE: i32 = 128;

/// File descriptors below this bound are closed by the reaper.
const MAX_INHERITED_FD: RawFd = 1024;

/// Fork the reaper. Meant to run inside `pre_exec`: it only returns in the grandchild, which goes
/// on with the `exec` of the runtime.
///
/// # Safety
///
/// Same requirements of `CommandExt::pre_exec`: only async-signal-safe operations happen after
/// the fork.
pub(crate) unsafe fn interpose() -> io::Result<()> {
    match fork().map_err(io::Error::from)? {
        ForkResult::Child => Ok(()),
        ForkResult::Parent { child } => {
            // release the pipes, so the host sees EOF as soon as the payload is gone, and the
            // close-on-exec pipe used by `spawn` to report the outcome of the exec
            for fd in 0..MAX_INHERITED_FD {
                let _ = close(fd);
            }
            nix::libc::_exit(wait_payload(child))
        }
    }
}

fn wait_payload(payload: Pid) -> i32 {
    loop {
        match waitpid(payload, None) {
            Ok(WaitStatus::Exited(_, code)) => return code,
            Ok(WaitStatus::Signaled(_, sig, _)) => return SIGNAL_EXIT_BASE + sig as i32,
            Ok(_) | Err(Errno::EINTR) => continue,
            Err(_) => return SIGNAL_EXIT_BASE,
        }
    }
}
