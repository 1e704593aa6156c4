//! Idempotent shutdown coordinator.
//!
//! Safe to invoke from a signal handler or a UI event loop: every step here
//! is either already idempotent (closing an fd that is already `-1`) or
//! swallows its own errors (signalling a process group that has already
//! been reaped).

use std::os::fd::RawFd;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use tracing::debug;

/// Grace period between `SIGTERM` and the follow-up `SIGKILL`.
const GRACE_PERIOD: Duration = Duration::from_millis(200);

/// Sends `SIGTERM` to the process group `pgid`, waits a brief grace period,
/// then sends `SIGKILL`. Missing-process errors (the group already exited)
/// are swallowed, per the error handling design's shutdown-path policy.
pub fn terminate_process_group(pgid: i32) {
    let group = Pid::from_raw(-pgid);
    let _ = signal::kill(group, Signal::SIGTERM);
    std::thread::sleep(GRACE_PERIOD);
    let _ = signal::kill(group, Signal::SIGKILL);
}

/// Closes `fd` if it is not already `-1`, swallowing close errors. Returns
/// `-1` so callers can store the result back into the fd slot they read
/// from, keeping the "closed" sentinel consistent no matter how many times
/// this runs.
pub fn close_pty(fd: RawFd) -> RawFd {
    if fd >= 0 {
        // SAFETY: `fd` is owned by the caller's runtime record and is not
        // used again after this call; double-close is guarded by the `-1`
        // sentinel check above.
        unsafe {
            libc::close(fd);
        }
        debug!(fd, "closed pty master");
    }
    -1
}

/// Flips `flag` to `true`, waking anything polling it (ready-latch waiters,
/// the prober's cancel check). Idempotent: setting an already-set flag is a
/// no-op observable effect.
pub fn request_cancel(flag: &AtomicBool) {
    flag.store(true, Ordering::SeqCst);
}
