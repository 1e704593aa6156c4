//! Spawns the shell child for a task (or a readiness probe) in its own
//! session and process group.
//!
//! Running each child as a session leader is what makes group-kill correct
//! later: without it, `SIGTERM` to the child misses grandchildren spawned by
//! shell constructs like `&&`. `nix::unistd::setsid` inside `pre_exec` runs
//! in the forked child before `exec`, which is the only place this can be
//! done safely with the standard library's `Command`.

use std::os::fd::{AsRawFd, OwnedFd, RawFd};
use std::os::unix::process::CommandExt;
use std::path::Path;
use std::process::{Child, Command, Stdio};

use crate::constants::{TASK_SHELL, TASK_SHELL_FLAG};

/// Spawns `command` via `/bin/bash -c` in `workdir`, as the leader of a new
/// session and process group, with `stdin`/`stdout`/`stderr` all duplicated
/// from `slave_fd` (the PTY slave). The parent's copy of `slave_fd` is left
/// untouched by this call; closing it after spawn is the caller's
/// responsibility, since the child now holds its own duplicated copies.
///
/// Best-effort: on Linux, requests that the kernel deliver `SIGTERM` to the
/// child if this process dies before it does, via `PR_SET_PDEATHSIG`. This
/// is a safety net, not a correctness requirement; its failure is ignored.
pub fn spawn_in_pty(command: &str, workdir: &Path, slave_fd: RawFd) -> std::io::Result<Child> {
    let mut cmd = Command::new(TASK_SHELL);
    cmd.arg(TASK_SHELL_FLAG)
        .arg(command)
        .current_dir(workdir)
        .stdin(dup_stdio(slave_fd)?)
        .stdout(dup_stdio(slave_fd)?)
        .stderr(dup_stdio(slave_fd)?);

    // SAFETY: `setsid` and the best-effort `prctl` call are async-signal-safe
    // and touch only the forked child's own process state; they run after
    // `fork` and before `exec`, per `pre_exec`'s contract.
    unsafe {
        cmd.pre_exec(|| {
            nix::unistd::setsid().map_err(std::io::Error::from)?;
            set_parent_death_signal();
            Ok(())
        });
    }

    cmd.spawn()
}

/// Spawns a short-lived readiness-probe shell in its own process group, with
/// stdout/stderr discarded as the spec requires.
pub fn spawn_probe(command: &str, workdir: &Path) -> std::io::Result<Child> {
    let mut cmd = Command::new(TASK_SHELL);
    cmd.arg(TASK_SHELL_FLAG)
        .arg(command)
        .current_dir(workdir)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());

    // SAFETY: see `spawn_in_pty`; the probe gets its own process group so
    // killing the task's group never depends on which shell spawned first.
    unsafe {
        cmd.pre_exec(|| {
            nix::unistd::setsid().map_err(std::io::Error::from)?;
            Ok(())
        });
    }

    cmd.spawn()
}

fn dup_stdio(fd: RawFd) -> std::io::Result<Stdio> {
    let owned: OwnedFd = crate::pty::dup_fd(fd).map(|d| unsafe {
        // SAFETY: `dup_fd` just returned a fresh, uniquely-owned descriptor.
        std::os::fd::FromRawFd::from_raw_fd(d)
    })?;
    Ok(Stdio::from(owned))
}

#[cfg(target_os = "linux")]
fn set_parent_death_signal() {
    // SAFETY: `prctl` with `PR_SET_PDEATHSIG` only affects the calling
    // thread's own death-signal setting; failure is recoverable and ignored.
    unsafe {
        libc::prctl(libc::PR_SET_PDEATHSIG, libc::SIGTERM);
    }
}

#[cfg(not(target_os = "linux"))]
fn set_parent_death_signal() {}

/// The process group id of `child`. Valid because every child spawned here
/// is its own session leader, so its pgid always equals its pid.
pub fn pgid_of(child: &Child) -> i32 {
    child.id() as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn spawn_probe_runs_and_exits_successfully() {
        let mut child = spawn_probe("exit 0", &PathBuf::from(".")).expect("spawn probe");
        let status = child.wait().expect("wait for probe");
        assert!(status.success());
    }

    #[test]
    fn spawn_probe_reports_nonzero_exit() {
        let mut child = spawn_probe("exit 7", &PathBuf::from(".")).expect("spawn probe");
        let status = child.wait().expect("wait for probe");
        assert_eq!(status.code(), Some(7));
    }

    #[test]
    fn spawned_probe_is_its_own_process_group_leader() {
        let mut child = spawn_probe("exit 0", &PathBuf::from(".")).expect("spawn probe");
        let pid = nix::unistd::Pid::from_raw(child.id() as i32);
        let pgid = nix::unistd::getpgid(Some(pid)).expect("getpgid");
        assert_eq!(pgid.as_raw(), pid.as_raw());
        let _ = child.wait();
    }

    #[test]
    fn spawn_in_pty_duplicates_slave_to_all_three_streams() {
        let pty = crate::pty::open_pty().expect("open pty");
        let slave_fd = pty.slave.as_raw_fd();
        let mut child =
            spawn_in_pty("echo hi", &PathBuf::from("."), slave_fd).expect("spawn in pty");
        let status = child.wait().expect("wait");
        assert!(status.success());
    }
}
