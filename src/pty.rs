//! PTY allocation and the output pump.
//!
//! A pseudo-terminal is used instead of a pipe so that children see an
//! interactive terminal and produce line-buffered, color-capable output the
//! way a real terminal session would; most libc stdio implementations fully
//! buffer output written to a pipe, which would break real-time log
//! display. This module only targets Unix, via `nix`'s `pty` feature.

use std::os::fd::{OwnedFd, RawFd};
use std::sync::mpsc::SyncSender;
use std::thread::{self, JoinHandle};

use crate::constants::{LOG_LINE_SEPARATOR, PTY_READ_CHUNK};

/// A freshly opened, unconnected PTY pair. `master` is retained by the
/// supervisor for the task's lifetime; `slave` becomes the child's
/// controlling terminal and is closed in the parent once duplicated onto
/// the child's standard streams.
pub struct PtyPair {
    /// Master side; reads pump child output, writes deliver stdin.
    pub master: OwnedFd,
    /// Slave side; duplicated onto the child's stdin/stdout/stderr.
    pub slave: OwnedFd,
}

/// Opens a new PTY pair with default terminal settings.
pub fn open_pty() -> nix::Result<PtyPair> {
    let result = nix::pty::openpty(None, None)?;
    Ok(PtyPair {
        master: result.master,
        slave: result.slave,
    })
}

/// Duplicates `fd`, returning a new, independently-closable descriptor
/// referring to the same open file description.
pub fn dup_fd(fd: RawFd) -> std::io::Result<RawFd> {
    // SAFETY: `fd` is a valid, open descriptor for the lifetime of this call;
    // `dup` either returns a new valid descriptor or -1 with `errno` set.
    let dup = unsafe { libc::dup(fd) };
    if dup < 0 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(dup)
}

fn read_chunk(fd: RawFd, buf: &mut [u8]) -> std::io::Result<usize> {
    loop {
        // SAFETY: `buf` is valid for `buf.len()` bytes and outlives the call.
        let n = unsafe { libc::read(fd, buf.as_mut_ptr().cast(), buf.len()) };
        if n >= 0 {
            return Ok(n as usize);
        }
        let err = std::io::Error::last_os_error();
        if err.kind() == std::io::ErrorKind::Interrupted {
            continue;
        }
        return Err(err);
    }
}

/// Splits `buf` on `\n`, returning complete lines (CR stripped) and leaving
/// any trailing partial line in `buf`.
fn drain_lines(buf: &mut Vec<u8>) -> Vec<String> {
    let mut lines = Vec::new();
    while let Some(pos) = buf.iter().position(|&b| b == b'\n') {
        let mut line_bytes: Vec<u8> = buf.drain(..=pos).collect();
        line_bytes.pop(); // drop the '\n'
        if line_bytes.last() == Some(&b'\r') {
            line_bytes.pop();
        }
        lines.push(String::from_utf8_lossy(&line_bytes).into_owned());
    }
    lines
}

/// Spawns the pump thread for `task_name`, reading from `master_fd` until
/// EOF or a read error, emitting one `[<task_name>] │ <line>` record per
/// line to `log_tx`. Any buffered partial line still present at EOF is
/// flushed as a final record.
///
/// The pump never blocks other tasks: it owns no lock any other supervisor
/// needs, and its only suspension points are the PTY read and the bounded
/// log queue send.
pub fn spawn_pump(master_fd: RawFd, task_name: String, log_tx: SyncSender<String>) -> JoinHandle<()> {
    thread::spawn(move || {
        let fd = master_fd;
        let mut pending = Vec::new();
        let mut buf = [0u8; PTY_READ_CHUNK];

        loop {
            match read_chunk(fd, &mut buf) {
                Ok(0) => break,
                Ok(n) => {
                    pending.extend_from_slice(&buf[..n]);
                    for line in drain_lines(&mut pending) {
                        let record =
                            format!("[{task_name}] {LOG_LINE_SEPARATOR} {line}");
                        if log_tx.send(record).is_err() {
                            return;
                        }
                    }
                }
                Err(_) => break,
            }
        }

        if !pending.is_empty() {
            let line = String::from_utf8_lossy(&pending).into_owned();
            let record = format!("[{task_name}] {LOG_LINE_SEPARATOR} {line}");
            let _ = log_tx.send(record);
        }

        // The master fd itself is owned by the task's runtime record, not
        // by this thread: `shutdown::close_pty` closes it exactly once,
        // whether that happens before this loop observes EOF/an error (in
        // which case it is what caused the loop to end) or after.
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drain_lines_keeps_partial_trailing_content_buffered() {
        let mut buf = b"first\nsecond\npart".to_vec();
        let lines = drain_lines(&mut buf);
        assert_eq!(lines, vec!["first".to_string(), "second".to_string()]);
        assert_eq!(buf, b"part");
    }

    #[test]
    fn drain_lines_strips_carriage_return() {
        let mut buf = b"crlf line\r\n".to_vec();
        let lines = drain_lines(&mut buf);
        assert_eq!(lines, vec!["crlf line".to_string()]);
        assert!(buf.is_empty());
    }

    #[test]
    fn open_pty_returns_distinct_master_and_slave() {
        let pair = open_pty().expect("openpty should succeed in test environment");
        use std::os::fd::AsRawFd;
        assert_ne!(pair.master.as_raw_fd(), pair.slave.as_raw_fd());
    }
}
