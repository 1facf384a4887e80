//! Process liveness probing.

/// Returns `true` iff a process with the given PID currently exists on the
/// host, regardless of ownership. Never sends an observable signal and never
/// fails for permission reasons: a PID owned by another user still reports
/// `true` if it exists.
pub fn is_alive(pid: i32) -> bool {
    if pid <= 0 {
        return false;
    }
    let res = unsafe { libc::kill(pid, 0) };
    if res == 0 {
        return true;
    }
    matches!(
        std::io::Error::last_os_error().raw_os_error(),
        Some(libc::EPERM)
    )
}
