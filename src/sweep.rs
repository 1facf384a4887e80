//! Orphan reclamation: remove channel directories whose owning process is
//! gone but whose directory, fifo, and any undelivered payload files were
//! left behind.

use std::fs;

use crate::channel::Channel;

/// Removes every channel directory reported by [`Channel::inactive_paths`].
/// Returns the number of directories reclaimed; per-directory failures are
/// logged and otherwise ignored, mirroring [`crate::publish::publish`]'s
/// best-effort fan-out.
pub fn sweep_orphans() -> usize {
    let mut reclaimed = 0usize;
    for path in Channel::inactive_paths() {
        if let Ok(entries) = fs::read_dir(&path) {
            for entry in entries.flatten() {
                let _ = fs::remove_file(entry.path());
            }
        }
        match fs::remove_dir(&path) {
            Ok(()) => reclaimed += 1,
            Err(e) => log::warn!("failed to reclaim orphan channel {}: {e}", path.display()),
        }
    }
    reclaimed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::Channel;

    #[test]
    fn reclaims_a_channel_left_by_an_exited_process() {
        let mut child = std::process::Command::new("sleep")
            .arg("30")
            .spawn()
            .expect("failed to spawn helper process");
        let pid = child.id();

        // Build a channel directory that looks owned by `pid`, matching the
        // on-disk naming convention directly rather than going through a
        // live Channel::open (which always uses this process's own pid).
        let base = crate::base_dir::base_dir();
        let dir_name = format!("test.sweep.orphan_abcdefghijkl_{pid}");
        let dir_path = base.join(&dir_name);
        fs::create_dir_all(&dir_path).unwrap();
        fs::write(dir_path.join("queue"), b"").unwrap();

        child.kill().unwrap();
        child.wait().unwrap();

        // Wait for the kernel to actually reap the pid's liveness signal.
        std::thread::sleep(std::time::Duration::from_millis(50));

        let before = Channel::inactive_paths();
        assert!(before.contains(&dir_path), "orphaned directory should be detected");

        let reclaimed = sweep_orphans();
        assert!(reclaimed >= 1);
        assert!(!dir_path.exists());
    }
}
