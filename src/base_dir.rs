//! Resolution of the process-wide root directory for bus artifacts.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

const ENV_BASE_DIR: &str = "PUBSUB_BASE_DIR";

static BASE_DIR: OnceLock<PathBuf> = OnceLock::new();

/// Returns the root directory under which all channel directories and the
/// `tmp/` scratch area live.
///
/// Resolution order: `PUBSUB_BASE_DIR` env var, then `/dev/shm/pubsub` on
/// Unix if `/dev/shm` exists, then the system temp dir joined with `pubsub`.
/// The result is cached for the life of the process.
pub fn base_dir() -> &'static Path {
    BASE_DIR.get_or_init(resolve_base_dir)
}

fn resolve_base_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(ENV_BASE_DIR) {
        if !dir.is_empty() {
            return PathBuf::from(dir);
        }
    }

    let shm = Path::new("/dev/shm");
    if shm.is_dir() {
        return shm.join("pubsub");
    }

    std::env::temp_dir().join("pubsub")
}

/// The `tmp/` scratch directory used by publishers, created if missing.
pub fn tmp_dir() -> std::io::Result<PathBuf> {
    let dir = base_dir().join("tmp");
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
