//! Channels: subscriber-owned rendezvous directories with a named pipe.

use std::collections::HashSet;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::os::unix::io::RawFd;
use std::path::{Path, PathBuf};

use rand::distributions::Alphanumeric;
use rand::Rng;

use crate::base_dir::base_dir;
use crate::error::{Error, Result};
use crate::liveness::is_alive;

const RANDOM_ID_LEN: usize = 12;
const QUEUE_FILE_NAME: &str = "queue";
const QUEUE_MODE: u32 = 0o660;

/// A subscriber's rendezvous: a directory named `{topic}_{random_id}_{pid}`
/// holding a named pipe (`queue`) and zero or more pending payload files.
pub struct Channel {
    pub topic: String,
    pub owner_pid: u32,
    pub random_id: String,
    pub directory_path: PathBuf,
    pub pipe_path: PathBuf,
    read_fd: Option<RawFd>,
}

impl Channel {
    /// Opens a new channel for `topic`, minting a random id and creating the
    /// directory and named pipe. `topic` may contain wildcards (`=`, `+`).
    pub fn open(topic: &str) -> Result<Self> {
        validate_subscriber_topic(topic)?;

        let owner_pid = std::process::id();
        let random_id = generate_random_id();
        let directory_name = format!("{topic}_{random_id}_{owner_pid}");
        let directory_path = base_dir().join(&directory_name);
        let pipe_path = directory_path.join(QUEUE_FILE_NAME);

        fs::create_dir_all(&directory_path)
            .map_err(|e| Error::ChannelError(format!("failed to create channel directory: {e}")))?;

        if !pipe_path.exists() {
            create_fifo(&pipe_path, QUEUE_MODE)
                .map_err(|e| Error::ChannelError(format!("failed to create queue fifo: {e}")))?;
        }

        Ok(Self {
            topic: topic.to_string(),
            owner_pid,
            random_id,
            directory_path,
            pipe_path,
            read_fd: None,
        })
    }

    /// Opens the named pipe for non-blocking reads. Idempotent.
    pub fn open_for_reading(&mut self) -> Result<()> {
        if self.read_fd.is_some() {
            return Ok(());
        }
        let fd = open_nonblocking_read(&self.pipe_path)
            .map_err(|e| Error::ChannelError(format!("failed to open queue for reading: {e}")))?;
        self.read_fd = Some(fd);
        Ok(())
    }

    pub fn read_fd(&self) -> Result<RawFd> {
        self.read_fd.ok_or(Error::ChannelNotOpen)
    }

    pub fn is_open(&self) -> bool {
        self.read_fd.is_some()
    }

    /// Closes the read handle (if any), removes every entry in the channel
    /// directory, then removes the directory itself. Best-effort for
    /// individual entries; the final directory removal failure is reported.
    pub fn close(&mut self) -> Result<()> {
        if let Some(fd) = self.read_fd.take() {
            unsafe {
                libc::close(fd);
            }
        }

        if let Ok(entries) = fs::read_dir(&self.directory_path) {
            for entry in entries.flatten() {
                let _ = fs::remove_file(entry.path());
            }
        }

        fs::remove_dir(&self.directory_path)
            .map_err(|e| Error::ChannelError(format!("failed to remove channel directory: {e}")))
    }

    /// Paths of channel directories whose owner process is still alive.
    pub fn active_paths() -> Vec<PathBuf> {
        scan_channel_dirs()
            .into_iter()
            .filter(|(_, pid)| is_alive(*pid))
            .map(|(path, _)| path)
            .collect()
    }

    /// Paths of channel directories whose owner process is no longer alive.
    pub fn inactive_paths() -> Vec<PathBuf> {
        scan_channel_dirs()
            .into_iter()
            .filter(|(_, pid)| !is_alive(*pid))
            .map(|(path, _)| path)
            .collect()
    }

    /// Of the active channel directories, those whose topic component
    /// matches `publish_topic` under the wildcard rules of the subscriber
    /// topic alphabet. `publish_topic` itself carries no wildcards.
    pub fn matching_active_paths(publish_topic: &str) -> Vec<PathBuf> {
        Self::active_paths()
            .into_iter()
            .filter(|path| {
                directory_topic(path)
                    .map(|topic| topic_matches(&topic, publish_topic))
                    .unwrap_or(false)
            })
            .collect()
    }
}

impl Drop for Channel {
    fn drop(&mut self) {
        if let Some(fd) = self.read_fd.take() {
            unsafe {
                libc::close(fd);
            }
        }
    }
}

/// Validates a subscriber (channel) topic: non-empty, `[A-Za-z0-9.+=-]+`.
pub fn validate_subscriber_topic(topic: &str) -> Result<()> {
    if topic.is_empty() {
        return Err(Error::BadTopic("topic cannot be empty".to_string()));
    }
    if !topic
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'+' | b'=' | b'-'))
    {
        return Err(Error::BadTopic(format!(
            "topic '{topic}' contains characters outside [A-Za-z0-9.+=-]"
        )));
    }
    Ok(())
}

/// Validates a publisher topic: non-empty, `[A-Za-z0-9.-]+` (no wildcards).
pub fn validate_publisher_topic(topic: &str) -> Result<()> {
    if topic.is_empty() {
        return Err(Error::BadTopic("topic cannot be empty".to_string()));
    }
    if !topic
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'-'))
    {
        return Err(Error::BadTopic(format!(
            "topic '{topic}' contains characters outside [A-Za-z0-9.-]"
        )));
    }
    Ok(())
}

/// Matches a publish-time topic against a subscriber pattern that may carry
/// `=` (single allowed character) and `+` (zero or more of `[A-Za-z0-9.-]`)
/// wildcards. Matching is anchored over the full string.
pub fn topic_matches(pattern: &str, topic: &str) -> bool {
    fn is_allowed_char(b: u8) -> bool {
        b.is_ascii_alphanumeric() || b == b'.' || b == b'-'
    }

    // Dynamic-programming match over bytes: dp[i][j] = pattern[..i] matches topic[..j].
    let pattern = pattern.as_bytes();
    let topic = topic.as_bytes();
    let mut dp = vec![vec![false; topic.len() + 1]; pattern.len() + 1];
    dp[0][0] = true;
    for i in 1..=pattern.len() {
        if pattern[i - 1] == b'+' {
            dp[i][0] = dp[i - 1][0];
        }
    }
    for i in 1..=pattern.len() {
        for j in 1..=topic.len() {
            dp[i][j] = match pattern[i - 1] {
                b'+' => dp[i - 1][j] || (dp[i][j - 1] && is_allowed_char(topic[j - 1])),
                b'=' => dp[i - 1][j - 1] && is_allowed_char(topic[j - 1]),
                literal => dp[i - 1][j - 1] && literal == topic[j - 1],
            };
        }
    }
    dp[pattern.len()][topic.len()]
}

fn generate_random_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(RANDOM_ID_LEN)
        .map(char::from)
        .collect()
}

/// Splits `{topic}_{random_id}_{pid}` into `(topic, pid)`, or `None` if the
/// name doesn't carry at least the two reserved trailing components.
fn split_directory_name(name: &str) -> Option<(String, u32)> {
    let mut parts: Vec<&str> = name.split('_').collect();
    if parts.len() < 3 {
        return None;
    }
    let pid_str = parts.pop()?;
    let _random_id = parts.pop()?;
    let pid: u32 = pid_str.parse().ok()?;
    Some((parts.join("_"), pid))
}

fn directory_topic(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_str()?;
    split_directory_name(name).map(|(topic, _)| topic)
}

fn scan_channel_dirs() -> Vec<(PathBuf, i32)> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    let Ok(entries) = fs::read_dir(base_dir()) else {
        return out;
    };
    for entry in entries.flatten() {
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        if !file_type.is_dir() {
            continue;
        }
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        let Some((_, pid)) = split_directory_name(name) else {
            continue;
        };
        let path = entry.path();
        if seen.insert(path.clone()) {
            out.push((path, pid as i32));
        }
    }
    out
}

fn create_fifo(path: &Path, mode: u32) -> std::io::Result<()> {
    let c_path = path_to_cstring(path)?;
    let res = unsafe { libc::mkfifo(c_path.as_ptr(), mode) };
    if res != 0 {
        return Err(std::io::Error::last_os_error());
    }
    fs::set_permissions(path, fs::Permissions::from_mode(mode))?;
    Ok(())
}

fn open_nonblocking_read(path: &Path) -> std::io::Result<RawFd> {
    let c_path = path_to_cstring(path)?;
    let fd = unsafe { libc::open(c_path.as_ptr(), libc::O_RDONLY | libc::O_NONBLOCK) };
    if fd < 0 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(fd)
}

fn path_to_cstring(path: &Path) -> std::io::Result<std::ffi::CString> {
    use std::os::unix::ffi::OsStrExt;
    std::ffi::CString::new(path.as_os_str().as_bytes())
        .map_err(|_| std::io::Error::new(std::io::ErrorKind::InvalidInput, "path contains NUL"))
}
