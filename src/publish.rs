//! The publisher operation: stage once, fan out by hardlink + pipe write.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::os::unix::io::RawFd;
use std::path::Path;

use crate::base_dir::tmp_dir;
use crate::channel::{validate_publisher_topic, Channel};
use crate::error::Result;
use crate::message::Message;

/// Publishes `content` to `topic`, returning the number of channels the
/// message was actually delivered to. Per-channel I/O failures (no reader,
/// full pipe, missing queue file) are logged and skipped rather than
/// aborting the call — delivery is best-effort by design.
pub fn publish(topic: &str, content: &[u8], headers: Option<BTreeMap<String, String>>) -> Result<usize> {
    validate_publisher_topic(topic)?;

    let message = Message::new(topic, content.to_vec(), headers.unwrap_or_default());

    let tmp_dir = tmp_dir()?;
    let scratch_path = tmp_dir.join(message.id.to_string());
    {
        let mut scratch_file = File::create(&scratch_path)?;
        message.write(&mut scratch_file)?;
    }

    let mut delivered = 0usize;
    for channel_dir in Channel::matching_active_paths(topic) {
        match deliver_to(&channel_dir, &scratch_path, message.id) {
            Ok(()) => delivered += 1,
            Err(e) => log::warn!(
                "failed to publish message {} to channel {}: {e}",
                message.id,
                channel_dir.display()
            ),
        }
    }

    fs::remove_file(&scratch_path)?;
    Ok(delivered)
}

fn deliver_to(channel_dir: &Path, scratch_path: &Path, message_id: u64) -> std::io::Result<()> {
    let queue_path = channel_dir.join("queue");
    if !queue_path.exists() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "channel directory has no queue file",
        ));
    }

    let payload_path = channel_dir.join(message_id.to_string());
    fs::hard_link(scratch_path, &payload_path)?;

    write_id_to_queue(&queue_path, message_id)
}

fn write_id_to_queue(queue_path: &Path, message_id: u64) -> std::io::Result<()> {
    let fd = open_nonblocking_write(queue_path)?;
    let res = write_all_fd(fd, &message_id.to_be_bytes());
    unsafe {
        libc::close(fd);
    }
    res
}

fn open_nonblocking_write(path: &Path) -> std::io::Result<RawFd> {
    use std::ffi::CString;
    use std::os::unix::ffi::OsStrExt;

    let c_path = CString::new(path.as_os_str().as_bytes())
        .map_err(|_| std::io::Error::new(std::io::ErrorKind::InvalidInput, "path contains NUL"))?;
    let fd = unsafe { libc::open(c_path.as_ptr(), libc::O_WRONLY | libc::O_NONBLOCK) };
    if fd < 0 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(fd)
}

fn write_all_fd(fd: RawFd, buf: &[u8]) -> std::io::Result<()> {
    let written = unsafe { libc::write(fd, buf.as_ptr() as *const libc::c_void, buf.len()) };
    if written < 0 {
        return Err(std::io::Error::last_os_error());
    }
    if written as usize != buf.len() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::WriteZero,
            "short write on queue pipe",
        ));
    }
    Ok(())
}
