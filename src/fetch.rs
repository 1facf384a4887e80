//! The fetcher operation: one non-blocking pipe read plus a small file read.

use std::fs::{self, File};

use crate::channel::Channel;
use crate::error::{Error, Result};
use crate::message::Message;

/// Fetches a single message from `channel`, non-blockingly. Returns `None`
/// if no notification is pending, the notification is a short read, or the
/// payload file named by the id is already gone (races with other
/// consumers or prior cleanup are treated as "no message", not an error).
pub fn fetch(channel: &Channel) -> Result<Option<Message>> {
    let fd = channel.read_fd()?;

    let mut id_buf = [0u8; 8];
    let n = unsafe {
        libc::read(
            fd,
            id_buf.as_mut_ptr() as *mut libc::c_void,
            id_buf.len(),
        )
    };
    if n < 0 {
        let err = std::io::Error::last_os_error();
        if err.kind() == std::io::ErrorKind::WouldBlock {
            return Ok(None);
        }
        return Err(Error::Io(err));
    }
    if n as usize != id_buf.len() {
        return Ok(None);
    }

    let id = u64::from_be_bytes(id_buf);
    let payload_path = channel.directory_path.join(id.to_string());
    if !payload_path.exists() {
        return Ok(None);
    }

    let mut file = File::open(&payload_path)?;
    let message = Message::read(&mut file)?;
    fs::remove_file(&payload_path)?;

    Ok(Some(message))
}
