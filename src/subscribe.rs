//! The subscriber loop: poll [`fetch`], dispatch to a callback, stop on a
//! deadline or a shutdown signal.

use std::panic::{self, AssertUnwindSafe};
use std::time::{Duration, Instant};

use crate::channel::Channel;
use crate::error::{Error, Result};
use crate::fetch::fetch;
use crate::message::Message;
use crate::signal::SignalGuard;

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// How [`subscribe`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscribeOutcome {
    /// The deadline elapsed (or there was none and the loop was asked to
    /// stop some other way); carries the number of messages processed.
    Processed(usize),
    /// `SIGTERM` or `SIGINT` arrived; the prior handler has already been
    /// restored and, since it existed, re-invoked.
    Signaled,
}

/// Loops calling `callback` for every message received on `channel` until
/// `timeout_seconds` elapses (`0.0` means no deadline) or the process
/// receives `SIGTERM`/`SIGINT`. A negative timeout is rejected outright.
/// `channel` must already be open for reading (see
/// [`Channel::open_for_reading`]); this call does not take ownership of its
/// lifecycle, so the caller decides when it is finally closed.
///
/// A panicking `callback` is caught, logged, and does not stop the loop or
/// skip the handler/channel cleanup on the way out — the processed count
/// still advances, matching a callback that merely returned an error.
pub fn subscribe<F>(channel: &mut Channel, timeout_seconds: f64, mut callback: F) -> Result<SubscribeOutcome>
where
    F: FnMut(Message),
{
    if timeout_seconds < 0.0 {
        return Err(Error::BadTimeout);
    }
    if !channel.is_open() {
        return Err(Error::ChannelNotOpen);
    }
    let deadline_disabled = timeout_seconds == 0.0;

    let guard = SignalGuard::install().map_err(Error::Io)?;
    let start = Instant::now();
    let deadline = Duration::from_secs_f64(timeout_seconds);

    let mut processed = 0usize;
    let outcome = loop {
        if guard.shutdown_requested() {
            break SubscribeOutcome::Signaled;
        }
        if !deadline_disabled && start.elapsed() >= deadline {
            break SubscribeOutcome::Processed(processed);
        }

        match fetch(channel) {
            Ok(Some(message)) => {
                if panic::catch_unwind(AssertUnwindSafe(|| callback(message))).is_err() {
                    log::warn!("subscribe callback panicked; continuing");
                }
                processed += 1;
            }
            Ok(None) => {}
            Err(e) => {
                log::warn!("fetch failed on channel {}: {e}", channel.directory_path.display());
            }
        }

        std::thread::sleep(POLL_INTERVAL);
    };

    guard.restore_and_forward();

    Ok(match outcome {
        SubscribeOutcome::Signaled => SubscribeOutcome::Signaled,
        SubscribeOutcome::Processed(_) => SubscribeOutcome::Processed(processed),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_negative_timeout() {
        let mut channel = Channel::open("test.subscribe.negative").unwrap();
        channel.open_for_reading().unwrap();
        let result = subscribe(&mut channel, -1.0, |_| {});
        assert!(matches!(result, Err(Error::BadTimeout)));
        channel.close().unwrap();
    }

    #[test]
    fn rejects_a_channel_not_open_for_reading() {
        let mut channel = Channel::open("test.subscribe.notopen").unwrap();
        let result = subscribe(&mut channel, 0.1, |_| {});
        assert!(matches!(result, Err(Error::ChannelNotOpen)));
        channel.close().unwrap();
    }

    #[test]
    fn zero_messages_on_short_deadline() {
        let mut channel = Channel::open("test.subscribe.empty").unwrap();
        channel.open_for_reading().unwrap();
        let result = subscribe(&mut channel, 0.2, |_| {
            panic!("no message should ever arrive on this unused topic");
        });
        assert_eq!(result.unwrap(), SubscribeOutcome::Processed(0));
        channel.close().unwrap();
    }

    #[test]
    fn a_panicking_callback_is_caught_and_counted() {
        let mut channel = Channel::open("test.subscribe.panickingcallback").unwrap();
        channel.open_for_reading().unwrap();

        crate::publish::publish("test.subscribe.panickingcallback", b"boom", None).unwrap();

        let result = subscribe(&mut channel, 0.3, |_message| {
            panic!("callback fault must not abort the loop");
        });
        assert_eq!(result.unwrap(), SubscribeOutcome::Processed(1));
        channel.close().unwrap();
    }
}
