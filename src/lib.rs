//! Local inter-process publish/subscribe bus over named pipes and
//! hardlinked payload files.
//!
//! A publisher stages a message once under a shared temp directory, then
//! hardlinks it into every matching subscriber's channel directory and
//! wakes that subscriber with an 8-byte message id over its named pipe.
//! Subscribers own their channel directories and reclaim orphans left by
//! processes that exited without calling [`Channel::close`].

pub mod base_dir;
pub mod channel;
pub mod error;
pub mod fetch;
pub mod liveness;
pub mod message;
pub mod publish;
pub mod signal;
pub mod subscribe;
pub mod sweep;

pub use channel::Channel;
pub use error::{DecodeError, Error, Result};
pub use fetch::fetch;
pub use message::Message;
pub use publish::publish;
pub use subscribe::{subscribe, SubscribeOutcome};
pub use sweep::sweep_orphans;
