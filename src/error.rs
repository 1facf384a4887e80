use std::fmt;

/// Reasons the message codec rejected a frame.
#[derive(Debug)]
pub enum DecodeError {
    BadMagic,
    BadVersion(u8),
    TruncatedFrame,
    BadUtf8,
    BadHeaders,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::BadMagic => write!(f, "bad magic number"),
            DecodeError::BadVersion(version) => write!(f, "unsupported frame version: {version}"),
            DecodeError::TruncatedFrame => write!(f, "frame truncated"),
            DecodeError::BadUtf8 => write!(f, "invalid utf-8 in frame"),
            DecodeError::BadHeaders => write!(f, "invalid headers json"),
        }
    }
}

impl std::error::Error for DecodeError {}

#[derive(Debug)]
pub enum Error {
    Io(std::io::Error),
    BadTopic(String),
    ChannelError(String),
    ChannelNotOpen,
    BadTimeout,
    Decode(DecodeError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(err) => write!(f, "io error: {err}"),
            Error::BadTopic(msg) => write!(f, "bad topic: {msg}"),
            Error::ChannelError(msg) => write!(f, "channel error: {msg}"),
            Error::ChannelNotOpen => write!(f, "channel not open for reading"),
            Error::BadTimeout => write!(f, "timeout_seconds must be non-negative"),
            Error::Decode(err) => write!(f, "decode error: {err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            Error::Decode(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Error::Io(value)
    }
}

impl From<DecodeError> for Error {
    fn from(value: DecodeError) -> Self {
        Error::Decode(value)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
