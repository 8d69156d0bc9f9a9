//! Error types surfaced by the acceptor, the wire codec, and the responder.

use std::fmt;
use std::io;

/// Errors that can occur while decoding requests, persisting state, or
/// recovering from the backing file.
///
/// Protocol-level rejections (`ok=false` replies) are ordinary responses and
/// never appear here.
#[derive(Debug)]
pub enum AcceptorError {
    /// Inbound frame's phase tag is not PREPARE or PROPOSE.
    UnsupportedPhase(u8),
    /// Frame fails to decode against its schema.
    CorruptMessage(&'static str),
    /// Backing file has an invalid length or cannot be decoded.
    CorruptState { len: usize },
    /// Underlying filesystem error.
    Io(io::Error),
    /// Operation requiring an open backing file invoked before `start`/`restart`.
    NotStarted,
}

impl fmt::Display for AcceptorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AcceptorError::UnsupportedPhase(tag) => {
                write!(f, "unsupported phase tag: {tag:#010b}")
            }
            AcceptorError::CorruptMessage(reason) => write!(f, "corrupt message: {reason}"),
            AcceptorError::CorruptState { len } => {
                write!(f, "corrupt acceptor state: invalid file length {len}")
            }
            AcceptorError::Io(e) => write!(f, "IO error: {e}"),
            AcceptorError::NotStarted => f.write_str("acceptor not started"),
        }
    }
}

impl std::error::Error for AcceptorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AcceptorError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for AcceptorError {
    fn from(e: io::Error) -> Self {
        AcceptorError::Io(e)
    }
}
