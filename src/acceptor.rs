//! Durable acceptor — wraps the pure state machine with write-through
//! persistence to a backing file.
//!
//! Byte layout of the backing file (little-endian):
//!
//! ```text
//! offset  size  field
//!   0     8     promised proposal number
//!   8     8     accepted proposal number   (absent iff file length == 8)
//!  16     N     accepted value bytes       (length = file size - 16)
//! ```
//!
//! A length below 8 or between 9 and 15 cannot be produced by a complete
//! write and is refused on restart.

use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::PathBuf;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tracing::{debug, trace, warn};

use crate::core::{AcceptorCore, Proposal};
use crate::error::AcceptorError;
use crate::messages::{AcceptMessage, PromiseMessage};

/// Byte length of one proposal number on disk.
const PN_LEN: usize = 8;

/// Byte offset of the accepted value; everything before it is the two
/// proposal numbers.
const VALUE_OFFSET: usize = 2 * PN_LEN;

/// Decode acceptor state from the full contents of the backing file.
fn decode_state(data: &[u8]) -> Result<AcceptorCore, AcceptorError> {
    // Only "promised alone" (8 bytes) or "both numbers plus value" (>= 16
    // bytes) can result from a complete write.
    if data.len() != PN_LEN && data.len() < VALUE_OFFSET {
        warn!(len = data.len(), "backing file has invalid length");
        return Err(AcceptorError::CorruptState { len: data.len() });
    }

    let mut buf = data;
    let promised = buf.get_u64_le();
    let accepted = if buf.is_empty() {
        None
    } else {
        let pn = buf.get_u64_le();
        Some(Proposal::new(pn, Bytes::copy_from_slice(buf)))
    };

    Ok(AcceptorCore::restore(promised, accepted))
}

/// An acceptor that persists its state to a named file.
///
/// Every successful transition is written and flushed to the file before the
/// reply is returned, so a restarted process observes exactly the state that
/// its last reply advertised. Rejections change nothing and write nothing.
///
/// The backing file is owned exclusively by one acceptor instance; pointing
/// two instances at the same file is undefined behavior. Callers serialize
/// all invocations — the acceptor is single-threaded by contract.
pub struct FileAcceptor {
    path: PathBuf,
    core: AcceptorCore,
    // Some between start()/restart() and stop().
    file: Option<File>,
}

impl FileAcceptor {
    /// An acceptor with zero state, persisting to `path`.
    ///
    /// No file is touched until [`start`](Self::start) or
    /// [`restart`](Self::restart).
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            core: AcceptorCore::new(),
            file: None,
        }
    }

    /// Open the backing file for writing, creating it if absent. Existing
    /// contents are preserved, not loaded; use [`restart`](Self::restart) to
    /// recover state. A no-op if already started.
    ///
    /// # Errors
    ///
    /// [`AcceptorError::Io`] if the file cannot be opened.
    pub fn start(&mut self) -> Result<(), AcceptorError> {
        if self.file.is_none() {
            let file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(false)
                .open(&self.path)?;
            self.file = Some(file);
            debug!(path = %self.path.display(), "acceptor started");
        }
        Ok(())
    }

    /// Close the backing file. Idempotent; persisted state is kept.
    ///
    /// # Errors
    ///
    /// [`AcceptorError::Io`] if flushing pending writes fails.
    pub fn stop(&mut self) -> Result<(), AcceptorError> {
        if let Some(file) = self.file.take() {
            file.sync_all()?;
            debug!(path = %self.path.display(), "acceptor stopped");
        }
        Ok(())
    }

    /// Recover state from the backing file, then start.
    ///
    /// # Errors
    ///
    /// [`AcceptorError::Io`] if the file cannot be read — a missing file is
    /// an error here, distinguishing "restored" from "started fresh".
    /// [`AcceptorError::CorruptState`] if the file length is invalid. In-memory
    /// state is left untouched on error.
    pub fn restart(&mut self) -> Result<(), AcceptorError> {
        let data = std::fs::read(&self.path)?;
        self.core = decode_state(&data)?;
        debug!(
            path = %self.path.display(),
            promised = self.core.promised_pn(),
            accepted = self.core.accepted_pn(),
            "acceptor state restored"
        );
        self.start()
    }

    /// Whether the backing file is open for persistence.
    #[must_use]
    pub fn is_started(&self) -> bool {
        self.file.is_some()
    }

    /// Highest promised proposal number, `0` if none.
    #[must_use]
    pub fn promised_pn(&self) -> u64 {
        self.core.promised_pn()
    }

    /// Most recently accepted proposal number, `0` if none.
    #[must_use]
    pub fn accepted_pn(&self) -> u64 {
        self.core.accepted_pn()
    }

    /// The most recently accepted proposal, if any.
    #[must_use]
    pub fn accepted(&self) -> Option<&Proposal> {
        self.core.accepted()
    }

    /// Handle a PREPARE request, persisting the raised promise before the
    /// reply is returned.
    ///
    /// # Errors
    ///
    /// [`AcceptorError::NotStarted`] before `start`/`restart`.
    /// [`AcceptorError::Io`] if persistence fails — the reply is withheld and
    /// the on-disk state is authoritative on the next restart.
    pub fn on_prepare(&mut self, pn: u64) -> Result<PromiseMessage, AcceptorError> {
        if !self.is_started() {
            return Err(AcceptorError::NotStarted);
        }
        let promise = self.core.on_prepare(pn);
        if promise.ok {
            self.save_promised()?;
            trace!(pn, "promised");
        } else {
            trace!(pn, promised = self.core.promised_pn(), "prepare rejected");
        }
        Ok(promise)
    }

    /// Handle a PROPOSE request, persisting the accepted proposal before the
    /// reply is returned.
    ///
    /// # Errors
    ///
    /// [`AcceptorError::NotStarted`] before `start`/`restart`.
    /// [`AcceptorError::Io`] if persistence fails — the reply is withheld and
    /// the on-disk state is authoritative on the next restart.
    pub fn on_propose(&mut self, pn: u64, value: Bytes) -> Result<AcceptMessage, AcceptorError> {
        if !self.is_started() {
            return Err(AcceptorError::NotStarted);
        }
        let value_len = value.len();
        let accept = self.core.on_propose(pn, value);
        if accept.ok {
            self.save_accepted()?;
            trace!(pn, value_len, "accepted");
        } else {
            trace!(pn, promised = self.core.promised_pn(), "propose rejected");
        }
        Ok(accept)
    }

    /// Write the promised proposal number at its fixed offset.
    fn save_promised(&mut self) -> Result<(), AcceptorError> {
        let file = self.file.as_mut().ok_or(AcceptorError::NotStarted)?;
        file.seek(SeekFrom::Start(0))?;
        file.write_all(&self.core.promised_pn().to_le_bytes())?;
        file.sync_all()?;
        Ok(())
    }

    /// Write the accepted proposal at its fixed offset, truncating any stale
    /// tail left by a longer previously accepted value.
    fn save_accepted(&mut self) -> Result<(), AcceptorError> {
        let file = self.file.as_mut().ok_or(AcceptorError::NotStarted)?;
        let Some(accepted) = self.core.accepted() else {
            return Ok(());
        };

        let mut buf = BytesMut::with_capacity(PN_LEN + accepted.value.len());
        buf.put_u64_le(accepted.pn);
        buf.extend_from_slice(&accepted.value);

        file.seek(SeekFrom::Start(PN_LEN as u64))?;
        file.write_all(&buf)?;
        file.set_len((VALUE_OFFSET + accepted.value.len()) as u64)?;
        file.sync_all()?;
        Ok(())
    }
}
