//! Request dispatcher — decodes a frame, drives the durable acceptor,
//! encodes the reply.

use bytes::Bytes;
use tracing::debug;

use crate::acceptor::FileAcceptor;
use crate::error::AcceptorError;
use crate::messages::{Phase, PrepareMessage, ProposeMessage};

/// Dispatches proposer request frames to a [`FileAcceptor`] and encodes its
/// replies.
///
/// The responder holds no state of its own; the transport hands it whole
/// frames and sends back whatever it returns. Callers serialize invocations,
/// as with the acceptor itself.
pub struct Responder {
    acceptor: FileAcceptor,
}

impl Responder {
    #[must_use]
    pub fn new(acceptor: FileAcceptor) -> Self {
        Self { acceptor }
    }

    #[must_use]
    pub fn acceptor(&self) -> &FileAcceptor {
        &self.acceptor
    }

    #[must_use]
    pub fn acceptor_mut(&mut self) -> &mut FileAcceptor {
        &mut self.acceptor
    }

    #[must_use]
    pub fn into_inner(self) -> FileAcceptor {
        self.acceptor
    }

    /// Build a reply frame for a request frame.
    ///
    /// PREPARE yields an encoded PROMISE, PROPOSE an encoded ACCEPT. A
    /// protocol rejection (`ok=false`) is a normal reply, not an error.
    ///
    /// # Errors
    ///
    /// [`AcceptorError::UnsupportedPhase`] for frames that are not proposer
    /// requests (including PROMISE/ACCEPT received in error),
    /// [`AcceptorError::CorruptMessage`] for undecodable frames, and any
    /// persistence error from the acceptor, surfaced unchanged. No reply is
    /// produced in these cases.
    pub fn respond(&mut self, request: &[u8]) -> Result<Bytes, AcceptorError> {
        match Phase::of_frame(request)? {
            Phase::Prepare => {
                let prepare = PrepareMessage::decode(request)?;
                debug!(pn = prepare.pn, "dispatching prepare");
                let promise = self.acceptor.on_prepare(prepare.pn)?;
                Ok(promise.encode())
            }
            Phase::Propose => {
                let propose = ProposeMessage::decode(request)?;
                debug!(pn = propose.pn, value_len = propose.value.len(), "dispatching propose");
                let accept = self.acceptor.on_propose(propose.pn, propose.value)?;
                Ok(accept.encode())
            }
            phase @ (Phase::Promise | Phase::Accept) => {
                debug!(?phase, "rejecting non-request phase");
                Err(AcceptorError::UnsupportedPhase(phase.tag()))
            }
        }
    }
}
