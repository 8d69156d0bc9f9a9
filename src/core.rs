//! Pure acceptor state machine — no I/O, no synchronization.
//!
//! [`AcceptorCore`] implements the single-decree decision logic on its own;
//! durability is layered on top by [`crate::FileAcceptor`].

use bytes::Bytes;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::messages::{AcceptMessage, PromiseMessage};

/// One proposal: a globally unique number paired with an opaque value.
///
/// Proposal numbers are strictly positive when meaningful; `0` is the
/// "none" sentinel in accessor return values only and is never treated
/// specially by the state machine.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Proposal {
    pub pn: u64,
    pub value: Bytes,
}

impl Proposal {
    #[must_use]
    pub fn new(pn: u64, value: Bytes) -> Self {
        Self { pn, value }
    }
}

/// Pure decision functions for the two request phases.
///
/// - **Promise (phase 1)**: succeeds if `pn >= promised`. Equal numbers are
///   idempotently re-promised so retransmissions are safe.
/// - **Accept (phase 2)**: succeeds if `pn >= promised` and `pn` is not below
///   the currently accepted proposal number. Equal numbers are re-accepted
///   with the most recent value winning, which keeps crash-retry of the same
///   proposal idempotent.
pub mod decision {
    /// A prepare outranks the current promise if its number is at least as high.
    #[must_use]
    pub fn should_promise(pn: u64, promised: u64) -> bool {
        pn >= promised
    }

    /// A proposal may be accepted without a preceding prepare at this
    /// acceptor, as long as its number is below neither the current promise
    /// nor the accepted proposal it would replace.
    #[must_use]
    pub fn should_accept(pn: u64, promised: u64, accepted_pn: Option<u64>) -> bool {
        pn >= promised && accepted_pn.is_none_or(|a| pn >= a)
    }
}

/// In-memory acceptor state: the highest promised proposal number and the
/// most recently accepted proposal.
///
/// `accepted.pn > promised` is a legal state (a minority acceptor that
/// accepted without having promised first, e.g. after a restart); every
/// operation tolerates it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AcceptorCore {
    promised: u64,
    accepted: Option<Proposal>,
}

impl AcceptorCore {
    /// A fresh acceptor with zero state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild an acceptor from durably stored state.
    pub(crate) fn restore(promised: u64, accepted: Option<Proposal>) -> Self {
        Self { promised, accepted }
    }

    /// Highest promised proposal number, `0` if none.
    #[must_use]
    pub fn promised_pn(&self) -> u64 {
        self.promised
    }

    /// Most recently accepted proposal number, `0` if none.
    #[must_use]
    pub fn accepted_pn(&self) -> u64 {
        self.accepted.as_ref().map_or(0, |p| p.pn)
    }

    /// The most recently accepted proposal, if any.
    #[must_use]
    pub fn accepted(&self) -> Option<&Proposal> {
        self.accepted.as_ref()
    }

    /// Handle a PREPARE request.
    ///
    /// On success the promise is raised to `pn` and the reply reports the
    /// previously accepted proposal, if any. On rejection the reply carries
    /// the current promise so the proposer can out-bid it; state is unchanged.
    pub fn on_prepare(&mut self, pn: u64) -> PromiseMessage {
        if decision::should_promise(pn, self.promised) {
            self.promised = pn;
            PromiseMessage::granted(pn, self.accepted.as_ref())
        } else {
            PromiseMessage::rejected(pn, self.promised)
        }
    }

    /// Handle a PROPOSE request.
    ///
    /// On success `(pn, value)` becomes the accepted proposal. The promise is
    /// NOT advanced: a proposer that proposes without having just prepared at
    /// this acceptor may legitimately land here. A proposal below either the
    /// promise or the accepted number is rejected, so the accepted number
    /// never decreases.
    pub fn on_propose(&mut self, pn: u64, value: Bytes) -> AcceptMessage {
        let accepted_pn = self.accepted.as_ref().map(|p| p.pn);
        let ok = decision::should_accept(pn, self.promised, accepted_pn);
        if ok {
            self.accepted = Some(Proposal::new(pn, value));
        }
        AcceptMessage::new(pn, ok)
    }
}
