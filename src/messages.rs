//! Wire messages exchanged between proposers and acceptors.
//!
//! Every frame begins with a one-byte phase tag; the four tag values are
//! spaced for large Hamming distance so single-bit corruptions land outside
//! the alphabet. Integers are little-endian. Frames are delimited by the
//! transport; this module only deals in whole frames.

use bytes::{Buf, BufMut, Bytes, BytesMut};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::core::Proposal;
use crate::error::AcceptorError;

/// Phase tag drawn from a fixed 8-bit alphabet.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(u8)]
pub enum Phase {
    Prepare = 0b0000_0000,
    Propose = 0b0001_1001,
    Promise = 0b0011_0011,
    Accept = 0b0111_1000,
}

impl Phase {
    /// The on-the-wire tag byte.
    #[must_use]
    pub fn tag(self) -> u8 {
        self as u8
    }

    /// Map a tag byte back to its phase, if it is in the alphabet.
    #[must_use]
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0b0000_0000 => Some(Phase::Prepare),
            0b0001_1001 => Some(Phase::Propose),
            0b0011_0011 => Some(Phase::Promise),
            0b0111_1000 => Some(Phase::Accept),
            _ => None,
        }
    }

    /// Inspect the phase of a raw frame without decoding it.
    ///
    /// # Errors
    ///
    /// [`AcceptorError::CorruptMessage`] on an empty frame,
    /// [`AcceptorError::UnsupportedPhase`] if the leading byte is outside the
    /// alphabet.
    pub fn of_frame(frame: &[u8]) -> Result<Self, AcceptorError> {
        let tag = *frame
            .first()
            .ok_or(AcceptorError::CorruptMessage("empty frame"))?;
        Phase::from_tag(tag).ok_or(AcceptorError::UnsupportedPhase(tag))
    }
}

/// Check the leading tag byte and return the remainder of the frame.
fn strip_tag(frame: &[u8], phase: Phase) -> Result<&[u8], AcceptorError> {
    match frame.split_first() {
        Some((tag, rest)) if *tag == phase.tag() => Ok(rest),
        Some(_) => Err(AcceptorError::CorruptMessage("phase tag mismatch")),
        None => Err(AcceptorError::CorruptMessage("empty frame")),
    }
}

fn decode_ok(byte: u8) -> Result<bool, AcceptorError> {
    match byte {
        0 => Ok(false),
        1 => Ok(true),
        _ => Err(AcceptorError::CorruptMessage("ok byte out of range")),
    }
}

/// PREPARE: a proposer asks acceptors to promise not to accept proposals
/// numbered below `pn`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PrepareMessage {
    pub pn: u64,
}

impl PrepareMessage {
    #[must_use]
    pub fn new(pn: u64) -> Self {
        Self { pn }
    }

    #[must_use]
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(9);
        buf.put_u8(Phase::Prepare.tag());
        buf.put_u64_le(self.pn);
        buf.freeze()
    }

    /// # Errors
    ///
    /// [`AcceptorError::CorruptMessage`] if the frame is not exactly a tag
    /// byte followed by a proposal number.
    pub fn decode(frame: &[u8]) -> Result<Self, AcceptorError> {
        let mut buf = strip_tag(frame, Phase::Prepare)?;
        if buf.remaining() != 8 {
            return Err(AcceptorError::CorruptMessage("prepare frame length"));
        }
        Ok(Self {
            pn: buf.get_u64_le(),
        })
    }
}

/// PROPOSE: a proposer asks acceptors to accept `(pn, value)`.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ProposeMessage {
    pub pn: u64,
    pub value: Bytes,
}

impl ProposeMessage {
    #[must_use]
    pub fn new(pn: u64, value: Bytes) -> Self {
        Self { pn, value }
    }

    #[must_use]
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(9 + self.value.len());
        buf.put_u8(Phase::Propose.tag());
        buf.put_u64_le(self.pn);
        buf.extend_from_slice(&self.value);
        buf.freeze()
    }

    /// The value is the remainder of the frame and may be empty.
    ///
    /// # Errors
    ///
    /// [`AcceptorError::CorruptMessage`] if the proposal number is truncated.
    pub fn decode(frame: &[u8]) -> Result<Self, AcceptorError> {
        let mut buf = strip_tag(frame, Phase::Propose)?;
        if buf.remaining() < 8 {
            return Err(AcceptorError::CorruptMessage("propose frame truncated"));
        }
        let pn = buf.get_u64_le();
        Ok(Self {
            pn,
            value: Bytes::copy_from_slice(buf),
        })
    }
}

/// PROMISE: the acceptor's reply to PREPARE.
///
/// `re_pn` echoes the proposal number that triggered the reply. When
/// `ok=true` and an earlier proposal had been accepted, `prev_pn`/`prev_value`
/// report it. When `ok=false`, `prev_pn` carries the acceptor's current
/// promise (so the proposer can out-bid it) and `prev_value` is absent.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PromiseMessage {
    pub re_pn: u64,
    pub ok: bool,
    pub prev_pn: Option<u64>,
    pub prev_value: Option<Bytes>,
}

const FLAG_OK: u8 = 0b001;
const FLAG_PREV_PN: u8 = 0b010;
const FLAG_PREV_VALUE: u8 = 0b100;

impl PromiseMessage {
    /// Reply to a successful PREPARE, reporting the previously accepted
    /// proposal if there is one.
    #[must_use]
    pub fn granted(re_pn: u64, prev: Option<&Proposal>) -> Self {
        Self {
            re_pn,
            ok: true,
            prev_pn: prev.map(|p| p.pn),
            prev_value: prev.map(|p| p.value.clone()),
        }
    }

    /// Reply to an outranked PREPARE, reporting the current promise.
    #[must_use]
    pub fn rejected(re_pn: u64, promised: u64) -> Self {
        Self {
            re_pn,
            ok: false,
            prev_pn: Some(promised),
            prev_value: None,
        }
    }

    #[must_use]
    pub fn encode(&self) -> Bytes {
        let value_len = self.prev_value.as_ref().map_or(0, Bytes::len);
        let mut buf = BytesMut::with_capacity(18 + value_len);
        buf.put_u8(Phase::Promise.tag());
        buf.put_u64_le(self.re_pn);

        let mut flags = 0u8;
        if self.ok {
            flags |= FLAG_OK;
        }
        if self.prev_pn.is_some() {
            flags |= FLAG_PREV_PN;
        }
        if self.prev_value.is_some() {
            flags |= FLAG_PREV_VALUE;
        }
        buf.put_u8(flags);

        if let Some(pn) = self.prev_pn {
            buf.put_u64_le(pn);
        }
        if let Some(value) = &self.prev_value {
            buf.extend_from_slice(value);
        }
        buf.freeze()
    }

    /// # Errors
    ///
    /// [`AcceptorError::CorruptMessage`] on truncation, undefined flag bits,
    /// a value without its proposal number, or trailing bytes.
    pub fn decode(frame: &[u8]) -> Result<Self, AcceptorError> {
        let mut buf = strip_tag(frame, Phase::Promise)?;
        if buf.remaining() < 9 {
            return Err(AcceptorError::CorruptMessage("promise frame truncated"));
        }
        let re_pn = buf.get_u64_le();
        let flags = buf.get_u8();
        if flags & !(FLAG_OK | FLAG_PREV_PN | FLAG_PREV_VALUE) != 0 {
            return Err(AcceptorError::CorruptMessage("promise flags out of range"));
        }
        if flags & FLAG_PREV_VALUE != 0 && flags & FLAG_PREV_PN == 0 {
            return Err(AcceptorError::CorruptMessage(
                "promise value without proposal number",
            ));
        }

        let prev_pn = if flags & FLAG_PREV_PN == 0 {
            None
        } else {
            if buf.remaining() < 8 {
                return Err(AcceptorError::CorruptMessage("promise frame truncated"));
            }
            Some(buf.get_u64_le())
        };
        let prev_value = if flags & FLAG_PREV_VALUE == 0 {
            if !buf.is_empty() {
                return Err(AcceptorError::CorruptMessage("promise frame length"));
            }
            None
        } else {
            Some(Bytes::copy_from_slice(buf))
        };

        Ok(Self {
            re_pn,
            ok: flags & FLAG_OK != 0,
            prev_pn,
            prev_value,
        })
    }
}

/// ACCEPT: the acceptor's reply to PROPOSE.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AcceptMessage {
    pub re_pn: u64,
    pub ok: bool,
}

impl AcceptMessage {
    #[must_use]
    pub fn new(re_pn: u64, ok: bool) -> Self {
        Self { re_pn, ok }
    }

    #[must_use]
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(10);
        buf.put_u8(Phase::Accept.tag());
        buf.put_u64_le(self.re_pn);
        buf.put_u8(u8::from(self.ok));
        buf.freeze()
    }

    /// # Errors
    ///
    /// [`AcceptorError::CorruptMessage`] if the frame is not exactly a tag
    /// byte, a proposal number, and an `ok` byte in `{0, 1}`.
    pub fn decode(frame: &[u8]) -> Result<Self, AcceptorError> {
        let mut buf = strip_tag(frame, Phase::Accept)?;
        if buf.remaining() != 9 {
            return Err(AcceptorError::CorruptMessage("accept frame length"));
        }
        let re_pn = buf.get_u64_le();
        let ok = decode_ok(buf.get_u8())?;
        Ok(Self { re_pn, ok })
    }
}

/// Any protocol frame, tagged by phase.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Message {
    Prepare(PrepareMessage),
    Propose(ProposeMessage),
    Promise(PromiseMessage),
    Accept(AcceptMessage),
}

impl Message {
    #[must_use]
    pub fn phase(&self) -> Phase {
        match self {
            Message::Prepare(_) => Phase::Prepare,
            Message::Propose(_) => Phase::Propose,
            Message::Promise(_) => Phase::Promise,
            Message::Accept(_) => Phase::Accept,
        }
    }

    #[must_use]
    pub fn encode(&self) -> Bytes {
        match self {
            Message::Prepare(m) => m.encode(),
            Message::Propose(m) => m.encode(),
            Message::Promise(m) => m.encode(),
            Message::Accept(m) => m.encode(),
        }
    }

    /// Decode any frame in the alphabet.
    ///
    /// # Errors
    ///
    /// [`AcceptorError::UnsupportedPhase`] for tags outside the alphabet,
    /// [`AcceptorError::CorruptMessage`] for schema violations.
    pub fn decode(frame: &[u8]) -> Result<Self, AcceptorError> {
        match Phase::of_frame(frame)? {
            Phase::Prepare => PrepareMessage::decode(frame).map(Message::Prepare),
            Phase::Propose => ProposeMessage::decode(frame).map(Message::Propose),
            Phase::Promise => PromiseMessage::decode(frame).map(Message::Promise),
            Phase::Accept => AcceptMessage::decode(frame).map(Message::Accept),
        }
    }
}
