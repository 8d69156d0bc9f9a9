//! Single-decree Paxos acceptor with durable file-backed state.
//!
//! The acceptor is the safety-critical role of the protocol: it promises to
//! ignore low-numbered proposals and accepts the rest, persisting every
//! transition to stable storage before replying so that a crash and restart
//! cannot un-promise or un-accept anything.
//!
//! # Architecture
//!
//! - [`AcceptorCore`]: the pure in-memory state machine
//! - [`FileAcceptor`]: wraps the core with write-through file persistence
//! - [`Responder`]: decodes request frames, drives the acceptor, encodes replies
//! - [`Message`] and friends: the four-frame wire protocol
//!
//! Proposers and learners are other processes; only the messages they
//! exchange with the acceptor are defined here. The transport is equally
//! external: it delivers whole request frames to [`Responder::respond`] and
//! ships the reply frames back.
//!
//! # Quick Start
//!
//! ```ignore
//! use decree::{FileAcceptor, Responder};
//!
//! let mut acceptor = FileAcceptor::new("acceptor.state");
//! acceptor.start()?;   // or acceptor.restart()? after a crash
//! let mut responder = Responder::new(acceptor);
//!
//! // Transport loop: one reply frame per request frame.
//! let reply = responder.respond(&request_frame)?;
//! ```
//!
//! Everything is synchronous and single-threaded; callers serialize all
//! invocations.

#![warn(clippy::pedantic)]

mod acceptor;
mod core;
mod error;
mod messages;
mod responder;

pub use crate::acceptor::FileAcceptor;
pub use crate::core::{AcceptorCore, Proposal, decision};
pub use crate::error::AcceptorError;
pub use crate::messages::{
    AcceptMessage, Message, Phase, PrepareMessage, PromiseMessage, ProposeMessage,
};
pub use crate::responder::Responder;
