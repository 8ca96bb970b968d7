//! Unified error types for the command queue and mailbox.
//!
//! A single `Error` enum that every subsystem converts into, so the owning
//! driver handles queue misuse, mailbox faults and configuration problems
//! uniformly. All variants are `Copy`.
//!
//! Command *outcomes* (firmware status words, timeouts, resets) are not
//! errors here: they travel to the per-command callback as
//! [`CmdStatus`](crate::command::CmdStatus).

use core::fmt;

use crate::queue::{QueueEvent, QueueState};

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Every fallible operation in the crate funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The command queue refused or could not process a request.
    Queue(QueueError),
    /// The mailbox transport failed.
    Mailbox(MailboxError),
    /// Configuration is invalid.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Queue(e) => write!(f, "queue: {e}"),
            Self::Mailbox(e) => write!(f, "mailbox: {e}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Queue errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueError {
    /// `send_command` before `init` wired a transport.
    NotInitialised,
    /// A hardware fault latched the queue; it fails closed until cleared.
    Latched,
    /// Payload exceeds the per-node capacity.
    PayloadTooLarge { len: usize, max: usize },
    /// Every ring slot is occupied.
    QueueFull { depth: usize },
    /// The state machine received an event it has no transition for.
    UnexpectedEvent { state: QueueState, event: QueueEvent },
    /// A completion arrived but the ring held no command.
    EmptyRing,
}

impl fmt::Display for QueueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotInitialised => write!(f, "queue not initialised"),
            Self::Latched => write!(f, "error latched, queue closed"),
            Self::PayloadTooLarge { len, max } => {
                write!(f, "payload of {len} bytes exceeds capacity {max}")
            }
            Self::QueueFull { depth } => write!(f, "queue full ({depth} commands)"),
            Self::UnexpectedEvent { state, event } => {
                write!(f, "event {event:?} not valid in state {state:?}")
            }
            Self::EmptyRing => write!(f, "completion with no command in flight"),
        }
    }
}

impl From<QueueError> for Error {
    fn from(e: QueueError) -> Self {
        Self::Queue(e)
    }
}

// ---------------------------------------------------------------------------
// Mailbox errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailboxError {
    /// A transaction is already outstanding.
    Busy,
    /// Completion signalled with no transaction outstanding.
    NotPending,
    /// The underlying bus reported an error.
    Bus,
    /// Header plus payload does not fit in a mailbox frame.
    FrameTooLarge,
}

impl fmt::Display for MailboxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Busy => write!(f, "transaction already outstanding"),
            Self::NotPending => write!(f, "no transaction outstanding"),
            Self::Bus => write!(f, "bus access failed"),
            Self::FrameTooLarge => write!(f, "frame exceeds mailbox size"),
        }
    }
}

impl From<MailboxError> for Error {
    fn from(e: MailboxError) -> Self {
        Self::Mailbox(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
