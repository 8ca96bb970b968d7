//! wl1271 firmware command queue.
//!
//! Serialises host → firmware commands through the single command
//! mailbox: at most one command is in flight, the rest wait in a
//! fixed-capacity ring and are dispatched in order as completions arrive.
//!
//! ```text
//! send_command ──▶ CommandQueue ──▶ MailboxTransport ──▶ device
//!                   (ring, FSM,      (CmdMailbox over
//!                    recovery)        SpiMailboxBus)
//! ```
//!
//! Hardware access is behind the traits in [`ports`]; everything above
//! them is plain logic and runs on the host.

#![deny(unused_must_use)]

pub mod blocking;
pub mod clock;
pub mod command;
pub mod config;
pub mod error;
pub mod mailbox;
pub mod ports;
pub mod queue;

pub use command::{CmdStatus, CommandKind, Completion, StatusClass};
pub use config::{DriverConfig, MailboxConfig, QueueConfig};
pub use error::{Error, MailboxError, QueueError, Result};
pub use mailbox::CmdMailbox;
pub use ports::{Clock, Dispatch, MailboxBus, MailboxTransport};
pub use queue::{CommandQueue, QueueEvent, QueueState};
