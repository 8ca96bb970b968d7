//! Port traits: the boundary between the queue and the hardware.
//!
//! ```text
//!   CommandQueue ──▶ MailboxTransport ──▶ MailboxBus ──▶ SPI / SDIO
//!                          │
//!                          └──▶ Clock (transaction deadlines)
//! ```
//!
//! The [`CommandQueue`](crate::queue::CommandQueue) is generic over
//! [`MailboxTransport`], so it never touches device registers directly.
//! [`CmdMailbox`](crate::mailbox::CmdMailbox) is the in-tree transport; it
//! is in turn generic over [`MailboxBus`] and [`Clock`].

use crate::command::{CmdStatus, CommandKind};
use crate::error::MailboxError;

// ───────────────────────────────────────────────────────────────
// Mailbox transport (queue → hardware mailbox)
// ───────────────────────────────────────────────────────────────

/// Result of handing a command to the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// The transfer is under way; completion is signalled later via
    /// [`CommandQueue::result_received`](crate::queue::CommandQueue::result_received).
    Pending,
    /// The transport finished synchronously; status and result are
    /// readable now.
    Completed,
}

/// Transaction-level access to the command mailbox.
///
/// Exactly one transaction is outstanding at a time; the queue guarantees
/// it never calls `send` again before the previous one completed.
pub trait MailboxTransport {
    /// Transfer `payload[..write_len]` and arm a read-back of `read_len`
    /// result bytes.
    fn send(
        &mut self,
        kind: CommandKind,
        payload: &[u8],
        write_len: usize,
        read_len: usize,
    ) -> Result<Dispatch, MailboxError>;

    /// Final status of the transaction that just completed.
    fn status(&mut self) -> CmdStatus;

    /// Copy the read-back result into `out`; returns bytes copied.
    fn read_result(&mut self, out: &mut [u8]) -> usize;

    /// Keep the device out of low-power mode.
    fn awake(&mut self);

    /// Allow the device to enter low-power mode again.
    fn sleep(&mut self);

    /// Forget any outstanding transaction; no completion will follow.
    fn abort(&mut self) {}
}

// ───────────────────────────────────────────────────────────────
// Mailbox bus (transport → device address space)
// ───────────────────────────────────────────────────────────────

/// Raw read/write access to the device address space.
pub trait MailboxBus {
    /// Error type for this bus.
    type Error: core::fmt::Debug;

    fn write(&mut self, addr: u32, data: &[u8]) -> Result<(), Self::Error>;

    fn read(&mut self, addr: u32, buf: &mut [u8]) -> Result<(), Self::Error>;
}

// ───────────────────────────────────────────────────────────────
// Clock
// ───────────────────────────────────────────────────────────────

/// Monotonic millisecond time source.
pub trait Clock {
    fn now_ms(&self) -> u64;
}
