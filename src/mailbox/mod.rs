//! Command mailbox transport.
//!
//! One command at a time is exchanged with the firmware through a shared
//! mailbox region:
//!
//! ```text
//!  offset 0      2        4                       4 + len
//!  ┌────────────┬────────┬───────────────────────┐
//!  │ opcode LE  │ status │ parameters …          │
//!  └────────────┴────────┴───────────────────────┘
//! ```
//!
//! 1. `send` writes header + `write_len` parameter bytes, then raises the
//!    command interrupt on the firmware and arms a deadline.
//! 2. The firmware executes, overwrites the status word (and, for reads,
//!    the parameters) and raises command-complete.
//! 3. [`CmdMailbox::on_command_complete`] reads back header + `read_len`
//!    bytes and decodes the status.
//!
//! [`CommandQueue::on_mailbox_irq`] and
//! [`CommandQueue::poll_mailbox_timeout`] glue steps 2–3 and the deadline
//! to the queue.

pub mod spi;

use heapless::Vec;
use log::{debug, error, warn};

use crate::command::{CmdStatus, CommandKind};
use crate::config::{MAX_CMD_PARAMS, MailboxConfig};
use crate::error::{Error, MailboxError, QueueError, Result};
use crate::ports::{Clock, Dispatch, MailboxBus, MailboxTransport};
use crate::queue::CommandQueue;

/// Opcode + status word.
pub const MBOX_HEADER_LEN: usize = 4;

/// Largest frame exchanged through the mailbox.
pub const MBOX_FRAME_MAX: usize = MBOX_HEADER_LEN + MAX_CMD_PARAMS;

/// Host → firmware "command posted" interrupt bit.
pub const INTR_TRIG_CMD: u32 = 1 << 0;

pub const ELPCTRL_WAKE_UP: u8 = 0x1;
pub const ELPCTRL_SLEEP: u8 = 0x0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Transaction {
    Idle,
    Pending {
        kind: CommandKind,
        read_len: usize,
        deadline_ms: u64,
    },
}

/// [`MailboxTransport`] over a register bus `B`, with deadlines from `C`.
pub struct CmdMailbox<B, C> {
    bus: B,
    clock: C,
    config: MailboxConfig,
    txn: Transaction,
    /// Last frame read back (header included).
    frame: Vec<u8, MBOX_FRAME_MAX>,
    status: CmdStatus,
}

impl<B: MailboxBus, C: Clock> CmdMailbox<B, C> {
    pub fn new(bus: B, clock: C, config: MailboxConfig) -> Self {
        Self {
            bus,
            clock,
            config,
            txn: Transaction::Idle,
            frame: Vec::new(),
            status: CmdStatus::Success,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.txn, Transaction::Pending { .. })
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    /// Command-complete interrupt: read the response back.
    ///
    /// A failed bus read completes the transaction with
    /// [`CmdStatus::MailboxFault`].
    pub fn on_command_complete(&mut self) -> core::result::Result<CmdStatus, MailboxError> {
        let Transaction::Pending { kind, read_len, .. } = self.txn else {
            warn!("command complete with no transaction outstanding");
            return Err(MailboxError::NotPending);
        };
        self.txn = Transaction::Idle;

        self.frame.clear();
        let len = (MBOX_HEADER_LEN + read_len).min(MBOX_FRAME_MAX);
        let _ = self.frame.resize_default(len);
        if let Err(e) = self.bus.read(self.config.mailbox_addr, &mut self.frame) {
            error!("mailbox read-back for {:?} failed: {:?}", kind, e);
            self.frame.clear();
            self.status = CmdStatus::MailboxFault;
            return Ok(self.status);
        }

        let opcode = u16::from_le_bytes([self.frame[0], self.frame[1]]);
        if opcode != kind.id() {
            warn!("mailbox echoed opcode {} for {:?}", opcode, kind);
        }
        self.status = CmdStatus::from_code(u16::from_le_bytes([self.frame[2], self.frame[3]]));
        debug!("{:?} complete: {}", kind, self.status);
        Ok(self.status)
    }

    /// Expire the outstanding transaction once its deadline has passed.
    pub fn poll_timeout(&mut self) -> Option<CmdStatus> {
        let Transaction::Pending {
            kind, deadline_ms, ..
        } = self.txn
        else {
            return None;
        };
        if self.clock.now_ms() < deadline_ms {
            return None;
        }
        error!(
            "{:?} timed out after {} ms",
            kind, self.config.timeout_ms
        );
        self.txn = Transaction::Idle;
        self.status = CmdStatus::Timeout;
        Some(CmdStatus::Timeout)
    }

    fn write_elp(&mut self, value: u8) {
        if let Err(e) = self.bus.write(self.config.elp_ctrl_reg, &[value]) {
            error!("ELP control write {:#x} failed: {:?}", value, e);
        }
    }
}

impl<B: MailboxBus, C: Clock> MailboxTransport for CmdMailbox<B, C> {
    fn send(
        &mut self,
        kind: CommandKind,
        payload: &[u8],
        write_len: usize,
        read_len: usize,
    ) -> core::result::Result<Dispatch, MailboxError> {
        if self.is_pending() {
            return Err(MailboxError::Busy);
        }
        if write_len > payload.len()
            || MBOX_HEADER_LEN + write_len > MBOX_FRAME_MAX
            || MBOX_HEADER_LEN + read_len > MBOX_FRAME_MAX
        {
            return Err(MailboxError::FrameTooLarge);
        }

        let mut frame: Vec<u8, MBOX_FRAME_MAX> = Vec::new();
        let _ = frame.extend_from_slice(&kind.id().to_le_bytes());
        let _ = frame.extend_from_slice(&0u16.to_le_bytes());
        let _ = frame.extend_from_slice(&payload[..write_len]);

        self.bus
            .write(self.config.mailbox_addr, &frame)
            .map_err(|e| {
                error!("mailbox write for {:?} failed: {:?}", kind, e);
                MailboxError::Bus
            })?;
        self.bus
            .write(self.config.trigger_reg, &INTR_TRIG_CMD.to_le_bytes())
            .map_err(|e| {
                error!("command trigger for {:?} failed: {:?}", kind, e);
                MailboxError::Bus
            })?;

        self.txn = Transaction::Pending {
            kind,
            read_len,
            deadline_ms: self.clock.now_ms() + u64::from(self.config.timeout_ms),
        };
        Ok(Dispatch::Pending)
    }

    fn status(&mut self) -> CmdStatus {
        self.status
    }

    fn read_result(&mut self, out: &mut [u8]) -> usize {
        let body = self.frame.get(MBOX_HEADER_LEN..).unwrap_or(&[]);
        let n = body.len().min(out.len());
        out[..n].copy_from_slice(&body[..n]);
        n
    }

    fn awake(&mut self) {
        self.write_elp(ELPCTRL_WAKE_UP);
    }

    fn sleep(&mut self) {
        self.write_elp(ELPCTRL_SLEEP);
    }

    fn abort(&mut self) {
        if let Transaction::Pending { kind, .. } = self.txn {
            warn!("aborting outstanding {:?}", kind);
        }
        self.txn = Transaction::Idle;
        self.frame.clear();
    }
}

// ---------------------------------------------------------------------------
// Queue glue
// ---------------------------------------------------------------------------

impl<B: MailboxBus, C: Clock, const N: usize> CommandQueue<CmdMailbox<B, C>, N> {
    /// Command-complete interrupt bottom half: read the mailbox back and
    /// resolve the head command.
    pub fn on_mailbox_irq(&mut self) -> Result<()> {
        let mbox = self
            .transport_mut()
            .ok_or(Error::Queue(QueueError::NotInitialised))?;
        mbox.on_command_complete()?;
        self.result_received()
    }

    /// Check the outstanding command's deadline. Returns `true` if it
    /// expired, in which case the queue is now latched.
    pub fn poll_mailbox_timeout(&mut self) -> bool {
        match self.transport_mut().and_then(|m| m.poll_timeout()) {
            Some(status) => {
                self.transport_error(status);
                true
            }
            None => false,
        }
    }
}
