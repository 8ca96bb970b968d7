//! Driver configuration parameters
//!
//! Tunables for the command queue and the mailbox transport. Sizes that
//! dimension fixed-capacity storage (payload capacity, ring depth, history
//! depth) are compile-time constants; everything else lives in
//! [`DriverConfig`] and can be loaded from persistent storage.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Maximum command parameter bytes carried by one queue node.
pub const MAX_CMD_PARAMS: usize = 384;

/// Default number of ring slots in a [`CommandQueue`](crate::queue::CommandQueue).
pub const DEFAULT_QUEUE_DEPTH: usize = 30;

/// Number of completed commands kept in the debug history.
pub const HISTORY_DEPTH: usize = 25;

/// Command queue configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Bytes written for an interrogate command (IE id + IE length).
    pub info_elem_header_len: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            info_elem_header_len: 4,
        }
    }
}

/// Mailbox transport configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailboxConfig {
    /// Device address of the command mailbox.
    pub mailbox_addr: u32,
    /// Interrupt trigger register (host → firmware).
    pub trigger_reg: u32,
    /// Power-management (ELP) control register.
    pub elp_ctrl_reg: u32,
    /// Time allowed for a command to complete (milliseconds).
    pub timeout_ms: u32,
}

impl Default for MailboxConfig {
    fn default() -> Self {
        Self {
            mailbox_addr: 0x0004_0000,
            trigger_reg: 0x0030_0474,
            elp_ctrl_reg: 0x0001_FFFC,
            timeout_ms: 5000,
        }
    }
}

/// Complete driver configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverConfig {
    pub queue: QueueConfig,
    pub mailbox: MailboxConfig,
}

impl DriverConfig {
    /// Reject values that would make the queue or mailbox misbehave.
    pub fn validate(&self) -> Result<()> {
        if self.queue.info_elem_header_len > MAX_CMD_PARAMS {
            return Err(Error::Config("info element header exceeds payload capacity"));
        }
        if self.mailbox.timeout_ms == 0 {
            return Err(Error::Config("mailbox timeout must be non-zero"));
        }
        let m = &self.mailbox;
        if m.mailbox_addr == m.trigger_reg
            || m.mailbox_addr == m.elp_ctrl_reg
            || m.trigger_reg == m.elp_ctrl_reg
        {
            return Err(Error::Config("mailbox registers overlap"));
        }
        Ok(())
    }
}
