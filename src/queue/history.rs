//! Debug history and counters.
//!
//! The last [`HISTORY_DEPTH`] completed commands are kept in a
//! `heapless::HistoryBuffer`; oldest entries are overwritten.

use heapless::HistoryBuffer;
use log::info;

use crate::command::{CmdStatus, CommandKind};
use crate::config::HISTORY_DEPTH;

/// One completed command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryEntry {
    /// Monotonic completion number (starts at 1).
    pub seq: u32,
    pub kind: CommandKind,
    pub status: CmdStatus,
    pub write_len: u16,
    pub read_len: u16,
}

/// Rolling record of recent completions.
pub struct CommandHistory {
    entries: HistoryBuffer<HistoryEntry, HISTORY_DEPTH>,
    next_seq: u32,
}

impl CommandHistory {
    pub fn new() -> Self {
        Self {
            entries: HistoryBuffer::new(),
            next_seq: 0,
        }
    }

    pub fn record(&mut self, kind: CommandKind, status: CmdStatus, write_len: usize, read_len: usize) {
        self.next_seq = self.next_seq.wrapping_add(1);
        self.entries.write(HistoryEntry {
            seq: self.next_seq,
            kind,
            status,
            write_len: write_len as u16,
            read_len: read_len as u16,
        });
    }

    /// Entries oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.oldest_ordered()
    }

    pub fn last(&self) -> Option<&HistoryEntry> {
        self.entries.recent()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn log(&self) {
        info!("command history ({} entries):", self.len());
        for e in self.iter() {
            info!(
                "  #{:<5} {:?} (id {}) w={} r={} -> {}",
                e.seq,
                e.kind,
                e.kind.id(),
                e.write_len,
                e.read_len,
                e.status
            );
        }
    }
}

impl Default for CommandHistory {
    fn default() -> Self {
        Self::new()
    }
}

/// Lifetime counters, readable via [`CommandQueue::stats`](super::CommandQueue::stats).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
    /// Commands accepted into the ring.
    pub submitted: u32,
    /// Commands completed by the transport.
    pub completed: u32,
    /// Submissions refused because the ring was full.
    pub rejected_full: u32,
    /// Completions with a soft-reject status.
    pub soft_rejects: u32,
    /// Completions or transport errors that latched the queue.
    pub hard_faults: u32,
    /// Callbacks resolved through recovery replay.
    pub recovered: u32,
    /// Highest ring occupancy seen.
    pub max_in_queue: usize,
}
