//! Callbacks saved across a forced device reset.
//!
//! `restart` moves every pending callback here before the ring is wiped;
//! `end_reconfig` replays them with [`CmdStatus::DeviceReset`]. No callback
//! that entered the queue is ever dropped without being called.

use heapless::Vec;
use log::warn;

use crate::command::{CmdStatus, CommandKind, Completion};

/// A saved callback and the command it belonged to.
#[derive(Debug)]
pub struct RecoveryEntry {
    pub kind: CommandKind,
    pub completion: Completion,
}

/// Fixed-capacity list of saved callbacks.
pub struct RecoveryList<const N: usize> {
    entries: Vec<RecoveryEntry, N>,
}

impl<const N: usize> RecoveryList<N> {
    pub const fn new() -> Self {
        Self { entries: Vec::new() }
    }

    /// Save a callback. If the list is already full (a second restart
    /// before `end_reconfig`), the callback is resolved immediately and
    /// `true` is returned.
    pub fn save(&mut self, kind: CommandKind, completion: Completion) -> bool {
        if completion.is_none() {
            return false;
        }
        match self.entries.push(RecoveryEntry { kind, completion }) {
            Ok(()) => false,
            Err(entry) => {
                warn!(
                    "recovery list full, resolving {:?} immediately",
                    entry.kind
                );
                entry.completion.complete(CmdStatus::DeviceReset, &[]);
                true
            }
        }
    }

    /// Resolve every saved callback in order. Returns how many ran.
    pub fn replay(&mut self) -> usize {
        let count = self.entries.len();
        // Emptied before the first callback runs.
        let entries = core::mem::take(&mut self.entries);
        for entry in entries {
            entry.completion.complete(CmdStatus::DeviceReset, &[]);
        }
        count
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<const N: usize> Default for RecoveryList<N> {
    fn default() -> Self {
        Self::new()
    }
}
