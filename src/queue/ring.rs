//! Fixed-capacity FIFO of pending commands.
//!
//! Backed by a `heapless::Deque`, which keeps the nodes in an inline array
//! with wrapping head/tail indices. Pushing into a full ring hands the
//! node back instead of overwriting anything.

use heapless::Deque;

use crate::command::{CommandKind, Completion, Payload};

/// One queued command: a copy of the caller's parameters plus its callback.
#[derive(Debug)]
pub struct CommandNode {
    pub kind: CommandKind,
    pub payload: Payload,
    pub completion: Completion,
}

/// Ring of at most `N` command nodes.
pub struct CommandRing<const N: usize> {
    nodes: Deque<CommandNode, N>,
}

impl<const N: usize> CommandRing<N> {
    pub const fn new() -> Self {
        Self {
            nodes: Deque::new(),
        }
    }

    /// Append at the tail. Returns the node if the ring is full.
    pub fn push(&mut self, node: CommandNode) -> Result<(), CommandNode> {
        self.nodes.push_back(node)
    }

    /// Remove the head.
    pub fn pop(&mut self) -> Option<CommandNode> {
        self.nodes.pop_front()
    }

    /// The head, i.e. the command in flight or next to be sent.
    pub fn peek(&self) -> Option<&CommandNode> {
        self.nodes.front()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.nodes.is_full()
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    /// Iterate head to tail.
    pub fn iter(&self) -> impl Iterator<Item = &CommandNode> {
        self.nodes.iter()
    }

    /// Remove every node in FIFO order.
    pub fn drain(&mut self) -> impl Iterator<Item = CommandNode> + '_ {
        core::iter::from_fn(move || self.nodes.pop_front())
    }
}

impl<const N: usize> Default for CommandRing<N> {
    fn default() -> Self {
        Self::new()
    }
}
