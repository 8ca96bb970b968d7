//! Waitable completions.
//!
//! For callers that want to block (or `.await`) on a command instead of
//! handling the callback themselves. Each constructor returns a
//! [`Completion`] to hand to
//! [`send_command`](crate::queue::CommandQueue::send_command) plus a
//! [`CompletionHandle`] that receives the outcome through an
//! `embassy_sync` [`Signal`].
//!
//! ```text
//! caller ──send_command(.., completion)──▶ CommandQueue
//!   │                                          │ callback
//!   └── handle.wait() ◀──── Signal ◀───────────┘
//! ```
//!
//! The handle does not drive the queue. Blocking on it from the same
//! context that services completion interrupts deadlocks.

use std::sync::Arc;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;

use crate::command::{CmdStatus, Completion, Payload};

/// Outcome of an interrogate command: status plus the returned element.
pub type InterrogateResult = (CmdStatus, Payload);

/// Receiving end of a signalled completion.
pub struct CompletionHandle<T: Send> {
    signal: Arc<Signal<CriticalSectionRawMutex, T>>,
}

impl<T: Send> CompletionHandle<T> {
    fn new() -> (Arc<Signal<CriticalSectionRawMutex, T>>, Self) {
        let signal = Arc::new(Signal::new());
        (signal.clone(), Self { signal })
    }

    /// Whether the command has completed.
    pub fn is_done(&self) -> bool {
        self.signal.signaled()
    }

    /// Take the outcome if it has arrived.
    pub fn try_take(&self) -> Option<T> {
        self.signal.try_take()
    }

    pub async fn wait(&self) -> T {
        self.signal.wait().await
    }

    /// Park the current thread until the command completes.
    pub fn wait_blocking(&self) -> T {
        futures_lite::future::block_on(self.signal.wait())
    }
}

/// Completion for a command without a result.
pub fn plain() -> (Completion, CompletionHandle<CmdStatus>) {
    let (signal, handle) = CompletionHandle::new();
    let completion = Completion::plain(move |status| signal.signal(status));
    (completion, handle)
}

/// Completion for an interrogate command; the result buffer is copied out.
pub fn interrogate() -> (Completion, CompletionHandle<InterrogateResult>) {
    let (signal, handle) = CompletionHandle::new();
    let completion = Completion::interrogate(move |status, data| {
        let payload = Payload::from_slice(data).unwrap_or_default();
        signal.signal((status, payload));
    });
    (completion, handle)
}
