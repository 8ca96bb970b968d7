//! Ordered, single-outstanding command queue.
//!
//! ```text
//!  send_command ──▶ ┌──────────────┐  send   ┌──────────────────┐
//!                   │ CommandRing  │───────▶│ MailboxTransport │
//!  callbacks    ◀── │  (FIFO, N)   │◀───────│  (one in flight) │
//!                   └──────┬───────┘ result └──────────────────┘
//!                          │ restart
//!                          ▼
//!                   ┌──────────────┐ end_reconfig
//!                   │ RecoveryList │──────────────▶ callbacks(DeviceReset)
//!                   └──────────────┘
//! ```
//!
//! Two states, two events:
//!
//! | state               | `Run`                          | `Complete`                     |
//! |---------------------|--------------------------------|--------------------------------|
//! | `Idle`              | send head, → `WaitForCompletion` | logic error                  |
//! | `WaitForCompletion` | already busy, stay             | pop head, call back, → `Idle`, re-`Run` if more |
//!
//! Events are processed by a loop in [`CommandQueue::drive`], so a long run
//! of back-to-back commands (or a transport that completes synchronously)
//! never recurses.
//!
//! The queue assumes a single logical execution context: `send_command` and
//! `result_received` must not run concurrently. Callbacks are `Send`, so
//! the whole queue can be moved to (or locked by) whichever context owns
//! the device.

pub mod history;
pub mod recovery;
pub mod ring;

use log::{debug, error, info, trace, warn};

use crate::command::{CmdStatus, CommandKind, Completion, Payload, StatusClass};
use crate::config::{DEFAULT_QUEUE_DEPTH, MAX_CMD_PARAMS, QueueConfig};
use crate::error::{QueueError, Result};
use crate::ports::{Dispatch, MailboxTransport};

use history::{CommandHistory, QueueStats};
use recovery::RecoveryList;
use ring::{CommandNode, CommandRing};

// ---------------------------------------------------------------------------
// State machine identity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueState {
    Idle,
    WaitForCompletion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueEvent {
    /// A command is at the head of the ring and may be sent.
    Run,
    /// The transport finished the outstanding transaction.
    Complete,
}

/// Queue-wide fault hook; receives the status that caused the fault.
pub type FailureHandler = Box<dyn FnMut(CmdStatus) + Send>;

/// Called after every completed command, after its own callback.
pub type CompletionHook = Box<dyn FnMut(CommandKind, CmdStatus) + Send>;

// ---------------------------------------------------------------------------
// CommandQueue
// ---------------------------------------------------------------------------

/// Command queue over transport `T` with `N` ring slots.
pub struct CommandQueue<T, const N: usize = DEFAULT_QUEUE_DEPTH> {
    config: QueueConfig,
    transport: Option<T>,
    ring: CommandRing<N>,
    recovery: RecoveryList<N>,
    state: QueueState,
    /// We hold the transport's awake reference.
    awake: bool,
    /// Mailbox gate; while closed, submissions are accepted and discarded.
    enabled: bool,
    /// Sticky hardware-fault flag; closes the queue.
    error_latched: bool,
    /// Status for the in-flight command when the transport refused it.
    forced_status: Option<CmdStatus>,
    /// (write_len, read_len) of the in-flight command.
    in_flight: (usize, usize),
    on_failure: Option<FailureHandler>,
    on_complete: Option<CompletionHook>,
    history: CommandHistory,
    stats: QueueStats,
}

impl<T: MailboxTransport, const N: usize> CommandQueue<T, N> {
    /// Create an empty queue. The mailbox stays closed until [`init`](Self::init).
    pub fn new(config: QueueConfig) -> Self {
        Self {
            config,
            transport: None,
            ring: CommandRing::new(),
            recovery: RecoveryList::new(),
            state: QueueState::Idle,
            awake: false,
            enabled: false,
            error_latched: false,
            forced_status: None,
            in_flight: (0, 0),
            on_failure: None,
            on_complete: None,
            history: CommandHistory::new(),
            stats: QueueStats::default(),
        }
    }

    /// Wire the transport and open the mailbox.
    ///
    /// Re-initialising clears the error latch. Commands still in the ring
    /// are moved to the recovery list, since the new transport knows
    /// nothing about them.
    pub fn init(&mut self, mut transport: T) {
        if !self.ring.is_empty() {
            warn!(
                "init with {} commands pending; saving them for recovery",
                self.ring.len()
            );
            self.snapshot_ring();
        }
        transport.abort();
        self.transport = Some(transport);
        self.state = QueueState::Idle;
        self.awake = false;
        self.forced_status = None;
        self.error_latched = false;
        self.enabled = true;
        info!("command queue initialised (depth {})", N);
    }

    // ── Submission ────────────────────────────────────────────

    /// Queue a command. The caller's `params` are copied; the buffer may be
    /// reused as soon as this returns.
    ///
    /// `Ok(())` means accepted: the outcome arrives later via `completion`.
    /// While the mailbox is disabled the command is discarded and `Ok(())`
    /// is returned.
    pub fn send_command(
        &mut self,
        kind: CommandKind,
        params: &[u8],
        completion: Completion,
    ) -> Result<()> {
        if !self.enabled {
            debug!("mailbox disabled, discarding {:?}", kind);
            return Ok(());
        }
        if self.error_latched {
            warn!("error latched, refusing {:?}", kind);
            return Err(QueueError::Latched.into());
        }
        if self.transport.is_none() {
            return Err(QueueError::NotInitialised.into());
        }

        let payload = Payload::from_slice(params).map_err(|()| {
            warn!("{:?}: {} parameter bytes exceed {}", kind, params.len(), MAX_CMD_PARAMS);
            QueueError::PayloadTooLarge {
                len: params.len(),
                max: MAX_CMD_PARAMS,
            }
        })?;

        let node = CommandNode {
            kind,
            payload,
            completion,
        };
        if self.ring.push(node).is_err() {
            self.stats.rejected_full += 1;
            warn!("queue full ({} commands), refusing {:?}", N, kind);
            return Err(QueueError::QueueFull { depth: N }.into());
        }

        self.stats.submitted += 1;
        self.stats.max_in_queue = self.stats.max_in_queue.max(self.ring.len());

        if self.ring.len() == 1 {
            self.drive(QueueEvent::Run)
        } else {
            trace!("{:?} queued behind {} others", kind, self.ring.len() - 1);
            Ok(())
        }
    }

    /// The transport finished the outstanding transaction.
    pub fn result_received(&mut self) -> Result<()> {
        self.drive(QueueEvent::Complete)
    }

    /// Transport-level fault not tied to a status read-back (timeout,
    /// bus error). The transaction in flight is abandoned and its command
    /// completes with `status`; the queue latches and the failure handler
    /// is notified. Commands behind it wait for
    /// [`clear_error`](Self::clear_error) or [`restart`](Self::restart).
    pub fn transport_error(&mut self, status: CmdStatus) {
        error!(
            "transport error: {} (state {:?}, {} queued)",
            status,
            self.state,
            self.ring.len()
        );
        if let Some(transport) = self.transport.as_mut() {
            transport.abort();
        }
        if self.state == QueueState::WaitForCompletion {
            // Latch first so the completion does not dispatch the next command.
            self.latch(status);
            self.forced_status = Some(status);
            if let Err(e) = self.drive(QueueEvent::Complete) {
                error!("resolving abandoned command failed: {}", e);
            }
        } else {
            self.latch(status);
        }
    }

    // ── Recovery ──────────────────────────────────────────────

    /// The device is being reset: abandon every transaction.
    ///
    /// Callbacks of all queued commands move to the recovery list in FIFO
    /// order, the ring empties, the awake reference is dropped without a
    /// `sleep` call and the error latch clears.
    pub fn restart(&mut self) -> Result<()> {
        info!(
            "restart: {} commands pending, state {:?}",
            self.ring.len(),
            self.state
        );
        self.snapshot_ring();
        if let Some(transport) = self.transport.as_mut() {
            transport.abort();
        }
        self.state = QueueState::Idle;
        self.awake = false;
        self.forced_status = None;
        self.error_latched = false;
        Ok(())
    }

    /// Reconfiguration after reset is done: resolve every saved callback
    /// with [`CmdStatus::DeviceReset`].
    pub fn end_reconfig(&mut self) -> Result<()> {
        let replayed = self.recovery.replay();
        self.stats.recovered += replayed as u32;
        if replayed > 0 {
            info!("end reconfig: resolved {} saved callbacks", replayed);
        }
        Ok(())
    }

    /// Clear the error latch and resume any commands held back by it.
    pub fn clear_error(&mut self) -> Result<()> {
        if !self.error_latched {
            return Ok(());
        }
        info!("error latch cleared");
        self.error_latched = false;
        if self.state == QueueState::Idle && !self.ring.is_empty() {
            return self.drive(QueueEvent::Run);
        }
        Ok(())
    }

    // ── Registration / gating ─────────────────────────────────

    pub fn register_failure_handler(&mut self, handler: impl FnMut(CmdStatus) + Send + 'static) {
        self.on_failure = Some(Box::new(handler));
    }

    pub fn register_generic_completion(
        &mut self,
        hook: impl FnMut(CommandKind, CmdStatus) + Send + 'static,
    ) {
        self.on_complete = Some(Box::new(hook));
    }

    pub fn enable_mailbox(&mut self) {
        info!("mailbox enabled");
        self.enabled = true;
    }

    pub fn disable_mailbox(&mut self) {
        info!("mailbox disabled");
        self.enabled = false;
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn state(&self) -> QueueState {
        self.state
    }

    /// Commands in the ring, including the one in flight.
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    /// Kinds of the queued commands, head first.
    pub fn pending(&self) -> impl Iterator<Item = CommandKind> + '_ {
        self.ring.iter().map(|n| n.kind)
    }

    pub fn is_awake(&self) -> bool {
        self.awake
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_error_latched(&self) -> bool {
        self.error_latched
    }

    pub fn recovery_len(&self) -> usize {
        self.recovery.len()
    }

    pub fn stats(&self) -> QueueStats {
        self.stats
    }

    pub fn history(&self) -> &CommandHistory {
        &self.history
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    pub fn transport(&self) -> Option<&T> {
        self.transport.as_ref()
    }

    /// Access to the transport, e.g. to forward its interrupt.
    pub fn transport_mut(&mut self) -> Option<&mut T> {
        self.transport.as_mut()
    }

    pub fn log_status(&self) {
        info!(
            "cmd queue: state={:?} queued={}/{} awake={} enabled={} latched={} recovery={}",
            self.state,
            self.ring.len(),
            N,
            self.awake,
            self.enabled,
            self.error_latched,
            self.recovery.len()
        );
        info!("cmd queue stats: {:?}", self.stats);
        for (i, node) in self.ring.iter().enumerate() {
            info!(
                "  [{}] {:?} len={} {:?}",
                i,
                node.kind,
                node.payload.len(),
                node.completion
            );
        }
    }

    pub fn log_history(&self) {
        self.history.log();
    }

    // ── State machine ─────────────────────────────────────────

    /// Process `event` and every event it chains into.
    fn drive(&mut self, event: QueueEvent) -> Result<()> {
        let mut next = Some(event);
        while let Some(event) = next.take() {
            next = match (self.state, event) {
                (QueueState::Idle, QueueEvent::Run) => self.dispatch_head()?,
                (QueueState::WaitForCompletion, QueueEvent::Run) => {
                    trace!("transaction in flight, command stays queued");
                    None
                }
                (QueueState::WaitForCompletion, QueueEvent::Complete) => self.complete_head()?,
                (state @ QueueState::Idle, event @ QueueEvent::Complete) => {
                    error!("completion while idle");
                    return Err(QueueError::UnexpectedEvent { state, event }.into());
                }
            };
        }
        Ok(())
    }

    /// `Idle` + `Run`: hand the head command to the transport.
    fn dispatch_head(&mut self) -> Result<Option<QueueEvent>> {
        let Some(transport) = self.transport.as_mut() else {
            return Err(QueueError::NotInitialised.into());
        };
        let Some(head) = self.ring.peek() else {
            debug!("run with empty ring");
            return Ok(None);
        };
        if self.error_latched {
            debug!("error latched, holding {} commands", self.ring.len());
            return Ok(None);
        }

        let (write_len, read_len) = head
            .kind
            .transfer_lens(head.payload.len(), self.config.info_elem_header_len);

        if !self.awake {
            transport.awake();
            self.awake = true;
        }
        self.state = QueueState::WaitForCompletion;
        self.in_flight = (write_len, read_len);

        debug!("send {:?} w={} r={}", head.kind, write_len, read_len);
        match transport.send(head.kind, &head.payload, write_len, read_len) {
            Ok(Dispatch::Pending) => Ok(None),
            Ok(Dispatch::Completed) => Ok(Some(QueueEvent::Complete)),
            Err(e) => {
                error!("mailbox refused {:?}: {}", head.kind, e);
                self.forced_status = Some(CmdStatus::MailboxFault);
                Ok(Some(QueueEvent::Complete))
            }
        }
    }

    /// `WaitForCompletion` + `Complete`: resolve the head command.
    fn complete_head(&mut self) -> Result<Option<QueueEvent>> {
        let Some(transport) = self.transport.as_mut() else {
            return Err(QueueError::NotInitialised.into());
        };
        let forced = self.forced_status.take();
        let status = forced.unwrap_or_else(|| transport.status());

        let Some(node) = self.ring.pop() else {
            self.state = QueueState::Idle;
            error!("completion with empty ring");
            return Err(QueueError::EmptyRing.into());
        };
        let (write_len, read_len) = self.in_flight;

        let mut result = Payload::new();
        if forced.is_none() && node.completion.wants_result() {
            let _ = result.resize_default(read_len.min(MAX_CMD_PARAMS));
            let copied = transport.read_result(&mut result);
            result.truncate(copied);
        }

        self.stats.completed += 1;
        self.history.record(node.kind, status, write_len, read_len);

        let class = status.class();
        match class {
            StatusClass::Ok => trace!("{:?} complete", node.kind),
            StatusClass::SoftReject => {
                self.stats.soft_rejects += 1;
                warn!("{:?} rejected: {}", node.kind, status);
            }
            StatusClass::HardFault | StatusClass::Reset => {
                error!("{:?} failed: {}", node.kind, status);
            }
        }

        let kind = node.kind;
        node.completion.complete(status, &result);
        if let Some(hook) = self.on_complete.as_mut() {
            hook(kind, status);
        }
        // A forced completion from `transport_error` has already latched.
        if class == StatusClass::HardFault && !self.error_latched {
            self.latch(status);
        }

        self.state = QueueState::Idle;
        if self.ring.is_empty() {
            self.release_awake();
            return Ok(None);
        }
        if self.error_latched {
            return Ok(None);
        }
        Ok(Some(QueueEvent::Run))
    }

    fn latch(&mut self, status: CmdStatus) {
        self.stats.hard_faults += 1;
        if self.error_latched {
            return;
        }
        self.error_latched = true;
        match self.on_failure.as_mut() {
            Some(handler) => handler(status),
            None => warn!("hardware fault ({}) with no failure handler registered", status),
        }
    }

    fn release_awake(&mut self) {
        if !self.awake {
            return;
        }
        if let Some(transport) = self.transport.as_mut() {
            transport.sleep();
        }
        self.awake = false;
    }

    fn snapshot_ring(&mut self) {
        for node in self.ring.drain() {
            if self.recovery.save(node.kind, node.completion) {
                self.stats.recovered += 1;
            }
        }
    }
}

impl<T, const N: usize> Drop for CommandQueue<T, N> {
    fn drop(&mut self) {
        // Outstanding callbacks are resolved rather than dropped unheard.
        let mut resolved = self.recovery.replay();
        while let Some(node) = self.ring.pop() {
            if !node.completion.is_none() {
                resolved += 1;
            }
            node.completion.complete(CmdStatus::DeviceReset, &[]);
        }
        self.stats.recovered += resolved as u32;
        if resolved > 0 {
            debug!("queue dropped, resolved {} callbacks", resolved);
        }
    }
}
