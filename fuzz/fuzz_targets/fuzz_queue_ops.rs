//! Fuzz target: `CommandQueue` operation sequences
//!
//! Each input byte selects one operation (send / complete / restart /
//! end_reconfig / clear_error / transport error / toggle mailbox) and
//! verifies:
//! - No panics, and no `Err` other than the documented refusals
//! - Ring length never exceeds capacity
//! - After a final restart + end_reconfig, every accepted callback has
//!   fired exactly once
//!
//! cargo fuzz run fuzz_queue_ops

#![no_main]

use std::sync::{Arc, Mutex};

use libfuzzer_sys::fuzz_target;
use wlcmdq::{
    CmdStatus, CommandKind, CommandQueue, Completion, Dispatch, Error, MailboxError,
    MailboxTransport, QueueConfig, QueueError,
};

const DEPTH: usize = 8;

// ── Transport driven by the fuzz input ───────────────────────

struct FuzzTransport {
    next_status: CmdStatus,
    sync: bool,
    refuse: bool,
}

impl MailboxTransport for FuzzTransport {
    fn send(
        &mut self,
        _kind: CommandKind,
        _payload: &[u8],
        _write_len: usize,
        _read_len: usize,
    ) -> Result<Dispatch, MailboxError> {
        if self.refuse {
            self.refuse = false;
            return Err(MailboxError::Bus);
        }
        Ok(if self.sync { Dispatch::Completed } else { Dispatch::Pending })
    }

    fn status(&mut self) -> CmdStatus {
        self.next_status
    }

    fn read_result(&mut self, out: &mut [u8]) -> usize {
        out.fill(0xA5);
        out.len()
    }

    fn awake(&mut self) {}

    fn sleep(&mut self) {}
}

fuzz_target!(|data: &[u8]| {
    let fired: Arc<Mutex<Vec<u32>>> = Arc::default();
    let mut accepted = 0u32;
    let mut tag = 0u32;

    let mut q: CommandQueue<FuzzTransport, DEPTH> = CommandQueue::new(QueueConfig::default());
    q.init(FuzzTransport {
        next_status: CmdStatus::Success,
        sync: false,
        refuse: false,
    });

    for &b in data {
        match b % 8 {
            0 | 1 => {
                let f = fired.clone();
                let t = tag;
                tag += 1;
                let completion = if b & 0x80 != 0 {
                    Completion::interrogate(move |_, _| f.lock().unwrap().push(t))
                } else {
                    Completion::plain(move |_| f.lock().unwrap().push(t))
                };
                let kind = CommandKind::from_id(u16::from(b >> 3)).unwrap_or(CommandKind::Test);
                let len = usize::from(b >> 2);
                match q.send_command(kind, &vec![b; len], completion) {
                    Ok(()) if q.is_enabled() => accepted += 1,
                    // discarded while disabled
                    Ok(()) => {}
                    Err(Error::Queue(QueueError::Latched | QueueError::QueueFull { .. })) => {}
                    Err(e) => panic!("unexpected send error: {e}"),
                }
            }
            2 => {
                // Completion while idle is a reported misuse, not a panic.
                let _ = q.result_received();
            }
            3 => {
                let _ = q.restart();
            }
            4 => {
                let _ = q.end_reconfig();
            }
            5 => {
                let _ = q.clear_error();
            }
            6 => q.transport_error(CmdStatus::Timeout),
            _ => {
                let t = q.transport_mut().unwrap();
                t.next_status = CmdStatus::from_code(u16::from(b >> 3));
                t.sync = b & 0x40 != 0;
                t.refuse = b & 0x20 != 0;
                if b & 0x10 != 0 {
                    q.disable_mailbox();
                } else {
                    q.enable_mailbox();
                }
            }
        }
        assert!(q.len() <= DEPTH);
    }

    let _ = q.restart();
    let _ = q.end_reconfig();

    let mut seen = fired.lock().unwrap().clone();
    seen.sort_unstable();
    seen.dedup();
    assert_eq!(
        seen.len() as u32,
        accepted,
        "accepted callbacks and fired callbacks differ"
    );
    assert_eq!(fired.lock().unwrap().len() as u32, accepted, "a callback fired twice");
});
