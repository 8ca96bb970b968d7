//! Fuzz target: mailbox read-back decoding
//!
//! Sends one command through `CmdMailbox`, then serves arbitrary bytes as
//! the read-back frame and verifies:
//! - No panics for any frame content or length
//! - `read_result` never copies more than the armed read length
//!
//! cargo fuzz run fuzz_mailbox_readback

#![no_main]

use libfuzzer_sys::fuzz_target;
use wlcmdq::mailbox::CmdMailbox;
use wlcmdq::{Clock, CommandKind, MailboxBus, MailboxConfig, MailboxTransport};

struct FrameBus<'a> {
    frame: &'a [u8],
}

impl MailboxBus for FrameBus<'_> {
    type Error = ();

    fn write(&mut self, _addr: u32, _data: &[u8]) -> Result<(), ()> {
        Ok(())
    }

    fn read(&mut self, _addr: u32, buf: &mut [u8]) -> Result<(), ()> {
        if self.frame.is_empty() {
            return Err(());
        }
        for (i, b) in buf.iter_mut().enumerate() {
            *b = self.frame[i % self.frame.len()];
        }
        Ok(())
    }
}

struct Zero;

impl Clock for Zero {
    fn now_ms(&self) -> u64 {
        0
    }
}

fuzz_target!(|data: &[u8]| {
    let Some((&sel, frame)) = data.split_first() else {
        return;
    };
    let kind = CommandKind::from_id(u16::from(sel & 0x3F)).unwrap_or(CommandKind::Interrogate);
    let payload = [0u8; 64];
    let (write_len, read_len) = kind.transfer_lens(usize::from(sel >> 2), 4);

    let mut mb = CmdMailbox::new(FrameBus { frame }, Zero, MailboxConfig::default());
    if mb.send(kind, &payload, write_len, read_len).is_err() {
        return;
    }
    let _ = mb.on_command_complete();

    let mut out = [0u8; 512];
    let n = mb.read_result(&mut out);
    assert!(n <= read_len, "copied {n} bytes for a {read_len}-byte read");
});
