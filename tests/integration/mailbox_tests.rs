//! Integration tests for the queue over the mailbox and WSPI bus.
//!
//! `FakeChip` decodes WSPI command words and keeps a sparse memory map;
//! writing the command trigger makes it "execute" by patching the status
//! word (and optionally the parameters) in the mailbox.

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use embedded_hal::spi::{ErrorType, Operation, SpiDevice};

use crate::mock_transport::CallbackLog;

use wlcmdq::mailbox::spi::{SpiMailboxBus, WSPI_CMD_BYTE_ADDR, WSPI_CMD_READ};
use wlcmdq::mailbox::{CmdMailbox, ELPCTRL_SLEEP, ELPCTRL_WAKE_UP};
use wlcmdq::{Clock, CmdStatus, CommandKind, CommandQueue, MailboxConfig, QueueConfig};

// ── Fake chip ────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
enum ChipOp {
    Write(u32, Vec<u8>),
    Read(u32, usize),
}

struct FakeChip {
    mem: HashMap<u32, Vec<u8>>,
    ops: Vec<ChipOp>,
    mailbox: u32,
    trigger: u32,
    /// Status word the firmware reports for the next command.
    status: u16,
    /// Parameters the firmware writes back, if any.
    reply: Option<Vec<u8>>,
}

impl FakeChip {
    fn new(cfg: &MailboxConfig) -> Self {
        Self {
            mem: HashMap::new(),
            ops: Vec::new(),
            mailbox: cfg.mailbox_addr & WSPI_CMD_BYTE_ADDR,
            trigger: cfg.trigger_reg & WSPI_CMD_BYTE_ADDR,
            status: 1,
            reply: None,
        }
    }

    fn execute(&mut self) {
        let frame = self.mem.entry(self.mailbox).or_default();
        if frame.len() < 4 {
            frame.resize(4, 0);
        }
        frame[2..4].copy_from_slice(&self.status.to_le_bytes());
        if let Some(reply) = &self.reply {
            frame.truncate(4);
            frame.extend_from_slice(reply);
        }
    }
}

impl ErrorType for FakeChip {
    type Error = Infallible;
}

impl SpiDevice<u8> for FakeChip {
    fn transaction(&mut self, ops: &mut [Operation<'_, u8>]) -> Result<(), Infallible> {
        let Some(Operation::Write(cmd)) = ops.first() else {
            panic!("transaction must start with a command word");
        };
        let cmd = u32::from_le_bytes([cmd[0], cmd[1], cmd[2], cmd[3]]);
        let addr = cmd & WSPI_CMD_BYTE_ADDR;

        if cmd & WSPI_CMD_READ != 0 {
            let Some(Operation::Read(buf)) = ops.last_mut() else {
                panic!("read without a data phase");
            };
            let src = self.mem.get(&addr).cloned().unwrap_or_default();
            for (i, b) in buf.iter_mut().enumerate() {
                *b = src.get(i).copied().unwrap_or(0);
            }
            self.ops.push(ChipOp::Read(addr, buf.len()));
        } else {
            let Some(Operation::Write(data)) = ops.get(1) else {
                panic!("write without a data phase");
            };
            let data = data.to_vec();
            self.ops.push(ChipOp::Write(addr, data.clone()));
            self.mem.insert(addr, data);
            if addr == self.trigger {
                self.execute();
            }
        }
        Ok(())
    }
}

// ── Manual clock ─────────────────────────────────────────────

#[derive(Clone, Default)]
struct ManualClock(Arc<AtomicU64>);

impl ManualClock {
    fn advance(&self, ms: u64) {
        self.0.fetch_add(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }
}

type ChipQueue = CommandQueue<CmdMailbox<SpiMailboxBus<FakeChip>, ManualClock>, 8>;

fn make_stack() -> (ChipQueue, ManualClock) {
    let cfg = MailboxConfig::default();
    let clock = ManualClock::default();
    let bus = SpiMailboxBus::new(FakeChip::new(&cfg));
    let mut q = CommandQueue::new(QueueConfig::default());
    q.init(CmdMailbox::new(bus, clock.clone(), cfg));
    (q, clock)
}

fn chip_mut(q: &mut ChipQueue) -> &mut FakeChip {
    q.transport_mut().unwrap().bus_mut().device_mut()
}

// ── Tests ────────────────────────────────────────────────────

#[test]
fn configure_over_wspi() {
    let log = CallbackLog::new();
    let (mut q, _) = make_stack();
    let cfg = MailboxConfig::default();
    let elp = cfg.elp_ctrl_reg & WSPI_CMD_BYTE_ADDR;
    let mbox = cfg.mailbox_addr & WSPI_CMD_BYTE_ADDR;
    let trig = cfg.trigger_reg & WSPI_CMD_BYTE_ADDR;

    q.send_command(CommandKind::Configure, &[0xAA, 0xBB], log.cb(1))
        .unwrap();
    assert!(log.fired().is_empty());

    q.on_mailbox_irq().unwrap();
    assert_eq!(log.fired(), vec![(1, CmdStatus::Success)]);

    assert_eq!(
        chip_mut(&mut q).ops,
        vec![
            ChipOp::Write(elp, vec![ELPCTRL_WAKE_UP]),
            ChipOp::Write(mbox, vec![2, 0, 0, 0, 0xAA, 0xBB]),
            ChipOp::Write(trig, vec![1, 0, 0, 0]),
            ChipOp::Read(mbox, 4),
            ChipOp::Write(elp, vec![ELPCTRL_SLEEP]),
        ]
    );
}

#[test]
fn interrogate_reads_element_back() {
    let (mut q, _) = make_stack();
    chip_mut(&mut q).reply = Some(vec![0x21, 0x00, 0x02, 0x00, 0x5A, 0xA5]);

    let (completion, handle) = wlcmdq::blocking::interrogate();
    q.send_command(CommandKind::Interrogate, &[0x21, 0, 2, 0, 0, 0], completion)
        .unwrap();
    q.on_mailbox_irq().unwrap();

    let (status, data) = handle.try_take().unwrap();
    assert_eq!(status, CmdStatus::Success);
    assert_eq!(data.as_slice(), &[0x21, 0x00, 0x02, 0x00, 0x5A, 0xA5]);
}

#[test]
fn firmware_error_latches_queue() {
    let log = CallbackLog::new();
    let (mut q, _) = make_stack();
    chip_mut(&mut q).status = 18;

    q.send_command(CommandKind::Configure, &[1], log.cb(1)).unwrap();
    q.send_command(CommandKind::Configure, &[2], log.cb(2)).unwrap();
    q.on_mailbox_irq().unwrap();

    assert_eq!(log.fired(), vec![(1, CmdStatus::RadioError)]);
    assert!(q.is_error_latched());
    assert_eq!(q.len(), 1);
}

#[test]
fn timeout_completes_command_and_latches() {
    let log = CallbackLog::new();
    let faults = Arc::new(std::sync::Mutex::new(Vec::new()));
    let f = faults.clone();
    let (mut q, clock) = make_stack();
    q.register_failure_handler(move |st| f.lock().unwrap().push(st));

    q.send_command(CommandKind::Scan, &[1], log.cb(1)).unwrap();
    q.send_command(CommandKind::Scan, &[2], log.cb(2)).unwrap();
    clock.advance(10);
    assert!(!q.poll_mailbox_timeout());

    clock.advance(u64::from(MailboxConfig::default().timeout_ms));
    assert!(q.poll_mailbox_timeout());
    assert!(q.is_error_latched());
    assert_eq!(*faults.lock().unwrap(), vec![CmdStatus::Timeout]);
    assert_eq!(log.fired(), vec![(1, CmdStatus::Timeout)]);
    assert_eq!(q.len(), 1, "second command held by the latch");

    q.restart().unwrap();
    q.end_reconfig().unwrap();
    assert_eq!(log.tags(), vec![1, 2]);
    assert_eq!(log.fired()[1], (2, CmdStatus::DeviceReset));

    q.send_command(CommandKind::Scan, &[1], log.cb(3)).unwrap();
    q.on_mailbox_irq().unwrap();
    assert_eq!(log.tags(), vec![1, 2, 3]);
}

#[test]
fn clear_error_after_timeout_resumes_traffic() {
    let log = CallbackLog::new();
    let (mut q, clock) = make_stack();

    q.send_command(CommandKind::Scan, &[1], log.cb(1)).unwrap();
    clock.advance(u64::from(MailboxConfig::default().timeout_ms));
    assert!(q.poll_mailbox_timeout());

    q.clear_error().unwrap();
    q.send_command(CommandKind::Scan, &[2], log.cb(2)).unwrap();
    q.on_mailbox_irq().unwrap();

    assert_eq!(
        log.fired(),
        vec![(1, CmdStatus::Timeout), (2, CmdStatus::Success)]
    );
    assert!(q.is_empty());
    assert!(!q.is_error_latched());
}

#[test]
fn restart_mid_flight_frees_the_mailbox() {
    let log = CallbackLog::new();
    let faults = Arc::new(std::sync::Mutex::new(0u32));
    let f = faults.clone();
    let (mut q, _) = make_stack();
    q.register_failure_handler(move |_| *f.lock().unwrap() += 1);
    q.send_command(CommandKind::Configure, &[1], log.cb(1)).unwrap();

    q.restart().unwrap();
    q.end_reconfig().unwrap();

    q.send_command(CommandKind::Configure, &[2], log.cb(2)).unwrap();
    q.on_mailbox_irq().unwrap();
    assert_eq!(
        log.fired(),
        vec![(1, CmdStatus::DeviceReset), (2, CmdStatus::Success)]
    );
    assert!(!q.is_error_latched());
    assert_eq!(*faults.lock().unwrap(), 0);
}
