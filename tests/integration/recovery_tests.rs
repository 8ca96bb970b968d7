//! Integration tests for restart / end-reconfig recovery.

use crate::mock_transport::{CallbackLog, MockTransport};

use wlcmdq::{CmdStatus, CommandKind, CommandQueue, Completion, QueueConfig, QueueState};

fn make_queue<const N: usize>() -> CommandQueue<MockTransport, N> {
    let mut q = CommandQueue::new(QueueConfig::default());
    q.init(MockTransport::new());
    q
}

#[test]
fn restart_then_end_reconfig_resolves_pending() {
    let log = CallbackLog::new();
    let mut q = make_queue::<30>();
    q.send_command(CommandKind::Configure, &[1], log.cb(1)).unwrap();
    q.send_command(CommandKind::Scan, &[2], log.cb(2)).unwrap();
    let sends_before = q.transport().unwrap().send_count();

    q.restart().unwrap();
    assert_eq!(q.len(), 0);
    assert_eq!(q.recovery_len(), 2);
    assert_eq!(q.state(), QueueState::Idle);
    assert!(log.fired().is_empty(), "callbacks wait for end_reconfig");

    q.end_reconfig().unwrap();
    assert_eq!(
        log.fired(),
        vec![(1, CmdStatus::DeviceReset), (2, CmdStatus::DeviceReset)]
    );
    assert_eq!(q.recovery_len(), 0);
    assert_eq!(q.transport().unwrap().send_count(), sends_before);
}

#[test]
fn every_depth_is_fully_recovered() {
    const DEPTH: usize = 6;
    for pending in 0..=DEPTH {
        let log = CallbackLog::new();
        let mut q = make_queue::<DEPTH>();
        for tag in 0..pending as u32 {
            q.send_command(CommandKind::Configure, &[tag as u8], log.cb(tag))
                .unwrap();
        }

        q.restart().unwrap();
        q.end_reconfig().unwrap();

        let expected: Vec<_> = (0..pending as u32).map(|t| (t, CmdStatus::DeviceReset)).collect();
        assert_eq!(log.fired(), expected, "pending = {pending}");
        assert_eq!(q.len(), 0);
        assert_eq!(q.recovery_len(), 0);
        assert_eq!(q.stats().recovered, pending as u32);
    }
}

#[test]
fn restart_drops_awake_without_sleep() {
    let mut q = make_queue::<4>();
    q.send_command(CommandKind::Configure, &[1], Completion::None)
        .unwrap();
    assert!(q.is_awake());

    q.restart().unwrap();
    assert!(!q.is_awake());
    assert_eq!(q.transport().unwrap().sleep_count(), 0);
}

#[test]
fn restart_clears_latch_and_queue_accepts_again() {
    let log = CallbackLog::new();
    let mut q: CommandQueue<MockTransport, 4> = CommandQueue::new(QueueConfig::default());
    q.init(MockTransport::with_statuses([CmdStatus::FirmwareReset]));

    q.send_command(CommandKind::Configure, &[1], log.cb(1)).unwrap();
    q.send_command(CommandKind::Configure, &[2], log.cb(2)).unwrap();
    q.result_received().unwrap();
    assert!(q.is_error_latched());
    assert_eq!(q.len(), 1, "second command held back by the latch");

    q.restart().unwrap();
    assert!(!q.is_error_latched());
    q.end_reconfig().unwrap();
    assert_eq!(
        log.fired(),
        vec![(1, CmdStatus::FirmwareReset), (2, CmdStatus::DeviceReset)]
    );

    q.send_command(CommandKind::Configure, &[3], log.cb(3)).unwrap();
    q.result_received().unwrap();
    assert_eq!(log.tags(), vec![1, 2, 3]);
}

#[test]
fn commands_after_restart_run_before_replay() {
    let log = CallbackLog::new();
    let mut q = make_queue::<4>();
    q.send_command(CommandKind::Configure, &[1], log.cb(1)).unwrap();
    q.restart().unwrap();

    // reconfiguration traffic goes through the queue as usual
    q.send_command(CommandKind::SetTemplate, &[9], log.cb(10)).unwrap();
    q.result_received().unwrap();
    q.end_reconfig().unwrap();

    assert_eq!(
        log.fired(),
        vec![(10, CmdStatus::Success), (1, CmdStatus::DeviceReset)]
    );
}

#[test]
fn end_reconfig_without_restart_is_a_no_op() {
    let log = CallbackLog::new();
    let mut q = make_queue::<4>();
    q.send_command(CommandKind::Configure, &[1], log.cb(1)).unwrap();
    q.end_reconfig().unwrap();
    assert!(log.fired().is_empty());
    assert_eq!(q.len(), 1);
}

#[test]
fn drop_resolves_outstanding_callbacks() {
    let log = CallbackLog::new();
    {
        let mut q = make_queue::<4>();
        q.send_command(CommandKind::Configure, &[1], log.cb(1)).unwrap();
        q.send_command(CommandKind::Configure, &[2], log.cb(2)).unwrap();
        q.restart().unwrap();
        q.send_command(CommandKind::Configure, &[3], log.cb(3)).unwrap();
    }
    assert_eq!(
        log.fired(),
        vec![
            (1, CmdStatus::DeviceReset),
            (2, CmdStatus::DeviceReset),
            (3, CmdStatus::DeviceReset)
        ]
    );
}
