//! Command vocabulary shared by the queue and the transport.
//!
//! - [`CommandKind`]: firmware opcodes and their mailbox transfer shape.
//! - [`Payload`]: fixed-capacity parameter buffer copied into each node.
//! - [`CmdStatus`] / [`StatusClass`]: the outcome a callback receives.
//! - [`Completion`]: the two callback shapes, plus "no callback".

use core::fmt;

use crate::config::MAX_CMD_PARAMS;

/// Fixed-capacity command parameter / result buffer.
pub type Payload = heapless::Vec<u8, MAX_CMD_PARAMS>;

// ---------------------------------------------------------------------------
// Command kinds
// ---------------------------------------------------------------------------

/// Firmware command opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum CommandKind {
    Interrogate = 1,
    Configure = 2,
    EnableRx = 3,
    EnableTx = 4,
    DisableRx = 5,
    DisableTx = 6,
    Scan = 8,
    StopScan = 9,
    StartJoin = 11,
    SetKeys = 12,
    ReadMemory = 13,
    WriteMemory = 14,
    SetTemplate = 19,
    Test = 23,
    Disconnect = 36,
    SetPsMode = 37,
    ChannelSwitch = 38,
    HealthCheck = 45,
    StartPeriodicScan = 50,
    StopPeriodicScan = 51,
    SetStaState = 52,
}

impl CommandKind {
    /// Opcode written into the mailbox header.
    pub const fn id(self) -> u16 {
        self as u16
    }

    /// Map a mailbox opcode back to a kind.
    pub fn from_id(id: u16) -> Option<Self> {
        let kind = match id {
            1 => Self::Interrogate,
            2 => Self::Configure,
            3 => Self::EnableRx,
            4 => Self::EnableTx,
            5 => Self::DisableRx,
            6 => Self::DisableTx,
            8 => Self::Scan,
            9 => Self::StopScan,
            11 => Self::StartJoin,
            12 => Self::SetKeys,
            13 => Self::ReadMemory,
            14 => Self::WriteMemory,
            19 => Self::SetTemplate,
            23 => Self::Test,
            36 => Self::Disconnect,
            37 => Self::SetPsMode,
            38 => Self::ChannelSwitch,
            45 => Self::HealthCheck,
            50 => Self::StartPeriodicScan,
            51 => Self::StopPeriodicScan,
            52 => Self::SetStaState,
            _ => return None,
        };
        Some(kind)
    }

    /// Bytes to write and bytes to read back for a payload of `len` bytes.
    ///
    /// Interrogate sends only the info-element header and reads the whole
    /// element back. Test and memory reads echo a payload-sized response.
    /// Everything else is write-only with a status-word read-back.
    pub fn transfer_lens(self, len: usize, header_len: usize) -> (usize, usize) {
        match self {
            Self::Interrogate => (header_len.min(len), len),
            Self::Test | Self::ReadMemory => (len, len),
            _ => (len, 0),
        }
    }
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Outcome of one command, as delivered to its callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmdStatus {
    Success,
    UnknownCommand,
    UnknownInfoElement,
    /// Firmware refused because radio coexistence is active.
    RejectedCoexistence,
    RxBusy,
    InvalidParam,
    TemplateTooLarge,
    OutOfMemory,
    StationTableFull,
    RadioError,
    WrongNesting,
    Timeout,
    FirmwareReset,
    /// Status word the firmware protocol does not define.
    Unrecognised(u16),
    /// The transport failed to write the command.
    MailboxFault,
    /// The device was reset while the command was pending.
    DeviceReset,
}

/// How the queue reacts to a [`CmdStatus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    Ok,
    /// Expected refusal; reported to the caller only.
    SoftReject,
    /// Hardware fault; latches the queue and starts recovery.
    HardFault,
    /// Synthetic status from recovery replay.
    Reset,
}

impl CmdStatus {
    /// Decode the mailbox status word.
    pub fn from_code(code: u16) -> Self {
        match code {
            1 => Self::Success,
            2 => Self::UnknownCommand,
            3 => Self::UnknownInfoElement,
            11 => Self::RejectedCoexistence,
            13 => Self::RxBusy,
            14 => Self::InvalidParam,
            15 => Self::TemplateTooLarge,
            16 => Self::OutOfMemory,
            17 => Self::StationTableFull,
            18 => Self::RadioError,
            19 => Self::WrongNesting,
            21 => Self::Timeout,
            22 => Self::FirmwareReset,
            other => Self::Unrecognised(other),
        }
    }

    pub fn class(self) -> StatusClass {
        match self {
            Self::Success => StatusClass::Ok,
            Self::RejectedCoexistence => StatusClass::SoftReject,
            Self::DeviceReset => StatusClass::Reset,
            _ => StatusClass::HardFault,
        }
    }

    pub fn is_ok(self) -> bool {
        self == Self::Success
    }
}

impl fmt::Display for CmdStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::UnknownCommand => write!(f, "unknown command"),
            Self::UnknownInfoElement => write!(f, "unknown info element"),
            Self::RejectedCoexistence => write!(f, "rejected: coexistence active"),
            Self::RxBusy => write!(f, "rx busy"),
            Self::InvalidParam => write!(f, "invalid parameter"),
            Self::TemplateTooLarge => write!(f, "template too large"),
            Self::OutOfMemory => write!(f, "firmware out of memory"),
            Self::StationTableFull => write!(f, "station table full"),
            Self::RadioError => write!(f, "radio error"),
            Self::WrongNesting => write!(f, "wrong nesting"),
            Self::Timeout => write!(f, "timeout"),
            Self::FirmwareReset => write!(f, "firmware reset"),
            Self::Unrecognised(code) => write!(f, "unrecognised status {code}"),
            Self::MailboxFault => write!(f, "mailbox write failed"),
            Self::DeviceReset => write!(f, "device reset"),
        }
    }
}

// ---------------------------------------------------------------------------
// Completion callbacks
// ---------------------------------------------------------------------------

/// Callback receiving only the command status.
pub type PlainFn = Box<dyn FnOnce(CmdStatus) + Send>;

/// Callback receiving the status and the read-back result bytes.
pub type InterrogateFn = Box<dyn FnOnce(CmdStatus, &[u8]) + Send>;

/// How a command reports back.
///
/// The callback context is whatever the closure captures. For
/// `Interrogate`, the result bytes are copied out of the mailbox into the
/// queue node before the closure runs.
#[derive(Default)]
pub enum Completion {
    /// Fire-and-forget.
    #[default]
    None,
    Plain(PlainFn),
    Interrogate(InterrogateFn),
}

impl Completion {
    pub fn plain(f: impl FnOnce(CmdStatus) + Send + 'static) -> Self {
        Self::Plain(Box::new(f))
    }

    pub fn interrogate(f: impl FnOnce(CmdStatus, &[u8]) + Send + 'static) -> Self {
        Self::Interrogate(Box::new(f))
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Whether the transport's result payload must be copied out.
    pub fn wants_result(&self) -> bool {
        matches!(self, Self::Interrogate(_))
    }

    /// Consume the callback. `result` is ignored by plain callbacks.
    pub fn complete(self, status: CmdStatus, result: &[u8]) {
        match self {
            Self::None => {}
            Self::Plain(f) => f(status),
            Self::Interrogate(f) => f(status, result),
        }
    }
}

impl fmt::Debug for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "Completion::None"),
            Self::Plain(_) => write!(f, "Completion::Plain"),
            Self::Interrogate(_) => write!(f, "Completion::Interrogate"),
        }
    }
}
