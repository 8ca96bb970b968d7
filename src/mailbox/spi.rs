//! WSPI bus adapter over an `embedded_hal::spi::SpiDevice`.
//!
//! Every access is a single SPI transaction that starts with a 32-bit
//! little-endian command word:
//!
//! ```text
//!  31   30    29     28 ........ 17   16 ........ 0
//! ┌───┬──────┬───────┬──────────────┬─────────────┐
//! │ 0 │ READ │ FIXED │ byte length  │ byte address│
//! └───┴──────┴───────┴──────────────┴─────────────┘
//! ```
//!
//! Reads clock out `busy_words` padding words while the chip fetches the
//! data, then the payload.

use embedded_hal::spi::{Operation, SpiDevice};

use crate::ports::MailboxBus;

pub const WSPI_CMD_READ: u32 = 0x4000_0000;
pub const WSPI_CMD_WRITE: u32 = 0x0000_0000;
pub const WSPI_CMD_FIXED: u32 = 0x2000_0000;
pub const WSPI_CMD_BYTE_LENGTH: u32 = 0x1FFE_0000;
pub const WSPI_CMD_BYTE_LENGTH_OFFSET: u32 = 17;
pub const WSPI_CMD_BYTE_ADDR: u32 = 0x0001_FFFF;

/// Longest transfer the length field can express.
pub const WSPI_MAX_LEN: usize = (WSPI_CMD_BYTE_LENGTH >> WSPI_CMD_BYTE_LENGTH_OFFSET) as usize;

pub const DEFAULT_BUSY_WORDS: usize = 1;
const MAX_BUSY_WORDS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpiBusError<E> {
    Spi(E),
    /// Transfer longer than [`WSPI_MAX_LEN`].
    TooLong(usize),
}

/// Build the command word for an access of `len` bytes at `addr`.
pub fn command_word(read: bool, addr: u32, len: usize) -> u32 {
    let mut cmd = if read { WSPI_CMD_READ } else { WSPI_CMD_WRITE };
    cmd |= ((len as u32) << WSPI_CMD_BYTE_LENGTH_OFFSET) & WSPI_CMD_BYTE_LENGTH;
    cmd |= addr & WSPI_CMD_BYTE_ADDR;
    cmd
}

pub struct SpiMailboxBus<S> {
    spi: S,
    busy_words: usize,
}

impl<S: SpiDevice<u8>> SpiMailboxBus<S> {
    pub fn new(spi: S) -> Self {
        Self::with_busy_words(spi, DEFAULT_BUSY_WORDS)
    }

    /// `busy_words` is clamped to 4.
    pub fn with_busy_words(spi: S, busy_words: usize) -> Self {
        Self {
            spi,
            busy_words: busy_words.min(MAX_BUSY_WORDS),
        }
    }

    pub fn busy_words(&self) -> usize {
        self.busy_words
    }

    pub fn device(&self) -> &S {
        &self.spi
    }

    pub fn device_mut(&mut self) -> &mut S {
        &mut self.spi
    }

    pub fn release(self) -> S {
        self.spi
    }

    fn check_len(len: usize) -> Result<(), SpiBusError<S::Error>> {
        if len > WSPI_MAX_LEN {
            return Err(SpiBusError::TooLong(len));
        }
        Ok(())
    }
}

impl<S: SpiDevice<u8>> MailboxBus for SpiMailboxBus<S> {
    type Error = SpiBusError<S::Error>;

    fn write(&mut self, addr: u32, data: &[u8]) -> Result<(), Self::Error> {
        Self::check_len(data.len())?;
        let cmd = command_word(false, addr, data.len()).to_le_bytes();
        self.spi
            .transaction(&mut [Operation::Write(&cmd), Operation::Write(data)])
            .map_err(SpiBusError::Spi)
    }

    fn read(&mut self, addr: u32, buf: &mut [u8]) -> Result<(), Self::Error> {
        Self::check_len(buf.len())?;
        let cmd = command_word(true, addr, buf.len()).to_le_bytes();
        let mut busy = [0u8; 4 * MAX_BUSY_WORDS];
        let busy_len = 4 * self.busy_words;
        self.spi
            .transaction(&mut [
                Operation::Write(&cmd),
                Operation::Read(&mut busy[..busy_len]),
                Operation::Read(buf),
            ])
            .map_err(SpiBusError::Spi)
    }
}
