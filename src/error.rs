use core::fmt::Debug;

use embedded_hal::can::ErrorKind;

use crate::{buffer::AddressError, timing::TimingError};

pub type Result<T, SPIE, CSE> = core::result::Result<T, Error<SPIE, CSE>>;

#[derive(Debug)]
pub enum Error<SPIE, CSE> {
    /// SPI transfer failed.
    Spi(SPIE),
    /// Chip select pin could not be driven.
    Hal(CSE),
    /// Buffer index or register field does not exist on the chip.
    Address(AddressError),
    /// Payload of this length does not fit in a CAN frame.
    PayloadTooLong(usize),
    /// Bit rate not in [`crate::timing::BitRate`].
    UnsupportedBitRate(u32),
    /// Operation mode value not in [`crate::regs::OpMode`].
    InvalidMode(u8),
    /// Bit timing segments cannot be programmed.
    Timing(TimingError),
    /// The chip did not switch to the requested mode.
    NewModeTimeout,
    /// All Tx buffers have a pending transmission.
    TxBusy,
    /// The chip flagged the transmission as failed, lost or aborted.
    TxFailed,
    /// The Tx buffer has no transmission being tracked.
    TxIdle,
    /// No Rx buffer holds a message.
    NoMessage,
}

impl<SPIE, CSE> From<AddressError> for Error<SPIE, CSE> {
    fn from(e: AddressError) -> Self {
        Error::Address(e)
    }
}

impl<SPIE, CSE> From<TimingError> for Error<SPIE, CSE> {
    fn from(e: TimingError) -> Self {
        Error::Timing(e)
    }
}

impl<SPIE: Debug, CSE: Debug> embedded_hal::can::Error for Error<SPIE, CSE> {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}
