use bitflags::bitflags;
use modular_bitfield::prelude::*;

use crate::buffer::{RxBuf, TxBuf};

/// Reply to the READ STATUS instruction.
#[bitfield]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Status {
    #[skip(setters)]
    pub rx0if: bool,
    #[skip(setters)]
    pub rx1if: bool,
    #[skip(setters)]
    pub tx0req: bool,
    #[skip(setters)]
    pub tx0if: bool,
    #[skip(setters)]
    pub tx1req: bool,
    #[skip(setters)]
    pub tx1if: bool,
    #[skip(setters)]
    pub tx2req: bool,
    #[skip(setters)]
    pub tx2if: bool,
}

impl Status {
    /// First receive buffer holding a message, `RXB0` before `RXB1`.
    pub fn full_rx_buf(&self) -> Option<RxBuf> {
        if self.rx0if() {
            Some(RxBuf::B0)
        } else if self.rx1if() {
            Some(RxBuf::B1)
        } else {
            None
        }
    }

    /// Whether `buf` has a pending transmit request.
    pub fn tx_pending(&self, buf: TxBuf) -> bool {
        match buf {
            TxBuf::B0 => self.tx0req(),
            TxBuf::B1 => self.tx1req(),
            TxBuf::B2 => self.tx2req(),
        }
    }
}

bitflags! {
    /// `CANINTF` interrupt flags.
    pub struct IntFlags: u8 {
        const RX0IF = 1 << 0;
        const RX1IF = 1 << 1;
        const TX0IF = 1 << 2;
        const TX1IF = 1 << 3;
        const TX2IF = 1 << 4;
        const ERRIF = 1 << 5;
        const WAKIF = 1 << 6;
        const MERRF = 1 << 7;
    }
}

impl IntFlags {
    /// "Message received" flag of a receive buffer.
    pub const fn rx(buf: RxBuf) -> Self {
        match buf {
            RxBuf::B0 => IntFlags::RX0IF,
            RxBuf::B1 => IntFlags::RX1IF,
        }
    }
}
