//! MCP2515 registers.
//!
//! Registers with a fixed address live in [`Register`]. The transmit and
//! receive buffers are laid out as parallel blocks; their addresses are
//! computed by [`crate::buffer::address`].

use modular_bitfield::prelude::*;

use crate::buffer::RxBuf;

/// Registers at fixed addresses. Mask and filter blocks are named by their
/// first (`SIDH`) register; the rest of each block follows sequentially.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Register {
    RXF0SIDH = 0x00,
    RXF1SIDH = 0x04,
    RXF2SIDH = 0x08,
    CANSTAT = 0x0E,
    CANCTRL = 0x0F,
    RXF3SIDH = 0x10,
    RXF4SIDH = 0x14,
    RXF5SIDH = 0x18,
    TEC = 0x1C,
    REC = 0x1D,
    RXM0SIDH = 0x20,
    RXM1SIDH = 0x24,
    CNF3 = 0x28,
    CNF2 = 0x29,
    CNF1 = 0x2A,
    CANINTE = 0x2B,
    CANINTF = 0x2C,
    EFLG = 0x2D,
}

impl Register {
    /// Address of the register on the chip.
    #[inline]
    pub const fn addr(self) -> u8 {
        self as u8
    }
}

/// A single-byte register at a fixed address.
pub trait Reg: Copy {
    const ADDRESS: u8;

    /// Read the register into itself from its raw content.
    fn read(content: u8) -> Self;

    /// Write the register to its raw content.
    fn write(self) -> u8;
}

/// Marker trait implemented on registers which accept the BIT MODIFY
/// instruction.
pub trait BitModifiable: Reg {}

/// `CANCTRL`: requested mode and CLKOUT pin control.
#[bitfield]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CanCtrl {
    pub clkpre: ClkPre,
    pub clken: bool,
    /// Transmit each message once, without retrying after a lost
    /// arbitration or error.
    pub osm: bool,
    pub abat: bool,
    /// Mode the chip should switch to; `CANSTAT` reports when it has.
    pub reqop: OpMode,
}

impl CanCtrl {
    pub const MASK_REQOP: Self = Self::from_bytes([0b1110_0000]);
    pub const MASK_CLKEN: Self = Self::from_bytes([0b0000_0100]);
}

impl BitModifiable for CanCtrl {}

/// `CANSTAT`: current mode and highest priority pending interrupt.
#[bitfield]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CanStat {
    #[skip]
    __: B1,
    #[skip(setters)]
    pub icod: IntFlagCode,
    #[skip]
    __: B1,
    #[skip(setters)]
    pub opmod: OpMode,
}

/// CNF1: baud rate prescaler and synchronization jump width.
#[bitfield]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Cnf1 {
    pub brp: B6,
    /// Stored as `length - 1`.
    pub sjw: B2,
}

/// CNF2: propagation and phase 1 segment lengths, sampling mode.
#[bitfield]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Cnf2 {
    pub prseg: B3,
    pub phseg1: B3,
    /// Sample three times instead of once.
    pub sam: bool,
    /// Phase 2 length is taken from CNF3 rather than derived.
    pub btlmode: bool,
}

/// CNF3: phase 2 segment length, wake-up filter and start-of-frame output.
#[bitfield]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Cnf3 {
    pub phseg2: B3,
    #[skip]
    __: B3,
    pub wakfil: bool,
    pub sof: bool,
}

#[bitfield]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Rxb0Ctrl {
    /// Which of RXF0/RXF1 accepted the message.
    #[skip(setters)]
    pub filhit0: bool,
    #[skip(setters)]
    pub bukt1: bool,
    /// Roll a message over into RXB1 when RXB0 is full.
    pub bukt: bool,
    /// The message in the buffer is a remote frame.
    #[skip(setters)]
    pub rxrtr: bool,
    #[skip]
    __: B1,
    /// Whether masks and filters apply.
    pub rxm: RecvBufOpMode,
    #[skip]
    __: B1,
}

impl Rxb0Ctrl {
    /// Mask selecting the `RXM` bits for a bit modify.
    pub const MASK_RXM: Self = Self::from_bytes([0b0110_0000]);
}

impl BitModifiable for Rxb0Ctrl {}

#[bitfield]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Rxb1Ctrl {
    /// Which of RXF0 to RXF5 accepted the message.
    #[skip(setters)]
    pub filhit: B3,
    #[skip(setters)]
    pub rxrtr: bool,
    #[skip]
    __: B1,
    pub rxm: RecvBufOpMode,
    #[skip]
    __: B1,
}

impl Rxb1Ctrl {
    pub const MASK_RXM: Self = Self::from_bytes([0b0110_0000]);
}

impl BitModifiable for Rxb1Ctrl {}

/// Control register of a transmit buffer (`TXBnCTRL`). Its address depends
/// on the buffer, see [`crate::buffer::TxBuf::ctrl`].
#[bitfield]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TxbCtrl {
    pub txp: TxBufPriority,
    #[skip]
    __: B1,
    pub txreq: bool,
    #[skip(setters)]
    pub txerr: bool,
    #[skip(setters)]
    pub mloa: bool,
    #[skip(setters)]
    pub abtf: bool,
    #[skip]
    __: B1,
}

impl TxbCtrl {
    pub const MASK_TXREQ: Self = Self::from_bytes([0b0000_1000]);

    /// Whether the chip reported a failed, lost or aborted transmission.
    pub fn failed(&self) -> bool {
        self.abtf() || self.mloa() || self.txerr()
    }
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, BitfieldSpecifier)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[bits = 2]
pub enum TxBufPriority {
    Low,
    LowIntermediate,
    HighIntermediate,
    High,
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, BitfieldSpecifier)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "ufmt", derive(ufmt::derive::uDebug))]
#[bits = 2]
pub enum RecvBufOpMode {
    /// Accept what the masks and filters let through.
    FilterOn = 0x0,
    /// Accept every message.
    FilterOff = 0x3,
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, BitfieldSpecifier)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "ufmt", derive(ufmt::derive::uDebug))]
#[bits = 3]
pub enum OpMode {
    Normal,
    Sleep,
    Loopback,
    ListenOnly,
    Configuration,
}

impl TryFrom<u8> for OpMode {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, u8> {
        match value {
            0 => Ok(OpMode::Normal),
            1 => Ok(OpMode::Sleep),
            2 => Ok(OpMode::Loopback),
            3 => Ok(OpMode::ListenOnly),
            4 => Ok(OpMode::Configuration),
            other => Err(other),
        }
    }
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, BitfieldSpecifier)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[bits = 2]
pub enum ClkPre {
    Div1,
    Div2,
    Div4,
    Div8,
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, BitfieldSpecifier)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[bits = 3]
pub enum IntFlagCode {
    None,
    Error,
    WakeUp,
    TXB0,
    TXB1,
    TXB2,
    RXB0,
    RXB1,
}

macro_rules! reg {
    ($($s:ty => $reg:expr),*) => {
        $(
            impl Reg for $s {
                const ADDRESS: u8 = $reg;

                #[inline]
                fn read(content: u8) -> Self {
                    Self::from_bytes([content])
                }

                #[inline]
                fn write(self) -> u8 {
                    self.into_bytes()[0]
                }
            }
        )*
    };
}

reg! {
    CanCtrl => Register::CANCTRL.addr(),
    CanStat => Register::CANSTAT.addr(),
    Cnf1 => Register::CNF1.addr(),
    Cnf2 => Register::CNF2.addr(),
    Cnf3 => Register::CNF3.addr(),
    Rxb0Ctrl => RxBuf::B0.ctrl(),
    Rxb1Ctrl => RxBuf::B1.ctrl()
}
