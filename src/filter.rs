//! Acceptance masks and filters.
//!
//! Each mask and filter occupies four registers (`SIDH`, `SIDL`, `EID8`,
//! `EID0`) holding an identifier in the same layout as a buffer. Mask 0
//! applies to filters 0 and 1 (receive buffer 0), mask 1 to filters 2 to 5
//! (receive buffer 1).

use embedded_hal::can::Id;

use crate::{ident::IdRegs, regs::Register};

/// Filter register block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RxFilterReg(IdRegs);

impl RxFilterReg {
    /// Creates an Rx filter register from a CAN bus ID.
    ///
    /// An extended ID sets the `EXIDE` bit, which restricts the filter to
    /// extended frames. A standard filter only matches standard frames, so
    /// accepting both kinds takes one filter of each.
    pub fn from_id(id: Id) -> Self {
        RxFilterReg(IdRegs::from_id(id, matches!(id, Id::Extended(_))))
    }

    /// Whether the filter matches extended frames.
    pub fn is_extended(&self) -> bool {
        self.0.is_extended()
    }

    pub fn into_bytes(self) -> [u8; 4] {
        self.0.into_bytes()
    }
}

/// Mask register block. Masks have no `EXIDE` bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RxMaskReg(IdRegs);

impl RxMaskReg {
    /// Creates an Rx mask register from a CAN bus ID.
    pub fn from_id(id: Id) -> Self {
        RxMaskReg(IdRegs::from_id(id, false))
    }

    pub fn into_bytes(self) -> [u8; 4] {
        self.0.into_bytes()
    }
}

crate::slot_def! {
    /// Receive filters.
    RxFilter => {
        /// RXF0
        F0 = 0,
        /// RXF1
        F1 = 1,
        /// RXF2
        F2 = 2,
        /// RXF3
        F3 = 3,
        /// RXF4
        F4 = 4,
        /// RXF5
        F5 = 5
    }
}

impl RxFilter {
    /// Returns the `SIDH` register of the filter. Filters 3 to 5 sit after
    /// `CANSTAT`/`CANCTRL` at `0x0E`/`0x0F`, so their blocks are shifted by
    /// four.
    pub const fn sidh(self) -> Register {
        match self {
            RxFilter::F0 => Register::RXF0SIDH,
            RxFilter::F1 => Register::RXF1SIDH,
            RxFilter::F2 => Register::RXF2SIDH,
            RxFilter::F3 => Register::RXF3SIDH,
            RxFilter::F4 => Register::RXF4SIDH,
            RxFilter::F5 => Register::RXF5SIDH,
        }
    }
}

crate::slot_def! {
    /// Receive masks.
    RxMask => {
        /// Mask 0
        Mask0 = 0,
        /// Mask 1
        Mask1 = 1
    }
}

impl RxMask {
    /// Returns the `SIDH` register of the mask.
    pub const fn sidh(self) -> Register {
        match self {
            RxMask::Mask0 => Register::RXM0SIDH,
            RxMask::Mask1 => Register::RXM1SIDH,
        }
    }
}
