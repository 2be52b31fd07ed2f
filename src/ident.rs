//! Packing of CAN identifiers into the `SIDH`, `SIDL`, `EID8`, `EID0` (and
//! `DLC`) register layout shared by the buffers, masks and filters.
//!
//! A standard identifier occupies `SIDH` (bits 10..3) and the top three bits
//! of `SIDL` (bits 2..0). An extended identifier puts its upper eleven bits in
//! the same place, bits 17..16 in the bottom two bits of `SIDL` and bits 15..0
//! in `EID8:EID0`.

use embedded_hal::can::{ExtendedId, Id, StandardId};
use log::warn;
use modular_bitfield::prelude::*;

/// Largest payload a classic CAN frame carries.
pub const MAX_DLC: u8 = 8;

/// `SIDL` register.
#[bitfield]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SidL {
    /// Extended identifier bits 17..16.
    pub eid_hi: B2,
    #[skip]
    __: B1,
    /// Extended identifier enable (`IDE` on receive).
    pub exide: bool,
    /// Standard frame remote transmit request, receive only.
    pub srr: bool,
    /// Standard identifier bits 2..0.
    pub sid_lo: B3,
}

/// `DLC` register.
#[bitfield]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DlcReg {
    /// Data length code, 0-8. Anything above 8 is treated as 8.
    pub dlc: B4,
    #[skip]
    __: B2,
    /// Remote transmission request.
    pub rtr: bool,
    #[skip]
    __: B1,
}

/// The four identifier registers of a buffer, mask or filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct IdRegs {
    pub sidh: u8,
    pub sidl: SidL,
    pub eid8: u8,
    pub eid0: u8,
}

impl IdRegs {
    /// Lays out `id` in register form. `exide` controls the extended
    /// identifier enable bit independently of the identifier kind, since masks
    /// never carry it.
    pub fn from_id(id: Id, exide: bool) -> Self {
        match id {
            Id::Standard(id) => {
                let raw = id.as_raw();
                IdRegs {
                    sidh: (raw >> 3) as u8,
                    sidl: SidL::new()
                        .with_sid_lo((raw & 0x07) as u8)
                        .with_exide(exide),
                    eid8: 0,
                    eid0: 0,
                }
            }
            Id::Extended(id) => {
                let raw = id.as_raw();
                IdRegs {
                    sidh: (raw >> 21) as u8,
                    sidl: SidL::new()
                        .with_sid_lo(((raw >> 18) & 0x07) as u8)
                        .with_eid_hi(((raw >> 16) & 0x03) as u8)
                        .with_exide(exide),
                    eid8: (raw >> 8) as u8,
                    eid0: raw as u8,
                }
            }
        }
    }

    /// Whether the identifier is extended, as reported by the `IDE` bit.
    #[inline]
    pub fn is_extended(&self) -> bool {
        self.sidl.exide()
    }

    /// Reassembles the identifier.
    pub fn id(&self) -> Id {
        let sid = (u16::from(self.sidh) << 3) | u16::from(self.sidl.sid_lo());
        if self.is_extended() {
            let raw = (u32::from(sid) << 18)
                | (u32::from(self.sidl.eid_hi()) << 16)
                | (u32::from(self.eid8) << 8)
                | u32::from(self.eid0);
            // At most 11 + 18 bits are assembled above.
            Id::Extended(ExtendedId::new(raw).unwrap_or(ExtendedId::MAX))
        } else {
            Id::Standard(StandardId::new(sid).unwrap_or(StandardId::MAX))
        }
    }

    pub fn into_bytes(self) -> [u8; 4] {
        [self.sidh, self.sidl.into_bytes()[0], self.eid8, self.eid0]
    }

    pub fn from_bytes(bytes: [u8; 4]) -> Self {
        IdRegs {
            sidh: bytes[0],
            sidl: SidL::from_bytes([bytes[1]]),
            eid8: bytes[2],
            eid0: bytes[3],
        }
    }
}

/// The five-register identifier and length block of a transmit or receive
/// buffer, `SIDH` through `DLC`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct IdentBlock {
    pub id: IdRegs,
    pub dlc: DlcReg,
}

impl IdentBlock {
    /// Builds the block for a frame. Lengths above 8 are clamped.
    pub fn pack(id: Id, rtr: bool, len: u8) -> Self {
        let extended = matches!(id, Id::Extended(_));
        if len > MAX_DLC {
            warn!("Clamping data length {} to {}", len, MAX_DLC);
        }
        IdentBlock {
            id: IdRegs::from_id(id, extended),
            dlc: DlcReg::new().with_dlc(len.min(MAX_DLC)).with_rtr(rtr),
        }
    }

    /// Payload length, clamped to 8 whatever the chip reports.
    pub fn len(&self) -> u8 {
        let dlc = self.dlc.dlc();
        if dlc > MAX_DLC {
            warn!("Chip reported data length {}, clamping to {}", dlc, MAX_DLC);
            MAX_DLC
        } else {
            dlc
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether a received frame is a remote frame. Extended frames carry the
    /// flag in `DLC`, standard frames in the `SRR` bit of `SIDL`.
    pub fn is_remote(&self) -> bool {
        if self.id.is_extended() {
            self.dlc.rtr()
        } else {
            self.id.sidl.srr()
        }
    }

    pub fn into_bytes(self) -> [u8; 5] {
        let [sidh, sidl, eid8, eid0] = self.id.into_bytes();
        [sidh, sidl, eid8, eid0, self.dlc.into_bytes()[0]]
    }

    pub fn from_bytes(bytes: [u8; 5]) -> Self {
        IdentBlock {
            id: IdRegs::from_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            dlc: DlcReg::from_bytes([bytes[4]]),
        }
    }
}
