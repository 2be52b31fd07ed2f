//! Transmit and receive buffer register blocks.
//!
//! The MCP2515 exposes three transmit buffers at `0x30`, `0x40`, `0x50` and
//! two receive buffers at `0x60`, `0x70`. Every block has the same layout:
//!
//! | offset | register |
//! |--------|----------|
//! | 0      | CTRL     |
//! | 1      | SIDH     |
//! | 2      | SIDL     |
//! | 3      | EID8     |
//! | 4      | EID0     |
//! | 5      | DLC      |
//! | 6..=13 | D0..D7   |

/// Distance between two consecutive buffer blocks.
pub const BLOCK_STRIDE: u8 = 16;

/// Number of data registers in a buffer block.
pub const DATA_LEN: u8 = 8;

/// Which family of buffers a block belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "ufmt", derive(ufmt::derive::uDebug))]
pub enum BufferRole {
    Tx,
    Rx,
}

impl BufferRole {
    /// Address of the first block of this role.
    pub const fn base(self) -> u8 {
        match self {
            BufferRole::Tx => 0x30,
            BufferRole::Rx => 0x60,
        }
    }

    /// Number of buffers the chip provides for this role.
    pub const fn count(self) -> u8 {
        match self {
            BufferRole::Tx => 3,
            BufferRole::Rx => 2,
        }
    }
}

/// A register inside a buffer block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Field {
    Ctrl,
    Sidh,
    Sidl,
    Eid8,
    Eid0,
    Dlc,
    /// Data byte `n`, 0 to 7.
    Data(u8),
}

impl Field {
    /// Offset of the field from the start of its block, `None` for a data
    /// byte past `D7`.
    pub const fn offset(self) -> Option<u8> {
        match self {
            Field::Data(n) if n >= DATA_LEN => None,
            field => Some(field.raw_offset()),
        }
    }

    /// Offset without the data index check. Only called with fields known to
    /// be in range.
    const fn raw_offset(self) -> u8 {
        match self {
            Field::Ctrl => 0,
            Field::Sidh => 1,
            Field::Sidl => 2,
            Field::Eid8 => 3,
            Field::Eid0 => 4,
            Field::Dlc => 5,
            Field::Data(n) => 6 + n,
        }
    }
}

/// Error computing the address of a buffer register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AddressError {
    /// The chip has no buffer with this index for the role.
    BufferOutOfRange { role: BufferRole, index: u8 },
    /// The field does not exist in a buffer block.
    FieldOutOfRange(Field),
}

/// Computes the address of `field` in buffer `index` of `role`.
///
/// Indices beyond the chip's buffer count are rejected instead of being
/// mapped into a neighbouring block.
pub const fn address(role: BufferRole, index: u8, field: Field) -> Result<u8, AddressError> {
    if index >= role.count() {
        return Err(AddressError::BufferOutOfRange { role, index });
    }
    match field.offset() {
        Some(offset) => Ok(block_base(role, index) + offset),
        None => Err(AddressError::FieldOutOfRange(field)),
    }
}

/// First register of block `index`, unchecked.
const fn block_base(role: BufferRole, index: u8) -> u8 {
    role.base() + BLOCK_STRIDE * index
}

crate::slot_def! {
    /// Transmit buffer.
    TxBuf => {
        /// Tx buffer 0.
        B0 = 0,
        /// Tx buffer 1.
        B1 = 1,
        /// Tx buffer 2.
        B2 = 2
    }
}

crate::slot_def! {
    /// Receive buffer.
    RxBuf => {
        /// Rx buffer 0.
        B0 = 0,
        /// Rx buffer 1.
        B1 = 1
    }
}

macro_rules! block_registers {
    ($name:ident, $role:expr) => {
        impl $name {
            /// Address of the first register of this buffer's block.
            #[inline]
            pub const fn base(self) -> u8 {
                block_base($role, self.index())
            }

            /// Address of `field` in this buffer.
            pub const fn address(self, field: Field) -> Result<u8, AddressError> {
                address($role, self.index(), field)
            }

            /// Returns the `CTRL` register.
            #[inline]
            pub const fn ctrl(self) -> u8 {
                self.base() + Field::Ctrl.raw_offset()
            }

            /// Returns the `SIDH` register, first of the identifier block.
            #[inline]
            pub const fn sidh(self) -> u8 {
                self.base() + Field::Sidh.raw_offset()
            }

            /// Returns the `D0` register, first of the data block.
            #[inline]
            pub const fn data(self) -> u8 {
                self.base() + Field::Data(0).raw_offset()
            }
        }

        impl TryFrom<u8> for $name {
            type Error = AddressError;

            /// Looks up a buffer by its raw index.
            fn try_from(index: u8) -> Result<Self, AddressError> {
                $name::from_index(index).ok_or(AddressError::BufferOutOfRange { role: $role, index })
            }
        }
    };
}

block_registers!(TxBuf, BufferRole::Tx);
block_registers!(RxBuf, BufferRole::Rx);

impl TxBuf {
    /// Bit flagging this buffer in a request-to-send instruction.
    #[inline]
    pub const fn rts_bit(self) -> u8 {
        1 << self.index()
    }
}
