use byteorder::{BigEndian, ByteOrder};
use embedded_hal::can::{ExtendedId, Frame, Id, StandardId};
use log::warn;

use crate::ident::{IdentBlock, MAX_DLC};

/// CAN frame.
///
/// The payload length always matches the stored data: slices longer than
/// eight bytes are truncated when they are copied in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanMessage {
    /// ID of CAN frame.
    pub(crate) id: Id,
    /// Whether the frame is an RTR frame.
    pub(crate) rtr: bool,
    /// Length of data in CAN frame.
    pub(crate) dlc: u8,
    /// Data, maximum 8 bytes.
    pub(crate) data: [u8; 8],
}

#[cfg(feature = "defmt")]
impl defmt::Format for CanMessage {
    fn format(&self, fmt: defmt::Formatter) {
        // [`Id`] does not implement `defmt::Format`
        #[derive(defmt::Format)]
        enum InnerId {
            Standard(u16),
            Extended(u32),
        }

        defmt::write!(
            fmt,
            "CanMessage {{ id: {:#X}, rtr: {}, dlc: {}, data: {:#X} }}",
            match self.id {
                Id::Standard(id) => InnerId::Standard(id.as_raw()),
                Id::Extended(id) => InnerId::Extended(id.as_raw()),
            },
            self.rtr,
            self.dlc,
            self.data()
        );
    }
}

impl CanMessage {
    /// Creates a data frame, keeping at most the first eight bytes of `data`.
    pub fn truncating(id: impl Into<Id>, data: &[u8]) -> Self {
        let mut message = CanMessage {
            id: id.into(),
            rtr: false,
            dlc: 0,
            data: [0; 8],
        };
        message.set_data(data);
        message
    }

    /// Creates an empty data frame from a raw identifier. Returns `None` if
    /// `id` does not fit in 11 bits (standard) or 29 bits (extended).
    pub fn from_raw_id(id: u32, extended: bool) -> Option<Self> {
        raw_id(id, extended).map(|id| Self::truncating(id, &[]))
    }

    /// Raw numeric value of the identifier.
    pub fn raw_id(&self) -> u32 {
        match self.id {
            Id::Standard(id) => u32::from(id.as_raw()),
            Id::Extended(id) => id.as_raw(),
        }
    }

    pub fn set_id(&mut self, id: impl Into<Id>) {
        self.id = id.into();
    }

    /// Replaces the payload, truncating to eight bytes.
    pub fn set_data(&mut self, data: &[u8]) {
        let len = if data.len() > MAX_DLC as usize {
            warn!("Truncating {} byte payload to {}", data.len(), MAX_DLC);
            MAX_DLC as usize
        } else {
            data.len()
        };
        self.data = [0; 8];
        self.data[..len].copy_from_slice(&data[..len]);
        self.dlc = len as u8;
    }

    /// Stores a single byte.
    pub fn set_u8(&mut self, value: u8) {
        self.set_data(&[value]);
    }

    /// Stores a 16 bit value, high byte first.
    pub fn set_u16(&mut self, value: u16) {
        let mut buf = [0; 2];
        BigEndian::write_u16(&mut buf, value);
        self.set_data(&buf);
    }

    /// Stores a 32 bit value, highest byte first.
    pub fn set_u32(&mut self, value: u32) {
        let mut buf = [0; 4];
        BigEndian::write_u32(&mut buf, value);
        self.set_data(&buf);
    }

    pub fn get_u8(&self) -> Option<u8> {
        self.data().first().copied()
    }

    pub fn get_u16(&self) -> Option<u16> {
        self.data().get(..2).map(BigEndian::read_u16)
    }

    pub fn get_u32(&self) -> Option<u32> {
        self.data().get(..4).map(BigEndian::read_u32)
    }

    /// Identifier and length registers, plus the data bytes to write after
    /// them.
    pub fn pack(&self) -> ([u8; 5], &[u8]) {
        (
            IdentBlock::pack(self.id, self.rtr, self.dlc).into_bytes(),
            self.data(),
        )
    }

    /// Rebuilds a frame read from a receive buffer. `data` must hold at least
    /// the length reported by `ident`; extra bytes are ignored.
    pub fn unpack(ident: [u8; 5], data: &[u8]) -> Self {
        let block = IdentBlock::from_bytes(ident);
        if block.is_remote() {
            return CanMessage {
                id: block.id.id(),
                rtr: true,
                dlc: block.len(),
                data: [0; 8],
            };
        }
        let len = usize::from(block.len()).min(data.len());
        Self::truncating(block.id.id(), &data[..len])
    }
}

/// Validates a raw identifier for the requested format.
pub fn raw_id(id: u32, extended: bool) -> Option<Id> {
    if extended {
        ExtendedId::new(id).map(Id::Extended)
    } else {
        u16::try_from(id)
            .ok()
            .and_then(StandardId::new)
            .map(Id::Standard)
    }
}

impl Frame for CanMessage {
    fn new(id: impl Into<Id>, data: &[u8]) -> Option<Self> {
        if data.len() > MAX_DLC as usize {
            return None;
        }
        Some(CanMessage::truncating(id, data))
    }

    fn new_remote(id: impl Into<Id>, dlc: usize) -> Option<Self> {
        if dlc > MAX_DLC as usize {
            return None;
        }
        Some(CanMessage {
            id: id.into(),
            rtr: true,
            dlc: dlc as u8, // Already asserted dlc <= 8
            data: [0; 8],
        })
    }

    #[inline]
    fn is_extended(&self) -> bool {
        matches!(self.id, Id::Extended(_))
    }

    #[inline]
    fn is_remote_frame(&self) -> bool {
        self.rtr
    }

    #[inline]
    fn id(&self) -> Id {
        self.id
    }

    #[inline]
    fn dlc(&self) -> usize {
        self.dlc as usize
    }

    #[inline]
    fn data(&self) -> &[u8] {
        // Remote frames carry a length but no data.
        if self.rtr {
            &[]
        } else {
            &self.data[..self.dlc()]
        }
    }
}
