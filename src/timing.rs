//! Bit timing configuration (`CNF1`, `CNF2`, `CNF3`).
//!
//! One nominal bit time is split into time quanta: a one-quantum sync
//! segment, then the propagation, phase 1 and phase 2 segments. The segment
//! lengths are fixed so that a bit always lasts 16 quanta, and the bus speed
//! is selected with the baud rate prescaler alone:
//!
//! ```text
//! bit rate = F_osc / (2 * (BRP + 1) * 16)
//! ```
//!
//! With the 16 MHz oscillator this driver is tuned for, the supported
//! [`BitRate`]s map to integral prescalers.

use crate::regs::{Cnf1, Cnf2, Cnf3};

/// Number of time quanta in one nominal bit time.
pub const NOMINAL_BIT_QUANTA: u8 = 16;

/// Oscillator frequency the prescaler table is computed for.
pub const OSCILLATOR_HZ: u32 = 16_000_000;

/// Supported CAN bus bit rates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "ufmt", derive(ufmt::derive::uDebug))]
pub enum BitRate {
    Bps500000,
    Bps250000,
    Bps125000,
    Bps100000,
    Bps62500,
    Bps50000,
    Bps31250,
    Bps25000,
    Bps20000,
    Bps15625,
}

impl BitRate {
    pub const ALL: [BitRate; 10] = [
        BitRate::Bps500000,
        BitRate::Bps250000,
        BitRate::Bps125000,
        BitRate::Bps100000,
        BitRate::Bps62500,
        BitRate::Bps50000,
        BitRate::Bps31250,
        BitRate::Bps25000,
        BitRate::Bps20000,
        BitRate::Bps15625,
    ];

    /// Bus speed in bits per second.
    pub const fn bps(self) -> u32 {
        match self {
            BitRate::Bps500000 => 500_000,
            BitRate::Bps250000 => 250_000,
            BitRate::Bps125000 => 125_000,
            BitRate::Bps100000 => 100_000,
            BitRate::Bps62500 => 62_500,
            BitRate::Bps50000 => 50_000,
            BitRate::Bps31250 => 31_250,
            BitRate::Bps25000 => 25_000,
            BitRate::Bps20000 => 20_000,
            BitRate::Bps15625 => 15_625,
        }
    }

    /// Value of the `BRP` field for this rate.
    pub const fn prescaler(self) -> u8 {
        match self {
            BitRate::Bps500000 => 0,
            BitRate::Bps250000 => 1,
            BitRate::Bps125000 => 3,
            BitRate::Bps100000 => 4,
            BitRate::Bps62500 => 7,
            BitRate::Bps50000 => 9,
            BitRate::Bps31250 => 15,
            BitRate::Bps25000 => 19,
            BitRate::Bps20000 => 24,
            BitRate::Bps15625 => 31,
        }
    }

    /// Looks up a supported rate, `None` for any other speed.
    pub fn from_bps(bps: u32) -> Option<Self> {
        BitRate::ALL.iter().copied().find(|rate| rate.bps() == bps)
    }
}

impl TryFrom<u32> for BitRate {
    type Error = u32;

    fn try_from(bps: u32) -> Result<Self, u32> {
        BitRate::from_bps(bps).ok_or(bps)
    }
}

/// Time quanta allotted to each part of a bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "ufmt", derive(ufmt::derive::uDebug))]
pub struct SegmentLengths {
    /// Synchronization jump width, 1-4.
    pub sync_jump_width: u8,
    /// Propagation segment, 1-8.
    pub prop_seg: u8,
    /// Phase segment 1, 1-8.
    pub phase1: u8,
    /// Phase segment 2, 1-8.
    pub phase2: u8,
}

impl Default for SegmentLengths {
    fn default() -> Self {
        Self {
            sync_jump_width: 1,
            prop_seg: 5,
            phase1: 5,
            phase2: 5,
        }
    }
}

impl SegmentLengths {
    /// Total quanta in one bit, including the sync segment.
    pub fn total_quanta(&self) -> u16 {
        1 + u16::from(self.prop_seg) + u16::from(self.phase1) + u16::from(self.phase2)
    }

    fn validate(&self) -> Result<(), TimingError> {
        let segment_ok = |len: u8| (1..=8).contains(&len);
        if !(1..=4).contains(&self.sync_jump_width)
            || !segment_ok(self.prop_seg)
            || !segment_ok(self.phase1)
            || !segment_ok(self.phase2)
        {
            return Err(TimingError::SegmentOutOfRange(*self));
        }
        let total = self.total_quanta();
        if total != u16::from(NOMINAL_BIT_QUANTA) {
            return Err(TimingError::QuantaMismatch(total));
        }
        Ok(())
    }
}

/// Segment lengths that cannot be programmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimingError {
    /// A segment or the jump width is outside what the registers hold.
    SegmentOutOfRange(SegmentLengths),
    /// The segments add up to this many quanta instead of 16.
    QuantaMismatch(u16),
}

/// Contents of the three bit timing registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TimingConfig {
    pub cnf1: Cnf1,
    pub cnf2: Cnf2,
    pub cnf3: Cnf3,
}

impl TimingConfig {
    /// Derives the timing registers for `rate`, sampling once per bit with
    /// the wake-up filter disabled.
    pub fn new(rate: BitRate, segments: SegmentLengths) -> Result<Self, TimingError> {
        segments.validate()?;
        Ok(Self {
            cnf1: Cnf1::new()
                .with_brp(rate.prescaler())
                .with_sjw(segments.sync_jump_width - 1),
            cnf2: Cnf2::new()
                .with_prseg(segments.prop_seg - 1)
                .with_phseg1(segments.phase1 - 1)
                .with_sam(false)
                .with_btlmode(true),
            cnf3: Cnf3::new()
                .with_phseg2(segments.phase2 - 1)
                .with_wakfil(false),
        })
    }

    /// Register contents in address order, starting at `CNF3`.
    pub fn into_bytes(self) -> [u8; 3] {
        [
            self.cnf3.into_bytes()[0],
            self.cnf2.into_bytes()[0],
            self.cnf1.into_bytes()[0],
        ]
    }
}
