#![cfg_attr(not(test), no_std)]

//! Register-level driver for the MCP2515 stand-alone CAN controller.
//!
//! The chip is driven over SPI (mode 0, MSB first) with a dedicated
//! chip-select pin. Every register access is one chip-select bracketed
//! transaction: an instruction byte, an address and the payload.
//!
//! ```ignore
//! let mut can = MCP2515::new(spi, cs);
//! can.init(&mut delay, Settings { mode: OpMode::Loopback, ..Default::default() })?;
//!
//! let mut message = CanMessage::truncating(StandardId::new(0x123).unwrap(), &[]);
//! message.set_u16(0xDEAD);
//! let buf = can.send(message)?;
//! nb::block!(can.poll_transmit(buf))?;
//!
//! if can.available()? {
//!     let received = can.get_message()?;
//! }
//! ```

pub mod buffer;
pub mod error;
pub mod filter;
pub mod frame;
pub mod ident;
pub(crate) mod macros;
pub mod regs;
pub mod stat;
pub mod timing;

#[cfg(test)]
pub(crate) mod mocks;
#[cfg(test)]
mod tests;

use core::fmt::Debug;

use buffer::{RxBuf, TxBuf};
use embedded_hal::{
    blocking::{delay::DelayMs, spi::Transfer},
    can::{ExtendedId, Frame, Id, StandardId},
    digital::v2::OutputPin,
};
use filter::{RxFilter, RxFilterReg, RxMask, RxMaskReg};
use frame::CanMessage;
use log::{debug, trace, warn};
use regs::{OpMode, RecvBufOpMode, Register};
use stat::{IntFlags, Status};
use timing::{BitRate, SegmentLengths, TimingConfig};

use crate::{
    error::{Error, Result},
    ident::{IdentBlock, MAX_DLC},
    regs::{BitModifiable, CanCtrl, CanStat, Reg, Rxb0Ctrl, Rxb1Ctrl, TxbCtrl},
};

#[repr(u8)]
enum Instruction {
    Write = 0x02,
    Read = 0x03,
    Bitmod = 0x05,
    Rts = 0x80,
    ReadStatus = 0xA0,
    Reset = 0xC0,
}

/// Bytes moved per SPI transfer call after the instruction header.
const CHUNK_LEN: usize = 16;

/// Number of `CANSTAT` polls before a mode change is considered failed.
const MODE_POLLS: usize = 20;

/// Settings used to initialize the MCP2515.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Settings {
    /// Device operation mode.
    pub mode: OpMode,
    /// CAN bus bit rate.
    pub bit_rate: BitRate,
    /// Time quanta per bit segment. Must add up to 16 with the sync segment.
    pub segments: SegmentLengths,
    /// How both receive buffers apply the masks and filters.
    pub rx_mode: RecvBufOpMode,
    /// Let a message arriving while RXB0 is full roll over into RXB1.
    pub rollover: bool,
    /// Whether to enable the CLKOUT pin.
    pub clkout_en: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            mode: OpMode::Normal,
            bit_rate: BitRate::Bps500000,
            segments: SegmentLengths::default(),
            rx_mode: RecvBufOpMode::FilterOn,
            rollover: true,
            clkout_en: false,
        }
    }
}

/// MCP2515 driver.
pub struct MCP2515<SPI, CS> {
    /// SPI interface to interact with the MCP2515.
    spi: SPI,
    /// Chip select pin to select the MCP2515.
    cs: CS,
    /// Tx buffers with a transmission requested and not yet seen complete,
    /// one bit per buffer index.
    pending: u8,
}

impl<SPI, CS, SPIE, CSE> MCP2515<SPI, CS>
where
    SPI: Transfer<u8, Error = SPIE>,
    CS: OutputPin<Error = CSE>,
    SPIE: Debug,
    CSE: Debug,
{
    /// Creates a new MCP2515 driver. The chip is not touched until
    /// [`MCP2515::init`] is called.
    ///
    /// The SPI interface must be configured by the caller: MSB first, mode 0,
    /// at most 10 MHz.
    pub fn new(spi: SPI, cs: CS) -> Self {
        Self {
            spi,
            cs,
            pending: 0,
        }
    }

    /// Releases the SPI interface and chip select pin.
    pub fn release(self) -> (SPI, CS) {
        (self.spi, self.cs)
    }

    /// Initializes the MCP2515. This should be called once at the start of
    /// the program, and again to recover from an interrupted configuration.
    ///
    /// The chip is reset, given the requested bit timing, its transmit
    /// buffers are cleared and the masks and filters are opened so that every
    /// standard and extended frame is accepted. It is then switched to
    /// `settings.mode`.
    ///
    /// Invalid segment lengths are reported before anything is sent to the
    /// chip.
    pub fn init(&mut self, delay: &mut impl DelayMs<u8>, settings: Settings) -> Result<(), SPIE, CSE> {
        let timing = TimingConfig::new(settings.bit_rate, settings.segments)?;
        debug!("Initializing MCP2515 at {} bps", settings.bit_rate.bps());

        self.cs.set_high().map_err(Error::Hal)?;
        self.reset(delay)?;

        self.set_mode(OpMode::Configuration)?;
        self.set_bitrate(&timing)?;
        self.set_clken(settings.clkout_en)?;

        // Clear Tx registers (TXB{0,1,2}CTRL + 14)
        let zeros = [0u8; 14];
        for buf in TxBuf::ALL {
            self.write_registers(buf.ctrl(), &zeros)?;
        }
        self.pending = 0;

        self.write_register(
            Rxb0Ctrl::new()
                .with_rxm(settings.rx_mode)
                .with_bukt(settings.rollover),
        )?;
        self.write_register(Rxb1Ctrl::new().with_rxm(settings.rx_mode))?;

        // A zero mask lets everything through; F1 is extended so RXB0 also
        // takes extended frames when filtering is on.
        for mask in RxMask::ALL {
            self.set_mask(mask, Id::Standard(StandardId::ZERO))?;
        }
        for filt in RxFilter::ALL {
            let id = if filt == RxFilter::F1 {
                Id::Extended(ExtendedId::ZERO)
            } else {
                Id::Standard(StandardId::ZERO)
            };
            self.set_filter(filt, id)?;
        }

        self.set_mode(settings.mode)
    }

    /// Resets the MCP2515. All registers return to their power-on values and
    /// the chip enters configuration mode.
    pub fn reset(&mut self, delay: &mut impl DelayMs<u8>) -> Result<(), SPIE, CSE> {
        trace!("RESET");
        self.transfer(&mut [Instruction::Reset as u8])?;
        // The oscillator needs time to restart before the chip responds.
        delay.delay_ms(5);
        self.pending = 0;
        Ok(())
    }

    /// Requests a new operation mode and waits until `CANSTAT` reports it.
    pub fn set_mode(&mut self, mode: OpMode) -> Result<(), SPIE, CSE> {
        debug!("Requesting mode {:?}", mode);
        self.modify_register(CanCtrl::new().with_reqop(mode), CanCtrl::MASK_REQOP)?;

        for _ in 0..MODE_POLLS {
            let canstat: CanStat = self.read_register()?;
            if matches!(canstat.opmod_or_err(), Ok(current) if current == mode) {
                return Ok(());
            }
        }

        Err(Error::NewModeTimeout)
    }

    /// Like [`MCP2515::set_mode`] with a raw `REQOP` value. Values that name
    /// no mode leave the chip untouched.
    pub fn set_mode_raw(&mut self, mode: u8) -> Result<(), SPIE, CSE> {
        let mode = OpMode::try_from(mode).map_err(Error::InvalidMode)?;
        self.set_mode(mode)
    }

    /// Reads the current operation mode from `CANSTAT`.
    pub fn op_mode(&mut self) -> Result<Option<OpMode>, SPIE, CSE> {
        let canstat: CanStat = self.read_register()?;
        Ok(canstat.opmod_or_err().ok())
    }

    /// Writes the bit timing registers. Only takes effect in configuration
    /// mode.
    pub fn set_bitrate(&mut self, timing: &TimingConfig) -> Result<(), SPIE, CSE> {
        // CNF3, CNF2 and CNF1 are consecutive.
        self.write_registers(Register::CNF3.addr(), &timing.into_bytes())
    }

    /// Programs the timing for a bit rate given in bits per second, using the
    /// default segment lengths. Rates without an entry in [`BitRate`] are
    /// rejected without touching the chip.
    pub fn set_bitrate_bps(&mut self, bps: u32) -> Result<(), SPIE, CSE> {
        let rate = BitRate::try_from(bps).map_err(Error::UnsupportedBitRate)?;
        let timing = TimingConfig::new(rate, SegmentLengths::default())?;
        self.set_bitrate(&timing)
    }

    /// Enables/disables the `CLKOUT` pin on the MCP2515.
    fn set_clken(&mut self, clken: bool) -> Result<(), SPIE, CSE> {
        self.modify_register(CanCtrl::new().with_clken(clken), CanCtrl::MASK_CLKEN)
    }

    /// Sets a receive filter. Only takes effect in configuration mode.
    pub fn set_filter(&mut self, filter: RxFilter, id: Id) -> Result<(), SPIE, CSE> {
        let data = RxFilterReg::from_id(id).into_bytes();
        self.write_registers(filter.sidh().addr(), &data)
    }

    /// Sets a receive mask. Only takes effect in configuration mode.
    pub fn set_mask(&mut self, mask: RxMask, id: Id) -> Result<(), SPIE, CSE> {
        let data = RxMaskReg::from_id(id).into_bytes();
        self.write_registers(mask.sidh().addr(), &data)
    }

    /// Changes how a receive buffer applies masks and filters.
    pub fn set_rx_mode(&mut self, buf: RxBuf, mode: RecvBufOpMode) -> Result<(), SPIE, CSE> {
        match buf {
            RxBuf::B0 => self.modify_register(Rxb0Ctrl::new().with_rxm(mode), Rxb0Ctrl::MASK_RXM),
            RxBuf::B1 => self.modify_register(Rxb1Ctrl::new().with_rxm(mode), Rxb1Ctrl::MASK_RXM),
        }
    }

    /// Sends a CAN message via any available Tx buffer, returning the buffer
    /// used.
    pub fn send(&mut self, message: CanMessage) -> Result<TxBuf, SPIE, CSE> {
        let buf = self.find_free_tx_buf()?;
        self.send_via(buf, message)?;
        Ok(buf)
    }

    /// Sends `payload` with identifier `id`. Unlike [`CanMessage`] setters,
    /// payloads longer than eight bytes are rejected instead of truncated.
    pub fn send_payload(&mut self, id: Id, payload: &[u8]) -> Result<TxBuf, SPIE, CSE> {
        let message = CanMessage::new(id, payload).ok_or(Error::PayloadTooLong(payload.len()))?;
        self.send(message)
    }

    /// Sends a CAN message via a specific Tx buffer.
    pub fn send_via(&mut self, buf: TxBuf, message: CanMessage) -> Result<(), SPIE, CSE> {
        self.load_message(buf, &message)?;
        self.request_to_send(buf)?;

        let ctrl = self.read_txb_ctrl(buf)?;
        if ctrl.failed() {
            warn!("Transmission from {:?} failed: {:?}", buf, ctrl);
            Err(Error::TxFailed)
        } else {
            Ok(())
        }
    }

    /// Writes a message into a Tx buffer without requesting transmission.
    pub fn load_message(&mut self, buf: TxBuf, message: &CanMessage) -> Result<(), SPIE, CSE> {
        let (ident, data) = message.pack();
        trace!("Loading {:?} with {:02x?} {:02x?}", buf, ident, data);
        self.write_registers(buf.sidh(), &ident)?;
        self.write_registers(buf.data(), data)
    }

    /// Flags a loaded Tx buffer for transmission by setting `TXREQ`.
    pub fn request_to_send(&mut self, buf: TxBuf) -> Result<(), SPIE, CSE> {
        let mask = TxbCtrl::MASK_TXREQ.into_bytes()[0];
        self.bit_modify(buf.ctrl(), mask, mask)?;
        self.pending |= buf.rts_bit();
        Ok(())
    }

    /// [`MCP2515::request_to_send`] for a buffer given by raw index. Indices
    /// the chip does not have fail with [`Error::Address`] without bus
    /// traffic.
    pub fn request_to_send_at(&mut self, index: u8) -> Result<TxBuf, SPIE, CSE> {
        let buf = TxBuf::try_from(index)?;
        self.request_to_send(buf)?;
        Ok(buf)
    }

    /// Flags several loaded Tx buffers at once with the RTS instruction.
    pub fn request_to_send_many(&mut self, bufs: &[TxBuf]) -> Result<(), SPIE, CSE> {
        let bits = bufs.iter().fold(0, |bits, buf| bits | buf.rts_bit());
        if bits == 0 {
            return Ok(());
        }
        trace!("RTS {:#05b}", bits);
        self.transfer(&mut [Instruction::Rts as u8 | bits])?;
        self.pending |= bits;
        Ok(())
    }

    /// Attempts to find a free Tx buffer, checking the `TXREQ` bits reported
    /// by one READ STATUS.
    ///
    /// # Returns
    ///
    /// An available Tx buffer on success, error if all Tx buffers were busy.
    pub fn find_free_tx_buf(&mut self) -> Result<TxBuf, SPIE, CSE> {
        let status = self.read_status()?;
        TxBuf::ALL
            .into_iter()
            .find(|&buf| !status.tx_pending(buf))
            .ok_or(Error::TxBusy)
    }

    /// Whether any Tx buffer can take a new message.
    pub fn ready(&mut self) -> Result<bool, SPIE, CSE> {
        match self.find_free_tx_buf() {
            Ok(_) => Ok(true),
            Err(Error::TxBusy) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Whether `TXREQ` of `buf` is clear, meaning its last transmission
    /// finished or none was requested.
    pub fn transmit_complete(&mut self, buf: TxBuf) -> Result<bool, SPIE, CSE> {
        Ok(!self.read_txb_ctrl(buf)?.txreq())
    }

    /// Polls a transmission started with [`MCP2515::request_to_send`].
    ///
    /// Blocks while the chip still holds `TXREQ`, succeeds once when it
    /// clears, and reports [`Error::TxIdle`] afterwards until the next
    /// request.
    pub fn poll_transmit(&mut self, buf: TxBuf) -> nb::Result<(), Error<SPIE, CSE>> {
        if self.pending & buf.rts_bit() == 0 {
            return Err(nb::Error::Other(Error::TxIdle));
        }
        if !self.transmit_complete(buf)? {
            return Err(nb::Error::WouldBlock);
        }
        self.pending &= !buf.rts_bit();
        debug!("{:?} transmission complete", buf);
        Ok(())
    }

    /// Whether any Rx buffer holds a message.
    pub fn available(&mut self) -> Result<bool, SPIE, CSE> {
        Ok(self
            .interrupt_flags()?
            .intersects(IntFlags::RX0IF | IntFlags::RX1IF))
    }

    /// Whether `buf` holds a message.
    pub fn message_received(&mut self, buf: RxBuf) -> Result<bool, SPIE, CSE> {
        Ok(self.interrupt_flags()?.contains(IntFlags::rx(buf)))
    }

    /// Reads a message from the Rx buffers, `RXB0` first.
    pub fn get_message(&mut self) -> Result<CanMessage, SPIE, CSE> {
        match self.read_status()?.full_rx_buf() {
            Some(buf) => self.read_message_from(buf),
            None => Err(Error::NoMessage),
        }
    }

    /// Reads a message from a specific Rx buffer and marks the buffer free.
    pub fn read_message_from(&mut self, buf: RxBuf) -> Result<CanMessage, SPIE, CSE> {
        let mut ident = [0u8; 5];
        self.read_registers(buf.sidh(), &mut ident)?;

        let mut data = [0u8; MAX_DLC as usize];
        let len = IdentBlock::from_bytes(ident).len() as usize;
        if len > 0 {
            self.read_registers(buf.data(), &mut data[..len])?;
        }
        let message = CanMessage::unpack(ident, &data[..len]);

        self.clear_received(buf)?;
        debug!("Received {:?} from {:?}", message, buf);
        Ok(message)
    }

    /// [`MCP2515::read_message_from`] for a buffer given by raw index. Indices
    /// the chip does not have fail with [`Error::Address`] without bus
    /// traffic.
    pub fn read_message_at(&mut self, index: u8) -> Result<CanMessage, SPIE, CSE> {
        let buf = RxBuf::try_from(index)?;
        self.read_message_from(buf)
    }

    /// Clears the "message received" flag of `buf`, freeing it for the next
    /// frame.
    pub fn clear_received(&mut self, buf: RxBuf) -> Result<(), SPIE, CSE> {
        self.bit_modify(Register::CANINTF.addr(), IntFlags::rx(buf).bits(), 0)
    }

    /// Reads `CANINTF`.
    pub fn interrupt_flags(&mut self) -> Result<IntFlags, SPIE, CSE> {
        let mut buf = [0u8; 1];
        self.read_registers(Register::CANINTF.addr(), &mut buf)?;
        Ok(IntFlags::from_bits_truncate(buf[0]))
    }

    /// Reads the transmit and receive error counters (`TEC`, `REC`).
    pub fn read_error_counters(&mut self) -> Result<(u8, u8), SPIE, CSE> {
        let mut buf = [0u8; 2];
        self.read_registers(Register::TEC.addr(), &mut buf)?;
        Ok((buf[0], buf[1]))
    }

    /// Read the `CTRL` register of a Tx buffer.
    fn read_txb_ctrl(&mut self, buf: TxBuf) -> Result<TxbCtrl, SPIE, CSE> {
        let mut ret = [0u8; 1];
        self.read_registers(buf.ctrl(), &mut ret)?;
        Ok(TxbCtrl::from_bytes(ret))
    }

    /// Reads the status register.
    pub fn read_status(&mut self) -> Result<Status, SPIE, CSE> {
        let status = self.transfer(&mut [Instruction::ReadStatus as u8, 0])?;
        Ok(Status::from_bytes([status]))
    }

    /// Read a register via a register object.
    #[inline]
    pub fn read_register<R: Reg>(&mut self) -> Result<R, SPIE, CSE> {
        let mut ret = [0u8; 1];
        self.read_registers(R::ADDRESS, &mut ret)?;
        Ok(R::read(ret[0]))
    }

    /// Write to a register using a register object.
    #[inline]
    pub fn write_register<R: Reg>(&mut self, reg: R) -> Result<(), SPIE, CSE> {
        self.write_registers(R::ADDRESS, &[reg.write()])
    }

    /// Modifies a register.
    ///
    /// # Parameters
    ///
    /// * `reg` - New register content.
    /// * `mask` - Mask register. The bits must be 1 in the positions you want
    ///   to modify.
    #[inline]
    pub fn modify_register<R: BitModifiable>(&mut self, reg: R, mask: R) -> Result<(), SPIE, CSE> {
        self.bit_modify(R::ADDRESS, mask.write(), reg.write())
    }

    /// Reads registers starting from `address`, moving on to the next
    /// register until `ret` is full.
    pub fn read_registers(&mut self, address: u8, ret: &mut [u8]) -> Result<(), SPIE, CSE> {
        trace!("READ {:#04x} x{}", address, ret.len());
        self.with_cs(|spi| {
            spi.transfer(&mut [Instruction::Read as u8, address])?;
            // The MCP2515 ignores what is clocked out while reading.
            for chunk in ret.chunks_mut(CHUNK_LEN) {
                let mut scratch = [0u8; CHUNK_LEN];
                let received = spi.transfer(&mut scratch[..chunk.len()])?;
                chunk.copy_from_slice(received);
            }
            Ok(())
        })
    }

    /// Writes to sequential registers. Writing will start at `address` and
    /// continue sequentially until `data` is empty.
    pub fn write_registers(&mut self, address: u8, data: &[u8]) -> Result<(), SPIE, CSE> {
        trace!("WRITE {:#04x} {:02x?}", address, data);
        self.with_cs(|spi| {
            spi.transfer(&mut [Instruction::Write as u8, address])?;
            for chunk in data.chunks(CHUNK_LEN) {
                let mut scratch = [0u8; CHUNK_LEN];
                scratch[..chunk.len()].copy_from_slice(chunk);
                spi.transfer(&mut scratch[..chunk.len()])?;
            }
            Ok(())
        })
    }

    /// Changes the bits of the register at `address` that are set in `mask`
    /// to the corresponding bits of `bits`.
    pub fn bit_modify(&mut self, address: u8, mask: u8, bits: u8) -> Result<(), SPIE, CSE> {
        trace!("BITMOD {:#04x} mask {:#010b} bits {:#010b}", address, mask, bits);
        self.transfer(&mut [Instruction::Bitmod as u8, address, mask, bits])?;
        Ok(())
    }

    /// Transfers an array of bytes in one chip-select bracket.
    ///
    /// # Returns
    ///
    /// Returns the last byte received from the chip. If no bytes were sent,
    /// 0 is returned.
    fn transfer(&mut self, bytes: &mut [u8]) -> Result<u8, SPIE, CSE> {
        self.with_cs(|spi| {
            let received = spi.transfer(bytes)?;
            Ok(received.last().copied().unwrap_or(0))
        })
    }

    /// Calls a function `f` after bringing the chip select pin low, restoring
    /// it to high after the function has finished, whether it succeeded or
    /// not.
    fn with_cs<T>(
        &mut self,
        f: impl FnOnce(&mut SPI) -> core::result::Result<T, SPIE>,
    ) -> Result<T, SPIE, CSE> {
        self.cs.set_low().map_err(Error::Hal)?;
        let result = f(&mut self.spi);
        self.cs.set_high().map_err(Error::Hal)?;
        result.map_err(Error::Spi)
    }
}

impl<SPI, CS, SPIE, CSE> embedded_hal::can::nb::Can for MCP2515<SPI, CS>
where
    SPI: Transfer<u8, Error = SPIE>,
    CS: OutputPin<Error = CSE>,
    SPIE: Debug,
    CSE: Debug,
{
    type Frame = CanMessage;
    type Error = Error<SPIE, CSE>;

    /// Queues a frame in a free Tx buffer. Frames already queued are never
    /// replaced, so `Ok(None)` is returned on success.
    fn transmit(&mut self, frame: &Self::Frame) -> nb::Result<Option<Self::Frame>, Self::Error> {
        match self.send(*frame) {
            Ok(_) => Ok(None),
            Err(Error::TxBusy) => Err(nb::Error::WouldBlock),
            Err(e) => Err(nb::Error::Other(e)),
        }
    }

    fn receive(&mut self) -> nb::Result<Self::Frame, Self::Error> {
        match self.get_message() {
            Ok(message) => Ok(message),
            Err(Error::NoMessage) => Err(nb::Error::WouldBlock),
            Err(e) => Err(nb::Error::Other(e)),
        }
    }
}

impl<SPI, CS, SPIE, CSE> embedded_hal::blocking::can::Can for MCP2515<SPI, CS>
where
    SPI: Transfer<u8, Error = SPIE>,
    CS: OutputPin<Error = CSE>,
    SPIE: Debug,
    CSE: Debug,
{
    type Frame = CanMessage;
    type Error = Error<SPIE, CSE>;

    /// Waits for a free Tx buffer and queues the frame.
    #[inline]
    fn transmit(&mut self, frame: &Self::Frame) -> Result<(), SPIE, CSE> {
        nb::block!(embedded_hal::can::nb::Can::transmit(self, frame)).map(|_| ())
    }

    /// Waits until a frame is received.
    #[inline]
    fn receive(&mut self) -> Result<Self::Frame, SPIE, CSE> {
        nb::block!(embedded_hal::can::nb::Can::receive(self))
    }
}
