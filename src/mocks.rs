use std::{cell::RefCell, convert::Infallible, rc::Rc};

use embedded_hal::{
    blocking::{delay::DelayMs, spi::Transfer},
    digital::v2::OutputPin,
};
use mockall::mock;

use crate::buffer::{RxBuf, TxBuf};

mock! {
    pub SPIBus {}

    impl Transfer<u8> for SPIBus {
        type Error = u32;

        fn transfer<'w>(&mut self, words: &'w mut [u8]) -> Result<&'static [u8], u32>;
    }
}

mock! {
    pub Pin {}

    impl OutputPin for Pin {
        type Error = u32;

        fn set_low(&mut self) -> Result<(), u32>;
        fn set_high(&mut self) -> Result<(), u32>;
    }
}

/// Delay provider that returns immediately.
pub struct NoDelay;

impl DelayMs<u8> for NoDelay {
    fn delay_ms(&mut self, _ms: u8) {}
}

const CANSTAT: usize = 0x0E;
const CANCTRL: usize = 0x0F;
const CANINTF: usize = 0x2C;
const TXREQ: u8 = 0b0000_1000;

/// Register file of a simulated MCP2515, shared between the SPI and chip
/// select halves handed to the driver.
pub struct ChipState {
    pub regs: [u8; 128],
    /// Bytes clocked in since chip select went low.
    frame: Vec<u8>,
    selected: bool,
    /// Completed chip-select brackets.
    pub transactions: usize,
}

impl ChipState {
    fn power_on(&mut self) {
        self.regs = [0; 128];
        // Configuration mode, CLKOUT enabled with prescaler /8.
        self.regs[CANSTAT] = 0b1000_0000;
        self.regs[CANCTRL] = 0b1000_0111;
    }

    fn store(&mut self, addr: usize, value: u8) {
        let addr = addr & 0x7F;
        self.regs[addr] = value;
        if addr == CANCTRL {
            // The simulated chip switches modes instantly.
            self.regs[CANSTAT] = (self.regs[CANSTAT] & 0x1F) | (value & 0xE0);
        }
    }

    fn status(&self) -> u8 {
        let intf = self.regs[CANINTF];
        let txreq = |buf: TxBuf| self.regs[buf.ctrl() as usize] & TXREQ != 0;
        (intf & 0b0000_0011)
            | (txreq(TxBuf::B0) as u8) << 2
            | (intf & 0b0000_0100) << 1
            | (txreq(TxBuf::B1) as u8) << 4
            | (intf & 0b0000_1000) << 2
            | (txreq(TxBuf::B2) as u8) << 6
            | (intf & 0b0001_0000) << 3
    }

    /// Handles one byte clocked in, returning the byte clocked out.
    fn clock(&mut self, byte: u8) -> u8 {
        assert!(self.selected, "SPI transfer outside chip select");
        self.frame.push(byte);
        let pos = self.frame.len() - 1;
        let instruction = self.frame[0];
        match instruction {
            0x03 if pos >= 2 => self.regs[(self.frame[1] as usize + pos - 2) & 0x7F],
            0x02 if pos >= 2 => {
                self.store(self.frame[1] as usize + pos - 2, byte);
                0
            }
            0x05 if pos == 3 => {
                let addr = self.frame[1] as usize & 0x7F;
                let mask = self.frame[2];
                let value = (self.regs[addr] & !mask) | (byte & mask);
                self.store(addr, value);
                0
            }
            0xA0 if pos >= 1 => self.status(),
            0xC0 => {
                self.power_on();
                0
            }
            0x80..=0x87 if pos == 0 => {
                for buf in TxBuf::ALL {
                    if byte & buf.rts_bit() != 0 {
                        self.regs[buf.ctrl() as usize] |= TXREQ;
                    }
                }
                0
            }
            _ => 0,
        }
    }
}

#[derive(Clone)]
pub struct SimChip(Rc<RefCell<ChipState>>);

pub struct SimSpi(SimChip);

pub struct SimCs(SimChip);

impl SimChip {
    pub fn new() -> Self {
        let mut state = ChipState {
            regs: [0; 128],
            frame: Vec::new(),
            selected: false,
            transactions: 0,
        };
        state.power_on();
        SimChip(Rc::new(RefCell::new(state)))
    }

    /// SPI bus and chip select pin connected to this chip.
    pub fn bus(&self) -> (SimSpi, SimCs) {
        (SimSpi(self.clone()), SimCs(self.clone()))
    }

    pub fn reg(&self, addr: u8) -> u8 {
        self.0.borrow().regs[addr as usize]
    }

    pub fn regs(&self, addr: u8, len: usize) -> Vec<u8> {
        let start = addr as usize;
        self.0.borrow().regs[start..start + len].to_vec()
    }

    pub fn set_reg(&self, addr: u8, value: u8) {
        self.0.borrow_mut().regs[addr as usize] = value;
    }

    pub fn transactions(&self) -> usize {
        self.0.borrow().transactions
    }

    /// Finishes the transmission pending in `buf`.
    pub fn complete_tx(&self, buf: TxBuf) {
        let mut state = self.0.borrow_mut();
        state.regs[buf.ctrl() as usize] &= !TXREQ;
        state.regs[CANINTF] |= 0b0000_0100 << buf.index();
    }

    /// Loops the frame in `tx` back into `rx`, the way loopback mode does.
    pub fn echo(&self, tx: TxBuf, rx: RxBuf) {
        let frame = self.regs(tx.sidh(), 13);
        let mut state = self.0.borrow_mut();
        let start = rx.sidh() as usize;
        state.regs[start..start + 13].copy_from_slice(&frame);
        // Standard remote frames are reported through SRR.
        let standard = frame[1] & 0b0000_1000 == 0;
        if standard && frame[4] & 0b0100_0000 != 0 {
            state.regs[start + 1] |= 0b0001_0000;
        }
        drop(state);
        self.complete_tx(tx);
        self.0.borrow_mut().regs[CANINTF] |= 1 << rx.index();
    }

    /// Places a frame into `rx` as if it arrived from the bus.
    pub fn receive(&self, rx: RxBuf, ident: [u8; 5], data: &[u8]) {
        let mut state = self.0.borrow_mut();
        let start = rx.sidh() as usize;
        state.regs[start..start + 5].copy_from_slice(&ident);
        state.regs[start + 5..start + 5 + data.len()].copy_from_slice(data);
        state.regs[CANINTF] |= 1 << rx.index();
    }
}

impl Transfer<u8> for SimSpi {
    type Error = Infallible;

    fn transfer<'w>(&mut self, words: &'w mut [u8]) -> Result<&'w [u8], Infallible> {
        let mut state = (self.0).0.borrow_mut();
        for word in words.iter_mut() {
            *word = state.clock(*word);
        }
        Ok(words)
    }
}

impl OutputPin for SimCs {
    type Error = Infallible;

    fn set_low(&mut self) -> Result<(), Infallible> {
        let mut state = (self.0).0.borrow_mut();
        state.selected = true;
        state.frame.clear();
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        let mut state = (self.0).0.borrow_mut();
        if state.selected {
            state.transactions += 1;
        }
        state.selected = false;
        Ok(())
    }
}
