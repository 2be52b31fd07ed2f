use crate::buffer::{RxBuf, TxBuf};
use crate::regs::*;
use crate::stat::{IntFlags, Status};

#[test]
fn test_canctrl() {
    assert_eq!([0b0100_0000], CanCtrl::new().with_reqop(OpMode::Loopback).into_bytes());
    assert_eq!(
        [0b1000_0100],
        CanCtrl::new().with_reqop(OpMode::Configuration).with_clken(true).into_bytes()
    );
}

#[test]
fn test_canstat() {
    let canstat = CanStat::from_bytes([0b0110_1100]);
    assert_eq!(Ok(OpMode::ListenOnly), canstat.opmod_or_err().map_err(|_| ()));
    assert_eq!(IntFlagCode::RXB0, canstat.icod());
    assert!(CanStat::from_bytes([0b1110_0000]).opmod_or_err().is_err());
}

#[test]
fn test_opmode_from_raw() {
    assert_eq!(Ok(OpMode::Sleep), OpMode::try_from(1u8));
    assert_eq!(Ok(OpMode::Configuration), OpMode::try_from(4u8));
    assert_eq!(Err(5), OpMode::try_from(5u8));
}

#[test]
fn test_txbctrl() {
    assert_eq!([0b0000_1000], TxbCtrl::MASK_TXREQ.into_bytes());
    assert!(!TxbCtrl::from_bytes([0b0000_1011]).failed());
    assert!(TxbCtrl::from_bytes([0b0001_0000]).failed());
    assert!(TxbCtrl::from_bytes([0b0010_0000]).failed());
    assert!(TxbCtrl::from_bytes([0b0100_0000]).failed());
}

#[test]
fn test_rxbctrl() {
    assert_eq!(
        [0b0110_0100],
        Rxb0Ctrl::new().with_rxm(RecvBufOpMode::FilterOff).with_bukt(true).into_bytes()
    );
    assert_eq!(Rxb1Ctrl::MASK_RXM.into_bytes(), Rxb0Ctrl::MASK_RXM.into_bytes());
    assert_eq!(0x60, <Rxb0Ctrl as Reg>::ADDRESS);
    assert_eq!(0x70, <Rxb1Ctrl as Reg>::ADDRESS);
}

#[test]
fn test_status() {
    let status = Status::from_bytes([0b0001_0110]);
    assert_eq!(Some(RxBuf::B1), status.full_rx_buf());
    assert!(status.tx_pending(TxBuf::B0));
    assert!(status.tx_pending(TxBuf::B1));
    assert!(!status.tx_pending(TxBuf::B2));

    assert_eq!(Some(RxBuf::B0), Status::from_bytes([0b0000_0011]).full_rx_buf());
    assert_eq!(None, Status::from_bytes([0b1111_1100]).full_rx_buf());
}

#[test]
fn test_int_flags() {
    assert_eq!(0b0000_0010, IntFlags::rx(RxBuf::B1).bits());
    assert!(IntFlags::from_bits_truncate(0b0010_0001).contains(IntFlags::RX0IF | IntFlags::ERRIF));
}
