use embedded_hal::can::{ExtendedId, Frame, Id, StandardId};

use crate::frame::{raw_id, CanMessage};

fn standard(id: u16) -> StandardId {
    StandardId::new(id).unwrap()
}

#[test]
fn test_truncating() {
    let data: Vec<u8> = (1..=12).collect();
    let message = CanMessage::truncating(standard(0x100), &data);
    assert_eq!(8, message.dlc());
    assert_eq!(&data[..8], message.data());

    let (ident, payload) = message.pack();
    assert_eq!(8, ident[4]);
    assert_eq!(8, payload.len());
}

#[test]
fn test_frame_new() {
    assert!(CanMessage::new(standard(1), &[0; 9]).is_none());
    let message = CanMessage::new(standard(1), &[1, 2, 3]).unwrap();
    assert_eq!(3, message.dlc());
    assert!(message.is_data_frame());
    assert!(message.is_standard());

    assert!(CanMessage::new_remote(standard(1), 9).is_none());
    let remote = CanMessage::new_remote(standard(1), 4).unwrap();
    assert!(remote.is_remote_frame());
    assert_eq!(4, remote.dlc());
    assert!(remote.data().is_empty());
    assert_eq!(0x44, remote.pack().0[4]);
}

#[test]
fn test_raw_id() {
    assert_eq!(None, raw_id(0x800, false));
    assert_eq!(Some(Id::Standard(standard(0x7FF))), raw_id(0x7FF, false));
    assert_eq!(Some(Id::Extended(ExtendedId::MAX)), raw_id(0x1FFF_FFFF, true));
    assert_eq!(None, raw_id(0x2000_0000, true));

    let message = CanMessage::from_raw_id(0x800, true).unwrap();
    assert!(message.is_extended());
    assert_eq!(0x800, message.raw_id());
    assert_eq!(0, message.dlc());
    assert!(CanMessage::from_raw_id(0x800, false).is_none());
}

#[test]
fn test_set_id() {
    let mut message = CanMessage::truncating(standard(0x10), &[1]);
    message.set_id(ExtendedId::new(0x1_0000).unwrap());
    assert!(message.is_extended());
    assert_eq!(0x1_0000, message.raw_id());
    assert_eq!(&[1], message.data());
}

#[test]
fn test_typed_payload() {
    let mut message = CanMessage::truncating(standard(0x10), &[]);
    assert_eq!(None, message.get_u8());

    message.set_u8(0x5A);
    assert_eq!(&[0x5A], message.data());
    assert_eq!(Some(0x5A), message.get_u8());
    assert_eq!(None, message.get_u16());

    message.set_u16(0xBEEF);
    assert_eq!(&[0xBE, 0xEF], message.data());
    assert_eq!(Some(0xBEEF), message.get_u16());
    assert_eq!(None, message.get_u32());

    message.set_u32(0xCAFE_BABE);
    assert_eq!(&[0xCA, 0xFE, 0xBA, 0xBE], message.data());
    assert_eq!(Some(0xCAFE_BABE), message.get_u32());
    assert_eq!(Some(0xCAFE), message.get_u16());
}

#[test]
fn test_unpack() {
    let message = CanMessage::unpack([0x24, 0x60, 0x00, 0x00, 0x02], &[0xDE, 0xAD]);
    assert_eq!(Id::Standard(standard(0x123)), message.id());
    assert_eq!(&[0xDE, 0xAD], message.data());
    assert!(!message.is_remote_frame());

    let message = CanMessage::unpack([0x91, 0xA8, 0x56, 0x78, 0x0F], &[1, 2, 3, 4, 5, 6, 7, 8]);
    assert_eq!(0x1234_5678, message.raw_id());
    assert_eq!(8, message.dlc());

    let remote = CanMessage::unpack([0x24, 0x70, 0x00, 0x00, 0x03], &[9, 9, 9]);
    assert!(remote.is_remote_frame());
    assert_eq!(3, remote.dlc());
    assert!(remote.data().is_empty());
}

#[test]
fn test_pack_unpack() {
    let messages = [
        CanMessage::truncating(standard(0), &[]),
        CanMessage::truncating(standard(0x7FF), &[0xFF; 8]),
        CanMessage::truncating(ExtendedId::new(0x0003_0000).unwrap(), &[1, 2, 3]),
        CanMessage::truncating(ExtendedId::MAX, &[0x55]),
    ];
    for message in messages {
        let (ident, data) = message.pack();
        assert_eq!(message, CanMessage::unpack(ident, data));
    }
}
