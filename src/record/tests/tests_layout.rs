use crate::record::{Key, RecordControl, FLAG_REMOVED, KEY_SIZE, RECORD_STRIDE};

fn key(byte: u8) -> Key {
    let mut k = [0u8; KEY_SIZE];
    k[0] = byte;
    k
}

#[test]
fn round_trips_through_the_96_byte_stride() {
    let rc = RecordControl {
        key: key(7),
        flags: FLAG_REMOVED,
        data_size: 128,
        disk_size: 192,
        position: 4096,
    };
    let mut buf = [0u8; RECORD_STRIDE];
    rc.write_to(&mut buf);
    assert_eq!(RecordControl::read_from(&buf), rc);
}

#[test]
fn flags_field_is_little_endian_on_the_wire() {
    let rc = RecordControl {
        key: key(1),
        flags: 0x01,
        data_size: 0,
        disk_size: 0,
        position: 0,
    };
    let mut buf = [0u8; RECORD_STRIDE];
    rc.write_to(&mut buf);
    assert_eq!(buf[64], 0x01);
    assert_eq!(&buf[65..72], &[0u8; 7]);
}

#[test]
fn is_removed_raw_reads_bit_zero_without_decoding() {
    let rc = RecordControl {
        key: key(2),
        flags: FLAG_REMOVED,
        data_size: 10,
        disk_size: 96,
        position: 0,
    };
    let mut buf = [0u8; RECORD_STRIDE];
    rc.write_to(&mut buf);
    assert!(crate::record::is_removed_raw(&buf));

    buf[64] = 0;
    assert!(!crate::record::is_removed_raw(&buf));
}
