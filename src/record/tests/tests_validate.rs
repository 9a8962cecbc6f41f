use crate::record::{RecordControl, RecordError, FLAG_REMOVED, KEY_SIZE};

fn base() -> RecordControl {
    RecordControl {
        key: [0u8; KEY_SIZE],
        flags: 0,
        data_size: 64,
        disk_size: 96,
        position: 0,
    }
}

#[test]
fn accepts_a_well_formed_record() {
    assert!(base().validate(96).is_ok());
}

#[test]
fn rejects_disk_size_smaller_than_data_size() {
    let mut rc = base();
    rc.data_size = 200;
    assert_eq!(
        rc.validate(1000),
        Err(RecordError::SizeInversion {
            data_size: 200,
            disk_size: 96
        })
    );
}

#[test]
fn rejects_disk_size_not_a_multiple_of_the_stride() {
    let mut rc = base();
    rc.disk_size = 100;
    rc.data_size = 50;
    assert!(matches!(
        rc.validate(1000),
        Err(RecordError::Misaligned { .. })
    ));
}

#[test]
fn rejects_position_plus_disk_size_past_file_end() {
    let mut rc = base();
    rc.position = 1000;
    assert!(matches!(
        rc.validate(1000),
        Err(RecordError::OutOfBounds { .. })
    ));
}

#[test]
fn rejects_unknown_flag_bits() {
    let mut rc = base();
    rc.flags = FLAG_REMOVED | 0x02;
    assert!(matches!(
        rc.validate(96),
        Err(RecordError::UnknownFlags { .. })
    ));
}

#[test]
fn accepts_the_removed_bit_alone() {
    let mut rc = base();
    rc.flags = FLAG_REMOVED;
    assert!(rc.validate(96).is_ok());
}
