//! Fixed-width record-control layout and key ordering.
//!
//! Every entry in a base's index is a 96-byte `RecordControl`: a 64-byte key
//! followed by four little-endian `u64` fields. This module owns the byte
//! layout, structural validation, and the two orderings used elsewhere in
//! the crate: plain key order (`compare`) and the tombstone-aware order the
//! offline sorter uses to break ties (`compare_with_tombstone`).

use std::cmp::Ordering;
use thiserror::Error;

pub const KEY_SIZE: usize = 64;
pub const RECORD_STRIDE: usize = 96;

pub type Key = [u8; KEY_SIZE];

/// Bit 0 of `flags`: the record is a tombstone.
pub const FLAG_REMOVED: u64 = 1 << 0;
const KNOWN_FLAGS_MASK: u64 = FLAG_REMOVED;

/// A structurally corrupt `RecordControl`, named by which invariant it broke.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum RecordError {
    #[error("disk_size ({disk_size}) is smaller than data_size ({data_size})")]
    SizeInversion { data_size: u64, disk_size: u64 },
    #[error("disk_size ({disk_size}) is not a multiple of the record stride ({stride})")]
    Misaligned { disk_size: u64, stride: u64 },
    #[error("position ({position}) + disk_size ({disk_size}) exceeds data file size ({file_size})")]
    OutOfBounds {
        position: u64,
        disk_size: u64,
        file_size: u64,
    },
    #[error("flags ({flags:#x}) set bits outside the recognised set ({known:#x})")]
    UnknownFlags { flags: u64, known: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordControl {
    pub key: Key,
    pub flags: u64,
    pub data_size: u64,
    pub disk_size: u64,
    pub position: u64,
}

impl RecordControl {
    /// Decodes a `RecordControl` from a 96-byte little-endian slice.
    ///
    /// Panics if `buf` is shorter than [`RECORD_STRIDE`]; callers are
    /// expected to have already bounds-checked against the mmap length.
    pub fn read_from(buf: &[u8]) -> RecordControl {
        debug_assert!(buf.len() >= RECORD_STRIDE);
        let mut key = [0u8; KEY_SIZE];
        key.copy_from_slice(&buf[0..KEY_SIZE]);
        let flags = u64::from_le_bytes(buf[64..72].try_into().unwrap());
        let data_size = u64::from_le_bytes(buf[72..80].try_into().unwrap());
        let disk_size = u64::from_le_bytes(buf[80..88].try_into().unwrap());
        let position = u64::from_le_bytes(buf[88..96].try_into().unwrap());
        RecordControl {
            key,
            flags,
            data_size,
            disk_size,
            position,
        }
    }

    /// Encodes this record into a 96-byte little-endian slice.
    pub fn write_to(&self, buf: &mut [u8]) {
        debug_assert!(buf.len() >= RECORD_STRIDE);
        buf[0..KEY_SIZE].copy_from_slice(&self.key);
        buf[64..72].copy_from_slice(&self.flags.to_le_bytes());
        buf[72..80].copy_from_slice(&self.data_size.to_le_bytes());
        buf[80..88].copy_from_slice(&self.disk_size.to_le_bytes());
        buf[88..96].copy_from_slice(&self.position.to_le_bytes());
    }

    pub fn is_removed(&self) -> bool {
        self.flags & FLAG_REMOVED != 0
    }

    /// Structural validation against spec.md §3/§4.1's `validate(rc)`.
    pub fn validate(&self, data_file_size: u64) -> Result<(), RecordError> {
        if self.disk_size < self.data_size {
            return Err(RecordError::SizeInversion {
                data_size: self.data_size,
                disk_size: self.disk_size,
            });
        }
        if self.disk_size % RECORD_STRIDE as u64 != 0 {
            return Err(RecordError::Misaligned {
                disk_size: self.disk_size,
                stride: RECORD_STRIDE as u64,
            });
        }
        if self.position.checked_add(self.disk_size).is_none_or(|end| end > data_file_size) {
            return Err(RecordError::OutOfBounds {
                position: self.position,
                disk_size: self.disk_size,
                file_size: data_file_size,
            });
        }
        if self.flags & !KNOWN_FLAGS_MASK != 0 {
            return Err(RecordError::UnknownFlags {
                flags: self.flags,
                known: KNOWN_FLAGS_MASK,
            });
        }
        Ok(())
    }
}

/// Byte-lexicographic key order. Array `Ord` already does this; this
/// wrapper exists so call sites read the same way the spec's operation list
/// does (`compare(a, b)`).
pub fn compare(a: &Key, b: &Key) -> Ordering {
    a.cmp(b)
}

/// Checks whether the raw on-disk bytes of an entry carry the `REMOVED` bit,
/// without decoding the rest of the record. `REMOVED` is bit 0 of the first
/// flags byte, which is the same byte regardless of host endianness, so no
/// conversion through `RecordControl::read_from` is needed for this check.
pub fn is_removed_raw(entry_bytes: &[u8]) -> bool {
    debug_assert!(entry_bytes.len() >= RECORD_STRIDE);
    entry_bytes[64] & 0x01 != 0
}

/// Order used by the offline sorter: primarily by key, and for equal keys,
/// tombstones sort before live entries so a later compaction/merge pass can
/// find the removal marker first.
pub fn compare_with_tombstone(a: &RecordControl, b: &RecordControl) -> Ordering {
    match a.key.cmp(&b.key) {
        Ordering::Equal => match (a.is_removed(), b.is_removed()) {
            (true, true) | (false, false) => Ordering::Equal,
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
        },
        other => other,
    }
}
