//! Per-base block index: a sorted array of `[start_key, end_key]`-ranged
//! block descriptors built from the base's sorted index mmap, plus the
//! binary search that maps a key to its candidate block.

use crate::bloom::BloomFilter;
use crate::record::{Key, RecordControl, RECORD_STRIDE};
use std::cmp::Ordering;
use thiserror::Error;
use tracing::{error, warn};

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("index corruption in base exceeded the configured threshold: {skipped} skipped entries (max {max})")]
    CorruptFatal { skipped: u64, max: u64 },
    #[error(transparent)]
    Bloom(#[from] crate::bloom::BloomError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexBlock {
    pub start_offset: u64,
    pub end_offset: u64,
    pub start_key: Key,
    pub end_key: Key,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CorruptionReport {
    pub skipped: u64,
    pub removed_count: u64,
    pub removed_bytes: u64,
}

pub struct IndexBlockTable {
    blocks: Vec<IndexBlock>,
}

impl IndexBlockTable {
    pub fn blocks(&self) -> &[IndexBlock] {
        &self.blocks
    }

    /// Binary searches the block array for the block whose `[start_key,
    /// end_key]` range covers `key`.
    pub fn find_block(&self, key: &Key) -> Option<&IndexBlock> {
        let idx = self
            .blocks
            .binary_search_by(|b| cmp_block_to_key(b, key))
            .ok()?;
        self.blocks.get(idx)
    }
}

fn cmp_block_to_key(b: &IndexBlock, key: &Key) -> Ordering {
    if key < &b.start_key {
        Ordering::Greater
    } else if key > &b.end_key {
        Ordering::Less
    } else {
        Ordering::Equal
    }
}

/// A structural record checker, injected so the "validate(rc)" operation
/// named in spec.md §4.1 and the "check_record" collaborator named in
/// spec.md §6 are the same pluggable callback.
pub type RecordChecker<'a> = &'a dyn Fn(&RecordControl) -> bool;

/// Builds the block table and a matching Bloom filter from a base's sorted
/// index mmap in one pass (spec.md §4.3).
pub fn build(
    mmap: &[u8],
    block_entries: u64,
    bits_per_block: u64,
    corrupt_max: u64,
    check_record: RecordChecker<'_>,
) -> Result<(IndexBlockTable, BloomFilter, CorruptionReport), BuildError> {
    let stride = RECORD_STRIDE as u64;
    let n = mmap.len() as u64 / stride;
    let mut bloom = BloomFilter::try_new(n, block_entries, bits_per_block)?;
    let mut blocks = Vec::new();
    let mut report = CorruptionReport::default();

    let mut i = 0u64;
    while i < n {
        let block_end = (i + block_entries).min(n);
        let mut start_key: Option<Key> = None;
        let mut end_key: Option<Key> = None;

        for j in i..block_end {
            let off = (j * stride) as usize;
            let raw = &mmap[off..off + RECORD_STRIDE];
            let rc = RecordControl::read_from(raw);
            let is_boundary = j == i || j == block_end - 1;

            if !check_record(&rc) {
                report.skipped += 1;
                if is_boundary || report.skipped > corrupt_max {
                    error!(
                        skipped = report.skipped,
                        max = corrupt_max,
                        "index build aborted: corruption threshold exceeded"
                    );
                    return Err(BuildError::CorruptFatal {
                        skipped: report.skipped,
                        max: corrupt_max,
                    });
                }
                warn!(entry = j, "skipping corrupt index entry");
                continue;
            }

            if start_key.is_none() {
                start_key = Some(rc.key);
            }
            end_key = Some(rc.key);

            if rc.is_removed() {
                report.removed_count += 1;
                report.removed_bytes += rc.disk_size;
            } else {
                bloom.insert(&rc.key);
            }
        }

        if let (Some(start), Some(end)) = (start_key, end_key) {
            blocks.push(IndexBlock {
                start_offset: i * stride,
                end_offset: block_end * stride,
                start_key: start,
                end_key: end,
            });
        }

        i = block_end;
    }

    Ok((IndexBlockTable { blocks }, bloom, report))
}

#[cfg(test)]
mod tests {
    mod tests_build;
    mod tests_find_block;
}
