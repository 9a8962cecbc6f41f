//! Whole-array Bloom filter sized per spec.md §4.2, backed by the `bloomfilter`
//! crate (the same crate the teacher depends on for its SSTable bloom block,
//! `examples/kamil-kielbasa-aeternusdb/src/sstable/builder.rs`).
//!
//! `bloomfilter::Bloom` already indexes over a single bitmap — there is no
//! per-block partitioning to work around — so this module just supplies the
//! sizing spec.md §4.2 calls for (`size_for`, `num_hashes`) and wraps the
//! crate's `Bloom::new(bitmap_size_bits, items_count)` constructor, which
//! derives its own number of hash functions from the same
//! `bits_per_key * ln(2)` relationship as `num_hashes`.

use bloomfilter::Bloom;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BloomError {
    #[error("allocation of {0} bytes for the bloom bit array failed")]
    NoMemory(usize),
}

pub struct BloomFilter {
    inner: Bloom<[u8]>,
    size_bytes: usize,
}

/// Bytes needed for `n_records`, rounded up to whole blocks of
/// `block_entries` records at `bits_per_block` bits each.
pub fn size_for(n_records: u64, block_entries: u64, bits_per_block: u64) -> u64 {
    let n_blocks = n_records.div_ceil(block_entries.max(1)).max(1);
    (n_blocks * bits_per_block).div_ceil(8)
}

/// `k = round(0.69 * bits_per_key)`, clamped to `[1, 20]`. Named directly by
/// spec.md §4.2 as an operation in its own right; `bloomfilter::Bloom::new`
/// derives an equivalent `k` internally from `bitmap_size / items_count`, so
/// this is kept for callers (and tests) that want the sizing math without
/// constructing a filter.
pub fn num_hashes(bits_per_key: f64) -> u32 {
    let k = (0.69 * bits_per_key).round() as i64;
    k.clamp(1, 20) as u32
}

impl BloomFilter {
    /// Builds a filter sized for `n_records` entries across
    /// `ceil(n_records / block_entries)` blocks of `bits_per_block` bits.
    pub fn try_new(n_records: u64, block_entries: u64, bits_per_block: u64) -> Result<Self, BloomError> {
        let size_bytes = size_for(n_records, block_entries, bits_per_block);
        let bitmap_bits = size_bytes * 8;
        let items_count = n_records.max(1);

        // `Bloom::new` has no fallible variant, so probe the allocation
        // ourselves first against the exact byte count it will need,
        // keeping the NO-MEMORY path spec.md §9 asks for.
        let mut probe = Vec::new();
        probe
            .try_reserve_exact(size_bytes as usize)
            .map_err(|_| BloomError::NoMemory(size_bytes as usize))?;
        drop(probe);

        let inner = Bloom::<[u8]>::new(bitmap_bits as usize, items_count as usize);
        Ok(BloomFilter {
            inner,
            size_bytes: size_bytes as usize,
        })
    }

    pub fn num_bits(&self) -> u64 {
        self.size_bytes as u64 * 8
    }

    pub fn size_bytes(&self) -> usize {
        self.size_bytes
    }

    pub fn insert(&mut self, key: &[u8]) {
        self.inner.set(key);
    }

    /// `true` means "maybe present"; `false` means "definitely absent".
    pub fn probe(&self, key: &[u8]) -> bool {
        self.inner.check(key)
    }
}

#[cfg(test)]
mod tests {
    mod tests_insert_probe;
    mod tests_sizing;
}
