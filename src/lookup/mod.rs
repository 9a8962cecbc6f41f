//! Intra-block scan (spec.md §4.5) and the multi-base lookup protocol
//! (spec.md §4.5's `LookupCoordinator::find_by_key`).
//!
//! Grounded on the teacher's `Engine::get` delegating through a
//! `VisibilityFilter` iterator across `sstables: Vec<SSTable>` newest-first;
//! the hold/sentinel-recheck/bounded-retry loop has no teacher analogue (the
//! teacher holds one engine-wide lock instead of per-base holds) and is
//! built directly from spec.md §5.

use crate::base::{BaseHold, BaseRegistry, BaseSlotView, ProbeOutcome};
use crate::config::IndexConfig;
use crate::index_block::IndexBlock;
use crate::record::{KEY_SIZE, Key, RECORD_STRIDE, RecordControl, is_removed_raw};
use crate::stats::{SearchStats, StatsRegistry};
use std::cmp::Ordering;
use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum LookupError {
    #[error("key not present in any base")]
    NotFound,
    #[error("exceeded {0} restarts against invalidated bases")]
    Deadlock(u32),
}

/// A located record: enough to read the data file without re-consulting the
/// index. Carries the `BaseHold` that was live when the entry was found, so
/// the base cannot be reclaimed out from under a caller still holding the
/// locator (spec.md §9: "model this as an explicit reference-count handle").
pub struct Locator {
    pub base_hold: BaseHold,
    pub data_offset: u64,
    pub index_offset: u64,
    pub size: u64,
}

/// Acceptance policy for the intra-block scan (spec.md §9: "a small tagged
/// variant of acceptance policies"). There is one production policy today;
/// the scan itself is generic over the choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceptPolicy {
    AcceptAny,
    AcceptNonRemoved,
}

impl AcceptPolicy {
    fn accept(&self, raw_entry: &[u8]) -> bool {
        match self {
            AcceptPolicy::AcceptAny => true,
            AcceptPolicy::AcceptNonRemoved => !is_removed_raw(raw_entry),
        }
    }
}

fn entry_key(mmap: &[u8], start: u64, idx: usize) -> Key {
    let off = (start + idx as u64 * RECORD_STRIDE as u64) as usize;
    let mut k = [0u8; KEY_SIZE];
    k.copy_from_slice(&mmap[off..off + KEY_SIZE]);
    k
}

fn entry_raw<'a>(mmap: &'a [u8], start: u64, idx: usize) -> &'a [u8] {
    let off = (start + idx as u64 * RECORD_STRIDE as u64) as usize;
    &mmap[off..off + RECORD_STRIDE]
}

fn binary_search_eq(n: usize, key: &Key, mmap: &[u8], start: u64) -> Option<usize> {
    let mut lo = 0usize;
    let mut hi = n;
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        match entry_key(mmap, start, mid).cmp(key) {
            Ordering::Equal => return Some(mid),
            Ordering::Less => lo = mid + 1,
            Ordering::Greater => hi = mid,
        }
    }
    None
}

/// The intra-block scan of spec.md §4.5: binary search the block's entry
/// slice for a key match, then widen left/right across the equal-key run
/// applying `policy` until an accepted entry is found.
pub fn scan_block(mmap: &[u8], block: &IndexBlock, key: &Key, policy: AcceptPolicy, stats: &mut SearchStats) -> Option<(RecordControl, u64)> {
    let start = block.start_offset;
    let end = block.end_offset.min(mmap.len() as u64);
    if end <= start {
        return None;
    }
    let n = ((end - start) / RECORD_STRIDE as u64) as usize;
    if n == 0 {
        return None;
    }

    stats.bsearch_reached += 1;
    let hit = binary_search_eq(n, key, mmap, start)?;
    stats.bsearch_found += 1;

    let read_at = |idx: usize| -> (RecordControl, u64) {
        let off = start + idx as u64 * RECORD_STRIDE as u64;
        (RecordControl::read_from(entry_raw(mmap, start, idx)), off)
    };

    if policy.accept(entry_raw(mmap, start, hit)) {
        return Some(read_at(hit));
    }

    // Walk forward across the equal-key run.
    let mut i = hit + 1;
    while i < n && entry_key(mmap, start, i) == *key {
        stats.additional_reads += 1;
        if policy.accept(entry_raw(mmap, start, i)) {
            return Some(read_at(i));
        }
        i += 1;
    }

    // Walk backward from just before the original hit.
    let mut j = hit;
    while j > 0 {
        j -= 1;
        if entry_key(mmap, start, j) != *key {
            break;
        }
        stats.additional_reads += 1;
        if policy.accept(entry_raw(mmap, start, j)) {
            return Some(read_at(j));
        }
    }

    None
}

/// Namespace for the multi-base lookup protocol (spec.md §4.5).
pub struct LookupCoordinator;

impl LookupCoordinator {
    /// Iterates bases newest-first, holding each against invalidation while
    /// it is probed. On observing an invalidated base after acquiring the
    /// hold, restarts the whole iteration (bounded by `config.max_tries`).
    pub fn find_by_key(registry: &BaseRegistry, key: &Key, config: &IndexConfig, stats_registry: &StatsRegistry) -> (Result<Locator, LookupError>, SearchStats) {
        let mut search_stats = SearchStats::default();
        let mut restarts = 0u32;

        'restart: loop {
            search_stats.loops += 1;

            for base in registry.snapshot_newest_first() {
                let hold = base.acquire_hold();

                match base.snapshot_slot() {
                    BaseSlotView::Invalidated => {
                        drop(hold);
                        restarts += 1;
                        if restarts > config.max_tries {
                            return (Err(LookupError::Deadlock(config.max_tries)), search_stats);
                        }
                        continue 'restart;
                    }
                    BaseSlotView::Open => {
                        search_stats.no_sort += 1;
                        drop(hold);
                        continue;
                    }
                    BaseSlotView::Closed(index) => {
                        search_stats.search_on_disk += 1;
                        stats_registry.record_index_read();

                        match index.probe(key) {
                            ProbeOutcome::BloomNull => {
                                search_stats.bloom_null += 1;
                                drop(hold);
                                continue;
                            }
                            ProbeOutcome::NoBlock => {
                                search_stats.no_block += 1;
                                drop(hold);
                                continue;
                            }
                            ProbeOutcome::Block(block) => {
                                search_stats.found_index_block += 1;
                                let mmap = index.sorted_mmap();
                                if let Some((rc, index_offset)) = scan_block(&mmap, &block, key, AcceptPolicy::AcceptNonRemoved, &mut search_stats) {
                                    return (
                                        Ok(Locator {
                                            base_hold: hold,
                                            data_offset: rc.position,
                                            index_offset,
                                            size: rc.data_size,
                                        }),
                                        search_stats,
                                    );
                                }
                                drop(hold);
                                continue;
                            }
                        }
                    }
                }
            }

            return (Err(LookupError::NotFound), search_stats);
        }
    }
}

#[cfg(test)]
mod tests {
    mod tests_coordinator;
    mod tests_scan;
}
