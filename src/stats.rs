//! Process-wide telemetry: the gauges named in spec.md §6, plus the
//! per-lookup counters returned alongside every `lookup()` call so tests and
//! callers can assert on search behaviour directly (mirrors the teacher's
//! `EngineStats` returned from `Engine::stats()`).

use std::sync::atomic::{AtomicU64, Ordering};

/// Per-lookup search telemetry (spec.md §6). All fields are monotonic
/// counters accumulated over the course of one `LookupCoordinator::
/// find_by_key` call.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SearchStats {
    pub loops: u64,
    pub no_sort: u64,
    pub search_on_disk: u64,
    pub bloom_null: u64,
    pub found_index_block: u64,
    pub no_block: u64,
    pub bsearch_reached: u64,
    pub bsearch_found: u64,
    pub additional_reads: u64,
}

/// Process-wide gauges named in spec.md §6.
#[derive(Default)]
pub struct StatsRegistry {
    bloom_size: AtomicU64,
    index_blocks_size: AtomicU64,
    index_corrupted_entries: AtomicU64,
    records_removed: AtomicU64,
    removed_size: AtomicU64,
    gst_index_reads: AtomicU64,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct StatsSnapshot {
    pub bloom_size: u64,
    pub index_blocks_size: u64,
    pub index_corrupted_entries: u64,
    pub records_removed: u64,
    pub removed_size: u64,
    pub gst_index_reads: u64,
}

impl StatsRegistry {
    pub fn record_build(&self, bloom_bytes: u64, index_blocks_bytes: u64, corrupted: u64, removed_count: u64, removed_bytes: u64) {
        self.bloom_size.fetch_add(bloom_bytes, Ordering::Relaxed);
        self.index_blocks_size
            .fetch_add(index_blocks_bytes, Ordering::Relaxed);
        self.index_corrupted_entries
            .fetch_add(corrupted, Ordering::Relaxed);
        self.records_removed
            .fetch_add(removed_count, Ordering::Relaxed);
        self.removed_size.fetch_add(removed_bytes, Ordering::Relaxed);
    }

    /// Undoes a prior `record_build` when a base's index is destroyed.
    pub fn record_destroy(&self, bloom_bytes: u64, index_blocks_bytes: u64, corrupted: u64, removed_count: u64, removed_bytes: u64) {
        sub(&self.bloom_size, bloom_bytes);
        sub(&self.index_blocks_size, index_blocks_bytes);
        sub(&self.index_corrupted_entries, corrupted);
        sub(&self.records_removed, removed_count);
        sub(&self.removed_size, removed_bytes);
    }

    pub fn record_index_read(&self) {
        self.gst_index_reads.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            bloom_size: self.bloom_size.load(Ordering::Relaxed),
            index_blocks_size: self.index_blocks_size.load(Ordering::Relaxed),
            index_corrupted_entries: self.index_corrupted_entries.load(Ordering::Relaxed),
            records_removed: self.records_removed.load(Ordering::Relaxed),
            removed_size: self.removed_size.load(Ordering::Relaxed),
            gst_index_reads: self.gst_index_reads.load(Ordering::Relaxed),
        }
    }
}

fn sub(counter: &AtomicU64, amount: u64) {
    let _ = counter.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |cur| {
        Some(cur.saturating_sub(amount))
    });
}
