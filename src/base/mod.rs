//! A `Base`'s index lifecycle and the hold/release discipline that guards it
//! while a lookup reads its block table and Bloom filter (spec.md §5).

use crate::bloom::BloomFilter;
use crate::index_block::IndexBlockTable;
use crate::record::Key;
use crate::stats::StatsRegistry;
use memmap2::Mmap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};

pub struct BlockBloomPair {
    pub blocks: IndexBlockTable,
    pub bloom: BloomFilter,
    pub report: crate::index_block::CorruptionReport,
}

/// What `BaseIndex::probe` found, distinguished so the lookup coordinator can
/// attribute the right `SearchStats` counter (spec.md §6).
pub enum ProbeOutcome {
    BloomNull,
    NoBlock,
    Block(crate::index_block::IndexBlock),
}

/// The closed-state index artifacts for one base: the sorted-index mmap
/// (swappable under its own mutex, independent of the block table/bloom
/// pair) and the block table + Bloom filter pair (swappable under a
/// read-write lock so concurrent lookups never block each other).
pub struct BaseIndex {
    sort: Mutex<Arc<Mmap>>,
    pair: RwLock<Option<BlockBloomPair>>,
}

impl BaseIndex {
    pub fn new(sort_mmap: Arc<Mmap>, pair: Option<BlockBloomPair>) -> Self {
        BaseIndex {
            sort: Mutex::new(sort_mmap),
            pair: RwLock::new(pair),
        }
    }

    pub fn sorted_mmap(&self) -> Arc<Mmap> {
        Arc::clone(&self.sort.lock().unwrap())
    }

    pub fn swap_sort(&self, new_mmap: Arc<Mmap>) -> Arc<Mmap> {
        let mut guard = self.sort.lock().unwrap();
        std::mem::replace(&mut *guard, new_mmap)
    }

    pub fn install_pair(&self, pair: BlockBloomPair) {
        *self.pair.write().unwrap() = Some(pair);
    }

    /// Idempotent: dropping the pair on an already-destroyed base is a no-op.
    pub fn destroy_pair(&self) -> Option<BlockBloomPair> {
        self.pair.write().unwrap().take()
    }

    pub fn probe(&self, key: &Key) -> ProbeOutcome {
        let guard = self.pair.read().unwrap();
        let Some(pair) = guard.as_ref() else {
            return ProbeOutcome::NoBlock;
        };
        if !pair.bloom.probe(key) {
            return ProbeOutcome::BloomNull;
        }
        match pair.blocks.find_block(key) {
            Some(block) => ProbeOutcome::Block(*block),
            None => ProbeOutcome::NoBlock,
        }
    }
}

/// Current state of a `Base`'s index slot.
pub enum BaseSlot {
    /// Still being written; no closed index exists yet.
    Open,
    Closed(Arc<BaseIndex>),
    /// A background data-sort pass invalidated this base; lookups must
    /// retry elsewhere rather than read through it (spec.md §5/§9).
    Invalidated,
}

/// A clone of the current slot cheap enough to read without holding the
/// lock across a probe.
pub enum BaseSlotView {
    Open,
    Closed(Arc<BaseIndex>),
    Invalidated,
}

pub struct Base {
    pub id: u64,
    hold_count: AtomicUsize,
    slot: RwLock<BaseSlot>,
}

impl Base {
    pub fn new_open(id: u64) -> Arc<Self> {
        Arc::new(Base {
            id,
            hold_count: AtomicUsize::new(0),
            slot: RwLock::new(BaseSlot::Open),
        })
    }

    pub fn install_index(&self, index: Arc<BaseIndex>) {
        *self.slot.write().unwrap() = BaseSlot::Closed(index);
    }

    pub fn invalidate(&self) {
        *self.slot.write().unwrap() = BaseSlot::Invalidated;
    }

    pub fn snapshot_slot(&self) -> BaseSlotView {
        match &*self.slot.read().unwrap() {
            BaseSlot::Open => BaseSlotView::Open,
            BaseSlot::Closed(index) => BaseSlotView::Closed(Arc::clone(index)),
            BaseSlot::Invalidated => BaseSlotView::Invalidated,
        }
    }

    pub fn hold_count(&self) -> usize {
        self.hold_count.load(Ordering::SeqCst)
    }

    /// Unconditionally bumps the hold refcount and returns a `BaseHold`; it
    /// performs no sentinel recheck itself. Callers must call
    /// `snapshot_slot` again after acquiring the hold and treat
    /// `BaseSlotView::Invalidated` as a signal to drop the hold and restart
    /// (spec.md §5's "recheck the sentinel after acquiring the hold"); see
    /// `lookup::LookupCoordinator::find_by_key` for that recheck.
    pub fn acquire_hold(self: &Arc<Self>) -> BaseHold {
        self.hold_count.fetch_add(1, Ordering::SeqCst);
        BaseHold {
            base: Arc::clone(self),
        }
    }

    fn release_hold(&self) {
        self.hold_count.fetch_sub(1, Ordering::SeqCst);
    }
}

/// RAII hold: while alive, the base's index artifacts will not be freed out
/// from under a reader (the destroyer still may replace `pair` with `None`,
/// but the `Arc<BaseIndex>` itself stays alive as long as a hold references
/// the `Arc` obtained through it).
pub struct BaseHold {
    base: Arc<Base>,
}

impl BaseHold {
    pub fn base_id(&self) -> u64 {
        self.base.id
    }
}

impl Drop for BaseHold {
    fn drop(&mut self) {
        self.base.release_hold();
    }
}

/// Explicit, passed-around collection of bases (spec.md §9: "model it as an
/// explicit registry object, not ambient state"). Newest-last internally;
/// the lookup coordinator iterates it newest-first.
#[derive(Default)]
pub struct BaseRegistry {
    bases: RwLock<Vec<Arc<Base>>>,
}

impl BaseRegistry {
    pub fn push(&self, base: Arc<Base>) {
        self.bases.write().unwrap().push(base);
    }

    pub fn remove(&self, id: u64) {
        self.bases.write().unwrap().retain(|b| b.id != id);
    }

    pub fn snapshot_newest_first(&self) -> Vec<Arc<Base>> {
        let mut v: Vec<_> = self.bases.read().unwrap().clone();
        v.reverse();
        v
    }

    pub fn len(&self) -> usize {
        self.bases.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Bookkeeping shared by `fill_blocks`/`destroy_blocks` to keep the process
/// gauges in `StatsRegistry` consistent with the index actually installed.
pub fn record_pair_installed(stats: &StatsRegistry, pair: &BlockBloomPair) {
    let blocks_bytes = (pair.blocks.blocks().len() * std::mem::size_of::<crate::index_block::IndexBlock>()) as u64;
    stats.record_build(
        pair.bloom.size_bytes() as u64,
        blocks_bytes,
        pair.report.skipped,
        pair.report.removed_count,
        pair.report.removed_bytes,
    );
}

pub fn record_pair_destroyed(stats: &StatsRegistry, pair: &BlockBloomPair) {
    let blocks_bytes = (pair.blocks.blocks().len() * std::mem::size_of::<crate::index_block::IndexBlock>()) as u64;
    stats.record_destroy(
        pair.bloom.size_bytes() as u64,
        blocks_bytes,
        pair.report.skipped,
        pair.report.removed_count,
        pair.report.removed_bytes,
    );
}

#[cfg(test)]
mod tests {
    mod tests_hold;
    mod tests_registry;
}
