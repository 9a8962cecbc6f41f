//! # blobdex
//!
//! The on-disk sorted-index lookup engine of an append-only, log-structured
//! blob store. Given a key, it answers with a locator for the newest
//! non-tombstoned record carrying that key, or `NotFound` — without
//! consulting any in-memory structure beyond what this crate itself builds
//! over each closed base's sorted index file.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                         DiskIndex                             │
//! │  ┌────────────┐   ┌───────────────┐   ┌──────────────────┐   │
//! │  │BaseRegistry│──▶│LookupCoordinator│──▶│ per-base BaseIndex│  │
//! │  └────────────┘   └───────────────┘   │ (mmap + blocks +   │  │
//! │                                        │  bloom, RwLock +   │  │
//! │                                        │  sort mutex)       │  │
//! │                                        └──────────────────┘   │
//! │  ┌───────────────────────┐                                    │
//! │  │ SortedIndexBuilder     │  offline: unsorted → sorted,       │
//! │  │ (builder module)       │  tmp-file-then-atomic-rename       │
//! │  └───────────────────────┘                                    │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`record`] | `Key` ordering, `RecordControl` layout, structural validation |
//! | [`bloom`] | Whole-array Bloom filter sized per base |
//! | [`index_block`] | Per-base sorted block table + build/find |
//! | [`base`] | Base lifecycle, hold/release discipline, invalidation |
//! | [`builder`] | Offline sorted-index generator (unsorted → sorted) |
//! | [`lookup`] | Intra-block scan + multi-base `LookupCoordinator` |
//! | [`stats`] | Process-wide gauges and per-lookup search telemetry |
//! | [`config`] | Collaborator-supplied constants (block size, thresholds) |
//! | [`paths`] | Sorted/tmp index path naming, file size lookup |
//!
//! ## What this crate does not do
//!
//! The append/write path, the live-key RAM index, the data-sort scheduling
//! driver, CLI tooling, and full-file content checksums are external
//! collaborators (spec.md §1). This crate starts from a base's *closed*,
//! on-disk sorted index and answers point lookups over it.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use blobdex::{DiskIndex, config::IndexConfig};
//! use std::path::Path;
//!
//! let index = DiskIndex::new(IndexConfig::default());
//! let base = index.register_open_base(0);
//!
//! // Offline: turn a closed base's unsorted index into a searchable one.
//! index
//!     .generate_sorted_index(&base, Path::new("/data/base.index"), Path::new("/data/base"), u64::MAX)
//!     .unwrap();
//!
//! let key = [0u8; blobdex::record::KEY_SIZE];
//! let (result, _search_stats) = index.lookup(&key);
//! match result {
//!     Ok(locator) => println!("found at data offset {}", locator.data_offset),
//!     Err(blobdex::lookup::LookupError::NotFound) => println!("not found"),
//!     Err(blobdex::lookup::LookupError::Deadlock(_)) => println!("deadlock"),
//! }
//! ```

#![allow(dead_code)]

pub mod base;
pub mod bloom;
pub mod builder;
pub mod config;
pub mod index_block;
pub mod lookup;
pub mod paths;
pub mod record;
pub mod stats;

use base::{Base, BaseRegistry, BaseSlotView};
use config::IndexConfig;
use lookup::{Locator, LookupCoordinator, LookupError};
use record::{Key, RecordControl};
use stats::{SearchStats, StatsRegistry, StatsSnapshot};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur while building or rebuilding a base's index
/// (composes `builder::BuildError` and `index_block::BuildError` at the
/// public API surface, per spec.md §7/SPEC_FULL.md §2's error layer).
#[derive(Debug, Error)]
pub enum DiskIndexError {
    #[error(transparent)]
    Build(#[from] builder::BuildError),
    #[error(transparent)]
    Index(#[from] index_block::BuildError),
    #[error("base has no sorted mapping installed yet")]
    NotClosed,
}

/// The crate's public facade: a `BaseRegistry` plus the configuration and
/// statistics registries every operation on it needs. Mirrors the teacher's
/// `Engine` facade shape (one struct, one `open`/config-style constructor,
/// methods delegating to the per-concern modules) scoped down to the index
/// lookup path this crate owns.
pub struct DiskIndex {
    registry: BaseRegistry,
    config: IndexConfig,
    stats: StatsRegistry,
}

impl DiskIndex {
    pub fn new(config: IndexConfig) -> Self {
        DiskIndex {
            registry: BaseRegistry::default(),
            config,
            stats: StatsRegistry::default(),
        }
    }

    /// Registers a new, not-yet-closed base. The write path and the data-sort
    /// driver are external collaborators; this just gives the coordinator a
    /// slot to observe once the base is closed.
    pub fn register_open_base(&self, id: u64) -> Arc<Base> {
        let base = Base::new_open(id);
        self.registry.push(Arc::clone(&base));
        base
    }

    /// Drops a base from the registry entirely (used once a background
    /// invalidator has torn it down and it no longer needs to be observed,
    /// not merely invalidated — see [`Base::invalidate`](base::Base::invalidate)
    /// for the in-place sentinel transition lookups must tolerate).
    pub fn remove_base(&self, id: u64) {
        self.registry.remove(id);
    }

    /// `disk_index_lookup(key)` (spec.md §6): the newest non-tombstoned
    /// record for `key`, or `NotFound`/`Deadlock`. Returns the per-lookup
    /// [`SearchStats`] alongside the result so callers can assert on search
    /// behaviour directly.
    pub fn lookup(&self, key: &Key) -> (Result<Locator, LookupError>, SearchStats) {
        LookupCoordinator::find_by_key(&self.registry, key, &self.config, &self.stats)
    }

    /// `generate_sorted_index(base)` (spec.md §6): runs the offline
    /// sorted-index builder, then immediately rebuilds the block table and
    /// Bloom filter over the freshly sorted mapping (the block table built
    /// over the previous generation's bytes would otherwise be stale).
    pub fn generate_sorted_index(&self, base: &Arc<Base>, unsorted_index_path: &Path, data_path: &Path, data_file_size: u64) -> Result<(), DiskIndexError> {
        builder::generate_sorted_index(base, unsorted_index_path, data_path)?;
        self.fill_blocks(base, data_file_size)
    }

    /// `index_blocks_fill(base)` (spec.md §6): builds the block table +
    /// Bloom filter over a base's *currently installed* sorted mapping and
    /// installs the pair. Exposed standalone so a block table can be rebuilt
    /// (e.g. after a process restart discovers an already-sorted base)
    /// without re-running the sort.
    pub fn fill_blocks(&self, base: &Arc<Base>, data_file_size: u64) -> Result<(), DiskIndexError> {
        let index = match base.snapshot_slot() {
            BaseSlotView::Closed(index) => index,
            BaseSlotView::Open | BaseSlotView::Invalidated => return Err(DiskIndexError::NotClosed),
        };
        let mmap = index.sorted_mmap();
        let checker = |rc: &RecordControl| rc.validate(data_file_size).is_ok();
        let (blocks, bloom, report) = index_block::build(&mmap, self.config.block_entries, self.config.bits_per_block, self.config.corrupt_max, &checker)?;
        let pair = base::BlockBloomPair { blocks, bloom, report };
        base::record_pair_installed(&self.stats, &pair);
        index.install_pair(pair);
        Ok(())
    }

    /// `index_blocks_destroy(base)` (spec.md §6): idempotent; a base with no
    /// installed pair (already destroyed, or never filled) is a no-op.
    pub fn destroy_blocks(&self, base: &Arc<Base>) {
        if let BaseSlotView::Closed(index) = base.snapshot_slot()
            && let Some(pair) = index.destroy_pair()
        {
            base::record_pair_destroyed(&self.stats, &pair);
        }
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    pub fn base_count(&self) -> usize {
        self.registry.len()
    }
}
