//! Collaborator-supplied constants (spec.md §6). No file-based
//! configuration parsing — out of scope per spec.md §1 — construct one of
//! these directly, the way the teacher's `EngineConfig` is built.

#[derive(Debug, Clone, Copy)]
pub struct IndexConfig {
    /// Records per index block (`B` in spec.md §4.3).
    pub block_entries: u64,
    /// Bloom bits allotted per block.
    pub bits_per_block: u64,
    /// Skipped-entry count above which `IndexBlockTable::build` aborts with
    /// `CORRUPT-FATAL`.
    pub corrupt_max: u64,
    /// `LookupCoordinator` bound on invalidation-triggered retries before
    /// returning `DEADLOCK`.
    pub max_tries: u32,
}

impl Default for IndexConfig {
    fn default() -> Self {
        IndexConfig {
            block_entries: 128,
            bits_per_block: 16,
            corrupt_max: 16,
            max_tries: 10,
        }
    }
}
