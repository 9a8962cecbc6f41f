use crate::base::{Base, BaseIndex, BaseRegistry, BlockBloomPair};
use crate::config::IndexConfig;
use crate::lookup::{LookupCoordinator, LookupError};
use crate::record::{FLAG_REMOVED, KEY_SIZE, RECORD_STRIDE, RecordControl};
use crate::stats::StatsRegistry;
use memmap2::Mmap;
use std::sync::Arc;

fn key(byte: u8) -> crate::record::Key {
    let mut k = [0u8; KEY_SIZE];
    k[0] = byte;
    k
}

fn mmap_of(entries: &[(u8, u64, u64)]) -> Arc<Mmap> {
    let mut buf = vec![0u8; entries.len() * RECORD_STRIDE];
    for (i, (k, flags, position)) in entries.iter().enumerate() {
        let rc = RecordControl {
            key: key(*k),
            flags: *flags,
            data_size: 10,
            disk_size: 10,
            position: *position,
        };
        rc.write_to(&mut buf[i * RECORD_STRIDE..(i + 1) * RECORD_STRIDE]);
    }
    use std::io::{Seek, SeekFrom, Write};
    let mut file = tempfile::tempfile().unwrap();
    file.write_all(&buf).unwrap();
    file.seek(SeekFrom::Start(0)).unwrap();
    Arc::new(unsafe { Mmap::map(&file).unwrap() })
}

fn closed_base(id: u64, entries: &[(u8, u64, u64)], config: &IndexConfig) -> Arc<Base> {
    let mmap = mmap_of(entries);
    let check = |rc: &RecordControl| rc.validate(u64::MAX).is_ok();
    let (blocks, bloom, report) = crate::index_block::build(&mmap, config.block_entries, config.bits_per_block, config.corrupt_max, &check).unwrap();
    let base = Base::new_open(id);
    base.install_index(Arc::new(BaseIndex::new(mmap, Some(BlockBloomPair { blocks, bloom, report }))));
    base
}

#[test]
fn newest_base_wins_over_an_older_tombstoned_entry() {
    let config = IndexConfig::default();
    let registry = BaseRegistry::default();
    registry.push(closed_base(0, &[(b'K', FLAG_REMOVED, 100)], &config));
    registry.push(closed_base(1, &[(b'K', 0, 200)], &config));
    let stats_registry = StatsRegistry::default();

    let (result, stats) = LookupCoordinator::find_by_key(&registry, &key(b'K'), &config, &stats_registry);
    let locator = result.unwrap();
    assert_eq!(locator.data_offset, 200);
    assert_eq!(locator.base_hold.base_id(), 1);
    assert_eq!(stats.loops, 1);
    assert_eq!(stats.bsearch_found, 1);
    assert_eq!(stats.additional_reads, 0);
}

#[test]
fn a_key_removed_everywhere_is_not_found() {
    let config = IndexConfig::default();
    let registry = BaseRegistry::default();
    registry.push(closed_base(0, &[(b'K', FLAG_REMOVED, 100)], &config));
    let stats_registry = StatsRegistry::default();

    let (result, _stats) = LookupCoordinator::find_by_key(&registry, &key(b'K'), &config, &stats_registry);
    assert!(matches!(result, Err(LookupError::NotFound)));
}

#[test]
fn an_absent_key_registers_bloom_null_for_every_closed_base() {
    let config = IndexConfig::default();
    let registry = BaseRegistry::default();
    registry.push(closed_base(0, &[(b'A', 0, 1)], &config));
    registry.push(closed_base(1, &[(b'B', 0, 2)], &config));
    let stats_registry = StatsRegistry::default();

    let (result, stats) = LookupCoordinator::find_by_key(&registry, &key(b'Z'), &config, &stats_registry);
    assert!(matches!(result, Err(LookupError::NotFound)));
    assert!(stats.bloom_null >= 2);
}

#[test]
fn an_open_base_is_skipped_without_consulting_its_index() {
    let config = IndexConfig::default();
    let registry = BaseRegistry::default();
    registry.push(Base::new_open(0));
    registry.push(closed_base(1, &[(b'K', 0, 42)], &config));
    let stats_registry = StatsRegistry::default();

    let (result, stats) = LookupCoordinator::find_by_key(&registry, &key(b'K'), &config, &stats_registry);
    assert_eq!(result.unwrap().data_offset, 42);
    assert_eq!(stats.no_sort, 1);
}

#[test]
fn an_invalidated_base_is_dropped_from_the_iteration_and_the_lookup_continues() {
    let config = IndexConfig::default();
    let registry = BaseRegistry::default();
    let invalidated = closed_base(0, &[(b'K', 0, 1)], &config);
    invalidated.invalidate();
    registry.push(invalidated);
    registry.push(closed_base(1, &[(b'K', 0, 99)], &config));
    let stats_registry = StatsRegistry::default();

    let (result, _stats) = LookupCoordinator::find_by_key(&registry, &key(b'K'), &config, &stats_registry);
    assert_eq!(result.unwrap().data_offset, 99);
}

#[test]
fn exhausting_retries_against_invalidated_bases_returns_deadlock() {
    let mut config = IndexConfig::default();
    config.max_tries = 2;
    let registry = BaseRegistry::default();
    let invalidated = closed_base(0, &[(b'K', 0, 1)], &config);
    invalidated.invalidate();
    registry.push(invalidated);
    let stats_registry = StatsRegistry::default();

    let (result, _stats) = LookupCoordinator::find_by_key(&registry, &key(b'K'), &config, &stats_registry);
    assert!(matches!(result, Err(LookupError::Deadlock(2))));
}
