//! Offline sorted-index generator (spec.md §4.6): maps the unsorted index,
//! copies it into a fresh `.tmp` file, sorts the copy by
//! `compare_with_tombstone`, installs the mapping under the base's sort
//! mutex, and renames `.tmp` into its `.sorted` home.
//!
//! Grounded on the teacher's `sstable/builder.rs` tmp-file-then-rename write
//! pattern (write everything into `path.tmp`, `sync_all`, then `rename` into
//! place as the crash-safety boundary).

use crate::base::{Base, BaseIndex, BaseSlotView};
use crate::paths::{sorted_index_path, tmp_index_path};
use crate::record::{RECORD_STRIDE, RecordControl, compare_with_tombstone};
use memmap2::{Mmap, MmapMut};
use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("I/O error while generating sorted index: {0}")]
    Io(#[from] io::Error),
    #[error("allocation of {0} entries failed while sorting the index")]
    NoMemory(usize),
    #[error("source index file is empty or missing")]
    EmptySource,
}

/// Runs the nine-step procedure of spec.md §4.6 and returns the freshly
/// installed sorted-index mapping. On any failure after the tmp file is
/// created, the tmp file is removed and no partial state is left installed —
/// the unwind-in-reverse discipline spec.md §7 asks for.
pub fn generate_sorted_index(
    base: &Arc<Base>,
    unsorted_index_path: &Path,
    data_path: &Path,
) -> Result<Arc<Mmap>, BuildError> {
    // Steps 2: map the source read-only; reject empty/missing sources.
    let source_file = File::open(unsorted_index_path)?;
    let source_size = source_file.metadata()?.len();
    if source_size == 0 {
        return Err(BuildError::EmptySource);
    }
    // SAFETY: the file is ours for the duration of this build and is not
    // concurrently truncated by another writer (the base is closed to
    // writers before a sort is scheduled).
    let source_mmap = unsafe { Mmap::map(&source_file)? };

    // Step 1: create the tmp file.
    let tmp_path = tmp_index_path(data_path, base.id);
    match build_sorted_copy(&source_mmap, &tmp_path, source_size) {
        Ok(dest) => {
            let dest = Arc::new(dest);
            install(base, &dest);

            // Step 8: the rename is the linearisation point for external
            // observers of the on-disk state.
            let sorted_path = sorted_index_path(data_path, base.id);
            std::fs::rename(&tmp_path, &sorted_path)?;

            info!(base = base.id, bytes = source_size, "sorted index generated");
            // Step 9: the source mapping and file are dropped here.
            Ok(dest)
        }
        Err(e) => {
            let _ = std::fs::remove_file(&tmp_path);
            Err(e)
        }
    }
}

/// Step 7: swap the sort mapping slot under the base's own mutex if the base
/// is already closed (re-sorting an existing base); otherwise install a
/// fresh `BaseIndex` with no block/bloom pair yet, left for a following
/// `fill_blocks` call.
fn install(base: &Arc<Base>, dest: &Arc<Mmap>) {
    match base.snapshot_slot() {
        BaseSlotView::Closed(index) => {
            index.swap_sort(Arc::clone(dest));
        }
        BaseSlotView::Open | BaseSlotView::Invalidated => {
            base.install_index(Arc::new(BaseIndex::new(Arc::clone(dest), None)));
        }
    }
}

fn build_sorted_copy(source: &Mmap, tmp_path: &Path, size: u64) -> Result<Mmap, BuildError> {
    // Step 1: truncating create, mode governed by the process umask (no
    // lower file-descriptor layer here to set 0644 explicitly).
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .read(true)
        .truncate(true)
        .open(tmp_path)?;
    // Step 3: preallocate the destination to the source size.
    file.set_len(size)?;
    let mut dest = unsafe { MmapMut::map_mut(&file)? };

    // Step 4: copy bytes.
    dest.copy_from_slice(source);

    // Step 5: sort in place, stride = RECORD_STRIDE, tombstone-aware order.
    sort_stride(&mut dest)?;

    // Step 6: msync(SYNC).
    dest.flush()?;

    Ok(dest.make_read_only()?)
}

/// Sorts a byte buffer of fixed-stride `RecordControl` entries by
/// `compare_with_tombstone`. Entries are lifted into an owned `Vec` rather
/// than sorted as raw byte slices in place, since Rust's slice-sort APIs
/// need a `[T]` of uniform, independently-movable elements; `RECORD_STRIDE`
/// byte chunks serve as that `T` here.
fn sort_stride(buf: &mut [u8]) -> Result<(), BuildError> {
    let n = buf.len() / RECORD_STRIDE;
    let mut entries: Vec<[u8; RECORD_STRIDE]> = Vec::new();
    entries
        .try_reserve_exact(n)
        .map_err(|_| BuildError::NoMemory(n))?;
    for i in 0..n {
        let off = i * RECORD_STRIDE;
        let mut e = [0u8; RECORD_STRIDE];
        e.copy_from_slice(&buf[off..off + RECORD_STRIDE]);
        entries.push(e);
    }

    entries.sort_by(|a, b| compare_with_tombstone(&RecordControl::read_from(a), &RecordControl::read_from(b)));

    for (i, e) in entries.iter().enumerate() {
        let off = i * RECORD_STRIDE;
        buf[off..off + RECORD_STRIDE].copy_from_slice(e);
    }
    Ok(())
}
