//! File naming and size helpers (spec.md §6's "File formats and layout").

use std::io;
use std::path::{Path, PathBuf};

/// `<data>-0.<generation>.index.tmp` — the scratch file `generate_sorted_index`
/// writes the sorted copy into before the atomic rename.
pub fn tmp_index_path(data_path: &Path, generation: u64) -> PathBuf {
    sibling_with_suffix(data_path, generation, "index.tmp")
}

/// `<data>-0.<generation>.index.sorted` — the renamed, installed sorted index.
pub fn sorted_index_path(data_path: &Path, generation: u64) -> PathBuf {
    sibling_with_suffix(data_path, generation, "index.sorted")
}

fn sibling_with_suffix(data_path: &Path, generation: u64, suffix: &str) -> PathBuf {
    let stem = data_path.to_string_lossy();
    PathBuf::from(format!("{stem}-0.{generation}.{suffix}"))
}

/// `get_actual_size(path) -> bytes | IO-ERROR` (spec.md §6). There is no
/// lower file-descriptor layer in this crate to delegate to, so this is a
/// direct `std::fs::metadata` wrapper.
pub fn get_actual_size(path: &Path) -> io::Result<u64> {
    Ok(std::fs::metadata(path)?.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tmp_and_sorted_paths_share_the_generation_and_differ_by_suffix() {
        let data = Path::new("/var/lib/blobdex/data");
        assert_eq!(
            tmp_index_path(data, 3),
            PathBuf::from("/var/lib/blobdex/data-0.3.index.tmp")
        );
        assert_eq!(
            sorted_index_path(data, 3),
            PathBuf::from("/var/lib/blobdex/data-0.3.index.sorted")
        );
    }

    #[test]
    fn get_actual_size_reports_the_real_file_size() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(tmp.path(), b"twelve bytes").unwrap();
        assert_eq!(get_actual_size(tmp.path()).unwrap(), 12);
    }

    #[test]
    fn get_actual_size_propagates_io_errors_for_a_missing_file() {
        let missing = Path::new("/nonexistent/path/that/should/not/exist");
        assert!(get_actual_size(missing).is_err());
    }
}
