use crate::bloom::{num_hashes, size_for, BloomFilter};

#[test]
fn size_for_rounds_up_to_whole_blocks() {
    // 1024 records at 128 per block => 8 blocks exactly.
    let bytes = size_for(1024, 128, 16);
    assert_eq!(bytes, 8 * 16 / 8);
}

#[test]
fn size_for_rounds_up_a_partial_trailing_block() {
    // 1000 records at 128 per block => 8 blocks (last one partially full).
    let bytes = size_for(1000, 128, 16);
    assert_eq!(bytes, 8 * 16 / 8);
}

#[test]
fn num_hashes_clamps_to_the_documented_range() {
    assert_eq!(num_hashes(0.0), 1);
    assert_eq!(num_hashes(1000.0), 20);
    assert_eq!(num_hashes(10.0), 7); // round(0.69 * 10) = 7
}

#[test]
fn try_new_produces_a_filter_sized_for_the_request() {
    let bloom = BloomFilter::try_new(100, 128, 16).unwrap();
    assert!(bloom.size_bytes() > 0);
    assert_eq!(bloom.num_bits(), bloom.size_bytes() as u64 * 8);
}
