use crate::bloom::BloomFilter;

#[test]
fn inserted_keys_always_probe_present() {
    let mut bloom = BloomFilter::try_new(64, 128, 16).unwrap();
    let keys: Vec<Vec<u8>> = (0u8..64).map(|i| vec![i, i.wrapping_mul(7)]).collect();
    for k in &keys {
        bloom.insert(k);
    }
    for k in &keys {
        assert!(bloom.probe(k), "no false negatives are allowed");
    }
}

#[test]
fn an_empty_filter_rejects_everything_it_was_never_given() {
    let bloom = BloomFilter::try_new(64, 128, 16).unwrap();
    assert!(!bloom.probe(b"never-inserted"));
}

#[test]
fn probing_is_deterministic_for_the_same_array_size() {
    let mut a = BloomFilter::try_new(64, 128, 16).unwrap();
    let mut b = BloomFilter::try_new(64, 128, 16).unwrap();
    a.insert(b"same-key");
    b.insert(b"same-key");
    assert_eq!(a.probe(b"same-key"), b.probe(b"same-key"));
    assert_eq!(a.probe(b"other-key"), b.probe(b"other-key"));
}
