/// Tests for hash memoization and determinism

use super::*;

// ============================================================================
// Tests: HashCell
// ============================================================================

#[test]
fn test_hash_cell_computes_once() {
    let cell = HashCell::new();
    let mut calls = 0;
    let first = cell.get_or_compute(|| {
        calls += 1;
        1234
    });
    let second = cell.get_or_compute(|| {
        calls += 1;
        5678
    });
    assert_eq!(first, 1234);
    assert_eq!(second, 1234);
    assert_eq!(calls, 1);
}

#[test]
fn test_hash_cell_invalidate_recomputes() {
    let cell = HashCell::new();
    assert_eq!(cell.get_or_compute(|| 1), 1);
    cell.invalidate();
    assert_eq!(cell.get_or_compute(|| 2), 2);
}

#[test]
fn test_hash_cell_zero_is_remapped() {
    let cell = HashCell::new();
    let hash = cell.get_or_compute(|| 0);
    assert_ne!(hash, 0);
    // Memoized: the closure is not consulted again
    assert_eq!(cell.get_or_compute(|| 99), hash);
}

#[test]
fn test_hash_cell_clone_keeps_value() {
    let cell = HashCell::new();
    let value = cell.get_or_compute(|| 42);
    let cloned = cell.clone();
    assert_eq!(cloned.get_or_compute(|| 7), value);
}

// ============================================================================
// Tests: DescHasher determinism
// ============================================================================

#[test]
fn test_desc_hasher_deterministic() {
    let hash = |x: u32| {
        let mut h = DescHasher::new();
        h.field(&x).f32_field(1.5);
        h.finish()
    };
    assert_eq!(hash(7), hash(7));
    assert_ne!(hash(7), hash(8));
}

#[test]
fn test_desc_hasher_field_order_matters() {
    let mut a = DescHasher::new();
    a.field(&1u32).field(&2u32);
    let mut b = DescHasher::new();
    b.field(&2u32).field(&1u32);
    assert_ne!(a.finish(), b.finish());
}

#[test]
fn test_desc_hasher_f32_by_bits() {
    let mut pos = DescHasher::new();
    pos.f32_field(0.0);
    let mut neg = DescHasher::new();
    neg.f32_field(-0.0);
    // +0.0 and -0.0 have different bit patterns, so different hashes
    assert_ne!(pos.finish(), neg.finish());
}

#[test]
fn test_desc_hasher_sub_hash_composes() {
    let mut a = DescHasher::new();
    a.sub_hash(111).sub_hash(222);
    let mut b = DescHasher::new();
    b.sub_hash(111).sub_hash(333);
    assert_ne!(a.finish(), b.finish());
}

#[test]
fn test_desc_hasher_identity_distinguishes_pointers() {
    let x = 1u32;
    let y = 1u32;
    let mut a = DescHasher::new();
    a.identity(&x as *const u32);
    let mut b = DescHasher::new();
    b.identity(&y as *const u32);
    assert_ne!(a.finish(), b.finish());
}
