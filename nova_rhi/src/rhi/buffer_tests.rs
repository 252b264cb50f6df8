/// Tests for buffer descriptors and range resolution

use super::*;
use crate::hash::ContentHash;

// ============================================================================
// Tests: BufferDesc hashing
// ============================================================================

#[test]
fn test_identical_descs_hash_identically() {
    let a = BufferDesc::new(256)
        .with_usage(BufferUsage::UNIFORM)
        .with_access(BufferAccess::CPU_WRITE | BufferAccess::GPU_READ);
    let b = BufferDesc::new(256)
        .with_usage(BufferUsage::UNIFORM)
        .with_access(BufferAccess::CPU_WRITE | BufferAccess::GPU_READ);
    assert_eq!(a.content_hash(), b.content_hash());
}

#[test]
fn test_hash_is_memoized() {
    let desc = BufferDesc::new(256).with_usage(BufferUsage::VERTEX);
    let first = desc.content_hash();
    let second = desc.content_hash();
    assert_eq!(first, second);
}

#[test]
fn test_size_changes_hash() {
    let a = BufferDesc::new(256).with_usage(BufferUsage::UNIFORM);
    let b = BufferDesc::new(512).with_usage(BufferUsage::UNIFORM);
    assert_ne!(a.content_hash(), b.content_hash());
}

#[test]
fn test_usage_changes_hash() {
    let a = BufferDesc::new(256).with_usage(BufferUsage::UNIFORM);
    let b = BufferDesc::new(256).with_usage(BufferUsage::STORAGE);
    assert_ne!(a.content_hash(), b.content_hash());
}

#[test]
fn test_setter_invalidates_memoized_hash() {
    let desc = BufferDesc::new(256).with_usage(BufferUsage::UNIFORM);
    let before = desc.content_hash();
    let desc = desc.with_size(512);
    assert_ne!(desc.content_hash(), before);
}

#[test]
fn test_clone_preserves_hash() {
    let desc = BufferDesc::new(256).with_usage(BufferUsage::INDEX);
    let hash = desc.content_hash();
    assert_eq!(desc.clone().content_hash(), hash);
}

#[test]
fn test_cpu_writable() {
    let writable = BufferDesc::new(16).with_access(BufferAccess::CPU_WRITE);
    let gpu_only = BufferDesc::new(16).with_access(BufferAccess::GPU_READ);
    assert!(writable.cpu_writable());
    assert!(!gpu_only.cpu_writable());
}

// ============================================================================
// Tests: range resolution
// ============================================================================

#[test]
fn test_resolve_whole_size() {
    assert_eq!(resolve_range(256, WHOLE_SIZE, 0), Some(256));
    assert_eq!(resolve_range(256, WHOLE_SIZE, 128), Some(128));
}

#[test]
fn test_resolve_exact_range() {
    assert_eq!(resolve_range(256, 256, 0), Some(256));
    assert_eq!(resolve_range(256, 64, 192), Some(64));
}

#[test]
fn test_resolve_offset_at_end_rejected() {
    assert_eq!(resolve_range(256, 1, 256), None);
    assert_eq!(resolve_range(256, WHOLE_SIZE, 256), None);
}

#[test]
fn test_resolve_overflowing_range_rejected() {
    assert_eq!(resolve_range(256, 129, 128), None);
    assert_eq!(resolve_range(256, 257, 0), None);
}
