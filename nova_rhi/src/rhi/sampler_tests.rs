/// Tests for sampler descriptor hashing

use super::*;
use crate::hash::ContentHash;

#[test]
fn test_identical_descs_hash_identically() {
    let a = SamplerDesc::new();
    let b = SamplerDesc::new();
    assert_eq!(a.content_hash(), b.content_hash());
}

#[test]
fn test_hash_memoized_across_calls() {
    let desc = SamplerDesc::new().with_max_anisotropy(16.0);
    assert_eq!(desc.content_hash(), desc.content_hash());
}

#[test]
fn test_address_mode_changes_hash() {
    let a = SamplerDesc::new();
    let b = SamplerDesc::new().with_address_modes(
        AddressMode::ClampToEdge,
        AddressMode::Repeat,
        AddressMode::Repeat,
    );
    assert_ne!(a.content_hash(), b.content_hash());
}

#[test]
fn test_filter_changes_hash() {
    let a = SamplerDesc::new();
    let b = SamplerDesc::new().with_filters(Filter::Nearest, Filter::Nearest, Filter::Nearest);
    assert_ne!(a.content_hash(), b.content_hash());
}

#[test]
fn test_anisotropy_changes_hash() {
    let a = SamplerDesc::new();
    let b = SamplerDesc::new().with_max_anisotropy(16.0);
    assert_ne!(a.content_hash(), b.content_hash());
}

#[test]
fn test_compare_op_changes_hash() {
    let a = SamplerDesc::new();
    let b = SamplerDesc::new().with_compare_op(CompareOp::LessOrEqual);
    assert_ne!(a.content_hash(), b.content_hash());
}

#[test]
fn test_border_color_changes_hash() {
    let a = SamplerDesc::new().with_border_color(BorderColor::OpaqueBlack);
    let b = SamplerDesc::new().with_border_color(BorderColor::OpaqueWhite);
    assert_ne!(a.content_hash(), b.content_hash());
}

#[test]
fn test_lod_changes_hash() {
    let a = SamplerDesc::new();
    let b = SamplerDesc::new().with_lod(0.5, 0.0, 8.0);
    assert_ne!(a.content_hash(), b.content_hash());
}
