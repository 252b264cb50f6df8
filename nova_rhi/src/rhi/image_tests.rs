/// Tests for image descriptor validation and format queries

use super::*;
use crate::hash::ContentHash;

// ============================================================================
// Tests: dimensionality validation
// ============================================================================

#[test]
fn test_valid_2d_image() {
    let desc = ImageDesc::new_2d(Format::R8G8B8A8_UNORM, 64, 64);
    assert!(desc.validate().is_ok());
}

#[test]
fn test_zero_extent_rejected() {
    let desc = ImageDesc::new_2d(Format::R8G8B8A8_UNORM, 0, 64);
    assert!(desc.validate().is_err());
}

#[test]
fn test_2d_with_depth_rejected() {
    let desc = ImageDesc::new_2d(Format::R8G8B8A8_UNORM, 64, 64).with_extent(64, 64, 4);
    assert!(desc.validate().is_err());
}

#[test]
fn test_1d_with_height_rejected() {
    let desc = ImageDesc::new_2d(Format::R8G8B8A8_UNORM, 64, 64).with_type(ImageType::Tex1D);
    assert!(desc.validate().is_err());
}

#[test]
fn test_3d_desc_as_cube_rejected() {
    // A 3D extent requested as Cube is a precondition violation
    let desc = ImageDesc::new_2d(Format::R8G8B8A8_UNORM, 64, 64)
        .with_extent(64, 64, 16)
        .with_type(ImageType::Cube);
    assert!(desc.validate().is_err());
}

#[test]
fn test_cube_needs_six_layers() {
    let bad = ImageDesc::new_2d(Format::R8G8B8A8_UNORM, 64, 64).with_type(ImageType::Cube);
    assert!(bad.validate().is_err());

    let good = ImageDesc::new_2d(Format::R8G8B8A8_UNORM, 64, 64)
        .with_type(ImageType::Cube)
        .with_array_layers(6);
    assert!(good.validate().is_ok());
}

#[test]
fn test_cube_needs_square_faces() {
    let desc = ImageDesc::new_2d(Format::R8G8B8A8_UNORM, 64, 32)
        .with_type(ImageType::Cube)
        .with_array_layers(6);
    assert!(desc.validate().is_err());
}

#[test]
fn test_cube_array_layers_multiple_of_six() {
    let bad = ImageDesc::new_2d(Format::R8G8B8A8_UNORM, 64, 64)
        .with_type(ImageType::CubeArray)
        .with_array_layers(8);
    assert!(bad.validate().is_err());

    let good = ImageDesc::new_2d(Format::R8G8B8A8_UNORM, 64, 64)
        .with_type(ImageType::CubeArray)
        .with_array_layers(12);
    assert!(good.validate().is_ok());
}

#[test]
fn test_3d_with_array_layers_rejected() {
    let desc = ImageDesc::new_2d(Format::R8G8B8A8_UNORM, 64, 64)
        .with_type(ImageType::Tex3D)
        .with_extent(64, 64, 8)
        .with_array_layers(2);
    assert!(desc.validate().is_err());
}

#[test]
fn test_2d_array_allows_layers() {
    let desc = ImageDesc::new_2d(Format::R8G8B8A8_UNORM, 64, 64)
        .with_type(ImageType::Tex2DArray)
        .with_array_layers(4);
    assert!(desc.validate().is_ok());
}

// ============================================================================
// Tests: hashing
// ============================================================================

#[test]
fn test_identical_descs_hash_identically() {
    let a = ImageDesc::new_2d(Format::R8G8B8A8_UNORM, 64, 64);
    let b = ImageDesc::new_2d(Format::R8G8B8A8_UNORM, 64, 64);
    assert_eq!(a.content_hash(), b.content_hash());
}

#[test]
fn test_format_changes_hash() {
    let a = ImageDesc::new_2d(Format::R8G8B8A8_UNORM, 64, 64);
    let b = ImageDesc::new_2d(Format::R8G8B8A8_SRGB, 64, 64);
    assert_ne!(a.content_hash(), b.content_hash());
}

// ============================================================================
// Tests: format queries
// ============================================================================

#[test]
fn test_depth_format_classification() {
    assert!(Format::D32_FLOAT.is_depth());
    assert!(Format::D24_UNORM_S8_UINT.is_depth());
    assert!(!Format::R8G8B8A8_UNORM.is_depth());
}

#[test]
fn test_stencil_classification() {
    assert!(Format::D24_UNORM_S8_UINT.has_stencil());
    assert!(!Format::D32_FLOAT.has_stencil());
}

#[test]
fn test_format_sizes() {
    assert_eq!(Format::R8_UNORM.size_bytes(), 1);
    assert_eq!(Format::R8G8B8A8_UNORM.size_bytes(), 4);
    assert_eq!(Format::R16G16B16A16_FLOAT.size_bytes(), 8);
    assert_eq!(Format::R32G32B32A32_FLOAT.size_bytes(), 16);
}
