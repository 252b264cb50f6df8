/// Tests for the packed shader-variable encoding and the variable table

use super::*;

// ============================================================================
// Tests: ShaderVariable packing
// ============================================================================

#[test]
fn test_pack_unpack_roundtrip() {
    let var = ShaderVariable::new(3, 7, ShaderStage::Fragment, ShaderVariableKind::SampledImage);
    assert_eq!(var.permutation(), 3);
    assert_eq!(var.slot(), 7);
    assert_eq!(var.stage(), ShaderStage::Fragment);
    assert_eq!(var.kind(), ShaderVariableKind::SampledImage);
}

#[test]
fn test_pack_extremes() {
    let var = ShaderVariable::new(
        u16::MAX,
        u8::MAX,
        ShaderStage::Compute,
        ShaderVariableKind::CombinedImageSampler,
    );
    assert_eq!(var.permutation(), u16::MAX);
    assert_eq!(var.slot(), u8::MAX);
    assert_eq!(var.stage(), ShaderStage::Compute);
    assert_eq!(var.kind(), ShaderVariableKind::CombinedImageSampler);
}

#[test]
fn test_all_stages_roundtrip() {
    let stages = [
        ShaderStage::Vertex,
        ShaderStage::Hull,
        ShaderStage::Domain,
        ShaderStage::Geometry,
        ShaderStage::Fragment,
        ShaderStage::Compute,
    ];
    for stage in stages {
        let var = ShaderVariable::new(0, 0, stage, ShaderVariableKind::UniformBuffer);
        assert_eq!(var.stage(), stage);
    }
}

#[test]
fn test_all_kinds_roundtrip() {
    let kinds = [
        ShaderVariableKind::UniformBuffer,
        ShaderVariableKind::StorageBuffer,
        ShaderVariableKind::SampledImage,
        ShaderVariableKind::Sampler,
        ShaderVariableKind::CombinedImageSampler,
    ];
    for kind in kinds {
        let var = ShaderVariable::new(0, 0, ShaderStage::Vertex, kind);
        assert_eq!(var.kind(), kind);
    }
}

#[test]
fn test_distinct_fields_distinct_bits() {
    let a = ShaderVariable::new(0, 0, ShaderStage::Vertex, ShaderVariableKind::UniformBuffer);
    let b = ShaderVariable::new(0, 1, ShaderStage::Vertex, ShaderVariableKind::UniformBuffer);
    let c = ShaderVariable::new(0, 0, ShaderStage::Fragment, ShaderVariableKind::UniformBuffer);
    let d = ShaderVariable::new(1, 0, ShaderStage::Vertex, ShaderVariableKind::UniformBuffer);
    assert_ne!(a.bits(), b.bits());
    assert_ne!(a.bits(), c.bits());
    assert_ne!(a.bits(), d.bits());
}

// ============================================================================
// Tests: ShaderVariableTable
// ============================================================================

#[test]
fn test_table_find() {
    let mut table = ShaderVariableTable::new();
    let var = ShaderVariable::new(0, 2, ShaderStage::Fragment, ShaderVariableKind::SampledImage);
    table.insert("u_albedo", var);

    assert_eq!(table.find("u_albedo"), Some(var));
}

#[test]
fn test_table_find_unknown_returns_none() {
    let table = ShaderVariableTable::new();
    // Find-or-null: unknown names are a deliberate None, not an error
    assert_eq!(table.find("u_missing"), None);
}

#[test]
fn test_table_merge() {
    let mut vs_table = ShaderVariableTable::new();
    vs_table.insert(
        "u_transforms",
        ShaderVariable::new(0, 0, ShaderStage::Vertex, ShaderVariableKind::UniformBuffer),
    );

    let mut fs_table = ShaderVariableTable::new();
    fs_table.insert(
        "u_albedo",
        ShaderVariable::new(0, 1, ShaderStage::Fragment, ShaderVariableKind::SampledImage),
    );

    let mut merged = ShaderVariableTable::new();
    merged.merge(&vs_table);
    merged.merge(&fs_table);

    assert_eq!(merged.len(), 2);
    assert!(merged.find("u_transforms").is_some());
    assert!(merged.find("u_albedo").is_some());
}

#[test]
fn test_stage_flags_from_stage() {
    assert_eq!(
        ShaderStageFlags::from(ShaderStage::Vertex),
        ShaderStageFlags::VERTEX
    );
    assert_eq!(
        ShaderStageFlags::from(ShaderStage::Compute),
        ShaderStageFlags::COMPUTE
    );
}
