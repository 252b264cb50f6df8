//! Integration tests for the Vulkan device with a real GPU
//!
//! These tests verify resource creation, buffer mapping, cache
//! de-duplication and command submission against a real Vulkan driver.
//! All tests require a GPU and are marked with #[ignore].
//!
//! Run with: cargo test --test vulkan_device_tests -- --ignored

use nova_rhi::nova::rhi::{
    AddressMode, Buffer, BufferAccess, BufferDesc, BufferUsage, CommandBuffer, CommandBufferKind,
    Device, Format, Image, ImageDesc, ImageType, ImageUsage, QueueKind, RendererConfig,
    SamplerDesc, WHOLE_SIZE,
};
use nova_rhi_vulkan::VulkanDevice;
use serial_test::serial;
use std::sync::Arc;

fn test_device() -> VulkanDevice {
    let config = RendererConfig {
        enable_validation: true,
        ..Default::default()
    };
    VulkanDevice::new_headless(&config).expect("Vulkan device creation failed")
}

// ============================================================================
// DEVICE AND BUFFER TESTS
// ============================================================================

#[test]
#[ignore] // Requires GPU
#[serial]
fn test_integration_device_creation() {
    let device = test_device();
    device.wait_idle().unwrap();
}

#[test]
#[ignore] // Requires GPU
#[serial]
fn test_integration_uniform_buffer_map_write_unmap() {
    let device = test_device();

    let buffer = device.create_uniform_buffer(256).unwrap();
    assert_eq!(buffer.size(), 256);

    // Write a 4x4 identity matrix through the mapping
    let identity: [f32; 16] = [
        1.0, 0.0, 0.0, 0.0, //
        0.0, 1.0, 0.0, 0.0, //
        0.0, 0.0, 1.0, 0.0, //
        0.0, 0.0, 0.0, 1.0,
    ];
    let ptr = buffer.map(256, 0).unwrap();
    unsafe {
        std::ptr::copy_nonoverlapping(identity.as_ptr() as *const u8, ptr, 64);
    }
    buffer.flush_mapped_range(0, 64).unwrap();
    buffer.unmap();

    // Map again (fresh logical mapping) and read the data back
    let ptr = buffer.map(WHOLE_SIZE, 0).unwrap();
    let mut readback = [0f32; 16];
    unsafe {
        std::ptr::copy_nonoverlapping(ptr as *const u8, readback.as_mut_ptr() as *mut u8, 64);
    }
    buffer.unmap();
    assert_eq!(readback, identity);
}

#[test]
#[ignore] // Requires GPU
#[serial]
fn test_integration_map_gpu_only_buffer_fails() {
    let device = test_device();
    let desc = BufferDesc::new(64)
        .with_usage(BufferUsage::STORAGE)
        .with_access(BufferAccess::GPU_READ | BufferAccess::GPU_WRITE);
    let buffer = device.create_buffer(&desc).unwrap();
    assert!(buffer.map(64, 0).is_err());
}

#[test]
#[ignore] // Requires GPU
#[serial]
fn test_integration_buffer_update_roundtrip() {
    let device = test_device();
    let buffer = device.create_vertex_buffer(128).unwrap();
    let data: Vec<u8> = (0..64).collect();
    buffer.update(&data, 32, false).unwrap();
}

// ============================================================================
// IMAGE TESTS
// ============================================================================

#[test]
#[ignore] // Requires GPU
#[serial]
fn test_integration_image_creation_and_upload() {
    let device = test_device();
    let pixels = vec![255u8; 16 * 16 * 4];
    let desc = ImageDesc::new_2d(Format::R8G8B8A8_UNORM, 16, 16)
        .with_usage(ImageUsage::SAMPLED | ImageUsage::TRANSFER_DST);
    let image = device.create_image(&desc, Some(&pixels)).unwrap();
    assert_eq!(image.desc().width, 16);
    device.wait_idle().unwrap();
}

#[test]
#[ignore] // Requires GPU
#[serial]
fn test_integration_mismatched_image_type_rejected() {
    let device = test_device();
    let desc = ImageDesc::new_2d(Format::R8G8B8A8_UNORM, 16, 16)
        .with_extent(16, 16, 8)
        .with_type(ImageType::Cube);
    assert!(device.create_image(&desc, None).is_err());
}

// ============================================================================
// CACHE TESTS
// ============================================================================

#[test]
#[ignore] // Requires GPU
#[serial]
fn test_integration_sampler_cache_deduplicates() {
    let device = test_device();
    let a = device.get_or_create_sampler(&SamplerDesc::new()).unwrap();
    let b = device.get_or_create_sampler(&SamplerDesc::new()).unwrap();
    assert!(Arc::ptr_eq(&a, &b));

    let c = device
        .get_or_create_sampler(&SamplerDesc::new().with_address_modes(
            AddressMode::ClampToEdge,
            AddressMode::ClampToEdge,
            AddressMode::ClampToEdge,
        ))
        .unwrap();
    assert!(!Arc::ptr_eq(&a, &c));
}

// ============================================================================
// COMMAND BUFFER TESTS
// ============================================================================

#[test]
#[ignore] // Requires GPU
#[serial]
fn test_integration_command_buffer_record_cycle() {
    let device = test_device();
    let mut cmd = device
        .create_command_buffer(CommandBufferKind::Primary)
        .unwrap();

    for i in 0..5 {
        assert!(cmd.begin().is_ok(), "Cycle {}: begin() failed", i);
        assert!(cmd.end().is_ok(), "Cycle {}: end() failed", i);
        assert!(cmd.reset().is_ok(), "Cycle {}: reset() failed", i);
    }
}

#[test]
#[ignore] // Requires GPU
#[serial]
fn test_integration_clear_image_submit_completes() {
    let device = test_device();
    let desc = ImageDesc::new_2d(Format::R8G8B8A8_UNORM, 64, 64)
        .with_usage(ImageUsage::SAMPLED | ImageUsage::TRANSFER_DST | ImageUsage::TRANSFER_SRC);
    let image = device.create_image(&desc, None).unwrap();

    let mut cmd = device
        .create_command_buffer(CommandBufferKind::Primary)
        .unwrap();
    cmd.begin().unwrap();
    cmd.clear_color_image(&image, [0.0, 0.5, 1.0, 1.0]).unwrap();
    cmd.end().unwrap();

    device.submit(QueueKind::Graphics, &[cmd.as_ref()]).unwrap();
    device.wait_idle().unwrap();
    assert_eq!(nova_rhi_vulkan::debug::validation_error_count(), 0);
}

#[test]
#[ignore] // Requires GPU
#[serial]
fn test_integration_wait_command_chains_submissions() {
    let device = test_device();
    let desc = ImageDesc::new_2d(Format::R8G8B8A8_UNORM, 32, 32)
        .with_usage(ImageUsage::TRANSFER_DST);
    let image = device.create_image(&desc, None).unwrap();

    let mut first = device
        .create_command_buffer(CommandBufferKind::Primary)
        .unwrap();
    first.begin().unwrap();
    first.clear_color_image(&image, [1.0, 0.0, 0.0, 1.0]).unwrap();
    first.end().unwrap();

    let mut second = device
        .create_command_buffer(CommandBufferKind::Primary)
        .unwrap();
    second.wait_command(first.as_ref()).unwrap();
    second.begin().unwrap();
    second.end().unwrap();

    device.submit(QueueKind::Graphics, &[first.as_ref()]).unwrap();
    device.submit(QueueKind::Graphics, &[second.as_ref()]).unwrap();
    device.wait_idle().unwrap();
    assert_eq!(nova_rhi_vulkan::debug::validation_error_count(), 0);
}

#[test]
#[ignore] // Requires GPU
#[serial]
fn test_integration_transfer_queue_submit() {
    let device = test_device();
    let src = device
        .create_buffer(
            &BufferDesc::new(64)
                .with_usage(BufferUsage::TRANSFER_SRC)
                .with_access(BufferAccess::CPU_WRITE | BufferAccess::GPU_READ),
        )
        .unwrap();
    let dst = device
        .create_buffer(
            &BufferDesc::new(64)
                .with_usage(BufferUsage::TRANSFER_DST)
                .with_access(BufferAccess::GPU_READ | BufferAccess::GPU_WRITE),
        )
        .unwrap();
    src.update(&[7u8; 64], 0, false).unwrap();

    let mut cmd = device
        .create_command_buffer(CommandBufferKind::Primary)
        .unwrap();
    cmd.begin().unwrap();
    cmd.copy_buffer(
        &src,
        &dst,
        &[nova_rhi::nova::rhi::BufferCopy {
            src_offset: 0,
            dst_offset: 0,
            size: 64,
        }],
    )
    .unwrap();
    cmd.end().unwrap();

    device.submit(QueueKind::Transfer, &[cmd.as_ref()]).unwrap();
    device.wait_idle().unwrap();
}
