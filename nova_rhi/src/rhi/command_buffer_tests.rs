/// Tests for the command buffer recording state machine

use super::*;
use crate::rhi::mock_device::MockCommandBuffer;

// ============================================================================
// Tests: RecordState transitions
// ============================================================================

#[test]
fn test_begin_end_reset_begin_is_legal() {
    let mut state = RecordState::Initial;
    assert!(state.begin().is_ok());
    assert!(state.end().is_ok());
    assert!(state.reset().is_ok());
    assert!(state.begin().is_ok());
}

#[test]
fn test_begin_twice_is_illegal() {
    let mut state = RecordState::Initial;
    state.begin().unwrap();
    assert!(state.begin().is_err());
}

#[test]
fn test_begin_after_end_without_reset_is_illegal() {
    let mut state = RecordState::Initial;
    state.begin().unwrap();
    state.end().unwrap();
    assert!(state.begin().is_err());
}

#[test]
fn test_end_without_begin_is_illegal() {
    let mut state = RecordState::Initial;
    assert!(state.end().is_err());
}

#[test]
fn test_end_twice_is_illegal() {
    let mut state = RecordState::Initial;
    state.begin().unwrap();
    state.end().unwrap();
    assert!(state.end().is_err());
}

#[test]
fn test_reset_while_recording_is_illegal() {
    let mut state = RecordState::Initial;
    state.begin().unwrap();
    assert!(state.reset().is_err());
}

#[test]
fn test_reset_from_initial_is_legal() {
    let mut state = RecordState::Initial;
    assert!(state.reset().is_ok());
    assert_eq!(state, RecordState::Initial);
}

#[test]
fn test_require_recording() {
    let mut state = RecordState::Initial;
    assert!(state.require_recording().is_err());
    state.begin().unwrap();
    assert!(state.require_recording().is_ok());
    state.end().unwrap();
    assert!(state.require_recording().is_err());
}

// ============================================================================
// Tests: recording legality through the trait (mock)
// ============================================================================

#[test]
fn test_draw_before_begin_is_rejected() {
    let mut cmd = MockCommandBuffer::new(CommandBufferKind::Primary);
    assert!(cmd.draw(3, 1, 0, 0).is_err());
}

#[test]
fn test_draw_after_end_is_rejected() {
    let mut cmd = MockCommandBuffer::new(CommandBufferKind::Primary);
    cmd.begin().unwrap();
    cmd.end().unwrap();
    assert!(cmd.draw(3, 1, 0, 0).is_err());
}

#[test]
fn test_draw_while_recording_succeeds() {
    let mut cmd = MockCommandBuffer::new(CommandBufferKind::Primary);
    cmd.begin().unwrap();
    assert!(cmd.draw(3, 1, 0, 0).is_ok());
    cmd.end().unwrap();
}

#[test]
fn test_full_record_cycle() {
    let mut cmd = MockCommandBuffer::new(CommandBufferKind::Primary);
    for _ in 0..3 {
        cmd.begin().unwrap();
        cmd.set_viewport(Viewport::new(64.0, 64.0)).unwrap();
        cmd.draw(3, 1, 0, 0).unwrap();
        cmd.end().unwrap();
        cmd.reset().unwrap();
    }
    assert_eq!(cmd.state(), RecordState::Initial);
}

#[test]
fn test_secondary_begin_with_target() {
    use crate::rhi::mock_device::MockDevice;
    use crate::rhi::{AttachmentDesc, Device, Format, FrameBufferDesc, ImageDesc, ImageUsage};

    let device = MockDevice::new();
    let color = device
        .create_image(
            &ImageDesc::new_2d(Format::R8G8B8A8_UNORM, 64, 64)
                .with_usage(ImageUsage::COLOR_ATTACHMENT),
            None,
        )
        .unwrap();
    let fb = device
        .create_framebuffer(
            &FrameBufferDesc::new(64, 64).with_color_attachment(AttachmentDesc::new(color)),
        )
        .unwrap();

    let mut secondary = MockCommandBuffer::new(CommandBufferKind::Secondary);
    assert!(secondary.begin_with_target(&fb).is_ok());

    let mut primary = MockCommandBuffer::new(CommandBufferKind::Primary);
    assert!(primary.begin_with_target(&fb).is_err());
}

#[test]
fn test_execute_commands_rejected_on_secondary() {
    let mut secondary = MockCommandBuffer::new(CommandBufferKind::Secondary);
    secondary.begin().unwrap();
    assert!(secondary.execute_commands(&[]).is_err());
}

#[test]
fn test_viewport_rect_constructors() {
    let viewport = Viewport::new(800.0, 600.0);
    assert_eq!(viewport.x, 0.0);
    assert_eq!(viewport.min_depth, 0.0);
    assert_eq!(viewport.max_depth, 1.0);

    let rect = Rect2D::new(800, 600);
    assert_eq!(rect.x, 0);
    assert_eq!(rect.width, 800);
}
