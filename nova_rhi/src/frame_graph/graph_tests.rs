/// Tests for frame graph assembly, compilation and execution
///
/// These validate DAG ordering, the recompile guard, cycle detection,
/// pass removal, output publication and direct pass binding.

use super::*;
use crate::rhi::mock_device::{MockCommandBuffer, MockDevice};
use crate::rhi::{
    CommandBufferKind, Device, Format, ImageDesc, ImageUsage, CommandBuffer,
};
use crate::frame_graph::pass::{FieldKind, FieldVisibility, PassField};
use std::sync::{Arc, Mutex};

/// Test pass that records its name on execution and publishes one image
/// output per declared output field
struct TracePass {
    name: String,
    fields: Vec<PassField>,
    executed: Arc<Mutex<Vec<String>>>,
    /// Names of inputs this pass expects to be resolved
    expect_inputs: Vec<String>,
}

impl TracePass {
    fn new(name: &str, fields: Vec<PassField>, executed: Arc<Mutex<Vec<String>>>) -> Box<Self> {
        Box::new(Self {
            name: name.to_string(),
            fields,
            executed,
            expect_inputs: Vec::new(),
        })
    }

    fn expecting(mut self: Box<Self>, inputs: &[&str]) -> Box<Self> {
        self.expect_inputs = inputs.iter().map(|s| s.to_string()).collect();
        self
    }
}

impl RenderPass for TracePass {
    fn name(&self) -> &str {
        &self.name
    }

    fn fields(&self) -> &[PassField] {
        &self.fields
    }

    fn execute(&mut self, ctx: &mut PassContext<'_>) -> crate::nova::Result<()> {
        for input in &self.expect_inputs {
            assert!(
                ctx.input(input).is_some(),
                "pass '{}' is missing input '{}'",
                self.name,
                input
            );
        }
        self.executed.lock().unwrap().push(self.name.clone());
        ctx.cmd.begin_debug_marker(&self.name, [0.0; 4])?;
        ctx.cmd.end_debug_marker()?;

        // Publish an image for every declared output field
        let outputs: Vec<String> = self
            .fields
            .iter()
            .filter(|f| f.visibility == FieldVisibility::Output)
            .map(|f| f.name.clone())
            .collect();
        for name in outputs {
            let image = ctx
                .device
                .create_image(
                    &ImageDesc::new_2d(Format::R8G8B8A8_UNORM, 16, 16)
                        .with_usage(ImageUsage::COLOR_ATTACHMENT | ImageUsage::SAMPLED),
                    None,
                )
                .unwrap();
            ctx.publish(name, PassResource::Image(image));
        }
        Ok(())
    }
}

fn color_out(name: &str) -> PassField {
    PassField::new(name, FieldVisibility::Output, FieldKind::Image2D)
}

fn color_in(name: &str) -> PassField {
    PassField::new(name, FieldVisibility::Input, FieldKind::Image2D)
}

fn run_graph(graph: &mut FrameGraph, device: &MockDevice) {
    let mut cmd = MockCommandBuffer::new(CommandBufferKind::Primary);
    cmd.begin().unwrap();
    graph
        .execute(device, &mut cmd, RenderSettings::new(64, 64))
        .unwrap();
    cmd.end().unwrap();
}

// ============================================================================
// Tests: assembly and recompile guard
// ============================================================================

#[test]
fn test_new_graph_is_empty() {
    let graph = FrameGraph::new();
    assert_eq!(graph.pass_count(), 0);
    assert!(!graph.need_recompile());
}

#[test]
fn test_add_pass_marks_recompile() {
    let executed = Arc::new(Mutex::new(Vec::new()));
    let mut graph = FrameGraph::new();
    graph.add_pass(TracePass::new("main", vec![], executed));
    assert!(graph.need_recompile());
}

#[test]
fn test_compile_clears_recompile_flag() {
    let executed = Arc::new(Mutex::new(Vec::new()));
    let mut graph = FrameGraph::new();
    graph.add_pass(TracePass::new("main", vec![], executed));
    graph.compile().unwrap();
    assert!(!graph.need_recompile());
}

#[test]
fn test_compile_is_idempotent_without_changes() {
    let executed = Arc::new(Mutex::new(Vec::new()));
    let mut graph = FrameGraph::new();
    graph.add_pass(TracePass::new("main", vec![], executed));
    graph.compile().unwrap();
    let order: Vec<PassKey> = graph.execution_order().to_vec();

    // No structural change: compile must be a no-op
    graph.compile().unwrap();
    assert_eq!(graph.execution_order(), order.as_slice());
}

#[test]
fn test_remove_pass_marks_recompile() {
    let executed = Arc::new(Mutex::new(Vec::new()));
    let mut graph = FrameGraph::new();
    let key = graph.add_pass(TracePass::new("main", vec![], executed));
    graph.compile().unwrap();
    graph.remove_pass(key).unwrap();
    assert!(graph.need_recompile());
    assert_eq!(graph.pass_count(), 0);
}

#[test]
fn test_remove_unknown_pass_fails() {
    let executed = Arc::new(Mutex::new(Vec::new()));
    let mut graph = FrameGraph::new();
    let key = graph.add_pass(TracePass::new("main", vec![], executed));
    graph.remove_pass(key).unwrap();
    assert!(graph.remove_pass(key).is_err());
}

// ============================================================================
// Tests: connections
// ============================================================================

#[test]
fn test_connect_validates_fields() {
    let executed = Arc::new(Mutex::new(Vec::new()));
    let mut graph = FrameGraph::new();
    let producer = graph.add_pass(TracePass::new(
        "shadow",
        vec![color_out("shadow_map")],
        Arc::clone(&executed),
    ));
    let consumer = graph.add_pass(TracePass::new(
        "main",
        vec![color_in("shadow_map")],
        executed,
    ));

    // Unknown field name
    assert!(graph.connect(producer, "missing", consumer, "shadow_map").is_err());
    // Output used as input end
    assert!(graph.connect(consumer, "shadow_map", producer, "shadow_map").is_err());
    // Valid connection
    assert!(graph.connect(producer, "shadow_map", consumer, "shadow_map").is_ok());
}

#[test]
fn test_connect_rejects_kind_mismatch() {
    let executed = Arc::new(Mutex::new(Vec::new()));
    let mut graph = FrameGraph::new();
    let producer = graph.add_pass(TracePass::new(
        "geometry",
        vec![color_out("color")],
        Arc::clone(&executed),
    ));
    let consumer = graph.add_pass(TracePass::new(
        "readback",
        vec![PassField::new("data", FieldVisibility::Input, FieldKind::Buffer)],
        executed,
    ));
    assert!(graph.connect(producer, "color", consumer, "data").is_err());
}

#[test]
fn test_connect_rejects_self_edge() {
    let executed = Arc::new(Mutex::new(Vec::new()));
    let mut graph = FrameGraph::new();
    let key = graph.add_pass(TracePass::new(
        "loop",
        vec![color_out("out"), color_in("in")],
        executed,
    ));
    assert!(graph.connect(key, "out", key, "in").is_err());
}

// ============================================================================
// Tests: compilation order
// ============================================================================

#[test]
fn test_execution_respects_dependencies() {
    let executed = Arc::new(Mutex::new(Vec::new()));
    let device = MockDevice::new();
    let mut graph = FrameGraph::new();

    // Add in reverse order so insertion order alone would be wrong
    let post = graph.add_pass(
        TracePass::new("post", vec![color_in("scene")], Arc::clone(&executed))
            .expecting(&["scene"]),
    );
    let main = graph.add_pass(TracePass::new(
        "main",
        vec![color_in("shadow_map"), color_out("scene")],
        Arc::clone(&executed),
    ).expecting(&["shadow_map"]));
    let shadow = graph.add_pass(TracePass::new(
        "shadow",
        vec![color_out("shadow_map")],
        Arc::clone(&executed),
    ));

    graph.connect(shadow, "shadow_map", main, "shadow_map").unwrap();
    graph.connect(main, "scene", post, "scene").unwrap();

    run_graph(&mut graph, &device);

    assert_eq!(
        executed.lock().unwrap().clone(),
        vec!["shadow", "main", "post"]
    );
}

#[test]
fn test_cycle_is_rejected() {
    let executed = Arc::new(Mutex::new(Vec::new()));
    let mut graph = FrameGraph::new();
    let a = graph.add_pass(TracePass::new(
        "a",
        vec![color_out("out"), color_in("in")],
        Arc::clone(&executed),
    ));
    let b = graph.add_pass(TracePass::new(
        "b",
        vec![color_out("out"), color_in("in")],
        executed,
    ));
    graph.connect(a, "out", b, "in").unwrap();
    graph.connect(b, "out", a, "in").unwrap();
    assert!(graph.compile().is_err());
}

#[test]
fn test_removing_pass_breaks_cycle() {
    let executed = Arc::new(Mutex::new(Vec::new()));
    let mut graph = FrameGraph::new();
    let a = graph.add_pass(TracePass::new(
        "a",
        vec![color_out("out"), color_in("in")],
        Arc::clone(&executed),
    ));
    let b = graph.add_pass(TracePass::new(
        "b",
        vec![color_out("out"), color_in("in")],
        executed,
    ));
    graph.connect(a, "out", b, "in").unwrap();
    graph.connect(b, "out", a, "in").unwrap();
    assert!(graph.compile().is_err());

    graph.remove_pass(b).unwrap();
    assert!(graph.compile().is_ok());
    assert_eq!(graph.execution_order().len(), 1);
}

// ============================================================================
// Tests: execution and bind_pass
// ============================================================================

#[test]
fn test_execute_applies_render_settings() {
    let executed = Arc::new(Mutex::new(Vec::new()));
    let device = MockDevice::new();
    let mut graph = FrameGraph::new();
    graph.add_pass(TracePass::new("main", vec![], executed));

    let mut cmd = MockCommandBuffer::new(CommandBufferKind::Primary);
    cmd.begin().unwrap();
    graph
        .execute(&device, &mut cmd, RenderSettings::new(64, 64))
        .unwrap();

    let log = cmd.commands.lock().unwrap().clone();
    assert!(log.contains(&"set_viewport".to_string()));
    assert!(log.contains(&"set_scissor".to_string()));
}

#[test]
fn test_bound_pass_outputs_are_visible() {
    struct ConsumerPass {
        fields: Vec<PassField>,
        saw_bound: Arc<Mutex<bool>>,
    }

    impl RenderPass for ConsumerPass {
        fn name(&self) -> &str {
            "overlay"
        }

        fn fields(&self) -> &[PassField] {
            &self.fields
        }

        fn execute(&mut self, ctx: &mut PassContext<'_>) -> crate::nova::Result<()> {
            // Output of the bound producer, without a tracked edge
            *self.saw_bound.lock().unwrap() = ctx.bound_output("scene").is_some();
            Ok(())
        }
    }

    let executed = Arc::new(Mutex::new(Vec::new()));
    let saw_bound = Arc::new(Mutex::new(false));
    let device = MockDevice::new();
    let mut graph = FrameGraph::new();

    let producer = graph.add_pass(TracePass::new(
        "main",
        vec![color_out("scene")],
        executed,
    ));
    let consumer = graph.add_pass(Box::new(ConsumerPass {
        fields: vec![],
        saw_bound: Arc::clone(&saw_bound),
    }));
    graph.bind_pass(consumer, producer).unwrap();

    // No edge: ordering is by insertion, producer first by construction
    run_graph(&mut graph, &device);
    assert!(*saw_bound.lock().unwrap());
}

#[test]
fn test_execute_autocompiles_after_structural_change() {
    let executed = Arc::new(Mutex::new(Vec::new()));
    let device = MockDevice::new();
    let mut graph = FrameGraph::new();
    graph.add_pass(TracePass::new("first", vec![], Arc::clone(&executed)));
    run_graph(&mut graph, &device);

    graph.add_pass(TracePass::new("second", vec![], Arc::clone(&executed)));
    run_graph(&mut graph, &device);

    let log = executed.lock().unwrap().clone();
    assert_eq!(log.len(), 3);
    assert!(log[1..].contains(&"first".to_string()));
    assert!(log[1..].contains(&"second".to_string()));
}
