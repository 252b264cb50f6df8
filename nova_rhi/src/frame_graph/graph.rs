/// Frame graph — a DAG of render passes compiled into an executable order
///
/// Passes declare named fields (ports); edges connect one pass's output
/// field to another pass's input field. Structural changes mark the graph
/// for recompilation; `compile()` re-linearizes the graph (topological
/// sort) and is a no-op while nothing changed. `execute()` walks the
/// compiled order, applies the current render settings and lets each pass
/// record into the active command buffer.

use rustc_hash::FxHashMap;
use slotmap::{new_key_type, SlotMap};

use crate::error::{Error, Result};
use crate::frame_graph::pass::{
    FieldVisibility, PassContext, PassField, PassResource, RenderPass, RenderSettings,
};
use crate::rhi::{CommandBuffer, Device};
use crate::rhi_bail;

new_key_type! {
    /// Stable key of a pass within a frame graph
    pub struct PassKey;
}

/// Producer→consumer data dependency between two pass fields
#[derive(Debug, Clone, PartialEq, Eq)]
struct Edge {
    src: PassKey,
    src_field: String,
    dst: PassKey,
    dst_field: String,
}

struct PassNode {
    pass: Box<dyn RenderPass>,
    /// Producers this pass was directly bound to (no tracked edge)
    bound: Vec<PassKey>,
}

/// DAG of render passes with compiled execution order
pub struct FrameGraph {
    passes: SlotMap<PassKey, PassNode>,
    edges: Vec<Edge>,
    /// Compiled execution order (valid while `need_recompile` is false)
    order: Vec<PassKey>,
    /// Set by every structural change; cleared by `compile()`
    need_recompile: bool,
    /// Outputs published by each pass during the last `execute()`
    published: FxHashMap<PassKey, FxHashMap<String, PassResource>>,
}

impl FrameGraph {
    /// Create an empty frame graph
    pub fn new() -> Self {
        Self {
            passes: SlotMap::with_key(),
            edges: Vec::new(),
            order: Vec::new(),
            need_recompile: false,
            published: FxHashMap::default(),
        }
    }

    /// Insert a pass and mark the graph for recompilation
    pub fn add_pass(&mut self, pass: Box<dyn RenderPass>) -> PassKey {
        self.need_recompile = true;
        self.passes.insert(PassNode {
            pass,
            bound: Vec::new(),
        })
    }

    /// Remove a pass (and every edge touching it), marking recompilation
    pub fn remove_pass(&mut self, key: PassKey) -> Result<()> {
        if self.passes.remove(key).is_none() {
            return Err(Error::InvalidOperation(
                "remove_pass: pass key is not in the graph".to_string(),
            ));
        }
        self.edges.retain(|e| e.src != key && e.dst != key);
        for node in self.passes.values_mut() {
            node.bound.retain(|&b| b != key);
        }
        self.published.remove(&key);
        self.need_recompile = true;
        Ok(())
    }

    /// Connect a producer's output field to a consumer's input field
    ///
    /// Field kinds must match; both fields must exist with the right
    /// visibility. Marks the graph for recompilation.
    pub fn connect(
        &mut self,
        src: PassKey,
        src_field: &str,
        dst: PassKey,
        dst_field: &str,
    ) -> Result<()> {
        if src == dst {
            rhi_bail!("nova::FrameGraph", "connect: pass cannot feed itself");
        }
        let src_decl = self.field_decl(src, src_field)?;
        if src_decl.visibility != FieldVisibility::Output {
            rhi_bail!("nova::FrameGraph",
                "connect: field '{}' of pass '{}' is not an output",
                src_field, self.pass_name(src));
        }
        let dst_decl = self.field_decl(dst, dst_field)?;
        if dst_decl.visibility != FieldVisibility::Input {
            rhi_bail!("nova::FrameGraph",
                "connect: field '{}' of pass '{}' is not an input",
                dst_field, self.pass_name(dst));
        }
        if src_decl.kind != dst_decl.kind {
            rhi_bail!("nova::FrameGraph",
                "connect: field kinds differ ({:?} -> {:?})",
                src_decl.kind, dst_decl.kind);
        }
        let edge = Edge {
            src,
            src_field: src_field.to_string(),
            dst,
            dst_field: dst_field.to_string(),
        };
        if !self.edges.contains(&edge) {
            self.edges.push(edge);
        }
        self.need_recompile = true;
        Ok(())
    }

    /// Give `consumer` direct access to `producer`'s published outputs
    ///
    /// A single fixed hand-off rather than a data-flow edge tracked by the
    /// DAG: no ordering constraint is added, the caller is responsible for
    /// the producer running first.
    pub fn bind_pass(&mut self, consumer: PassKey, producer: PassKey) -> Result<()> {
        if !self.passes.contains_key(producer) {
            return Err(Error::InvalidOperation(
                "bind_pass: producer key is not in the graph".to_string(),
            ));
        }
        let node = self.passes.get_mut(consumer).ok_or_else(|| {
            Error::InvalidOperation("bind_pass: consumer key is not in the graph".to_string())
        })?;
        if !node.bound.contains(&producer) {
            node.bound.push(producer);
        }
        Ok(())
    }

    /// True when a structural change has not been compiled yet
    pub fn need_recompile(&self) -> bool {
        self.need_recompile
    }

    /// Number of passes in the graph
    pub fn pass_count(&self) -> usize {
        self.passes.len()
    }

    /// Compiled execution order (empty until the first `compile()`)
    pub fn execution_order(&self) -> &[PassKey] {
        &self.order
    }

    /// (Re)linearize the graph into an executable pass order
    ///
    /// No-op unless a structural change happened since the last
    /// compilation. Fails on dependency cycles.
    pub fn compile(&mut self) -> Result<()> {
        if !self.need_recompile {
            return Ok(());
        }

        // Kahn's algorithm over the producer→consumer edges
        let mut in_degree: FxHashMap<PassKey, usize> =
            self.passes.keys().map(|k| (k, 0)).collect();
        for edge in &self.edges {
            *in_degree.get_mut(&edge.dst).unwrap() += 1;
        }

        // Insertion order of the slotmap keeps compilation deterministic
        let mut ready: std::collections::VecDeque<PassKey> = self
            .passes
            .keys()
            .filter(|k| in_degree[k] == 0)
            .collect();
        let mut order = Vec::with_capacity(self.passes.len());

        while let Some(key) = ready.pop_front() {
            order.push(key);
            for edge in &self.edges {
                if edge.src != key {
                    continue;
                }
                let degree = in_degree.get_mut(&edge.dst).unwrap();
                *degree -= 1;
                if *degree == 0 {
                    ready.push_back(edge.dst);
                }
            }
        }

        if order.len() != self.passes.len() {
            rhi_bail!("nova::FrameGraph",
                "compile: dependency cycle detected ({} of {} passes ordered)",
                order.len(), self.passes.len());
        }

        self.order = order;
        self.need_recompile = false;
        Ok(())
    }

    /// Walk the compiled order and record every pass into `cmd`
    ///
    /// For each pass: applies the current render settings, resolves its
    /// inputs from producer outputs, executes it, and collects its
    /// published outputs.
    pub fn execute(
        &mut self,
        device: &dyn Device,
        cmd: &mut dyn CommandBuffer,
        settings: RenderSettings,
    ) -> Result<()> {
        self.compile()?;
        self.published.clear();

        let order = self.order.clone();
        for key in order {
            // Resolve inputs from the outputs published by producers
            let mut inputs = FxHashMap::default();
            for edge in &self.edges {
                if edge.dst != key {
                    continue;
                }
                let resource = self
                    .published
                    .get(&edge.src)
                    .and_then(|outputs| outputs.get(&edge.src_field))
                    .ok_or_else(|| {
                        Error::InvalidOperation(format!(
                            "execute: pass '{}' did not publish output '{}'",
                            self.pass_name(edge.src),
                            edge.src_field
                        ))
                    })?;
                let dst_decl = self.field_decl(key, &edge.dst_field)?;
                if !resource.matches(dst_decl.kind) {
                    return Err(Error::InvalidOperation(format!(
                        "execute: pass '{}' published a resource that does not match \
                         input field '{}' ({:?})",
                        self.pass_name(edge.src),
                        edge.dst_field,
                        dst_decl.kind
                    )));
                }
                inputs.insert(edge.dst_field.clone(), resource.clone());
            }

            // Collect the outputs of directly bound producers
            let mut bound = FxHashMap::default();
            for producer in &self.passes[key].bound {
                if let Some(outputs) = self.published.get(producer) {
                    for (name, resource) in outputs {
                        bound.insert(name.clone(), resource.clone());
                    }
                }
            }

            cmd.set_viewport(settings.viewport)?;
            cmd.set_scissor(settings.scissor)?;

            let node = self.passes.get_mut(key).unwrap();
            let mut ctx = PassContext {
                device,
                cmd: &mut *cmd,
                settings,
                inputs,
                bound,
                outputs: FxHashMap::default(),
            };
            node.pass.execute(&mut ctx)?;
            let outputs = ctx.outputs;
            self.published.insert(key, outputs);
        }
        Ok(())
    }

    fn field_decl(&self, key: PassKey, field: &str) -> Result<PassField> {
        let node = self.passes.get(key).ok_or_else(|| {
            Error::InvalidOperation("pass key is not in the graph".to_string())
        })?;
        node.pass
            .fields()
            .iter()
            .find(|f| f.name == field)
            .cloned()
            .ok_or_else(|| {
                Error::InvalidOperation(format!(
                    "pass '{}' declares no field '{}'",
                    node.pass.name(),
                    field
                ))
            })
    }

    fn pass_name(&self, key: PassKey) -> &str {
        self.passes
            .get(key)
            .map(|node| node.pass.name())
            .unwrap_or("<removed>")
    }
}

impl Default for FrameGraph {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "graph_tests.rs"]
mod tests;
