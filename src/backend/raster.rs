//! Display-list raster backend.
//!
//! Each surface unit records the draw commands of its owner and every
//! descendant painted into it. Painting walks the subtree depth-first,
//! composing each node's placement onto its parent's world transform.

use std::collections::HashMap;

use crate::animation::{Transition, VisualAttribute};
use crate::dirty::Dirty;
use crate::geometry::Frame;
use crate::scene::SceneGraph;
use crate::transform::Transform;
use crate::tree::NodeId;

use super::{DrawableUnit, NativeTransitions, RenderBackend, UnitId, UnitKind};

/// A single paint operation in surface coordinates.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    /// Fill a node's frame.
    Quad {
        node: NodeId,
        /// Local rectangle of the node
        frame: Frame,
        /// Node space to surface space
        transform: Transform,
        /// Product of opacities below the surface owner
        opacity: f32,
        /// Mask clipping this node, if any
        mask: Option<NodeId>,
    },
}

impl DrawCommand {
    pub fn node(&self) -> NodeId {
        match self {
            DrawCommand::Quad { node, .. } => *node,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Surface {
    pub unit: UnitId,
    /// Placement of the surface element itself
    pub transform: Transform,
    pub opacity: f32,
    pub hidden: bool,
    pub commands: Vec<DrawCommand>,
    /// Number of repaints
    pub paints: usize,
}

#[derive(Default)]
pub struct RasterBackend {
    surfaces: HashMap<NodeId, Surface>,
    transitions: NativeTransitions,
}

impl RasterBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn surface(&self, id: NodeId) -> Option<&Surface> {
        self.surfaces.get(&id)
    }

    pub fn surface_count(&self) -> usize {
        self.surfaces.len()
    }
}

/// Collect commands for `id` and its visible descendants.
fn paint_node(
    scene: &SceneGraph,
    id: NodeId,
    world: Transform,
    opacity: f32,
    out: &mut Vec<DrawCommand>,
) {
    let Some(node) = scene.node(id) else {
        return;
    };
    if node.hidden() || node.is_mask() {
        return;
    }
    out.push(DrawCommand::Quad {
        node: id,
        frame: node.frame(),
        transform: world,
        opacity,
        mask: node.mask(),
    });
    for &child in scene.children(id) {
        let Some(c) = scene.node(child) else {
            continue;
        };
        let child_world = world.then(&c.placement().to_transform());
        paint_node(scene, child, child_world, opacity * c.opacity(), out);
    }
}

impl RenderBackend for RasterBackend {
    fn update_layout(&mut self, scene: &SceneGraph, id: NodeId) {
        let Some(unit) = scene.node(id).and_then(|n| n.unit().copied()) else {
            return;
        };
        if unit.kind != UnitKind::Surface {
            return;
        }
        let surface = self.surfaces.entry(id).or_insert_with(|| Surface {
            unit: unit.id,
            transform: Transform::IDENTITY,
            opacity: 1.0,
            hidden: false,
            commands: Vec::new(),
            paints: 0,
        });
        surface.unit = unit.id;
    }

    fn update(&mut self, scene: &SceneGraph, id: NodeId) {
        let (Some(node), Some(surface)) = (scene.node(id), self.surfaces.get_mut(&id)) else {
            return;
        };
        let dirty = node.dirty();
        if dirty.intersects(Dirty::POSITION | Dirty::SCALE | Dirty::ROTATION) {
            surface.transform = node.placement().to_transform();
        }
        if dirty.contains(Dirty::ALPHA) {
            surface.opacity = node.opacity();
        }
        if dirty.contains(Dirty::VISIBILITY) {
            surface.hidden = node.hidden();
        }
    }

    fn draw_canvas(&mut self, scene: &SceneGraph, id: NodeId) {
        let Some(surface) = self.surfaces.get_mut(&id) else {
            log::debug!("no surface to paint for {:?}", id);
            return;
        };
        surface.commands.clear();
        // The owner's own opacity is applied by the surface element
        if scene.node(id).is_some_and(|n| !n.is_mask()) {
            paint_node(scene, id, Transform::IDENTITY, 1.0, &mut surface.commands);
        }
        surface.paints += 1;
        log::trace!(
            "painted {} commands onto surface of {:?}",
            surface.commands.len(),
            id
        );
    }

    fn start_transition(&mut self, id: NodeId, attribute: VisualAttribute, transition: &Transition) {
        self.transitions.start(id, attribute, transition);
    }

    fn clear_transition(&mut self, id: NodeId, attribute: VisualAttribute) {
        self.transitions.clear(id, attribute);
    }

    fn release_unit(&mut self, id: NodeId, unit: &DrawableUnit) {
        if self.surfaces.get(&id).is_some_and(|s| s.unit == unit.id) {
            self.surfaces.remove(&id);
            self.transitions.clear_node(id);
        }
    }

    fn advance(&mut self, elapsed_ms: f32) {
        self.transitions.advance(elapsed_ms);
    }

    fn finished_transitions(&mut self) -> Vec<(NodeId, VisualAttribute)> {
        self.transitions.take_finished()
    }
}
