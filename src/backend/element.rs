//! In-memory structured-element backend.
//!
//! Mirrors every element unit as an [`ElementState`] record, the way a
//! platform element tree would hold one element per node. Only the dirty
//! parts of a node are copied on update.

use std::collections::HashMap;

use crate::animation::{Transition, VisualAttribute};
use crate::dirty::Dirty;
use crate::geometry::Size;
use crate::scene::SceneGraph;
use crate::transform::Transform;
use crate::tree::NodeId;

use super::{DrawableUnit, NativeTransitions, RenderBackend, UnitId};

/// What the backend currently shows for one element.
#[derive(Clone, Debug, PartialEq)]
pub struct ElementState {
    pub unit: UnitId,
    /// Unit of the nearest ancestor that owns one
    pub parent: Option<UnitId>,
    pub transform: Transform,
    pub size: Size,
    pub opacity: f32,
    pub hidden: bool,
    /// Number of update hooks applied
    pub updates: usize,
}

#[derive(Default)]
pub struct ElementBackend {
    elements: HashMap<NodeId, ElementState>,
    transitions: NativeTransitions,
}

impl ElementBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn element(&self, id: NodeId) -> Option<&ElementState> {
        self.elements.get(&id)
    }

    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    pub fn transition_progress(&self, id: NodeId, attribute: VisualAttribute) -> Option<f32> {
        self.transitions.progress(id, attribute)
    }
}

impl RenderBackend for ElementBackend {
    fn update_layout(&mut self, scene: &SceneGraph, id: NodeId) {
        let Some(unit) = scene.node(id).and_then(|n| n.unit().copied()) else {
            return;
        };
        let mut ancestor = scene.parent(id);
        let parent = loop {
            match ancestor {
                Some(a) => match scene.node(a).and_then(|n| n.unit()) {
                    Some(u) => break Some(u.id),
                    None => ancestor = scene.parent(a),
                },
                None => break None,
            }
        };

        let state = self.elements.entry(id).or_insert_with(|| ElementState {
            unit: unit.id,
            parent,
            transform: Transform::IDENTITY,
            size: Size::ZERO,
            opacity: 1.0,
            hidden: false,
            updates: 0,
        });
        state.unit = unit.id;
        state.parent = parent;
    }

    fn update(&mut self, scene: &SceneGraph, id: NodeId) {
        let Some(node) = scene.node(id) else {
            return;
        };
        let Some(state) = self.elements.get_mut(&id) else {
            log::debug!("update for {:?} before its element was laid out", id);
            return;
        };
        let dirty = node.dirty();
        if dirty.intersects(Dirty::POSITION | Dirty::SCALE | Dirty::ROTATION) {
            state.transform = node.placement().to_transform();
        }
        if dirty.contains(Dirty::SCALE) {
            state.size = node.size();
        }
        if dirty.contains(Dirty::ALPHA) {
            state.opacity = node.opacity();
        }
        if dirty.contains(Dirty::VISIBILITY) {
            state.hidden = node.hidden();
        }
        state.updates += 1;
    }

    fn draw_canvas(&mut self, _scene: &SceneGraph, id: NodeId) {
        log::trace!("element backend has no canvas for {:?}", id);
    }

    fn start_transition(&mut self, id: NodeId, attribute: VisualAttribute, transition: &Transition) {
        self.transitions.start(id, attribute, transition);
    }

    fn clear_transition(&mut self, id: NodeId, attribute: VisualAttribute) {
        self.transitions.clear(id, attribute);
    }

    fn release_unit(&mut self, id: NodeId, unit: &DrawableUnit) {
        if self.elements.get(&id).is_some_and(|e| e.unit == unit.id) {
            self.elements.remove(&id);
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
