//! Rendering backends.
//!
//! Each node picks one of two backend families. The element backend gives
//! every node its own persistent drawable unit. The raster backend paints
//! a node and all of its descendants onto a single surface owned by the
//! deepest ancestor that still holds a unit.

mod element;
mod raster;

pub use element::{ElementBackend, ElementState};
pub use raster::{DrawCommand, RasterBackend};

use std::collections::BTreeMap;

use crate::animation::{Transition, VisualAttribute};
use crate::scene::SceneGraph;
use crate::tree::NodeId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RendererKind {
    Element,
    Raster,
}

impl Default for RendererKind {
    fn default() -> Self {
        RendererKind::Element
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UnitId(pub(crate) u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UnitKind {
    /// A structured element addressed individually.
    Element,
    /// An element carrying a bitmap that descendants paint into.
    Surface,
}

impl UnitKind {
    pub fn for_renderer(renderer: RendererKind) -> Self {
        match renderer {
            RendererKind::Element => UnitKind::Element,
            RendererKind::Raster => UnitKind::Surface,
        }
    }

    pub fn renderer(self) -> RendererKind {
        match self {
            UnitKind::Element => RendererKind::Element,
            UnitKind::Surface => RendererKind::Raster,
        }
    }
}

/// The persistent drawable unit owned by exactly one node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DrawableUnit {
    pub id: UnitId,
    pub kind: UnitKind,
    /// Set when raster content below this unit must be repainted.
    pub needs_redraw: bool,
}

/// Operations every backend family provides to the scene graph.
pub trait RenderBackend {
    /// Reconcile structural placement of a unit-owning node.
    fn update_layout(&mut self, scene: &SceneGraph, id: NodeId);

    /// Apply non-transitioned property changes to the node's unit.
    fn update(&mut self, scene: &SceneGraph, id: NodeId);

    /// Paint the node and its descendants onto its surface.
    fn draw_canvas(&mut self, scene: &SceneGraph, id: NodeId);

    fn start_transition(&mut self, id: NodeId, attribute: VisualAttribute, transition: &Transition);

    fn clear_transition(&mut self, id: NodeId, attribute: VisualAttribute);

    /// A unit was dropped or replaced and must be torn down.
    fn release_unit(&mut self, _id: NodeId, _unit: &DrawableUnit) {}

    /// Let native transitions progress by the given frame time.
    fn advance(&mut self, _elapsed_ms: f32) {}

    /// Native transitions that completed since the last call.
    fn finished_transitions(&mut self) -> Vec<(NodeId, VisualAttribute)> {
        Vec::new()
    }
}

/// One backend per family.
pub struct Backends {
    pub element: Box<dyn RenderBackend>,
    pub raster: Box<dyn RenderBackend>,
}

impl Backends {
    pub fn new(element: impl RenderBackend + 'static, raster: impl RenderBackend + 'static) -> Self {
        Self {
            element: Box::new(element),
            raster: Box::new(raster),
        }
    }

    pub fn get(&mut self, kind: RendererKind) -> &mut dyn RenderBackend {
        match kind {
            RendererKind::Element => self.element.as_mut(),
            RendererKind::Raster => self.raster.as_mut(),
        }
    }

    pub fn advance(&mut self, elapsed_ms: f32) {
        self.element.advance(elapsed_ms);
        self.raster.advance(elapsed_ms);
    }

    pub fn finished_transitions(&mut self) -> Vec<(NodeId, VisualAttribute)> {
        let mut finished = self.element.finished_transitions();
        finished.extend(self.raster.finished_transitions());
        finished
    }
}

impl Default for Backends {
    fn default() -> Self {
        Self::new(ElementBackend::new(), RasterBackend::new())
    }
}

struct RunningTransition {
    transition: Transition,
    elapsed_ms: f32,
}

/// Clock for the transitions a reference backend runs natively.
#[derive(Default)]
pub(crate) struct NativeTransitions {
    running: BTreeMap<(NodeId, VisualAttribute), RunningTransition>,
    finished: Vec<(NodeId, VisualAttribute)>,
}

impl NativeTransitions {
    /// Starting over a running transition restarts it.
    pub fn start(&mut self, id: NodeId, attribute: VisualAttribute, transition: &Transition) {
        self.running.insert(
            (id, attribute),
            RunningTransition {
                transition: transition.clone(),
                elapsed_ms: 0.0,
            },
        );
    }

    pub fn clear(&mut self, id: NodeId, attribute: VisualAttribute) {
        self.running.remove(&(id, attribute));
    }

    pub fn clear_node(&mut self, id: NodeId) {
        self.running.retain(|(node, _), _| *node != id);
    }

    pub fn advance(&mut self, elapsed_ms: f32) {
        let finished = &mut self.finished;
        self.running.retain(|key, running| {
            running.elapsed_ms += elapsed_ms;
            if running.elapsed_ms >= running.transition.total_ms() {
                finished.push(*key);
                false
            } else {
                true
            }
        });
    }

    /// Eased progress of a running transition.
    pub fn progress(&self, id: NodeId, attribute: VisualAttribute) -> Option<f32> {
        self.running
            .get(&(id, attribute))
            .map(|r| r.transition.progress(r.elapsed_ms))
    }

    pub fn take_finished(&mut self) -> Vec<(NodeId, VisualAttribute)> {
        std::mem::take(&mut self.finished)
    }
}
