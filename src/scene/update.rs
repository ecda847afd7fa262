//! Per-frame node update and the transition activation protocol.
//!
//! A transition moves through three stages on its node:
//!
//! 1. `pending`: staged by [`SceneGraph::add_transition`].
//! 2. checked: on the next draw the node's current value is compared with
//!    what was last drawn. If they differ the property is redrawn plainly
//!    first and activation waits one frame, so the backend starts from
//!    the right value.
//! 3. `active`: handed to the backend, which owns the visual progression.
//!    Setters of the property stop dirtying until it is cleared.

use crate::animation::{Transition, TransitionProperty, TransitionValue};
use crate::backend::{Backends, DrawableUnit, RenderBackend, RendererKind, UnitKind};
use crate::dirty::{Dirty, ELEMENT_PASS, RASTER_PASS};
use crate::node::{normalize_rotation, ActiveTransition, DrawnState, PendingTransition};
use crate::tree::NodeId;

use super::SceneGraph;

impl SceneGraph {
    /// Stage a transition of one property toward `value`. It starts on
    /// the node's next draw.
    pub fn add_transition(&mut self, id: NodeId, value: TransitionValue, transition: Transition) {
        let Some(node) = self.node_mut_or_warn(id, "add_transition") else {
            return;
        };
        let property = value.property();
        node.transitions.clearing.remove(&property);
        node.transitions.pending.insert(
            property,
            PendingTransition {
                value,
                transition,
                checked: false,
            },
        );
        self.registry.mark_dirty(id, ELEMENT_PASS, false);
    }

    /// Cancel a staged or running transition. Takes effect on the next
    /// draw and leaves the property wherever the backend currently shows
    /// it. Clearing twice is harmless. A cancelled fade to 0 still hides
    /// the node, since its opacity already holds the target.
    pub fn clear_transition(&mut self, id: NodeId, property: TransitionProperty) {
        let Some(node) = self.node_mut_or_warn(id, "clear_transition") else {
            return;
        };
        node.transitions.pending.remove(&property);
        node.transitions.clearing.insert(property);
        let fading_out =
            node.active_transition_target(property) == Some(TransitionValue::Opacity(0.0));
        self.registry.mark_dirty(id, ELEMENT_PASS, false);
        if fading_out {
            self.settle(id, property);
        }
    }

    /// Retire a running transition that reached its end. Returns false if
    /// it was not running (already cleared or replaced).
    pub(crate) fn retire_transition(&mut self, id: NodeId, property: TransitionProperty) -> bool {
        let Some(node) = self.tree.get_mut(id) else {
            return false;
        };
        if node.transitions.active.remove(&property).is_none() {
            return false;
        }
        node.transitions.clearing.insert(property);
        self.registry.mark_dirty(id, ELEMENT_PASS, false);
        self.settle(id, property);
        true
    }

    /// Effects of a transition reaching its end value.
    fn settle(&mut self, id: NodeId, property: TransitionProperty) {
        if property != TransitionProperty::Opacity {
            return;
        }
        let fade_out = self
            .tree
            .get(id)
            .is_some_and(|n| n.opacity == 0.0 && !n.hidden);
        if fade_out {
            self.set_auto_hidden(id);
        }
    }

    /// Bring one node up to date for `pass`.
    pub fn update(&mut self, id: NodeId, pass: u8, backends: &mut Backends) {
        let Some(node) = self.tree.get(id) else {
            self.registry.forget(id);
            return;
        };
        if node.dirty.contains(Dirty::LAYOUT) {
            self.resolve_layout(id, backends);
        }

        let Some(node) = self.tree.get(id) else {
            return;
        };
        let renderer = node.renderer;
        let owns_unit = node.unit.is_some();
        let draw = renderer == RendererKind::Element || pass != ELEMENT_PASS;

        if !owns_unit && pass == ELEMENT_PASS {
            self.snap_transitions(id);
        } else if draw {
            self.activate_transitions(id, backends.get(renderer));
        }

        if pass != ELEMENT_PASS {
            backends.raster.draw_canvas(self, id);
            if let Some(unit) = self.tree.get_mut(id).and_then(|n| n.unit.as_mut()) {
                unit.needs_redraw = false;
            }
        } else {
            if renderer == RendererKind::Raster || !owns_unit {
                self.request_surface_redraw(id);
            }
            if owns_unit {
                backends.get(renderer).update(self, id);
            }
        }

        if let Some(node) = self.tree.get_mut(id) {
            for active in node.transitions.active.values_mut() {
                active.drawn = true;
            }
            node.dirty = Dirty::empty();
        }
        self.registry.clear_dirty(id, pass, false);
    }

    fn resolve_layout(&mut self, id: NodeId, backends: &mut Backends) {
        if let Some(parent) = self.tree.parent(id) {
            if self
                .tree
                .get(parent)
                .is_some_and(|p| p.dirty.contains(Dirty::LAYOUT))
            {
                log::trace!("{:?} defers layout to {:?}", id, parent);
                return self.resolve_layout(parent, backends);
            }
        }
        self.layout_subtree(id, backends);
    }

    fn layout_subtree(&mut self, id: NodeId, backends: &mut Backends) {
        let Some(node) = self.tree.get_mut(id) else {
            return;
        };
        node.dirty.remove(Dirty::LAYOUT);
        self.reconcile_unit(id);

        let children = self.tree.children(id).to_vec();
        for child in children {
            if self
                .tree
                .get(child)
                .is_some_and(|c| c.dirty.contains(Dirty::LAYOUT))
            {
                self.layout_subtree(child, backends);
            }
        }

        if let Some(node) = self.tree.get(id) {
            if node.unit.is_some() {
                backends.get(node.renderer).update_layout(self, id);
            }
        }
    }

    /// Create, replace or drop the node's drawable unit. Nodes inside a
    /// raster parent paint into an ancestor's surface and own none.
    fn reconcile_unit(&mut self, id: NodeId) {
        let parent_is_raster = self
            .tree
            .parent(id)
            .and_then(|p| self.tree.get(p))
            .is_some_and(|p| p.renderer == RendererKind::Raster);
        let Some(node) = self.tree.get(id) else {
            return;
        };
        let wanted = (!parent_is_raster).then(|| UnitKind::for_renderer(node.renderer));
        let current = node.unit.map(|u| u.kind);
        if wanted == current {
            return;
        }

        let unit = match wanted {
            Some(kind) => Some(DrawableUnit {
                id: self.next_unit_id(),
                kind,
                needs_redraw: kind == UnitKind::Surface,
            }),
            None => None,
        };
        let Some(node) = self.tree.get_mut(id) else {
            return;
        };
        let old = std::mem::replace(&mut node.unit, unit);
        if unit.is_some() {
            // A fresh unit shows nothing yet
            node.dirty |= Dirty::ALL.difference(Dirty::LAYOUT);
            node.drawn = DrawnState::default();
        }
        log::debug!("{:?} unit {:?} -> {:?}", id, current, wanted);
        if let Some(old) = old {
            self.released_units.push((id, old));
        }
    }

    /// Run the pre-draw check and, when the node is visually consistent,
    /// hand every pending transition to the backend.
    fn activate_transitions(&mut self, id: NodeId, backend: &mut dyn RenderBackend) {
        let Some(node) = self.tree.get_mut(id) else {
            return;
        };

        for property in std::mem::take(&mut node.transitions.clearing) {
            node.transitions.active.remove(&property);
            let attribute = property.attribute();
            // The transform attribute is shared; keep it while any part runs
            if !node
                .transitions
                .active
                .keys()
                .any(|p| p.attribute() == attribute)
            {
                backend.clear_transition(id, attribute);
            }
        }

        let unchecked: Vec<TransitionProperty> = node
            .transitions
            .pending
            .iter_mut()
            .filter(|(_, staged)| !staged.checked)
            .map(|(property, staged)| {
                staged.checked = true;
                *property
            })
            .collect();
        let mut predraw = Dirty::empty();
        for property in unchecked {
            if node.differs_from_drawn(property) {
                predraw |= property.dirty_bit();
            }
        }

        if !predraw.is_empty() {
            log::debug!("{:?} pre-draws {:?} before transitions", id, predraw);
            node.dirty |= predraw;
            node.snapshot_drawn();
            self.registry.mark_dirty(id, ELEMENT_PASS, true);
            return;
        }

        let staged = std::mem::take(&mut node.transitions.pending);
        for (property, PendingTransition { value, transition, .. }) in staged {
            log::debug!("{:?} starts {:?} transition to {:?}", id, property, value);
            backend.start_transition(id, property.attribute(), &transition);
            apply_target(node, value);
            node.dirty |= property.dirty_bit();
            node.transitions.active.insert(
                property,
                ActiveTransition {
                    value,
                    transition,
                    drawn: false,
                },
            );
        }
        node.snapshot_drawn();
    }

    /// Nodes without a unit have nothing to run a native transition on:
    /// jump straight to the target and report completion.
    fn snap_transitions(&mut self, id: NodeId) {
        let Some(node) = self.tree.get_mut(id) else {
            return;
        };
        node.transitions.clearing.clear();
        let mut snapped: Vec<TransitionProperty> =
            std::mem::take(&mut node.transitions.active).into_keys().collect();
        for (property, pending) in std::mem::take(&mut node.transitions.pending) {
            apply_target(node, pending.value);
            node.dirty |= property.dirty_bit();
            snapped.push(property);
        }
        node.snapshot_drawn();

        for property in snapped {
            self.settle(id, property);
            self.completed.push((id, property));
        }
    }

    /// Raster content repaints as a whole: flag the surface that this
    /// node paints into and queue it for the raster pass.
    fn request_surface_redraw(&mut self, id: NodeId) {
        let owner = std::iter::once(id)
            .chain(self.tree.ancestors(id))
            .find(|&n| self.tree.get(n).is_some_and(|n| n.unit.is_some()));
        let Some(owner) = owner else {
            return;
        };
        let Some(node) = self.tree.get_mut(owner) else {
            return;
        };
        let Some(unit) = node.unit.as_mut() else {
            return;
        };
        if unit.kind != UnitKind::Surface {
            return;
        }
        // Moving a surface does not change what is painted on it
        if owner == id
            && !unit.needs_redraw
            && node.dirty == Dirty::POSITION
            && !node.transitions.is_staged()
        {
            return;
        }
        unit.needs_redraw = true;
        self.registry.mark_dirty(owner, RASTER_PASS, false);
    }
}

fn apply_target(node: &mut crate::node::Node, value: TransitionValue) {
    match value {
        TransitionValue::Position(p) => node.position = p,
        TransitionValue::Scale(s) => node.scale = s,
        TransitionValue::Rotation(r) => node.rotation = normalize_rotation(r),
        TransitionValue::Opacity(o) => {
            node.opacity = o;
            if o != 0.0 && node.hidden && node.auto_hide {
                node.hidden = false;
                node.auto_hide = false;
                node.dirty |= Dirty::VISIBILITY;
            }
        }
    }
}
