//! The scene graph: node storage plus the bookkeeping that drives updates.
//!
//! [`SceneGraph`] owns every node, the [`DirtyRegistry`] of pending work
//! and the [`EventDispatcher`] that mirrors listener registrations of
//! attached nodes. Operations are split by concern:
//!
//! - `properties`: setters and dirty propagation
//! - `hierarchy`: child management, attachment and listeners
//! - `geometry`: coordinate conversion, bounds and hit testing
//! - `update`: per-frame update and transition activation

mod geometry;
mod hierarchy;
mod properties;
mod update;

pub use properties::Property;

use crate::animation::TransitionProperty;
use crate::backend::{Backends, DrawableUnit, RendererKind, UnitId};
use crate::dirty::DirtyRegistry;
use crate::event::EventDispatcher;
use crate::node::Node;
use crate::tree::{NodeId, Tree};

/// Options fixed for the lifetime of a scene graph.
#[derive(Clone, Debug, Default)]
pub struct SceneConfig {
    /// Touch devices ignore mouse listeners.
    pub supports_touch: bool,
}

impl SceneConfig {
    pub fn supports_touch(mut self, supports_touch: bool) -> Self {
        self.supports_touch = supports_touch;
        self
    }
}

pub struct SceneGraph {
    tree: Tree<Node>,
    registry: DirtyRegistry,
    dispatcher: EventDispatcher,
    config: SceneConfig,
    next_unit: u64,
    next_listener: u64,
    /// Units dropped outside a backend call, torn down on the next flush
    released_units: Vec<(NodeId, DrawableUnit)>,
    /// Transitions settled without a native backend transition
    completed: Vec<(NodeId, TransitionProperty)>,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::with_config(SceneConfig::default())
    }

    pub fn with_config(config: SceneConfig) -> Self {
        Self {
            tree: Tree::new(),
            registry: DirtyRegistry::new(),
            dispatcher: EventDispatcher::new(),
            config,
            next_unit: 0,
            next_listener: 0,
            released_units: Vec::new(),
            completed: Vec::new(),
        }
    }

    /// Create a detached node supporting both renderers.
    pub fn create_node(&mut self) -> NodeId {
        self.create_node_with(Vec::new())
    }

    /// Create a detached node limited to `supported` renderers. The first
    /// one becomes its renderer; an empty list means all of them.
    pub fn create_node_with(&mut self, supported: Vec<RendererKind>) -> NodeId {
        let id = self.tree.insert(Node::new(supported));
        // New nodes start LAYOUT dirty
        self.registry.mark_dirty(id, crate::dirty::ELEMENT_PASS, false);
        id
    }

    /// Destroy a node and every node it owns. The node is first removed
    /// from its parent, or unmounted if it is an attached root. Nodes that
    /// used a destroyed node as their mask lose the mask.
    pub fn destroy_node(&mut self, id: NodeId) -> crate::Result<()> {
        let node = self.tree.get(id).ok_or(crate::SceneError::StaleNode(id))?;
        let attached = node.attached;
        match self.tree.parent(id) {
            Some(parent) => self.remove_child(parent, id)?,
            None if attached => self.detach_root(id)?,
            None => {}
        }

        let doomed = self.tree.descendants(id);
        if doomed
            .iter()
            .any(|&d| self.tree.get(d).is_some_and(|n| n.mask_users > 0))
        {
            let users: Vec<NodeId> = self
                .tree
                .ids()
                .filter(|&user| !doomed.contains(&user))
                .filter(|&user| {
                    self.tree
                        .get(user)
                        .and_then(|n| n.mask)
                        .is_some_and(|m| doomed.contains(&m))
                })
                .collect();
            for user in users {
                self.set_mask(user, None);
            }
        }

        for descendant in doomed.into_iter().rev() {
            if let Some(mask) = self.tree.get(descendant).and_then(|n| n.mask) {
                if let Some(mask_node) = self.tree.get_mut(mask) {
                    mask_node.mask_users = mask_node.mask_users.saturating_sub(1);
                }
            }
            if let Some(mut node) = self.tree.remove(descendant) {
                if let Some(unit) = node.unit.take() {
                    self.released_units.push((descendant, unit));
                }
            }
            self.registry.forget(descendant);
        }
        log::debug!("destroyed {:?}", id);
        Ok(())
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.tree.contains(id)
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.tree.get(id)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.tree.parent(id)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.tree.children(id)
    }

    pub fn node_count(&self) -> usize {
        self.tree.len()
    }

    pub fn registry(&self) -> &DirtyRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut DirtyRegistry {
        &mut self.registry
    }

    pub fn dispatcher(&self) -> &EventDispatcher {
        &self.dispatcher
    }

    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    /// Tear down units dropped since the last flush.
    pub fn flush_released_units(&mut self, backends: &mut Backends) {
        for (id, unit) in self.released_units.drain(..) {
            backends.get(unit.kind.renderer()).release_unit(id, &unit);
        }
    }

    /// Transitions that settled without the backend's help.
    pub fn take_completed_transitions(&mut self) -> Vec<(NodeId, TransitionProperty)> {
        std::mem::take(&mut self.completed)
    }

    fn next_unit_id(&mut self) -> UnitId {
        self.next_unit += 1;
        UnitId(self.next_unit)
    }

    /// Mutable access with a warning on stale ids.
    fn node_mut_or_warn(&mut self, id: NodeId, op: &str) -> Option<&mut Node> {
        let node = self.tree.get_mut(id);
        if node.is_none() {
            log::warn!("{} on stale node {:?}", op, id);
        }
        node
    }
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}
