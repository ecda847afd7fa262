use std::cmp::Ordering;

use crate::backend::RendererKind;
use crate::dirty::Dirty;
use crate::error::{Result, SceneError};
use crate::event::{EventResponse, EventType, ListenerId, PointerEvent};
use crate::node::{DirectorId, Listener};
use crate::tree::NodeId;

use super::SceneGraph;

impl SceneGraph {
    /// Append `child` as the topmost child of `parent`.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        self.insert_child(parent, child, usize::MAX)
    }

    /// Insert `child` at `index` in paint order (clamped to the end). A
    /// child that already has a parent is moved; a mounted scene root is
    /// unmounted first. The child ends up attached exactly when `parent` is.
    pub fn insert_child(&mut self, parent: NodeId, child: NodeId, index: usize) -> Result<()> {
        let parent_node = self.tree.get(parent).ok_or(SceneError::StaleNode(parent))?;
        let parent_renderer = parent_node.renderer;
        if !self.tree.contains(child) {
            return Err(SceneError::StaleNode(child));
        }
        if self.tree.is_ancestor_or_self(child, parent) {
            return Err(SceneError::WouldCycle { parent, child });
        }
        if let Some(old_parent) = self.tree.parent(child) {
            self.remove_child(old_parent, child)?;
        } else if self.tree.get(child).is_some_and(|c| c.attached) {
            self.detach(child)?;
            self.release_units(child);
        }

        self.tree.insert_child(parent, child, index);
        if parent_renderer != RendererKind::default() {
            self.set_renderer(child, parent_renderer);
        }
        self.recompute_relative_quality(child);
        self.mark_dirty(parent, Dirty::LAYOUT);

        let (attached, director, scene) = self
            .tree
            .get(parent)
            .map(|p| (p.attached, p.director, p.scene))
            .unwrap_or((false, None, None));
        if attached {
            self.attach(child, director, scene);
        }
        Ok(())
    }

    /// Detach `child` from `parent`. The child keeps its own subtree and
    /// listeners and can be appended elsewhere.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        if !self.tree.children(parent).contains(&child) {
            return Err(SceneError::NotAChild { parent, child });
        }
        if self.tree.get(parent).is_some_and(|p| p.attached) {
            self.detach(child)?;
        }
        self.release_units(child);
        self.tree.remove_child(parent, child);
        self.mark_dirty(parent, Dirty::LAYOUT);
        self.mark_dirty(child, Dirty::LAYOUT);
        self.recompute_relative_quality(child);
        Ok(())
    }

    /// Mount a parentless node as a scene root of `director`.
    pub fn attach_root(&mut self, id: NodeId, director: DirectorId) -> Result<()> {
        if !self.tree.contains(id) {
            return Err(SceneError::StaleNode(id));
        }
        if let Some(parent) = self.tree.parent(id) {
            return Err(SceneError::NotARoot { node: id, parent });
        }
        self.attach(id, Some(director), Some(id));
        self.mark_dirty(id, Dirty::LAYOUT);
        Ok(())
    }

    /// Unmount a scene root. Its units are released and rebuilt if it is
    /// mounted again.
    pub fn detach_root(&mut self, id: NodeId) -> Result<()> {
        if !self.tree.contains(id) {
            return Err(SceneError::StaleNode(id));
        }
        self.detach(id)?;
        self.release_units(id);
        self.mark_dirty(id, Dirty::LAYOUT);
        Ok(())
    }

    /// Queue every unit in the subtree for release.
    fn release_units(&mut self, id: NodeId) {
        for node_id in self.tree.descendants(id) {
            if let Some(unit) = self.tree.get_mut(node_id).and_then(|n| n.unit.take()) {
                self.released_units.push((node_id, unit));
            }
        }
    }

    fn attach(&mut self, id: NodeId, director: Option<DirectorId>, scene: Option<NodeId>) {
        let Some(node) = self.tree.get_mut(id) else {
            return;
        };
        node.attached = true;
        node.director = director;
        node.scene = scene;

        let children = self.tree.children(id).to_vec();
        for child in children {
            self.attach(child, director, scene);
        }

        let Some(node) = self.tree.get_mut(id) else {
            return;
        };
        for (event_type, slot) in node.listener_slots.iter_mut() {
            if slot.count > 0 && !slot.registered {
                self.dispatcher.register(id, *event_type);
                slot.registered = true;
            }
        }
    }

    fn detach(&mut self, id: NodeId) -> Result<()> {
        let children = self.tree.children(id).to_vec();
        for child in children {
            self.detach(child)?;
        }

        let Some(node) = self.tree.get_mut(id) else {
            return Ok(());
        };
        if node.director.is_none() {
            log::error!("detaching {:?} which has no director", id);
            return Err(SceneError::MissingDirector(id));
        }
        for (event_type, slot) in node.listener_slots.iter_mut() {
            if slot.registered {
                self.dispatcher.release(id, *event_type);
                slot.registered = false;
            }
        }
        node.attached = false;
        node.director = None;
        node.scene = None;
        Ok(())
    }

    /// Add a listener. The dispatcher learns about the node with its first
    /// listener of a type, once the node is attached. Mouse listeners are
    /// dropped on touch devices and yield `None`.
    pub fn add_event_listener<F>(
        &mut self,
        id: NodeId,
        event_type: EventType,
        handler: F,
    ) -> Option<ListenerId>
    where
        F: FnMut(&PointerEvent) -> EventResponse + 'static,
    {
        if self.config.supports_touch && event_type.is_mouse() {
            log::debug!("ignoring {:?} listener on a touch device", event_type);
            return None;
        }
        let Some(node) = self.tree.get_mut(id) else {
            log::warn!("add_event_listener on stale node {:?}", id);
            return None;
        };
        self.next_listener += 1;
        let listener_id = ListenerId(self.next_listener);
        node.listeners.push(Listener {
            id: listener_id,
            event_type,
            handler: Box::new(handler),
        });
        let attached = node.attached;
        let slot = node.listener_slots.entry(event_type).or_default();
        slot.count += 1;
        if attached && !slot.registered {
            slot.registered = true;
            self.dispatcher.register(id, event_type);
        }
        Some(listener_id)
    }

    /// Remove a listener. Returns false for an unknown listener.
    pub fn remove_event_listener(&mut self, id: NodeId, listener: ListenerId) -> bool {
        let Some(node) = self.tree.get_mut(id) else {
            return false;
        };
        let Some(pos) = node.listeners.iter().position(|l| l.id == listener) else {
            return false;
        };
        let event_type = node.listeners.remove(pos).event_type;
        let Some(slot) = node.listener_slots.get_mut(&event_type) else {
            return true;
        };
        slot.count = slot.count.saturating_sub(1);
        if slot.count == 0 {
            if slot.registered {
                self.dispatcher.release(id, event_type);
            }
            node.listener_slots.remove(&event_type);
        }
        true
    }

    /// Run the node's listeners for the event's type, stopping at the
    /// first one that handles it.
    pub(crate) fn deliver(&mut self, id: NodeId, event: &PointerEvent) -> EventResponse {
        let Some(node) = self.tree.get_mut(id) else {
            return EventResponse::Ignored;
        };
        for listener in node
            .listeners
            .iter_mut()
            .filter(|l| l.event_type == event.event_type)
        {
            if (listener.handler)(event) == EventResponse::Handled {
                return EventResponse::Handled;
            }
        }
        EventResponse::Ignored
    }

    /// Paint order of two nodes: ancestors before descendants, earlier
    /// siblings before later ones.
    pub fn compare_nodes(&self, a: NodeId, b: NodeId) -> Ordering {
        if a == b {
            return Ordering::Equal;
        }
        self.tree.path(a).cmp(&self.tree.path(b))
    }
}
