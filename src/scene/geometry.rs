use crate::event::PointerEvent;
use crate::geometry::{Frame, Point};
use crate::transform::bounding_box;
use crate::tree::NodeId;

use super::SceneGraph;

impl SceneGraph {
    pub fn local_to_parent(&self, id: NodeId, p: impl Into<Point>) -> Point {
        let p = p.into();
        match self.tree.get(id) {
            Some(node) => node.placement().local_to_parent(p),
            None => p,
        }
    }

    pub fn parent_to_local(&self, id: NodeId, p: impl Into<Point>) -> Point {
        let p = p.into();
        match self.tree.get(id) {
            Some(node) => node.placement().parent_to_local(p),
            None => p,
        }
    }

    /// Compose outward through every ancestor. Detached nodes have no
    /// screen and return the point unchanged.
    pub fn local_to_screen(&self, id: NodeId, p: impl Into<Point>) -> Point {
        let mut p = p.into();
        if !self.tree.get(id).is_some_and(|n| n.attached) {
            return p;
        }
        let mut current = Some(id);
        while let Some(node_id) = current {
            p = self.local_to_parent(node_id, p);
            current = self.tree.parent(node_id);
        }
        p
    }

    pub fn screen_to_local(&self, id: NodeId, p: impl Into<Point>) -> Point {
        let mut p = p.into();
        if !self.tree.get(id).is_some_and(|n| n.attached) {
            return p;
        }
        let mut chain: Vec<NodeId> = self.tree.ancestors(id).collect();
        chain.reverse();
        chain.push(id);
        for node_id in chain {
            p = self.parent_to_local(node_id, p);
        }
        p
    }

    /// Convert a point in `id`'s space into `other`'s space.
    pub fn local_to_node(&self, id: NodeId, p: impl Into<Point>, other: NodeId) -> Point {
        self.screen_to_local(other, self.local_to_screen(id, p))
    }

    pub fn frame(&self, id: NodeId) -> Frame {
        self.tree.get(id).map(|n| n.frame()).unwrap_or_default()
    }

    /// The node's frame as a pixel-aligned box in parent space.
    pub fn bounding_box(&self, id: NodeId) -> Frame {
        self.bounding_box_of(id, &self.frame(id))
    }

    /// An arbitrary local rectangle of `id` as a box in parent space.
    pub fn bounding_box_of(&self, id: NodeId, frame: &Frame) -> Frame {
        match self.tree.get(id) {
            Some(node) => bounding_box(&node.placement(), frame),
            None => *frame,
        }
    }

    /// Local rectangle covering the node and everything drawn below it.
    /// Mask nodes are not content and do not count.
    pub fn measure_contents(&self, id: NodeId) -> Frame {
        let children = self.tree.children(id);
        let mut frame = self.frame(id);
        if frame.is_degenerate() {
            if let Some(&first) = children.first() {
                frame = self.bounding_box_of(first, &self.measure_contents(first));
            }
        }
        for &child in children {
            if self.tree.get(child).is_some_and(|c| c.is_mask()) {
                continue;
            }
            frame.expand_to_include(&self.bounding_box_of(child, &self.measure_contents(child)));
        }
        frame
    }

    /// False when the node or any ancestor is hidden.
    pub fn is_visible(&self, id: NodeId) -> bool {
        std::iter::once(id)
            .chain(self.tree.ancestors(id))
            .all(|n| self.tree.get(n).is_some_and(|node| !node.hidden))
    }

    /// True when the event's screen position falls inside the node's
    /// frame. On a hit the event's local position is updated.
    pub fn hit_test(&self, id: NodeId, event: &mut PointerEvent) -> bool {
        let local = self.screen_to_local(id, event.screen_position);
        if self.frame(id).contains(local) {
            event.position = local;
            true
        } else {
            false
        }
    }
}
