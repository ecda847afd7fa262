//! Dirty state and the per-pass work registry.
//!
//! Every node carries a [`Dirty`] bitmask describing what changed since it
//! was last drawn. Whenever a node gains dirty bits it is registered in the
//! [`DirtyRegistry`], a deduplicating set keyed by (node, pass, bucket).
//! The director drains it once per tick: pass 0 (structured elements),
//! then pass 1 (raster surfaces), then next-frame entries are promoted.

use std::collections::HashSet;

use bitflags::bitflags;

use crate::tree::NodeId;

bitflags! {
    /// Categories of node state that must be reconciled before painting.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct Dirty: u8 {
        /// Structure or renderer changed; cascades to descendants.
        const LAYOUT     = 1 << 0;
        const POSITION   = 1 << 1;
        const SCALE      = 1 << 2;
        const ROTATION   = 1 << 3;
        const ALPHA      = 1 << 4;
        const VISIBILITY = 1 << 5;
        const CONTENT    = 1 << 6;
        const ALL = Self::LAYOUT.bits()
            | Self::POSITION.bits()
            | Self::SCALE.bits()
            | Self::ROTATION.bits()
            | Self::ALPHA.bits()
            | Self::VISIBILITY.bits()
            | Self::CONTENT.bits();
    }
}

bitflags! {
    /// Which edges and dimensions of a child follow its parent's resizing.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct AutoResize: u8 {
        const LEFT   = 1;
        const WIDTH  = 2;
        const RIGHT  = 4;
        const TOP    = 8;
        const HEIGHT = 16;
        const BOTTOM = 32;
        const ALL = Self::LEFT.bits()
            | Self::WIDTH.bits()
            | Self::RIGHT.bits()
            | Self::TOP.bits()
            | Self::HEIGHT.bits()
            | Self::BOTTOM.bits();
    }
}

impl AutoResize {
    pub const NONE: Self = Self::empty();
}

/// Scheduling pass for structured-element updates.
pub const ELEMENT_PASS: u8 = 0;
/// Scheduling pass for raster surface repaints.
pub const RASTER_PASS: u8 = 1;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Bucket {
    ThisFrame,
    NextFrame,
}

impl Bucket {
    fn select(defer_to_next_frame: bool) -> Self {
        if defer_to_next_frame {
            Bucket::NextFrame
        } else {
            Bucket::ThisFrame
        }
    }
}

/// A pending update: each (node, pass, bucket) triple is unique.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DirtyEntry {
    pub node: NodeId,
    pub pass: u8,
    pub bucket: Bucket,
}

/// Set of nodes awaiting update, partitioned by pass and frame bucket.
#[derive(Debug, Default)]
pub struct DirtyRegistry {
    entries: HashSet<DirtyEntry>,
}

impl DirtyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `node` for `pass`. Registering twice is a no-op.
    pub fn mark_dirty(&mut self, node: NodeId, pass: u8, defer_to_next_frame: bool) {
        self.entries.insert(DirtyEntry {
            node,
            pass,
            bucket: Bucket::select(defer_to_next_frame),
        });
    }

    pub fn clear_dirty(&mut self, node: NodeId, pass: u8, defer_to_next_frame: bool) {
        self.entries.remove(&DirtyEntry {
            node,
            pass,
            bucket: Bucket::select(defer_to_next_frame),
        });
    }

    pub fn is_marked(&self, node: NodeId, pass: u8, defer_to_next_frame: bool) -> bool {
        self.entries.contains(&DirtyEntry {
            node,
            pass,
            bucket: Bucket::select(defer_to_next_frame),
        })
    }

    /// Remove and return every this-frame node of `pass`, in id order.
    pub fn take(&mut self, pass: u8) -> Vec<NodeId> {
        let mut nodes = Vec::new();
        self.entries.retain(|e| {
            if e.pass == pass && e.bucket == Bucket::ThisFrame {
                nodes.push(e.node);
                false
            } else {
                true
            }
        });
        nodes.sort();
        nodes
    }

    /// Move every next-frame entry into the this-frame bucket.
    pub fn promote_next_frame(&mut self) {
        let deferred: Vec<DirtyEntry> = self
            .entries
            .iter()
            .filter(|e| e.bucket == Bucket::NextFrame)
            .copied()
            .collect();
        for entry in deferred {
            self.entries.remove(&entry);
            self.entries.insert(DirtyEntry {
                bucket: Bucket::ThisFrame,
                ..entry
            });
        }
    }

    /// Drop all entries of a node that no longer exists.
    pub fn forget(&mut self, node: NodeId) {
        self.entries.retain(|e| e.node != node);
    }

    pub fn has_pending(&self, pass: u8) -> bool {
        self.entries
            .iter()
            .any(|e| e.pass == pass && e.bucket == Bucket::ThisFrame)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::Tree;

    fn ids(n: usize) -> Vec<NodeId> {
        let mut tree = Tree::new();
        (0..n).map(|_| tree.insert(())).collect()
    }

    #[test]
    fn test_mark_is_idempotent() {
        let ids = ids(1);
        let mut registry = DirtyRegistry::new();
        registry.mark_dirty(ids[0], ELEMENT_PASS, false);
        registry.mark_dirty(ids[0], ELEMENT_PASS, false);
        assert_eq!(registry.len(), 1);

        registry.mark_dirty(ids[0], RASTER_PASS, false);
        registry.mark_dirty(ids[0], ELEMENT_PASS, true);
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_clear_only_touches_its_bucket() {
        let ids = ids(1);
        let mut registry = DirtyRegistry::new();
        registry.mark_dirty(ids[0], ELEMENT_PASS, false);
        registry.mark_dirty(ids[0], ELEMENT_PASS, true);
        registry.clear_dirty(ids[0], ELEMENT_PASS, false);
        assert!(!registry.is_marked(ids[0], ELEMENT_PASS, false));
        assert!(registry.is_marked(ids[0], ELEMENT_PASS, true));
    }

    #[test]
    fn test_take_drains_one_pass() {
        let ids = ids(3);
        let mut registry = DirtyRegistry::new();
        registry.mark_dirty(ids[2], ELEMENT_PASS, false);
        registry.mark_dirty(ids[0], ELEMENT_PASS, false);
        registry.mark_dirty(ids[1], RASTER_PASS, false);
        registry.mark_dirty(ids[1], ELEMENT_PASS, true);

        assert_eq!(registry.take(ELEMENT_PASS), vec![ids[0], ids[2]]);
        assert!(!registry.has_pending(ELEMENT_PASS));
        assert!(registry.has_pending(RASTER_PASS));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_promote_next_frame() {
        let ids = ids(2);
        let mut registry = DirtyRegistry::new();
        registry.mark_dirty(ids[0], ELEMENT_PASS, true);
        registry.mark_dirty(ids[1], ELEMENT_PASS, false);
        registry.mark_dirty(ids[1], ELEMENT_PASS, true);

        registry.promote_next_frame();
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.take(ELEMENT_PASS), vec![ids[0], ids[1]]);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_forget() {
        let ids = ids(2);
        let mut registry = DirtyRegistry::new();
        registry.mark_dirty(ids[0], ELEMENT_PASS, false);
        registry.mark_dirty(ids[0], RASTER_PASS, true);
        registry.mark_dirty(ids[1], ELEMENT_PASS, false);
        registry.forget(ids[0]);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_dirty_all_covers_every_bit() {
        let all = Dirty::LAYOUT
            | Dirty::POSITION
            | Dirty::SCALE
            | Dirty::ROTATION
            | Dirty::ALPHA
            | Dirty::VISIBILITY
            | Dirty::CONTENT;
        assert_eq!(Dirty::ALL, all);
        assert!(AutoResize::NONE.is_empty());
    }
}
