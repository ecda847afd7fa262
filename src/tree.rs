//! Arena storage for scene nodes.
//!
//! The tree uses a sparse-set layout with generational indices:
//!
//! - **Generational Indices**: [`NodeId`] holds index + generation, so a
//!   stale handle to a freed slot never aliases a newer node.
//! - **Dense Storage**: payloads live contiguously for cheap iteration.
//! - **Sparse Map**: O(1) lookup from a stable id to its dense slot.
//! - **Swap-Remove**: O(1) removal without holes in dense storage.
//!
//! Parent links are plain ids. Children are owned through the parent's
//! ordered child list; order is paint order.

/// Handle to a node in the [`Tree`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

impl NodeId {
    fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Stable numeric form, generation in the high bits.
    pub fn as_u64(self) -> u64 {
        ((self.generation as u64) << 32) | (self.index as u64)
    }
}

struct SparseEntry {
    dense_index: usize,
    generation: u32,
}

struct Slot<T> {
    value: T,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    /// Back-pointer to the sparse index, for swap-remove fixup
    sparse_index: u32,
}

pub struct Tree<T> {
    dense: Vec<Slot<T>>,
    sparse: Vec<Option<SparseEntry>>,
    /// Sparse indices available for reuse, with the generation they last held
    free_indices: Vec<(u32, u32)>,
}

impl<T> Tree<T> {
    pub fn new() -> Self {
        Self {
            dense: Vec::new(),
            sparse: Vec::new(),
            free_indices: Vec::new(),
        }
    }

    /// Store a value as a new parentless node.
    pub fn insert(&mut self, value: T) -> NodeId {
        let (sparse_index, generation) = match self.free_indices.pop() {
            Some((idx, old_gen)) => (idx, old_gen.wrapping_add(1)),
            None => {
                let idx = self.sparse.len() as u32;
                self.sparse.push(None);
                (idx, 0)
            }
        };

        let dense_index = self.dense.len();
        self.dense.push(Slot {
            value,
            parent: None,
            children: Vec::new(),
            sparse_index,
        });
        self.sparse[sparse_index as usize] = Some(SparseEntry {
            dense_index,
            generation,
        });

        NodeId::new(sparse_index, generation)
    }

    /// Remove a node, unlinking it from its parent. Its children keep
    /// their ids but become parentless.
    pub fn remove(&mut self, id: NodeId) -> Option<T> {
        let dense_index = self.dense_index(id)?;

        if let Some(parent) = self.dense[dense_index].parent {
            if let Some(parent_dense) = self.dense_index(parent) {
                self.dense[parent_dense].children.retain(|&c| c != id);
            }
        }
        let orphans = std::mem::take(&mut self.dense[dense_index].children);
        for child in orphans {
            if let Some(child_dense) = self.dense_index(child) {
                self.dense[child_dense].parent = None;
            }
        }

        let last_dense_index = self.dense.len() - 1;
        let removed = self.dense.swap_remove(dense_index);

        if dense_index != last_dense_index {
            let moved_sparse_idx = self.dense[dense_index].sparse_index;
            if let Some(entry) = self.sparse[moved_sparse_idx as usize].as_mut() {
                entry.dense_index = dense_index;
            }
        }

        self.sparse[id.index as usize] = None;
        self.free_indices.push((id.index, id.generation));

        Some(removed.value)
    }

    fn dense_index(&self, id: NodeId) -> Option<usize> {
        self.sparse
            .get(id.index as usize)
            .and_then(|e| e.as_ref())
            .filter(|e| e.generation == id.generation)
            .map(|e| e.dense_index)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.dense_index(id).is_some()
    }

    pub fn get(&self, id: NodeId) -> Option<&T> {
        self.dense_index(id).map(|idx| &self.dense[idx].value)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut T> {
        self.dense_index(id).map(move |idx| &mut self.dense[idx].value)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.dense_index(id).and_then(|idx| self.dense[idx].parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        match self.dense_index(id) {
            Some(idx) => &self.dense[idx].children,
            None => &[],
        }
    }

    /// Link `child` under `parent` at `index` (clamped to the child count).
    /// The child must currently be parentless.
    pub fn insert_child(&mut self, parent: NodeId, child: NodeId, index: usize) -> bool {
        let (Some(parent_dense), Some(child_dense)) =
            (self.dense_index(parent), self.dense_index(child))
        else {
            return false;
        };
        if self.dense[child_dense].parent.is_some() {
            return false;
        }
        self.dense[child_dense].parent = Some(parent);
        let children = &mut self.dense[parent_dense].children;
        let index = index.min(children.len());
        children.insert(index, child);
        true
    }

    /// Unlink `child` from `parent`. Returns false if it was not a child.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> bool {
        let Some(parent_dense) = self.dense_index(parent) else {
            return false;
        };
        let children = &mut self.dense[parent_dense].children;
        let Some(pos) = children.iter().position(|&c| c == child) else {
            return false;
        };
        children.remove(pos);
        if let Some(child_dense) = self.dense_index(child) {
            self.dense[child_dense].parent = None;
        }
        true
    }

    /// Ancestors of `id`, nearest first.
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_, T> {
        Ancestors {
            tree: self,
            next: self.parent(id),
        }
    }

    pub fn root_of(&self, id: NodeId) -> NodeId {
        self.ancestors(id).last().unwrap_or(id)
    }

    /// True when `ancestor` is `id` or lies above it.
    pub fn is_ancestor_or_self(&self, ancestor: NodeId, id: NodeId) -> bool {
        ancestor == id || self.ancestors(id).any(|a| a == ancestor)
    }

    /// Child-index path from the root down to `id`.
    pub fn path(&self, id: NodeId) -> Vec<usize> {
        let mut path = Vec::new();
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            let pos = self
                .children(parent)
                .iter()
                .position(|&c| c == current)
                .unwrap_or(0);
            path.push(pos);
            current = parent;
        }
        path.reverse();
        path
    }

    /// `id` and all of its descendants in paint (pre-) order.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if !self.contains(current) {
                continue;
            }
            out.push(current);
            stack.extend(self.children(current).iter().rev());
        }
        out
    }

    /// Every live id, in storage order.
    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.dense.iter().filter_map(|slot| {
            let entry = self.sparse[slot.sparse_index as usize].as_ref()?;
            Some(NodeId::new(slot.sparse_index, entry.generation))
        })
    }

    pub fn len(&self) -> usize {
        self.dense.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dense.is_empty()
    }
}

impl<T> Default for Tree<T> {
    fn default() -> Self {
        Self::new()
    }
}

pub struct Ancestors<'a, T> {
    tree: &'a Tree<T>,
    next: Option<NodeId>,
}

impl<T> Iterator for Ancestors<'_, T> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.tree.parent(current);
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tree_insert_remove() {
        let mut tree = Tree::new();
        let id = tree.insert("a");
        assert!(tree.contains(id));
        assert_eq!(tree.remove(id), Some("a"));
        assert!(!tree.contains(id));
        assert_eq!(tree.remove(id), None);
    }

    #[test]
    fn test_tree_generational_index() {
        let mut tree = Tree::new();
        let id1 = tree.insert(1);
        tree.remove(id1);
        let id2 = tree.insert(2);

        assert!(!tree.contains(id1));
        assert!(tree.contains(id2));
        assert_eq!(id1.index, id2.index);
        assert_ne!(id1.generation, id2.generation);
        assert_eq!(tree.get(id1), None);
    }

    #[test]
    fn test_tree_parent_child_order() {
        let mut tree = Tree::new();
        let root = tree.insert(0);
        let a = tree.insert(1);
        let b = tree.insert(2);
        let c = tree.insert(3);

        assert!(tree.insert_child(root, a, usize::MAX));
        assert!(tree.insert_child(root, b, usize::MAX));
        assert!(tree.insert_child(root, c, 1));
        assert_eq!(tree.children(root), &[a, c, b]);
        assert_eq!(tree.parent(c), Some(root));

        // Already parented
        assert!(!tree.insert_child(a, c, 0));

        assert!(tree.remove_child(root, c));
        assert!(!tree.remove_child(root, c));
        assert_eq!(tree.parent(c), None);
    }

    #[test]
    fn test_tree_paths_and_ancestors() {
        let mut tree = Tree::new();
        let root = tree.insert(0);
        let a = tree.insert(1);
        let b = tree.insert(2);
        let leaf = tree.insert(3);
        tree.insert_child(root, a, usize::MAX);
        tree.insert_child(root, b, usize::MAX);
        tree.insert_child(b, leaf, usize::MAX);

        assert_eq!(tree.path(leaf), vec![1, 0]);
        assert_eq!(tree.ancestors(leaf).collect::<Vec<_>>(), vec![b, root]);
        assert_eq!(tree.root_of(leaf), root);
        assert!(tree.is_ancestor_or_self(root, leaf));
        assert!(!tree.is_ancestor_or_self(a, leaf));
        assert_eq!(tree.descendants(root), vec![root, a, b, leaf]);
    }

    #[test]
    fn test_tree_swap_remove_fixup() {
        let mut tree = Tree::new();
        let id1 = tree.insert(1);
        let id2 = tree.insert(2);
        let id3 = tree.insert(3);

        tree.remove(id1);

        assert_eq!(tree.get(id2), Some(&2));
        assert_eq!(tree.get(id3), Some(&3));
        assert_eq!(tree.len(), 2);
        let mut ids: Vec<_> = tree.ids().collect();
        ids.sort();
        assert_eq!(ids, vec![id2, id3]);
    }

    #[test]
    fn test_tree_remove_orphans_children() {
        let mut tree = Tree::new();
        let root = tree.insert(0);
        let child = tree.insert(1);
        tree.insert_child(root, child, 0);
        tree.remove(root);
        assert_eq!(tree.parent(child), None);
    }
}
