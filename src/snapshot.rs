//! Read-only lookup snapshot of a tree.
//!
//! # Overview
//! A [`TreeSnapshot`] flattens a tree into a pre-order list of
//! [`NodeEntry`]s and indexes it by unique id and by leaf name, so rendering
//! or bridging code can find "the node named X" in O(1) instead of walking
//! the tree each time.
//!
//! Each entry records its parent as an index into the same list (a
//! non-owning back-reference), which is how distances to the root are
//! accumulated in a single forward pass.
//!
//! # Validity
//! The snapshot describes the tree at the moment it was taken. Swapping
//! children (the detangler, [`Node::swap_children_of`]) or binarizing changes
//! paths and leaf positions, so take a new snapshot after mutating.
//!
//! # Example
//! ```text
//!        root            entries (pre-order):
//!       /    \            0 root   parent None   root_distance 0
//!     i1      D           1 i1     parent 0      root_distance 4
//!    /  \                 2 B      parent 1      root_distance 4+6
//!   B    A                3 A      parent 1      root_distance 4+5
//!                         4 D      parent 0      root_distance 15
//! ```

use crate::tree::{Node, NodePath};
use std::collections::HashMap;

/// One node of a [`TreeSnapshot`].
#[derive(Debug, Clone, PartialEq)]
pub struct NodeEntry {
    pub unique_id: Option<String>,
    pub name: Option<String>,
    /// Route from the root, usable with [`Node::node_at`] on the same tree
    pub path: NodePath,
    /// Index of the parent entry, `None` for the root
    pub parent: Option<usize>,
    /// Edges from the root, i.e. the distance to the root with unit lengths
    pub depth: usize,
    pub is_leaf: bool,
    /// Sum of branch lengths from (excluding) the root down to this node
    pub root_distance: f64,
    /// Position among the leaves in pre-order, for leaves only
    pub leaf_rank: Option<usize>,
}

/// Flattened, indexed view of a tree.
///
/// # Fields
/// - `entries`: every node in pre-order
/// - `by_id`: unique id -> entry index
/// - `by_name`: leaf name -> entry index (first leaf wins on duplicates)
#[derive(Debug, Clone, Default)]
pub struct TreeSnapshot {
    pub entries: Vec<NodeEntry>,
    pub by_id: HashMap<String, usize>,
    pub by_name: HashMap<String, usize>,
    pub num_leaves: usize,
}

impl TreeSnapshot {
    /// Takes a snapshot of `tree`.
    ///
    /// The root's own branch length is not counted toward distances, so the
    /// root sits at distance 0.
    pub fn from_tree(tree: &Node) -> Self {
        let mut snapshot = TreeSnapshot {
            entries: Vec::with_capacity(tree.num_nodes()),
            ..Default::default()
        };
        Self::collect_entries(tree, None, &mut Vec::new(), 0, &mut snapshot);
        Self::accumulate_root_distances(tree, &mut snapshot.entries);
        snapshot
    }

    /// Pre-order walk recording paths, parents and leaf ranks.
    fn collect_entries(
        node: &Node,
        parent: Option<usize>,
        path: &mut NodePath,
        depth: usize,
        snapshot: &mut TreeSnapshot,
    ) {
        let index = snapshot.entries.len();
        let leaf_rank = if node.is_leaf() {
            snapshot.num_leaves += 1;
            Some(snapshot.num_leaves - 1)
        } else {
            None
        };

        if let Some(id) = node.unique_id() {
            snapshot.by_id.insert(id.to_string(), index);
        }
        if let (true, Some(name)) = (node.is_leaf(), &node.name) {
            snapshot.by_name.entry(name.clone()).or_insert(index);
        }

        snapshot.entries.push(NodeEntry {
            unique_id: node.unique_id().map(str::to_string),
            name: node.name.clone(),
            path: path.clone(),
            parent,
            depth,
            is_leaf: node.is_leaf(),
            root_distance: 0.0,
            leaf_rank,
        });

        for (i, child) in node.children.iter().enumerate() {
            path.push(i);
            Self::collect_entries(child, Some(index), path, depth + 1, snapshot);
            path.pop();
        }
    }

    /// Parents precede children in pre-order, so one forward pass suffices.
    fn accumulate_root_distances(tree: &Node, entries: &mut [NodeEntry]) {
        for i in 0..entries.len() {
            let Some(parent) = entries[i].parent else {
                continue;
            };
            let length = tree
                .node_at(&entries[i].path)
                .map(Node::branch_length)
                .unwrap_or(0.0);
            entries[i].root_distance = entries[parent].root_distance + length;
        }
    }

    pub fn get_by_id(&self, unique_id: &str) -> Option<&NodeEntry> {
        self.by_id.get(unique_id).map(|&i| &self.entries[i])
    }

    pub fn get_leaf(&self, name: &str) -> Option<&NodeEntry> {
        self.by_name.get(name).map(|&i| &self.entries[i])
    }

    /// Resolves a unique id to the node itself in the tree the snapshot was
    /// taken from.
    pub fn resolve_mut<'t>(&self, tree: &'t mut Node, unique_id: &str) -> Option<&'t mut Node> {
        let entry = self.get_by_id(unique_id)?;
        tree.node_at_mut(&entry.path)
    }

    /// Leaf entries in pre-order.
    pub fn leaves(&self) -> impl Iterator<Item = &NodeEntry> {
        self.entries.iter().filter(|e| e.is_leaf)
    }

    /// Largest root distance; rendering scales positions against it.
    pub fn max_root_distance(&self) -> f64 {
        self.entries
            .iter()
            .map(|e| e.root_distance)
            .fold(0.0, f64::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::newick::parse;
    use crate::tree::Side;

    fn tagged(text: &str) -> Node {
        let mut tree = parse(text).unwrap();
        tree.assign_unique_ids(Side::A);
        tree
    }

    #[test]
    fn test_entries_in_pre_order() {
        let tree = tagged("((B:6,A:5)i1:4,D:15)root:10;");
        let snap = TreeSnapshot::from_tree(&tree);

        let names: Vec<_> = snap.entries.iter().map(|e| e.name.as_deref().unwrap()).collect();
        assert_eq!(names, vec!["root", "i1", "B", "A", "D"]);
        assert_eq!(snap.entries[2].parent, Some(1));
        assert_eq!(snap.entries[2].path, vec![0, 0]);
        assert_eq!(snap.entries[4].depth, 1);
        assert_eq!(snap.num_leaves, 3);
    }

    #[test]
    fn test_root_distances() {
        let tree = tagged("((B:6,A:5)i1:4,D:15)root:10;");
        let snap = TreeSnapshot::from_tree(&tree);

        assert_eq!(snap.entries[0].root_distance, 0.0);
        assert_eq!(snap.get_leaf("B").unwrap().root_distance, 10.0);
        assert_eq!(snap.get_leaf("A").unwrap().root_distance, 9.0);
        assert_eq!(snap.get_leaf("D").unwrap().root_distance, 15.0);
        assert_eq!(snap.max_root_distance(), 15.0);
    }

    #[test]
    fn test_lookup_by_id_and_name() {
        let tree = tagged("((B,A)i1,D)root;");
        let snap = TreeSnapshot::from_tree(&tree);

        assert_eq!(snap.get_by_id("A-1").unwrap().name.as_deref(), Some("i1"));
        assert_eq!(snap.get_leaf("A").unwrap().leaf_rank, Some(1));
        assert_eq!(snap.get_leaf("D").unwrap().unique_id.as_deref(), Some("A-4"));
        assert!(snap.get_leaf("i1").is_none());
        assert!(snap.get_by_id("B-0").is_none());

        let ranks: Vec<_> = snap.leaves().map(|e| e.leaf_rank.unwrap()).collect();
        assert_eq!(ranks, vec![0, 1, 2]);
    }

    #[test]
    fn test_resolve_mut() {
        let mut tree = tagged("((B,A)i1,D)root;");
        let snap = TreeSnapshot::from_tree(&tree);
        snap.resolve_mut(&mut tree, "A-1").unwrap().swap_children();
        assert_eq!(tree.leaf_names(), vec!["A", "B", "D"]);
    }

    #[test]
    fn test_duplicate_leaf_names_first_wins() {
        let tree = tagged("((X,Y),X);");
        let snap = TreeSnapshot::from_tree(&tree);
        assert_eq!(snap.get_leaf("X").unwrap().path, vec![0, 0]);
    }
}
