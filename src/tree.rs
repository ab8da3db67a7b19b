//! In-memory tree model shared by every other module.
//!
//! # Overview
//! A tree is a strict ownership hierarchy of [`Node`]s: each node owns its
//! children in an ordered `Vec`. Sibling order is significant: it is exactly
//! what a tanglegram layout shows and what the detangler rearranges.
//!
//! # Traversal order is a contract
//! [`Node::leaf_names`] returns leaves in pre-order, children visited in their
//! stored order. The footrule metric and every layout consumer read this
//! sequence, so no function in this module iterates children in reverse.
//!
//! # Node identity
//! Nodes receive a `unique_id` such as `A-0`, `A-1`, ... via
//! [`Node::assign_unique_ids`]. Ids are handed out once; nodes that already
//! carry one are skipped, so calling it again after the binarizer inserted
//! nodes only tags the new ones.

use crate::error::TreeError;
use std::collections::BTreeMap;

/// Child-index route from the root to a node. The root's path is empty.
pub type NodePath = Vec<usize>;

/// Which of the two compared trees a node belongs to.
///
/// Determines the prefix of the unique ids assigned to its nodes.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Side {
    A,
    B,
}

impl Side {
    /// Prefix used for unique ids on this side (`"A-"` or `"B-"`).
    pub fn prefix(self) -> &'static str {
        match self {
            Side::A => "A-",
            Side::B => "B-",
        }
    }

    pub fn other(self) -> Side {
        match self {
            Side::A => Side::B,
            Side::B => Side::A,
        }
    }
}

/// A node of a phylogenetic tree; the root node stands for the whole tree.
///
/// A node is a leaf iff `children` is empty.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Node {
    /// Label of the node; leaves are matched across trees by this name
    pub name: Option<String>,
    /// Length of the branch leading to this node, `None` when not given
    pub length: Option<f64>,
    /// Ordered children (branchset)
    pub children: Vec<Node>,
    unique_id: Option<String>,
}

/// Degree histogram and size figures of a tree.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TreeStats {
    /// Number of children -> number of nodes with that many children (leaves at 0)
    pub degrees: BTreeMap<usize, usize>,
    pub num_leaves: usize,
    pub num_internal: usize,
    /// Depth of the deepest node, root at depth 0
    pub max_depth: usize,
}

// ============================================================================
// Construction & accessors
// ============================================================================
impl Node {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convenience constructor for a named leaf with a branch length.
    pub fn leaf(name: impl Into<String>, length: f64) -> Self {
        Self::new().with_name(name).with_length(length)
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_length(mut self, length: f64) -> Self {
        self.length = Some(length);
        self
    }

    pub fn with_children(mut self, children: Vec<Node>) -> Self {
        self.children = children;
        self
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Name of this node, or `""` when it has none.
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or("")
    }

    /// Branch length, reading a missing length as 0.
    pub fn branch_length(&self) -> f64 {
        self.length.unwrap_or(0.0)
    }

    pub fn unique_id(&self) -> Option<&str> {
        self.unique_id.as_deref()
    }

    pub fn num_leaves(&self) -> usize {
        if self.is_leaf() {
            1
        } else {
            self.children.iter().map(Node::num_leaves).sum()
        }
    }

    pub fn num_nodes(&self) -> usize {
        1 + self.children.iter().map(Node::num_nodes).sum::<usize>()
    }

    /// True if no node has more than two children.
    pub fn is_binary(&self) -> bool {
        self.first_non_binary().is_none()
    }

    /// First node in pre-order with more than two children, if any.
    pub fn first_non_binary(&self) -> Option<&Node> {
        if self.children.len() > 2 {
            return Some(self);
        }
        self.children.iter().find_map(Node::first_non_binary)
    }
}

// ============================================================================
// Identity
// ============================================================================
impl Node {
    /// Tags every node lacking a unique id, in pre-order, with
    /// `side.prefix() + counter`.
    ///
    /// The counter continues after the highest id of this side already present
    /// in the tree, so repeated calls never reuse an id and an unmodified tree
    /// is left exactly as it was.
    ///
    /// # Returns
    /// Number of nodes that received a new id.
    pub fn assign_unique_ids(&mut self, side: Side) -> usize {
        let prefix = side.prefix();

        let mut next = 0usize;
        self.visit_pre_order(|node, _| {
            let counter = node
                .unique_id
                .as_deref()
                .and_then(|id| id.strip_prefix(prefix))
                .and_then(|n| n.parse::<usize>().ok());
            if let Some(n) = counter {
                next = next.max(n + 1);
            }
        });

        fn tag(node: &mut Node, prefix: &str, next: &mut usize, tagged: &mut usize) {
            if node.unique_id.is_none() {
                node.unique_id = Some(format!("{prefix}{next}"));
                *next += 1;
                *tagged += 1;
            }
            for child in node.children.iter_mut() {
                tag(child, prefix, next, tagged);
            }
        }

        let mut tagged = 0;
        tag(self, prefix, &mut next, &mut tagged);
        tagged
    }

    /// Finds the node carrying `unique_id` (depth-first search).
    pub fn find(&self, unique_id: &str) -> Option<&Node> {
        let path = self.path_of(unique_id)?;
        self.node_at(&path)
    }

    /// Route from this node to the node carrying `unique_id`.
    pub fn path_of(&self, unique_id: &str) -> Option<NodePath> {
        fn search(node: &Node, unique_id: &str, path: &mut NodePath) -> bool {
            if node.unique_id.as_deref() == Some(unique_id) {
                return true;
            }
            for (i, child) in node.children.iter().enumerate() {
                path.push(i);
                if search(child, unique_id, path) {
                    return true;
                }
                path.pop();
            }
            false
        }

        let mut path = Vec::new();
        search(self, unique_id, &mut path).then_some(path)
    }

    pub fn node_at(&self, path: &[usize]) -> Option<&Node> {
        path.iter()
            .try_fold(self, |node, &i| node.children.get(i))
    }

    pub fn node_at_mut(&mut self, path: &[usize]) -> Option<&mut Node> {
        path.iter()
            .try_fold(self, |node, &i| node.children.get_mut(i))
    }
}

// ============================================================================
// Traversal
// ============================================================================
impl Node {
    /// Calls `f(node, depth)` on every node, parents before children.
    pub fn visit_pre_order<F: FnMut(&Node, usize)>(&self, mut f: F) {
        fn walk<F: FnMut(&Node, usize)>(node: &Node, depth: usize, f: &mut F) {
            f(node, depth);
            for child in &node.children {
                walk(child, depth + 1, f);
            }
        }
        walk(self, 0, &mut f);
    }

    /// Calls `f(node, depth)` on every node, all descendants before the node.
    pub fn visit_post_order<F: FnMut(&Node, usize)>(&self, mut f: F) {
        fn walk<F: FnMut(&Node, usize)>(node: &Node, depth: usize, f: &mut F) {
            for child in &node.children {
                walk(child, depth + 1, f);
            }
            f(node, depth);
        }
        walk(self, 0, &mut f);
    }

    /// Leaf nodes in pre-order.
    pub fn leaves(&self) -> Vec<&Node> {
        let mut leaves = Vec::new();
        fn collect<'a>(node: &'a Node, leaves: &mut Vec<&'a Node>) {
            if node.is_leaf() {
                leaves.push(node);
            }
            for child in &node.children {
                collect(child, leaves);
            }
        }
        collect(self, &mut leaves);
        leaves
    }

    /// Leaf names in pre-order (`""` for unnamed leaves).
    pub fn leaf_names(&self) -> Vec<&str> {
        self.leaves().into_iter().map(Node::label).collect()
    }

    /// Paths of all nodes in post-order.
    ///
    /// Swapping children at a node only moves its descendants, which come
    /// earlier in this order, so the remaining paths stay valid while the list
    /// is consumed front to back.
    pub fn post_order_paths(&self) -> Vec<NodePath> {
        fn walk(node: &Node, path: &mut NodePath, out: &mut Vec<NodePath>) {
            for (i, child) in node.children.iter().enumerate() {
                path.push(i);
                walk(child, path, out);
                path.pop();
            }
            out.push(path.clone());
        }
        let mut out = Vec::with_capacity(self.num_nodes());
        walk(self, &mut Vec::new(), &mut out);
        out
    }
}

// ============================================================================
// Mutation
// ============================================================================
impl Node {
    /// Reverses the order of this node's children; for two children this is
    /// the plain swap. Leaves are unaffected.
    pub fn swap_children(&mut self) {
        self.children.reverse();
    }

    /// Swaps the children of the node carrying `unique_id`.
    ///
    /// # Errors
    /// [`TreeError::NodeNotFound`] if no node has that id.
    pub fn swap_children_of(&mut self, unique_id: &str) -> Result<(), TreeError> {
        let path = self
            .path_of(unique_id)
            .ok_or_else(|| TreeError::NodeNotFound(unique_id.to_string()))?;
        let node = self
            .node_at_mut(&path)
            .ok_or_else(|| TreeError::NodeNotFound(unique_id.to_string()))?;
        node.swap_children();
        Ok(())
    }
}

// ============================================================================
// Statistics & inspection
// ============================================================================
impl Node {
    /// Histogram of node degrees plus leaf/internal counts and depth.
    pub fn stats(&self) -> TreeStats {
        let mut stats = TreeStats::default();
        self.visit_pre_order(|node, depth| {
            *stats.degrees.entry(node.children.len()).or_insert(0) += 1;
            if node.is_leaf() {
                stats.num_leaves += 1;
            } else {
                stats.num_internal += 1;
            }
            stats.max_depth = stats.max_depth.max(depth);
        });
        stats
    }

    /// Root-to-leaf path with the largest summed branch length.
    ///
    /// The root's own length counts. Among equally long paths the first in
    /// child order wins.
    ///
    /// # Returns
    /// Labels along the path (root first) and the summed length.
    pub fn longest_path(&self) -> (Vec<String>, f64) {
        let mut best: Option<(Vec<String>, f64)> = None;
        for child in &self.children {
            let candidate = child.longest_path();
            if best.as_ref().is_none_or(|(_, len)| candidate.1 > *len) {
                best = Some(candidate);
            }
        }

        let (mut tail, tail_length) = best.unwrap_or_default();
        tail.insert(0, self.label().to_string());
        (tail, tail_length + self.branch_length())
    }

    /// Indented one-node-per-line rendering: `+-name:length`.
    pub fn to_ascii_cladogram(&self) -> String {
        let mut out = String::new();
        self.visit_pre_order(|node, depth| {
            out.push_str(&"  ".repeat(depth));
            out.push_str("+-");
            out.push_str(node.label());
            if let Some(length) = node.length {
                out.push_str(&format!(":{length}"));
            }
            out.push('\n');
        });
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    ///```text
    ///        root
    ///       /    \
    ///     i1      D
    ///    /  \
    ///   B    i0
    ///       /  \
    ///      A    C
    ///```
    fn simple_tree() -> Node {
        let i0 = Node::new()
            .with_name("i0")
            .with_length(5.0)
            .with_children(vec![Node::leaf("A", 5.0), Node::leaf("C", 3.0)]);
        let i1 = Node::new()
            .with_name("i1")
            .with_length(4.0)
            .with_children(vec![Node::leaf("B", 6.0), i0]);
        Node::new()
            .with_name("simple-tree")
            .with_length(10.0)
            .with_children(vec![i1, Node::leaf("D", 15.0)])
    }

    #[test]
    fn test_leaf_names_pre_order() {
        assert_eq!(simple_tree().leaf_names(), vec!["B", "A", "C", "D"]);
    }

    #[test]
    fn test_pre_and_post_order() {
        let tree = simple_tree();
        let mut pre = Vec::new();
        tree.visit_pre_order(|n, d| pre.push((n.label().to_string(), d)));
        let names: Vec<_> = pre.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["simple-tree", "i1", "B", "i0", "A", "C", "D"]);
        assert_eq!(pre[4].1, 3);

        let mut post = Vec::new();
        tree.visit_post_order(|n, _| post.push(n.label().to_string()));
        assert_eq!(post, vec!["B", "A", "C", "i0", "i1", "D", "simple-tree"]);
    }

    #[test]
    fn test_post_order_paths_match_visit_order() {
        let tree = simple_tree();
        let labels: Vec<_> = tree
            .post_order_paths()
            .iter()
            .map(|p| tree.node_at(p).unwrap().label().to_string())
            .collect();
        assert_eq!(labels, vec!["B", "A", "C", "i0", "i1", "D", "simple-tree"]);
        assert_eq!(tree.post_order_paths().last().unwrap(), &Vec::<usize>::new());
    }

    #[test]
    fn test_assign_ids_pre_order() {
        let mut tree = simple_tree();
        assert_eq!(tree.assign_unique_ids(Side::A), 7);
        let mut ids = Vec::new();
        tree.visit_pre_order(|n, _| ids.push(n.unique_id().unwrap().to_string()));
        assert_eq!(ids, vec!["A-0", "A-1", "A-2", "A-3", "A-4", "A-5", "A-6"]);
    }

    #[test]
    fn test_assign_ids_idempotent() {
        let mut tree = simple_tree();
        tree.assign_unique_ids(Side::B);
        let first = tree.clone();
        assert_eq!(tree.assign_unique_ids(Side::B), 0);
        assert_eq!(tree, first);
    }

    #[test]
    fn test_assign_ids_only_tags_new_nodes() {
        let mut tree = simple_tree();
        tree.assign_unique_ids(Side::A);
        tree.children[1].children = vec![Node::leaf("E", 1.0), Node::leaf("F", 1.0)];
        assert_eq!(tree.assign_unique_ids(Side::A), 2);
        assert_eq!(tree.children[1].unique_id(), Some("A-6"));
        assert_eq!(tree.children[1].children[0].unique_id(), Some("A-7"));
        assert_eq!(tree.children[1].children[1].unique_id(), Some("A-8"));
    }

    #[test]
    fn test_find_and_swap_by_id() {
        let mut tree = simple_tree();
        tree.assign_unique_ids(Side::A);
        assert_eq!(tree.find("A-3").unwrap().label(), "i0");
        tree.swap_children_of("A-3").unwrap();
        assert_eq!(tree.leaf_names(), vec!["B", "C", "A", "D"]);
        // ids travel with their nodes
        assert_eq!(tree.find("A-4").unwrap().label(), "A");
        assert!(matches!(
            tree.swap_children_of("A-99"),
            Err(TreeError::NodeNotFound(_))
        ));
    }

    #[test]
    fn test_swap_leaf_is_noop() {
        let mut leaf = Node::leaf("A", 1.0);
        leaf.swap_children();
        assert_eq!(leaf, Node::leaf("A", 1.0));
    }

    #[test]
    fn test_stats_degree_histogram() {
        let tree = Node::new().with_children(vec![
            Node::leaf("A", 1.0),
            Node::leaf("B", 1.0),
            Node::new().with_children(vec![Node::leaf("C", 1.0), Node::leaf("D", 1.0)]),
        ]);
        let stats = tree.stats();
        assert_eq!(stats.degrees.get(&0), Some(&4));
        assert_eq!(stats.degrees.get(&2), Some(&1));
        assert_eq!(stats.degrees.get(&3), Some(&1));
        assert_eq!(stats.num_leaves, 4);
        assert_eq!(stats.num_internal, 2);
        assert_eq!(stats.max_depth, 2);
        assert!(!tree.is_binary());
        assert!(tree.first_non_binary().is_some());
        assert!(simple_tree().is_binary());
    }

    #[test]
    fn test_longest_path() {
        let (path, length) = simple_tree().longest_path();
        // simple-tree(10) + D(15) = 25 beats i1(4) + B(6) or i0(5) + A(5)
        assert_eq!(path, vec!["simple-tree", "D"]);
        assert_eq!(length, 25.0);
    }

    #[test]
    fn test_ascii_cladogram() {
        let tree = Node::new()
            .with_name("r")
            .with_children(vec![Node::leaf("A", 1.0), Node::new().with_name("B")]);
        assert_eq!(tree.to_ascii_cladogram(), "+-r\n  +-A:1\n  +-B\n");

        let nested = Node::new().with_children(vec![
            Node::new()
                .with_name("i")
                .with_children(vec![Node::leaf("C", 0.25), Node::leaf("D", 2.5)]),
            Node::leaf("E", 3.0),
        ]);
        assert_eq!(
            nested.to_ascii_cladogram(),
            "+-\n  +-i\n    +-C:0.25\n    +-D:2.5\n  +-E:3\n"
        );
    }

    #[test]
    fn test_counts() {
        let tree = simple_tree();
        assert_eq!(tree.num_leaves(), 4);
        assert_eq!(tree.num_nodes(), 7);
        assert_eq!(Node::new().branch_length(), 0.0);
    }
}
