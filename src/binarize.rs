//! Turning multifurcating trees into binary ones, and randomising child order.
//!
//! The detangler swaps the two children of a node, so every node it visits
//! must have at most two. [`make_binary`] splits larger branchsets at the
//! midpoint without disturbing the pre-order leaf sequence:
//!
//! ```text
//!        r                    r
//!    / / | \ \             /     \
//!   A B  C  D E   =>   r_left   r_right
//!                       / \     /  |  \   (recursively split again)
//!                      A   B   C   D   E
//! ```
//!
//! Synthetic nodes are named after their parent (`<parent>_left`,
//! `<parent>_right`), have branch length 0 and no unique id yet.

use crate::tree::Node;
use rand::Rng;
use rand::seq::SliceRandom;

/// Groups a run of siblings under one node unless it is a single subtree.
fn group(parent_name: &str, suffix: &str, mut members: Vec<Node>) -> Node {
    if members.len() == 1 {
        if let Some(only) = members.pop() {
            return only;
        }
    }
    Node::new()
        .with_name(format!("{parent_name}{suffix}"))
        .with_length(0.0)
        .with_children(members)
}

/// Splits the children of `node` at `split` into two groups.
fn split_children(node: &mut Node, split: usize) {
    let right = node.children.split_off(split);
    let left = std::mem::take(&mut node.children);
    let parent_name = node.label().to_string();
    node.children = vec![
        group(&parent_name, "_left", left),
        group(&parent_name, "_right", right),
    ];
}

/// Makes the subtree rooted at `node` strictly binary.
///
/// Any node with `n > 2` children is split at `n / 2` (rounded down) into a
/// left and a right group. Nodes with 0 or 1 children are left as they are.
/// The leaf set and its pre-order sequence do not change.
pub fn make_binary(node: &mut Node) {
    let n = node.children.len();
    if n > 2 {
        split_children(node, n / 2);
    }
    for child in node.children.iter_mut() {
        make_binary(child);
    }
}

/// Like [`make_binary`], but each split point is drawn uniformly from `1..n`.
pub fn make_random_binary<R: Rng + ?Sized>(node: &mut Node, rng: &mut R) {
    let n = node.children.len();
    if n > 2 {
        let split = rng.gen_range(1..n);
        split_children(node, split);
    }
    for child in node.children.iter_mut() {
        make_random_binary(child, rng);
    }
}

/// Randomly permutes the children of every node.
///
/// Topology is unchanged; only sibling order (and thus the leaf sequence)
/// moves.
pub fn shuffle<R: Rng + ?Sized>(node: &mut Node, rng: &mut R) {
    node.children.shuffle(rng);
    for child in node.children.iter_mut() {
        shuffle(child, rng);
    }
}

/// Builds a random binary tree over leaves `L0..L{n-1}` (branch length 1).
///
/// The leaves are shuffled, hung under a single root named `tree`, and the
/// root is randomly binarized.
pub fn random_tree<R: Rng + ?Sized>(num_leaves: usize, rng: &mut R) -> Node {
    let mut leaves: Vec<Node> = (0..num_leaves)
        .map(|i| Node::leaf(format!("L{i}"), 1.0))
        .collect();
    leaves.shuffle(rng);

    let mut tree = Node::new()
        .with_name("tree")
        .with_length(1.0)
        .with_children(leaves);
    make_random_binary(&mut tree, rng);
    tree
}
