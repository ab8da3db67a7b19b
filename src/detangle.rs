//! Greedy detangling of one tree against another.
//!
//! # Algorithm
//! The movable tree is walked in post-order. At every node with exactly two
//! children the footrule distance to the standard tree is measured, the
//! children are swapped, and the distance is measured again. The swap is
//! undone only when it made things strictly worse (`d_pre < d_post`), so a
//! swap that leaves the distance unchanged is kept.
//!
//! Children are settled before their parent, so every decision at a node sees
//! the final order of its subtrees from the current sweep.
//!
//! # Complexity
//! O(n) visited nodes, two metric evaluations each, each O(n) in the number
//! of leaves: O(n^2) per sweep with the precomputed rank lookup, O(n^3) if the
//! ranks were rebuilt per evaluation. Fine for tens to hundreds of leaves.
//!
//! # Preconditions
//! The movable tree must be binary (see [`crate::binarize::make_binary`]).
//! A node with more than two children fails with [`TreeError::NotBinary`]
//! before anything is changed. Nodes with a single child are skipped.

use crate::binarize::make_binary;
use crate::correspondence::{CorrespondenceMap, Resolver};
use crate::distances::{DisorderReport, FootruleRanks};
use crate::error::TreeError;
use crate::tree::{Node, NodePath, Side};
use log::{debug, info};
use rayon::prelude::*;

/// Tunables of [`detangle_with`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetangleOptions {
    /// Upper bound on sweeps; sweeping stops early once a sweep does not
    /// lower the disorder. `1` is a single sweep. At least one sweep always
    /// runs, so `0` behaves like `1`.
    pub max_passes: usize,
}

impl Default for DetangleOptions {
    fn default() -> Self {
        DetangleOptions { max_passes: 1 }
    }
}

/// Result of one [`detangle_with`] call.
#[derive(Debug, Clone, PartialEq)]
pub struct DetangleOutcome {
    /// Disorder before the first sweep
    pub before: usize,
    /// Disorder after the last sweep
    pub after: usize,
    pub passes: usize,
    /// Swaps kept, over all sweeps
    pub swaps_kept: usize,
    /// Two-child nodes examined, over all sweeps
    pub nodes_visited: usize,
    /// Standard leaves with no partner in the movable tree
    pub unmatched: usize,
    /// Per-leaf disorder of the final arrangement
    pub report: DisorderReport,
}

/// Label used for a node in log lines and errors.
fn describe(node: &Node) -> String {
    match (node.name.as_deref(), node.unique_id()) {
        (Some(name), Some(id)) if !name.is_empty() => format!("{name} ({id})"),
        (Some(name), None) if !name.is_empty() => name.to_string(),
        (_, Some(id)) => id.to_string(),
        _ => "(unnamed)".to_string(),
    }
}

/// Fails if any node has more than two children.
pub fn ensure_binary(tree: &Node) -> Result<(), TreeError> {
    match tree.first_non_binary() {
        Some(node) => Err(TreeError::NotBinary {
            node: describe(node),
            arity: node.children.len(),
        }),
        None => Ok(()),
    }
}

fn swap_at(tree: &mut Node, path: &[usize]) {
    if let Some(node) = tree.node_at_mut(path) {
        node.swap_children();
    }
}

/// Counters of one sweep.
#[derive(Debug, Default)]
struct Sweep {
    kept: usize,
    visited: usize,
}

/// One post-order sweep over `movable`.
fn sweep(movable: &mut Node, ranks: &FootruleRanks) -> Sweep {
    let mut stats = Sweep::default();
    let paths: Vec<NodePath> = movable.post_order_paths();

    for path in paths {
        let label = match movable.node_at(&path) {
            Some(node) if node.children.len() == 2 => describe(node),
            _ => continue,
        };
        stats.visited += 1;
        let indent = "   ".repeat(path.len());

        let d_pre = ranks.dfoot(&movable.leaf_names());
        swap_at(movable, &path);
        let d_post = ranks.dfoot(&movable.leaf_names());

        debug!("{indent}{label}: {d_pre} vs {d_post}");
        if d_pre < d_post {
            debug!("{indent}reject swap");
            swap_at(movable, &path);
        } else {
            debug!("{indent}keep swap");
            stats.kept += 1;
        }
    }
    stats
}

/// Single sweep of `movable` against `standard`; see [`detangle_with`].
pub fn detangle(
    movable: &mut Node,
    standard: &Node,
    resolver: &Resolver,
) -> Result<DetangleOutcome, TreeError> {
    detangle_with(movable, standard, resolver, &DetangleOptions::default())
}

/// Rearranges the children of `movable` in place to lower its footrule
/// distance to `standard`.
///
/// The correspondence is resolved once per call with `standard` as side A,
/// so `resolver`'s table (if any) must map standard names to movable names.
///
/// # Errors
/// [`TreeError::NotBinary`] if `movable` has a node with more than two
/// children; the tree is left untouched in that case.
///
/// # Example
/// ```
/// use rust_python_tanglegram::correspondence::Resolver;
/// use rust_python_tanglegram::detangle::detangle;
/// use rust_python_tanglegram::newick::parse;
///
/// let standard = parse("((B,A),(C,D));").unwrap();
/// let mut movable = parse("((A,B),(D,C));").unwrap();
/// let outcome = detangle(&mut movable, &standard, &Resolver::new()).unwrap();
/// assert_eq!((outcome.before, outcome.after), (4, 0));
/// assert_eq!(movable.leaf_names(), vec!["B", "A", "C", "D"]);
/// ```
pub fn detangle_with(
    movable: &mut Node,
    standard: &Node,
    resolver: &Resolver,
    options: &DetangleOptions,
) -> Result<DetangleOutcome, TreeError> {
    let map = resolver.resolve(&standard.leaf_names(), &movable.leaf_names());
    detangle_with_map(movable, standard, &map, options)
}

/// Like [`detangle_with`], with the correspondence already resolved.
///
/// `map` goes from `standard` leaf names to `movable` leaf names.
pub fn detangle_with_map(
    movable: &mut Node,
    standard: &Node,
    map: &CorrespondenceMap,
    options: &DetangleOptions,
) -> Result<DetangleOutcome, TreeError> {
    ensure_binary(movable)?;

    let ranks = FootruleRanks::new(&standard.leaf_names(), map);

    let before = ranks.dfoot(&movable.leaf_names());
    let mut current = before;
    let mut passes = 0;
    let mut swaps_kept = 0;
    let mut nodes_visited = 0;

    while passes < options.max_passes.max(1) {
        let start = current;
        let stats = sweep(movable, &ranks);
        passes += 1;
        swaps_kept += stats.kept;
        nodes_visited += stats.visited;
        current = ranks.dfoot(&movable.leaf_names());
        info!(
            "Pass {passes}: disorder {start} -> {current} ({} of {} swaps kept)",
            stats.kept, stats.visited
        );
        if current >= start {
            break;
        }
    }

    Ok(DetangleOutcome {
        before,
        after: current,
        passes,
        swaps_kept,
        nodes_visited,
        unmatched: map.unmatched().len(),
        report: ranks.report(&movable.leaf_names()),
    })
}

/// Detangles each tree of `movables` against the same `standard`, in
/// parallel.
pub fn detangle_many(
    movables: &mut [Node],
    standard: &Node,
    resolver: &Resolver,
    options: &DetangleOptions,
) -> Result<Vec<DetangleOutcome>, TreeError> {
    movables
        .par_iter_mut()
        .map(|movable| detangle_with(movable, standard, resolver, options))
        .collect()
}

/// Result of detangling one side of a [`Tanglegram`] on a copy.
#[derive(Debug, Clone)]
pub struct Perspective {
    pub movable: Side,
    pub tree: Node,
    pub outcome: DetangleOutcome,
}

/// A pair of trees drawn face to face: `left` is side A, `right` side B.
///
/// The resolver maps left leaf names to right leaf names. Detangling the left
/// tree uses the inverse of that same map, so both sides agree on which
/// leaves are paired.
#[derive(Debug, Clone)]
pub struct Tanglegram {
    pub left: Node,
    pub right: Node,
    resolver: Resolver,
}

impl Tanglegram {
    /// Tags both trees with unique ids (`A-n` left, `B-n` right).
    pub fn new(mut left: Node, mut right: Node, resolver: Resolver) -> Self {
        left.assign_unique_ids(Side::A);
        right.assign_unique_ids(Side::B);
        Tanglegram {
            left,
            right,
            resolver,
        }
    }

    pub fn tree(&self, side: Side) -> &Node {
        match side {
            Side::A => &self.left,
            Side::B => &self.right,
        }
    }

    pub fn tree_mut(&mut self, side: Side) -> &mut Node {
        match side {
            Side::A => &mut self.left,
            Side::B => &mut self.right,
        }
    }

    /// Binarizes both trees and tags the inserted nodes.
    pub fn binarize(&mut self) {
        for side in [Side::A, Side::B] {
            let tree = self.tree_mut(side);
            make_binary(tree);
            tree.assign_unique_ids(side);
        }
    }

    /// Left-to-right leaf correspondence, for drawing bridging lines.
    pub fn correspondence(&self) -> CorrespondenceMap {
        self.resolver
            .resolve(&self.left.leaf_names(), &self.right.leaf_names())
    }

    /// Disorder of the right leaf order against the left one.
    pub fn disorder(&self) -> DisorderReport {
        let left = self.left.leaf_names();
        FootruleRanks::new(&left, &self.correspondence()).report(&self.right.leaf_names())
    }

    /// Correspondence keyed by the leaves of the tree `movable` is detangled
    /// against.
    fn map_for(&self, movable: Side) -> CorrespondenceMap {
        let forward = self.correspondence();
        match movable {
            Side::B => forward,
            Side::A => forward.inverted(&self.right.leaf_names()),
        }
    }

    /// Detangles the `movable` tree in place against the other one.
    pub fn detangle(
        &mut self,
        movable: Side,
        options: &DetangleOptions,
    ) -> Result<DetangleOutcome, TreeError> {
        let map = self.map_for(movable);
        match movable {
            Side::B => detangle_with_map(&mut self.right, &self.left, &map, options),
            Side::A => detangle_with_map(&mut self.left, &self.right, &map, options),
        }
    }

    fn perspective(
        &self,
        movable: Side,
        options: &DetangleOptions,
    ) -> Result<Perspective, TreeError> {
        let mut tree = self.tree(movable).clone();
        let outcome = detangle_with_map(
            &mut tree,
            self.tree(movable.other()),
            &self.map_for(movable),
            options,
        )?;
        Ok(Perspective {
            movable,
            tree,
            outcome,
        })
    }

    /// Detangles copies of both trees, each against the unchanged other one,
    /// concurrently. `self` is not modified.
    ///
    /// # Returns
    /// `(left moved, right moved)`
    pub fn detangle_both(
        &self,
        options: &DetangleOptions,
    ) -> Result<(Perspective, Perspective), TreeError> {
        let (left, right) = rayon::join(
            || self.perspective(Side::A, options),
            || self.perspective(Side::B, options),
        );
        Ok((left?, right?))
    }
}
