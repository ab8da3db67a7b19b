//! Python binding layer for tanglegram detangling.
//!
//! Trees cross the boundary as Newick strings; results come back as plain
//! Python values (strings, ints, lists, dicts).

use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use std::collections::HashMap;

use crate::binarize::make_binary;
use crate::correspondence::Resolver;
use crate::detangle::{DetangleOptions, Tanglegram};
use crate::newick::{parse, to_newick};
use crate::tree::{Node, Side};

fn parse_tree(text: &str, which: &str) -> PyResult<Node> {
    parse(text).map_err(|e| PyValueError::new_err(format!("Failed to parse {which} tree: {e}")))
}

fn build_resolver(mapping: Option<HashMap<String, String>>, min_similarity: f64) -> Resolver {
    let resolver = Resolver::new().with_min_similarity(min_similarity);
    match mapping {
        Some(table) => resolver.with_table(table),
        None => resolver,
    }
}

/// Detangle a pair of Newick trees.
///
/// Both trees are binarized first. The `movable` tree has its subtrees
/// reordered to reduce crossings with the other one.
///
/// Args:
///     left: Newick text of the left tree
///     right: Newick text of the right tree
///     movable: "right" or "left" (default: "right")
///     mapping: Optional dict of left leaf name -> right leaf name
///     passes: Maximum number of sweeps (default: 1)
///     min_similarity: Reject fuzzy matches scoring below this (default: 0.0)
///
/// Returns:
///     A tuple of (left_newick, right_newick, disorder_before, disorder_after)
///
/// Raises:
///     ValueError: If a tree cannot be parsed or `movable` is not recognised
#[pyfunction]
#[pyo3(signature = (left, right, movable="right", mapping=None, passes=1, min_similarity=0.0))]
fn detangle_newick(
    left: &str,
    right: &str,
    movable: &str,
    mapping: Option<HashMap<String, String>>,
    passes: usize,
    min_similarity: f64,
) -> PyResult<(String, String, usize, usize)> {
    let side = match movable {
        "right" => Side::B,
        "left" => Side::A,
        other => {
            return Err(PyValueError::new_err(format!(
                "movable must be 'left' or 'right', got '{other}'"
            )));
        }
    };

    let mut pair = Tanglegram::new(
        parse_tree(left, "left")?,
        parse_tree(right, "right")?,
        build_resolver(mapping, min_similarity),
    );
    pair.binarize();

    let outcome = pair
        .detangle(side, &DetangleOptions { max_passes: passes })
        .map_err(|e| PyValueError::new_err(format!("Failed to detangle: {e}")))?;

    Ok((
        to_newick(&pair.left),
        to_newick(&pair.right),
        outcome.before,
        outcome.after,
    ))
}

/// Spearman footrule disorder of the right tree's leaf order against the left.
///
/// Args:
///     left: Newick text of the left (standard) tree
///     right: Newick text of the right tree
///     mapping: Optional dict of left leaf name -> right leaf name
///
/// Returns:
///     A tuple of (total, per_leaf, skipped) where per_leaf maps each matched
///     right leaf to its deviation and skipped lists right leaves without a partner
#[pyfunction]
#[pyo3(signature = (left, right, mapping=None))]
fn footrule_newick(
    left: &str,
    right: &str,
    mapping: Option<HashMap<String, String>>,
) -> PyResult<(usize, HashMap<String, usize>, Vec<String>)> {
    let pair = Tanglegram::new(
        parse_tree(left, "left")?,
        parse_tree(right, "right")?,
        build_resolver(mapping, 0.0),
    );
    let report = pair.disorder();
    let per_leaf = report
        .deviations
        .iter()
        .map(|d| (d.leaf.clone(), d.deviation))
        .collect();
    Ok((report.total, per_leaf, report.skipped))
}

/// Leaf names of a Newick tree in pre-order (the order a tanglegram shows).
///
/// Args:
///     newick: Newick text
///     binarize: Split multifurcations first (leaf order is unchanged either way)
#[pyfunction]
#[pyo3(signature = (newick, binarize=false))]
fn leaves_newick(newick: &str, binarize: bool) -> PyResult<Vec<String>> {
    let mut tree = parse_tree(newick, "input")?;
    if binarize {
        make_binary(&mut tree);
    }
    Ok(tree.leaf_names().into_iter().map(str::to_string).collect())
}

/// Python module definition
#[pymodule]
fn rust_python_tanglegram(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(detangle_newick, m)?)?;
    m.add_function(wrap_pyfunction!(footrule_newick, m)?)?;
    m.add_function(wrap_pyfunction!(leaves_newick, m)?)?;
    Ok(())
}
