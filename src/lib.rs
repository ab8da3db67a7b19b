//! Crate root: lightweight module orchestration and public re-exports.
//!
//! Modules:
//! - `newick`: reading and writing the Newick tree format.
//! - `tree`: owned tree model, unique ids, traversal, swaps and statistics.
//! - `snapshot`: indexed lookup snapshot of a tree with distances to the root.
//! - `binarize`: splitting multifurcations, random binarization, shuffling.
//! - `correspondence`: matching leaves of the two trees (table, exact, fuzzy).
//! - `distances`: Spearman footrule disorder between two leaf orders.
//! - `detangle`: greedy sibling swapping to lower the disorder.
//! - `io`: tree, mapping-table and report files (plain or gzip).
//! - `api`: Python bindings via `pyo3` (gated behind "python" feature).

pub mod binarize;
pub mod correspondence;
pub mod detangle;
pub mod distances;
pub mod error;
pub mod io;
pub mod newick;
pub mod snapshot;
pub mod tree;

#[cfg(feature = "python")]
pub mod api;

// Re-export frequently used types & functions
pub use binarize::make_binary;
pub use correspondence::{CorrespondenceMap, Resolver};
pub use detangle::{
    DetangleOptions, DetangleOutcome, Tanglegram, detangle, detangle_with, detangle_with_map,
};
pub use distances::{DisorderReport, dfoot, disorder_report};
pub use error::{NewickError, TreeError};
pub use io::{read_tree, read_trees, write_newick};
pub use newick::{parse, to_newick};
pub use snapshot::TreeSnapshot;
pub use tree::{Node, Side};
