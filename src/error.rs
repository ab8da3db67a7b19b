//! Error types for reading trees and operating on them.
//!
//! Two families:
//! - [`NewickError`]: the text could not be turned into a tree (malformed input).
//! - [`TreeError`]: an operation was asked of a tree that cannot support it.
//!
//! Missing leaf correspondences are *not* errors; they are reported as data by
//! [`CorrespondenceMap`](crate::correspondence::CorrespondenceMap).

use std::num::ParseFloatError;
use thiserror::Error;

/// Errors that can occur when parsing Newick text.
#[derive(Error, Debug)]
pub enum NewickError {
    /// Input contained nothing but whitespace and/or a lone `;`
    #[error("Newick input is empty.")]
    Empty,
    /// A `)` appeared with no matching `(`
    #[error("Unbalanced parentheses: ')' without matching '(' at token {position}.")]
    UnbalancedParentheses { position: usize },
    /// Input ended while one or more `(` were still open
    #[error("Unbalanced parentheses: {open} '(' never closed.")]
    UnclosedParentheses { open: usize },
    /// The token after `:` is not a floating-point number
    #[error("Could not parse branch length '{token}' at token {position}.")]
    InvalidLength {
        token: String,
        position: usize,
        #[source]
        source: ParseFloatError,
    },
    /// The length after `:` parses as a float but is NaN or infinite
    #[error("Branch length '{token}' at token {position} is not a finite number.")]
    NonFiniteLength { token: String, position: usize },
    /// Something other than whitespace follows the terminating `;`
    #[error("Unexpected content after ';' at token {position}.")]
    TrailingContent { position: usize },
    /// There was a [`std::io::Error`] while reading Newick text
    #[error("Problem reading Newick input")]
    Io(#[from] std::io::Error),
}

/// Errors that can occur when manipulating a tree.
#[derive(Error, Debug)]
pub enum TreeError {
    /// The detangler met a node with more than two children
    #[error("Node {node} has {arity} children; the tree must be binarized first.")]
    NotBinary { node: String, arity: usize },
    /// No node carries the requested unique id
    #[error("There is no node with unique id: {0}")]
    NodeNotFound(String),
    /// There was a [`NewickError`] when building the tree
    #[error("Problem with building the tree.")]
    Newick(#[from] NewickError),
    /// There was a [`std::io::Error`] when reading or writing a tree file
    #[error("Error reading or writing tree file")]
    Io(#[from] std::io::Error),
}
