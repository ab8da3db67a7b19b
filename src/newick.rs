//! Newick text format: parsing into [`Node`] trees and writing them back.
//!
//! # Format
//! * `tree ::= subtree ';'`
//! * `subtree ::= leaf | internal`
//! * `internal ::= '(' subtree (',' subtree)* ')' [name] [':' length]`
//! * `leaf ::= name [':' length]`
//!
//! Whitespace around delimiters is ignored. Names are any run of characters
//! other than `(`, `)`, `,`, `:`, `;`; there is no quoting or escaping.
//!
//! # Round trip
//! [`to_newick`] writes lengths with Rust's shortest float formatting, so
//! `6.0` comes back as `6` while the numeric value is preserved. Missing names
//! and lengths are omitted rather than written as placeholders.

use crate::error::NewickError;
use crate::tree::Node;
use itertools::Itertools;
use std::fmt;
use std::str::FromStr;

/// Characters that split Newick text into tokens.
const DELIMITERS: [char; 5] = ['(', ')', ',', ':', ';'];

#[derive(Debug, Clone, PartialEq)]
enum Token<'a> {
    Delimiter(char),
    Text(&'a str),
}

/// Splits on the delimiter set; text between delimiters is trimmed and
/// dropped when nothing remains.
fn tokenize(text: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut start = 0;
    for (i, c) in text.char_indices() {
        if DELIMITERS.contains(&c) {
            let run = text[start..i].trim();
            if !run.is_empty() {
                tokens.push(Token::Text(run));
            }
            tokens.push(Token::Delimiter(c));
            start = i + c.len_utf8();
        }
    }
    let run = text[start..].trim();
    if !run.is_empty() {
        tokens.push(Token::Text(run));
    }
    tokens
}

/// Stack-of-ancestors parser over a token list.
///
/// `(` pushes the current node as an ancestor and starts its first child,
/// `,` attaches the current node to the open ancestor and starts a sibling,
/// `)` attaches the current node and makes the ancestor current again, so a
/// following name or length belongs to the just-closed internal node.
struct Parser<'a> {
    tokens: Vec<Token<'a>>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            tokens: tokenize(text),
            pos: 0,
        }
    }

    fn is_done(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    /// Steps over bare `;` tokens left between trees.
    fn skip_separators(&mut self) {
        while let Some(Token::Delimiter(';')) = self.tokens.get(self.pos) {
            self.pos += 1;
        }
    }

    /// Parses one tree, consuming tokens up to and including its `;`
    /// (or the end of input if the `;` is missing).
    fn parse_tree(&mut self) -> Result<Node, NewickError> {
        let mut ancestors: Vec<Node> = Vec::new();
        let mut current = Node::new();
        let mut previous: Option<Token<'a>> = None;
        let mut seen_content = false;

        while let Some(token) = self.tokens.get(self.pos).cloned() {
            let position = self.pos;
            self.pos += 1;

            match token {
                Token::Delimiter('(') => {
                    ancestors.push(current);
                    current = Node::new();
                }
                Token::Delimiter(',') => {
                    let parent = ancestors
                        .last_mut()
                        .ok_or(NewickError::UnbalancedParentheses { position })?;
                    parent.children.push(std::mem::take(&mut current));
                }
                Token::Delimiter(')') => {
                    let mut parent = ancestors
                        .pop()
                        .ok_or(NewickError::UnbalancedParentheses { position })?;
                    parent.children.push(current);
                    current = parent;
                }
                Token::Delimiter(';') => {
                    if !ancestors.is_empty() {
                        return Err(NewickError::UnclosedParentheses {
                            open: ancestors.len(),
                        });
                    }
                    if !seen_content {
                        return Err(NewickError::Empty);
                    }
                    return Ok(current);
                }
                Token::Delimiter(_) => {}
                Token::Text(text) => match previous {
                    None
                    | Some(Token::Delimiter('('))
                    | Some(Token::Delimiter(')'))
                    | Some(Token::Delimiter(',')) => {
                        current.name = Some(text.to_string());
                    }
                    Some(Token::Delimiter(':')) => {
                        let length =
                            f64::from_str(text).map_err(|source| NewickError::InvalidLength {
                                token: text.to_string(),
                                position,
                                source,
                            })?;
                        if !length.is_finite() {
                            return Err(NewickError::NonFiniteLength {
                                token: text.to_string(),
                                position,
                            });
                        }
                        current.length = Some(length);
                    }
                    _ => {}
                },
            }
            seen_content = true;
            previous = Some(token);
        }

        // Input ended without ';'
        if !ancestors.is_empty() {
            return Err(NewickError::UnclosedParentheses {
                open: ancestors.len(),
            });
        }
        if !seen_content {
            return Err(NewickError::Empty);
        }
        Ok(current)
    }
}

/// Parses a single Newick tree.
///
/// The terminating `;` is optional; anything but whitespace after it is an
/// error (use [`parse_all`] for multi-tree text).
///
/// # Errors
/// [`NewickError`] for empty input, unbalanced parentheses, non-numeric
/// lengths or trailing content. No partial tree is returned.
///
/// # Example
/// ```
/// use rust_python_tanglegram::newick::parse;
///
/// let tree = parse("((B:6.0,(A:5.0,C:3.0)i0:5.0)i1:4.0,D:15.0)simple-tree:10;")?;
/// assert_eq!(tree.label(), "simple-tree");
/// assert_eq!(tree.leaf_names(), vec!["B", "A", "C", "D"]);
/// # Ok::<(), rust_python_tanglegram::NewickError>(())
/// ```
pub fn parse(text: &str) -> Result<Node, NewickError> {
    let mut parser = Parser::new(text);
    if parser.is_done() {
        return Err(NewickError::Empty);
    }
    let tree = parser.parse_tree()?;
    if !parser.is_done() {
        return Err(NewickError::TrailingContent {
            position: parser.pos,
        });
    }
    Ok(tree)
}

/// Parses every `;`-terminated tree in `text`, in order. Empty statements
/// (`;;`) between trees are skipped.
///
/// # Errors
/// [`NewickError::Empty`] if `text` holds no tree, or the first error met.
pub fn parse_all(text: &str) -> Result<Vec<Node>, NewickError> {
    let mut parser = Parser::new(text);
    let mut trees = Vec::new();
    loop {
        parser.skip_separators();
        if parser.is_done() {
            break;
        }
        trees.push(parser.parse_tree()?);
    }
    if trees.is_empty() {
        return Err(NewickError::Empty);
    }
    Ok(trees)
}

/// Writes `tree` as Newick text terminated by `;`.
pub fn to_newick(tree: &Node) -> String {
    format!("{tree};")
}

fn subtree_to_newick(node: &Node) -> String {
    let mut newick = String::new();
    if !node.is_leaf() {
        newick.push('(');
        newick.push_str(&node.children.iter().map(subtree_to_newick).join(","));
        newick.push(')');
    }
    if let Some(name) = &node.name {
        newick.push_str(name);
    }
    if let Some(length) = node.length {
        newick.push(':');
        newick.push_str(&length.to_string());
    }
    newick
}

/// Newick text of the subtree, without the terminating `;`.
impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&subtree_to_newick(self))
    }
}

impl FromStr for Node {
    type Err = NewickError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binarize::{random_tree, shuffle};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    const SIMPLE: &str = "((B:6.0,(A:5.0,C:3.0)i0:5.0)i1:4.0,D:15.0)simple-tree:10;";

    #[test]
    fn test_parse_simple_tree() {
        let tree = parse(SIMPLE).unwrap();
        assert_eq!(tree.name.as_deref(), Some("simple-tree"));
        assert_eq!(tree.length, Some(10.0));
        assert_eq!(tree.children.len(), 2);

        let i1 = &tree.children[0];
        assert_eq!(i1.name.as_deref(), Some("i1"));
        assert_eq!(i1.length, Some(4.0));
        assert_eq!(i1.children[0].name.as_deref(), Some("B"));
        assert_eq!(i1.children[0].length, Some(6.0));

        let i0 = &i1.children[1];
        assert_eq!(i0.name.as_deref(), Some("i0"));
        assert_eq!(i0.length, Some(5.0));
        assert_eq!(i0.children[0].name.as_deref(), Some("A"));
        assert_eq!(i0.children[0].length, Some(5.0));
        assert_eq!(i0.children[1].name.as_deref(), Some("C"));
        assert_eq!(i0.children[1].length, Some(3.0));

        let d = &tree.children[1];
        assert!(d.is_leaf());
        assert_eq!(d.name.as_deref(), Some("D"));
        assert_eq!(d.length, Some(15.0));
    }

    #[test]
    fn test_serialize_simple_tree() {
        let tree = parse(SIMPLE).unwrap();
        assert_eq!(
            to_newick(&tree),
            "((B:6,(A:5,C:3)i0:5)i1:4,D:15)simple-tree:10;"
        );
    }

    #[test]
    fn test_round_trip_preserves_leaves_and_lengths() {
        let text = "((Fratercula_cirrhata:0.125,(Fratercula_arctica:1e-3,F_c:2.5)),Alle_alle:0.1);";
        let tree = parse(text).unwrap();
        let again = parse(&to_newick(&tree)).unwrap();
        assert_eq!(tree.leaf_names(), again.leaf_names());
        assert_eq!(tree, again);
        assert!((again.children[0].children[1].children[0].branch_length() - 0.001).abs() < 1e-12);
    }

    #[test]
    fn test_whitespace_is_insignificant() {
        let tree = parse(" ( A : 1 ,\n\t( B:2 , C ) x ) root ;\n").unwrap();
        assert_eq!(tree.leaf_names(), vec!["A", "B", "C"]);
        assert_eq!(tree.children[1].label(), "x");
        assert_eq!(to_newick(&tree), "(A:1,(B:2,C)x)root;");
    }

    #[test]
    fn test_missing_names_and_lengths() {
        let tree = parse("(,(,));").unwrap();
        assert_eq!(tree.num_leaves(), 3);
        assert_eq!(to_newick(&tree), "(,(,));");
    }

    #[test]
    fn test_multifurcation() {
        let tree = parse("(A,B,C,D)r;").unwrap();
        assert_eq!(tree.children.len(), 4);
        assert_eq!(tree.leaf_names(), vec!["A", "B", "C", "D"]);
    }

    #[test]
    fn test_single_leaf_tree() {
        let tree = parse("A:2;").unwrap();
        assert!(tree.is_leaf());
        assert_eq!(tree.label(), "A");
        assert_eq!(tree.length, Some(2.0));
    }

    #[test]
    fn test_semicolon_optional() {
        let tree = parse("(A,B)").unwrap();
        assert_eq!(tree.leaf_names(), vec!["A", "B"]);
    }

    #[test]
    fn test_empty_input() {
        assert!(matches!(parse(""), Err(NewickError::Empty)));
        assert!(matches!(parse("  \n "), Err(NewickError::Empty)));
        assert!(matches!(parse(";"), Err(NewickError::Empty)));
    }

    #[test]
    fn test_unbalanced_parentheses() {
        assert!(matches!(
            parse("(A,B));"),
            Err(NewickError::UnbalancedParentheses { position: 5 })
        ));
        assert!(matches!(
            parse("((A,B);"),
            Err(NewickError::UnclosedParentheses { open: 1 })
        ));
        assert!(matches!(
            parse("((A,B)"),
            Err(NewickError::UnclosedParentheses { open: 1 })
        ));
        assert!(matches!(
            parse("A,B;"),
            Err(NewickError::UnbalancedParentheses { .. })
        ));
    }

    #[test]
    fn test_invalid_length() {
        match parse("(A:1.0,B:abc);") {
            Err(NewickError::InvalidLength { token, .. }) => assert_eq!(token, "abc"),
            other => panic!("expected InvalidLength, got {other:?}"),
        }
    }

    #[test]
    fn test_non_finite_length_rejected() {
        for text in ["(A:NaN,B:1);", "(A:1,B:inf);", "(A,B)r:-infinity;"] {
            assert!(
                matches!(parse(text), Err(NewickError::NonFiniteLength { .. })),
                "{text} should be rejected"
            );
        }
        match parse("(A:1,B:NaN);") {
            Err(NewickError::NonFiniteLength { token, position }) => {
                assert_eq!(token, "NaN");
                assert_eq!(position, 7);
            }
            other => panic!("expected NonFiniteLength, got {other:?}"),
        }
    }

    #[test]
    fn test_round_trip_random_trees() {
        fn assign_lengths(node: &mut Node, rng: &mut StdRng) {
            node.length = match rng.gen_range(0..4) {
                0 => None,
                1 => Some(rng.gen_range(0..100) as f64),
                2 => Some(rng.gen_range(0.0..1.0)),
                _ => Some(rng.gen_range(1e-6..1e6)),
            };
            for child in node.children.iter_mut() {
                assign_lengths(child, rng);
            }
        }

        let mut rng = StdRng::seed_from_u64(17);
        for n in [1, 2, 3, 8, 25, 60] {
            for _ in 0..5 {
                let mut tree = random_tree(n, &mut rng);
                shuffle(&mut tree, &mut rng);
                assign_lengths(&mut tree, &mut rng);

                let text = to_newick(&tree);
                let again = parse(&text).unwrap();
                assert_eq!(again, tree, "{text}");
                assert_eq!(again.leaf_names(), tree.leaf_names());
            }
        }
    }

    #[test]
    fn test_trailing_content() {
        assert!(matches!(
            parse("(A,B);(C,D);"),
            Err(NewickError::TrailingContent { .. })
        ));
    }

    #[test]
    fn test_parse_all() {
        let trees = parse_all("(A,B);\n(C,(D,E));\n").unwrap();
        assert_eq!(trees.len(), 2);
        assert_eq!(trees[1].leaf_names(), vec!["C", "D", "E"]);
        assert!(matches!(parse_all("\n"), Err(NewickError::Empty)));
        assert!(parse_all("(A,B);(C").is_err());
    }

    #[test]
    fn test_parse_all_skips_empty_statements() {
        let trees = parse_all(";(A,B);;\n;(C,D);;").unwrap();
        assert_eq!(trees.len(), 2);
        assert_eq!(trees[1].leaf_names(), vec!["C", "D"]);
        assert!(matches!(parse_all(";;\n;"), Err(NewickError::Empty)));
    }

    #[test]
    fn test_from_str_and_display() {
        let tree: Node = "(A:1,B:2)r;".parse().unwrap();
        assert_eq!(tree.to_string(), "(A:1,B:2)r");
        assert_eq!(tree.children[0].to_string(), "A:1");
    }
}
