//! Leaf correspondence between the two trees of a tanglegram.
//!
//! A [`Resolver`] maps every leaf name of one tree (side A) to one leaf name
//! of the other (side B), trying in order:
//!
//! 1. an explicit table, when one was supplied (used verbatim, no fallback);
//! 2. the B leaf with the identical name;
//! 3. the B leaf whose name is most similar (Dice coefficient on character
//!    bigrams). The first best-scoring leaf in B's pre-order wins ties.
//!
//! Fuzzy matching may send several A leaves to the same B leaf. That is kept
//! as is; nothing checks bijectivity.
//!
//! A leaf that finds no partner is recorded in
//! [`CorrespondenceMap::unmatched`] and skipped by the disorder metric.

use log::warn;
use std::collections::HashMap;

/// How a leaf pair was matched.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MatchKind {
    Explicit,
    Exact,
    /// Best fuzzy candidate, with its similarity in `[0, 1]`
    Fuzzy { score: f64 },
}

/// One resolved pair of leaf names.
#[derive(Debug, Clone, PartialEq)]
pub struct Correspondence {
    pub from: String,
    pub to: String,
    pub kind: MatchKind,
}

/// Mapping from side-A leaf names to side-B leaf names.
///
/// Keys are unique. Values need not be.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CorrespondenceMap {
    pairs: Vec<Correspondence>,
    index: HashMap<String, usize>,
    unmatched: Vec<String>,
}

impl CorrespondenceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Identity mapping over `names` (each name maps to itself).
    pub fn identity<S: AsRef<str>>(names: &[S]) -> Self {
        let mut map = Self::new();
        for name in names {
            map.insert(name.as_ref(), name.as_ref(), MatchKind::Exact);
        }
        map
    }

    /// Adds a pair unless `from` is already mapped; the first pair wins.
    pub fn insert(&mut self, from: &str, to: &str, kind: MatchKind) {
        if self.index.contains_key(from) {
            return;
        }
        self.index.insert(from.to_string(), self.pairs.len());
        self.pairs.push(Correspondence {
            from: from.to_string(),
            to: to.to_string(),
            kind,
        });
    }

    fn mark_unmatched(&mut self, from: &str) {
        if !self.index.contains_key(from) && !self.unmatched.iter().any(|u| u == from) {
            self.unmatched.push(from.to_string());
        }
    }

    /// Partner of the side-A leaf `from`.
    pub fn get(&self, from: &str) -> Option<&str> {
        self.get_match(from).map(|c| c.to.as_str())
    }

    pub fn get_match(&self, from: &str) -> Option<&Correspondence> {
        self.index.get(from).map(|&i| &self.pairs[i])
    }

    /// Resolved pairs in side-A leaf order.
    pub fn pairs(&self) -> &[Correspondence] {
        &self.pairs
    }

    /// Side-A leaves without a partner, in side-A leaf order.
    pub fn unmatched(&self) -> &[String] {
        &self.unmatched
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// The same correspondence seen from side B: each leaf of `b_leaves` maps
    /// to its first preimage in side-A order and keeps that pair's
    /// [`MatchKind`]. B leaves nobody maps to become the unmatched list.
    ///
    /// Detangling the A tree against the B tree uses this instead of
    /// resolving again from B, which for fuzzy matches could pair leaves
    /// differently.
    pub fn inverted<S: AsRef<str>>(&self, b_leaves: &[S]) -> CorrespondenceMap {
        let mut first: HashMap<&str, &Correspondence> = HashMap::with_capacity(self.pairs.len());
        for pair in &self.pairs {
            first.entry(pair.to.as_str()).or_insert(pair);
        }

        let mut inverse = CorrespondenceMap::new();
        for b in b_leaves.iter().map(AsRef::as_ref) {
            match first.get(b) {
                Some(pair) => inverse.insert(b, &pair.from, pair.kind),
                None => inverse.mark_unmatched(b),
            }
        }
        inverse
    }

    /// Side-B name -> side-A name.
    ///
    /// When several A leaves map to the same B leaf, the first of them in
    /// side-A order is the one returned.
    pub fn preimages(&self) -> HashMap<&str, &str> {
        let mut inverse = HashMap::with_capacity(self.pairs.len());
        for pair in &self.pairs {
            inverse.entry(pair.to.as_str()).or_insert(pair.from.as_str());
        }
        inverse
    }
}

/// Similarity of two strings as the Dice coefficient of their character
/// bigram multisets, ignoring whitespace.
///
/// Identical strings score 1. If either string is shorter than two
/// characters (and they differ), the score is 0.
pub fn similarity(first: &str, second: &str) -> f64 {
    let first: Vec<char> = first.chars().filter(|c| !c.is_whitespace()).collect();
    let second: Vec<char> = second.chars().filter(|c| !c.is_whitespace()).collect();

    if first == second {
        return 1.0;
    }
    if first.len() < 2 || second.len() < 2 {
        return 0.0;
    }

    let mut bigrams: HashMap<(char, char), usize> = HashMap::new();
    for pair in first.windows(2) {
        *bigrams.entry((pair[0], pair[1])).or_insert(0) += 1;
    }

    let mut intersection = 0usize;
    for pair in second.windows(2) {
        if let Some(count) = bigrams.get_mut(&(pair[0], pair[1])) {
            if *count > 0 {
                *count -= 1;
                intersection += 1;
            }
        }
    }

    (2 * intersection) as f64 / (first.len() + second.len() - 2) as f64
}

/// Index and score of the best candidate; the first one wins ties.
pub fn best_match<S: AsRef<str>>(name: &str, candidates: &[S]) -> Option<(usize, f64)> {
    let mut best: Option<(usize, f64)> = None;
    for (i, candidate) in candidates.iter().enumerate() {
        let score = similarity(name, candidate.as_ref());
        if best.is_none_or(|(_, top)| score > top) {
            best = Some((i, score));
        }
    }
    best
}

/// Builds [`CorrespondenceMap`]s.
///
/// # Example
/// ```
/// use rust_python_tanglegram::correspondence::Resolver;
///
/// let map = Resolver::new().resolve(&["Homo_sapiens", "Pan"], &["Pan", "Homo sapiens"]);
/// assert_eq!(map.get("Pan"), Some("Pan"));
/// assert_eq!(map.get("Homo_sapiens"), Some("Homo sapiens"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Resolver {
    table: Option<Vec<(String, String)>>,
    min_similarity: f64,
}

impl Resolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses `pairs` (`A name`, `B name`) instead of name matching.
    /// A repeated A name takes its last partner.
    pub fn with_table<I, K, V>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.table = Some(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        self
    }

    /// Fuzzy candidates scoring below `threshold` are rejected.
    pub fn with_min_similarity(mut self, threshold: f64) -> Self {
        self.min_similarity = threshold;
        self
    }

    pub fn has_table(&self) -> bool {
        self.table.is_some()
    }

    /// Maps each leaf in `a_leaves` to a leaf in `b_leaves`.
    ///
    /// Both slices are pre-order leaf name sequences. Unmatched leaves are
    /// logged at `warn` level and listed in the result.
    pub fn resolve<A, B>(&self, a_leaves: &[A], b_leaves: &[B]) -> CorrespondenceMap
    where
        A: AsRef<str>,
        B: AsRef<str>,
    {
        let mut map = CorrespondenceMap::new();
        let b_names: Vec<&str> = b_leaves.iter().map(AsRef::as_ref).collect();

        match &self.table {
            Some(table) => {
                let lookup: HashMap<&str, &str> = table
                    .iter()
                    .map(|(a, b)| (a.as_str(), b.as_str()))
                    .collect();
                for a in a_leaves.iter().map(AsRef::as_ref) {
                    match lookup.get(a) {
                        Some(&b) if b_names.contains(&b) => map.insert(a, b, MatchKind::Explicit),
                        _ => map.mark_unmatched(a),
                    }
                }
            }
            None => {
                for a in a_leaves.iter().map(AsRef::as_ref) {
                    if b_names.contains(&a) {
                        map.insert(a, a, MatchKind::Exact);
                        continue;
                    }
                    match best_match(a, &b_names) {
                        Some((i, score)) if score >= self.min_similarity => {
                            map.insert(a, b_names[i], MatchKind::Fuzzy { score })
                        }
                        _ => map.mark_unmatched(a),
                    }
                }
            }
        }

        for leaf in &map.unmatched {
            warn!("No corresponding leaf for '{leaf}'");
        }
        map
    }
}
