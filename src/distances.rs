//! Spearman footrule distance between two leaf orders.
//!
//! The standard tree's pre-order leaf sequence is the rank reference. For
//! every position `i` of the movable tree's leaf sequence, the leaf is mapped
//! back to its standard-side partner (through the inverted
//! [`CorrespondenceMap`]) and `|i - j|` is added, where `j` is the partner's
//! first position in the standard sequence.
//!
//! ```text
//! standard: B A C D
//! movable:  A B D C      dfoot = |0-1| + |1-0| + |2-3| + |3-2| = 4
//! ```
//!
//! A movable leaf without a partner adds 0 and is counted as skipped.
//!
//! The map is keyed by standard-side names (standard = side A).

use crate::correspondence::CorrespondenceMap;
use std::collections::HashMap;

/// Precomputed lookup from movable leaf name to its rank in the standard
/// order.
///
/// The standard order and the correspondence are fixed while a movable tree
/// is being rearranged, so [`FootruleRanks::dfoot`] only has to walk the
/// movable sequence.
#[derive(Debug, Clone, Default)]
pub struct FootruleRanks {
    ranks: HashMap<String, usize>,
}

impl FootruleRanks {
    pub fn new<S: AsRef<str>>(standard_leaves: &[S], map: &CorrespondenceMap) -> Self {
        let mut first_index: HashMap<&str, usize> = HashMap::with_capacity(standard_leaves.len());
        for (j, name) in standard_leaves.iter().enumerate() {
            first_index.entry(name.as_ref()).or_insert(j);
        }

        let ranks = map
            .preimages()
            .into_iter()
            .filter_map(|(movable, standard)| {
                first_index
                    .get(standard)
                    .map(|&j| (movable.to_string(), j))
            })
            .collect();
        FootruleRanks { ranks }
    }

    /// Rank in the standard order of the partner of `movable_leaf`.
    pub fn rank_of(&self, movable_leaf: &str) -> Option<usize> {
        self.ranks.get(movable_leaf).copied()
    }

    /// Footrule distance of `movable_leaves` against the standard order.
    pub fn dfoot<S: AsRef<str>>(&self, movable_leaves: &[S]) -> usize {
        movable_leaves
            .iter()
            .enumerate()
            .filter_map(|(i, name)| self.rank_of(name.as_ref()).map(|j| i.abs_diff(j)))
            .sum()
    }

    /// Per-leaf breakdown of [`FootruleRanks::dfoot`].
    pub fn report<S: AsRef<str>>(&self, movable_leaves: &[S]) -> DisorderReport {
        let mut report = DisorderReport::default();
        for (i, name) in movable_leaves.iter().enumerate() {
            let name = name.as_ref();
            match self.rank_of(name) {
                Some(j) => report.deviations.push(LeafDeviation {
                    leaf: name.to_string(),
                    position: i,
                    standard_position: j,
                    deviation: i.abs_diff(j),
                }),
                None => report.skipped.push(name.to_string()),
            }
        }
        report.total = report.deviations.iter().map(|d| d.deviation).sum();
        report.min = report.deviations.iter().map(|d| d.deviation).min();
        report.max = report.deviations.iter().map(|d| d.deviation).max();
        report
    }
}

/// Deviation of one movable leaf from its partner's standard rank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafDeviation {
    pub leaf: String,
    pub position: usize,
    pub standard_position: usize,
    pub deviation: usize,
}

/// Total disorder plus the per-leaf breakdown used for colouring bridges.
///
/// `min` and `max` are `None` when no leaf was matched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisorderReport {
    pub total: usize,
    pub min: Option<usize>,
    pub max: Option<usize>,
    pub deviations: Vec<LeafDeviation>,
    /// Movable leaves that have no partner in the standard tree
    pub skipped: Vec<String>,
}

impl DisorderReport {
    pub fn deviation_of(&self, leaf: &str) -> Option<usize> {
        self.deviations
            .iter()
            .find(|d| d.leaf == leaf)
            .map(|d| d.deviation)
    }
}

/// Footrule distance of `movable_leaves` against `standard_leaves`.
///
/// `map` goes from standard names to movable names.
///
/// # Example
/// ```
/// use rust_python_tanglegram::correspondence::CorrespondenceMap;
/// use rust_python_tanglegram::distances::dfoot;
///
/// let map = CorrespondenceMap::identity(&["A", "B", "C", "D"]);
/// assert_eq!(dfoot(&["B", "A", "C", "D"], &["A", "B", "D", "C"], &map), 4);
/// ```
pub fn dfoot<S: AsRef<str>, M: AsRef<str>>(
    standard_leaves: &[S],
    movable_leaves: &[M],
    map: &CorrespondenceMap,
) -> usize {
    FootruleRanks::new(standard_leaves, map).dfoot(movable_leaves)
}

/// Like [`dfoot`], with the per-leaf breakdown.
pub fn disorder_report<S: AsRef<str>, M: AsRef<str>>(
    standard_leaves: &[S],
    movable_leaves: &[M],
    map: &CorrespondenceMap,
) -> DisorderReport {
    FootruleRanks::new(standard_leaves, map).report(movable_leaves)
}

#[cfg(test)]
use itertools::Itertools;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::correspondence::{MatchKind, Resolver};

    #[test]
    fn test_four_leaf_example() {
        let standard = ["B", "A", "C", "D"];
        let movable = ["A", "B", "D", "C"];
        let map = CorrespondenceMap::identity(&standard);
        assert_eq!(dfoot(&standard, &movable, &map), 4);
    }

    #[test]
    fn test_zero_for_identical_orders() {
        let leaves = ["t1", "t2", "t3", "t4", "t5"];
        let map = CorrespondenceMap::identity(&leaves);
        assert_eq!(dfoot(&leaves, &leaves, &map), 0);

        let report = disorder_report(&leaves, &leaves, &map);
        assert_eq!(report.total, 0);
        assert_eq!(report.max, Some(0));
        assert!(report.skipped.is_empty());
    }

    #[test]
    fn test_reversed_order() {
        let standard = ["A", "B", "C", "D"];
        let movable = ["D", "C", "B", "A"];
        let map = CorrespondenceMap::identity(&standard);
        // 3 + 1 + 1 + 3
        assert_eq!(dfoot(&standard, &movable, &map), 8);
    }

    #[test]
    fn test_symmetric_under_inverted_map() {
        // bijective relabelling between two different name sets
        let left = ["a", "b", "c", "d", "e"];
        let upper = ["A", "B", "C", "D", "E"];
        let mut forward = CorrespondenceMap::new();
        let mut backward = CorrespondenceMap::new();
        for (l, u) in left.iter().zip(upper.iter()) {
            forward.insert(l, u, MatchKind::Explicit);
            backward.insert(u, l, MatchKind::Explicit);
        }

        let orders: Vec<Vec<&str>> = vec![
            vec!["a", "b", "c", "d", "e"],
            vec!["e", "a", "d", "b", "c"],
            vec!["c", "e", "b", "a", "d"],
        ];
        let upper_orders: Vec<Vec<&str>> = vec![
            vec!["B", "A", "E", "D", "C"],
            vec!["D", "C", "B", "E", "A"],
        ];

        for (l_order, u_order) in orders.iter().cartesian_product(upper_orders.iter()) {
            let ab = dfoot(l_order, u_order, &forward);
            let ba = dfoot(u_order, l_order, &backward);
            assert_eq!(ab, ba);
        }
    }

    #[test]
    fn test_pairwise_orders_symmetric_identity() {
        let orders = [
            vec!["A", "B", "C", "D"],
            vec!["B", "A", "C", "D"],
            vec!["D", "A", "C", "B"],
            vec!["C", "D", "B", "A"],
        ];
        let map = CorrespondenceMap::identity(&orders[0]);
        for (x, y) in orders.iter().tuple_combinations() {
            assert_eq!(dfoot(x, y, &map), dfoot(y, x, &map));
        }
    }

    #[test]
    fn test_unmatched_leaves_contribute_zero() {
        let standard = ["A", "B", "C"];
        let movable = ["X", "B", "A"];
        let map = Resolver::new().with_table([("A", "A"), ("B", "B")]).resolve(&standard, &movable);
        assert_eq!(map.unmatched(), &["C".to_string()]);

        let report = disorder_report(&standard, &movable, &map);
        // B at 1 vs 1, A at 2 vs 0
        assert_eq!(report.total, 2);
        assert_eq!(report.skipped, vec!["X".to_string()]);
        assert_eq!(report.deviation_of("A"), Some(2));
        assert_eq!(report.min, Some(0));
        assert_eq!(report.max, Some(2));
        assert_eq!(dfoot(&standard, &movable, &map), 2);
    }

    #[test]
    fn test_many_to_one_uses_first_preimage() {
        let standard = ["x1", "y", "x2"];
        let movable = ["y", "x"];
        let mut map = CorrespondenceMap::new();
        map.insert("x1", "x", MatchKind::Fuzzy { score: 0.5 });
        map.insert("y", "y", MatchKind::Exact);
        map.insert("x2", "x", MatchKind::Fuzzy { score: 0.5 });
        // y: |0-1|, x -> x1: |1-0|
        assert_eq!(dfoot(&standard, &movable, &map), 2);
    }

    #[test]
    fn test_empty_report() {
        let report = disorder_report(&Vec::<String>::new(), &["A"], &CorrespondenceMap::new());
        assert_eq!(report.total, 0);
        assert_eq!(report.min, None);
        assert_eq!(report.skipped.len(), 1);
    }
}
