use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::data::{Grouped, PairRow};
use crate::splits::{SplitLabel, SplitSet};

/// Aggregate shape of one pair table.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairTableStats {
    /// Total rows.
    pub rows: usize,
    /// Distinct duplicates covered.
    pub duplicates: usize,
    /// Rows with `Label = 1`.
    pub positives: usize,
    /// Rows with `Label = 0`.
    pub negatives: usize,
    /// Fewest candidate rows any duplicate received.
    pub min_candidates: usize,
    /// Most candidate rows any duplicate received.
    pub max_candidates: usize,
}

impl PairTableStats {
    /// Compute stats from pair rows in any order.
    pub fn from_rows(rows: &[PairRow]) -> Self {
        if rows.is_empty() {
            return Self::default();
        }
        let mut per_duplicate: HashMap<u64, usize> = HashMap::new();
        let mut positives = 0;
        for row in rows {
            *per_duplicate.entry(row.duplicate_id).or_insert(0) += 1;
            if row.is_match() {
                positives += 1;
            }
        }
        Self {
            rows: rows.len(),
            duplicates: per_duplicate.len(),
            positives,
            negatives: rows.len() - positives,
            min_candidates: per_duplicate.values().copied().min().unwrap_or(0),
            max_candidates: per_duplicate.values().copied().max().unwrap_or(0),
        }
    }
}

/// How many distinct groups each split represents.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupCoverage {
    /// Distinct groups across all splits.
    pub groups: usize,
    /// Groups with at least one training duplicate.
    pub train: usize,
    /// Groups with at least one tuning duplicate.
    pub tune: usize,
    /// Groups with at least one test duplicate.
    pub test: usize,
    /// Groups present in all three splits.
    pub in_all_splits: usize,
}

impl GroupCoverage {
    /// Count the groups each split of `set` touches.
    pub fn from_splits<T: Grouped>(set: &SplitSet<T>) -> Self {
        let train = distinct_groups(set.get(SplitLabel::Train));
        let tune = distinct_groups(set.get(SplitLabel::Tune));
        let test = distinct_groups(set.get(SplitLabel::Test));
        let groups = train.union(&tune).chain(test.iter()).collect::<HashSet<_>>().len();
        let in_all_splits = train
            .iter()
            .filter(|group| tune.contains(*group) && test.contains(*group))
            .count();
        Self {
            groups,
            train: train.len(),
            tune: tune.len(),
            test: test.len(),
            in_all_splits,
        }
    }

    /// Number of groups missing from at least one split.
    pub fn groups_missing_a_split(&self) -> usize {
        self.groups - self.in_all_splits
    }
}

fn distinct_groups<T: Grouped>(items: &[T]) -> HashSet<&str> {
    items.iter().map(|item| item.group_key()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::TextItem;

    fn row(duplicate_id: u64, label: u8) -> PairRow {
        PairRow {
            duplicate_id,
            duplicate_group_key: "g".into(),
            duplicate_text: String::new(),
            canonical_id: 0,
            canonical_text: String::new(),
            canonical_group_key: "g".into(),
            label,
            candidate_index: 0,
        }
    }

    #[test]
    fn pair_stats_count_rows_and_candidates() {
        let rows = vec![row(1, 1), row(1, 0), row(1, 0), row(2, 1), row(2, 0)];
        let stats = PairTableStats::from_rows(&rows);
        assert_eq!(
            stats,
            PairTableStats {
                rows: 5,
                duplicates: 2,
                positives: 2,
                negatives: 3,
                min_candidates: 2,
                max_candidates: 3,
            }
        );
        assert_eq!(PairTableStats::from_rows(&[]), PairTableStats::default());
    }

    #[test]
    fn coverage_counts_groups_per_split() {
        let set = SplitSet {
            train: vec![TextItem::new(1, "a", ""), TextItem::new(2, "b", "")],
            tune: vec![TextItem::new(3, "a", "")],
            test: vec![TextItem::new(4, "c", "")],
        };
        let coverage = GroupCoverage::from_splits(&set);
        assert_eq!(
            coverage,
            GroupCoverage {
                groups: 3,
                train: 2,
                tune: 1,
                test: 1,
                in_all_splits: 0,
            }
        );
        assert_eq!(coverage.groups_missing_a_split(), 3);
    }
}
