use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::debug;

use crate::data::{CanonicalItem, DuplicateItem, PairRow};
use crate::errors::PairsError;
use crate::rng::sample_distinct;

/// How many candidate canonicals each duplicate is paired with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateCount {
    /// Pair with every canonical item (exhaustive evaluation).
    All,
    /// Pair with the true match plus `n - 1` sampled non-matches.
    Limit(usize),
}

impl CandidateCount {
    /// Reject `Limit(0)`: every duplicate needs at least its true match.
    pub fn validate(self) -> Result<Self, PairsError> {
        if self == CandidateCount::Limit(0) {
            return Err(PairsError::Configuration(
                "candidate count must be at least 1".to_string(),
            ));
        }
        Ok(self)
    }

    /// Rows generated per duplicate when `total` canonical items exist.
    pub fn rows_per_duplicate(self, total: usize) -> usize {
        match self {
            CandidateCount::All => total,
            CandidateCount::Limit(n) => n.min(total),
        }
    }

    /// True when every canonical item is paired rather than sampled.
    pub fn is_exhaustive(self, total: usize) -> bool {
        match self {
            CandidateCount::All => true,
            CandidateCount::Limit(n) => n >= total,
        }
    }
}

impl fmt::Display for CandidateCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CandidateCount::All => f.write_str("all"),
            CandidateCount::Limit(n) => write!(f, "{n}"),
        }
    }
}

/// Builds labeled (duplicate, candidate) tables over a fixed canonical set.
///
/// Each duplicate gets exactly one matching row (force-included, never left to
/// chance) followed by non-matching rows: all remaining canonicals in
/// exhaustive mode, otherwise a uniform draw without replacement.
pub struct PairGenerator<'a> {
    canonicals: Vec<&'a CanonicalItem>,
    by_group: HashMap<&'a str, usize>,
    candidates: CandidateCount,
}

impl<'a> PairGenerator<'a> {
    /// Index `canonicals` by group key.
    ///
    /// Repeated rows (same id, same group key) collapse onto the first
    /// occurrence. Fails when one id carries two group keys or one group key
    /// carries two ids, since either would break the one-match-per-duplicate
    /// guarantee.
    pub fn new(
        canonicals: &'a [CanonicalItem],
        candidates: CandidateCount,
    ) -> Result<Self, PairsError> {
        let candidates = candidates.validate()?;
        let mut pool: Vec<&'a CanonicalItem> = Vec::with_capacity(canonicals.len());
        let mut by_group: HashMap<&'a str, usize> = HashMap::with_capacity(canonicals.len());
        let mut by_id: HashMap<u64, &'a str> = HashMap::with_capacity(canonicals.len());
        for canonical in canonicals {
            let group_key = canonical.group_key.as_str();
            if let Some(&seen_group) = by_id.get(&canonical.id) {
                if seen_group == group_key {
                    continue;
                }
                return Err(PairsError::DataIntegrity(format!(
                    "canonical id {} appears under groups '{}' and '{}'",
                    canonical.id, seen_group, group_key
                )));
            }
            if by_group.contains_key(group_key) {
                return Err(PairsError::DataIntegrity(format!(
                    "group '{}' has more than one canonical item",
                    canonical.group_key
                )));
            }
            by_id.insert(canonical.id, group_key);
            by_group.insert(group_key, pool.len());
            pool.push(canonical);
        }
        if pool.len() < canonicals.len() {
            debug!(
                repeated = canonicals.len() - pool.len(),
                "collapsed repeated canonical rows"
            );
        }
        Ok(Self {
            canonicals: pool,
            by_group,
            candidates,
        })
    }

    /// Rows generated per duplicate with the current canonical set.
    pub fn rows_per_duplicate(&self) -> usize {
        self.candidates.rows_per_duplicate(self.canonicals.len())
    }

    /// Candidate rows for one duplicate, match first.
    pub fn pairs_for<R: Rng + ?Sized>(
        &self,
        duplicate: &DuplicateItem,
        rng: &mut R,
    ) -> Result<Vec<PairRow>, PairsError> {
        let Some(&match_idx) = self.by_group.get(duplicate.group_key.as_str()) else {
            return Err(PairsError::DataIntegrity(format!(
                "duplicate {} references group '{}' with no canonical item",
                duplicate.id, duplicate.group_key
            )));
        };
        let total = self.canonicals.len();
        let mut rows = Vec::with_capacity(self.rows_per_duplicate());
        rows.push(PairRow::new(duplicate, self.canonicals[match_idx], 0));

        if self.candidates.is_exhaustive(total) {
            let others = self
                .canonicals
                .iter()
                .enumerate()
                .filter(|(idx, _)| *idx != match_idx)
                .map(|(_, canonical)| *canonical);
            for canonical in others {
                rows.push(PairRow::new(duplicate, canonical, rows.len()));
            }
        } else {
            // Draw over the pool with the match removed; positions at or past the
            // match shift by one to skip it.
            let negatives = self.rows_per_duplicate() - 1;
            let context = format!("negatives for duplicate {}", duplicate.id);
            for pick in sample_distinct(rng, total - 1, negatives, &context)? {
                let idx = if pick >= match_idx { pick + 1 } else { pick };
                rows.push(PairRow::new(duplicate, self.canonicals[idx], rows.len()));
            }
        }
        Ok(rows)
    }

    /// Candidate rows for every duplicate, ordered by duplicate id then label (matches first).
    pub fn generate<R: Rng + ?Sized>(
        &self,
        duplicates: &[DuplicateItem],
        rng: &mut R,
    ) -> Result<Vec<PairRow>, PairsError> {
        let mut order: Vec<&DuplicateItem> = duplicates.iter().collect();
        order.sort_by_key(|duplicate| duplicate.id);
        if let Some(pair) = order.windows(2).find(|pair| pair[0].id == pair[1].id) {
            return Err(PairsError::DataIntegrity(format!(
                "duplicate id {} appears more than once",
                pair[0].id
            )));
        }

        let mut rows = Vec::with_capacity(order.len() * self.rows_per_duplicate());
        for duplicate in order {
            rows.extend(self.pairs_for(duplicate, rng)?);
        }
        debug!(
            duplicates = duplicates.len(),
            canonicals = self.canonicals.len(),
            candidates = %self.candidates,
            rows = rows.len(),
            "generated pair rows"
        );
        Ok(rows)
    }
}

/// Convenience wrapper: build a [`PairGenerator`] and run it over `duplicates`.
pub fn generate_pairs<R: Rng + ?Sized>(
    duplicates: &[DuplicateItem],
    canonicals: &[CanonicalItem],
    candidates: CandidateCount,
    rng: &mut R,
) -> Result<Vec<PairRow>, PairsError> {
    PairGenerator::new(canonicals, candidates)?.generate(duplicates, rng)
}

/// Check that `rows` holds exactly one matching row for every duplicate and nothing else.
pub fn verify_pair_table(
    rows: &[PairRow],
    duplicates: &[DuplicateItem],
) -> Result<(), PairsError> {
    let mut matches: HashMap<u64, usize> =
        duplicates.iter().map(|duplicate| (duplicate.id, 0)).collect();
    for row in rows {
        let Some(count) = matches.get_mut(&row.duplicate_id) else {
            return Err(PairsError::DataIntegrity(format!(
                "pair table references unknown duplicate {}",
                row.duplicate_id
            )));
        };
        if row.is_match() {
            *count += 1;
        }
    }
    if let Some((id, count)) = matches.iter().find(|(_, count)| **count != 1) {
        return Err(PairsError::DataIntegrity(format!(
            "duplicate {id} has {count} matching rows, expected exactly 1"
        )));
    }
    Ok(())
}
