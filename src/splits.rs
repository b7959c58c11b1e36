use indexmap::IndexMap;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::debug;

use crate::data::Grouped;
use crate::errors::PairsError;
use crate::rng::sample_distinct;
use crate::types::ItemId;

/// Logical dataset partitions produced by the splitter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitLabel {
    /// Training split.
    Train,
    /// Hyperparameter tuning split.
    Tune,
    /// Held-out test split.
    Test,
}

impl SplitLabel {
    /// Every label, in artifact order.
    pub const ALL: [SplitLabel; 3] = [SplitLabel::Train, SplitLabel::Tune, SplitLabel::Test];

    /// Lowercase name used in logs and manifests.
    pub fn as_str(self) -> &'static str {
        match self {
            SplitLabel::Train => "train",
            SplitLabel::Tune => "tune",
            SplitLabel::Test => "test",
        }
    }
}

impl fmt::Display for SplitLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-group hold-out fractions.
///
/// `test` is taken from the full set; `tune` is taken from what remains after
/// the test split. Train is the final remainder.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SplitRatios {
    /// Fraction of each group held out for test.
    pub test: f64,
    /// Fraction of each group's remainder held out for tuning.
    pub tune: f64,
}

impl Default for SplitRatios {
    fn default() -> Self {
        Self {
            test: crate::constants::defaults::TEST_FRACTION,
            tune: crate::constants::defaults::TUNE_FRACTION,
        }
    }
}

impl SplitRatios {
    /// Validate that both fractions lie strictly between 0 and 1.
    pub fn normalized(self) -> Result<Self, PairsError> {
        validate_fraction(self.test, "test")?;
        validate_fraction(self.tune, "tune")?;
        Ok(self)
    }
}

fn validate_fraction(fraction: f64, name: &str) -> Result<(), PairsError> {
    if !(fraction > 0.0 && fraction < 1.0) {
        return Err(PairsError::Configuration(format!(
            "{name} fraction must be within (0, 1), got {fraction}"
        )));
    }
    Ok(())
}

/// Number of items a group of `group_size` contributes at `fraction`.
///
/// Rounds half to even: a group of 5 at 0.1 contributes 0, a group of 15 contributes 2.
pub fn group_sample_size(fraction: f64, group_size: usize) -> usize {
    (fraction * group_size as f64).round_ties_even() as usize
}

/// Output of one stratified draw.
#[derive(Clone, Debug)]
pub struct StratifiedSplit<T> {
    /// Items drawn from every group.
    pub selected: Vec<T>,
    /// Items not drawn, in input order.
    pub remainder: Vec<T>,
}

/// Train/tune/test partition of one item set.
#[derive(Clone, Debug)]
pub struct SplitSet<T> {
    /// Training items.
    pub train: Vec<T>,
    /// Tuning items.
    pub tune: Vec<T>,
    /// Held-out test items.
    pub test: Vec<T>,
}

impl<T> SplitSet<T> {
    /// Items assigned to `label`.
    pub fn get(&self, label: SplitLabel) -> &[T] {
        match label {
            SplitLabel::Train => &self.train,
            SplitLabel::Tune => &self.tune,
            SplitLabel::Test => &self.test,
        }
    }

    /// Total items across all three splits.
    pub fn len(&self) -> usize {
        self.train.len() + self.tune.len() + self.test.len()
    }

    /// True when no split holds any item.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Draw `round(fraction × group_size)` items uniformly without replacement from every group.
///
/// Groups are visited in first-appearance order so a seeded RNG yields the same
/// draw for the same input. Both outputs keep the input order.
pub fn stratified_split<T, R>(
    items: &[T],
    fraction: f64,
    rng: &mut R,
) -> Result<StratifiedSplit<T>, PairsError>
where
    T: Grouped + Clone,
    R: Rng + ?Sized,
{
    validate_fraction(fraction, "split")?;

    let mut groups: IndexMap<&str, Vec<usize>> = IndexMap::new();
    for (idx, item) in items.iter().enumerate() {
        groups.entry(item.group_key()).or_default().push(idx);
    }

    let mut selected_mask = vec![false; items.len()];
    let mut empty_groups = 0usize;
    for (group, members) in &groups {
        let take = group_sample_size(fraction, members.len());
        if take == 0 {
            empty_groups += 1;
            continue;
        }
        let context = format!("stratified split of group '{group}'");
        for pick in sample_distinct(rng, members.len(), take, &context)? {
            selected_mask[members[pick]] = true;
        }
    }
    if empty_groups > 0 {
        debug!(
            groups = groups.len(),
            empty_groups, fraction, "some groups contributed no items to the split"
        );
    }

    let mut selected = Vec::new();
    let mut remainder = Vec::new();
    for (item, picked) in items.iter().zip(selected_mask) {
        if picked {
            selected.push(item.clone());
        } else {
            remainder.push(item.clone());
        }
    }
    Ok(StratifiedSplit {
        selected,
        remainder,
    })
}

/// Partition `items` into train/tune/test with two stratified draws.
///
/// The partition is verified before returning: the splits are pairwise
/// disjoint and their union is exactly `items`.
pub fn three_way_split<T, R>(
    items: &[T],
    ratios: SplitRatios,
    rng: &mut R,
) -> Result<SplitSet<T>, PairsError>
where
    T: Grouped + Clone,
    R: Rng + ?Sized,
{
    let ratios = ratios.normalized()?;
    let test = stratified_split(items, ratios.test, rng)?;
    let tune = stratified_split(&test.remainder, ratios.tune, rng)?;
    let set = SplitSet {
        train: tune.remainder,
        tune: tune.selected,
        test: test.selected,
    };
    verify_partition(items, &set)?;
    Ok(set)
}

/// Check that `set` is a partition of `items` (no row lost or duplicated).
pub fn verify_partition<T: Grouped>(items: &[T], set: &SplitSet<T>) -> Result<(), PairsError> {
    let mut owner: HashMap<ItemId, SplitLabel> = HashMap::new();
    for label in SplitLabel::ALL {
        for item in set.get(label) {
            if let Some(previous) = owner.insert(item.item_id(), label) {
                return Err(PairsError::DataIntegrity(format!(
                    "item {} appears in both the {previous} and {label} splits",
                    item.item_id()
                )));
            }
        }
    }
    if owner.len() != items.len() || set.len() != items.len() {
        return Err(PairsError::DataIntegrity(format!(
            "split sizes ({}) do not add up to the input ({})",
            set.len(),
            items.len()
        )));
    }
    if let Some(missing) = items.iter().find(|item| !owner.contains_key(&item.item_id())) {
        return Err(PairsError::DataIntegrity(format!(
            "item {} was lost during splitting",
            missing.item_id()
        )));
    }
    Ok(())
}
