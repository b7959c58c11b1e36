use serde::{Deserialize, Serialize};

use crate::constants::defaults::{MIN_DUPES, MIN_TEXT_CHARS, TRAIN_CANDIDATES};
use crate::errors::PairsError;
use crate::rng::entropy_seed;
use crate::sampler::CandidateCount;
use crate::splits::{SplitLabel, SplitRatios};

/// Top-level preparation configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// RNG seed for splits and negative draws. `None` draws one from entropy at run time.
    pub seed: Option<u64>,
    /// Minimum duplicates a canonical group needs to survive pruning.
    pub min_dupes: usize,
    /// Minimum normalized text length in characters (0 disables the filter).
    pub min_text_chars: usize,
    /// Per-group hold-out fractions.
    pub split: SplitRatios,
    /// Candidates per training duplicate.
    pub train_candidates: CandidateCount,
    /// Candidates per tune/test duplicate.
    pub eval_candidates: CandidateCount,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            seed: None,
            min_dupes: MIN_DUPES,
            min_text_chars: MIN_TEXT_CHARS,
            split: SplitRatios::default(),
            train_candidates: CandidateCount::Limit(TRAIN_CANDIDATES),
            eval_candidates: CandidateCount::All,
        }
    }
}

impl PipelineConfig {
    /// Validate every knob before any data is touched.
    pub fn validate(&self) -> Result<(), PairsError> {
        if self.min_dupes == 0 {
            return Err(PairsError::Configuration(
                "min_dupes must be at least 1".to_string(),
            ));
        }
        self.split.normalized()?;
        self.train_candidates.validate()?;
        self.eval_candidates.validate()?;
        Ok(())
    }

    /// The configured seed, or a fresh entropy seed when none is set.
    pub fn resolve_seed(&self) -> u64 {
        self.seed.unwrap_or_else(entropy_seed)
    }

    /// Candidate count used for pairs of `label`.
    pub fn candidates_for(&self, label: SplitLabel) -> CandidateCount {
        match label {
            SplitLabel::Train => self.train_candidates,
            SplitLabel::Tune | SplitLabel::Test => self.eval_candidates,
        }
    }
}
