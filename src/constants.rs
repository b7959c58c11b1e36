/// Constants used by stable hashing and stage-seed derivation.
pub mod hash {
    /// FNV-1a 64-bit offset basis.
    pub const FNV1A64_OFFSET: u64 = 0xcbf29ce484222325;
    /// FNV-1a 64-bit prime.
    pub const FNV1A64_PRIME: u64 = 0x100000001b3;
}

/// Default knobs for data preparation and pair generation.
pub mod defaults {
    /// Minimum duplicates a canonical group needs to survive pruning.
    pub const MIN_DUPES: usize = 12;
    /// Minimum normalized text length (0 disables the filter).
    pub const MIN_TEXT_CHARS: usize = 0;
    /// Candidates generated per training duplicate (one match + negatives).
    pub const TRAIN_CANDIDATES: usize = 20;
    /// Fraction of each group's duplicates held out for test.
    pub const TEST_FRACTION: f64 = 0.21;
    /// Fraction of each group's remaining duplicates held out for tuning.
    pub const TUNE_FRACTION: f64 = 0.21;
}

/// Labels mixed into the run seed so each stage draws from its own stream.
pub mod stages {
    use crate::types::StageLabel;

    /// Stratified split of duplicates into train/tune/test.
    pub const SPLIT: StageLabel = "split";
    /// Negative draws for the training pair table.
    pub const PAIRS_TRAIN: StageLabel = "pairs_train";
    /// Negative draws for the tuning pair table.
    pub const PAIRS_TUNE: StageLabel = "pairs_tune";
    /// Negative draws for the test pair table.
    pub const PAIRS_TEST: StageLabel = "pairs_test";
}

/// Column names and formats of the delimited tables.
pub mod tables {
    /// Field delimiter of every table read or written.
    pub const DELIMITER: u8 = b'\t';
    /// Output format for creation dates (fractional seconds only when non-zero).
    pub const DATE_WRITE_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";
    /// Accepted creation date-time formats, tried in order.
    pub const DATETIME_READ_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];
    /// Accepted date-only format (midnight is assumed).
    pub const DATE_READ_FORMAT: &str = "%Y-%m-%d";
    /// Header of every pair table, in order.
    pub const PAIR_COLUMNS: [&str; 8] = [
        "DuplicateId",
        "DuplicateGroupKey",
        "DuplicateText",
        "CanonicalId",
        "CanonicalText",
        "CanonicalGroupKey",
        "Label",
        "CandidateIndex",
    ];
}

/// File names of persisted artifacts.
pub mod artifacts {
    /// Cleaned canonical questions.
    pub const CANONICALS_FILE: &str = "canonicals.tsv";
    /// Training duplicates.
    pub const DUPES_TRAIN_FILE: &str = "dupes_train.tsv";
    /// Tuning duplicates.
    pub const DUPES_TUNE_FILE: &str = "dupes_tune.tsv";
    /// Test duplicates.
    pub const DUPES_TEST_FILE: &str = "dupes_test.tsv";
    /// Training pair table.
    pub const PAIRS_TRAIN_FILE: &str = "pairs_train.tsv";
    /// Tuning pair table.
    pub const PAIRS_TUNE_FILE: &str = "pairs_tune.tsv";
    /// Test pair table.
    pub const PAIRS_TEST_FILE: &str = "pairs_test.tsv";
    /// Run manifest written next to the tables.
    pub const MANIFEST_FILE: &str = "manifest.json";
    /// Orchestration descriptor emitted on request.
    pub const PIPELINE_FILE: &str = "pipeline.json";
}

/// Defaults of the remote training pipeline descriptor.
pub mod orchestration {
    /// Hyperparameter search step.
    pub const TUNE_STEP: &str = "tune";
    /// Step extracting the best hyperparameters of the search.
    pub const BEST_STEP: &str = "extract_best";
    /// Final training run with the best hyperparameters.
    pub const RETRAIN_STEP: &str = "retrain";
    /// Model registration step.
    pub const REGISTER_STEP: &str = "register";
    /// Output naming the best hyperparameters found by the tuning step.
    pub const BEST_PARAMS_OUTPUT: &str = "best_hyperparameters";
    /// Output naming the tuning run identifier.
    pub const TUNE_RUN_OUTPUT: &str = "tune_run";
    /// Output naming the retrained model directory.
    pub const MODEL_OUTPUT: &str = "model";
    /// Default compute target for the training steps.
    pub const DEFAULT_COMPUTE_TARGET: &str = "gpu-cluster";
    /// Default script run by the tuning and retraining steps.
    pub const DEFAULT_TRAIN_SCRIPT: &str = "scripts/train.py";
}
