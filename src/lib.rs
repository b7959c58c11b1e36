#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

/// Reusable CLI runners.
pub mod apps;
/// Pipeline configuration types.
pub mod config;
/// Centralized constants used across stages, tables, and artifacts.
pub mod constants;
/// Item and pair-row types.
pub mod data;
mod errors;
mod hash;
/// Aggregate metrics over splits and pair tables.
pub mod metrics;
/// Remote training pipeline descriptors.
pub mod orchestration;
/// Staged pipeline runner and named artifacts.
pub mod pipeline;
/// Cleaning, pruning, and integrity checks.
pub mod prepare;
/// Deterministic RNG and sampling helpers.
pub mod rng;
/// Negative-sampled pair generation.
pub mod sampler;
/// Stratified splitting.
pub mod splits;
/// Table readers and writers.
pub mod transport;
/// Shared type aliases.
pub mod types;
/// Text normalization helpers.
pub mod utils;

pub use config::PipelineConfig;
pub use data::{AnswerItem, CanonicalItem, DuplicateItem, Grouped, PairRow, TextItem};
pub use errors::PairsError;
pub use metrics::{GroupCoverage, PairTableStats};
pub use orchestration::{RemoteStep, TrainingPipeline, WorkspaceConfig};
pub use pipeline::{ArtifactName, Manifest, PipelineInputs, PreparedDataset, prepare_dataset, run};
pub use prepare::{PrunedCorpus, RawCorpus};
pub use rng::DeterministicRng;
pub use sampler::{CandidateCount, PairGenerator, generate_pairs};
pub use splits::{SplitLabel, SplitRatios, SplitSet, stratified_split, three_way_split};
pub use types::{CleanText, GroupKey, ItemId};
pub use utils::normalize_text;
