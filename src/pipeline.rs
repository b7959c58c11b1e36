use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::config::PipelineConfig;
use crate::constants::artifacts::{
    CANONICALS_FILE, DUPES_TEST_FILE, DUPES_TRAIN_FILE, DUPES_TUNE_FILE, MANIFEST_FILE,
    PAIRS_TEST_FILE, PAIRS_TRAIN_FILE, PAIRS_TUNE_FILE,
};
use crate::constants::stages::{PAIRS_TEST, PAIRS_TRAIN, PAIRS_TUNE, SPLIT};
use crate::data::{CanonicalItem, DuplicateItem, PairRow};
use crate::errors::PairsError;
use crate::hash::derive_stage_seed;
use crate::metrics::{GroupCoverage, PairTableStats};
use crate::prepare::{RawCorpus, clean_answers, clean_items, prune_to_closure, verify_unique_ids};
use crate::rng::DeterministicRng;
use crate::sampler::{PairGenerator, verify_pair_table};
use crate::splits::{SplitLabel, SplitSet, three_way_split};
use crate::transport::tsv;
use crate::types::StageLabel;

/// Named tables produced by a pipeline run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactName {
    /// Cleaned, pruned canonical questions.
    Canonicals,
    /// Training duplicates.
    DuplicatesTrain,
    /// Tuning duplicates.
    DuplicatesTune,
    /// Test duplicates.
    DuplicatesTest,
    /// Training pair table.
    PairsTrain,
    /// Tuning pair table.
    PairsTune,
    /// Test pair table.
    PairsTest,
}

impl ArtifactName {
    /// Every artifact, in write order.
    pub const ALL: [ArtifactName; 7] = [
        ArtifactName::Canonicals,
        ArtifactName::DuplicatesTrain,
        ArtifactName::DuplicatesTune,
        ArtifactName::DuplicatesTest,
        ArtifactName::PairsTrain,
        ArtifactName::PairsTune,
        ArtifactName::PairsTest,
    ];

    /// File name the artifact is persisted under.
    pub fn file_name(self) -> &'static str {
        match self {
            ArtifactName::Canonicals => CANONICALS_FILE,
            ArtifactName::DuplicatesTrain => DUPES_TRAIN_FILE,
            ArtifactName::DuplicatesTune => DUPES_TUNE_FILE,
            ArtifactName::DuplicatesTest => DUPES_TEST_FILE,
            ArtifactName::PairsTrain => PAIRS_TRAIN_FILE,
            ArtifactName::PairsTune => PAIRS_TUNE_FILE,
            ArtifactName::PairsTest => PAIRS_TEST_FILE,
        }
    }

    /// Snake-case name used in logs and manifests.
    pub fn as_str(self) -> &'static str {
        match self {
            ArtifactName::Canonicals => "canonicals",
            ArtifactName::DuplicatesTrain => "duplicates_train",
            ArtifactName::DuplicatesTune => "duplicates_tune",
            ArtifactName::DuplicatesTest => "duplicates_test",
            ArtifactName::PairsTrain => "pairs_train",
            ArtifactName::PairsTune => "pairs_tune",
            ArtifactName::PairsTest => "pairs_test",
        }
    }

    /// Duplicate table of a split.
    pub fn duplicates(label: SplitLabel) -> Self {
        match label {
            SplitLabel::Train => ArtifactName::DuplicatesTrain,
            SplitLabel::Tune => ArtifactName::DuplicatesTune,
            SplitLabel::Test => ArtifactName::DuplicatesTest,
        }
    }

    /// Pair table of a split.
    pub fn pairs(label: SplitLabel) -> Self {
        match label {
            SplitLabel::Train => ArtifactName::PairsTrain,
            SplitLabel::Tune => ArtifactName::PairsTune,
            SplitLabel::Test => ArtifactName::PairsTest,
        }
    }
}

impl fmt::Display for ArtifactName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn pair_stage(label: SplitLabel) -> StageLabel {
    match label {
        SplitLabel::Train => PAIRS_TRAIN,
        SplitLabel::Tune => PAIRS_TUNE,
        SplitLabel::Test => PAIRS_TEST,
    }
}

/// Locations of the three source tables.
#[derive(Clone, Debug)]
pub struct PipelineInputs {
    /// Canonical questions (`Id, AnswerId, Text, CreationDate`).
    pub questions: PathBuf,
    /// Duplicate questions (`Id, AnswerId, Text, CreationDate`).
    pub duplicates: PathBuf,
    /// Answers (`Id, Text`), keyed by answer group.
    pub answers: PathBuf,
}

impl PipelineInputs {
    /// Load stage: read all three tables.
    pub fn load(&self) -> Result<RawCorpus, PairsError> {
        let corpus = RawCorpus {
            canonicals: tsv::read_raw_items(&self.questions)?,
            duplicates: tsv::read_raw_items(&self.duplicates)?,
            answers: tsv::read_answers(&self.answers)?,
        };
        info!(
            canonicals = corpus.canonicals.len(),
            duplicates = corpus.duplicates.len(),
            answers = corpus.answers.len(),
            "loaded source tables"
        );
        Ok(corpus)
    }
}

/// Every artifact of a run, held in memory.
#[derive(Clone, Debug)]
pub struct PreparedDataset {
    /// Seed the run actually used (configured or drawn).
    pub seed: u64,
    /// Settings the run used.
    pub config: PipelineConfig,
    /// Canonicals that survived pruning.
    pub canonicals: Vec<CanonicalItem>,
    /// Duplicates per split.
    pub duplicates: SplitSet<DuplicateItem>,
    /// Pair table per split.
    pub pairs: SplitSet<PairRow>,
}

/// One persisted artifact in the manifest.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Which artifact.
    pub name: ArtifactName,
    /// File name relative to the output directory.
    pub file: String,
    /// Data rows, header excluded.
    pub rows: usize,
}

/// Description of a run written next to its artifacts.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    /// Seed to pass back in to replay the run.
    pub seed: u64,
    /// Settings the run used.
    pub config: PipelineConfig,
    /// Every artifact written, in write order.
    pub artifacts: Vec<ManifestEntry>,
    /// Shape of each split's pair table.
    pub pair_stats: BTreeMap<SplitLabel, PairTableStats>,
    /// Group representation across splits.
    pub coverage: GroupCoverage,
}

impl Manifest {
    /// Read a manifest written by [`PreparedDataset::write_to`].
    pub fn read(path: &Path) -> Result<Self, PairsError> {
        let bytes = fs::read(path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Entry for `name`, if the run produced it.
    pub fn entry(&self, name: ArtifactName) -> Option<&ManifestEntry> {
        self.artifacts.iter().find(|entry| entry.name == name)
    }
}

impl PreparedDataset {
    /// Rows held by `artifact`.
    pub fn row_count(&self, artifact: ArtifactName) -> usize {
        match artifact {
            ArtifactName::Canonicals => self.canonicals.len(),
            ArtifactName::DuplicatesTrain => self.duplicates.train.len(),
            ArtifactName::DuplicatesTune => self.duplicates.tune.len(),
            ArtifactName::DuplicatesTest => self.duplicates.test.len(),
            ArtifactName::PairsTrain => self.pairs.train.len(),
            ArtifactName::PairsTune => self.pairs.tune.len(),
            ArtifactName::PairsTest => self.pairs.test.len(),
        }
    }

    /// Group representation across the duplicate splits.
    pub fn coverage(&self) -> GroupCoverage {
        GroupCoverage::from_splits(&self.duplicates)
    }

    /// Describe this run without touching the filesystem.
    pub fn manifest(&self) -> Manifest {
        Manifest {
            seed: self.seed,
            config: self.config.clone(),
            artifacts: ArtifactName::ALL
                .iter()
                .map(|name| ManifestEntry {
                    name: *name,
                    file: name.file_name().to_string(),
                    rows: self.row_count(*name),
                })
                .collect(),
            pair_stats: SplitLabel::ALL
                .iter()
                .map(|label| (*label, PairTableStats::from_rows(self.pairs.get(*label))))
                .collect(),
            coverage: self.coverage(),
        }
    }

    /// Persist every artifact plus `manifest.json` under `dir`.
    pub fn write_to(&self, dir: &Path) -> Result<Manifest, PairsError> {
        fs::create_dir_all(dir)?;
        tsv::write_clean_items(&dir.join(ArtifactName::Canonicals.file_name()), &self.canonicals)?;
        for label in SplitLabel::ALL {
            let duplicates = ArtifactName::duplicates(label);
            tsv::write_clean_items(&dir.join(duplicates.file_name()), self.duplicates.get(label))?;
            let pairs = ArtifactName::pairs(label);
            tsv::write_pairs(&dir.join(pairs.file_name()), self.pairs.get(label))?;
        }
        let manifest = self.manifest();
        fs::write(dir.join(MANIFEST_FILE), serde_json::to_vec_pretty(&manifest)?)?;
        info!(dir = %dir.display(), seed = self.seed, "wrote artifacts");
        Ok(manifest)
    }
}

/// Load the source tables and run every stage.
pub fn run(inputs: &PipelineInputs, config: &PipelineConfig) -> Result<PreparedDataset, PairsError> {
    config.validate()?;
    prepare_dataset(inputs.load()?, config)
}

/// Run clean → prune → split → pair over tables already in memory.
///
/// Integrity checks run right after the stage that could break them.
pub fn prepare_dataset(
    raw: RawCorpus,
    config: &PipelineConfig,
) -> Result<PreparedDataset, PairsError> {
    config.validate()?;
    let seed = config.resolve_seed();
    info!(seed, fixed = config.seed.is_some(), "starting pair preparation");

    verify_unique_ids(&raw.canonicals, "canonicals")?;
    verify_unique_ids(&raw.duplicates, "duplicates")?;

    let (canonicals, _) = clean_items(raw.canonicals, config.min_text_chars, "canonicals");
    let (duplicates, _) = clean_items(raw.duplicates, config.min_text_chars, "duplicates");
    let answers = clean_answers(raw.answers);

    let corpus = prune_to_closure(canonicals, duplicates, &answers, config.min_dupes)?;
    if corpus.canonicals.is_empty() {
        return Err(PairsError::Configuration(format!(
            "no canonical group has at least {} duplicates",
            config.min_dupes
        )));
    }

    let mut split_rng = DeterministicRng::new(derive_stage_seed(seed, SPLIT));
    let duplicates = three_way_split(&corpus.duplicates, config.split, &mut split_rng)?;
    let coverage = GroupCoverage::from_splits(&duplicates);
    info!(
        train = duplicates.train.len(),
        tune = duplicates.tune.len(),
        test = duplicates.test.len(),
        groups = coverage.groups,
        groups_missing_a_split = coverage.groups_missing_a_split(),
        "split duplicates"
    );

    let mut tables = Vec::with_capacity(SplitLabel::ALL.len());
    for label in SplitLabel::ALL {
        let generator = PairGenerator::new(&corpus.canonicals, config.candidates_for(label))?;
        let mut rng = DeterministicRng::new(derive_stage_seed(seed, pair_stage(label)));
        let rows = generator.generate(duplicates.get(label), &mut rng)?;
        verify_pair_table(&rows, duplicates.get(label))?;
        info!(
            split = %label,
            rows = rows.len(),
            per_duplicate = generator.rows_per_duplicate(),
            "generated pair table"
        );
        tables.push(rows);
    }
    let mut tables = tables.into_iter();
    let pairs = SplitSet {
        train: tables.next().unwrap_or_default(),
        tune: tables.next().unwrap_or_default(),
        test: tables.next().unwrap_or_default(),
    };

    Ok(PreparedDataset {
        seed,
        config: config.clone(),
        canonicals: corpus.canonicals,
        duplicates,
        pairs,
    })
}
