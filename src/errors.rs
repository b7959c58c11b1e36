use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Error type for preparation, sampling, and persistence failures.
#[derive(Debug, Error)]
pub enum PairsError {
    /// Tables are inconsistent: repeated ids, orphaned duplicates, ambiguous groups.
    #[error("data integrity violation: {0}")]
    DataIntegrity(String),
    /// More distinct items were requested than the pool holds.
    #[error("cannot draw {requested} distinct items from {available} for {context}")]
    SamplingImpossible {
        /// Items asked for.
        requested: usize,
        /// Items in the pool.
        available: usize,
        /// What the draw was for.
        context: String,
    },
    /// Invalid settings, or settings that leave nothing to work with.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// A table row held a value that could not be parsed.
    #[error("failed to parse row {row}: {details}")]
    Parse {
        /// 1-based line number, header included.
        row: usize,
        /// What was wrong with the row.
        details: String,
    },
    /// Reading or writing a delimited table failed.
    #[error("delimited table '{}' failed: {source}", path.display())]
    Csv {
        /// Table being read or written.
        path: PathBuf,
        /// Underlying reader or writer error.
        #[source]
        source: csv::Error,
    },
    /// Filesystem failure.
    #[error(transparent)]
    Io(#[from] io::Error),
    /// Manifest, config, or descriptor JSON failure.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
