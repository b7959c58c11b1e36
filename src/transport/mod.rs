/// Tab-separated table readers and writers.
pub mod tsv;
