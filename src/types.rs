/// Numeric row identifier shared by canonical, duplicate, and answer tables.
/// Example: `11227809`
pub type ItemId = u64;
/// Key linking a duplicate to its canonical item (the accepted answer id).
/// Example: `11227877`
pub type GroupKey = String;
/// Normalized text produced by the text normalizer.
/// Example: `why is processing a sorted array faster than an unsorted array?`
pub type CleanText = String;
/// Label used to derive per-stage seeds.
/// Examples: `split`, `pairs_train`
pub type StageLabel = &'static str;
/// Name of a step in an orchestration descriptor.
/// Examples: `tune`, `register`
pub type StepName = String;
