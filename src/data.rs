use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

pub use crate::types::{CleanText, GroupKey, ItemId};

/// Access to the id and group key shared by every grouped row.
pub trait Grouped {
    /// Unique row id within its table.
    fn item_id(&self) -> ItemId;
    /// Answer group the row belongs to.
    fn group_key(&self) -> &str;
}

/// A question-like row: either a canonical item or a duplicate of one.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TextItem {
    /// Unique row identifier.
    pub id: ItemId,
    /// Answer group linking duplicates to their canonical item.
    pub group_key: GroupKey,
    /// Text as loaded from the source table.
    pub raw_text: String,
    /// Normalized text; empty until the item has been cleaned.
    pub clean_text: CleanText,
    /// Creation time when the source provided one.
    pub creation_date: Option<NaiveDateTime>,
}

impl TextItem {
    /// Build an item whose clean text is not computed yet.
    pub fn new(id: ItemId, group_key: impl Into<GroupKey>, raw_text: impl Into<String>) -> Self {
        Self {
            id,
            group_key: group_key.into(),
            raw_text: raw_text.into(),
            clean_text: CleanText::new(),
            creation_date: None,
        }
    }

    /// Set the creation date.
    pub fn with_creation_date(mut self, creation_date: NaiveDateTime) -> Self {
        self.creation_date = Some(creation_date);
        self
    }

    /// Set already-normalized text (used when reading cleaned tables back).
    pub fn with_clean_text(mut self, clean_text: impl Into<CleanText>) -> Self {
        self.clean_text = clean_text.into();
        self
    }
}

impl Grouped for TextItem {
    fn item_id(&self) -> ItemId {
        self.id
    }

    fn group_key(&self) -> &str {
        &self.group_key
    }
}

/// The authoritative record that duplicates point at.
pub type CanonicalItem = TextItem;
/// A record asserted to share an answer group with some canonical item.
pub type DuplicateItem = TextItem;

/// Row of the answers table; its id is an answer group key.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnswerItem {
    /// Answer group this answer belongs to.
    pub id: GroupKey,
    /// Text as loaded.
    pub raw_text: String,
    /// Normalized text; empty until cleaned.
    pub clean_text: CleanText,
}

impl AnswerItem {
    /// Uncleaned answer for group `id`.
    pub fn new(id: impl Into<GroupKey>, raw_text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            raw_text: raw_text.into(),
            clean_text: CleanText::new(),
        }
    }
}

/// One labeled (duplicate, candidate canonical) row of a pair table.
///
/// Field names serialize to the pair-table header (`DuplicateId`, ..., `CandidateIndex`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PairRow {
    /// Id of the duplicate side.
    pub duplicate_id: ItemId,
    /// Group the duplicate belongs to.
    pub duplicate_group_key: GroupKey,
    /// Normalized duplicate text.
    pub duplicate_text: CleanText,
    /// Id of the candidate canonical.
    pub canonical_id: ItemId,
    /// Normalized candidate text.
    pub canonical_text: CleanText,
    /// Group the candidate canonical belongs to.
    pub canonical_group_key: GroupKey,
    /// `1` when both sides share a group key, else `0`.
    pub label: u8,
    /// Position of this candidate within its duplicate's block (match first).
    pub candidate_index: usize,
}

impl PairRow {
    /// Pair `duplicate` with `canonical`, deriving the label from their group keys.
    pub fn new(duplicate: &DuplicateItem, canonical: &CanonicalItem, candidate_index: usize) -> Self {
        Self {
            duplicate_id: duplicate.id,
            duplicate_group_key: duplicate.group_key.clone(),
            duplicate_text: duplicate.clean_text.clone(),
            canonical_id: canonical.id,
            canonical_text: canonical.clean_text.clone(),
            canonical_group_key: canonical.group_key.clone(),
            label: u8::from(duplicate.group_key == canonical.group_key),
            candidate_index,
        }
    }

    /// True for the row pairing a duplicate with its own canonical.
    pub fn is_match(&self) -> bool {
        self.label == 1
    }
}
