use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};
use tracing::{info, warn};

use crate::data::{AnswerItem, CanonicalItem, DuplicateItem, TextItem};
use crate::errors::PairsError;
use crate::utils::normalize_text;

/// The three source tables as loaded.
#[derive(Clone, Debug, Default)]
pub struct RawCorpus {
    /// Canonical questions.
    pub canonicals: Vec<CanonicalItem>,
    /// Duplicate questions.
    pub duplicates: Vec<DuplicateItem>,
    /// Answers keyed by group.
    pub answers: Vec<AnswerItem>,
}

/// Row counts from one cleaning pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CleanReport {
    /// Rows that survived.
    pub kept: usize,
    /// Rows whose normalized text was empty.
    pub dropped_empty: usize,
    /// Rows whose normalized text was shorter than the configured minimum.
    pub dropped_short: usize,
}

/// Canonicals and duplicates after referential-closure pruning.
#[derive(Clone, Debug, Default)]
pub struct PrunedCorpus {
    /// One canonical per surviving group.
    pub canonicals: Vec<CanonicalItem>,
    /// Duplicates of surviving groups, input order.
    pub duplicates: Vec<DuplicateItem>,
}

/// Normalize every item's text and drop rows with nothing usable left.
///
/// `min_text_chars` counts characters of the normalized text; 0 keeps any non-empty text.
pub fn clean_items(
    items: Vec<TextItem>,
    min_text_chars: usize,
    table: &str,
) -> (Vec<TextItem>, CleanReport) {
    let mut report = CleanReport::default();
    let mut kept = Vec::with_capacity(items.len());
    for mut item in items {
        item.clean_text = normalize_text(&item.raw_text);
        if item.clean_text.is_empty() {
            report.dropped_empty += 1;
        } else if item.clean_text.chars().count() < min_text_chars {
            report.dropped_short += 1;
        } else {
            kept.push(item);
        }
    }
    report.kept = kept.len();
    if report.dropped_empty + report.dropped_short > 0 {
        warn!(
            table,
            dropped_empty = report.dropped_empty,
            dropped_short = report.dropped_short,
            "dropped rows without usable text"
        );
    }
    info!(table, kept = report.kept, "cleaned table");
    (kept, report)
}

/// Normalize answer text, dropping answers with nothing meaningful left.
pub fn clean_answers(answers: Vec<AnswerItem>) -> Vec<AnswerItem> {
    let total = answers.len();
    let kept: Vec<AnswerItem> = answers
        .into_iter()
        .filter_map(|mut answer| {
            answer.clean_text = normalize_text(&answer.raw_text);
            (!answer.clean_text.is_empty()).then_some(answer)
        })
        .collect();
    if kept.len() < total {
        warn!(dropped = total - kept.len(), "dropped answers without usable text");
    }
    kept
}

/// Fail when any id occurs twice in `items`.
pub fn verify_unique_ids(items: &[TextItem], table: &str) -> Result<(), PairsError> {
    let mut seen = HashSet::with_capacity(items.len());
    for item in items {
        if !seen.insert(item.id) {
            return Err(PairsError::DataIntegrity(format!(
                "{table}: id {} appears more than once",
                item.id
            )));
        }
    }
    Ok(())
}

/// Prune the tables until they are referentially closed.
///
/// Canonicals without an answer go first. Groups with fewer than `min_dupes`
/// duplicates referencing a surviving canonical go next, and finally every
/// duplicate whose canonical did not survive. The result is verified before
/// it is returned.
pub fn prune_to_closure(
    canonicals: Vec<CanonicalItem>,
    duplicates: Vec<DuplicateItem>,
    answers: &[AnswerItem],
    min_dupes: usize,
) -> Result<PrunedCorpus, PairsError> {
    verify_unique_ids(&canonicals, "canonicals")?;
    verify_unique_ids(&duplicates, "duplicates")?;

    let answer_keys: HashSet<&str> = answers.iter().map(|answer| answer.id.as_str()).collect();
    let canonical_total = canonicals.len();
    let answered: Vec<CanonicalItem> = canonicals
        .into_iter()
        .filter(|canonical| answer_keys.contains(canonical.group_key.as_str()))
        .collect();

    let mut dupe_counts: IndexMap<&str, usize> = answered
        .iter()
        .map(|canonical| (canonical.group_key.as_str(), 0))
        .collect();
    for duplicate in &duplicates {
        if let Some(count) = dupe_counts.get_mut(duplicate.group_key.as_str()) {
            *count += 1;
        }
    }
    let kept_groups: HashSet<String> = dupe_counts
        .iter()
        .filter(|(_, count)| **count >= min_dupes)
        .map(|(group, _)| (*group).to_string())
        .collect();

    let answered_total = answered.len();
    let canonicals: Vec<CanonicalItem> = answered
        .into_iter()
        .filter(|canonical| kept_groups.contains(&canonical.group_key))
        .collect();
    let duplicate_total = duplicates.len();
    let duplicates: Vec<DuplicateItem> = duplicates
        .into_iter()
        .filter(|duplicate| kept_groups.contains(&duplicate.group_key))
        .collect();

    info!(
        canonicals = canonicals.len(),
        unanswered = canonical_total - answered_total,
        under_min_dupes = answered_total - canonicals.len(),
        duplicates = duplicates.len(),
        orphaned_duplicates = duplicate_total - duplicates.len(),
        min_dupes,
        "pruned corpus to referential closure"
    );

    let corpus = PrunedCorpus {
        canonicals,
        duplicates,
    };
    verify_closure(&corpus, min_dupes)?;
    Ok(corpus)
}

/// Check the referential-closure invariant of a pruned corpus.
///
/// Ids are unique per table, each group has exactly one canonical, every
/// duplicate references a canonical, and every canonical has at least
/// `min_dupes` duplicates.
pub fn verify_closure(corpus: &PrunedCorpus, min_dupes: usize) -> Result<(), PairsError> {
    verify_unique_ids(&corpus.canonicals, "canonicals")?;
    verify_unique_ids(&corpus.duplicates, "duplicates")?;

    let mut dupe_counts: HashMap<&str, usize> = HashMap::with_capacity(corpus.canonicals.len());
    for canonical in &corpus.canonicals {
        if dupe_counts.insert(canonical.group_key.as_str(), 0).is_some() {
            return Err(PairsError::DataIntegrity(format!(
                "group '{}' has more than one canonical item",
                canonical.group_key
            )));
        }
    }
    for duplicate in &corpus.duplicates {
        match dupe_counts.get_mut(duplicate.group_key.as_str()) {
            Some(count) => *count += 1,
            None => {
                return Err(PairsError::DataIntegrity(format!(
                    "duplicate {} references group '{}' with no canonical item",
                    duplicate.id, duplicate.group_key
                )));
            }
        }
    }
    for canonical in &corpus.canonicals {
        let count = dupe_counts[canonical.group_key.as_str()];
        if count < min_dupes {
            return Err(PairsError::DataIntegrity(format!(
                "canonical {} (group '{}') has {count} duplicates, fewer than {min_dupes}",
                canonical.id, canonical.group_key
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: u64, group: &str, text: &str) -> TextItem {
        TextItem::new(id, group, text).with_clean_text(text)
    }

    fn answers(keys: &[&str]) -> Vec<AnswerItem> {
        keys.iter().map(|key| AnswerItem::new(*key, "answer")).collect()
    }

    #[test]
    fn clean_items_drops_empty_and_short_rows() {
        let items = vec![
            TextItem::new(1, "a", "<p>How do I parse JSON?</p>"),
            TextItem::new(2, "a", "<pre>only code</pre>"),
            TextItem::new(3, "a", "<b>hi</b>"),
        ];
        let (kept, report) = clean_items(items, 5, "duplicates");
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].clean_text, "how do i parse json?");
        assert_eq!(
            report,
            CleanReport {
                kept: 1,
                dropped_empty: 1,
                dropped_short: 1,
            }
        );
    }

    #[test]
    fn clean_answers_drops_blank_answers() {
        let kept = clean_answers(vec![AnswerItem::new("1", "Use a map."), AnswerItem::new("2", "<pre>x</pre>")]);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].clean_text, "use a map.");
    }

    #[test]
    fn prune_keeps_only_closed_groups() {
        let canonicals = vec![
            item(1, "a", "alpha"),
            item(2, "b", "beta"),
            item(3, "c", "gamma"),
        ];
        let duplicates = vec![
            item(10, "a", "d1"),
            item(11, "a", "d2"),
            item(12, "b", "d3"),
            item(13, "b", "d4"),
            item(14, "c", "d5"),
            item(15, "zzz", "orphan"),
        ];
        // "b" has no answer, "c" has too few duplicates.
        let corpus = prune_to_closure(canonicals, duplicates, &answers(&["a", "c"]), 2).unwrap();

        let canonical_ids: Vec<u64> = corpus.canonicals.iter().map(|c| c.id).collect();
        let duplicate_ids: Vec<u64> = corpus.duplicates.iter().map(|d| d.id).collect();
        assert_eq!(canonical_ids, vec![1]);
        assert_eq!(duplicate_ids, vec![10, 11]);
    }

    #[test]
    fn prune_rejects_repeated_ids() {
        let canonicals = vec![item(1, "a", "alpha"), item(1, "b", "beta")];
        let err = prune_to_closure(canonicals, Vec::new(), &answers(&["a", "b"]), 1).unwrap_err();
        assert!(matches!(err, PairsError::DataIntegrity(ref msg) if msg.contains("canonicals")));
    }

    #[test]
    fn prune_rejects_groups_with_two_canonicals() {
        let canonicals = vec![item(1, "a", "alpha"), item(2, "a", "alpha again")];
        let duplicates = vec![item(10, "a", "d1")];
        let err = prune_to_closure(canonicals, duplicates, &answers(&["a"]), 1).unwrap_err();
        assert!(matches!(err, PairsError::DataIntegrity(ref msg) if msg.contains("more than one canonical")));
    }

    #[test]
    fn verify_closure_reports_each_violation() {
        let orphan = PrunedCorpus {
            canonicals: vec![item(1, "a", "alpha")],
            duplicates: vec![item(10, "a", "d1"), item(11, "x", "d2")],
        };
        assert!(matches!(
            verify_closure(&orphan, 1),
            Err(PairsError::DataIntegrity(ref msg)) if msg.contains("'x'")
        ));

        let thin = PrunedCorpus {
            canonicals: vec![item(1, "a", "alpha")],
            duplicates: vec![item(10, "a", "d1")],
        };
        assert!(matches!(
            verify_closure(&thin, 2),
            Err(PairsError::DataIntegrity(ref msg)) if msg.contains("fewer than 2")
        ));
        assert!(verify_closure(&thin, 1).is_ok());
    }
}
