use std::collections::{HashMap, HashSet};

use dupe_pairs::splits::group_sample_size;
use dupe_pairs::{
    CandidateCount, DeterministicRng, ItemId, PairRow, SplitLabel, SplitRatios, TextItem,
    generate_pairs, normalize_text, stratified_split, three_way_split,
};

fn build_canonicals(groups: u64) -> Vec<TextItem> {
    (0..groups)
        .map(|idx| {
            TextItem::new(idx, format!("answer_{idx}"), "")
                .with_clean_text(format!("canonical question {idx}"))
        })
        .collect()
}

fn build_duplicates(groups: u64, sizes: impl Fn(u64) -> u64) -> Vec<TextItem> {
    let mut next_id = 10_000;
    let mut items = Vec::new();
    for group in 0..groups {
        for _ in 0..sizes(group) {
            items.push(
                TextItem::new(next_id, format!("answer_{group}"), "")
                    .with_clean_text(format!("duplicate {next_id}")),
            );
            next_id += 1;
        }
    }
    items
}

fn assert_one_match_per_duplicate(rows: &[PairRow], expected_duplicates: usize) {
    let mut matches: HashMap<ItemId, usize> = HashMap::new();
    for row in rows {
        let entry = matches.entry(row.duplicate_id).or_insert(0);
        if row.label == 1 {
            assert_eq!(row.duplicate_group_key, row.canonical_group_key);
            *entry += 1;
        } else {
            assert_ne!(row.duplicate_group_key, row.canonical_group_key);
        }
    }
    assert_eq!(matches.len(), expected_duplicates);
    assert!(matches.values().all(|count| *count == 1));
}

fn assert_block_ordering(rows: &[PairRow]) {
    for pair in rows.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        assert!(a.duplicate_id <= b.duplicate_id);
        if a.duplicate_id == b.duplicate_id {
            assert!(a.label >= b.label, "matches must lead each block");
            assert_eq!(a.candidate_index + 1, b.candidate_index);
        } else {
            assert_eq!(b.candidate_index, 0);
            assert_eq!(b.label, 1);
        }
    }
}

#[test]
fn every_pair_table_has_exactly_one_match_per_duplicate() {
    let canonicals = build_canonicals(25);
    let duplicates = build_duplicates(25, |group| 1 + group % 4);
    for (seed, candidates) in [
        (1, CandidateCount::Limit(1)),
        (2, CandidateCount::Limit(7)),
        (3, CandidateCount::Limit(24)),
        (4, CandidateCount::Limit(25)),
        (5, CandidateCount::All),
    ] {
        let mut rng = DeterministicRng::new(seed);
        let rows = generate_pairs(&duplicates, &canonicals, candidates, &mut rng).unwrap();
        assert_eq!(
            rows.len(),
            duplicates.len() * candidates.rows_per_duplicate(canonicals.len())
        );
        assert_one_match_per_duplicate(&rows, duplicates.len());
        assert_block_ordering(&rows);
    }
}

#[test]
fn sampled_negatives_are_distinct_and_exclude_the_match() {
    let canonicals = build_canonicals(40);
    let duplicates = build_duplicates(40, |_| 2);
    let mut rng = DeterministicRng::new(99);
    let rows = generate_pairs(&duplicates, &canonicals, CandidateCount::Limit(10), &mut rng).unwrap();

    let mut blocks: HashMap<ItemId, Vec<&PairRow>> = HashMap::new();
    for row in &rows {
        blocks.entry(row.duplicate_id).or_default().push(row);
    }
    for block in blocks.values() {
        assert_eq!(block.len(), 10);
        let ids: HashSet<ItemId> = block.iter().map(|row| row.canonical_id).collect();
        assert_eq!(ids.len(), 10);
    }
}

#[test]
fn negatives_cover_the_pool_across_duplicates() {
    let canonicals = build_canonicals(12);
    let duplicates = build_duplicates(12, |_| 10);
    let mut rng = DeterministicRng::new(5);
    let rows = generate_pairs(&duplicates, &canonicals, CandidateCount::Limit(3), &mut rng).unwrap();

    let negatives_for_group_0: HashSet<ItemId> = rows
        .iter()
        .filter(|row| row.duplicate_group_key == "answer_0" && row.label == 0)
        .map(|row| row.canonical_id)
        .collect();
    // 10 duplicates × 2 negatives over a pool of 11: nearly every item should appear.
    assert!(negatives_for_group_0.len() >= 6);
    assert!(!negatives_for_group_0.contains(&0));
}

#[test]
fn two_canonicals_two_duplicates_example() {
    let canonicals = vec![
        TextItem::new(1, "groupX", "").with_clean_text("a"),
        TextItem::new(2, "groupY", "").with_clean_text("b"),
    ];
    let duplicates = vec![
        TextItem::new(11, "groupX", "").with_clean_text("d1"),
        TextItem::new(12, "groupY", "").with_clean_text("d2"),
    ];
    let mut rng = DeterministicRng::new(0);
    let rows = generate_pairs(&duplicates, &canonicals, CandidateCount::Limit(2), &mut rng).unwrap();

    assert_eq!(rows.len(), 4);
    assert_eq!(rows[0].duplicate_id, 11);
    assert_eq!((rows[0].canonical_group_key.as_str(), rows[0].label), ("groupX", 1));
    assert_eq!((rows[1].canonical_group_key.as_str(), rows[1].label), ("groupY", 0));
    assert_eq!(rows[2].duplicate_id, 12);
    assert_eq!((rows[2].canonical_group_key.as_str(), rows[2].label), ("groupY", 1));
    assert_eq!((rows[3].canonical_group_key.as_str(), rows[3].label), ("groupX", 0));
}

#[test]
fn three_way_split_is_a_partition_for_many_seeds() {
    let duplicates = build_duplicates(30, |group| 1 + group % 9);
    for seed in 0..20 {
        let mut rng = DeterministicRng::new(seed);
        let set = three_way_split(&duplicates, SplitRatios::default(), &mut rng).unwrap();

        let mut seen: HashMap<ItemId, SplitLabel> = HashMap::new();
        for label in SplitLabel::ALL {
            for item in set.get(label) {
                assert!(seen.insert(item.id, label).is_none(), "item {} in two splits", item.id);
            }
        }
        let expected: HashSet<ItemId> = duplicates.iter().map(|item| item.id).collect();
        let actual: HashSet<ItemId> = seen.keys().copied().collect();
        assert_eq!(actual, expected);
        assert_eq!(set.len(), duplicates.len());
    }
}

#[test]
fn split_sizes_follow_per_group_rounding() {
    let duplicates = build_duplicates(9, |group| group + 1);
    let mut rng = DeterministicRng::new(12);
    let split = stratified_split(&duplicates, 0.3, &mut rng).unwrap();
    for group in 0..9u64 {
        let key = format!("answer_{group}");
        let taken = split.selected.iter().filter(|item| item.group_key == key).count();
        assert_eq!(taken, group_sample_size(0.3, (group + 1) as usize));
    }
}

#[test]
fn group_of_five_at_tenth_rounds_half_down_to_even() {
    let duplicates = build_duplicates(1, |_| 5);
    assert_eq!(group_sample_size(0.1, 5), 0);
    let mut rng = DeterministicRng::new(3);
    let split = stratified_split(&duplicates, 0.1, &mut rng).unwrap();
    assert!(split.selected.is_empty());
    assert_eq!(split.remainder.len(), 5);

    // 1.5 rounds up to the even neighbour.
    let duplicates = build_duplicates(1, |_| 15);
    let split = stratified_split(&duplicates, 0.1, &mut rng).unwrap();
    assert_eq!(split.selected.len(), 2);
}

#[test]
fn normalizer_is_idempotent_on_realistic_posts() {
    let posts = [
        "<p>I'm getting <code>NullPointerException</code> when calling <strong>foo()</strong>.</p>\n\n<pre><code>Foo f = null;\nf.bar();\n</code></pre>\n\n<p>See <a href=\"https://stackoverflow.com/q/1\">this</a>.</p>",
        "<p>What does <code>&lt;T&gt;</code> mean in   Java &amp; C#?</p>",
        "<h1>Title</h1><ul><li>One</li><li>Two</li></ul>",
        "plain text already normalized",
    ];
    for post in posts {
        let once = normalize_text(post);
        assert!(!once.is_empty());
        assert_eq!(normalize_text(&once), once);
        assert_eq!(once, once.to_lowercase());
        assert!(!once.contains("  "));
    }
}
