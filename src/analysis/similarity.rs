//! Case similarity search
//!
//! Compares the current log's signal set (error codes plus matched external
//! signal ids) against every stored case card using Jaccard similarity.
//! A linear scan is fine at the cardinality of one snapshot's debugging
//! history; no index is needed.

use std::collections::BTreeSet;

use crate::store::{Store, StoreResult};

/// A past case scored against the current signal set
#[derive(Debug, Clone)]
pub struct SimilarCase {
    pub case_id: i64,
    pub title: Option<String>,
    pub score: f64,
    pub matching_signals: Vec<String>,
    pub root_cause: Option<String>,
    pub fix_summary: Option<String>,
    pub verify_commands: Vec<String>,
}

/// Jaccard similarity |A ∩ B| / |A ∪ B|, defined as 0 when both sets are empty
pub fn jaccard(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / union as f64
}

/// Retrieve cases whose stored signal sets overlap the target set.
///
/// Cases scoring strictly above the threshold are retained, sorted
/// descending by score; ties break toward the most recently imported case.
pub fn find_similar_cases(
    store: &Store,
    target: &BTreeSet<String>,
    limit: usize,
    threshold: f64,
) -> StoreResult<Vec<SimilarCase>> {
    let mut similar: Vec<SimilarCase> = Vec::new();

    for card in store.list_case_cards()? {
        let card_signals: BTreeSet<String> =
            card.signals.iter().map(|s| s.to_ascii_lowercase()).collect();
        let score = jaccard(target, &card_signals);
        if score <= threshold {
            continue;
        }

        let matching: Vec<String> = target.intersection(&card_signals).cloned().collect();
        similar.push(SimilarCase {
            case_id: card.id,
            title: card.title,
            score,
            matching_signals: matching,
            root_cause: card.root_cause,
            fix_summary: card.fix_summary,
            verify_commands: card.verify_commands,
        });
    }

    // Higher score first; equal scores prefer the most recent import
    similar.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(b.case_id.cmp(&a.case_id))
    });
    similar.truncate(limit);
    Ok(similar)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::CaseCardRecord;

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_jaccard_bounds() {
        let a = set(&["ora-12170", "ppde1001f"]);
        let b = set(&["ora-12170"]);
        let score = jaccard(&a, &b);
        assert!(score > 0.0 && score <= 1.0);
        assert_eq!(score, 0.5);
    }

    #[test]
    fn test_jaccard_identity_and_empty() {
        let a = set(&["x"]);
        assert_eq!(jaccard(&a, &a), 1.0);
        let empty = BTreeSet::new();
        assert_eq!(jaccard(&empty, &empty), 0.0);
        assert_eq!(jaccard(&a, &empty), 0.0);
    }

    #[test]
    fn test_threshold_is_strict() {
        let tmp = tempfile::TempDir::new().unwrap();
        let store = Store::open(&tmp.path().join("t.db")).unwrap();

        // Card sharing 3 of 10 union entries: score exactly 0.3, excluded
        let mut shared = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let mut card_only = vec!["d".to_string(), "e".to_string(), "f".to_string(), "g".to_string()];
        let mut card_signals = shared.clone();
        card_signals.append(&mut card_only);
        store
            .upsert_case_card(&CaseCardRecord {
                content_hash: "h1".to_string(),
                source_path: None,
                title: None,
                signals: card_signals,
                root_cause: None,
                fix_summary: None,
                verify_commands: vec![],
                related_files: vec![],
                tags: vec![],
            })
            .unwrap();

        shared.extend(["x".to_string(), "y".to_string(), "z".to_string()]);
        let target: BTreeSet<String> = shared.into_iter().collect();
        // |∩| = 3, |∪| = 10 → 0.3, not strictly above the threshold
        let found = find_similar_cases(&store, &target, 5, 0.3).unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn test_ranking_and_tie_break() {
        let tmp = tempfile::TempDir::new().unwrap();
        let store = Store::open(&tmp.path().join("t.db")).unwrap();

        for (hash, signals) in [
            ("h1", vec!["ora-12170"]),
            ("h2", vec!["ora-12170"]),
            ("h3", vec!["ora-12170", "unrelated"]),
        ] {
            store
                .upsert_case_card(&CaseCardRecord {
                    content_hash: hash.to_string(),
                    source_path: None,
                    title: Some(hash.to_string()),
                    signals: signals.into_iter().map(String::from).collect(),
                    root_cause: None,
                    fix_summary: None,
                    verify_commands: vec![],
                    related_files: vec![],
                    tags: vec![],
                })
                .unwrap();
        }

        let target = set(&["ora-12170"]);
        let found = find_similar_cases(&store, &target, 5, 0.3).unwrap();
        assert_eq!(found.len(), 3);
        // h1 and h2 both score 1.0; the more recent import (h2) wins the tie
        assert_eq!(found[0].title.as_deref(), Some("h2"));
        assert_eq!(found[1].title.as_deref(), Some("h1"));
        assert_eq!(found[2].title.as_deref(), Some("h3"));
    }
}
