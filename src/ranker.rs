//! Ranker (C10): blend the fused method score with recency, file-type
//! fit, and symbol-type fit, then apply a per-file diversity penalty
//! (spec.md §4.10).

use std::collections::HashMap;

use crate::models::{Candidate, Intent, SymbolType};

const WEIGHT_METHOD: f64 = 0.50;
const WEIGHT_RECENCY: f64 = 0.20;
const WEIGHT_FILE_TYPE: f64 = 0.15;
const WEIGHT_SYMBOL_TYPE: f64 = 0.15;
const RECENCY_DECAY: f64 = 0.1;
const DEFAULT_RECENCY: f64 = 0.5;

fn recency(last_modified: i64, now_unix: i64) -> f64 {
    if last_modified <= 0 {
        return DEFAULT_RECENCY;
    }
    let age_hours = ((now_unix - last_modified) as f64 / 3600.0).max(0.0);
    (-RECENCY_DECAY * age_hours).exp()
}

fn file_type_fit(is_test_file: bool, intent: Intent) -> f64 {
    match intent {
        Intent::Test => {
            if is_test_file {
                1.0
            } else {
                0.3
            }
        }
        Intent::BugFix => {
            if is_test_file {
                0.3
            } else {
                1.0
            }
        }
        Intent::Refactor => {
            if is_test_file {
                0.2
            } else {
                1.0
            }
        }
        _ => 0.5,
    }
}

fn symbol_type_fit(symbol_type: Option<SymbolType>, intent: Intent) -> f64 {
    match intent {
        Intent::Refactor => match symbol_type {
            Some(SymbolType::Class) | Some(SymbolType::Function) => 1.0,
            _ => 0.5,
        },
        Intent::Generate => match symbol_type {
            Some(SymbolType::Function) | Some(SymbolType::Method) => 1.0,
            _ => 0.5,
        },
        _ => 0.5,
    }
}

/// Score and diversity-penalize a fused candidate list, returning it
/// re-sorted with ties broken by `(file_path, line_range.start)`.
pub fn rank(candidates: Vec<Candidate>, intent: Intent, now_unix: i64) -> Vec<Candidate> {
    let mut scored: Vec<Candidate> = candidates
        .into_iter()
        .map(|mut c| {
            let r = recency(c.chunk.last_modified, now_unix);
            let ft = file_type_fit(c.chunk.is_test_file(), intent);
            let st = symbol_type_fit(c.chunk.symbol_type, intent);
            c.score = WEIGHT_METHOD * c.score + WEIGHT_RECENCY * r + WEIGHT_FILE_TYPE * ft + WEIGHT_SYMBOL_TYPE * st;
            c
        })
        .collect();

    scored.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.chunk.file_path.cmp(&b.chunk.file_path))
            .then_with(|| {
                let a_start = a.chunk.line_range.map(|r| r.start).unwrap_or(0);
                let b_start = b.chunk.line_range.map(|r| r.start).unwrap_or(0);
                a_start.cmp(&b_start)
            })
    });

    apply_diversity_penalty(scored)
}

/// Penalize the nth candidate (0-indexed) from a given file by
/// `1 / (1 + n)`, then re-sort (spec.md §4.10).
fn apply_diversity_penalty(mut candidates: Vec<Candidate>) -> Vec<Candidate> {
    let mut seen_per_file: HashMap<String, u32> = HashMap::new();
    for candidate in candidates.iter_mut() {
        let n = seen_per_file.entry(candidate.chunk.file_path.clone()).or_insert(0);
        candidate.score *= 1.0 / (1.0 + *n as f64);
        *n += 1;
    }

    candidates.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.chunk.file_path.cmp(&b.chunk.file_path))
            .then_with(|| {
                let a_start = a.chunk.line_range.map(|r| r.start).unwrap_or(0);
                let b_start = b.chunk.line_range.map(|r| r.start).unwrap_or(0);
                a_start.cmp(&b_start)
            })
    });
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Chunk, LineRange, Method};

    fn cand(path: &str, start: u32, score: f64, last_modified: i64) -> Candidate {
        Candidate {
            chunk: Chunk::new(
                path.to_string(),
                "fn x() {}".into(),
                Some(LineRange { start, end: start + 1 }),
                "rust".into(),
                Some("x".into()),
                Some(SymbolType::Function),
                last_modified,
            ),
            score,
            method: Method::Semantic,
            raw_score: score,
            matched_terms: None,
            dep_depth: None,
        }
    }

    #[test]
    fn recency_defaults_when_timestamp_absent() {
        assert_eq!(recency(0, 1_000_000), DEFAULT_RECENCY);
    }

    #[test]
    fn recency_decays_with_age() {
        let fresh = recency(1000, 1000);
        let old = recency(1000, 1000 + 100 * 3600);
        assert!(fresh > old);
    }

    #[test]
    fn diversity_penalty_demotes_later_same_file_candidates() {
        let candidates = vec![
            cand("a.rs", 1, 0.9, 1000),
            cand("a.rs", 50, 0.85, 1000),
            cand("a.rs", 100, 0.8, 1000),
        ];
        let ranked = rank(candidates, Intent::Explain, 1000);
        // all three came from the same file and the same score inputs
        // beyond their raw method score, so ordering should track the
        // diversity-penalized score, not the raw input order blindly.
        assert_eq!(ranked.len(), 3);
        assert!(ranked[0].score >= ranked[1].score);
        assert!(ranked[1].score >= ranked[2].score);
    }

    #[test]
    fn tie_break_is_file_path_then_line_start() {
        let candidates = vec![cand("b.rs", 5, 0.5, 1000), cand("a.rs", 5, 0.5, 1000)];
        let ranked = rank(candidates, Intent::Explain, 1000);
        assert_eq!(ranked[0].chunk.file_path, "a.rs");
    }
}
