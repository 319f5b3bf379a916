//! Fusion (C9): reciprocal rank fusion across retriever result lists,
//! followed by near-duplicate collapsing.
//!
//! Grounded in the enrichment pack's
//! `mylinyuzhi-codex/codex-rs/retrieval/src/search/fusion.rs` (RRF
//! accumulation shape) and `.../ranking.rs` / `.../dedup.rs` (score
//! normalization and duplicate collapsing), adapted to the spec's exact
//! constants: `k = 60`, normalization `s / (s + 1)`, and a dedup rule
//! that fires on either overlapping line ranges in the same file or
//! `>= 0.9` Jaccard similarity over tokenized content (spec.md §4.9).

use std::collections::HashMap;

use crate::models::{Candidate, LineRange, Method};

const RRF_K: f64 = 60.0;
const JACCARD_THRESHOLD: f64 = 0.9;
const MIN_TOKEN_LEN: usize = 2;

struct Accumulator {
    score_sum: f64,
    best: Candidate,
}

/// Combine one ranked candidate list per retrieval method into a single
/// deduplicated, RRF-scored candidate list.
pub fn fuse(per_method: &[(Method, f64, Vec<Candidate>)]) -> Vec<Candidate> {
    let mut acc: HashMap<String, Accumulator> = HashMap::new();

    for (_, weight, candidates) in per_method {
        for (rank, candidate) in candidates.iter().enumerate() {
            let contribution = weight / (RRF_K + rank as f64 + 1.0);
            let chunk_id = candidate.chunk.chunk_id.clone();
            match acc.get_mut(&chunk_id) {
                Some(entry) => {
                    entry.score_sum += contribution;
                    if candidate.score > entry.best.score {
                        entry.best = candidate.clone();
                    }
                }
                None => {
                    acc.insert(
                        chunk_id,
                        Accumulator {
                            score_sum: contribution,
                            best: candidate.clone(),
                        },
                    );
                }
            }
        }
    }

    let mut fused: Vec<Candidate> = acc
        .into_values()
        .map(|entry| {
            let mut candidate = entry.best;
            candidate.score = entry.score_sum / (entry.score_sum + 1.0);
            candidate
        })
        .collect();

    fused.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.chunk.file_path.cmp(&b.chunk.file_path))
            .then_with(|| line_start(&a.chunk.line_range).cmp(&line_start(&b.chunk.line_range)))
    });

    dedup(fused)
}

fn line_start(range: &Option<LineRange>) -> u32 {
    range.map(|r| r.start).unwrap_or(0)
}

fn overlaps(a: &Option<LineRange>, b: &Option<LineRange>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a.start <= b.end && b.start <= a.end,
        (None, None) => true,
        _ => false,
    }
}

fn tokenize(content: &str) -> std::collections::HashSet<String> {
    content
        .split(|c: char| !c.is_alphanumeric() && c != '_')
        .filter(|t| t.len() > MIN_TOKEN_LEN)
        .map(|t| t.to_lowercase())
        .collect()
}

fn jaccard(a: &std::collections::HashSet<String>, b: &std::collections::HashSet<String>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let intersection = a.intersection(b).count() as f64;
    let union = a.union(b).count() as f64;
    if union == 0.0 {
        0.0
    } else {
        intersection / union
    }
}

/// Drop candidates that duplicate an already-kept, higher-scored one:
/// same file with overlapping line ranges, or `>= 0.9` Jaccard
/// similarity over tokenized content (spec.md §4.9).
fn dedup(candidates: Vec<Candidate>) -> Vec<Candidate> {
    let mut kept: Vec<Candidate> = Vec::new();
    let mut kept_tokens: Vec<std::collections::HashSet<String>> = Vec::new();

    'outer: for candidate in candidates {
        let tokens = tokenize(&candidate.chunk.content);
        for (i, existing) in kept.iter().enumerate() {
            let same_file_overlap = existing.chunk.file_path == candidate.chunk.file_path
                && overlaps(&existing.chunk.line_range, &candidate.chunk.line_range);
            let near_duplicate = jaccard(&kept_tokens[i], &tokens) >= JACCARD_THRESHOLD;
            if same_file_overlap || near_duplicate {
                // `candidates` is already score-sorted descending, so the
                // first occurrence seen is always the higher-scored one.
                continue 'outer;
            }
        }
        kept_tokens.push(tokens);
        kept.push(candidate);
    }

    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Chunk, SymbolType};

    fn mk(path: &str, content: &str, range: Option<LineRange>) -> Chunk {
        Chunk::new(
            path.to_string(),
            content.to_string(),
            range,
            "rust".into(),
            Some("foo".into()),
            Some(SymbolType::Function),
            0,
        )
    }

    fn cand(chunk: Chunk, score: f64, method: Method) -> Candidate {
        Candidate {
            chunk,
            score,
            method,
            raw_score: score,
            matched_terms: None,
            dep_depth: None,
        }
    }

    #[test]
    fn single_method_list_normalizes_into_unit_interval() {
        let c1 = cand(mk("a.rs", "fn a() {}", Some(LineRange { start: 1, end: 2 })), 1.0, Method::Semantic);
        let fused = fuse(&[(Method::Semantic, 0.6, vec![c1])]);
        assert_eq!(fused.len(), 1);
        assert!(fused[0].score > 0.0 && fused[0].score < 1.0);
    }

    #[test]
    fn candidate_present_in_multiple_lists_scores_higher_than_alone() {
        let chunk = mk("a.rs", "fn a() {}", Some(LineRange { start: 1, end: 2 }));
        let c1 = cand(chunk.clone(), 1.0, Method::Semantic);
        let c2 = cand(chunk.clone(), 0.8, Method::Lexical);

        let fused_alone = fuse(&[(Method::Semantic, 0.6, vec![c1.clone()])]);
        let fused_both = fuse(&[
            (Method::Semantic, 0.6, vec![c1]),
            (Method::Lexical, 0.3, vec![c2]),
        ]);

        assert_eq!(fused_both.len(), 1);
        assert!(fused_both[0].score > fused_alone[0].score);
    }

    #[test]
    fn overlapping_ranges_in_same_file_are_deduped() {
        let a = cand(mk("a.rs", "fn a() { unique_marker_one() }", Some(LineRange { start: 1, end: 10 })), 0.9, Method::Semantic);
        let b = cand(mk("a.rs", "fn a() { unique_marker_two() }", Some(LineRange { start: 5, end: 15 })), 0.5, Method::Lexical);
        let fused = fuse(&[
            (Method::Semantic, 0.6, vec![a]),
            (Method::Lexical, 0.3, vec![b]),
        ]);
        assert_eq!(fused.len(), 1);
    }

    #[test]
    fn near_identical_content_in_different_files_is_deduped() {
        let content = "fn compute_total(items: &[Item]) -> i64 { items.iter().map(|i| i.price).sum() }";
        let a = cand(mk("a.rs", content, None), 0.9, Method::Semantic);
        let b = cand(mk("b.rs", content, None), 0.5, Method::Lexical);
        let fused = fuse(&[
            (Method::Semantic, 0.6, vec![a]),
            (Method::Lexical, 0.3, vec![b]),
        ]);
        assert_eq!(fused.len(), 1);
    }

    #[test]
    fn distinct_chunks_are_both_kept() {
        let a = cand(mk("a.rs", "fn alpha_only_thing() {}", Some(LineRange { start: 1, end: 2 })), 0.9, Method::Semantic);
        let b = cand(mk("b.rs", "fn beta_different_thing() {}", Some(LineRange { start: 1, end: 2 })), 0.8, Method::Lexical);
        let fused = fuse(&[
            (Method::Semantic, 0.6, vec![a]),
            (Method::Lexical, 0.3, vec![b]),
        ]);
        assert_eq!(fused.len(), 2);
    }
}
