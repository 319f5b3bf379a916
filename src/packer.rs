//! Packer (C12): render ranked candidates into [`ContextItem`]s under a
//! hard token budget, truncating or discarding as the budget runs out
//! (spec.md §4.12-4.13).

use crate::error::EngineError;
use crate::models::{Candidate, ContextItem};
use crate::tokenizer::Tokenizer;

const SEPARATOR: &str = "\n\n---\n\n";
const TRUNCATION_MARKER: &str = "\n\n[... truncated ...]";
const MIN_TRUNCATE_REMAINING: u32 = 100;
const CHARS_PER_TOKEN: usize = 4;

fn render(candidate: &Candidate) -> String {
    let mut out = format!("File: {}\n", candidate.chunk.file_path);
    if let Some(range) = candidate.chunk.line_range {
        out.push_str(&format!("Lines {}-{}\n", range.start, range.end));
    }
    out.push_str(&candidate.chunk.content);
    out
}

/// Pack `candidates` (already ranked) into context items within
/// `context_budget` tokens. Stops at the first candidate that can't be
/// fit even truncated. Re-measures the final token count against
/// `tokenizer` and returns [`EngineError::PackingInvariantViolated`] if
/// the hard bound is ever exceeded — unreachable given a correct
/// packer, kept as a defensive boundary check (spec.md §3 invariant 4).
pub fn pack(
    candidates: &[Candidate],
    context_budget: u32,
    tokenizer: &Tokenizer,
) -> Result<(Vec<ContextItem>, u32), EngineError> {
    let mut items = Vec::new();
    let mut rendered = Vec::new();
    let mut used: u32 = 0;

    for candidate in candidates {
        let remaining = context_budget.saturating_sub(used);
        if remaining == 0 {
            break;
        }

        let full_text = render(candidate);
        let overhead = if rendered.is_empty() { 0 } else { tokenizer.count(SEPARATOR) };
        let full_tokens = tokenizer.count(&full_text);

        if overhead + full_tokens <= remaining {
            used += overhead + full_tokens;
            rendered.push(full_text.clone());
            items.push(ContextItem {
                name: candidate.chunk.file_path.clone(),
                description: format!("{} (score {:.3})", candidate.method.as_str(), candidate.score),
                content: full_text,
            });
            continue;
        }

        if remaining <= MIN_TRUNCATE_REMAINING + overhead as u32 {
            break;
        }

        let content_budget_tokens = remaining - overhead as u32 - tokenizer.count(TRUNCATION_MARKER);
        let char_budget = (content_budget_tokens as usize) * CHARS_PER_TOKEN;
        let header = format!("File: {}\n{}", candidate.chunk.file_path, match candidate.chunk.line_range {
            Some(r) => format!("Lines {}-{}\n", r.start, r.end),
            None => String::new(),
        });
        let header_chars = header.len();
        let body_char_budget = char_budget.saturating_sub(header_chars);
        let truncated_content = truncate_at_char_boundary(&candidate.chunk.content, body_char_budget);
        let truncated_text = format!("{}{}{}", header, truncated_content, TRUNCATION_MARKER);
        let truncated_tokens = tokenizer.count(&truncated_text);

        used += overhead + truncated_tokens;
        rendered.push(truncated_text.clone());
        items.push(ContextItem {
            name: candidate.chunk.file_path.clone(),
            description: format!("{} (score {:.3}, truncated)", candidate.method.as_str(), candidate.score),
            content: truncated_text,
        });
        break;
    }

    let full_rendering = rendered.join(SEPARATOR);
    let final_tokens = tokenizer.count(&full_rendering);
    if final_tokens > context_budget {
        return Err(EngineError::PackingInvariantViolated(format!(
            "packed {final_tokens} tokens exceeds context budget {context_budget}"
        )));
    }

    Ok((items, final_tokens))
}

fn truncate_at_char_boundary(content: &str, max_chars: usize) -> String {
    if content.chars().count() <= max_chars {
        return content.to_string();
    }
    content.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Chunk, LineRange, Method, SymbolType};

    fn cand(content: &str) -> Candidate {
        Candidate {
            chunk: Chunk::new(
                "a.rs".into(),
                content.to_string(),
                Some(LineRange { start: 1, end: 10 }),
                "rust".into(),
                Some("foo".into()),
                Some(SymbolType::Function),
                0,
            ),
            score: 0.9,
            method: Method::Semantic,
            raw_score: 0.9,
            matched_terms: None,
            dep_depth: None,
        }
    }

    #[test]
    fn small_candidate_fits_whole() {
        let tokenizer = Tokenizer::new("gpt-4");
        let candidates = vec![cand("fn foo() {}")];
        let (items, used) = pack(&candidates, 1000, &tokenizer).unwrap();
        assert_eq!(items.len(), 1);
        assert!(used <= 1000);
        assert!(items[0].content.starts_with("File: a.rs"));
    }

    #[test]
    fn never_exceeds_context_budget() {
        let tokenizer = Tokenizer::new("gpt-4");
        let big_content = "fn big() { ".to_string() + &"x".repeat(5000) + " }";
        let candidates = vec![cand(&big_content), cand("fn small() {}")];
        let (_items, used) = pack(&candidates, 200, &tokenizer).unwrap();
        assert!(used <= 200);
    }

    #[test]
    fn truncation_marker_present_when_content_is_cut() {
        let tokenizer = Tokenizer::new("gpt-4");
        let big_content = "x".repeat(10_000);
        let candidates = vec![cand(&big_content)];
        let (items, _used) = pack(&candidates, 150, &tokenizer).unwrap();
        if !items.is_empty() {
            assert!(items[0].content.contains("[... truncated ...]"));
        }
    }

    #[test]
    fn zero_budget_packs_nothing() {
        let tokenizer = Tokenizer::new("gpt-4");
        let candidates = vec![cand("fn foo() {}")];
        let (items, used) = pack(&candidates, 0, &tokenizer).unwrap();
        assert!(items.is_empty());
        assert_eq!(used, 0);
    }
}
