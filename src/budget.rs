//! Budget allocator (C11): split a caller-supplied token budget across
//! the five fixed prompt sections (spec.md §4.11).

use crate::error::EngineError;
use crate::models::{BudgetAllocation, Intent};

/// Fixed overheads, not configurable (spec.md §4.11).
const SYSTEM_TOKENS: u32 = 50;
const RESERVED_TOKENS: u32 = 10;
const MIN_CONTEXT_TOKENS: u32 = 20;
const MAX_CONTEXT_TOKENS: u32 = 8000;

/// `(context_pct, task_pct)` by intent (spec.md §4.11).
fn percentages(intent: Intent) -> (f64, f64) {
    match intent {
        Intent::Explain => (0.60, 0.05),
        Intent::BugFix => (0.50, 0.10),
        Intent::Refactor => (0.55, 0.10),
        Intent::Generate => (0.40, 0.10),
        Intent::Test => (0.50, 0.10),
    }
}

/// Allocate `total_budget` tokens for a query of the given `intent`,
/// after reserving `input_tokens` for the caller-supplied input.
///
/// Returns [`EngineError::InvalidBudget`] when `total_budget` is
/// non-positive, or when nothing remains after fixed overhead and
/// input (spec.md §4.11 "fail fast"; both are the same boundary
/// variant, per the §6 taxonomy).
pub fn allocate(total_budget: u32, input_tokens: u32, intent: Intent) -> Result<BudgetAllocation, EngineError> {
    if total_budget == 0 {
        return Err(EngineError::InvalidBudget("token_budget must be > 0".into()));
    }

    let fixed = SYSTEM_TOKENS as i64 + RESERVED_TOKENS as i64 + input_tokens as i64;
    let available = total_budget as i64 - fixed;
    if available <= 0 {
        return Err(EngineError::InvalidBudget(
            "token_budget leaves no tokens available after fixed overhead and input".into(),
        ));
    }
    let available = available as u32;

    let (context_pct, task_pct) = percentages(intent);
    let context = ((available as f64 * context_pct) as u32).clamp(MIN_CONTEXT_TOKENS, MAX_CONTEXT_TOKENS);
    let task = (available as f64 * task_pct) as u32;

    let spent = SYSTEM_TOKENS as i64 + input_tokens as i64 + context as i64 + task as i64 + RESERVED_TOKENS as i64;
    let output = (total_budget as i64 - spent).max(0) as u32;

    Ok(BudgetAllocation {
        system: SYSTEM_TOKENS,
        context,
        task,
        input: input_tokens,
        output,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_budget_is_invalid() {
        assert!(matches!(allocate(0, 0, Intent::Explain), Err(EngineError::InvalidBudget(_))));
    }

    #[test]
    fn budget_too_small_for_overhead_is_invalid() {
        let result = allocate(50, 0, Intent::Explain);
        assert!(matches!(result, Err(EngineError::InvalidBudget(_))));
    }

    #[test]
    fn budget_positive_but_insufficient_once_input_reserved_is_invalid() {
        // S6: token_budget=40, input_tokens=20 -> available = 40 - 50 - 10 - 20 < 0.
        let result = allocate(40, 20, Intent::BugFix);
        assert!(matches!(result, Err(EngineError::InvalidBudget(_))));
    }

    #[test]
    fn context_respects_min_bound_for_tiny_available_budget() {
        // available = 200 - 50 - 10 - 0 = 140; 140*0.6 = 84 > min, so this
        // case exercises the ordinary path, not the clamp itself.
        let alloc = allocate(200, 0, Intent::Explain).unwrap();
        assert_eq!(alloc.context, 84);
    }

    #[test]
    fn context_never_exceeds_max_bound() {
        let alloc = allocate(1_000_000, 0, Intent::Explain).unwrap();
        assert_eq!(alloc.context, MAX_CONTEXT_TOKENS);
    }

    #[test]
    fn allocation_components_never_exceed_total_budget() {
        for intent in Intent::ALL {
            let alloc = allocate(5000, 200, intent).unwrap();
            let sum = alloc.system + alloc.context + alloc.task + alloc.input + alloc.output;
            assert_eq!(sum, 5000);
        }
    }

    #[test]
    fn bug_fix_allocates_ten_percent_to_task() {
        let alloc = allocate(2000, 0, Intent::BugFix).unwrap();
        let available = 2000 - 50 - 10;
        assert_eq!(alloc.task, (available as f64 * 0.10) as u32);
    }
}
