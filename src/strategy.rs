//! Strategy selector (C7): map intent to a weighted, ordered set of
//! retrieval methods.
//!
//! The table in spec.md §4.7 is normative; encoded as a fixed array
//! indexed by [`Method`] per spec.md §9's design note ("Strategy weights
//! use a closed set of methods; use an array indexed by method tag"),
//! rather than a `HashMap`.

use crate::models::{Intent, Method};

/// Ordered `(method, weight)` pairs. Weights sum to <= 1.0.
#[derive(Debug, Clone)]
pub struct Strategy {
    pub methods: Vec<(Method, f64)>,
}

impl Strategy {
    pub fn weight_of(&self, method: Method) -> f64 {
        self.methods
            .iter()
            .find(|(m, _)| *m == method)
            .map(|(_, w)| *w)
            .unwrap_or(0.0)
    }
}

/// Normative strategy table (spec.md §4.7).
pub fn strategy_for(intent: Intent) -> Strategy {
    use Method::*;
    let methods = match intent {
        Intent::Explain => vec![(Semantic, 0.6), (Lexical, 0.3), (Dependency, 0.1)],
        Intent::BugFix => vec![
            (RecentEdits, 0.4),
            (Semantic, 0.3),
            (Dependency, 0.2),
            (Lexical, 0.1),
        ],
        Intent::Refactor => vec![(Dependency, 0.5), (Semantic, 0.4), (Lexical, 0.1)],
        Intent::Generate => vec![(Semantic, 0.6), (Lexical, 0.3), (Dependency, 0.1)],
        Intent::Test => vec![(Dependency, 0.4), (Semantic, 0.4), (Lexical, 0.2)],
    };
    Strategy { methods }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bug_fix_leads_with_recent_edits() {
        let s = strategy_for(Intent::BugFix);
        assert_eq!(s.methods[0].0, Method::RecentEdits);
    }

    #[test]
    fn weights_sum_to_at_most_one() {
        for intent in Intent::ALL {
            let s = strategy_for(intent);
            let sum: f64 = s.methods.iter().map(|(_, w)| w).sum();
            assert!(sum <= 1.0 + 1e-9, "{:?} sums to {}", intent, sum);
        }
    }

    #[test]
    fn weight_of_unused_method_is_zero() {
        let s = strategy_for(Intent::Explain);
        assert_eq!(s.weight_of(Method::RecentEdits), 0.0);
    }

    #[test]
    fn refactor_table_matches_spec() {
        let s = strategy_for(Intent::Refactor);
        assert_eq!(s.methods, vec![
            (Method::Dependency, 0.5),
            (Method::Semantic, 0.4),
            (Method::Lexical, 0.1),
        ]);
    }
}
