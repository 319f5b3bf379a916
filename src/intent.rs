//! Intent classifier (C6): map request text to an intent tag with a
//! confidence score.
//!
//! v1 is rule-based: a fixed, ordered set of keyword/regex patterns per
//! intent. Deterministic and side-effect-free, per spec.md §4.6.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::Intent;

struct Rule {
    intent: Intent,
    pattern: Regex,
    confidence: f64,
}

/// Deterministic priority order: first matching rule wins. `bug_fix`
/// patterns are checked before `explain`'s broader vocabulary so that
/// "why does X fail" routes to `bug_fix`, matching scenario S3.
static RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    vec![
        Rule {
            intent: Intent::BugFix,
            pattern: Regex::new(r"(?i)\b(bug|fail|failing|failure|broken|crash|error|exception|assertionerror|why does|why is|doesn't work|does not work|fix)\b").unwrap(),
            confidence: 0.85,
        },
        Rule {
            intent: Intent::Test,
            pattern: Regex::new(r"(?i)\b(test|tests|testing|unit test|write a test|add tests?)\b").unwrap(),
            confidence: 0.8,
        },
        Rule {
            intent: Intent::Refactor,
            pattern: Regex::new(r"(?i)\b(refactor|rename|restructure|extract|simplify|clean up|reorganize)\b").unwrap(),
            confidence: 0.8,
        },
        Rule {
            intent: Intent::Generate,
            pattern: Regex::new(r"(?i)\b(generate|implement|add a|create a|write a|scaffold|build a)\b").unwrap(),
            confidence: 0.75,
        },
        Rule {
            intent: Intent::Explain,
            pattern: Regex::new(r"(?i)\b(explain|what does|how does|describe|summarize|walk me through)\b").unwrap(),
            confidence: 0.75,
        },
    ]
});

const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.3;

/// Classify a request string into `(intent, confidence)`. Returns
/// `explain` at confidence `0.3` when no pattern matches above threshold
/// (spec.md §4.6).
pub fn classify(request: &str) -> (Intent, f64) {
    for rule in RULES.iter() {
        if rule.pattern.is_match(request) {
            return (rule.intent, rule.confidence);
        }
    }
    (Intent::Explain, DEFAULT_CONFIDENCE_THRESHOLD)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routes_bug_report_to_bug_fix() {
        let (intent, conf) = classify("why does test_login fail with AssertionError?");
        assert_eq!(intent, Intent::BugFix);
        assert!(conf > 0.3);
    }

    #[test]
    fn routes_explain_request() {
        let (intent, _) = classify("explain the login flow");
        assert_eq!(intent, Intent::Explain);
    }

    #[test]
    fn routes_refactor_request() {
        let (intent, _) = classify("refactor the auth module to remove duplication");
        assert_eq!(intent, Intent::Refactor);
    }

    #[test]
    fn routes_test_request() {
        let (intent, _) = classify("write a test for the login handler");
        assert_eq!(intent, Intent::Test);
    }

    #[test]
    fn unmatched_request_defaults_to_explain_at_threshold() {
        let (intent, conf) = classify("qwertyuiop zxcvbnm");
        assert_eq!(intent, Intent::Explain);
        assert_eq!(conf, 0.3);
    }

    #[test]
    fn is_deterministic() {
        let a = classify("why does login fail?");
        let b = classify("why does login fail?");
        assert_eq!(a, b);
    }
}
