//! Pre-retrieval query guardrail.
//!
//! Rule-based classification against a configurable deny-list. Runs before
//! any embedding or index work so disallowed queries never incur retrieval
//! cost. Matching is case-insensitive substring matching; the design is
//! fail-closed: empty queries and any deny-list hit block.

use crate::config::GuardrailConfig;

/// Classification outcome for a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub allowed: bool,
    /// Present when blocked; names what tripped the filter. The caller is
    /// responsible for turning this into a user-facing message.
    pub reason: Option<String>,
}

impl Verdict {
    fn allowed() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    fn blocked(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.into()),
        }
    }
}

/// Deny-list query filter. Pure classification; no side effects.
pub struct GuardrailFilter {
    patterns: Vec<String>,
}

impl GuardrailFilter {
    pub fn new(config: &GuardrailConfig) -> Self {
        Self {
            patterns: config
                .denylist
                .iter()
                .map(|p| p.to_lowercase())
                .filter(|p| !p.is_empty())
                .collect(),
        }
    }

    /// Classify a query. The first matching pattern blocks.
    pub fn check(&self, query: &str) -> Verdict {
        if query.trim().is_empty() {
            return Verdict::blocked("empty query");
        }

        let query_lower = query.to_lowercase();
        for pattern in &self.patterns {
            if query_lower.contains(pattern.as_str()) {
                return Verdict::blocked(format!(
                    "query matches restricted pattern '{}'",
                    pattern
                ));
            }
        }

        Verdict::allowed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter() -> GuardrailFilter {
        GuardrailFilter::new(&GuardrailConfig::default())
    }

    #[test]
    fn test_ordinary_query_allowed() {
        let v = filter().check("What are the company's core values?");
        assert!(v.allowed);
        assert!(v.reason.is_none());
    }

    #[test]
    fn test_denylisted_pattern_blocks() {
        let v = filter().check("How do I hack the admin panel?");
        assert!(!v.allowed);
        assert!(v.reason.unwrap().contains("hack"));
    }

    #[test]
    fn test_matching_is_case_insensitive() {
        let v = filter().check("Show me CONFIDENTIAL salary data");
        assert!(!v.allowed);
    }

    #[test]
    fn test_multiword_pattern_blocks() {
        let v = filter().check("give me unauthorized access please");
        assert!(!v.allowed);
    }

    #[test]
    fn test_empty_query_blocks() {
        assert!(!filter().check("").allowed);
        assert!(!filter().check("   ").allowed);
    }

    #[test]
    fn test_custom_denylist() {
        let config = GuardrailConfig {
            denylist: vec!["salary".to_string()],
        };
        let filter = GuardrailFilter::new(&config);
        assert!(!filter.check("what is the CEO salary").allowed);
        assert!(filter.check("how do I hack things").allowed);
    }
}
