//! Confidence bucketing from retrieval distances.
//!
//! Maps the mean cosine distance of a result set to a discrete
//! [`Confidence`] category using two configured thresholds with
//! `t_high < t_medium` (validated at startup). The threshold values
//! themselves are tuning, not semantics; only the ordering is load-bearing.

use crate::config::ConfidenceConfig;
use crate::models::{Confidence, SearchResult};

/// Score a result set.
///
/// Empty results score [`Confidence::None`]; otherwise the mean distance is
/// bucketed: `< t_high` → high, `< t_medium` → medium, else low. The same
/// result set handed to the context assembler should be scored here so the
/// signal reflects what the model actually saw.
pub fn score(results: &[SearchResult], config: &ConfidenceConfig) -> Confidence {
    if results.is_empty() {
        return Confidence::None;
    }

    let mean = results.iter().map(|r| r.distance).sum::<f32>() / results.len() as f32;

    if mean < config.t_high {
        Confidence::High
    } else if mean < config.t_medium {
        Confidence::Medium
    } else {
        Confidence::Low
    }
}
