//! Confidence Scoring from Z-Scores
//!
//! ## Overview
//!
//! Learned fingerprints express "how unusual is this reading for this area"
//! as z-scores: `(observed − expected) / σ` per scanner. Decisions need a
//! single number in [0, 1] instead, so the z-scores are averaged and passed
//! through a Cauchy-like sigmoid:
//!
//! ```text
//! confidence = 1 / (1 + (z̄ / threshold)²)
//!
//! z̄ = 0          → 1.0
//! z̄ = threshold  → 0.5
//! z̄ → ∞          → 0.0
//! ```
//!
//! The heavy tail matters: a single noisy scanner lowers confidence
//! gradually instead of collapsing it, which a Gaussian kernel would do.
//!
//! ## Properties
//!
//! - Output always in [0, 1]
//! - Non-increasing in the (weighted) mean |z|
//! - No data means no penalty: empty or zero-weight input yields 1.0
//!
//! The weighted variant trusts well-sampled estimators more: each z-score
//! counts in proportion to the number of samples behind it.

/// Default z-score at which confidence drops to one half
pub const DEFAULT_Z_THRESHOLD: f32 = 2.5;

/// Map a mean absolute z-score to confidence
#[inline]
fn sigmoid(mean_z: f32, threshold: f32) -> f32 {
    if !mean_z.is_finite() {
        return 0.0;
    }
    let threshold = if threshold > f32::EPSILON { threshold } else { f32::EPSILON };
    let ratio = mean_z / threshold;
    (1.0 / (1.0 + ratio * ratio)).clamp(0.0, 1.0)
}

/// Turn z-scores into a confidence in [0, 1]
///
/// Signs are ignored; only the magnitude of the deviation counts.
pub fn z_scores_to_confidence(scores: &[f32], threshold: f32) -> f32 {
    if scores.is_empty() {
        return 1.0;
    }
    let sum: f32 = scores.iter().map(|z| libm::fabsf(*z)).sum();
    sigmoid(sum / scores.len() as f32, threshold)
}

/// Turn `(z_score, sample_count)` pairs into a confidence in [0, 1]
///
/// Each |z| is weighted by its sample count before averaging. Zero total
/// weight yields 1.0.
pub fn weighted_z_scores_to_confidence(scores: &[(f32, u32)], threshold: f32) -> f32 {
    let mut weighted = 0.0f32;
    let mut total = 0.0f32;
    for &(z, samples) in scores {
        let weight = samples as f32;
        weighted += libm::fabsf(z) * weight;
        total += weight;
    }
    if total <= 0.0 {
        return 1.0;
    }
    sigmoid(weighted / total, threshold)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_z_scores_give_high_confidence() {
        let confidence = z_scores_to_confidence(&[0.1, 0.2, 0.15], DEFAULT_Z_THRESHOLD);
        assert!(confidence > 0.95, "got {}", confidence);
    }

    #[test]
    fn z_at_threshold_gives_half() {
        let confidence = z_scores_to_confidence(&[2.5, 2.5, 2.5], 2.5);
        assert!((confidence - 0.5).abs() < 1e-6);
    }

    #[test]
    fn empty_input_is_full_confidence() {
        assert_eq!(z_scores_to_confidence(&[], 2.5), 1.0);
        assert_eq!(weighted_z_scores_to_confidence(&[], 2.5), 1.0);
        assert_eq!(weighted_z_scores_to_confidence(&[(4.0, 0), (9.0, 0)], 2.5), 1.0);
    }

    #[test]
    fn sign_is_ignored() {
        let positive = z_scores_to_confidence(&[1.0, 2.0], 2.5);
        let negative = z_scores_to_confidence(&[-1.0, -2.0], 2.5);
        assert_eq!(positive, negative);
    }

    #[test]
    fn weighting_favours_well_sampled_scores() {
        // One confident estimator agrees, one barely-trained one disagrees
        let weighted = weighted_z_scores_to_confidence(&[(0.2, 100), (5.0, 1)], 2.5);
        let unweighted = z_scores_to_confidence(&[0.2, 5.0], 2.5);
        assert!(weighted > unweighted);
    }

    #[test]
    fn non_finite_input_is_zero_confidence() {
        assert_eq!(z_scores_to_confidence(&[f32::INFINITY], 2.5), 0.0);
    }
}
