//! Scalar Kalman estimator
//!
//! One-dimensional random-walk filter used for every learned fingerprint
//! value:
//!
//! ```text
//! Predict:   P = P + Q
//! Gain:      K = P / (P + R)
//! Update:    x = x + K·(z − x)
//!            P = max((1 − K)·P, floor)
//! ```
//!
//! Alongside the estimate variance it keeps the observed spread (EMA of
//! squared residuals). The estimate variance says how sure we are of the
//! mean; the spread says how far individual readings wander from it, which is
//! what z-scores need.

use crate::constants::learning::{INITIAL_SPREAD, MIN_VARIANCE, SPREAD_SMOOTHING};

/// Random-walk Kalman filter over one scalar
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScalarKalman {
    estimate: f32,
    variance: f32,
    spread: f32,
    samples: u32,
    process_noise: f32,
    measurement_noise: f32,
}

impl ScalarKalman {
    /// Empty estimator with the given noise model (dB²)
    pub fn new(process_noise: f32, measurement_noise: f32) -> Self {
        Self {
            estimate: 0.0,
            variance: measurement_noise,
            spread: INITIAL_SPREAD,
            samples: 0,
            process_noise,
            measurement_noise,
        }
    }

    /// Fold in one measurement
    pub fn update(&mut self, measurement: f32) {
        if !measurement.is_finite() {
            return;
        }
        if self.samples == 0 {
            self.estimate = measurement;
            self.variance = self.measurement_noise.max(MIN_VARIANCE);
            self.spread = INITIAL_SPREAD;
        } else {
            let residual = measurement - self.estimate;
            self.spread = ((1.0 - SPREAD_SMOOTHING) * self.spread
                + SPREAD_SMOOTHING * residual * residual)
                .max(MIN_VARIANCE);

            let predicted = self.variance + self.process_noise;
            let gain = predicted / (predicted + self.measurement_noise);
            self.estimate += gain * residual;
            self.variance = ((1.0 - gain) * predicted).max(MIN_VARIANCE);
        }
        self.samples = self.samples.saturating_add(1);
    }

    /// Current estimate
    pub fn estimate(&self) -> f32 {
        self.estimate
    }

    /// Variance of the estimate (dB²)
    pub fn variance(&self) -> f32 {
        self.variance
    }

    /// Observed spread of individual readings (dB²)
    pub fn spread(&self) -> f32 {
        self.spread
    }

    /// Number of measurements folded in
    pub fn samples(&self) -> u32 {
        self.samples
    }

    /// Has at least one measurement
    pub fn is_initialized(&self) -> bool {
        self.samples > 0
    }
}
