//! Provenance-split estimators
//!
//! Each learned value keeps button-trained and auto-learned samples in
//! separate filters and fuses them on read. The inverse-variance weight of
//! the button filter is clamped to at least `BUTTON_MIN_AUTHORITY`, so auto
//! learning can polish a user-trained fingerprint but never erase it.

use crate::{
    constants::learning::{
        ABSOLUTE_MEASUREMENT_NOISE, ABSOLUTE_PROCESS_NOISE, BUTTON_MIN_AUTHORITY, MIN_VARIANCE,
        PAIR_MEASUREMENT_NOISE, PAIR_PROCESS_NOISE,
    },
    model::ScannerAddress,
};

use super::ScalarKalman;

/// Where a learning sample came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    /// User pressed "train" while the device sat in the area
    Button,
    /// Confirmed decision that passed the quality gate
    Auto,
}

/// A value learned from both button and auto samples
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LearnedValue {
    auto: ScalarKalman,
    button: ScalarKalman,
}

impl LearnedValue {
    /// Empty value with the given noise model
    pub fn new(process_noise: f32, measurement_noise: f32) -> Self {
        Self {
            auto: ScalarKalman::new(process_noise, measurement_noise),
            button: ScalarKalman::new(process_noise, measurement_noise),
        }
    }

    /// Fold in a sample
    pub fn learn(&mut self, value: f32, provenance: Provenance) {
        match provenance {
            Provenance::Button => self.button.update(value),
            Provenance::Auto => self.auto.update(value),
        }
    }

    /// Weight of the button filter in the fused value
    fn button_weight(&self) -> f32 {
        match (self.button.is_initialized(), self.auto.is_initialized()) {
            (false, _) => 0.0,
            (true, false) => 1.0,
            (true, true) => {
                let button_precision = 1.0 / self.button.variance().max(MIN_VARIANCE);
                let auto_precision = 1.0 / self.auto.variance().max(MIN_VARIANCE);
                let weight = button_precision / (button_precision + auto_precision);
                weight.clamp(BUTTON_MIN_AUTHORITY, 1.0)
            }
        }
    }

    /// Fused expected value and reading spread (dB²)
    pub fn expected(&self) -> Option<(f32, f32)> {
        if self.samples() == 0 {
            return None;
        }
        let weight = self.button_weight();
        let mean = weight * self.button.estimate() + (1.0 - weight) * self.auto.estimate();
        let spread = weight * self.button.spread() + (1.0 - weight) * self.auto.spread();
        Some((mean, spread.max(MIN_VARIANCE)))
    }

    /// `(observed − expected) / σ` and the sample count behind it
    pub fn z_score(&self, observed: f32) -> Option<(f32, u32)> {
        let (mean, spread) = self.expected()?;
        Some(((observed - mean) / libm::sqrtf(spread), self.samples()))
    }

    /// Total samples
    pub fn samples(&self) -> u32 {
        self.auto.samples().saturating_add(self.button.samples())
    }

    /// Button-trained samples
    pub fn button_samples(&self) -> u32 {
        self.button.samples()
    }

    /// Auto-learned samples
    pub fn auto_samples(&self) -> u32 {
        self.auto.samples()
    }
}

/// Kalman-filtered RSSI delta between a primary scanner and another scanner
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScannerPairCorrelation {
    /// The non-primary scanner
    pub scanner_address: ScannerAddress,
    /// Learned `other − primary` delta (dB)
    pub delta: LearnedValue,
}

impl ScannerPairCorrelation {
    /// Empty correlation against `scanner_address`
    pub fn new(scanner_address: ScannerAddress) -> Self {
        Self {
            scanner_address,
            delta: LearnedValue::new(PAIR_PROCESS_NOISE, PAIR_MEASUREMENT_NOISE),
        }
    }
}

/// Kalman-filtered absolute RSSI for one scanner
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScannerAbsoluteRssi {
    /// The scanner
    pub scanner_address: ScannerAddress,
    /// Learned RSSI level (dBm)
    pub rssi: LearnedValue,
}

impl ScannerAbsoluteRssi {
    /// Empty absolute estimator for `scanner_address`
    pub fn new(scanner_address: ScannerAddress) -> Self {
        Self {
            scanner_address,
            rssi: LearnedValue::new(ABSOLUTE_PROCESS_NOISE, ABSOLUTE_MEASUREMENT_NOISE),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn button_keeps_authority_against_auto_drift() {
        let mut value = LearnedValue::new(0.05, 9.0);
        for _ in 0..10 {
            value.learn(-60.0, Provenance::Button);
        }
        for _ in 0..1000 {
            value.learn(-80.0, Provenance::Auto);
        }
        let (mean, _) = value.expected().unwrap();
        // At least 70% of the way towards the button value
        assert!(mean >= -66.0 - 1e-3, "mean drifted to {}", mean);
    }

    #[test]
    fn auto_only_value_follows_auto() {
        let mut value = LearnedValue::new(0.05, 9.0);
        for _ in 0..20 {
            value.learn(-70.0, Provenance::Auto);
        }
        let (mean, _) = value.expected().unwrap();
        assert!((mean - -70.0).abs() < 1e-3);
        assert_eq!(value.button_samples(), 0);
        assert_eq!(value.auto_samples(), 20);
    }

    #[test]
    fn z_score_measures_deviation_in_sigmas() {
        let mut value = LearnedValue::new(0.05, 9.0);
        value.learn(-60.0, Provenance::Auto);
        let (z, samples) = value.z_score(-52.0).unwrap();
        // Initial spread is 16 dB² (σ = 4)
        assert!((z - 2.0).abs() < 1e-4);
        assert_eq!(samples, 1);
        assert!(LearnedValue::new(0.05, 9.0).z_score(-60.0).is_none());
    }
}
