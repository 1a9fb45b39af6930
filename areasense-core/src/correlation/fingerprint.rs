//! Fingerprint storage shared by area and room profiles

use alloc::{
    collections::{BTreeMap, BTreeSet},
    vec::Vec,
};

use super::{Provenance, ScannerAbsoluteRssi, ScannerPairCorrelation};
use crate::{
    confidence::{weighted_z_scores_to_confidence, DEFAULT_Z_THRESHOLD},
    constants::learning::PROFILE_MIN_SAMPLES,
    model::ScannerAddress,
};

/// One scanner's deviation from the learned fingerprint
#[derive(Debug, Clone, PartialEq)]
pub struct ZScore {
    /// Scanner the deviation belongs to
    pub scanner_address: ScannerAddress,
    /// `(observed − expected) / σ`
    pub z: f32,
    /// Samples behind the expectation
    pub samples: u32,
}

/// Expected RSSI pattern for one area
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Fingerprint {
    /// Deltas keyed by primary scanner, then by other scanner
    pairs: BTreeMap<ScannerAddress, BTreeMap<ScannerAddress, ScannerPairCorrelation>>,
    /// Absolute levels keyed by scanner
    absolute: BTreeMap<ScannerAddress, ScannerAbsoluteRssi>,
}

impl Fingerprint {
    /// Empty fingerprint
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one simultaneous observation into the fingerprint
    pub fn learn(
        &mut self,
        primary_scanner: &str,
        primary_rssi: f32,
        other_readings: &BTreeMap<ScannerAddress, f32>,
        provenance: Provenance,
    ) {
        self.absolute
            .entry(ScannerAddress::from(primary_scanner))
            .or_insert_with(|| ScannerAbsoluteRssi::new(ScannerAddress::from(primary_scanner)))
            .rssi
            .learn(primary_rssi, provenance);

        let pairs = self
            .pairs
            .entry(ScannerAddress::from(primary_scanner))
            .or_default();

        for (scanner, rssi) in other_readings {
            if scanner == primary_scanner {
                continue;
            }
            pairs
                .entry(scanner.clone())
                .or_insert_with(|| ScannerPairCorrelation::new(scanner.clone()))
                .delta
                .learn(rssi - primary_rssi, provenance);
            self.absolute
                .entry(scanner.clone())
                .or_insert_with(|| ScannerAbsoluteRssi::new(scanner.clone()))
                .rssi
                .learn(*rssi, provenance);
        }
    }

    /// Delta z-scores of the current pattern against mature pair estimators
    pub fn z_scores(
        &self,
        primary_scanner: &str,
        primary_rssi: f32,
        other_readings: &BTreeMap<ScannerAddress, f32>,
    ) -> Vec<ZScore> {
        let Some(pairs) = self.pairs.get(primary_scanner) else {
            return Vec::new();
        };
        other_readings
            .iter()
            .filter(|(scanner, _)| scanner.as_str() != primary_scanner)
            .filter_map(|(scanner, rssi)| {
                let pair = pairs.get(scanner)?;
                if pair.delta.samples() < PROFILE_MIN_SAMPLES {
                    return None;
                }
                let (z, samples) = pair.delta.z_score(rssi - primary_rssi)?;
                Some(ZScore {
                    scanner_address: scanner.clone(),
                    z,
                    samples,
                })
            })
            .collect()
    }

    /// Absolute z-scores of `readings` against mature absolute estimators
    pub fn absolute_z_scores(&self, readings: &BTreeMap<ScannerAddress, f32>) -> Vec<ZScore> {
        readings
            .iter()
            .filter_map(|(scanner, rssi)| {
                let absolute = self.absolute.get(scanner)?;
                if absolute.rssi.samples() < PROFILE_MIN_SAMPLES {
                    return None;
                }
                let (z, samples) = absolute.rssi.z_score(*rssi)?;
                Some(ZScore {
                    scanner_address: scanner.clone(),
                    z,
                    samples,
                })
            })
            .collect()
    }

    /// Expected RSSI and σ for a scanner with a mature absolute estimator
    pub fn expected_rssi(&self, scanner: &str) -> Option<(f32, f32)> {
        let absolute = self.absolute.get(scanner)?;
        if absolute.rssi.samples() < PROFILE_MIN_SAMPLES {
            return None;
        }
        absolute
            .rssi
            .expected()
            .map(|(mean, spread)| (mean, libm::sqrtf(spread)))
    }

    /// Scanners with mature absolute estimators
    pub fn trained_scanner_addresses(&self) -> BTreeSet<ScannerAddress> {
        self.absolute
            .iter()
            .filter(|(_, absolute)| absolute.rssi.samples() >= PROFILE_MIN_SAMPLES)
            .map(|(scanner, _)| scanner.clone())
            .collect()
    }

    /// Any estimator carries button-trained samples
    pub fn has_button_training(&self) -> bool {
        self.absolute
            .values()
            .any(|absolute| absolute.rssi.button_samples() > 0)
    }

    /// Number of mature absolute estimators
    pub fn mature_scanner_count(&self) -> usize {
        self.absolute
            .values()
            .filter(|absolute| absolute.rssi.samples() >= PROFILE_MIN_SAMPLES)
            .count()
    }

    /// Nothing learned yet
    pub fn is_empty(&self) -> bool {
        self.absolute.is_empty()
    }

    /// How well `readings` fit this fingerprint, in [0, 1]
    ///
    /// Combines delta z-scores (against the strongest reading as primary)
    /// with absolute z-scores, then scales by the share of trained scanners
    /// that are actually visible. `None` when no mature estimator overlaps
    /// the readings.
    pub fn match_score(&self, readings: &BTreeMap<ScannerAddress, f32>) -> Option<f32> {
        let trained = self.trained_scanner_addresses();
        if trained.is_empty() {
            return None;
        }
        let (primary, primary_rssi) = readings
            .iter()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(scanner, rssi)| (scanner.clone(), *rssi))?;

        let mut weighted: Vec<(f32, u32)> = self
            .z_scores(&primary, primary_rssi, readings)
            .into_iter()
            .map(|score| (score.z, score.samples))
            .collect();
        weighted.extend(
            self.absolute_z_scores(readings)
                .into_iter()
                .map(|score| (score.z, score.samples)),
        );
        if weighted.is_empty() {
            return None;
        }

        let visible = trained.iter().filter(|s| readings.contains_key(*s)).count();
        let coverage = visible as f32 / trained.len() as f32;
        Some(weighted_z_scores_to_confidence(&weighted, DEFAULT_Z_THRESHOLD) * coverage)
    }
}
