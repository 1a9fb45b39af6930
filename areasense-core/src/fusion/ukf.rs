//! Per-device Unscented Kalman Filter over scanner RSSI

use alloc::{
    collections::{BTreeMap, BTreeSet},
    vec,
    vec::Vec,
};

use super::matrix::{self, Matrix};
use crate::{
    constants::ukf::{
        UKF_ALPHA, UKF_BETA, UKF_INITIAL_VARIANCE, UKF_KAPPA, UKF_MAX_VARIANCE,
        UKF_MEASUREMENT_NOISE, UKF_MIN_VARIANCE, UKF_MISSING_SCANNER_D2,
        UKF_OFFLINE_PENALTY_WEIGHT, UKF_PROCESS_NOISE, UKF_STALE_AFTER_S,
    },
    correlation::{AreaProfile, Fingerprint, RoomProfile},
    errors::FusionError,
    model::{AreaId, ScannerAddress},
    time::{elapsed, Timestamp},
};

/// Score of one candidate area against the fused state
#[derive(Debug, Clone, PartialEq)]
pub struct FingerprintMatch {
    /// Candidate area
    pub area_id: AreaId,
    /// Mean normalised squared distance over trained scanners
    pub d_squared: f32,
    /// Match score in [0, 1], higher is better
    pub score: f32,
    /// Fraction of the score removed for offline trained scanners
    pub coverage_penalty: f32,
    /// Matched against the device's own profile rather than the room's
    pub device_profile: bool,
}

/// Random-walk UKF with one state entry per scanner
#[derive(Debug, Clone, Default)]
pub struct UnscentedKalmanFilter {
    scanners: Vec<ScannerAddress>,
    x: Vec<f32>,
    p: Matrix,
    last_seen: Vec<Timestamp>,
    last_update: Option<Timestamp>,
}

impl UnscentedKalmanFilter {
    /// Empty filter
    pub fn new() -> Self {
        Self::default()
    }

    /// Scanners currently in the state
    pub fn scanner_count(&self) -> usize {
        self.scanners.len()
    }

    /// Time of the last correction
    pub fn last_update(&self) -> Option<Timestamp> {
        self.last_update
    }

    /// Fused RSSI and its variance for `scanner`
    pub fn state_of(&self, scanner: &str) -> Option<(f32, f32)> {
        let index = self.index_of(scanner)?;
        Some((self.x[index], self.p[index][index]))
    }

    fn index_of(&self, scanner: &str) -> Option<usize> {
        self.scanners.iter().position(|s| s == scanner)
    }

    fn weights(n: usize) -> (f32, Vec<f32>, Vec<f32>) {
        let n_f = n as f32;
        let lambda = UKF_ALPHA * UKF_ALPHA * (n_f + UKF_KAPPA) - n_f;
        let wi = 1.0 / (2.0 * (n_f + lambda));
        let w0_m = lambda / (n_f + lambda);
        let w0_c = w0_m + (1.0 - UKF_ALPHA * UKF_ALPHA + UKF_BETA);
        let mut weights_m = vec![wi; 2 * n + 1];
        let mut weights_c = vec![wi; 2 * n + 1];
        weights_m[0] = w0_m;
        weights_c[0] = w0_c;
        (lambda, weights_m, weights_c)
    }

    fn sigma_points(&self, lambda: f32) -> Result<Vec<Vec<f32>>, FusionError> {
        let n = self.x.len();
        let scale = n as f32 + lambda;
        let scaled: Matrix = self
            .p
            .iter()
            .map(|row| row.iter().map(|v| v * scale).collect())
            .collect();
        let l = matrix::cholesky(&scaled).ok_or(FusionError::NotPositiveDefinite)?;

        let mut sigmas = Vec::with_capacity(2 * n + 1);
        sigmas.push(self.x.clone());
        for sign in [1.0_f32, -1.0] {
            for j in 0..n {
                sigmas.push((0..n).map(|i| self.x[i] + sign * l[i][j]).collect());
            }
        }
        Ok(sigmas)
    }

    fn clamp_diagonal(&mut self) {
        for (i, row) in self.p.iter_mut().enumerate() {
            row[i] = row[i].clamp(UKF_MIN_VARIANCE, UKF_MAX_VARIANCE);
        }
    }

    /// Propagate the state `dt` seconds forward
    ///
    /// The random-walk model leaves the mean unchanged and widens the
    /// covariance by `Q·dt`.
    pub fn predict(&mut self, dt: f32) -> Result<(), FusionError> {
        let n = self.x.len();
        if n == 0 {
            return Ok(());
        }
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        let (lambda, weights_m, weights_c) = Self::weights(n);
        let sigmas = self.sigma_points(lambda)?;

        let mut mean = vec![0.0; n];
        for (sigma, w) in sigmas.iter().zip(weights_m.iter()) {
            for (m, s) in mean.iter_mut().zip(sigma.iter()) {
                *m += w * s;
            }
        }

        let mut cov = matrix::zeros(n, n);
        for (sigma, w) in sigmas.iter().zip(weights_c.iter()) {
            for i in 0..n {
                let di = sigma[i] - mean[i];
                for j in 0..n {
                    cov[i][j] += w * di * (sigma[j] - mean[j]);
                }
            }
        }
        for (i, row) in cov.iter_mut().enumerate() {
            row[i] += UKF_PROCESS_NOISE * dt;
        }

        self.x = mean;
        self.p = cov;
        matrix::make_symmetric(&mut self.p);
        self.clamp_diagonal();
        self.check_finite()
    }

    /// Predict up to `now` using the time since the last correction
    pub fn predict_to(&mut self, now: Timestamp) -> Result<(), FusionError> {
        let dt = self.last_update.map_or(0.0, |last| elapsed(last, now)) as f32;
        self.predict(dt)
    }

    /// Fold in simultaneous readings from several scanners
    ///
    /// Scanners seen for the first time join the state at their reading
    /// with `UKF_INITIAL_VARIANCE`.
    pub fn update_multi(
        &mut self,
        readings: &BTreeMap<ScannerAddress, f32>,
        now: Timestamp,
    ) -> Result<(), FusionError> {
        let observed: Vec<(usize, f32)> = {
            let mut observed = Vec::with_capacity(readings.len());
            for (scanner, rssi) in readings {
                if !rssi.is_finite() {
                    continue;
                }
                let index = match self.index_of(scanner) {
                    Some(index) => index,
                    None => self.add_scanner(scanner.clone(), *rssi),
                };
                self.last_seen[index] = now;
                observed.push((index, *rssi));
            }
            observed
        };
        self.last_update = Some(now);
        if observed.is_empty() {
            return Ok(());
        }

        let n = self.x.len();
        let m = observed.len();
        let (lambda, weights_m, weights_c) = Self::weights(n);
        let sigmas = self.sigma_points(lambda)?;

        // h(x) selects the observed components
        let projected: Vec<Vec<f32>> = sigmas
            .iter()
            .map(|sigma| observed.iter().map(|(i, _)| sigma[*i]).collect())
            .collect();

        let mut z_pred = vec![0.0; m];
        for (z, w) in projected.iter().zip(weights_m.iter()) {
            for (acc, value) in z_pred.iter_mut().zip(z.iter()) {
                *acc += w * value;
            }
        }

        let mut s = matrix::scaled_identity(m, UKF_MEASUREMENT_NOISE);
        let mut pxz = matrix::zeros(n, m);
        for ((sigma, z), w) in sigmas.iter().zip(projected.iter()).zip(weights_c.iter()) {
            for a in 0..m {
                let dza = z[a] - z_pred[a];
                for b in 0..m {
                    s[a][b] += w * dza * (z[b] - z_pred[b]);
                }
                for i in 0..n {
                    pxz[i][a] += w * (sigma[i] - self.x[i]) * dza;
                }
            }
        }

        let s_inv = matrix::invert(&s).ok_or(FusionError::SingularInnovation)?;
        let gain = matrix::multiply(&pxz, &s_inv);

        let innovation: Vec<f32> = observed
            .iter()
            .zip(z_pred.iter())
            .map(|((_, rssi), predicted)| rssi - predicted)
            .collect();
        for (i, row) in gain.iter().enumerate() {
            self.x[i] += row.iter().zip(innovation.iter()).map(|(k, y)| k * y).sum::<f32>();
        }

        let ks = matrix::multiply(&gain, &s);
        let kskt = matrix::multiply(&ks, &matrix::transpose(&gain));
        for (row, correction) in self.p.iter_mut().zip(kskt.iter()) {
            for (value, c) in row.iter_mut().zip(correction.iter()) {
                *value -= c;
            }
        }
        matrix::make_symmetric(&mut self.p);
        self.clamp_diagonal();
        self.check_finite()
    }

    fn add_scanner(&mut self, scanner: ScannerAddress, rssi: f32) -> usize {
        for row in self.p.iter_mut() {
            row.push(0.0);
        }
        let n = self.x.len() + 1;
        let mut row = vec![0.0; n];
        row[n - 1] = UKF_INITIAL_VARIANCE;
        self.p.push(row);
        self.x.push(rssi);
        self.last_seen.push(0.0);
        self.scanners.push(scanner);
        n - 1
    }

    fn remove_index(&mut self, index: usize) {
        self.scanners.remove(index);
        self.x.remove(index);
        self.last_seen.remove(index);
        self.p.remove(index);
        for row in self.p.iter_mut() {
            row.remove(index);
        }
    }

    /// Drop scanners not observed for `UKF_STALE_AFTER_S`
    pub fn prune_stale(&mut self, now: Timestamp) -> usize {
        let mut removed = 0;
        let mut index = 0;
        while index < self.scanners.len() {
            if elapsed(self.last_seen[index], now) > UKF_STALE_AFTER_S {
                self.remove_index(index);
                removed += 1;
            } else {
                index += 1;
            }
        }
        removed
    }

    fn check_finite(&self) -> Result<(), FusionError> {
        let finite = self.x.iter().all(|v| v.is_finite())
            && self.p.iter().flatten().all(|v| v.is_finite());
        if finite {
            Ok(())
        } else {
            Err(FusionError::NonFinite)
        }
    }

    /// Score one fingerprint against the fused state
    ///
    /// `None` when the fingerprint has no mature scanner.
    pub fn match_fingerprint(
        &self,
        fingerprint: &Fingerprint,
        offline: &BTreeSet<ScannerAddress>,
    ) -> Option<(f32, f32, f32)> {
        let trained = fingerprint.trained_scanner_addresses();
        if trained.is_empty() {
            return None;
        }

        let mut total = 0.0;
        let mut offline_count = 0usize;
        for scanner in &trained {
            if offline.contains(scanner) {
                offline_count += 1;
            }
            let term = match (self.state_of(scanner), fingerprint.expected_rssi(scanner)) {
                (Some((fused, variance)), Some((mean, sigma))) => {
                    let diff = fused - mean;
                    diff * diff / (sigma * sigma + variance).max(f32::EPSILON)
                }
                _ => UKF_MISSING_SCANNER_D2,
            };
            total += term;
        }

        let d_squared = total / trained.len() as f32;
        let coverage_penalty =
            UKF_OFFLINE_PENALTY_WEIGHT * offline_count as f32 / trained.len() as f32;
        let score = (1.0 / (1.0 + d_squared)) * (1.0 - coverage_penalty);
        Some((d_squared, score.clamp(0.0, 1.0), coverage_penalty))
    }

    /// Score every candidate area, best first
    ///
    /// The device's own profile is used when it has mature data for the
    /// candidate, otherwise the room profile.
    pub fn match_fingerprints(
        &self,
        device_profiles: Option<&BTreeMap<AreaId, AreaProfile>>,
        room_profiles: &BTreeMap<AreaId, RoomProfile>,
        offline: &BTreeSet<ScannerAddress>,
    ) -> Vec<FingerprintMatch> {
        if self.scanners.is_empty() {
            return Vec::new();
        }

        let mut candidates: BTreeSet<&AreaId> = room_profiles.keys().collect();
        if let Some(profiles) = device_profiles {
            candidates.extend(profiles.keys());
        }

        let mut matches: Vec<FingerprintMatch> = candidates
            .into_iter()
            .filter_map(|area_id| {
                let device = device_profiles
                    .and_then(|profiles| profiles.get(area_id))
                    .filter(|profile| profile.is_mature());
                let (fingerprint, device_profile) = match device {
                    Some(profile) => (profile.fingerprint(), true),
                    None => (
                        room_profiles
                            .get(area_id)
                            .filter(|room| room.is_mature())?
                            .fingerprint(),
                        false,
                    ),
                };
                let (d_squared, score, coverage_penalty) =
                    self.match_fingerprint(fingerprint, offline)?;
                Some(FingerprintMatch {
                    area_id: area_id.clone(),
                    d_squared,
                    score,
                    coverage_penalty,
                    device_profile,
                })
            })
            .collect();

        matches.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.area_id.cmp(&b.area_id))
        });
        matches
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::correlation::ScannerStamps;
    use alloc::string::String;

    fn readings(entries: &[(&str, f32)]) -> BTreeMap<ScannerAddress, f32> {
        entries.iter().map(|(a, r)| (String::from(*a), *r)).collect()
    }

    fn trained_profile(area: &str, pattern: &[(&str, f32)]) -> AreaProfile {
        let mut profile = AreaProfile::new(area);
        let (primary, primary_rssi) = pattern[0];
        let others = readings(&pattern[1..]);
        for step in 0..10 {
            let now = 100.0 + step as f64 * 10.0;
            let stamps: ScannerStamps = [(String::from(primary), now)].into_iter().collect();
            assert!(profile.update(primary_rssi, &others, primary, now, None, &stamps));
        }
        profile
    }

    #[test]
    fn new_scanners_join_at_their_reading() {
        let mut ukf = UnscentedKalmanFilter::new();
        ukf.update_multi(&readings(&[("a", -60.0), ("b", -75.0)]), 1.0)
            .unwrap();
        assert_eq!(ukf.scanner_count(), 2);
        let (rssi, variance) = ukf.state_of("a").unwrap();
        assert!((rssi + 60.0).abs() < 1e-3);
        assert!(variance < UKF_INITIAL_VARIANCE);
    }

    #[test]
    fn state_tracks_readings() {
        let mut ukf = UnscentedKalmanFilter::new();
        ukf.update_multi(&readings(&[("a", -60.0)]), 0.0).unwrap();
        for step in 1..30 {
            ukf.predict(1.0).unwrap();
            ukf.update_multi(&readings(&[("a", -70.0)]), step as f64)
                .unwrap();
        }
        let (rssi, _) = ukf.state_of("a").unwrap();
        assert!((rssi + 70.0).abs() < 1.0, "rssi = {}", rssi);
    }

    #[test]
    fn predict_widens_covariance() {
        let mut ukf = UnscentedKalmanFilter::new();
        ukf.update_multi(&readings(&[("a", -60.0)]), 0.0).unwrap();
        let (_, before) = ukf.state_of("a").unwrap();
        ukf.predict(5.0).unwrap();
        let (_, after) = ukf.state_of("a").unwrap();
        assert!(after > before);
    }

    #[test]
    fn stale_scanners_are_pruned() {
        let mut ukf = UnscentedKalmanFilter::new();
        ukf.update_multi(&readings(&[("a", -60.0), ("b", -70.0)]), 0.0)
            .unwrap();
        ukf.update_multi(&readings(&[("a", -60.0)]), 100.0).unwrap();
        assert_eq!(ukf.prune_stale(100.0), 1);
        assert!(ukf.state_of("b").is_none());
        assert!(ukf.state_of("a").is_some());
    }

    #[test]
    fn best_matching_area_ranks_first() {
        let mut profiles = BTreeMap::new();
        profiles.insert(
            String::from("kitchen"),
            trained_profile("kitchen", &[("a", -55.0), ("b", -75.0)]),
        );
        profiles.insert(
            String::from("office"),
            trained_profile("office", &[("b", -55.0), ("a", -75.0)]),
        );

        let mut ukf = UnscentedKalmanFilter::new();
        ukf.update_multi(&readings(&[("a", -56.0), ("b", -74.0)]), 500.0)
            .unwrap();

        let matches = ukf.match_fingerprints(Some(&profiles), &BTreeMap::new(), &BTreeSet::new());
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].area_id, "kitchen");
        assert!(matches[0].score > matches[1].score);
        assert!(matches[0].device_profile);
    }

    #[test]
    fn offline_trained_scanner_lowers_score() {
        let profile = trained_profile("kitchen", &[("a", -55.0), ("b", -75.0)]);
        let mut ukf = UnscentedKalmanFilter::new();
        ukf.update_multi(&readings(&[("a", -55.0), ("b", -75.0)]), 500.0)
            .unwrap();

        let online = ukf
            .match_fingerprint(profile.fingerprint(), &BTreeSet::new())
            .unwrap();
        let offline: BTreeSet<ScannerAddress> = [String::from("b")].into_iter().collect();
        let degraded = ukf
            .match_fingerprint(profile.fingerprint(), &offline)
            .unwrap();
        assert!(degraded.1 < online.1);
        assert!((degraded.2 - 0.25).abs() < 1e-6);
    }
}
