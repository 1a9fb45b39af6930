//! Multi-scanner RSSI fusion
//!
//! ## Overview
//!
//! Each device owns one [`UnscentedKalmanFilter`] whose state vector holds
//! one latent RSSI level per scanner that currently sees it. Readings that
//! arrive in the same cycle are folded in together, so the fused state
//! reflects the *pattern* across scanners rather than whichever scanner
//! reported last.
//!
//! ```text
//! scanner A ──┐
//! scanner B ──┼─→ UKF (random walk) ─→ fused RSSI + covariance
//! scanner N ──┘                              │
//!                                            ▼
//!                          match against AreaProfile / RoomProfile
//! ```
//!
//! ## Matching
//!
//! For every candidate area the fused state is compared to the learned
//! absolute fingerprint:
//!
//! ```text
//! d²ᵢ    = (x̂ᵢ − μᵢ)² / (σᵢ² + Pᵢᵢ)        trained scanner i in state
//! d²ᵢ    = D²_missing                      trained scanner i not visible
//! score  = 1 / (1 + mean d²) · (1 − w · offline_fraction)
//! ```
//!
//! Device profiles are preferred; room profiles stand in when the device
//! has no mature history for the candidate.
//!
//! ## Numerical Stability
//!
//! - Covariance is symmetrised after every correction
//! - Diagonal is clamped to `[UKF_MIN_VARIANCE, UKF_MAX_VARIANCE]`
//! - A failed Cholesky or inversion returns [`FusionError`] and the caller
//!   re-creates the filter

pub mod matrix;
pub mod ukf;

pub use crate::errors::FusionError;
pub use ukf::{FingerprintMatch, UnscentedKalmanFilter};
