//! Per-decision diagnostic record
//!
//! Rebuilt for every device on every cycle. Not used for decisions; the
//! [`core::fmt::Display`] form is what hosts show as the "area switch
//! reason".

use core::fmt;

use heapless::Vec as HVec;

use crate::{errors::UkfRejection, model::AreaId};

/// Notes kept per decision; extra notes are dropped
pub const MAX_REASONS: usize = 8;

/// Which strategy produced the applied decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DecisionPath {
    /// UKF fingerprint match
    Ukf,
    /// Lone-scanner retention of the current area
    UkfRetention,
    /// Min-distance tournament
    MinDistance,
    /// Within-radius or RSSI-only fallback
    Fallback,
    /// Manual area lock
    Locked,
    /// Nothing usable; area cleared
    Cleared,
}

impl DecisionPath {
    fn as_str(self) -> &'static str {
        match self {
            Self::Ukf => "ukf",
            Self::UkfRetention => "ukf-retention",
            Self::MinDistance => "min-distance",
            Self::Fallback => "fallback",
            Self::Locked => "locked",
            Self::Cleared => "cleared",
        }
    }
}

/// What happened during one device's decision
#[derive(Debug, Clone, PartialEq)]
pub struct AreaTests {
    /// Winning path
    pub path: DecisionPath,
    /// Area before the decision
    pub incumbent_area: Option<AreaId>,
    /// Area the winning path preferred
    pub challenger_area: Option<AreaId>,
    /// Incumbent distance (m)
    pub incumbent_distance: Option<f32>,
    /// Challenger distance (m), virtual for scannerless rooms
    pub challenger_distance: Option<f32>,
    /// Challenger on the incumbent's floor
    pub same_floor: Option<bool>,
    /// Best UKF score considered
    pub ukf_score: Option<f32>,
    /// Why the UKF path declined
    pub ukf_rejection: Option<UkfRejection>,
    /// Streak after this cycle
    pub streak: u32,
    /// Streak required to commit
    pub streak_target: u32,
    /// Free-form notes, oldest first
    pub reasons: HVec<&'static str, MAX_REASONS>,
}

impl AreaTests {
    /// Empty record for `path` starting from `incumbent_area`
    pub fn new(path: DecisionPath, incumbent_area: Option<AreaId>) -> Self {
        Self {
            path,
            incumbent_area,
            challenger_area: None,
            incumbent_distance: None,
            challenger_distance: None,
            same_floor: None,
            ukf_score: None,
            ukf_rejection: None,
            streak: 0,
            streak_target: 0,
            reasons: HVec::new(),
        }
    }

    /// Append a note, dropping it when the record is full
    pub fn note(&mut self, reason: &'static str) {
        let _ = self.reasons.push(reason);
    }

    /// Decision switched areas
    pub fn switched(&self) -> bool {
        self.challenger_area.is_some() && self.challenger_area != self.incumbent_area
    }
}

impl fmt::Display for AreaTests {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} -> {}",
            self.path.as_str(),
            self.incumbent_area.as_deref().unwrap_or("none"),
            self.challenger_area.as_deref().unwrap_or("none"),
        )?;
        if let (Some(incumbent), Some(challenger)) =
            (self.incumbent_distance, self.challenger_distance)
        {
            write!(f, " ({:.2}m vs {:.2}m)", incumbent, challenger)?;
        } else if let Some(challenger) = self.challenger_distance {
            write!(f, " ({:.2}m)", challenger)?;
        }
        if self.same_floor == Some(false) {
            f.write_str(" cross-floor")?;
        }
        if let Some(score) = self.ukf_score {
            write!(f, " score={:.2}", score)?;
        }
        if self.streak_target > 0 {
            write!(f, " streak={}/{}", self.streak, self.streak_target)?;
        }
        if let Some(rejection) = self.ukf_rejection {
            write!(f, " ukf-rejected: {}", rejection)?;
        }
        for reason in &self.reasons {
            write!(f, "; {}", reason)?;
        }
        Ok(())
    }
}
