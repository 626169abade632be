// THEORY:
// The `tracker` module adds memory to the otherwise stateless per-frame pass.
// There is exactly one `TrackState` per semantic class (ball, goal-A, goal-B);
// there is no data association between several instances of the same class.
//
// Key architectural principles:
// 1.  **Explicit Lifecycle**: A `TrackState` is constructed once at startup,
//     owned by the pipeline, and mutated exactly once per frame by either
//     `record_hit` or `record_miss`. Nothing else writes to it.
// 2.  **Three Phases**:
//     - **Idle**: no recent detection, confidence 0, nothing remembered.
//     - **Tracking**: the class was selected in the most recent frame.
//     - **Coasting**: recent misses, but still inside the grace window. The
//       last selection and last world position are kept so that the scorer
//       can apply its continuity bonus and the estimator can still
//       finite-difference against the last fix when the object reappears.
// 3.  **Recovery, Not Failure**: once the miss streak exceeds the grace
//     window, the track is wiped back to Idle. The next hit is then treated as
//     a first detection (no velocity).

use crate::core_modules::blob::Blob;
use crate::core_modules::kinematics::WorldPosition;
use crate::core_modules::scorer::ScoredCandidate;
use serde::Serialize;
use std::time::Duration;

/// Frames a track may miss before it is declared lost.
pub const DEFAULT_GRACE_WINDOW: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum TrackPhase {
    #[default]
    Idle,
    Tracking,
    Coasting,
}

/// The last fix the estimator can difference against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fix {
    pub position: WorldPosition,
    pub at: Duration,
}

/// Per-class tracking memory.
#[derive(Debug, Clone)]
pub struct TrackState {
    /// The blob selected in the most recent hit.
    last_blob: Option<Blob>,
    /// World position and timestamp of the most recent hit.
    last_fix: Option<Fix>,
    /// round(100 * score) of the most recent hit, 0 when Idle.
    confidence: u8,
    /// Incremented on hits, decremented (saturating) on misses.
    consecutive_hits: u32,
    /// Length of the current miss streak.
    misses: u32,
    phase: TrackPhase,
    grace_window: u32,
}

impl TrackState {
    pub fn new(grace_window: u32) -> Self {
        Self {
            last_blob: None,
            last_fix: None,
            confidence: 0,
            consecutive_hits: 0,
            misses: 0,
            phase: TrackPhase::Idle,
            grace_window,
        }
    }

    pub fn phase(&self) -> TrackPhase {
        self.phase
    }

    pub fn confidence(&self) -> u8 {
        self.confidence
    }

    pub fn consecutive_hits(&self) -> u32 {
        self.consecutive_hits
    }

    pub fn misses(&self) -> u32 {
        self.misses
    }

    /// The previous selection, used by the continuity bonus.
    pub fn last_selection(&self) -> Option<&Blob> {
        self.last_blob.as_ref()
    }

    /// The previous world fix. `None` on the first detection after Idle.
    pub fn last_fix(&self) -> Option<Fix> {
        self.last_fix
    }

    /// Records that `candidate` was selected this frame at world `position`.
    ///
    /// The last fix only advances when `at` is later than it, so a repeated
    /// or backwards timestamp leaves the velocity baseline where it was.
    /// Returns the phase the track was in before the hit.
    pub fn record_hit(&mut self, candidate: &ScoredCandidate, position: WorldPosition, at: Duration) -> TrackPhase {
        let previous = self.phase;
        self.confidence = (candidate.score * 100.0).round().clamp(0.0, 100.0) as u8;
        self.consecutive_hits = self.consecutive_hits.saturating_add(1);
        self.misses = 0;
        self.last_blob = Some(candidate.blob.clone());
        // A fix that does not move time forward never replaces the baseline.
        if self.last_fix.is_none_or(|fix| at > fix.at) {
            self.last_fix = Some(Fix { position, at });
        }
        self.phase = TrackPhase::Tracking;
        previous
    }

    /// Records a frame with no selection.
    ///
    /// Returns `true` when this miss pushed the track from Coasting to Idle.
    pub fn record_miss(&mut self) -> bool {
        self.consecutive_hits = self.consecutive_hits.saturating_sub(1);
        self.misses = self.misses.saturating_add(1);

        if self.phase == TrackPhase::Idle {
            return false;
        }

        if self.misses > self.grace_window {
            self.reset();
            return true;
        }

        self.phase = TrackPhase::Coasting;
        false
    }

    fn reset(&mut self) {
        self.last_blob = None;
        self.last_fix = None;
        self.confidence = 0;
        self.consecutive_hits = 0;
        self.phase = TrackPhase::Idle;
    }
}

impl Default for TrackState {
    fn default() -> Self {
        Self::new(DEFAULT_GRACE_WINDOW)
    }
}
