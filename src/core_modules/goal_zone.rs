//! Horizontal zone of the selected goal, driving three mutually exclusive
//! LEFT/CENTER/RIGHT indicator outputs.
//!
//! The boundaries sit a third of the half-frame width either side of the
//! centre. Toggling the physical outputs is left to the caller.

use crate::core_modules::blob::FrameGeometry;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GoalZone {
    Left,
    Center,
    Right,
}

impl GoalZone {
    /// Classifies a goal centroid x-coordinate.
    pub fn classify(cx: f64, frame: &FrameGeometry) -> Self {
        let center = (frame.width / 2) as f64;
        let margin = (frame.width / 6) as f64;
        if cx < center - margin {
            GoalZone::Left
        } else if cx > center + margin {
            GoalZone::Right
        } else {
            GoalZone::Center
        }
    }

    /// Output levels in (left, center, right) order. Exactly one is asserted.
    pub fn levels(self) -> (bool, bool, bool) {
        (
            self == GoalZone::Left,
            self == GoalZone::Center,
            self == GoalZone::Right,
        )
    }
}

impl fmt::Display for GoalZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            GoalZone::Left => "LEFT",
            GoalZone::Center => "CENTER",
            GoalZone::Right => "RIGHT",
        };
        f.write_str(label)
    }
}
