// THEORY:
// The kinematic estimator converts the selected blob's pixel geometry into
// robot-relative quantities:
//
// 1.  **Bearing**: the angle of the centroid around the image centre, measured
//     counter-clockwise from the positive x-axis with the y-axis flipped so
//     that "up in the image" is a positive angle. Always normalized to [0, 2π).
// 2.  **Distance**: `k / sqrt(area)`. This assumes pixel area falls off as
//     1/distance², a thin-lens approximation. `k` is an empirical per-class
//     constant that has to be tuned for every camera, lens and mount.
// 3.  **Physical Size**: a fixed diameter for the ball; for goals an ad hoc
//     `distance * pixels / divisor` heuristic that is not a calibrated
//     projection.
// 4.  **Velocity**: the polar fix is converted to Cartesian world coordinates
//     and finite-differenced against the track's previous fix over elapsed
//     wall-clock time. Frame-rate jitter feeds straight into the result; that
//     is accepted rather than resampled.

use crate::core_modules::blob::{Blob, FrameGeometry, Point};
use crate::core_modules::tracker::Fix;
use serde::Serialize;
use std::f64::consts::TAU;
use std::time::Duration;

/// Robot-relative Cartesian position in centimetres.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct WorldPosition {
    pub x: f64,
    pub y: f64,
}

impl WorldPosition {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Converts a (distance, bearing) fix into Cartesian coordinates.
    pub fn from_polar(distance: f64, theta: f64) -> Self {
        Self::new(distance * theta.cos(), distance * theta.sin())
    }
}

/// World-frame velocity in centimetres per second.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Velocity {
    pub x: f64,
    pub y: f64,
}

/// How a class's physical width and height are derived.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SizeModel {
    /// Known object diameter, independent of the image.
    Fixed { diameter_cm: f64 },
    /// `distance * pixel_dimension / divisor`.
    Proportional { divisor: f64 },
}

/// Class-specific constants for the estimator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calibration {
    /// `k` in `distance = k / sqrt(area)`.
    pub distance_constant: f64,
    pub size: SizeModel,
    /// Whether this class reports velocity.
    pub track_velocity: bool,
}

/// Everything the estimator derives for one selected blob.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Estimate {
    pub distance_cm: f64,
    /// Bearing in radians, in [0, 2π).
    pub theta: f64,
    pub width_cm: f64,
    pub height_cm: f64,
    pub position: WorldPosition,
    /// `None` on a first detection, on a non-positive time step, and for
    /// classes that do not track velocity.
    pub velocity: Option<Velocity>,
}

/// Bearing of `centroid` around the frame centre, in [0, 2π).
pub fn bearing(centroid: Point, frame: &FrameGeometry) -> f64 {
    let center = frame.center();
    let dx = centroid.x - center.x;
    // Image rows grow downward; flip so that up is positive.
    let dy = center.y - centroid.y;
    normalize_angle(dy.atan2(dx))
}

/// Folds an `atan2` result into [0, 2π).
pub fn normalize_angle(theta: f64) -> f64 {
    let mut theta = theta;
    if theta < 0.0 {
        theta += TAU;
    }
    // A tiny negative angle can round up to exactly 2π.
    if theta >= TAU {
        theta = 0.0;
    }
    theta
}

/// Inverse-square-root distance model. `None` for a zero area.
pub fn distance_from_area(area: u32, distance_constant: f64) -> Option<f64> {
    if area == 0 {
        return None;
    }
    Some(distance_constant / (area as f64).sqrt())
}

/// Physical (width, height) in centimetres.
pub fn physical_size(blob: &Blob, distance: f64, model: SizeModel) -> (f64, f64) {
    match model {
        SizeModel::Fixed { diameter_cm } => (diameter_cm, diameter_cm),
        SizeModel::Proportional { divisor } => (
            distance * blob.w as f64 / divisor,
            distance * blob.h as f64 / divisor,
        ),
    }
}

/// Velocity between the previous fix and `position` at time `at`.
///
/// `None` when there is no previous fix or the elapsed time is not positive.
pub fn finite_difference(previous: Option<Fix>, position: WorldPosition, at: Duration) -> Option<Velocity> {
    let previous = previous?;
    let elapsed = at.checked_sub(previous.at)?.as_secs_f64();
    if elapsed <= 0.0 {
        return None;
    }
    Some(Velocity {
        x: (position.x - previous.position.x) / elapsed,
        y: (position.y - previous.position.y) / elapsed,
    })
}

/// Runs the full estimator for one selected blob.
///
/// Returns `None` only for a zero-area blob, which the candidate filter
/// already removes.
pub fn estimate(
    blob: &Blob,
    frame: &FrameGeometry,
    calibration: &Calibration,
    previous: Option<Fix>,
    at: Duration,
) -> Option<Estimate> {
    let distance_cm = distance_from_area(blob.area, calibration.distance_constant)?;
    let theta = bearing(blob.centroid(), frame);
    let (width_cm, height_cm) = physical_size(blob, distance_cm, calibration.size);
    let position = WorldPosition::from_polar(distance_cm, theta);
    let velocity = if calibration.track_velocity {
        finite_difference(previous, position, at)
    } else {
        None
    };

    Some(Estimate {
        distance_cm,
        theta,
        width_cm,
        height_cm,
        position,
        velocity,
    })
}
