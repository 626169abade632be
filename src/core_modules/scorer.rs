// THEORY:
// The scorer turns the filtered candidate list of one class into a list of
// `ScoredCandidate`s. Each semantic class has exactly one policy:
//
// 1.  **Sphere policy** (ball): the ball is a specular sphere. Its color
//     segmentation is unreliable (highlights split it into pieces) but its
//     silhouette is stable, so the score is dominated by roundness with a
//     smaller term for a square bounding box. Candidates below a hard
//     circularity floor never score.
// 2.  **Rectangle policy** (goal): a weighted sum of how close the box is to
//     the expected panel aspect ratio, how big it is, how solid it is, and how
//     close it sits to the vertical middle of the frame. Size carries most of
//     the weight so that small, bright, high-aspect clutter (screw terminals,
//     tape) loses to the real panel. A continuity bonus rewards candidates near
//     the previous selection.
//
// Before rectangle scoring, a two-tier admission rule runs: a candidate that
// is much smaller than the largest one in the frame is only admitted when it
// is unambiguously goal-shaped on its own.
//
// All weights and thresholds come from `SphereWeights`/`RectangleWeights`, so
// differently tuned deployments are one implementation configured twice.

use crate::core_modules::blob::{Blob, FrameGeometry};
use serde::{Deserialize, Serialize};

/// Tunables for the sphere policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SphereWeights {
    pub roundness_weight: f64,
    pub aspect_weight: f64,
    /// Candidates with roundness strictly below this are discarded.
    pub roundness_floor: f64,
}

impl Default for SphereWeights {
    fn default() -> Self {
        Self {
            roundness_weight: 0.8,
            aspect_weight: 0.2,
            roundness_floor: 0.6,
        }
    }
}

/// Tunables for the rectangle policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RectangleWeights {
    pub rect_weight: f64,
    pub size_weight: f64,
    pub density_weight: f64,
    pub position_weight: f64,
    /// Added to the score of a candidate near the previous selection.
    pub continuity_bonus: f64,
    /// Exclusive radius, in pixels, for the continuity bonus.
    pub continuity_radius_px: f64,
    /// Area at which the size score saturates at 1.0.
    pub size_reference_area: f64,
    /// Aspect ratio with the best rectangle score.
    pub rect_peak_aspect: f64,
    /// Distance from the peak at which the rectangle score reaches 0.
    pub rect_falloff: f64,
    pub rect_min_aspect: f64,
    pub rect_max_aspect: f64,
    /// Candidates smaller than this fraction of the largest need to pass the shape gate.
    pub small_area_ratio: f64,
    pub gate_min_aspect: f64,
    pub gate_max_aspect: f64,
    pub gate_min_density: f64,
}

impl Default for RectangleWeights {
    fn default() -> Self {
        Self {
            rect_weight: 0.2,
            size_weight: 0.6,
            density_weight: 0.1,
            position_weight: 0.1,
            continuity_bonus: 0.2,
            continuity_radius_px: 50.0,
            size_reference_area: 3000.0,
            rect_peak_aspect: 2.0,
            rect_falloff: 2.0,
            rect_min_aspect: 1.0,
            rect_max_aspect: 6.0,
            small_area_ratio: 0.5,
            gate_min_aspect: 1.2,
            gate_max_aspect: 4.0,
            gate_min_density: 0.5,
        }
    }
}

/// The component scores that produced a candidate's total.
///
/// Components a policy does not use stay at 0.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct SubScores {
    /// Roundness (sphere) or rectangle-likeness (rectangle).
    pub shape: f64,
    /// Bounding-box squareness, sphere only.
    pub aspect: f64,
    pub size: f64,
    pub density: f64,
    pub position: f64,
    pub continuity: f64,
}

/// A surviving candidate and how it scored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredCandidate {
    pub blob: Blob,
    /// Weighted total. May exceed 1.0 when the continuity bonus applies.
    pub score: f64,
    pub parts: SubScores,
}

/// Scores ball candidates. Candidates under the roundness floor are dropped.
pub fn score_spheres(candidates: &[Blob], weights: &SphereWeights) -> Vec<ScoredCandidate> {
    candidates
        .iter()
        .filter_map(|blob| {
            if blob.roundness < weights.roundness_floor {
                log::trace!(
                    "sphere candidate at ({:.1}, {:.1}) below roundness floor: {:.2}",
                    blob.cx,
                    blob.cy,
                    blob.roundness
                );
                return None;
            }
            let aspect = (1.0 - (blob.aspect_ratio() - 1.0).abs()).max(0.0);
            let parts = SubScores {
                shape: blob.roundness,
                aspect,
                ..SubScores::default()
            };
            let score = weights.roundness_weight * parts.shape + weights.aspect_weight * parts.aspect;
            Some(ScoredCandidate {
                blob: blob.clone(),
                score,
                parts,
            })
        })
        .collect()
}

/// Rectangle-likeness: peaks at the configured aspect ratio and is 0 outside the accepted range.
pub fn rect_score(aspect: f64, weights: &RectangleWeights) -> f64 {
    if aspect < weights.rect_min_aspect || aspect > weights.rect_max_aspect {
        return 0.0;
    }
    1.0 - ((aspect - weights.rect_peak_aspect).abs() / weights.rect_falloff).min(1.0)
}

/// Vertical position score: 1.0 on the horizontal midline, 0.0 at the top or bottom edge.
pub fn position_score(cy: f64, frame: &FrameGeometry) -> f64 {
    let offset = (cy / frame.height as f64 - 0.5).abs();
    1.0 - (offset * 2.0).min(1.0)
}

/// The strict gate a small candidate must pass to be admitted next to a much larger one.
pub fn passes_shape_gate(blob: &Blob, weights: &RectangleWeights) -> bool {
    let aspect = blob.aspect_ratio();
    aspect > weights.gate_min_aspect && aspect < weights.gate_max_aspect && blob.density > weights.gate_min_density
}

/// Scores goal candidates.
///
/// `previous` is the class's last selected blob, if the track still holds one.
pub fn score_rectangles(
    candidates: &[Blob],
    weights: &RectangleWeights,
    frame: &FrameGeometry,
    previous: Option<&Blob>,
) -> Vec<ScoredCandidate> {
    let largest_area = candidates.iter().map(|b| b.area).max().unwrap_or(0) as f64;

    candidates
        .iter()
        .filter(|blob| {
            // Two-tier admission: big enough by size, or small but clearly goal-shaped.
            let small = (blob.area as f64) < largest_area * weights.small_area_ratio;
            let admitted = !small || passes_shape_gate(blob, weights);
            if !admitted {
                log::trace!(
                    "rectangle candidate at ({:.1}, {:.1}) dropped: area {} vs largest {}",
                    blob.cx,
                    blob.cy,
                    blob.area,
                    largest_area
                );
            }
            admitted
        })
        .map(|blob| {
            let continuity = match previous {
                Some(last) if blob.centroid().distance_to(&last.centroid()) < weights.continuity_radius_px => {
                    weights.continuity_bonus
                }
                _ => 0.0,
            };
            let parts = SubScores {
                shape: rect_score(blob.aspect_ratio(), weights),
                aspect: 0.0,
                size: (blob.area as f64 / weights.size_reference_area).min(1.0),
                density: blob.density.clamp(0.0, 1.0),
                position: position_score(blob.cy, frame),
                continuity,
            };
            let score = weights.rect_weight * parts.shape
                + weights.size_weight * parts.size
                + weights.density_weight * parts.density
                + weights.position_weight * parts.position
                + parts.continuity;
            ScoredCandidate {
                blob: blob.clone(),
                score,
                parts,
            }
        })
        .collect()
}
