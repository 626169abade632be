// THEORY:
// The candidate filter is the first stage of the per-class pass. It removes
// blobs that cannot physically be the target before any scoring happens:
// oversized regions (large specular highlights on the field), partial objects
// cut by the frame edge, and degenerate boxes that would poison the ratio and
// distance math further down. It is a pure function of its inputs and keeps
// the order in which the blob source produced the candidates, because the
// selector uses first-seen order as its tie-break.

use crate::core_modules::blob::{Blob, FrameGeometry};
use serde::{Deserialize, Serialize};

/// Physical-plausibility bounds for one semantic class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Blobs with an area above this are rejected. `None` disables the bound.
    pub max_area: Option<u32>,
    /// Reject blobs whose bounding box touches any frame edge.
    pub reject_border: bool,
}

impl FilterConfig {
    /// Bounds used for the reflective ball.
    pub fn sphere() -> Self {
        Self {
            max_area: Some(5000),
            reject_border: true,
        }
    }

    /// Bounds used for goal panels.
    pub fn rectangle() -> Self {
        Self {
            max_area: None,
            reject_border: false,
        }
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self::rectangle()
    }
}

/// Why a blob was dropped. Only used for trace logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    Degenerate,
    TooLarge,
    TouchesBorder,
}

/// Returns the reason `blob` cannot be a candidate, if any.
pub fn rejection(blob: &Blob, frame: &FrameGeometry, config: &FilterConfig) -> Option<Rejection> {
    if blob.is_degenerate() {
        return Some(Rejection::Degenerate);
    }
    if config.max_area.is_some_and(|max| blob.area > max) {
        return Some(Rejection::TooLarge);
    }
    if config.reject_border && frame.touches_border(blob) {
        return Some(Rejection::TouchesBorder);
    }
    None
}

/// Drops every blob that fails the class bounds, preserving input order.
pub fn filter_candidates<I>(blobs: I, frame: &FrameGeometry, config: &FilterConfig) -> Vec<Blob>
where
    I: IntoIterator<Item = Blob>,
{
    blobs
        .into_iter()
        .filter(|blob| match rejection(blob, frame, config) {
            Some(reason) => {
                log::trace!("rejected blob at ({:.1}, {:.1}): {:?}", blob.cx, blob.cy, reason);
                false
            }
            None => true,
        })
        .collect()
}
