// THEORY:
// The `blob` module holds the raw geometry that the rest of the engine reasons
// about. A `Blob` is one connected region of pixels that matched a color-range
// predicate in a single frame. The segmentation primitive that produces it is
// outside this crate; we only consume its output.
//
// Key architectural principles:
// 1.  **Stateless Data Container**: A `Blob` is a "dumb" snapshot. It has no
//     memory of previous frames and is never mutated after it is produced.
//     Temporal memory lives in the `tracker` module.
// 2.  **Frame-Scoped Lifetime**: Blobs are created fresh for every frame and are
//     discarded at the end of that frame's pass. Only the one selected blob per
//     class is copied into the long-lived `TrackState`.
// 3.  **Frame Geometry**: Several stages need the frame's pixel dimensions
//     (border rejection, bearing, vertical position score). `FrameGeometry`
//     bundles them so that no stage has to guess the camera resolution.

use serde::{Deserialize, Serialize};

/// A simple struct to represent a 2D point in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point, in pixels.
    pub fn distance_to(&self, other: &Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// A single color-segmented region detected in one frame.
///
/// Field names follow the blob records emitted by the segmentation stage, so a
/// JSON record such as `{"x":10,"y":20,"w":30,"h":15,...}` deserializes directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Blob {
    /// Left edge of the bounding box.
    pub x: u32,
    /// Top edge of the bounding box.
    pub y: u32,
    /// Bounding box width.
    pub w: u32,
    /// Bounding box height.
    pub h: u32,
    /// Number of pixels that matched the color predicate.
    pub pixels: u32,
    /// Area used for size reasoning (bounding-box area or filled count, depending on the source).
    pub area: u32,
    /// Centroid x.
    pub cx: f64,
    /// Centroid y.
    pub cy: f64,
    /// Filled pixels over bounding-box area, in [0, 1].
    #[serde(default)]
    pub density: f64,
    /// Circularity, near 1.0 for round regions.
    #[serde(default)]
    pub roundness: f64,
}

impl Blob {
    pub fn centroid(&self) -> Point {
        Point::new(self.cx, self.cy)
    }

    /// Width over height. Callers must have rejected zero-height blobs first.
    pub fn aspect_ratio(&self) -> f64 {
        self.w as f64 / self.h as f64
    }

    /// A blob that cannot take part in any ratio or distance math.
    pub fn is_degenerate(&self) -> bool {
        self.h == 0 || self.area == 0
    }
}

/// Pixel dimensions of the frame the blobs were extracted from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameGeometry {
    pub width: u32,
    pub height: u32,
}

impl FrameGeometry {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Image centre, using integer halving the way the camera firmware reports it.
    pub fn center(&self) -> Point {
        Point::new((self.width / 2) as f64, (self.height / 2) as f64)
    }

    /// True when the blob's bounding box lies on any edge of the frame.
    pub fn touches_border(&self, blob: &Blob) -> bool {
        blob.x == 0
            || blob.y == 0
            || blob.x.saturating_add(blob.w) >= self.width
            || blob.y.saturating_add(blob.h) >= self.height
    }
}

impl Default for FrameGeometry {
    fn default() -> Self {
        // QVGA, the resolution every observed deployment runs at.
        Self::new(320, 240)
    }
}
