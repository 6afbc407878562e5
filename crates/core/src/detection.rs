//! Detection values and the confidence filter applied to engine output.

use serde::Serialize;

/// Detections scoring at or below this are discarded. Below it the results
/// of the stock detection models get fairly random.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.4;

// ---------------------------------------------------------------------------
// Boxes
// ---------------------------------------------------------------------------

/// Bounding box with corners expressed as fractions of the image size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NormalizedBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl NormalizedBox {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Scale to pixel coordinates for an image of `width` x `height`.
    ///
    /// Coordinates are clamped to `[0, 1]` first, so the result always lies
    /// within `0..=width` / `0..=height`.
    pub fn to_pixels(&self, width: u32, height: u32) -> PixelRect {
        PixelRect {
            x1: scale(self.x1, width),
            y1: scale(self.y1, height),
            x2: scale(self.x2, width),
            y2: scale(self.y2, height),
        }
    }
}

fn scale(coord: f32, extent: u32) -> i32 {
    (coord.clamp(0.0, 1.0) * extent as f32).round() as i32
}

/// Bounding box in pixel space, inclusive corners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PixelRect {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

// ---------------------------------------------------------------------------
// Detection
// ---------------------------------------------------------------------------

/// One inference result.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Detection {
    pub bbox: NormalizedBox,
    pub class_id: u32,
    pub score: f32,
}

/// Return the leading run of `detections` scoring above `threshold`.
///
/// Engines report detections ordered by descending confidence, so the
/// slice is cut at the first detection that does not clear the threshold.
/// Anything after that point is ignored even if it scores higher; callers
/// that cannot trust the ordering should check [`is_sorted_by_confidence`].
/// A `NaN` score ends the run.
pub fn retain_confident(detections: &[Detection], threshold: f32) -> &[Detection] {
    let end = detections
        .iter()
        .position(|d| !(d.score > threshold))
        .unwrap_or(detections.len());
    &detections[..end]
}

/// Whether scores are in non-increasing order.
pub fn is_sorted_by_confidence(detections: &[Detection]) -> bool {
    detections.windows(2).all(|pair| pair[0].score >= pair[1].score)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
