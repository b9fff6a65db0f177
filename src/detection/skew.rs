//! Page skew estimation from the ruling lines of a form.

use geo::Line;
use image::GrayImage;
use tracing::debug;

use crate::detection::hough::{probabilistic_hough, HoughParams};
use crate::utils::image_utils;

/// Skew below this magnitude, in degrees, is left uncorrected.
pub const SKEW_TOLERANCE: f32 = 0.15;

/// Segments steeper than this are treated as vertical rulings.
const FOLD_LIMIT: f32 = 30.0;

/// Angle of a segment in degrees, `atan2(dy, dx)` in image coordinates.
#[inline]
pub fn segment_angle(line: &Line<i32>) -> f32 {
    let dy = (line.end.y - line.start.y) as f32;
    let dx = (line.end.x - line.start.x) as f32;
    dy.atan2(dx).to_degrees()
}

/// Folds a segment angle into the skew of the page.
///
/// Exactly horizontal and upward vertical segments carry no information and
/// are discarded. Near-vertical segments are folded onto the horizontal.
pub fn fold_angle(angle: f32) -> Option<f32> {
    if angle == 0.0 || angle == -90.0 {
        return None;
    }
    if angle > FOLD_LIMIT {
        Some(angle - 90.0)
    } else if angle < -FOLD_LIMIT {
        Some(angle + 90.0)
    } else {
        Some(angle)
    }
}

/// Mean folded angle of the given segments, 0 when none qualify.
pub fn skew_from_segments(lines: &[Line<i32>]) -> f32 {
    let angles: Vec<f32> = lines
        .iter()
        .filter_map(|line| fold_angle(segment_angle(line)))
        .collect();

    if angles.is_empty() {
        return 0.0;
    }
    angles.iter().sum::<f32>() / angles.len() as f32
}

/// Estimates how far the page content is rotated, in degrees.
///
/// Rotating the page by the returned angle with
/// [`image_utils::rotate_by_angle`] straightens it. A mask without long
/// straight segments yields 0.
pub fn estimate_skew(line_mask: &GrayImage) -> f32 {
    let skeleton = image_utils::skeletonize(line_mask);
    let segments = probabilistic_hough(&skeleton, &HoughParams::default());
    let angle = skew_from_segments(&segments);
    debug!("Estimated skew {:.3} degrees from {} segments", angle, segments.len());
    angle
}

/// Whether a skew estimate is large enough to correct.
#[inline]
pub fn needs_correction(angle: f32) -> bool {
    angle.abs() > SKEW_TOLERANCE
}
